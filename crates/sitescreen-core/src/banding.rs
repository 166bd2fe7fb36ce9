use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::rules::BandThresholds;

/// Boost granted per detected high-value sophistication signal.
const HIGH_VALUE_BOOST: f64 = 0.03;
/// Boost granted per detected medium-value signal.
const MEDIUM_VALUE_BOOST: f64 = 0.01;
/// Ceiling on the total signal boost.
const MAX_BOOST: f64 = 0.10;

/// Signal substrings indicating a sophisticated commercial operation.
const HIGH_VALUE_SIGNALS: [&str; 6] = [
    "pricing page",
    "enterprise",
    "case study",
    "api documentation",
    "checkout flow",
    "product catalog",
];
const MEDIUM_VALUE_SIGNALS: [&str; 5] = [
    "testimonial",
    "integration",
    "careers page",
    "live chat",
    "free trial",
];

/// Discrete action derived from an LLM confidence score.
///
/// Total order from strongest accept to outright reject; computed once per
/// URL and never mutated afterward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
    AutoReject,
}

/// Final classification implied by a band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Suitability {
    Suitable,
    NotSuitable,
}

impl ConfidenceBand {
    /// Human-readable description of what the band means operationally.
    pub fn describe(self) -> &'static str {
        match self {
            Self::High => "High confidence: auto-approve for outreach",
            Self::Medium => "Medium confidence: route to manual review",
            Self::Low => "Low confidence: route to manual review",
            Self::AutoReject => "Below all thresholds: auto-reject",
        }
    }

    /// Medium and low bands are provisional and need a human decision.
    pub fn requires_manual_review(self) -> bool {
        matches!(self, Self::Medium | Self::Low)
    }

    /// Expected classification if no human overrides: everything above the
    /// auto-reject line is provisionally suitable.
    pub fn expected_classification(self) -> Suitability {
        match self {
            Self::AutoReject => Suitability::NotSuitable,
            _ => Suitability::Suitable,
        }
    }
}

/// A banded confidence score with its adjustment breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandedConfidence {
    pub band: ConfidenceBand,
    /// Raw score as supplied, before coercion.
    pub raw: f64,
    /// Signal-strength boost actually applied.
    pub boost: f64,
    /// Clamped score plus boost, re-clamped to [0,1].
    pub adjusted: f64,
}

/// Map a raw LLM confidence plus detected signal strings into a band.
///
/// Non-finite input is coerced to 0 before clamping, so `NaN` and the
/// infinities always land in `AutoReject` under default thresholds.
pub fn band_confidence(
    raw: f64,
    signals: &[String],
    thresholds: &BandThresholds,
) -> BandedConfidence {
    let coerced = if raw.is_finite() { raw } else { 0.0 };
    let clamped = coerced.clamp(0.0, 1.0);
    let boost = signal_boost(signals);
    let adjusted = (clamped + boost).clamp(0.0, 1.0);

    let band = if adjusted >= thresholds.high {
        ConfidenceBand::High
    } else if adjusted >= thresholds.medium {
        ConfidenceBand::Medium
    } else if adjusted >= thresholds.low {
        ConfidenceBand::Low
    } else {
        ConfidenceBand::AutoReject
    };
    debug!(raw, boost, adjusted, ?band, "confidence banded");

    BandedConfidence {
        band,
        raw,
        boost,
        adjusted,
    }
}

/// Additive confidence boost from qualitative signal strings, capped.
///
/// Each signal is matched case-insensitively against the high-value list
/// first, then the medium-value list; a signal contributes at most once.
pub fn signal_boost(signals: &[String]) -> f64 {
    let mut boost = 0.0;
    for signal in signals {
        let signal = signal.to_lowercase();
        if HIGH_VALUE_SIGNALS.iter().any(|m| signal.contains(m)) {
            boost += HIGH_VALUE_BOOST;
        } else if MEDIUM_VALUE_SIGNALS.iter().any(|m| signal.contains(m)) {
            boost += MEDIUM_VALUE_BOOST;
        }
    }
    boost.min(MAX_BOOST)
}
