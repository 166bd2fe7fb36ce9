use std::time::Instant;

use serde::{Deserialize, Serialize};

pub mod banding;
pub mod content;
pub mod domain;
pub mod pipeline;
pub mod report;
pub mod rules;

pub use banding::{band_confidence, signal_boost, BandedConfidence, ConfidenceBand, Suitability};
pub use content::{ContentClassifier, ContentReason, ContentSignals, FetchOutcome};
pub use domain::{DomainClassifier, DomainReason, EliminationStats};
pub use pipeline::{
    DecidedBy, Fetcher, JudgeVerdict, NoopJudge, ScreeningOutcome, ScreeningPipeline,
    SuitabilityJudge,
};
pub use rules::{
    file_provider::FileRuleProvider, BandThresholds, ExclusionCategory, ExclusionPattern,
    Layer1Rules, Layer2Rules, RulePackError, RuleProvider,
};

/// Outcome of one filter layer for one URL.
///
/// `passed` and `reason` always agree: the reason enum identifies which
/// rule fired (or which defect caused a fail-open pass), and its `Display`
/// renders the fixed human vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict<R> {
    pub passed: bool,
    pub reason: R,
    pub processing_ms: u64,
}

impl<R> Verdict<R> {
    pub(crate) fn pass(reason: R, started: Instant) -> Self {
        Self {
            passed: true,
            reason,
            processing_ms: started.elapsed().as_millis() as u64,
        }
    }

    pub(crate) fn reject(reason: R, started: Instant) -> Self {
        Self {
            passed: false,
            reason,
            processing_ms: started.elapsed().as_millis() as u64,
        }
    }
}
