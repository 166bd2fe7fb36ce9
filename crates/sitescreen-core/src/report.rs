use std::fmt::Write;

use crate::pipeline::{DecidedBy, ScreeningOutcome};

/// Format styles supported in default reporter implementations.
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Produce a report string from a `ScreeningOutcome` using the desired format.
pub fn render_outcome(outcome: &ScreeningOutcome, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Human => render_human(outcome),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(outcome)?),
    }
}

fn render_human(outcome: &ScreeningOutcome) -> anyhow::Result<String> {
    let mut out = String::new();
    writeln!(out, "URL: {}", outcome.url)?;
    let stage = match outcome.decided_by {
        DecidedBy::Layer1 => "layer 1 (domain rules)",
        DecidedBy::Layer2 => "layer 2 (content heuristics)",
        DecidedBy::Judgment => "layer 3 (LLM judgment)",
    };
    writeln!(out, "Decided by: {stage}")?;
    writeln!(out, "Suitability: {:?}", outcome.suitability)?;
    writeln!(
        out,
        "Layer 1: {} ({} ms)",
        outcome.domain_verdict.reason, outcome.domain_verdict.processing_ms
    )?;

    if let Some(verdict) = &outcome.content_verdict {
        writeln!(
            out,
            "Layer 2: {} ({} ms)",
            verdict.reason, verdict.processing_ms
        )?;
    }
    if let Some(signals) = &outcome.content_signals {
        writeln!(out, "  publication score: {:.2}", signals.publication_score)?;
        writeln!(
            out,
            "  product {:.2} | layout {:?} {:.2} | business nav {:.0}% | monetization {:?}",
            signals.product_offering.score,
            signals.layout.kind,
            signals.layout.confidence,
            signals.navigation.business_nav_percentage * 100.0,
            signals.monetization.kind,
        )?;
    }
    if let Some(banded) = &outcome.banded {
        writeln!(
            out,
            "Band: {:?} (raw {:.2}, boost {:+.2}, adjusted {:.2})",
            banded.band, banded.raw, banded.boost, banded.adjusted
        )?;
        writeln!(out, "  {}", banded.band.describe())?;
    }
    if let Some(rationale) = &outcome.rationale {
        writeln!(out, "Rationale: {rationale}")?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::banding::{band_confidence, Suitability};
    use crate::content::{ContentReason, ContentSignals};
    use crate::domain::DomainReason;
    use crate::rules::BandThresholds;
    use crate::Verdict;

    fn sample_outcome() -> ScreeningOutcome {
        ScreeningOutcome {
            url: "https://acme.com".into(),
            decided_by: DecidedBy::Judgment,
            suitability: Suitability::Suitable,
            domain_verdict: Verdict {
                passed: true,
                reason: DomainReason::PassedAllChecks,
                processing_ms: 0,
            },
            content_verdict: Some(Verdict {
                passed: true,
                reason: ContentReason::CompanySite {
                    publication_score: 0.2,
                },
                processing_ms: 3,
            }),
            content_signals: Some(ContentSignals::default()),
            banded: Some(band_confidence(0.9, &[], &BandThresholds::default())),
            rationale: Some("clear product site".into()),
        }
    }

    #[test]
    fn human_report_names_the_deciding_stage() {
        let output = render_outcome(&sample_outcome(), OutputFormat::Human).unwrap();
        assert!(output.contains("layer 3 (LLM judgment)"));
        assert!(output.contains("Passed all domain checks"));
        assert!(output.contains("publication score"));
        assert!(output.contains("auto-approve"));
    }

    #[test]
    fn json_report_serializes() {
        let output = render_outcome(&sample_outcome(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["url"], "https://acme.com");
        assert_eq!(value["decided_by"], "judgment");
        assert!(value["banded"]["adjusted"].is_number());
    }
}
