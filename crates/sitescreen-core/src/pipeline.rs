use std::sync::Arc;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::banding::{band_confidence, BandedConfidence, Suitability};
use crate::content::{ContentClassifier, ContentReason, ContentSignals, FetchOutcome};
use crate::domain::{DomainClassifier, DomainReason};
use crate::rules::{BandThresholds, Layer1Rules, Layer2Rules, RuleProvider};
use crate::Verdict;

/// Retrieves homepage HTML for a URL. Fetch policy (rendering, retries,
/// timeouts) lives entirely behind this seam.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> AnyResult<FetchOutcome>;
}

/// Raw result of the Layer-3 LLM judgment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeVerdict {
    /// Raw confidence in [0,1] as reported by the model.
    pub confidence: f64,
    /// Qualitative signal strings detected by the model.
    pub signals: Vec<String>,
    pub rationale: String,
}

/// LLM collaborator that judges a site's outreach suitability.
#[async_trait]
pub trait SuitabilityJudge: Send + Sync {
    async fn judge(&self, url: &str, html: &str, signals: &ContentSignals)
        -> AnyResult<JudgeVerdict>;
}

/// Placeholder judge used until a concrete adapter is wired in: mid-scale
/// confidence, so every surviving URL routes to manual review.
#[derive(Debug, Default, Clone)]
pub struct NoopJudge;

#[async_trait]
impl SuitabilityJudge for NoopJudge {
    async fn judge(
        &self,
        _url: &str,
        _html: &str,
        _signals: &ContentSignals,
    ) -> AnyResult<JudgeVerdict> {
        Ok(JudgeVerdict {
            confidence: 0.5,
            signals: Vec::new(),
            rationale: "LLM judge not configured; routing to manual review.".into(),
        })
    }
}

/// Which stage produced the final decision for a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecidedBy {
    Layer1,
    Layer2,
    Judgment,
}

/// Full record of one URL's trip through the cascade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningOutcome {
    pub url: String,
    pub decided_by: DecidedBy,
    pub suitability: Suitability,
    pub domain_verdict: Verdict<DomainReason>,
    pub content_verdict: Option<Verdict<ContentReason>>,
    pub content_signals: Option<ContentSignals>,
    pub banded: Option<BandedConfidence>,
    pub rationale: Option<String>,
}

/// Wires Layer 1, fetch, Layer 2, judgment, and banding into one cascade.
///
/// Every collaborator failure fails open into the next stage; the pipeline
/// itself never returns an error for a URL.
pub struct ScreeningPipeline<P, F, J> {
    provider: Arc<P>,
    fetcher: Arc<F>,
    judge: Arc<J>,
}

impl<P, F, J> ScreeningPipeline<P, F, J>
where
    P: RuleProvider,
    F: Fetcher,
    J: SuitabilityJudge,
{
    pub fn new(provider: Arc<P>, fetcher: Arc<F>, judge: Arc<J>) -> Self {
        Self {
            provider,
            fetcher,
            judge,
        }
    }

    /// Screen one URL end to end.
    #[instrument(name = "screen_url", skip(self))]
    pub async fn screen(&self, url: &str) -> ScreeningOutcome {
        let layer1_rules = match self.provider.layer1_rules().await {
            Ok(Some(rules)) => rules,
            Ok(None) => Layer1Rules::default(),
            Err(err) => {
                warn!(%err, "layer 1 rules unavailable, using hardcoded defaults");
                Layer1Rules::default()
            }
        };
        let domain_verdict = DomainClassifier::new(layer1_rules).analyze(url);
        if !domain_verdict.passed {
            info!(url, reason = %domain_verdict.reason, "eliminated at layer 1");
            return ScreeningOutcome {
                url: url.to_string(),
                decided_by: DecidedBy::Layer1,
                suitability: Suitability::NotSuitable,
                domain_verdict,
                content_verdict: None,
                content_signals: None,
                banded: None,
                rationale: None,
            };
        }

        let fetched = match self.fetcher.fetch(url).await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(url, %err, "fetcher errored, failing open");
                FetchOutcome {
                    success: false,
                    html: String::new(),
                    error: Some(err.to_string()),
                }
            }
        };

        let layer2_rules = match self.provider.layer2_rules().await {
            Ok(Some(rules)) => rules,
            Ok(None) => Layer2Rules::default(),
            Err(err) => {
                warn!(%err, "layer 2 rules unavailable, using hardcoded defaults");
                Layer2Rules::default()
            }
        };
        let (content_verdict, content_signals) =
            ContentClassifier::new(layer2_rules).analyze_fetched(url, &fetched);
        if !content_verdict.passed {
            info!(url, reason = %content_verdict.reason, "eliminated at layer 2");
            return ScreeningOutcome {
                url: url.to_string(),
                decided_by: DecidedBy::Layer2,
                suitability: Suitability::NotSuitable,
                domain_verdict,
                content_verdict: Some(content_verdict),
                content_signals: Some(content_signals),
                banded: None,
                rationale: None,
            };
        }

        let judged = match self.judge.judge(url, &fetched.html, &content_signals).await {
            Ok(verdict) => verdict,
            Err(err) => {
                warn!(url, %err, "judge errored, failing open to manual review");
                JudgeVerdict {
                    confidence: 0.5,
                    signals: Vec::new(),
                    rationale: format!("judgment unavailable ({err}); manual review required"),
                }
            }
        };
        let thresholds = match self.provider.band_thresholds().await {
            Ok(Some(thresholds)) => thresholds,
            Ok(None) => BandThresholds::default(),
            Err(err) => {
                warn!(%err, "band thresholds unavailable, using hardcoded defaults");
                BandThresholds::default()
            }
        };
        let banded = band_confidence(judged.confidence, &judged.signals, &thresholds);
        info!(url, band = ?banded.band, adjusted = banded.adjusted, "judgment banded");

        ScreeningOutcome {
            url: url.to_string(),
            decided_by: DecidedBy::Judgment,
            suitability: banded.band.expected_classification(),
            domain_verdict,
            content_verdict: Some(content_verdict),
            content_signals: Some(content_signals),
            banded: Some(banded),
            rationale: Some(judged.rationale),
        }
    }
}
