use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

pub mod dom;
pub mod layout;
pub mod monetization;
pub mod navigation;
pub mod product;

use crate::rules::Layer2Rules;
use crate::Verdict;
use dom::ScraperDom;
use layout::{LayoutKind, LayoutSignals};
use monetization::MonetizationSignals;
use navigation::NavSignals;
use product::ProductSignals;

/// Why Layer 2 passed or rejected a URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentReason {
    CompanySite { publication_score: f64 },
    PublicationDetected { publication_score: f64 },
    EmptyHtml,
    FetchFailed { error: String },
    AnalysisError,
}

impl fmt::Display for ContentReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CompanySite { publication_score } => write!(
                f,
                "Company/product site (publication score {publication_score:.2})"
            ),
            Self::PublicationDetected { publication_score } => write!(
                f,
                "Publication content detected (publication score {publication_score:.2})"
            ),
            Self::EmptyHtml => write!(f, "Invalid HTML: empty input"),
            Self::FetchFailed { error } => write!(f, "Fetch failed ({error})"),
            Self::AnalysisError => write!(f, "Error during analysis"),
        }
    }
}

/// Result of a collaborator fetch, as handed to the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchOutcome {
    pub success: bool,
    pub html: String,
    pub error: Option<String>,
}

/// The always-complete Layer-2 signal breakdown.
///
/// Fail-open paths return `ContentSignals::default()`: every field present,
/// all scores zero, all evidence empty. Downstream code never sees a
/// partially populated struct.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentSignals {
    pub product_offering: ProductSignals,
    pub layout: LayoutSignals,
    pub navigation: NavSignals,
    pub monetization: MonetizationSignals,
    /// Unweighted mean of the four publication contributions, in [0,1].
    pub publication_score: f64,
}

/// Layer-2 classifier: pure function of (URL, fetched HTML, rules).
pub struct ContentClassifier {
    rules: Layer2Rules,
}

impl Default for ContentClassifier {
    fn default() -> Self {
        Self::new(Layer2Rules::default())
    }
}

impl ContentClassifier {
    pub fn new(rules: Layer2Rules) -> Self {
        Self { rules }
    }

    /// Run the four content submodules and aggregate a publication score.
    ///
    /// Never errors: empty HTML or an internal failure yields a fail-open
    /// pass with zeroed signals.
    #[instrument(name = "layer2_analyze", skip(self, html), fields(html_len = html.len()))]
    pub fn analyze(&self, url: &str, html: &str) -> (Verdict<ContentReason>, ContentSignals) {
        let started = Instant::now();
        if html.trim().is_empty() {
            warn!(url, "empty HTML handed to layer 2, failing open");
            return (
                Verdict::pass(ContentReason::EmptyHtml, started),
                ContentSignals::default(),
            );
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.analyze_inner(html)));
        match outcome {
            Ok(signals) => {
                let publication_score = signals.publication_score;
                let passed = publication_score < self.rules.publication_threshold;
                debug!(
                    url,
                    publication_score,
                    passed,
                    layout = ?signals.layout.kind,
                    "layer 2 aggregation complete"
                );
                let reason = if passed {
                    ContentReason::CompanySite { publication_score }
                } else {
                    ContentReason::PublicationDetected { publication_score }
                };
                let verdict = if passed {
                    Verdict::pass(reason, started)
                } else {
                    Verdict::reject(reason, started)
                };
                (verdict, signals)
            }
            Err(_) => {
                warn!(url, "layer 2 analysis panicked, failing open");
                (
                    Verdict::pass(ContentReason::AnalysisError, started),
                    ContentSignals::default(),
                )
            }
        }
    }

    /// Variant taking the collaborator fetch result directly; a failed
    /// fetch is the pipeline's fail-open boundary.
    pub fn analyze_fetched(
        &self,
        url: &str,
        fetched: &FetchOutcome,
    ) -> (Verdict<ContentReason>, ContentSignals) {
        if !fetched.success {
            let started = Instant::now();
            let error = fetched
                .error
                .clone()
                .unwrap_or_else(|| "fetch unsuccessful".to_string());
            warn!(url, %error, "fetch failed, layer 2 failing open");
            return (
                Verdict::pass(ContentReason::FetchFailed { error }, started),
                ContentSignals::default(),
            );
        }
        self.analyze(url, &fetched.html)
    }

    fn analyze_inner(&self, html: &str) -> ContentSignals {
        let dom = ScraperDom::parse(html);

        // All four submodules always run; the aggregate needs all four
        // inputs, so there is no early exit here.
        let product_offering = product::detect(html, &dom, &self.rules);
        let layout = layout::analyze(&dom);
        let navigation = navigation::parse(&dom, &self.rules);
        let monetization = monetization::detect(html, &dom, &self.rules);

        let publication_score =
            publication_score(&product_offering, &layout, &navigation, &monetization);

        ContentSignals {
            product_offering,
            layout,
            navigation,
            monetization,
            publication_score,
        }
    }
}

/// Aggregate the four submodule outputs into one publication likelihood.
///
/// The sign table is deliberate and must not be "simplified": product and
/// navigation scores measure company-ness, so they are inverted; the layout
/// confidence counts directly only when the page classified as a blog;
/// monetization already carries its publication contribution.
fn publication_score(
    product: &ProductSignals,
    layout: &LayoutSignals,
    navigation: &NavSignals,
    monetization: &MonetizationSignals,
) -> f64 {
    let contributions = [
        1.0 - product.score,
        if layout.kind == LayoutKind::Blog {
            layout.confidence
        } else {
            1.0 - layout.confidence
        },
        1.0 - navigation.business_nav_percentage,
        monetization.score,
    ];
    let mean = contributions.iter().sum::<f64>() / contributions.len() as f64;
    mean.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::monetization::MonetizationKind;

    const MARKETING_PAGE: &str = r#"<html>
        <head><script src="https://js.stripe.com/v3"></script></head>
        <body>
            <nav>
                <a href="/pricing">Pricing</a>
                <a href="/product">Product</a>
                <a href="/customers">Customers</a>
            </nav>
            <section class="hero">Ship faster with Acme</section>
            <a class="cta">Get started</a>
            <a class="cta">Book a demo</a>
            <div class="feature">Automation</div>
            <div class="feature">Integrations</div>
            <div class="feature">Analytics</div>
            <p>Simple pricing: $49 / month. Start free trial today.</p>
        </body></html>"#;

    const BLOG_PAGE: &str = r#"<html><body>
        <nav>
            <a href="/blog">Blog</a>
            <a href="/archive">Archive</a>
            <a href="/tags">Tags</a>
        </nav>
        <h2>Latest Posts</h2>
        <article><time datetime="2026-02-01">Feb 1</time><span class="author">Sam</span>Post one</article>
        <article><time datetime="2026-02-08">Feb 8</time><span class="author">Sam</span>Post two</article>
        <article><time datetime="2026-02-15">Feb 15</time><span class="author">Sam</span>Post three</article>
        <div class="pagination"><a href="/page/2">Older</a></div>
        <script src="https://pagead2.googlesyndication.com/x.js"></script>
    </body></html>"#;

    fn classifier() -> ContentClassifier {
        ContentClassifier::default()
    }

    #[test]
    fn marketing_page_passes_as_company_site() {
        let (verdict, signals) = classifier().analyze("https://acme.com", MARKETING_PAGE);
        assert!(verdict.passed, "reason: {}", verdict.reason);
        assert!(matches!(verdict.reason, ContentReason::CompanySite { .. }));
        assert!(signals.publication_score < 0.65);
        assert_eq!(signals.layout.kind, LayoutKind::Marketing);
        assert!(signals.navigation.has_business_nav);
        assert_eq!(signals.monetization.kind, MonetizationKind::Business);
    }

    #[test]
    fn blog_page_rejects_as_publication() {
        let (verdict, signals) = classifier().analyze("https://someblog.com", BLOG_PAGE);
        assert!(!verdict.passed);
        assert!(matches!(
            verdict.reason,
            ContentReason::PublicationDetected { .. }
        ));
        assert!(signals.publication_score >= 0.65);
        assert_eq!(signals.layout.kind, LayoutKind::Blog);
        assert_eq!(signals.monetization.kind, MonetizationKind::Ads);
    }

    #[test]
    fn empty_html_fails_open_with_zero_signals() {
        let (verdict, signals) = classifier().analyze("https://acme.com", "   ");
        assert!(verdict.passed);
        assert_eq!(verdict.reason, ContentReason::EmptyHtml);
        assert_eq!(signals, ContentSignals::default());
        assert_eq!(signals.publication_score, 0.0);
    }

    #[test]
    fn failed_fetch_fails_open_with_zero_signals() {
        let fetched = FetchOutcome {
            success: false,
            html: String::new(),
            error: Some("timeout".into()),
        };
        let (verdict, signals) = classifier().analyze_fetched("https://acme.com", &fetched);
        assert!(verdict.passed);
        assert_eq!(
            verdict.reason,
            ContentReason::FetchFailed {
                error: "timeout".into()
            }
        );
        assert_eq!(signals, ContentSignals::default());
    }

    #[test]
    fn successful_fetch_is_analyzed() {
        let fetched = FetchOutcome {
            success: true,
            html: MARKETING_PAGE.to_string(),
            error: None,
        };
        let (verdict, _) = classifier().analyze_fetched("https://acme.com", &fetched);
        assert!(matches!(verdict.reason, ContentReason::CompanySite { .. }));
    }

    #[test]
    fn analysis_is_deterministic() {
        let classifier = classifier();
        let (first_verdict, first_signals) = classifier.analyze("https://acme.com", BLOG_PAGE);
        let (second_verdict, second_signals) = classifier.analyze("https://acme.com", BLOG_PAGE);
        assert_eq!(first_verdict.passed, second_verdict.passed);
        assert_eq!(first_verdict.reason, second_verdict.reason);
        assert_eq!(first_signals, second_signals);
    }

    #[test]
    fn sign_table_matches_the_design() {
        let product = ProductSignals {
            score: 0.8,
            ..ProductSignals::default()
        };
        let layout = LayoutSignals {
            kind: LayoutKind::Blog,
            confidence: 0.9,
            ..LayoutSignals::default()
        };
        let navigation = NavSignals {
            business_nav_percentage: 0.75,
            ..NavSignals::default()
        };
        let monetization = MonetizationSignals {
            kind: MonetizationKind::Ads,
            score: 1.0,
            ..MonetizationSignals::default()
        };
        let score = publication_score(&product, &layout, &navigation, &monetization);
        // (0.2 + 0.9 + 0.25 + 1.0) / 4
        assert!((score - 0.5875).abs() < 1e-9);
    }

    #[test]
    fn non_blog_layout_confidence_is_inverted() {
        let layout = LayoutSignals {
            kind: LayoutKind::Marketing,
            confidence: 0.9,
            ..LayoutSignals::default()
        };
        let score = publication_score(
            &ProductSignals::default(),
            &layout,
            &NavSignals::default(),
            &MonetizationSignals::default(),
        );
        // (1.0 + 0.1 + 1.0 + 0.0) / 4
        assert!((score - 0.525).abs() < 1e-9);
    }

    proptest::proptest! {
        #[test]
        fn publication_score_is_always_a_probability(html in "\\PC*") {
            let (_, signals) = classifier().analyze("https://example.com", &html);
            proptest::prop_assert!((0.0..=1.0).contains(&signals.publication_score));
        }
    }
}
