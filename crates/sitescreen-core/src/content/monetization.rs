use serde::{Deserialize, Serialize};

use super::dom::DomQuery;
use crate::rules::Layer2Rules;

/// How the page appears to make money.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonetizationKind {
    Business,
    Ads,
    Affiliates,
    Mixed,
    #[default]
    Unknown,
}

impl MonetizationKind {
    /// Publication-likelihood contribution used directly by the aggregator:
    /// ad/affiliate revenue reads as a publication, payment processing as a
    /// company site, anything ambiguous sits in the middle.
    pub fn publication_contribution(self) -> f64 {
        match self {
            Self::Ads | Self::Affiliates => 1.0,
            Self::Business => 0.0,
            Self::Mixed | Self::Unknown => 0.5,
        }
    }
}

/// Evidence from the monetization detector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonetizationSignals {
    pub kind: MonetizationKind,
    /// Publication contribution of `kind`; kept on the struct so a verdict
    /// serializes with all four submodule scores present.
    pub score: f64,
    pub ad_networks: Vec<String>,
    pub affiliate_patterns: Vec<String>,
    pub payment_providers: Vec<String>,
    pub has_ad_containers: bool,
}

/// Substring-scan the raw HTML for ad networks, affiliate links, ad
/// container markup, and payment-provider scripts.
pub fn detect(html: &str, dom: &dyn DomQuery, rules: &Layer2Rules) -> MonetizationSignals {
    let html_lower = html.to_lowercase();

    let ad_networks = matching_patterns(&html_lower, &rules.ad_network_patterns);
    let affiliate_patterns = matching_patterns(&html_lower, &rules.affiliate_patterns);
    let payment_providers = matching_patterns(&html_lower, &rules.payment_providers);
    let has_ad_containers = dom.count(r#"[class*="ad-slot"], [class*="advert"], [id*="ad-container"]"#)
        > 0
        || html_lower.contains("sponsored");

    let has_ads = !ad_networks.is_empty() || has_ad_containers;
    let has_affiliates = !affiliate_patterns.is_empty();
    let has_business = !payment_providers.is_empty();

    let kind = match (has_business, has_ads, has_affiliates) {
        (true, false, false) => MonetizationKind::Business,
        (true, _, _) => MonetizationKind::Mixed,
        (false, true, true) => MonetizationKind::Mixed,
        (false, true, false) => MonetizationKind::Ads,
        (false, false, true) => MonetizationKind::Affiliates,
        (false, false, false) => MonetizationKind::Unknown,
    };

    MonetizationSignals {
        kind,
        score: kind.publication_contribution(),
        ad_networks,
        affiliate_patterns,
        payment_providers,
        has_ad_containers,
    }
}

fn matching_patterns(haystack: &str, patterns: &[String]) -> Vec<String> {
    patterns
        .iter()
        .filter(|pattern| haystack.contains(&pattern.to_lowercase()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::dom::ScraperDom;

    fn detect_in(html: &str) -> MonetizationSignals {
        let dom = ScraperDom::parse(html);
        detect(html, &dom, &Layer2Rules::default())
    }

    #[test]
    fn payment_only_is_business() {
        let html = r#"<script src="https://js.stripe.com/v3"></script>"#;
        let signals = detect_in(html);
        assert_eq!(signals.kind, MonetizationKind::Business);
        assert_eq!(signals.score, 0.0);
    }

    #[test]
    fn ad_network_only_is_ads() {
        let html = r#"<script src="https://pagead2.googlesyndication.com/x.js"></script>"#;
        let signals = detect_in(html);
        assert_eq!(signals.kind, MonetizationKind::Ads);
        assert_eq!(signals.score, 1.0);
        assert_eq!(signals.ad_networks, vec!["googlesyndication"]);
    }

    #[test]
    fn affiliate_only_is_affiliates() {
        let html = r#"<a href="https://amzn.to/3xyz">deal</a>"#;
        let signals = detect_in(html);
        assert_eq!(signals.kind, MonetizationKind::Affiliates);
        assert_eq!(signals.score, 1.0);
    }

    #[test]
    fn payment_plus_ads_is_mixed() {
        let html = r#"<script src="https://js.stripe.com/v3"></script>
                      <script src="https://cdn.taboola.com/x.js"></script>"#;
        let signals = detect_in(html);
        assert_eq!(signals.kind, MonetizationKind::Mixed);
        assert_eq!(signals.score, 0.5);
    }

    #[test]
    fn ads_plus_affiliates_without_business_is_mixed() {
        let html = r#"<div class="advert"></div><a href="https://amzn.to/3xyz">deal</a>"#;
        let signals = detect_in(html);
        assert_eq!(signals.kind, MonetizationKind::Mixed);
    }

    #[test]
    fn sponsored_text_counts_as_ad_container() {
        let signals = detect_in("<html><body><p>Sponsored content</p></body></html>");
        assert!(signals.has_ad_containers);
        assert_eq!(signals.kind, MonetizationKind::Ads);
    }

    #[test]
    fn silent_page_is_unknown() {
        let signals = detect_in("<html><body><p>hello</p></body></html>");
        assert_eq!(signals.kind, MonetizationKind::Unknown);
        assert_eq!(signals.score, 0.5);
    }
}
