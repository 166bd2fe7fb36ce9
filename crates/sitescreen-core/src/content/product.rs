use aho_corasick::AhoCorasick;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::dom::DomQuery;
use crate::rules::Layer2Rules;

const COMMERCIAL_CAP: f64 = 0.4;
const FEATURE_CAP: f64 = 0.3;
const CTA_CAP: f64 = 0.3;
const PER_MATCH: f64 = 0.1;
const PRICE_PATTERN_BONUS: f64 = 0.15;
const PAYMENT_SCRIPT_BONUS: f64 = 0.15;

static PRICE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"\$\d+").expect("static price regex"),
        Regex::new(r"(?i)\d+\s*/\s*(month|mo|year|yr)\b").expect("static price regex"),
    ]
});

/// Evidence from the product-offering detector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductSignals {
    /// Combined offering confidence in [0,1]; exactly 0 when nothing fired.
    pub score: f64,
    pub commercial_matches: Vec<String>,
    pub feature_matches: Vec<String>,
    pub cta_matches: Vec<String>,
    pub has_price_patterns: bool,
    pub has_payment_scripts: bool,
}

/// Scan visible body text for commercial, feature, and call-to-action
/// vocabulary, plus price markup and payment-provider scripts.
pub fn detect(html: &str, dom: &dyn DomQuery, rules: &Layer2Rules) -> ProductSignals {
    let body = dom.body_text().to_lowercase();
    let html_lower = html.to_lowercase();

    let commercial_matches = keyword_matches(&body, &rules.commercial_keywords);
    let feature_matches = keyword_matches(&body, &rules.feature_keywords);
    let cta_matches = keyword_matches(&body, &rules.cta_keywords);

    let has_price_patterns = PRICE_PATTERNS.iter().any(|regex| regex.is_match(&body))
        || dom.count(r#"[class*="pricing"]"#) > 0;
    let has_payment_scripts = rules
        .payment_providers
        .iter()
        .any(|provider| html_lower.contains(&provider.to_lowercase()));

    let mut score = bucket_score(commercial_matches.len(), COMMERCIAL_CAP)
        + bucket_score(feature_matches.len(), FEATURE_CAP)
        + bucket_score(cta_matches.len(), CTA_CAP);
    if has_price_patterns {
        score += PRICE_PATTERN_BONUS;
    }
    if has_payment_scripts {
        score += PAYMENT_SCRIPT_BONUS;
    }

    ProductSignals {
        score: score.min(1.0),
        commercial_matches,
        feature_matches,
        cta_matches,
        has_price_patterns,
        has_payment_scripts,
    }
}

/// Per-bucket contribution: scaled by distinct match count, capped.
fn bucket_score(matches: usize, cap: f64) -> f64 {
    (matches as f64 * PER_MATCH).min(cap)
}

/// Distinct keywords from `keywords` present in `haystack` (already
/// lowercased). A keyword set that fails to compile is skipped, not fatal.
fn keyword_matches(haystack: &str, keywords: &[String]) -> Vec<String> {
    if keywords.is_empty() || haystack.is_empty() {
        return Vec::new();
    }
    let Ok(automaton) = AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .build(keywords)
    else {
        return Vec::new();
    };
    let mut seen = vec![false; keywords.len()];
    for mat in automaton.find_iter(haystack) {
        seen[mat.pattern().as_usize()] = true;
    }
    keywords
        .iter()
        .zip(seen)
        .filter(|(_, hit)| *hit)
        .map(|(keyword, _)| keyword.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::dom::ScraperDom;

    fn detect_in(html: &str) -> ProductSignals {
        let dom = ScraperDom::parse(html);
        detect(html, &dom, &Layer2Rules::default())
    }

    #[test]
    fn silent_page_scores_exactly_zero() {
        let signals = detect_in("<html><body><p>Just some words.</p></body></html>");
        assert_eq!(signals.score, 0.0);
        assert!(signals.commercial_matches.is_empty());
    }

    #[test]
    fn weak_signal_is_distinct_from_none() {
        let signals = detect_in("<html><body><p>See our pricing.</p></body></html>");
        assert!(signals.score > 0.0);
        assert!(signals.score < 0.5);
        assert_eq!(signals.commercial_matches, vec!["pricing"]);
    }

    #[test]
    fn buckets_are_capped() {
        // Five commercial keywords would contribute 0.5 uncapped.
        let html = "<html><body><p>pricing buy now purchase order now checkout \
                    free trial subscription plans per seat</p></body></html>";
        let signals = detect_in(html);
        let commercial = bucket_score(signals.commercial_matches.len(), COMMERCIAL_CAP);
        assert!((commercial - COMMERCIAL_CAP).abs() < f64::EPSILON);
    }

    #[test]
    fn price_patterns_add_bonus() {
        let plain = detect_in("<html><body><p>pricing</p></body></html>");
        let priced = detect_in("<html><body><p>pricing from $49 / month</p></body></html>");
        assert!(priced.has_price_patterns);
        assert!((priced.score - plain.score - PRICE_PATTERN_BONUS).abs() < 1e-9);
    }

    #[test]
    fn pricing_table_markup_counts_as_price_pattern() {
        let signals = detect_in(r#"<html><body><div class="pricing-table"></div></body></html>"#);
        assert!(signals.has_price_patterns);
    }

    #[test]
    fn payment_scripts_detected_in_raw_html() {
        let html = r#"<html><head><script src="https://js.stripe.com/v3"></script></head>
                      <body></body></html>"#;
        let signals = detect_in(html);
        assert!(signals.has_payment_scripts);
        assert!((signals.score - PAYMENT_SCRIPT_BONUS).abs() < 1e-9);
    }

    #[test]
    fn score_never_exceeds_one() {
        let html = r#"<html><head><script src="https://js.stripe.com/v3"></script></head>
            <body><div class="pricing">pricing buy now purchase order now checkout
            features integrations dashboard automation analytics workflow
            get started sign up start free try free book a demo $99 / month
            </div></body></html>"#;
        let signals = detect_in(html);
        assert!((signals.score - 1.0).abs() < f64::EPSILON);
    }
}
