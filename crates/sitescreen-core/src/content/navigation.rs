use serde::{Deserialize, Serialize};

use super::dom::DomQuery;
use crate::rules::Layer2Rules;

/// Evidence from the navigation parser.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NavSignals {
    /// Business-bucket share of all classified nav links, in [0,1].
    pub business_nav_percentage: f64,
    pub has_business_nav: bool,
    pub business_links: Vec<String>,
    pub content_links: Vec<String>,
    pub other_links: Vec<String>,
}

/// Classify each navigation link into business / content / other buckets.
pub fn parse(dom: &dyn DomQuery, rules: &Layer2Rules) -> NavSignals {
    let links = dom.links("nav a");
    if links.is_empty() {
        return NavSignals::default();
    }

    let mut signals = NavSignals::default();
    for link in &links {
        let haystack = format!(
            "{} {}",
            link.text.to_lowercase(),
            link.href.to_lowercase()
        );
        let label = if link.text.is_empty() {
            link.href.clone()
        } else {
            link.text.clone()
        };
        if contains_any(&haystack, &rules.business_nav_keywords) {
            signals.business_links.push(label);
        } else if contains_any(&haystack, &rules.content_nav_keywords) {
            signals.content_links.push(label);
        } else {
            signals.other_links.push(label);
        }
    }

    signals.business_nav_percentage = signals.business_links.len() as f64 / links.len() as f64;
    signals.has_business_nav = signals.business_nav_percentage >= rules.min_business_nav_pct;
    signals
}

fn contains_any(haystack: &str, keywords: &[String]) -> bool {
    keywords
        .iter()
        .any(|keyword| haystack.contains(keyword.as_str()))
}
