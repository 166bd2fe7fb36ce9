use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::dom::DomQuery;

/// Ratio a side must reach to win the blog-vs-marketing call outright.
const DOMINANCE_RATIO: f64 = 0.7;

static LISTING_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(latest|recent)\s+(posts|articles|stories|news)\b")
        .expect("static heading regex")
});

/// Page layout classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutKind {
    Blog,
    Marketing,
    #[default]
    Mixed,
}

/// Evidence from the layout analyzer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutSignals {
    pub kind: LayoutKind,
    /// Winning-side ratio, or the ratio difference when mixed.
    pub confidence: f64,
    pub blog_weight: f64,
    pub marketing_weight: f64,
}

/// Tally weighted blog signals against weighted marketing signals.
pub fn analyze(dom: &dyn DomQuery) -> LayoutSignals {
    let articles = dom.count("article").min(5) as f64 * 2.0;
    let datestamps = dom.count("time[datetime]").min(5) as f64;
    let bylines = dom
        .count(r#"[class*="byline"], [class*="author"], [rel="author"]"#)
        .min(3) as f64;
    let pagination = if dom.count(r#"[class*="pagination"], [class*="pager"]"#) > 0 {
        1.5
    } else {
        0.0
    };
    let listing_heading = if dom
        .texts("h1, h2, h3")
        .iter()
        .any(|heading| LISTING_HEADING.is_match(heading))
    {
        2.0
    } else {
        0.0
    };
    let blog_weight = articles + datestamps + bylines + pagination + listing_heading;

    let hero = if dom.count(r#"[class*="hero"]"#) > 0 {
        2.0
    } else {
        0.0
    };
    let cta_buttons = dom.count(r#"[class*="cta"]"#).min(3) as f64 * 1.5;
    let feature_blocks = dom.count(r#"[class*="feature"]"#).min(4) as f64;
    let testimonials = if dom.count(r#"[class*="testimonial"]"#) > 0 {
        1.5
    } else {
        0.0
    };
    let screenshots = if dom.count(r#"img[src*="screenshot"], [class*="screenshot"]"#) > 0 {
        1.0
    } else {
        0.0
    };
    let marketing_weight = hero + cta_buttons + feature_blocks + testimonials + screenshots;

    let total = blog_weight + marketing_weight;
    if total == 0.0 {
        return LayoutSignals {
            kind: LayoutKind::Mixed,
            confidence: 0.0,
            blog_weight,
            marketing_weight,
        };
    }

    let blog_ratio = blog_weight / total;
    let marketing_ratio = marketing_weight / total;
    let (kind, confidence) = if blog_ratio >= DOMINANCE_RATIO {
        (LayoutKind::Blog, blog_ratio)
    } else if marketing_ratio >= DOMINANCE_RATIO {
        (LayoutKind::Marketing, marketing_ratio)
    } else {
        (LayoutKind::Mixed, (blog_ratio - marketing_ratio).abs())
    };

    LayoutSignals {
        kind,
        confidence,
        blog_weight,
        marketing_weight,
    }
}
