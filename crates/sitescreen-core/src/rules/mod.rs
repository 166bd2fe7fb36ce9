use anyhow::Result as AnyResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod file_provider;

/// Category assigned to a configured URL exclusion pattern.
///
/// Every pattern carries an explicit category; patterns without one are
/// stored as `General` rather than inferred from absent metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionCategory {
    SubdomainBlog,
    TagPage,
    UserContent,
    General,
}

/// A single URL exclusion pattern with its category tag.
///
/// Subdomain patterns are stored in simplified regex form (`^blog\.`); the
/// classifier derives the bare keyword by stripping the anchor and escape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionPattern {
    pub pattern: String,
    pub category: ExclusionCategory,
}

impl ExclusionPattern {
    pub fn new(pattern: impl Into<String>, category: ExclusionCategory) -> Self {
        Self {
            pattern: pattern.into(),
            category,
        }
    }

    /// Keyword form of a subdomain pattern: `^blog\.` becomes `blog`.
    pub fn subdomain_keyword(&self) -> String {
        self.pattern
            .trim_start_matches('^')
            .trim_end_matches("\\.")
            .trim_end_matches('.')
            .replace('\\', "")
    }
}

/// Layer-1 rule set: domain-only checks, no content required.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Layer1Rules {
    pub commercial_tlds: Vec<String>,
    pub non_commercial_tlds: Vec<String>,
    pub personal_tlds: Vec<String>,
    pub blog_platforms: Vec<String>,
    pub traditional_business_keywords: Vec<String>,
    pub digital_native_keywords: Vec<String>,
    pub url_exclusions: Vec<ExclusionPattern>,
    pub positive_indicators: Vec<String>,
    pub negative_indicators: Vec<String>,
}

impl Default for Layer1Rules {
    fn default() -> Self {
        use ExclusionCategory::*;
        Self {
            commercial_tlds: strings(&[".com", ".io", ".co", ".ai", ".app", ".dev", ".net"]),
            non_commercial_tlds: strings(&[".gov", ".edu", ".org", ".mil", ".int"]),
            personal_tlds: strings(&[".me", ".blog", ".xyz", ".name", ".site", ".online"]),
            blog_platforms: strings(&[
                "wordpress.com",
                "blogspot.com",
                "medium.com",
                "substack.com",
                "tumblr.com",
                "ghost.io",
                "wixsite.com",
                "weebly.com",
            ]),
            traditional_business_keywords: strings(&[
                "plumbing",
                "roofing",
                "restaurant",
                "dental",
                "dentist",
                "lawfirm",
                "attorney",
                "salon",
                "realestate",
                "realtor",
                "hvac",
                "landscaping",
                "autorepair",
                "chiropract",
            ]),
            digital_native_keywords: strings(&[
                "saas", "software", "cloud", "platform", "analytics", "api", "devtools", "app",
            ]),
            url_exclusions: vec![
                ExclusionPattern::new("^blog\\.", SubdomainBlog),
                ExclusionPattern::new("^news\\.", SubdomainBlog),
                ExclusionPattern::new("^articles\\.", SubdomainBlog),
                ExclusionPattern::new("^journal\\.", SubdomainBlog),
                ExclusionPattern::new("/tag/", TagPage),
                ExclusionPattern::new("/tags/", TagPage),
                ExclusionPattern::new("/category/", TagPage),
                ExclusionPattern::new("/categories/", TagPage),
                ExclusionPattern::new("/topics/", TagPage),
                ExclusionPattern::new("/author/", UserContent),
                ExclusionPattern::new("/user/", UserContent),
                ExclusionPattern::new("/profile/", UserContent),
                ExclusionPattern::new("/forum/", UserContent),
                ExclusionPattern::new("/wiki/", UserContent),
                ExclusionPattern::new("magazine", General),
                ExclusionPattern::new("gazette", General),
                ExclusionPattern::new("tribune", General),
                ExclusionPattern::new("dailynews", General),
            ],
            positive_indicators: strings(&[
                "pricing", "product", "solutions", "enterprise", "demo", "customers",
            ]),
            negative_indicators: strings(&[
                "directory",
                "classifieds",
                "coupons",
                "listings",
                "aggregator",
            ]),
        }
    }
}

/// Layer-2 rule set: content heuristics over fetched homepage HTML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Layer2Rules {
    /// Reject when the aggregated publication score reaches this value.
    pub publication_threshold: f64,
    pub commercial_keywords: Vec<String>,
    pub feature_keywords: Vec<String>,
    pub cta_keywords: Vec<String>,
    pub business_nav_keywords: Vec<String>,
    pub content_nav_keywords: Vec<String>,
    /// Minimum business share of nav links to count as business navigation.
    pub min_business_nav_pct: f64,
    pub ad_network_patterns: Vec<String>,
    pub affiliate_patterns: Vec<String>,
    pub payment_providers: Vec<String>,
}

impl Default for Layer2Rules {
    fn default() -> Self {
        Self {
            publication_threshold: 0.65,
            commercial_keywords: strings(&[
                "pricing",
                "buy now",
                "purchase",
                "order now",
                "checkout",
                "free trial",
                "subscription plans",
                "per seat",
            ]),
            feature_keywords: strings(&[
                "features",
                "integrations",
                "dashboard",
                "automation",
                "analytics",
                "workflow",
                "api access",
                "security",
            ]),
            cta_keywords: strings(&[
                "get started",
                "sign up",
                "start free",
                "try free",
                "book a demo",
                "request a demo",
                "contact sales",
            ]),
            business_nav_keywords: strings(&[
                "pricing",
                "product",
                "features",
                "solutions",
                "customers",
                "integrations",
                "demo",
                "about",
                "contact",
                "careers",
            ]),
            content_nav_keywords: strings(&[
                "blog",
                "articles",
                "news",
                "archive",
                "categories",
                "tags",
                "authors",
                "newsletter",
                "podcast",
                "stories",
            ]),
            min_business_nav_pct: 0.4,
            ad_network_patterns: strings(&[
                "googlesyndication",
                "adsbygoogle",
                "doubleclick",
                "taboola",
                "outbrain",
                "adroll",
                "media.net",
                "amazon-adsystem",
                "criteo",
            ]),
            affiliate_patterns: strings(&[
                "amzn.to",
                "/ref=",
                "affiliate",
                "shareasale",
                "awin1.com",
                "go.redirectingat",
                "utm_medium=affiliate",
            ]),
            payment_providers: strings(&[
                "js.stripe.com",
                "checkout.stripe.com",
                "paypal.com/sdk",
                "checkout.shopify",
                "braintreegateway",
                "squareup.com",
                "paddle.com",
                "chargebee",
                "gumroad",
                "lemonsqueezy",
            ]),
        }
    }
}

/// Cut points mapping an adjusted confidence score into a band.
///
/// Invariant `high > medium > low >= 0`; the settings layer validates before
/// persisting, `validate` re-checks when packs are loaded from disk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandThresholds {
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

impl Default for BandThresholds {
    fn default() -> Self {
        Self {
            high: 0.8,
            medium: 0.5,
            low: 0.3,
        }
    }
}

impl BandThresholds {
    pub fn validate(&self) -> Result<(), RulePackError> {
        let ordered = self.high > self.medium && self.medium > self.low && self.low >= 0.0;
        let bounded = self.high <= 1.0;
        if !ordered || !bounded {
            return Err(RulePackError::InvalidThresholds {
                high: self.high,
                medium: self.medium,
                low: self.low,
            });
        }
        Ok(())
    }
}

impl Layer2Rules {
    pub fn validate(&self) -> Result<(), RulePackError> {
        if !(0.0..=1.0).contains(&self.publication_threshold) {
            return Err(RulePackError::InvalidProbability {
                field: "publication_threshold".to_string(),
                value: self.publication_threshold,
            });
        }
        if !(0.0..=1.0).contains(&self.min_business_nav_pct) {
            return Err(RulePackError::InvalidProbability {
                field: "min_business_nav_pct".to_string(),
                value: self.min_business_nav_pct,
            });
        }
        Ok(())
    }
}

/// Errors emitted while validating rule packs at load time.
#[derive(Debug, Error, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RulePackError {
    #[error("`{field}` must be within 0.0..=1.0 (got {value})")]
    InvalidProbability { field: String, value: f64 },
    #[error("band thresholds must satisfy high > medium > low >= 0 and high <= 1 (got high={high}, medium={medium}, low={low})")]
    InvalidThresholds { high: f64, medium: f64, low: f64 },
}

/// Abstraction over versioned rule storage so different backends (files,
/// HTTP, in-memory) can be swapped transparently.
///
/// `Ok(None)` is the fallback marker: no persisted configuration exists and
/// callers substitute the hardcoded defaults. Errors are treated the same
/// way by callers (fail open), never propagated into a verdict.
#[async_trait]
pub trait RuleProvider: Send + Sync {
    async fn layer1_rules(&self) -> AnyResult<Option<Layer1Rules>>;

    async fn layer2_rules(&self) -> AnyResult<Option<Layer2Rules>>;

    async fn band_thresholds(&self) -> AnyResult<Option<BandThresholds>>;
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
