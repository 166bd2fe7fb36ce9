use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::rules::{ExclusionCategory, Layer1Rules};
use crate::Verdict;

/// Estimated cost of one rendered homepage fetch, in USD.
pub const ESTIMATED_FETCH_COST_USD: f64 = 0.003;
/// Estimated cost of one LLM classification call, in USD.
pub const ESTIMATED_LLM_COST_USD: f64 = 0.02;

/// Why Layer 1 passed or rejected a URL.
///
/// A closed vocabulary: downstream consumers match on the variant, the
/// `Display` impl renders the fixed human string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomainReason {
    EmptyUrl,
    MalformedUrl,
    NonCommercialTld { tld: String },
    PersonalTld { tld: String },
    BlogPlatform { host: String },
    TraditionalBusiness { keyword: String },
    DigitalNative { keyword: String },
    SubdomainBlog { subdomain: String },
    TagPage { pattern: String },
    UserContent { pattern: String },
    GeneralKeyword { keyword: String },
    NegativeIndicator { indicator: String },
    PositiveIndicator { indicator: String },
    PassedAllChecks,
    AnalysisError,
}

impl fmt::Display for DomainReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyUrl => write!(f, "Invalid URL: empty input"),
            Self::MalformedUrl => write!(f, "Invalid URL: failed to parse"),
            Self::NonCommercialTld { tld } => write!(f, "Non-commercial TLD ({tld})"),
            Self::PersonalTld { tld } => write!(f, "Personal blog TLD ({tld})"),
            Self::BlogPlatform { host } => write!(f, "Blog platform domain ({host})"),
            Self::TraditionalBusiness { keyword } => {
                write!(f, "Traditional business domain detected ({keyword})")
            }
            Self::DigitalNative { keyword } => {
                write!(f, "Digital-native business domain detected ({keyword})")
            }
            Self::SubdomainBlog { subdomain } => write!(f, "Subdomain blog detected ({subdomain})"),
            Self::TagPage { pattern } => write!(f, "Tag/category page detected ({pattern})"),
            Self::UserContent { pattern } => {
                write!(f, "User-generated content page detected ({pattern})")
            }
            Self::GeneralKeyword { keyword } => {
                write!(f, "Excluded keyword in domain ({keyword})")
            }
            Self::NegativeIndicator { indicator } => {
                write!(f, "Negative target indicator ({indicator})")
            }
            Self::PositiveIndicator { indicator } => {
                write!(f, "Positive target indicator ({indicator})")
            }
            Self::PassedAllChecks => write!(f, "Passed all domain checks"),
            Self::AnalysisError => write!(f, "Error during analysis"),
        }
    }
}

/// Batch elimination summary for a set of candidate URLs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EliminationStats {
    pub total: usize,
    pub eliminated: usize,
    pub passed: usize,
    /// Percentage of the batch rejected before any fetch.
    pub elimination_rate: f64,
}

/// Layer-1 classifier: pure function of (URL, rules) to verdict, no I/O.
///
/// Borrows an immutable rules snapshot for its lifetime; a configuration
/// reload constructs a fresh classifier rather than mutating this one.
pub struct DomainClassifier {
    rules: Layer1Rules,
}

impl Default for DomainClassifier {
    fn default() -> Self {
        Self::new(Layer1Rules::default())
    }
}

impl DomainClassifier {
    pub fn new(rules: Layer1Rules) -> Self {
        Self { rules }
    }

    /// Run the four domain filter stages against a candidate URL.
    ///
    /// Never errors: invalid input and internal failures all produce a
    /// passing verdict whose reason names the defect, so a broken input is
    /// handed to the next (more accurate) stage instead of being lost.
    #[instrument(name = "layer1_analyze", skip(self))]
    pub fn analyze(&self, url: &str) -> Verdict<DomainReason> {
        let started = Instant::now();
        let trimmed = url.trim();
        if trimmed.is_empty() {
            warn!("empty URL handed to layer 1, failing open");
            return Verdict::pass(DomainReason::EmptyUrl, started);
        }
        let Some(parsed) = parse_lenient(trimmed) else {
            warn!(url = trimmed, "unparseable URL handed to layer 1, failing open");
            return Verdict::pass(DomainReason::MalformedUrl, started);
        };
        let Some(host) = parsed.host_str().map(str::to_ascii_lowercase) else {
            warn!(url = trimmed, "URL without host handed to layer 1, failing open");
            return Verdict::pass(DomainReason::MalformedUrl, started);
        };
        let full_url = parsed.as_str().to_ascii_lowercase();

        // Stage 1: TLD filtering. Rejection exits immediately; a
        // stage-specific pass reason is kept and later stages still run.
        if let Some(reason) = self.check_tld(&host) {
            debug!(%host, %reason, "rejected by TLD filter");
            return Verdict::reject(reason, started);
        }

        // Stage 2: domain keyword classification.
        let mut pass_reason = None;
        match self.classify_domain(&host) {
            StageOutcome::Reject(reason) => {
                debug!(%host, %reason, "rejected by domain classification");
                return Verdict::reject(reason, started);
            }
            StageOutcome::Pass(reason) => pass_reason = Some(reason),
            StageOutcome::Neutral => {}
        }

        // Stage 3: URL pattern exclusions.
        if let Some(reason) = self.check_url_patterns(&host, &full_url) {
            debug!(%host, %reason, "rejected by URL pattern exclusion");
            return Verdict::reject(reason, started);
        }

        // Stage 4: target-profile matching.
        match self.match_target_profile(&host, &full_url) {
            StageOutcome::Reject(reason) => {
                debug!(%host, %reason, "rejected by target profile");
                return Verdict::reject(reason, started);
            }
            StageOutcome::Pass(reason) => pass_reason = Some(reason),
            StageOutcome::Neutral => {}
        }

        Verdict::pass(pass_reason.unwrap_or(DomainReason::PassedAllChecks), started)
    }

    /// Re-run `analyze` over a batch and report the elimination ratio.
    pub fn elimination_stats(&self, urls: &[&str]) -> EliminationStats {
        let total = urls.len();
        let eliminated = urls
            .iter()
            .filter(|url| !self.analyze(url).passed)
            .count();
        let passed = total - eliminated;
        let elimination_rate = if total == 0 {
            0.0
        } else {
            eliminated as f64 * 100.0 / total as f64
        };
        EliminationStats {
            total,
            eliminated,
            passed,
            elimination_rate,
        }
    }

    fn check_tld(&self, host: &str) -> Option<DomainReason> {
        for platform in &self.rules.blog_platforms {
            let platform = platform.to_ascii_lowercase();
            if host == platform || host.ends_with(&format!(".{platform}")) {
                return Some(DomainReason::BlogPlatform { host: platform });
            }
        }

        let tld = format!(".{}", extract_tld(host));
        for suffix in &self.rules.non_commercial_tlds {
            if tld.ends_with(suffix.as_str()) {
                return Some(DomainReason::NonCommercialTld { tld: suffix.clone() });
            }
        }
        for suffix in &self.rules.personal_tlds {
            if tld.ends_with(suffix.as_str()) {
                return Some(DomainReason::PersonalTld { tld: suffix.clone() });
            }
        }
        // Unknown TLDs pass: losing a legitimate site costs more than one
        // extra fetch.
        None
    }

    fn classify_domain(&self, host: &str) -> StageOutcome {
        for keyword in &self.rules.traditional_business_keywords {
            if host.contains(keyword.as_str()) {
                return StageOutcome::Reject(DomainReason::TraditionalBusiness {
                    keyword: keyword.clone(),
                });
            }
        }
        for keyword in &self.rules.digital_native_keywords {
            if host.contains(keyword.as_str()) {
                return StageOutcome::Pass(DomainReason::DigitalNative {
                    keyword: keyword.clone(),
                });
            }
        }
        StageOutcome::Neutral
    }

    fn check_url_patterns(&self, host: &str, full_url: &str) -> Option<DomainReason> {
        let subdomain = host.split('.').next().unwrap_or(host);
        for exclusion in &self.rules.url_exclusions {
            match exclusion.category {
                ExclusionCategory::SubdomainBlog => {
                    let keyword = exclusion.subdomain_keyword();
                    if !keyword.is_empty()
                        && (subdomain == keyword || host.starts_with(&format!("{keyword}.")))
                    {
                        return Some(DomainReason::SubdomainBlog {
                            subdomain: subdomain.to_string(),
                        });
                    }
                }
                ExclusionCategory::TagPage => {
                    if full_url.contains(exclusion.pattern.as_str()) {
                        return Some(DomainReason::TagPage {
                            pattern: exclusion.pattern.clone(),
                        });
                    }
                }
                ExclusionCategory::UserContent => {
                    if full_url.contains(exclusion.pattern.as_str()) {
                        return Some(DomainReason::UserContent {
                            pattern: exclusion.pattern.clone(),
                        });
                    }
                }
                ExclusionCategory::General => {
                    if host.contains(exclusion.pattern.as_str()) {
                        return Some(DomainReason::GeneralKeyword {
                            keyword: exclusion.pattern.clone(),
                        });
                    }
                }
            }
        }
        None
    }

    fn match_target_profile(&self, host: &str, full_url: &str) -> StageOutcome {
        let haystack = format!("{host}{full_url}");
        for indicator in &self.rules.negative_indicators {
            if haystack.contains(indicator.as_str()) {
                return StageOutcome::Reject(DomainReason::NegativeIndicator {
                    indicator: indicator.clone(),
                });
            }
        }
        for indicator in &self.rules.positive_indicators {
            if haystack.contains(indicator.as_str()) {
                return StageOutcome::Pass(DomainReason::PositiveIndicator {
                    indicator: indicator.clone(),
                });
            }
        }
        StageOutcome::Neutral
    }
}

enum StageOutcome {
    Reject(DomainReason),
    Pass(DomainReason),
    Neutral,
}

/// Fetch spend avoided by eliminating `eliminated` URLs before Layer 2.
pub fn estimated_fetch_savings(eliminated: usize) -> f64 {
    eliminated as f64 * ESTIMATED_FETCH_COST_USD
}

/// LLM spend avoided by eliminating `eliminated` URLs before Layer 3.
pub fn estimated_llm_savings(eliminated: usize) -> f64 {
    eliminated as f64 * ESTIMATED_LLM_COST_USD
}

/// Extract the TLD from a hostname.
///
/// Two-label suffixes are returned for `co.uk`-style hosts (last label in a
/// small fixed set, three or more labels) and for known blog-hosting apex
/// domains.
fn extract_tld(host: &str) -> String {
    const COMPOUND_FINAL_LABELS: [&str; 6] = ["com", "co", "uk", "au", "de", "fr"];
    const BLOG_HOST_APEXES: [&str; 2] = ["wordpress.com", "blogspot.com"];

    for apex in BLOG_HOST_APEXES {
        if host == apex || host.ends_with(&format!(".{apex}")) {
            return apex.to_string();
        }
    }

    let labels: Vec<&str> = host.split('.').collect();
    match labels.as_slice() {
        [] => String::new(),
        [only] => (*only).to_string(),
        [.., second_last, last] => {
            if labels.len() >= 3 && COMPOUND_FINAL_LABELS.contains(last) {
                format!("{second_last}.{last}")
            } else {
                (*last).to_string()
            }
        }
    }
}

/// Parse a URL, tolerating missing schemes the way operator-supplied lists
/// usually arrive (`example.com` rather than `https://example.com`).
fn parse_lenient(raw: &str) -> Option<Url> {
    match Url::parse(raw) {
        Ok(url) => Some(url),
        Err(_) if !raw.contains("://") => Url::parse(&format!("https://{raw}")).ok(),
        Err(_) => None,
    }
}
