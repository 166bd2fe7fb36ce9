use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use serde::de::DeserializeOwned;

use super::{BandThresholds, Layer1Rules, Layer2Rules, RuleProvider};

/// Loads rule packs from JSON files (`layer1.json`, `layer2.json`,
/// `thresholds.json`) located under a base directory.
///
/// A missing file is the fallback marker (`None`), not an error; a present
/// but malformed file is an error so misconfiguration surfaces at load time
/// instead of silently weakening a filter.
pub struct FileRuleProvider {
    base_path: PathBuf,
    cache: OnceCell<RulePack>,
}

#[derive(Clone)]
struct RulePack {
    layer1: Option<Layer1Rules>,
    layer2: Option<Layer2Rules>,
    thresholds: Option<BandThresholds>,
}

impl FileRuleProvider {
    /// Create a provider rooted at the given directory.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            cache: OnceCell::new(),
        }
    }

    fn load_json<T: DeserializeOwned>(&self, file: &str) -> Result<Option<T>> {
        let path = self.base_path.join(file);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read rule pack at {}", path.display()))?;
        let parsed = serde_json::from_str(&raw)
            .with_context(|| format!("invalid JSON in rule pack at {}", path.display()))?;
        Ok(Some(parsed))
    }

    fn load_pack(&self) -> Result<&RulePack> {
        self.cache.get_or_try_init(|| {
            let layer1 = self.load_json::<Layer1Rules>("layer1.json")?;
            let layer2 = self.load_json::<Layer2Rules>("layer2.json")?;
            if let Some(rules) = &layer2 {
                rules.validate()?;
            }
            let thresholds = self.load_json::<BandThresholds>("thresholds.json")?;
            if let Some(thresholds) = &thresholds {
                thresholds.validate()?;
            }
            Ok::<_, anyhow::Error>(RulePack {
                layer1,
                layer2,
                thresholds,
            })
        })
    }
}

#[async_trait]
impl RuleProvider for FileRuleProvider {
    async fn layer1_rules(&self) -> Result<Option<Layer1Rules>> {
        Ok(self.load_pack()?.layer1.clone())
    }

    async fn layer2_rules(&self) -> Result<Option<Layer2Rules>> {
        Ok(self.load_pack()?.layer2.clone())
    }

    async fn band_thresholds(&self) -> Result<Option<BandThresholds>> {
        Ok(self.load_pack()?.thresholds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn write(path: &Path, contents: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn missing_files_are_fallback_markers() {
        let temp = tempfile::tempdir().unwrap();
        let provider = FileRuleProvider::new(temp.path());
        let layer1 = futures::executor::block_on(provider.layer1_rules()).unwrap();
        let thresholds = futures::executor::block_on(provider.band_thresholds()).unwrap();
        assert!(layer1.is_none());
        assert!(thresholds.is_none());
    }

    #[test]
    fn partial_layer1_pack_inherits_defaults_for_missing_fields() {
        let temp = tempfile::tempdir().unwrap();
        write(
            &temp.path().join("layer1.json"),
            r#"{"blog_platforms": ["wordpress.com"], "non_commercial_tlds": [".gov"]}"#,
        );
        let provider = FileRuleProvider::new(temp.path());
        let rules = futures::executor::block_on(provider.layer1_rules())
            .unwrap()
            .expect("pack exists");
        assert_eq!(rules.blog_platforms, vec!["wordpress.com"]);
        assert_eq!(rules.non_commercial_tlds, vec![".gov"]);
        assert_eq!(rules.url_exclusions, Layer1Rules::default().url_exclusions);
    }

    #[test]
    fn malformed_json_errors() {
        let temp = tempfile::tempdir().unwrap();
        write(&temp.path().join("layer2.json"), "{ not json");
        let provider = FileRuleProvider::new(temp.path());
        let err = futures::executor::block_on(provider.layer2_rules()).unwrap_err();
        assert!(err.to_string().contains("invalid JSON"));
    }

    #[test]
    fn invalid_thresholds_error_at_load() {
        let temp = tempfile::tempdir().unwrap();
        write(
            &temp.path().join("thresholds.json"),
            r#"{"high": 0.2, "medium": 0.5, "low": 0.3}"#,
        );
        let provider = FileRuleProvider::new(temp.path());
        let err = futures::executor::block_on(provider.band_thresholds()).unwrap_err();
        assert!(err.to_string().contains("band thresholds"));
    }

    #[test]
    fn loads_sample_rule_pack_from_repo() {
        let rules_dir = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../rules")
            .canonicalize()
            .expect("rules directory should exist");
        let provider = FileRuleProvider::new(rules_dir);
        let layer1 = futures::executor::block_on(provider.layer1_rules())
            .expect("sample pack should parse")
            .expect("layer1.json should exist");
        assert!(layer1
            .blog_platforms
            .iter()
            .any(|host| host == "wordpress.com"));
        let layer2 = futures::executor::block_on(provider.layer2_rules())
            .expect("sample pack should parse")
            .expect("layer2.json should exist");
        assert!((layer2.publication_threshold - 0.65).abs() < f64::EPSILON);
    }
}
