use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sitescreen_core::{
    band_confidence, domain, report,
    report::OutputFormat,
    BandThresholds, ContentClassifier, DecidedBy, DomainClassifier, FileRuleProvider, Layer1Rules,
    Layer2Rules, RuleProvider, ScreeningOutcome, Suitability,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "sitescreen",
    author,
    version,
    about = "Outreach-suitability screening CLI"
)]
struct Cli {
    /// Directory containing rule packs (layer1.json, layer2.json, thresholds.json)
    #[arg(
        long = "rules-dir",
        value_name = "DIR",
        default_value = "./rules",
        global = true
    )]
    rules_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the active rule packs (persisted or hardcoded defaults)
    ListRules {
        /// Emit rules as JSON instead of human-readable text
        #[arg(long)]
        json: bool,
    },
    /// Run Layer-1 domain screening over a file of URLs (one per line)
    Screen {
        /// Path to the URL list
        #[arg(long, value_name = "FILE")]
        urls: PathBuf,
        /// Emit per-URL verdicts as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the offline cascade (Layers 1+2, optional banding) on saved HTML
    Analyze {
        /// The URL the HTML was fetched from
        #[arg(long)]
        url: String,
        /// Path to the saved homepage HTML
        #[arg(long, value_name = "FILE")]
        html: PathBuf,
        /// Raw LLM confidence to band, if a judgment was already obtained
        #[arg(long)]
        score: Option<f64>,
        /// Detected signal strings for the boost (repeatable)
        #[arg(long = "signal")]
        signals: Vec<String>,
        /// Emit the full outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Band a raw LLM confidence score
    Band {
        /// Raw confidence in [0,1]
        #[arg(long)]
        score: f64,
        /// Detected signal strings (repeatable)
        #[arg(long = "signal")]
        signals: Vec<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let provider = FileRuleProvider::new(&cli.rules_dir);
    match cli.command {
        Commands::ListRules { json } => list_rules(&provider, &cli.rules_dir, json).await?,
        Commands::Screen { urls, json } => screen(&provider, &urls, json).await?,
        Commands::Analyze {
            url,
            html,
            score,
            signals,
            json,
        } => analyze(&provider, &url, &html, score, &signals, json).await?,
        Commands::Band { score, signals } => band(&provider, score, &signals).await?,
    }
    Ok(())
}

async fn list_rules(provider: &FileRuleProvider, rules_dir: &Path, json: bool) -> Result<()> {
    let layer1 = provider.layer1_rules().await?.unwrap_or_default();
    let layer2 = provider.layer2_rules().await?.unwrap_or_default();
    let thresholds = provider.band_thresholds().await?.unwrap_or_default();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "layer1": layer1,
                "layer2": layer2,
                "thresholds": thresholds,
            }))?
        );
        return Ok(());
    }

    println!("Rule packs from {}", rules_dir.display());
    println!(
        "layer 1: {} blog platforms, {} TLD suffixes, {} URL exclusions",
        layer1.blog_platforms.len(),
        layer1.non_commercial_tlds.len() + layer1.personal_tlds.len(),
        layer1.url_exclusions.len()
    );
    println!(
        "layer 2: publication threshold {:.2}, {} ad networks, {} payment providers",
        layer2.publication_threshold,
        layer2.ad_network_patterns.len(),
        layer2.payment_providers.len()
    );
    println!(
        "bands  : high {:.2} / medium {:.2} / low {:.2}",
        thresholds.high, thresholds.medium, thresholds.low
    );
    Ok(())
}

async fn screen(provider: &FileRuleProvider, urls_path: &Path, json: bool) -> Result<()> {
    let raw = fs::read_to_string(urls_path)
        .with_context(|| format!("failed to read URL list at {}", urls_path.display()))?;
    let urls: Vec<&str> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect();

    let rules: Layer1Rules = provider.layer1_rules().await?.unwrap_or_default();
    let classifier = DomainClassifier::new(rules);

    if json {
        let verdicts: Vec<_> = urls
            .iter()
            .map(|url| serde_json::json!({ "url": url, "verdict": classifier.analyze(url) }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&verdicts)?);
        return Ok(());
    }

    for url in &urls {
        let verdict = classifier.analyze(url);
        let mark = if verdict.passed { "pass" } else { "drop" };
        println!("{mark}  {url}  :: {}", verdict.reason);
    }
    let stats = classifier.elimination_stats(&urls);
    println!(
        "\n{} URLs: {} eliminated, {} passed ({:.1}% elimination)",
        stats.total, stats.eliminated, stats.passed, stats.elimination_rate
    );
    println!(
        "estimated savings: ${:.2} fetch, ${:.2} LLM",
        domain::estimated_fetch_savings(stats.eliminated),
        domain::estimated_llm_savings(stats.eliminated)
    );
    Ok(())
}

async fn analyze(
    provider: &FileRuleProvider,
    url: &str,
    html_path: &Path,
    score: Option<f64>,
    signals: &[String],
    json: bool,
) -> Result<()> {
    let html = fs::read_to_string(html_path)
        .with_context(|| format!("failed to read HTML at {}", html_path.display()))?;

    let layer1: Layer1Rules = provider.layer1_rules().await?.unwrap_or_default();
    let domain_verdict = DomainClassifier::new(layer1).analyze(url);
    let outcome = if !domain_verdict.passed {
        ScreeningOutcome {
            url: url.to_string(),
            decided_by: DecidedBy::Layer1,
            suitability: Suitability::NotSuitable,
            domain_verdict,
            content_verdict: None,
            content_signals: None,
            banded: None,
            rationale: None,
        }
    } else {
        let layer2: Layer2Rules = provider.layer2_rules().await?.unwrap_or_default();
        let (content_verdict, content_signals) = ContentClassifier::new(layer2).analyze(url, &html);
        if !content_verdict.passed {
            ScreeningOutcome {
                url: url.to_string(),
                decided_by: DecidedBy::Layer2,
                suitability: Suitability::NotSuitable,
                domain_verdict,
                content_verdict: Some(content_verdict),
                content_signals: Some(content_signals),
                banded: None,
                rationale: None,
            }
        } else {
            let thresholds: BandThresholds = provider.band_thresholds().await?.unwrap_or_default();
            let banded = score.map(|raw| band_confidence(raw, signals, &thresholds));
            let suitability = banded
                .map(|b| b.band.expected_classification())
                .unwrap_or(Suitability::Suitable);
            ScreeningOutcome {
                url: url.to_string(),
                decided_by: if banded.is_some() {
                    DecidedBy::Judgment
                } else {
                    DecidedBy::Layer2
                },
                suitability,
                domain_verdict,
                content_verdict: Some(content_verdict),
                content_signals: Some(content_signals),
                banded,
                rationale: None,
            }
        }
    };

    if json {
        println!("{}", report::render_outcome(&outcome, OutputFormat::Json)?);
    } else {
        print!("{}", report::render_outcome(&outcome, OutputFormat::Human)?);
    }
    Ok(())
}

async fn band(provider: &FileRuleProvider, score: f64, signals: &[String]) -> Result<()> {
    let thresholds: BandThresholds = provider.band_thresholds().await?.unwrap_or_default();
    let banded = band_confidence(score, signals, &thresholds);
    println!(
        "band: {:?} (raw {:.2}, boost {:+.2}, adjusted {:.2})",
        banded.band, banded.raw, banded.boost, banded.adjusted
    );
    println!("{}", banded.band.describe());
    println!("manual review required: {}", banded.band.requires_manual_review());
    Ok(())
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tokio=warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}
