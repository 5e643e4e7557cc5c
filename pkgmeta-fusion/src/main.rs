//! pkgmeta-fusion - Multi-provider package metadata fusion
//!
//! Reads provider records for one package from a JSON file, aggregates them
//! into a merged record, audits the result and prints everything as JSON.
//!
//! Input:
//! ```json
//! { "software_name": "nginx", "sources": [ { "name": "nginx", "provider": "apt", ... } ] }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use pkgmeta_common::config::load_config;
use pkgmeta_common::logging::init_tracing;
use pkgmeta_common::{Error, PackageRecord};
use pkgmeta_fusion::{Aggregator, QualityAuditor};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

/// Command-line arguments for pkgmeta-fusion
#[derive(Parser, Debug)]
#[command(name = "pkgmeta-fusion")]
#[command(about = "Merge and audit package metadata from multiple providers")]
#[command(version)]
struct Args {
    /// JSON file with `software_name` and `sources`
    #[arg(short, long)]
    input: PathBuf,

    /// Engine configuration file (TOML)
    #[arg(short, long, env = "PKGMETA_CONFIG")]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is unset
    #[arg(short, long)]
    log_level: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FusionInput {
    software_name: String,
    #[serde(default)]
    sources: Vec<PackageRecord>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    init_tracing(&config.logging).context("Failed to initialize tracing")?;

    info!("Starting pkgmeta-fusion v{}", env!("CARGO_PKG_VERSION"));

    let content = fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read input file {}", args.input.display()))?;
    let input: FusionInput = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse input file {}", args.input.display()))?;

    if input.software_name.trim().is_empty() {
        return Err(Error::InvalidInput("software_name must not be empty".to_string()).into());
    }

    info!(
        "Loaded {} source records for '{}'",
        input.sources.len(),
        input.software_name
    );

    let aggregator = Aggregator::from_config(&config);
    let auditor = QualityAuditor::from_config(&config);

    let (merged_record, confidence) = aggregator.aggregate(&input.software_name, &input.sources);
    let conflicts = aggregator.conflict_report(&input.software_name, &input.sources);

    let mut by_provider: BTreeMap<String, Vec<PackageRecord>> = BTreeMap::new();
    for record in &input.sources {
        by_provider
            .entry(record.provider.clone())
            .or_default()
            .push(record.clone());
    }
    let quality_report = auditor.assess(&merged_record, &by_provider, &input.software_name);

    let output = json!({
        "merged_record": merged_record,
        "confidence": confidence,
        "conflicts": conflicts,
        "quality_report": quality_report,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&output).context("Failed to serialize output")?
    );

    Ok(())
}
