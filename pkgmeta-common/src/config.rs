//! Configuration loading and provider/scoring tables
//!
//! Config file resolution follows this priority order:
//! 1. Explicit path (command-line argument)
//! 2. `PKGMETA_CONFIG` environment variable
//! 3. `<user config dir>/pkgmeta/config.toml`
//! 4. Compiled defaults (fallback)
//!
//! A config file only needs to carry the entries it changes: table entries
//! are merged over the compiled defaults key by key.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "PKGMETA_CONFIG";

/// Ecosystem tiers and their default reliability weights
const SYSTEM_PACKAGE_MANAGERS: &[&str] = &["apt", "dnf", "yum", "pacman", "zypper", "apk", "portage"];
const LANGUAGE_REGISTRIES: &[&str] = &[
    "pypi", "npm", "crates", "cargo", "rubygems", "maven", "nuget", "go", "packagist", "hex",
    "cpan", "cran", "hackage", "pub",
];
const CONTAINER_REGISTRIES: &[&str] = &["docker", "quay", "ghcr"];
const UNIVERSAL_PACKAGERS: &[&str] = &["snap", "flatpak", "appimage"];
const SOURCE_BUILD_SYSTEMS: &[&str] = &["conan", "vcpkg", "spack"];
const THIRD_PARTY_MANAGERS: &[(&str, f64)] = &[
    ("homebrew", 0.85),
    ("winget", 0.85),
    ("macports", 0.85),
    ("nix", 0.85),
    ("chocolatey", 0.80),
    ("scoop", 0.80),
];

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub providers: ProviderTables,
    pub aggregation: AggregationConfig,
    pub quality: QualityConfig,
    pub logging: LoggingConfig,
}

/// Per-provider reliability and priority tables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderTables {
    /// Provider → reliability weight in [0, 1]
    pub reliability: HashMap<String, f64>,
    /// Provider → tie-break priority (higher wins)
    pub priority: HashMap<String, i32>,
    /// Reliability of providers missing from the table
    pub unknown_reliability: f64,
    /// Priority of providers missing from the table
    pub unknown_priority: i32,
}

impl Default for ProviderTables {
    fn default() -> Self {
        let mut reliability = HashMap::new();
        let mut priority = HashMap::new();

        let mut tier = |names: &[&str], weight: f64, rank: i32| {
            for name in names {
                reliability.insert(name.to_string(), weight);
                priority.insert(name.to_string(), rank);
            }
        };
        tier(SYSTEM_PACKAGE_MANAGERS, 0.95, 10);
        tier(LANGUAGE_REGISTRIES, 0.90, 9);
        tier(CONTAINER_REGISTRIES, 0.85, 7);
        tier(SOURCE_BUILD_SYSTEMS, 0.85, 7);
        tier(UNIVERSAL_PACKAGERS, 0.80, 6);
        for (name, weight) in THIRD_PARTY_MANAGERS {
            reliability.insert(name.to_string(), *weight);
            priority.insert(name.to_string(), 8);
        }

        Self {
            reliability,
            priority,
            unknown_reliability: 0.70,
            unknown_priority: 5,
        }
    }
}

impl ProviderTables {
    /// Reliability weight for a provider (case-insensitive), clamped to [0, 1]
    pub fn reliability(&self, provider: &str) -> f64 {
        self.reliability
            .get(&provider.to_lowercase())
            .copied()
            .unwrap_or(self.unknown_reliability)
            .clamp(0.0, 1.0)
    }

    /// Tie-break priority for a provider (case-insensitive)
    pub fn priority(&self, provider: &str) -> i32 {
        self.priority
            .get(&provider.to_lowercase())
            .copied()
            .unwrap_or(self.unknown_priority)
    }
}

/// Conflict-resolution settings for the aggregator
///
/// Strategy tags are kept as strings here and parsed by the fusion crate,
/// which falls back to `HIGHEST_CONFIDENCE` for unknown tags.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    pub default_strategy: String,
    /// Field path → strategy tag
    pub field_strategies: HashMap<String, String>,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        let field_strategies = [
            ("description", "LONGEST_VALUE"),
            ("license", "MAJORITY_VOTE"),
            ("platforms", "MERGE_LISTS"),
            ("urls", "MERGE_DICTS"),
            ("version", "MOST_RECENT"),
            ("name", "PROVIDER_PRIORITY"),
        ]
        .into_iter()
        .map(|(field, tag)| (field.to_string(), tag.to_string()))
        .collect();

        Self {
            default_strategy: "HIGHEST_CONFIDENCE".to_string(),
            field_strategies,
        }
    }
}

/// Quality auditor weights and thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Field → importance weight for the overall scores
    pub field_importance: HashMap<String, f64>,
    /// Importance of fields missing from the table
    pub default_importance: f64,
    /// Confidence assigned to each raw source attribution
    pub attribution_confidence: f64,
    /// Freshness of providers that carry no retrieval timestamp
    pub default_freshness: f64,
    /// Age at which timestamped freshness halves
    pub freshness_half_life_days: f64,
    /// Fields below this confidence get a verification recommendation
    pub min_field_confidence: f64,
    /// Fields below this quality get an improvement recommendation
    pub min_field_quality: f64,
    /// Cross-references below this agreement get a resolution recommendation
    pub min_agreement: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        let field_importance = [
            ("name", 1.0),
            ("description", 0.8),
            ("version", 0.7),
            ("license", 0.6),
            ("homepage", 0.6),
            ("source_url", 0.5),
            ("platforms", 0.5),
            ("category", 0.4),
            ("dependencies", 0.3),
        ]
        .into_iter()
        .map(|(field, weight)| (field.to_string(), weight))
        .collect();

        Self {
            field_importance,
            default_importance: 0.5,
            attribution_confidence: 0.8,
            default_freshness: 0.8,
            freshness_half_life_days: 90.0,
            min_field_confidence: 0.7,
            min_field_quality: 0.6,
            min_agreement: 0.7,
        }
    }
}

impl QualityConfig {
    pub fn importance(&self, field: &str) -> f64 {
        self.field_importance
            .get(field)
            .copied()
            .unwrap_or(self.default_importance)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse a TOML document, merging its tables over the compiled defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: EngineConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.merge_defaults();
        config.validate()?;
        Ok(config)
    }

    /// Fill table entries the file did not mention from the compiled defaults
    fn merge_defaults(&mut self) {
        // Provider lookups are case-insensitive
        self.providers.reliability = std::mem::take(&mut self.providers.reliability)
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect();
        self.providers.priority = std::mem::take(&mut self.providers.priority)
            .into_iter()
            .map(|(k, v)| (k.to_lowercase(), v))
            .collect();

        let providers = ProviderTables::default();
        for (name, weight) in providers.reliability {
            self.providers.reliability.entry(name).or_insert(weight);
        }
        for (name, rank) in providers.priority {
            self.providers.priority.entry(name).or_insert(rank);
        }

        for (field, tag) in AggregationConfig::default().field_strategies {
            self.aggregation.field_strategies.entry(field).or_insert(tag);
        }
        for (field, weight) in QualityConfig::default().field_importance {
            self.quality.field_importance.entry(field).or_insert(weight);
        }
    }

    /// Reject weights and thresholds outside [0, 1]
    fn validate(&self) -> Result<()> {
        let unit = |name: &str, value: f64| -> Result<()> {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(Error::Config(format!(
                    "{} must be within 0.0-1.0 (got {})",
                    name, value
                )))
            }
        };

        for (provider, weight) in &self.providers.reliability {
            unit(&format!("providers.reliability.{}", provider), *weight)?;
        }
        unit("providers.unknown_reliability", self.providers.unknown_reliability)?;
        for (field, weight) in &self.quality.field_importance {
            unit(&format!("quality.field_importance.{}", field), *weight)?;
        }
        unit("quality.default_importance", self.quality.default_importance)?;
        unit("quality.attribution_confidence", self.quality.attribution_confidence)?;
        unit("quality.default_freshness", self.quality.default_freshness)?;
        unit("quality.min_field_confidence", self.quality.min_field_confidence)?;
        unit("quality.min_field_quality", self.quality.min_field_quality)?;
        unit("quality.min_agreement", self.quality.min_agreement)?;

        if self.quality.freshness_half_life_days <= 0.0 {
            return Err(Error::Config(format!(
                "quality.freshness_half_life_days must be positive (got {})",
                self.quality.freshness_half_life_days
            )));
        }
        Ok(())
    }
}

/// Resolve which config file to use, if any
///
/// Returns `None` when neither an explicit path, the environment variable,
/// nor a user config file is available.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: User config directory
    dirs::config_dir()
        .map(|d| d.join("pkgmeta").join("config.toml"))
        .filter(|path| path.exists())
}

/// Load the engine configuration
///
/// Missing files degrade to compiled defaults with a warning; a file that
/// exists but cannot be parsed or validated is an error.
pub fn load_config(cli_arg: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = resolve_config_path(cli_arg) else {
        info!("No config file found, using compiled defaults");
        return Ok(EngineConfig::default());
    };

    if !path.exists() {
        warn!(
            "Config file {} not found, using compiled defaults",
            path.display()
        );
        return Ok(EngineConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config = EngineConfig::from_toml_str(&content)?;
    info!("Configuration loaded from {}", path.display());
    Ok(config)
}
