//! Normalized per-provider package record
//!
//! This is the shape handed over by the fetch layer: one record per
//! (provider, package) pair, with provider-specific extras under `details`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One package description as reported by a single provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageRecord {
    /// Package name within the provider's namespace
    pub name: String,
    /// Provider identifier (e.g. "apt", "npm", "homebrew")
    pub provider: String,
    /// Reported version, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Free-text description, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Provider-specific keys: license, homepage, source_url, download_url,
    /// license_url, platforms, ...
    #[serde(default)]
    pub details: Map<String, Value>,
    /// When the fetch layer retrieved this record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieved_at: Option<DateTime<Utc>>,
}

impl PackageRecord {
    pub fn new(name: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            provider: provider.into(),
            ..Default::default()
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }

    pub fn with_retrieved_at(mut self, at: DateTime<Utc>) -> Self {
        self.retrieved_at = Some(at);
        self
    }

    /// Non-empty string detail, trimmed
    pub fn detail_str(&self, key: &str) -> Option<&str> {
        self.details
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// List-of-strings detail; non-string entries are dropped
    pub fn detail_list(&self, key: &str) -> Option<Vec<String>> {
        let items: Vec<String> = self
            .details
            .get(key)?
            .as_array()?
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        if items.is_empty() {
            None
        } else {
            Some(items)
        }
    }

    /// Non-empty description, trimmed
    pub fn description_text(&self) -> Option<&str> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Non-empty version, trimmed
    pub fn version_text(&self) -> Option<&str> {
        self.version
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn version_or_latest(&self) -> &str {
        self.version_text().unwrap_or("latest")
    }
}
