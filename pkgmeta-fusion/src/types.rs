//! Core Types for the pkgmeta fusion engine
//!
//! Defines the data model shared by the two tiers:
//! - **Aggregation:** per-field observations (`DataPoint`) resolved into one
//!   value per field path (`AggregationResult`)
//! - **Validation:** per-field audit results (`FieldQuality`), cross-source
//!   comparisons (`CrossReferenceResult`) and the `QualityReport`
//!
//! All scores are clamped to 0.0-1.0 at construction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// Confidence score (0.0-1.0)
pub type Confidence = f64;

/// Field path → confidence, plus the `overall` entry
pub type ConfidenceMap = BTreeMap<String, Confidence>;

/// Field path → conflicting observations (diagnostics only)
pub type ConflictMap = BTreeMap<String, Vec<ConflictEntry>>;

/// Key of the aggregate entry in a `ConfidenceMap`
pub const OVERALL_KEY: &str = "overall";

pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

// ============================================================================
// Aggregation Types
// ============================================================================

/// One contributing source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Provider identifier
    pub provider: String,
    /// When the provider's record was retrieved
    pub timestamp: Option<DateTime<Utc>>,
    /// Tie-break priority (higher wins)
    pub priority: i32,
    /// Provider reliability (0.0-1.0)
    pub reliability: f64,
}

impl SourceInfo {
    pub fn new(provider: impl Into<String>, priority: i32, reliability: f64) -> Self {
        Self {
            provider: provider.into(),
            timestamp: None,
            priority,
            reliability: clamp_unit(reliability),
        }
    }

    pub fn with_timestamp(mut self, timestamp: Option<DateTime<Utc>>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// One observed value for one field path from one source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub value: Value,
    pub source: SourceInfo,
    /// Per-observation confidence (0.0-1.0)
    pub confidence: Confidence,
    /// Dot-separated field path, e.g. `urls.website`
    pub field_path: String,
}

impl DataPoint {
    /// Create a data point with clamped confidence
    pub fn new(
        field_path: impl Into<String>,
        value: Value,
        source: SourceInfo,
        confidence: Confidence,
    ) -> Self {
        Self {
            value,
            source,
            confidence: clamp_unit(confidence),
            field_path: field_path.into(),
        }
    }
}

/// Conflict-resolution strategy tag
///
/// Tags carry no behavior; `fusion::strategies::apply` dispatches on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictResolutionStrategy {
    HighestConfidence,
    MajorityVote,
    MostRecent,
    LongestValue,
    ProviderPriority,
    MergeLists,
    MergeDicts,
}

impl ConflictResolutionStrategy {
    pub const ALL: [ConflictResolutionStrategy; 7] = [
        Self::HighestConfidence,
        Self::MajorityVote,
        Self::MostRecent,
        Self::LongestValue,
        Self::ProviderPriority,
        Self::MergeLists,
        Self::MergeDicts,
    ];

    pub fn as_tag(&self) -> &'static str {
        match self {
            Self::HighestConfidence => "HIGHEST_CONFIDENCE",
            Self::MajorityVote => "MAJORITY_VOTE",
            Self::MostRecent => "MOST_RECENT",
            Self::LongestValue => "LONGEST_VALUE",
            Self::ProviderPriority => "PROVIDER_PRIORITY",
            Self::MergeLists => "MERGE_LISTS",
            Self::MergeDicts => "MERGE_DICTS",
        }
    }

    /// Parse a configuration tag (case-insensitive, `-` or `_` separated)
    ///
    /// Unknown tags fall back to `HighestConfidence` with a warning.
    pub fn from_tag(tag: &str) -> Self {
        let normalized = tag.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|s| s.as_tag() == normalized)
            .unwrap_or_else(|| {
                warn!(
                    "Unknown conflict resolution strategy '{}', using HIGHEST_CONFIDENCE",
                    tag
                );
                Self::HighestConfidence
            })
    }
}

impl fmt::Display for ConflictResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// Resolution of one field's data points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult {
    pub value: Value,
    pub confidence: Confidence,
    /// Sources contributing to the chosen value
    pub sources: Vec<SourceInfo>,
    /// Losing or conflicting observations
    pub conflicts: Vec<DataPoint>,
    pub strategy: ConflictResolutionStrategy,
}

/// One observation in a conflict report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictEntry {
    pub value: Value,
    pub provider: String,
    pub confidence: Confidence,
    pub priority: i32,
}

// ============================================================================
// Validation Types
// ============================================================================

/// One source's contribution to a field during auditing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceAttribution {
    pub provider: String,
    pub field_name: String,
    pub value: Value,
    pub confidence: Confidence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_method: Option<String>,
}

impl SourceAttribution {
    pub fn new(
        provider: impl Into<String>,
        field_name: impl Into<String>,
        value: Value,
        confidence: Confidence,
    ) -> Self {
        Self {
            provider: provider.into(),
            field_name: field_name.into(),
            value,
            confidence: clamp_unit(confidence),
            timestamp: None,
            url: None,
            verification_method: None,
        }
    }
}

/// Audit result for one field of a candidate record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldQuality {
    pub field_name: String,
    pub value: Value,
    pub confidence_score: f64,
    pub quality_score: f64,
    pub source_attributions: Vec<SourceAttribution>,
    /// Named sub-metric → value (0.0-1.0)
    pub accuracy_indicators: BTreeMap<String, f64>,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

/// A pair of providers that disagree on one cross-reference dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossReferenceConflict {
    pub provider1: String,
    pub provider2: String,
    pub value1: String,
    pub value2: String,
    /// How close the two values are, when meaningful (0.0-1.0)
    pub similarity: Option<f64>,
}

/// Comparison of one dimension across all raw sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossReferenceResult {
    pub field_name: String,
    /// Provider → reported value
    pub source_values: BTreeMap<String, String>,
    pub consensus_value: Option<String>,
    pub consensus_confidence: f64,
    pub conflicts: Vec<CrossReferenceConflict>,
    /// Fraction of provider pairs that do not conflict (0.0-1.0)
    pub agreement_score: f64,
}

/// Top-level audit output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub software_name: String,
    pub overall_quality_score: f64,
    pub overall_confidence_score: f64,
    pub field_qualities: BTreeMap<String, FieldQuality>,
    pub cross_references: BTreeMap<String, CrossReferenceResult>,
    pub source_reliability: BTreeMap<String, f64>,
    pub data_freshness: BTreeMap<String, f64>,
    pub consistency_issues: Vec<String>,
    pub recommendations: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

// ============================================================================
// Time Source
// ============================================================================

/// Time source for freshness scoring and report timestamps
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant (deterministic tests and replays)
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
