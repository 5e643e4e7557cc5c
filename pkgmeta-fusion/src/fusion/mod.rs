//! Aggregation Tier - Field-Wise Conflict Resolution
//!
//! Turns N provider-specific package records into one merged metadata record
//! plus a per-field confidence map.
//!
//! # Pipeline
//! 1. Flatten every record into `DataPoint`s (see `data_points`)
//! 2. Group points by field path
//! 3. Resolve each group: single points are taken verbatim, multi-point
//!    groups go through the field's conflict-resolution strategy
//! 4. Write resolved values into the merged record at their dotted path
//! 5. Append the `packages` section (provider → name/version)
//!
//! The aggregator holds only read-only tables, so one instance can serve
//! concurrent callers.

pub mod data_points;
pub mod strategies;

use crate::types::{
    AggregationResult, ConfidenceMap, ConflictEntry, ConflictMap, ConflictResolutionStrategy,
    DataPoint, OVERALL_KEY,
};
use pkgmeta_common::config::{AggregationConfig, EngineConfig, ProviderTables};
use pkgmeta_common::value_path::{set_path, value_key};
use pkgmeta_common::PackageRecord;
use serde_json::{json, Map, Value};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, warn};

/// Confidence reported when nothing could be resolved
pub const NEUTRAL_CONFIDENCE: f64 = 0.5;

/// Multi-provider metadata aggregator
#[derive(Debug, Clone)]
pub struct Aggregator {
    providers: ProviderTables,
    field_strategies: HashMap<String, ConflictResolutionStrategy>,
    default_strategy: ConflictResolutionStrategy,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(ProviderTables::default(), &AggregationConfig::default())
    }
}

impl Aggregator {
    /// Create an aggregator from provider tables and strategy settings
    pub fn new(providers: ProviderTables, aggregation: &AggregationConfig) -> Self {
        let field_strategies = aggregation
            .field_strategies
            .iter()
            .map(|(field, tag)| (field.clone(), ConflictResolutionStrategy::from_tag(tag)))
            .collect();

        Self {
            providers,
            field_strategies,
            default_strategy: ConflictResolutionStrategy::from_tag(&aggregation.default_strategy),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.providers.clone(), &config.aggregation)
    }

    /// Strategy used for fields without an explicit override
    pub fn with_default_strategy(mut self, strategy: ConflictResolutionStrategy) -> Self {
        self.default_strategy = strategy;
        self
    }

    /// Override the strategy for one field path
    pub fn with_field_strategy(
        mut self,
        field_path: impl Into<String>,
        strategy: ConflictResolutionStrategy,
    ) -> Self {
        self.field_strategies.insert(field_path.into(), strategy);
        self
    }

    /// Strategy for a field path (exact match, else the default)
    pub fn strategy_for(&self, field_path: &str) -> ConflictResolutionStrategy {
        self.field_strategies
            .get(field_path)
            .copied()
            .unwrap_or(self.default_strategy)
    }

    pub fn providers(&self) -> &ProviderTables {
        &self.providers
    }

    /// Flatten all records into data points, in input order
    pub fn data_points(&self, sources: &[PackageRecord]) -> Vec<DataPoint> {
        sources
            .iter()
            .flat_map(|record| data_points::extract_data_points(record, &self.providers))
            .collect()
    }

    /// Resolve one field's data points
    ///
    /// A single point is returned verbatim; multiple points go through the
    /// field's strategy. Returns `None` for an empty list.
    pub fn resolve(&self, field_path: &str, points: &[DataPoint]) -> Option<AggregationResult> {
        let strategy = self.strategy_for(field_path);
        match points {
            [] => None,
            [only] => Some(AggregationResult {
                value: only.value.clone(),
                confidence: only.confidence,
                sources: vec![only.source.clone()],
                conflicts: Vec::new(),
                strategy,
            }),
            _ => strategies::apply(strategy, points),
        }
    }

    /// Aggregate provider records into a merged record and confidence map
    ///
    /// The confidence map always carries `overall`: the mean of all other
    /// entries, or 0.5 when none exist.
    pub fn aggregate(&self, software_name: &str, sources: &[PackageRecord]) -> (Value, ConfidenceMap) {
        let mut confidence = ConfidenceMap::new();

        if sources.is_empty() {
            debug!("No sources to aggregate for '{}'", software_name);
            confidence.insert(OVERALL_KEY.to_string(), NEUTRAL_CONFIDENCE);
            return (Value::Object(Map::new()), confidence);
        }

        let groups = data_points::group_by_field(self.data_points(sources));
        let mut record = Value::Object(Map::new());
        let mut conflicted_fields = 0;

        for (field_path, points) in &groups {
            let Some(result) = self.resolve(field_path, points) else {
                continue;
            };
            if !result.conflicts.is_empty() {
                conflicted_fields += 1;
                debug!(
                    field = %field_path,
                    strategy = %result.strategy,
                    losing = result.conflicts.len(),
                    "Field had conflicting values"
                );
            }
            set_path(&mut record, field_path, result.value);
            confidence.insert(field_path.clone(), result.confidence);
        }

        let overall = if confidence.is_empty() {
            NEUTRAL_CONFIDENCE
        } else {
            confidence.values().sum::<f64>() / confidence.len() as f64
        };
        confidence.insert(OVERALL_KEY.to_string(), overall);

        record["packages"] = Value::Object(package_section(sources));

        info!(
            "Aggregated '{}': {} sources, {} fields ({} conflicted), overall confidence {:.3}",
            software_name,
            sources.len(),
            groups.len(),
            conflicted_fields,
            overall
        );

        (record, confidence)
    }

    /// Fields where at least two sources report different values
    ///
    /// Diagnostics only; does not influence `aggregate`.
    pub fn conflict_report(&self, software_name: &str, sources: &[PackageRecord]) -> ConflictMap {
        let groups = data_points::group_by_field(self.data_points(sources));

        let report: ConflictMap = groups
            .into_iter()
            .filter(|(_, points)| {
                let distinct: BTreeSet<String> =
                    points.iter().map(|p| value_key(&p.value)).collect();
                distinct.len() >= 2
            })
            .map(|(field_path, points)| {
                let entries = points
                    .into_iter()
                    .map(|p| ConflictEntry {
                        value: p.value,
                        provider: p.source.provider,
                        confidence: p.confidence,
                        priority: p.source.priority,
                    })
                    .collect();
                (field_path, entries)
            })
            .collect();

        if !report.is_empty() {
            warn!(
                "Conflicting values for '{}' in {} field(s): {}",
                software_name,
                report.len(),
                report.keys().cloned().collect::<Vec<_>>().join(", ")
            );
        }

        report
    }
}

/// provider → {name, version}, first record per provider wins
fn package_section(sources: &[PackageRecord]) -> Map<String, Value> {
    let mut packages = Map::new();
    for record in sources {
        if packages.contains_key(&record.provider) {
            debug!(
                "Duplicate record for provider '{}' ignored in packages section",
                record.provider
            );
            continue;
        }
        packages.insert(
            record.provider.clone(),
            json!({
                "name": record.name,
                "version": record.version_or_latest(),
            }),
        );
    }
    packages
}

/// Field paths whose confidence falls below `threshold`, sorted
///
/// The `overall` entry is never reported. Downstream completion uses this
/// to pick which gaps to fill.
pub fn low_confidence_fields(confidence: &ConfidenceMap, threshold: f64) -> Vec<String> {
    confidence
        .iter()
        .filter(|(field, score)| field.as_str() != OVERALL_KEY && **score < threshold)
        .map(|(field, _)| field.clone())
        .collect()
}
