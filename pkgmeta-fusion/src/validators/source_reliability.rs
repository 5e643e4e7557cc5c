//! Source Reliability and Freshness
//!
//! # Reliability
//! `base ecosystem weight + 0.2 × completeness`, where completeness is the
//! fraction of {name, version, description} populated across the provider's
//! records.
//!
//! # Freshness
//! Halves every `freshness_half_life_days` from the newest `retrieved_at`
//! among the provider's records, floored at 0.1. Providers without any
//! timestamp get `default_freshness`.

use crate::types::{clamp_unit, Clock};
use pkgmeta_common::config::{ProviderTables, QualityConfig};
use pkgmeta_common::PackageRecord;
use std::collections::BTreeMap;

/// Maximum completeness bonus on top of the base weight
pub const COMPLETENESS_BONUS: f64 = 0.2;

/// Lowest freshness a timestamped provider can reach
pub const MIN_FRESHNESS: f64 = 0.1;

/// Fraction of {name, version, description} populated, averaged over records
pub fn completeness(records: &[PackageRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let total: usize = records
        .iter()
        .map(|r| {
            [
                !r.name.trim().is_empty(),
                r.version_text().is_some(),
                r.description_text().is_some(),
            ]
            .into_iter()
            .filter(|present| *present)
            .count()
        })
        .sum();
    total as f64 / (records.len() * 3) as f64
}

pub fn source_reliability(
    sources: &BTreeMap<String, Vec<PackageRecord>>,
    providers: &ProviderTables,
) -> BTreeMap<String, f64> {
    sources
        .iter()
        .map(|(provider, records)| {
            let score = providers.reliability(provider) + COMPLETENESS_BONUS * completeness(records);
            (provider.clone(), clamp_unit(score))
        })
        .collect()
}

pub fn data_freshness(
    sources: &BTreeMap<String, Vec<PackageRecord>>,
    quality: &QualityConfig,
    clock: &dyn Clock,
) -> BTreeMap<String, f64> {
    let now = clock.now();
    sources
        .iter()
        .map(|(provider, records)| {
            let newest = records.iter().filter_map(|r| r.retrieved_at).max();
            let score = match newest {
                None => quality.default_freshness,
                Some(at) => {
                    let age_days = ((now - at).num_seconds().max(0)) as f64 / 86_400.0;
                    0.5_f64
                        .powf(age_days / quality.freshness_half_life_days)
                        .max(MIN_FRESHNESS)
                }
            };
            (provider.clone(), clamp_unit(score))
        })
        .collect()
}
