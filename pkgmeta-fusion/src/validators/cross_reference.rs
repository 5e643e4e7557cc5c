//! Cross-Reference Validation
//!
//! Compares raw provider data (not the merged record) along four
//! dimensions: package names, descriptions, versions and licenses.
//!
//! Each provider contributes its first populated value. Pairs of providers
//! are compared in provider-name order; `agreement_score` counts every
//! disagreeing pair, while the `conflicts` list keeps one entry per distinct
//! pair of values.

use crate::types::{clamp_unit, CrossReferenceConflict, CrossReferenceResult};
use once_cell::sync::Lazy;
use pkgmeta_common::text::text_similarity;
use pkgmeta_common::PackageRecord;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Descriptions below this similarity conflict
pub const DESCRIPTION_CONFLICT_THRESHOLD: f64 = 0.5;

static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("digit regex"));

/// Cross-reference dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    PackageNames,
    Descriptions,
    Versions,
    Licenses,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Self::PackageNames,
        Self::Descriptions,
        Self::Versions,
        Self::Licenses,
    ];

    /// Key used in `QualityReport::cross_references`
    pub fn key(&self) -> &'static str {
        match self {
            Self::PackageNames => "package_names",
            Self::Descriptions => "descriptions",
            Self::Versions => "versions",
            Self::Licenses => "licenses",
        }
    }

    /// First populated value of this dimension in a provider's records
    fn extract(&self, records: &[PackageRecord]) -> Option<String> {
        records.iter().find_map(|record| match self {
            Self::PackageNames => Some(record.name.trim())
                .filter(|n| !n.is_empty())
                .map(str::to_string),
            Self::Descriptions => record.description_text().map(str::to_string),
            Self::Versions => record.version_text().map(str::to_string),
            Self::Licenses => record.detail_str("license").map(normalize_license),
        })
    }
}

/// Normalize a license string by keyword
///
/// Unmatched values are returned trimmed.
pub fn normalize_license(license: &str) -> String {
    let lower = license.to_lowercase();
    if lower.contains("mit") {
        "MIT".to_string()
    } else if lower.contains("apache") && lower.contains('2') {
        "Apache-2.0".to_string()
    } else if lower.contains("gpl") && lower.contains('3') {
        "GPL-3.0".to_string()
    } else if lower.contains("bsd") {
        "BSD".to_string()
    } else {
        license.trim().to_string()
    }
}

/// Digit groups of a version string as integers
pub fn version_tuple(version: &str) -> Vec<u64> {
    DIGITS
        .find_iter(version)
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

/// Run all dimensions; dimensions with no values are omitted
pub fn cross_reference(
    sources: &BTreeMap<String, Vec<PackageRecord>>,
) -> BTreeMap<String, CrossReferenceResult> {
    Dimension::ALL
        .iter()
        .filter_map(|dimension| {
            validate(*dimension, sources).map(|result| (dimension.key().to_string(), result))
        })
        .collect()
}

/// Validate one dimension; `None` when no provider has a value
pub fn validate(
    dimension: Dimension,
    sources: &BTreeMap<String, Vec<PackageRecord>>,
) -> Option<CrossReferenceResult> {
    let values: Vec<(String, String)> = sources
        .iter()
        .filter_map(|(provider, records)| {
            dimension.extract(records).map(|v| (provider.clone(), v))
        })
        .collect();

    if values.is_empty() {
        return None;
    }

    let result = match dimension {
        Dimension::PackageNames | Dimension::Licenses => by_vote(dimension, &values),
        Dimension::Descriptions => by_similarity(&values),
        Dimension::Versions => by_version(&values),
    };

    debug!(
        dimension = dimension.key(),
        providers = values.len(),
        agreement = result.agreement_score,
        conflicts = result.conflicts.len(),
        "Cross-reference complete"
    );

    Some(result)
}

/// Pairwise comparison shared by all dimensions
///
/// Returns (deduplicated conflicts, raw disagreeing pair count).
fn pairwise_conflicts<F>(values: &[(String, String)], conflicting: F) -> (Vec<CrossReferenceConflict>, usize)
where
    F: Fn(&str, &str) -> Option<f64>,
{
    let mut conflicts = Vec::new();
    let mut seen: BTreeSet<(String, String)> = BTreeSet::new();
    let mut raw = 0;

    for (i, (provider1, value1)) in values.iter().enumerate() {
        for (provider2, value2) in &values[i + 1..] {
            let Some(similarity) = conflicting(value1.as_str(), value2.as_str()) else {
                continue;
            };
            raw += 1;

            let pair = if value1 <= value2 {
                (value1.clone(), value2.clone())
            } else {
                (value2.clone(), value1.clone())
            };
            if seen.insert(pair) {
                conflicts.push(CrossReferenceConflict {
                    provider1: provider1.clone(),
                    provider2: provider2.clone(),
                    value1: value1.clone(),
                    value2: value2.clone(),
                    similarity: Some(clamp_unit(similarity)),
                });
            }
        }
    }

    (conflicts, raw)
}

fn agreement(raw_conflicts: usize, providers: usize) -> f64 {
    let pairs = providers * providers.saturating_sub(1) / 2;
    clamp_unit(1.0 - raw_conflicts as f64 / pairs.max(1) as f64)
}

fn build_result(
    field_name: &str,
    values: &[(String, String)],
    consensus_value: Option<String>,
    consensus_confidence: f64,
    (conflicts, raw): (Vec<CrossReferenceConflict>, usize),
) -> CrossReferenceResult {
    CrossReferenceResult {
        field_name: field_name.to_string(),
        source_values: values.iter().cloned().collect(),
        consensus_value,
        consensus_confidence: clamp_unit(consensus_confidence),
        conflicts,
        agreement_score: agreement(raw, values.len()),
    }
}

/// Most frequent value wins; ties go to the first provider
fn by_vote(dimension: Dimension, values: &[(String, String)]) -> CrossReferenceResult {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for (_, value) in values {
        match counts.iter().position(|(v, _)| *v == value.as_str()) {
            Some(i) => counts[i].1 += 1,
            None => counts.push((value.as_str(), 1)),
        }
    }

    let mut winner = 0;
    for (i, (_, count)) in counts.iter().enumerate().skip(1) {
        if *count > counts[winner].1 {
            winner = i;
        }
    }
    let (consensus, votes) = counts[winner];

    let conflicts = pairwise_conflicts(values, |a, b| {
        (a != b).then(|| strsim::normalized_levenshtein(a, b))
    });

    build_result(
        dimension.key(),
        values,
        Some(consensus.to_string()),
        votes as f64 / values.len() as f64,
        conflicts,
    )
}

/// Value with the highest mean similarity to the others wins
fn by_similarity(values: &[(String, String)]) -> CrossReferenceResult {
    let n = values.len();
    let mut best = 0;
    let mut best_score = if n == 1 { 1.0 } else { f64::MIN };

    if n > 1 {
        for (i, (_, candidate)) in values.iter().enumerate() {
            let total: f64 = values
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, (_, other))| text_similarity(candidate, other))
                .sum();
            let mean = total / (n - 1) as f64;
            if mean > best_score {
                best = i;
                best_score = mean;
            }
        }
    }

    let conflicts = pairwise_conflicts(values, |a, b| {
        let similarity = text_similarity(a, b);
        (similarity < DESCRIPTION_CONFLICT_THRESHOLD).then_some(similarity)
    });

    build_result(
        Dimension::Descriptions.key(),
        values,
        Some(values[best].1.clone()),
        best_score,
        conflicts,
    )
}

/// Greatest numeric tuple wins; conflicts differ in the leading component
fn by_version(values: &[(String, String)]) -> CrossReferenceResult {
    let mut best = 0;
    let mut best_tuple = version_tuple(&values[0].1);
    for (i, (_, version)) in values.iter().enumerate().skip(1) {
        let tuple = version_tuple(version);
        if tuple > best_tuple {
            best = i;
            best_tuple = tuple;
        }
    }

    let consensus = values[best].1.clone();
    let matching = values.iter().filter(|(_, v)| *v == consensus).count();

    let conflicts = pairwise_conflicts(values, |a, b| {
        let major_a = version_tuple(a).first().copied();
        let major_b = version_tuple(b).first().copied();
        (major_a != major_b).then(|| strsim::normalized_levenshtein(a, b))
    });

    build_result(
        Dimension::Versions.key(),
        values,
        Some(consensus),
        matching as f64 / values.len() as f64,
        conflicts,
    )
}
