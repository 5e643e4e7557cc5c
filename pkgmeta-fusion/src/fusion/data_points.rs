//! Flattening of provider records into field-level observations
//!
//! Each record contributes at most one `DataPoint` per field path. Missing,
//! blank or mistyped details are skipped rather than reported.
//!
//! # Confidence Heuristics
//! Base confidence is the provider's reliability weight, then:
//! - `description`: × `0.5 + 0.5 × min(chars / 100, 1)`
//! - `license`: × 1.1 for a well-known SPDX identifier
//! - `urls.*`: × 1.05 for `https://` URLs
//! - `platforms`: × `0.7 + 0.3 × min(count / 5, 1)`
//!
//! The result is capped at 1.0.

use crate::types::{clamp_unit, Confidence, DataPoint, SourceInfo};
use pkgmeta_common::config::ProviderTables;
use pkgmeta_common::PackageRecord;
use serde_json::Value;
use std::collections::BTreeMap;

/// Licenses that earn the well-known bonus
pub const WELL_KNOWN_LICENSES: &[&str] = &[
    "MIT",
    "Apache-2.0",
    "GPL-3.0",
    "GPL-2.0",
    "BSD-3-Clause",
    "BSD-2-Clause",
    "ISC",
    "MPL-2.0",
    "LGPL-3.0",
];

/// Record detail key → merged-record field path
pub(crate) const URL_DETAILS: &[(&str, &str)] = &[
    ("homepage", "urls.website"),
    ("source_url", "urls.source"),
    ("download_url", "urls.download"),
    ("license_url", "urls.license"),
];

/// Build the `SourceInfo` for one provider record
pub fn source_info(record: &PackageRecord, providers: &ProviderTables) -> SourceInfo {
    SourceInfo::new(
        record.provider.clone(),
        providers.priority(&record.provider),
        providers.reliability(&record.provider),
    )
    .with_timestamp(record.retrieved_at)
}

/// Flatten one record into data points
pub fn extract_data_points(record: &PackageRecord, providers: &ProviderTables) -> Vec<DataPoint> {
    let source = source_info(record, providers);
    let mut points = Vec::new();

    let mut push = |path: &str, value: Value| {
        let confidence = point_confidence(path, &value, source.reliability);
        points.push(DataPoint::new(path, value, source.clone(), confidence));
    };

    if let Some(description) = record.description_text() {
        push("description", Value::from(description));
    }

    if let Some(license) = record.detail_str("license") {
        push("license", Value::from(license));
    }

    for (detail, path) in URL_DETAILS {
        if let Some(url) = record.detail_str(detail) {
            push(*path, Value::from(url));
        }
    }

    if let Some(platforms) = record.detail_list("platforms") {
        push("platforms", Value::from(platforms));
    }

    points
}

/// Field-specific confidence for one observation
pub fn point_confidence(field_path: &str, value: &Value, reliability: f64) -> Confidence {
    let factor = match field_path {
        "description" => value
            .as_str()
            .map(|d| 0.5 + 0.5 * (d.chars().count() as f64 / 100.0).min(1.0))
            .unwrap_or(1.0),
        "license" => {
            if value.as_str().is_some_and(is_well_known_license) {
                1.1
            } else {
                1.0
            }
        }
        "platforms" => value
            .as_array()
            .map(|p| 0.7 + 0.3 * (p.len() as f64 / 5.0).min(1.0))
            .unwrap_or(1.0),
        path if path.starts_with("urls.") => {
            if value.as_str().is_some_and(|u| u.starts_with("https://")) {
                1.05
            } else {
                1.0
            }
        }
        _ => 1.0,
    };

    clamp_unit(reliability * factor)
}

pub fn is_well_known_license(license: &str) -> bool {
    WELL_KNOWN_LICENSES.contains(&license)
}

/// Group observations by field path, keeping input order within each group
pub fn group_by_field(points: Vec<DataPoint>) -> BTreeMap<String, Vec<DataPoint>> {
    points.into_iter().fold(BTreeMap::new(), |mut groups, point| {
        groups
            .entry(point.field_path.clone())
            .or_insert_with(Vec::new)
            .push(point);
        groups
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn nginx_apt() -> PackageRecord {
        PackageRecord::new("nginx", "apt")
            .with_version("1.18.0")
            .with_description("High-performance HTTP server and reverse proxy")
            .with_detail("license", json!("BSD"))
            .with_detail("homepage", json!("https://nginx.org"))
            .with_detail("download_url", json!("http://nginx.org/download"))
            .with_detail("platforms", json!(["linux", "debian", "ubuntu"]))
    }

    #[test]
    fn test_extract_all_fields() {
        let points = extract_data_points(&nginx_apt(), &ProviderTables::default());
        let paths: Vec<&str> = points.iter().map(|p| p.field_path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["description", "license", "urls.website", "urls.download", "platforms"]
        );
        assert!(points.iter().all(|p| p.source.provider == "apt"));
        assert!(points.iter().all(|p| p.source.priority == 10));
    }

    #[test]
    fn test_missing_and_mistyped_fields_skipped() {
        let record = PackageRecord::new("thing", "npm")
            .with_description("   ")
            .with_detail("license", json!({"spdx": "MIT"}))
            .with_detail("platforms", json!("linux"));
        assert!(extract_data_points(&record, &ProviderTables::default()).is_empty());
    }

    #[test]
    fn test_description_length_factor() {
        let short = point_confidence("description", &json!("x".repeat(50)), 0.9);
        assert!((short - 0.9 * 0.75).abs() < 1e-9);

        let long = point_confidence("description", &json!("x".repeat(250)), 0.9);
        assert!((long - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_license_bonus_capped() {
        let known = point_confidence("license", &json!("MIT"), 0.95);
        assert_eq!(known, 1.0);

        let unknown = point_confidence("license", &json!("BSD"), 0.95);
        assert!((unknown - 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_url_https_bonus() {
        let https = point_confidence("urls.website", &json!("https://nginx.org"), 0.9);
        let http = point_confidence("urls.website", &json!("http://nginx.org"), 0.9);
        assert!((https - 0.945).abs() < 1e-9);
        assert!((http - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_platform_count_factor() {
        let three = point_confidence("platforms", &json!(["a", "b", "c"]), 1.0);
        assert!((three - 0.88).abs() < 1e-9);

        let many = point_confidence("platforms", &json!(["a", "b", "c", "d", "e", "f"]), 0.8);
        assert!((many - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_group_by_field_keeps_input_order() {
        let tables = ProviderTables::default();
        let mut points = extract_data_points(&nginx_apt(), &tables);
        points.extend(extract_data_points(
            &PackageRecord::new("nginx", "homebrew").with_detail("license", json!("BSD-2-Clause")),
            &tables,
        ));

        let groups = group_by_field(points);
        let licenses = &groups["license"];
        assert_eq!(licenses.len(), 2);
        assert_eq!(licenses[0].source.provider, "apt");
        assert_eq!(licenses[1].source.provider, "homebrew");
    }
}
