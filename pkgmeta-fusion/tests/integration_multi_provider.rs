//! Multi-provider aggregation integration tests
//!
//! Exercises `Aggregator` end to end over realistic provider records.

use chrono::{TimeZone, Utc};
use pkgmeta_common::config::EngineConfig;
use pkgmeta_common::PackageRecord;
use pkgmeta_fusion::types::{DataPoint, OVERALL_KEY};
use pkgmeta_fusion::{low_confidence_fields, Aggregator, ConflictResolutionStrategy, SourceInfo};
use serde_json::json;

fn nginx_apt() -> PackageRecord {
    PackageRecord::new("nginx", "apt")
        .with_version("1.18.0")
        .with_description("High-performance HTTP server and reverse proxy")
        .with_detail("license", json!("BSD"))
        .with_detail("homepage", json!("https://nginx.org"))
        .with_detail("platforms", json!(["linux", "debian", "ubuntu"]))
}

fn nginx_sources() -> Vec<PackageRecord> {
    vec![
        nginx_apt(),
        PackageRecord::new("nginx", "homebrew")
            .with_version("1.25.3")
            .with_description("HTTP(S) server and reverse proxy, and IMAP/POP3 proxy server")
            .with_detail("license", json!("BSD-2-Clause"))
            .with_detail("homepage", json!("https://nginx.org/"))
            .with_detail("source_url", json!("https://github.com/nginx/nginx"))
            .with_detail("platforms", json!(["macos", "linux"])),
        PackageRecord::new("nginx", "docker")
            .with_version("1.25.3")
            .with_description("Official build of Nginx.")
            .with_detail("license", json!("BSD-2-Clause"))
            .with_detail("platforms", json!(["linux"])),
    ]
}

/// TC-AGG-001: single apt record end to end
#[test]
fn tc_agg_001_single_source_end_to_end() {
    let aggregator = Aggregator::default();
    let (merged, confidence) = aggregator.aggregate("nginx", &[nginx_apt()]);

    assert_eq!(merged["packages"]["apt"], json!({"name": "nginx", "version": "1.18.0"}));
    assert_eq!(merged["description"], "High-performance HTTP server and reverse proxy");
    assert_eq!(merged["license"], "BSD");
    assert_eq!(merged["urls"]["website"], "https://nginx.org");
    assert_eq!(merged["platforms"], json!(["linux", "debian", "ubuntu"]));

    let overall = confidence[OVERALL_KEY];
    assert!(overall > 0.0 && overall < 1.0, "overall = {}", overall);
}

/// TC-AGG-002: single source values and confidences pass through unchanged
#[test]
fn tc_agg_002_single_source_identity() {
    let aggregator = Aggregator::default();
    let record = nginx_apt();
    let points = aggregator.data_points(std::slice::from_ref(&record));
    let (_, confidence) = aggregator.aggregate("nginx", &[record]);

    for point in &points {
        assert_eq!(confidence[&point.field_path], point.confidence, "{}", point.field_path);
    }
    assert_eq!(confidence.len(), points.len() + 1);
}

/// TC-AGG-003: repeated aggregation is bit-identical
#[test]
fn tc_agg_003_determinism() {
    let aggregator = Aggregator::default();
    let sources = nginx_sources();

    let first = aggregator.aggregate("nginx", &sources);
    for _ in 0..5 {
        let again = aggregator.aggregate("nginx", &sources);
        assert_eq!(
            serde_json::to_string(&again.0).unwrap(),
            serde_json::to_string(&first.0).unwrap()
        );
        assert_eq!(again.1, first.1);
    }
}

/// TC-AGG-004: default strategies across three providers
#[test]
fn tc_agg_004_multi_provider_strategies() {
    let aggregator = Aggregator::default();
    let (merged, confidence) = aggregator.aggregate("nginx", &nginx_sources());

    // LONGEST_VALUE
    assert_eq!(
        merged["description"],
        "HTTP(S) server and reverse proxy, and IMAP/POP3 proxy server"
    );
    // MAJORITY_VOTE: two of three report BSD-2-Clause
    assert_eq!(merged["license"], "BSD-2-Clause");
    // MERGE_LISTS in first-seen order
    assert_eq!(merged["platforms"], json!(["linux", "debian", "ubuntu", "macos"]));
    // HIGHEST_CONFIDENCE: apt outranks homebrew
    assert_eq!(merged["urls"]["website"], "https://nginx.org");
    assert_eq!(merged["urls"]["source"], "https://github.com/nginx/nginx");

    assert_eq!(merged["packages"]["homebrew"]["version"], "1.25.3");
    assert_eq!(merged["packages"].as_object().unwrap().len(), 3);

    for (field, score) in &confidence {
        assert!((0.0..=1.0).contains(score), "{} = {}", field, score);
    }
}

/// TC-AGG-005: conflict report lists only fields with differing values
#[test]
fn tc_agg_005_conflict_report() {
    let aggregator = Aggregator::default();
    let report = aggregator.conflict_report("nginx", &nginx_sources());

    assert!(report.contains_key("description"));
    assert!(report.contains_key("license"));
    assert!(report.contains_key("urls.website"));
    assert!(report.contains_key("platforms"));
    assert!(!report.contains_key("urls.source"));

    let descriptions = &report["description"];
    let providers: Vec<&str> = descriptions.iter().map(|e| e.provider.as_str()).collect();
    assert_eq!(providers, vec!["apt", "homebrew", "docker"]);
}

/// TC-AGG-006: identical descriptions produce no conflict entry
#[test]
fn tc_agg_006_identical_values_not_conflicts() {
    let aggregator = Aggregator::default();
    let sources = vec![
        PackageRecord::new("jq", "apt").with_description("Command-line JSON processor"),
        PackageRecord::new("jq", "homebrew").with_description("Command-line JSON processor"),
    ];
    assert!(aggregator.conflict_report("jq", &sources).is_empty());
}

/// TC-AGG-007: MAJORITY_VOTE confidence over three license points
#[test]
fn tc_agg_007_majority_vote_license() {
    let aggregator = Aggregator::default();
    let points = vec![
        DataPoint::new("license", json!("MIT"), SourceInfo::new("npm", 9, 0.90), 0.99),
        DataPoint::new("license", json!("MIT"), SourceInfo::new("pypi", 9, 0.90), 0.90),
        DataPoint::new("license", json!("Apache-2.0"), SourceInfo::new("maven", 9, 0.90), 0.99),
    ];

    let result = aggregator.resolve("license", &points).unwrap();
    assert_eq!(result.value, json!("MIT"));
    assert_eq!(result.strategy, ConflictResolutionStrategy::MajorityVote);
    let expected = (2.0 / 3.0) * ((0.99 + 0.90) / 2.0);
    assert!((result.confidence - expected).abs() < 1e-9);
}

/// TC-AGG-008: PROVIDER_PRIORITY picks the priority-10 source on equal confidence
#[test]
fn tc_agg_008_provider_priority() {
    let aggregator = Aggregator::default();
    let points = vec![
        DataPoint::new("name", json!("nginx-extras"), SourceInfo::new("ppa", 1, 0.7), 0.8),
        DataPoint::new("name", json!("nginx"), SourceInfo::new("apt", 10, 0.95), 0.8),
    ];

    let result = aggregator.resolve("name", &points).unwrap();
    assert_eq!(result.strategy, ConflictResolutionStrategy::ProviderPriority);
    assert_eq!(result.value, json!("nginx"));
}

/// TC-AGG-009: MERGE_LISTS content is order-independent
#[test]
fn tc_agg_009_merge_lists_commutative() {
    let aggregator = Aggregator::default();
    let a = PackageRecord::new("tool", "apt").with_detail("platforms", json!(["linux", "windows"]));
    let b = PackageRecord::new("tool", "npm").with_detail("platforms", json!(["windows", "macos"]));

    let (forward, _) = aggregator.aggregate("tool", &[a.clone(), b.clone()]);
    let (backward, _) = aggregator.aggregate("tool", &[b, a]);

    assert_eq!(forward["platforms"], json!(["linux", "windows", "macos"]));
    let mut left: Vec<String> = serde_json::from_value(forward["platforms"].clone()).unwrap();
    let mut right: Vec<String> = serde_json::from_value(backward["platforms"].clone()).unwrap();
    left.sort();
    right.sort();
    assert_eq!(left, right);
}

/// TC-AGG-010: MOST_RECENT override uses retrieval timestamps
#[test]
fn tc_agg_010_most_recent_override() {
    let aggregator = Aggregator::default()
        .with_field_strategy("license", ConflictResolutionStrategy::MostRecent);
    let sources = vec![
        PackageRecord::new("tool", "apt")
            .with_detail("license", json!("GPL-2.0"))
            .with_retrieved_at(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()),
        PackageRecord::new("tool", "npm")
            .with_detail("license", json!("MIT"))
            .with_retrieved_at(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
    ];

    let (merged, _) = aggregator.aggregate("tool", &sources);
    assert_eq!(merged["license"], "MIT");
}

/// TC-AGG-011: configured overrides and low-confidence selection
#[test]
fn tc_agg_011_config_driven_aggregation() {
    let config = EngineConfig::from_toml_str(
        r#"
[aggregation]
default_strategy = "PROVIDER_PRIORITY"

[providers.priority]
homebrew = 20
"#,
    )
    .unwrap();
    let aggregator = Aggregator::from_config(&config);
    assert_eq!(
        aggregator.strategy_for("urls.website"),
        ConflictResolutionStrategy::ProviderPriority
    );

    let (merged, confidence) = aggregator.aggregate("nginx", &nginx_sources());
    assert_eq!(merged["urls"]["website"], "https://nginx.org/");

    let low = low_confidence_fields(&confidence, 1.01);
    assert!(!low.contains(&OVERALL_KEY.to_string()));
    assert_eq!(low.len(), confidence.len() - 1);
    assert!(low.windows(2).all(|w| w[0] < w[1]));
}

/// TC-AGG-012: empty input is a valid no-op
#[test]
fn tc_agg_012_empty_sources() {
    let aggregator = Aggregator::default();
    let (merged, confidence) = aggregator.aggregate("nothing", &[]);
    assert_eq!(merged, json!({}));
    assert_eq!(confidence[OVERALL_KEY], 0.5);
    assert!(aggregator.conflict_report("nothing", &[]).is_empty());
}
