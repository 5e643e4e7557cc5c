//! Overall scores, consistency issues and report recommendations

use crate::types::{clamp_unit, CrossReferenceResult, FieldQuality};
use pkgmeta_common::config::QualityConfig;
use std::collections::{BTreeMap, HashSet};

/// Recommendation emitted when nothing could be assessed
pub const MISSING_DATA_RECOMMENDATION: &str =
    "Missing data: no fields could be assessed, gather metadata from at least one provider";

/// Importance-weighted (quality, confidence) over all assessed fields
///
/// Both are 0.0 when no field was assessed.
pub fn overall_scores(fields: &BTreeMap<String, FieldQuality>, quality: &QualityConfig) -> (f64, f64) {
    let (weighted_quality, weighted_confidence, total_weight) = fields.values().fold(
        (0.0, 0.0, 0.0),
        |(q, c, w), field| {
            let importance = quality.importance(&field.field_name);
            (
                q + importance * field.quality_score,
                c + importance * field.confidence_score,
                w + importance,
            )
        },
    );

    if total_weight <= 0.0 {
        return (0.0, 0.0);
    }
    (
        clamp_unit(weighted_quality / total_weight),
        clamp_unit(weighted_confidence / total_weight),
    )
}

/// One line per conflicting pair across all cross-reference dimensions
pub fn consistency_issues(cross_references: &BTreeMap<String, CrossReferenceResult>) -> Vec<String> {
    cross_references
        .values()
        .flat_map(|result| {
            result.conflicts.iter().map(move |conflict| {
                format!(
                    "Inconsistent {}: {} reports '{}' but {} reports '{}'",
                    result.field_name,
                    conflict.provider1,
                    conflict.value1,
                    conflict.provider2,
                    conflict.value2
                )
            })
        })
        .collect()
}

/// Threshold recommendations followed by per-field ones, de-duplicated in
/// first-seen order
pub fn recommendations(
    fields: &BTreeMap<String, FieldQuality>,
    cross_references: &BTreeMap<String, CrossReferenceResult>,
    quality: &QualityConfig,
) -> Vec<String> {
    if fields.is_empty() {
        return vec![MISSING_DATA_RECOMMENDATION.to_string()];
    }

    let mut all = Vec::new();

    for field in fields.values() {
        if field.confidence_score < quality.min_field_confidence {
            all.push(format!(
                "Verify {}: confidence {:.2} is below {:.2}",
                field.field_name, field.confidence_score, quality.min_field_confidence
            ));
        }
        if field.quality_score < quality.min_field_quality {
            all.push(format!(
                "Improve {}: quality {:.2} is below {:.2}",
                field.field_name, field.quality_score, quality.min_field_quality
            ));
        }
    }

    for result in cross_references.values() {
        if !result.conflicts.is_empty() || result.agreement_score < quality.min_agreement {
            all.push(format!(
                "Resolve {} disagreement between sources (agreement {:.2})",
                result.field_name, result.agreement_score
            ));
        }
    }

    all.extend(fields.values().flat_map(|f| f.recommendations.iter().cloned()));

    dedup(all)
}

fn dedup(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|item| seen.insert(item.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CrossReferenceConflict;
    use serde_json::json;

    fn field(name: &str, quality: f64, confidence: f64, recs: &[&str]) -> FieldQuality {
        FieldQuality {
            field_name: name.to_string(),
            value: json!(null),
            confidence_score: confidence,
            quality_score: quality,
            source_attributions: Vec::new(),
            accuracy_indicators: BTreeMap::new(),
            issues: Vec::new(),
            recommendations: recs.iter().map(|r| r.to_string()).collect(),
        }
    }

    fn fields(list: Vec<FieldQuality>) -> BTreeMap<String, FieldQuality> {
        list.into_iter().map(|f| (f.field_name.clone(), f)).collect()
    }

    #[test]
    fn test_overall_scores_weighted_by_importance() {
        let map = fields(vec![
            field("description", 1.0, 0.5, &[]),
            field("category", 0.0, 1.0, &[]),
        ]);
        let (quality, confidence) = overall_scores(&map, &QualityConfig::default());
        assert!((quality - 0.8 / 1.2).abs() < 1e-9);
        assert!((confidence - (0.4 + 0.4) / 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_overall_scores_empty() {
        assert_eq!(
            overall_scores(&BTreeMap::new(), &QualityConfig::default()),
            (0.0, 0.0)
        );
    }

    #[test]
    fn test_missing_data_recommendation() {
        let recs = recommendations(&BTreeMap::new(), &BTreeMap::new(), &QualityConfig::default());
        assert_eq!(recs, vec![MISSING_DATA_RECOMMENDATION.to_string()]);
    }

    #[test]
    fn test_threshold_and_field_recommendations_deduplicated() {
        let map = fields(vec![
            field("license", 0.5, 0.9, &["Use an SPDX license identifier"]),
            field("urls", 0.9, 0.6, &["Prefer HTTPS URLs", "Prefer HTTPS URLs"]),
        ]);
        let recs = recommendations(&map, &BTreeMap::new(), &QualityConfig::default());

        assert_eq!(recs.len(), 4);
        assert!(recs[0].starts_with("Improve license"));
        assert!(recs[1].starts_with("Verify urls"));
        assert_eq!(recs.iter().filter(|r| *r == "Prefer HTTPS URLs").count(), 1);
    }

    #[test]
    fn test_cross_reference_recommendation_and_issue() {
        let conflict = CrossReferenceConflict {
            provider1: "apt".to_string(),
            provider2: "ppa".to_string(),
            value1: "nginx".to_string(),
            value2: "nginx-full".to_string(),
            similarity: Some(0.5),
        };
        let result = CrossReferenceResult {
            field_name: "package_names".to_string(),
            source_values: BTreeMap::new(),
            consensus_value: Some("nginx".to_string()),
            consensus_confidence: 0.67,
            conflicts: vec![conflict],
            agreement_score: 0.33,
        };
        let cross = BTreeMap::from([("package_names".to_string(), result)]);

        let issues = consistency_issues(&cross);
        assert_eq!(
            issues,
            vec!["Inconsistent package_names: apt reports 'nginx' but ppa reports 'nginx-full'"]
        );

        let map = fields(vec![field("description", 1.0, 1.0, &[])]);
        let recs = recommendations(&map, &cross, &QualityConfig::default());
        assert_eq!(
            recs,
            vec!["Resolve package_names disagreement between sources (agreement 0.33)"]
        );
    }
}
