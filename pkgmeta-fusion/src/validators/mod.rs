//! Validation Tier - Quality Auditor
//!
//! Audits a candidate merged record against the raw provider data it came
//! from and produces a `QualityReport`.
//!
//! # Validators
//! 1. **field_scorer** - Per-field quality sub-metrics, issues, recommendations
//! 2. **cross_reference** - Names, descriptions, versions and licenses across providers
//! 3. **source_reliability** - Provider reliability and data freshness
//! 4. **recommendations** - Overall scores and report recommendations
//!
//! The auditor never fails: missing or malformed fields lower scores instead
//! of raising errors.

pub mod cross_reference;
pub mod field_scorer;
pub mod recommendations;
pub mod source_reliability;

use crate::fusion::data_points::URL_DETAILS;
use crate::types::{clamp_unit, Clock, FieldQuality, QualityReport, SourceAttribution, SystemClock};
use pkgmeta_common::config::{EngineConfig, ProviderTables, QualityConfig};
use pkgmeta_common::value_path::{get_path, is_populated, values_equal};
use pkgmeta_common::PackageRecord;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Base field confidence when no source evidences a field
pub const UNATTRIBUTED_CONFIDENCE: f64 = 0.5;

/// Maximum bonus for attributions agreeing with the audited value
pub const AGREEMENT_BONUS: f64 = 0.2;

/// Bonus for a well-formed license, version or URL
pub const FORMAT_BONUS: f64 = 0.05;

/// Quality Auditor
///
/// Holds read-only weight tables and a time source; `assess` can be called
/// concurrently for different packages.
#[derive(Clone)]
pub struct QualityAuditor {
    providers: ProviderTables,
    quality: QualityConfig,
    clock: Arc<dyn Clock>,
}

impl Default for QualityAuditor {
    fn default() -> Self {
        Self::new(ProviderTables::default(), QualityConfig::default())
    }
}

impl std::fmt::Debug for QualityAuditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QualityAuditor")
            .field("providers", &self.providers)
            .field("quality", &self.quality)
            .finish_non_exhaustive()
    }
}

impl QualityAuditor {
    /// Create an auditor using the system clock
    pub fn new(providers: ProviderTables, quality: QualityConfig) -> Self {
        Self {
            providers,
            quality,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.providers.clone(), config.quality.clone())
    }

    /// Replace the time source (freshness and report timestamp)
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Audit a candidate record against the raw provider data
    pub fn assess(
        &self,
        record: &Value,
        sources: &BTreeMap<String, Vec<PackageRecord>>,
        software_name: &str,
    ) -> QualityReport {
        let all_records: Vec<&PackageRecord> = sources.values().flatten().collect();

        let mut field_qualities = BTreeMap::new();
        for field in field_scorer::SCORED_FIELDS {
            let Some(value) = get_path(record, field).filter(|v| is_populated(v)) else {
                debug!("Field '{}' absent, not assessed", field);
                continue;
            };
            if let Some(quality) = self.assess_field(field, value, sources, &all_records) {
                field_qualities.insert(field.to_string(), quality);
            }
        }

        let cross_references = cross_reference::cross_reference(sources);
        let source_reliability = source_reliability::source_reliability(sources, &self.providers);
        let data_freshness =
            source_reliability::data_freshness(sources, &self.quality, self.clock.as_ref());

        let (overall_quality_score, overall_confidence_score) =
            recommendations::overall_scores(&field_qualities, &self.quality);
        let consistency_issues = recommendations::consistency_issues(&cross_references);
        let recommendations =
            recommendations::recommendations(&field_qualities, &cross_references, &self.quality);

        info!(
            "Assessed '{}': quality {:.3}, confidence {:.3}, {} fields, {} consistency issues",
            software_name,
            overall_quality_score,
            overall_confidence_score,
            field_qualities.len(),
            consistency_issues.len()
        );

        QualityReport {
            software_name: software_name.to_string(),
            overall_quality_score,
            overall_confidence_score,
            field_qualities,
            cross_references,
            source_reliability,
            data_freshness,
            consistency_issues,
            recommendations,
            generated_at: self.clock.now(),
        }
    }

    fn assess_field(
        &self,
        field: &str,
        value: &Value,
        sources: &BTreeMap<String, Vec<PackageRecord>>,
        all_records: &[&PackageRecord],
    ) -> Option<FieldQuality> {
        let score = field_scorer::score_field(field, value, all_records)?;
        let attributions = self.attributions(field, sources);
        let confidence_score = self.field_confidence(field, value, &attributions);
        let quality_score = score.quality();

        debug!(
            field = field,
            quality = quality_score,
            confidence = confidence_score,
            issues = score.issues.len(),
            "Field assessed"
        );

        Some(FieldQuality {
            field_name: field.to_string(),
            value: value.clone(),
            confidence_score,
            quality_score,
            source_attributions: attributions,
            accuracy_indicators: score.indicators,
            issues: score.issues,
            recommendations: score.recommendations,
        })
    }

    /// One attribution per raw record that carries a value for `field`
    pub fn attributions(
        &self,
        field: &str,
        sources: &BTreeMap<String, Vec<PackageRecord>>,
    ) -> Vec<SourceAttribution> {
        sources
            .iter()
            .flat_map(|(provider, records)| {
                records.iter().filter_map(move |record| {
                    let value = attributed_value(field, provider, record)?;
                    Some(SourceAttribution {
                        timestamp: record.retrieved_at,
                        verification_method: Some("provider_record".to_string()),
                        ..SourceAttribution::new(
                            provider.clone(),
                            field,
                            value,
                            self.quality.attribution_confidence,
                        )
                    })
                })
            })
            .collect()
    }

    /// Confidence in a field value given its source attributions
    ///
    /// Reliability-weighted mean of attribution confidences, plus up to 0.2
    /// for attributions exactly equal to `value`, plus 0.05 for a well-formed
    /// license, version or URL. Capped at 1.0.
    pub fn field_confidence(
        &self,
        field: &str,
        value: &Value,
        attributions: &[SourceAttribution],
    ) -> f64 {
        let format_bonus = if field_scorer::format_valid(field, value) {
            FORMAT_BONUS
        } else {
            0.0
        };

        if attributions.is_empty() {
            return clamp_unit(UNATTRIBUTED_CONFIDENCE + format_bonus);
        }

        let (weighted, total_weight) = attributions.iter().fold((0.0, 0.0), |(sum, weight), a| {
            let reliability = self.providers.reliability(&a.provider);
            (sum + reliability * a.confidence, weight + reliability)
        });
        let base = if total_weight > 0.0 {
            weighted / total_weight
        } else {
            attributions.iter().map(|a| a.confidence).sum::<f64>() / attributions.len() as f64
        };

        let agreeing = attributions
            .iter()
            .filter(|a| values_equal(&a.value, value))
            .count();
        let agreement_bonus = AGREEMENT_BONUS * agreeing as f64 / attributions.len() as f64;

        clamp_unit(base + agreement_bonus + format_bonus)
    }
}

/// The value a raw record contributes to an audited field
fn attributed_value(field: &str, provider: &str, record: &PackageRecord) -> Option<Value> {
    match field {
        "name" => Some(record.name.trim())
            .filter(|n| !n.is_empty())
            .map(Value::from),
        "version" => record.version_text().map(Value::from),
        "description" => record.description_text().map(Value::from),
        "license" => record.detail_str("license").map(Value::from),
        "platforms" => record.detail_list("platforms").map(Value::from),
        "urls" => {
            let urls: Map<String, Value> = URL_DETAILS
                .iter()
                .filter_map(|(detail, path)| {
                    let kind = path.strip_prefix("urls.")?;
                    record.detail_str(detail).map(|u| (kind.to_string(), Value::from(u)))
                })
                .collect();
            (!urls.is_empty()).then_some(Value::Object(urls))
        }
        "packages" => Some(json!({
            provider: {"name": record.name, "version": record.version_or_latest()}
        })),
        other => record.details.get(other).filter(|v| is_populated(v)).cloned(),
    }
}
