//! Per-Field Quality Scoring
//!
//! One routine per audited field. Each routine combines two or three
//! sub-metrics (0.0-1.0) into `quality_score = mean(sub-metrics)` and emits
//! issues and recommendations when a sub-metric falls below a fixed
//! threshold.
//!
//! | Field | Sub-metrics |
//! |-------|-------------|
//! | description | length, uniqueness, clarity |
//! | license | spdx_validity, source_agreement |
//! | platforms | coverage, recognized |
//! | urls | valid_format, completeness |
//! | category | default_set, vocabulary |
//! | packages | named, matched |

use crate::types::clamp_unit;
use once_cell::sync::Lazy;
use pkgmeta_common::text::text_similarity;
use pkgmeta_common::value_path::is_populated;
use pkgmeta_common::PackageRecord;
use regex::Regex;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use super::cross_reference::normalize_license;

/// Fields with a scoring routine, in audit order
pub const SCORED_FIELDS: &[&str] = &[
    "description",
    "license",
    "platforms",
    "urls",
    "category",
    "packages",
];

/// SPDX identifiers accepted as exact matches
const SPDX_LICENSES: &[&str] = &[
    "MIT",
    "Apache-2.0",
    "GPL-2.0",
    "GPL-2.0-only",
    "GPL-2.0-or-later",
    "GPL-3.0",
    "GPL-3.0-only",
    "GPL-3.0-or-later",
    "LGPL-2.1",
    "LGPL-3.0",
    "AGPL-3.0",
    "BSD-2-Clause",
    "BSD-3-Clause",
    "ISC",
    "MPL-2.0",
    "Unlicense",
    "Zlib",
    "CC0-1.0",
    "EPL-2.0",
    "Artistic-2.0",
];

/// Canonical platform set used for coverage
const CORE_PLATFORMS: [&str; 3] = ["linux", "windows", "macos"];

/// Other platform names that count as recognized
const OTHER_PLATFORMS: &[&str] = &[
    "freebsd", "openbsd", "netbsd", "android", "ios", "wasm", "solaris", "unix",
];

/// Canonical URL trio
const URL_KINDS: [&str; 3] = ["website", "source", "documentation"];

/// Category vocabulary
const CATEGORIES: &[&str] = &[
    "development",
    "utilities",
    "system",
    "network",
    "web",
    "database",
    "security",
    "multimedia",
    "graphics",
    "office",
    "education",
    "science",
    "games",
    "communication",
    "productivity",
    "devops",
    "cloud",
    "monitoring",
    "libraries",
];

static SPDX_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9.+-]*(\s+(AND|OR|WITH)\s+[A-Za-z0-9][A-Za-z0-9.+-]*)*$")
        .expect("SPDX pattern")
});

static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?)+(:\d+)?(/\S*)?$")
        .expect("URL pattern")
});

static VERSION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^v?\d+(\.\d+)*([-+][0-9A-Za-z.-]+)?$").expect("version pattern"));

/// Sub-metrics and findings for one field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldScore {
    pub indicators: BTreeMap<String, f64>,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

impl FieldScore {
    fn indicator(&mut self, name: &str, value: f64) {
        self.indicators.insert(name.to_string(), clamp_unit(value));
    }

    fn issue(&mut self, issue: impl Into<String>) {
        self.issues.push(issue.into());
    }

    fn recommend(&mut self, recommendation: impl Into<String>) {
        self.recommendations.push(recommendation.into());
    }

    /// Mean of all sub-metrics (0.0 when none)
    pub fn quality(&self) -> f64 {
        if self.indicators.is_empty() {
            return 0.0;
        }
        clamp_unit(self.indicators.values().sum::<f64>() / self.indicators.len() as f64)
    }
}

/// Score one field of the candidate record
///
/// Returns `None` for fields without a scoring routine.
pub fn score_field(field: &str, value: &Value, sources: &[&PackageRecord]) -> Option<FieldScore> {
    let score = match field {
        "description" => score_description(value, sources),
        "license" => score_license(value, sources),
        "platforms" => score_platforms(value),
        "urls" => score_urls(value),
        "category" => score_category(value),
        "packages" => score_packages(value, sources),
        _ => return None,
    };
    Some(score)
}

pub fn score_description(value: &Value, sources: &[&PackageRecord]) -> FieldScore {
    let mut score = FieldScore::default();
    let text = value.as_str().map(str::trim).unwrap_or_default();
    let length = text.chars().count();

    score.indicator("length", (length as f64 / 100.0).min(1.0));

    let descriptions: Vec<&str> = sources.iter().filter_map(|r| r.description_text()).collect();
    score.indicator("uniqueness", 1.0 - mean_pairwise_similarity(&descriptions));

    let window = if (20..=500).contains(&length) { 1.0 } else { 0.5 };
    let punctuation = if text.ends_with(['.', '!', '?']) { 1.0 } else { 0.7 };
    let density = symbol_density(text);
    let density_score = if density <= 0.1 { 1.0 } else { 0.5 };
    score.indicator("clarity", (window + punctuation + density_score) / 3.0);

    if length < 20 {
        score.issue("Description is very short");
        score.recommend("Expand the description to at least 20 characters");
    } else if length > 500 {
        score.issue("Description is very long");
        score.recommend("Shorten the description to a one-paragraph summary");
    }
    if density > 0.1 {
        score.issue("Description contains many non-text symbols");
    }

    score
}

fn mean_pairwise_similarity(texts: &[&str]) -> f64 {
    let mut total = 0.0;
    let mut pairs = 0usize;
    for (i, a) in texts.iter().enumerate() {
        for b in &texts[i + 1..] {
            total += text_similarity(a, b);
            pairs += 1;
        }
    }
    if pairs == 0 {
        0.0
    } else {
        total / pairs as f64
    }
}

/// Fraction of non-whitespace characters that are neither alphanumeric nor
/// common punctuation
fn symbol_density(text: &str) -> f64 {
    let visible: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    if visible.is_empty() {
        return 0.0;
    }
    let symbols = visible
        .iter()
        .filter(|c| !c.is_alphanumeric() && !".,;:!?'\"()-/".contains(**c))
        .count();
    symbols as f64 / visible.len() as f64
}

/// 1.0 for an exact SPDX identifier, 0.8 for an SPDX-shaped expression,
/// 0.3 otherwise
pub fn spdx_validity(license: &str) -> f64 {
    if SPDX_LICENSES.contains(&license) {
        1.0
    } else if SPDX_PATTERN.is_match(license) {
        0.8
    } else {
        0.3
    }
}

pub fn score_license(value: &Value, sources: &[&PackageRecord]) -> FieldScore {
    let mut score = FieldScore::default();
    let license = value.as_str().map(str::trim).unwrap_or_default();

    let validity = spdx_validity(license);
    score.indicator("spdx_validity", validity);

    let reported: Vec<String> = sources
        .iter()
        .filter_map(|r| r.detail_str("license"))
        .map(normalize_license)
        .collect();
    let agreement = if reported.is_empty() {
        0.5
    } else {
        let target = normalize_license(license);
        reported.iter().filter(|l| **l == target).count() as f64 / reported.len() as f64
    };
    score.indicator("source_agreement", agreement);

    if validity < 0.5 {
        score.issue(format!("License '{}' is not a valid SPDX expression", license));
        score.recommend("Use an SPDX license identifier");
    }
    if agreement < 0.5 {
        score.issue("Sources disagree on the license");
        score.recommend("Confirm the license against the upstream repository");
    }

    score
}

/// Canonical platform for a name or distro alias
fn canonical_platform(name: &str) -> Option<&'static str> {
    let name = name.trim().to_lowercase();
    let canonical = match name.as_str() {
        "linux" | "debian" | "ubuntu" | "fedora" | "centos" | "rhel" | "arch" | "alpine"
        | "opensuse" | "gentoo" | "mint" | "manjaro" => "linux",
        "windows" | "win" | "win32" | "win64" => "windows",
        "macos" | "mac" | "osx" | "darwin" => "macos",
        other => return OTHER_PLATFORMS.iter().copied().find(|p| *p == other),
    };
    Some(canonical)
}

pub fn score_platforms(value: &Value) -> FieldScore {
    let mut score = FieldScore::default();
    let Some(entries) = value.as_array() else {
        score.indicator("coverage", 0.0);
        score.indicator("recognized", 0.0);
        score.issue("Platforms is not a list");
        score.recommend("List supported platforms as an array of names");
        return score;
    };

    let names: Vec<&str> = entries.iter().filter_map(Value::as_str).collect();
    let canonical: BTreeSet<&str> = names.iter().filter_map(|n| canonical_platform(n)).collect();

    let covered = CORE_PLATFORMS.iter().filter(|p| canonical.contains(*p)).count();
    score.indicator("coverage", covered as f64 / CORE_PLATFORMS.len() as f64);

    let recognized = if entries.is_empty() {
        0.0
    } else {
        names.iter().filter(|n| canonical_platform(n).is_some()).count() as f64
            / entries.len() as f64
    };
    score.indicator("recognized", recognized);

    if entries.is_empty() {
        score.issue("No platforms listed");
        score.recommend("List at least one supported platform");
    } else if covered < CORE_PLATFORMS.len() {
        let missing: Vec<&str> = CORE_PLATFORMS
            .iter()
            .copied()
            .filter(|p| !canonical.contains(p))
            .collect();
        score.recommend(format!("Check platform support for: {}", missing.join(", ")));
    }
    if !entries.is_empty() && recognized < 1.0 {
        score.issue("Platform list contains unrecognized names");
    }

    score
}

pub fn is_valid_url(url: &str) -> bool {
    URL_PATTERN.is_match(url)
}

pub fn score_urls(value: &Value) -> FieldScore {
    let mut score = FieldScore::default();
    let Some(urls) = value.as_object() else {
        score.indicator("valid_format", 0.0);
        score.indicator("completeness", 0.0);
        score.issue("URLs is not a mapping");
        return score;
    };

    let populated: Vec<(&String, &str)> = urls
        .iter()
        .filter_map(|(kind, url)| url.as_str().map(|u| (kind, u.trim())))
        .filter(|(_, url)| !url.is_empty())
        .collect();

    let valid = if populated.is_empty() {
        0.0
    } else {
        populated.iter().filter(|(_, url)| is_valid_url(url)).count() as f64
            / populated.len() as f64
    };
    score.indicator("valid_format", valid);

    let present = URL_KINDS
        .iter()
        .filter(|kind| urls.get(**kind).is_some_and(is_populated))
        .count();
    score.indicator("completeness", present as f64 / URL_KINDS.len() as f64);

    for (kind, url) in &populated {
        if !is_valid_url(url) {
            score.issue(format!("URL for {} is malformed: {}", kind, url));
        } else if url.starts_with("http://") {
            score.issue(format!("URL for {} does not use HTTPS: {}", kind, url));
            score.recommend("Prefer HTTPS URLs");
        }
    }
    if !urls.get("source").is_some_and(is_populated) {
        score.recommend("Add a source repository URL");
    }
    if !urls.get("documentation").is_some_and(is_populated) {
        score.recommend("Add a documentation URL");
    }

    score
}

/// Default category from a plain string or a `{default: ...}` mapping
fn default_category(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) => Some(s.as_str()),
        Value::Object(map) => map.get("default").and_then(Value::as_str),
        _ => None,
    }
    .map(str::trim)
    .filter(|s| !s.is_empty())
}

pub fn score_category(value: &Value) -> FieldScore {
    let mut score = FieldScore::default();

    match default_category(value) {
        Some(category) => {
            score.indicator("default_set", 1.0);
            let known = CATEGORIES.contains(&category.to_lowercase().as_str());
            score.indicator("vocabulary", if known { 1.0 } else { 0.5 });
            if !known {
                score.issue(format!("Category '{}' is not a standard category", category));
            }
        }
        None => {
            score.indicator("default_set", 0.5);
            score.indicator("vocabulary", 0.0);
            score.issue("No default category set");
            score.recommend("Set a default category");
        }
    }

    score
}

pub fn score_packages(value: &Value, sources: &[&PackageRecord]) -> FieldScore {
    let mut score = FieldScore::default();
    let entries: Vec<&Value> = value
        .as_object()
        .map(|m| m.values().collect())
        .unwrap_or_default();

    let names: Vec<&str> = entries
        .iter()
        .filter_map(|entry| entry.get("name").and_then(Value::as_str))
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .collect();

    let named = if entries.is_empty() {
        0.0
    } else {
        names.len() as f64 / entries.len() as f64
    };
    score.indicator("named", named);

    let source_names: BTreeSet<String> = sources.iter().map(|r| r.name.trim().to_lowercase()).collect();
    let matched = if names.is_empty() {
        0.0
    } else {
        names
            .iter()
            .filter(|n| source_names.contains(&n.to_lowercase()))
            .count() as f64
            / names.len() as f64
    };
    score.indicator("matched", matched);

    if entries.is_empty() {
        score.issue("No provider packages listed");
        score.recommend("Add at least one provider package entry");
    } else if named < 1.0 {
        score.issue("Some provider packages have no name");
    }
    if !names.is_empty() && matched < 1.0 {
        score.issue("Some package names do not appear in the source data");
        score.recommend("Verify package names against the provider listings");
    }

    score
}

/// Whether a value is well-formed for its field (format bonus)
pub fn format_valid(field: &str, value: &Value) -> bool {
    match field {
        "license" => value.as_str().is_some_and(|l| SPDX_PATTERN.is_match(l.trim())),
        "version" => value.as_str().is_some_and(|v| VERSION_PATTERN.is_match(v.trim())),
        "homepage" | "source_url" | "download_url" | "license_url" => {
            value.as_str().is_some_and(|u| is_valid_url(u.trim()))
        }
        "urls" => value.as_object().is_some_and(|urls| {
            let mut populated = urls.values().filter(|u| is_populated(u)).peekable();
            populated.peek().is_some()
                && populated.all(|u| u.as_str().is_some_and(|s| is_valid_url(s.trim())))
        }),
        _ => false,
    }
}
