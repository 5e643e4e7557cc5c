//! Conflict-resolution strategies
//!
//! `apply` dispatches a strategy tag over one field's data points. Every
//! strategy is deterministic for a given input order: ties go to the
//! earliest point. Strategies that cannot act on the values present
//! (no timestamps, no strings, no lists, no mappings) fall back to
//! highest-confidence selection, and the returned result carries the tag
//! that was actually applied.

use crate::types::{AggregationResult, ConflictResolutionStrategy as Strategy, DataPoint};
use pkgmeta_common::value_path::{is_populated, value_key, values_equal};
use serde_json::{Map, Value};
use tracing::debug;

/// Resolve one field's data points with the given strategy
///
/// Returns `None` only for an empty point list.
pub fn apply(strategy: Strategy, points: &[DataPoint]) -> Option<AggregationResult> {
    if points.is_empty() {
        return None;
    }

    let result = match strategy {
        Strategy::HighestConfidence => highest_confidence(points),
        Strategy::MajorityVote => majority_vote(points),
        Strategy::MostRecent => most_recent(points),
        Strategy::LongestValue => longest_value(points),
        Strategy::ProviderPriority => provider_priority(points),
        Strategy::MergeLists => merge_lists(points),
        Strategy::MergeDicts => merge_dicts(points),
    };

    debug!(
        field = %points[0].field_path,
        requested = %strategy,
        applied = %result.strategy,
        confidence = result.confidence,
        conflicts = result.conflicts.len(),
        "Resolved field"
    );

    Some(result)
}

/// Index of the first point maximising `key`
fn first_max_by<K, F>(points: &[DataPoint], key: F) -> usize
where
    K: PartialOrd,
    F: Fn(&DataPoint) -> K,
{
    let mut best = 0;
    for (i, point) in points.iter().enumerate().skip(1) {
        if key(point) > key(&points[best]) {
            best = i;
        }
    }
    best
}

/// Build a result around one winning point
///
/// Points carrying an equal value count as supporting sources; all others
/// are conflicts.
fn winner_result(points: &[DataPoint], winner: usize, strategy: Strategy) -> AggregationResult {
    let chosen = &points[winner];
    let (supporting, conflicting): (Vec<&DataPoint>, Vec<&DataPoint>) = points
        .iter()
        .partition(|p| values_equal(&p.value, &chosen.value));

    let mut sources = vec![chosen.source.clone()];
    sources.extend(
        supporting
            .iter()
            .filter(|p| !std::ptr::eq(**p, chosen))
            .map(|p| p.source.clone()),
    );

    AggregationResult {
        value: chosen.value.clone(),
        confidence: chosen.confidence,
        sources,
        conflicts: conflicting.into_iter().cloned().collect(),
        strategy,
    }
}

fn mean_confidence<'a>(points: impl IntoIterator<Item = &'a DataPoint>) -> f64 {
    let (sum, count) = points
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), p| (sum + p.confidence, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn highest_confidence(points: &[DataPoint]) -> AggregationResult {
    let winner = first_max_by(points, |p| p.confidence);
    winner_result(points, winner, Strategy::HighestConfidence)
}

/// Most frequent value by string representation
///
/// confidence = (votes / total) × mean confidence of the winning group
fn majority_vote(points: &[DataPoint]) -> AggregationResult {
    // (key, members) in first-seen order
    let mut groups: Vec<(String, Vec<&DataPoint>)> = Vec::new();
    for point in points {
        let key = value_key(&point.value);
        match groups.iter().position(|(k, _)| *k == key) {
            Some(i) => groups[i].1.push(point),
            None => groups.push((key, vec![point])),
        }
    }

    let mut winner = 0;
    for (i, (_, members)) in groups.iter().enumerate().skip(1) {
        if members.len() > groups[winner].1.len() {
            winner = i;
        }
    }

    let (winning_key, members) = &groups[winner];
    let vote_share = members.len() as f64 / points.len() as f64;
    let confidence = vote_share * mean_confidence(members.iter().copied());

    AggregationResult {
        value: members[0].value.clone(),
        confidence,
        sources: members.iter().map(|p| p.source.clone()).collect(),
        conflicts: points
            .iter()
            .filter(|p| value_key(&p.value) != *winning_key)
            .cloned()
            .collect(),
        strategy: Strategy::MajorityVote,
    }
}

fn most_recent(points: &[DataPoint]) -> AggregationResult {
    if points.iter().all(|p| p.source.timestamp.is_none()) {
        return highest_confidence(points);
    }
    // None sorts below any timestamp
    let winner = first_max_by(points, |p| p.source.timestamp);
    winner_result(points, winner, Strategy::MostRecent)
}

fn longest_value(points: &[DataPoint]) -> AggregationResult {
    if !points.iter().any(|p| p.value.is_string()) {
        return highest_confidence(points);
    }
    let winner = first_max_by(points, |p| {
        p.value.as_str().map(|s| s.chars().count() as i64).unwrap_or(-1)
    });
    winner_result(points, winner, Strategy::LongestValue)
}

fn provider_priority(points: &[DataPoint]) -> AggregationResult {
    let winner = first_max_by(points, |p| p.source.priority);
    winner_result(points, winner, Strategy::ProviderPriority)
}

/// Union of list values, first-seen order, de-duplicated by equality
fn merge_lists(points: &[DataPoint]) -> AggregationResult {
    let (lists, others): (Vec<&DataPoint>, Vec<&DataPoint>) =
        points.iter().partition(|p| p.value.is_array());
    if lists.is_empty() {
        return highest_confidence(points);
    }

    let mut merged: Vec<Value> = Vec::new();
    for item in lists.iter().filter_map(|p| p.value.as_array()).flatten() {
        if !merged.iter().any(|m| values_equal(m, item)) {
            merged.push(item.clone());
        }
    }

    AggregationResult {
        value: Value::Array(merged),
        confidence: mean_confidence(lists.iter().copied()),
        sources: lists.iter().map(|p| p.source.clone()).collect(),
        conflicts: others.into_iter().cloned().collect(),
        strategy: Strategy::MergeLists,
    }
}

/// Union of mapping values; the first source with a populated value for a
/// key wins that key
fn merge_dicts(points: &[DataPoint]) -> AggregationResult {
    let (maps, others): (Vec<&DataPoint>, Vec<&DataPoint>) = points
        .iter()
        .partition(|p| p.value.as_object().is_some_and(|m| m.values().any(is_populated)));
    if maps.is_empty() {
        return highest_confidence(points);
    }

    let mut merged = Map::new();
    for map in maps.iter().filter_map(|p| p.value.as_object()) {
        for (key, value) in map {
            if is_populated(value) && !merged.contains_key(key) {
                merged.insert(key.clone(), value.clone());
            }
        }
    }

    AggregationResult {
        value: Value::Object(merged),
        confidence: mean_confidence(maps.iter().copied()),
        sources: maps.iter().map(|p| p.source.clone()).collect(),
        conflicts: others.into_iter().cloned().collect(),
        strategy: Strategy::MergeDicts,
    }
}
