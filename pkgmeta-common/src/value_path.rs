//! Dotted-path access and comparison helpers for `serde_json::Value` records
//!
//! Both the aggregator (writing resolved values) and the quality auditor
//! (reading candidate values) address the nested metadata record with the
//! same dot-separated paths, e.g. `urls.website`.
//!
//! Path semantics:
//! - Reads return `None` when any segment is missing or an intermediate
//!   value is not a mapping.
//! - Writes create missing intermediate mappings, and replace a non-mapping
//!   intermediate (or root) with an empty mapping.

use serde_json::{Map, Value};

/// Split a dotted path into its non-empty segments
fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('.').filter(|s| !s.is_empty())
}

/// Read the value at `path`, or `None` if absent
pub fn get_path<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = record;
    let mut any = false;
    for segment in segments(path) {
        current = current.as_object()?.get(segment)?;
        any = true;
    }
    any.then_some(current)
}

/// Write `value` at `path`, creating intermediate mappings as needed
///
/// An empty path leaves the record untouched.
pub fn set_path(record: &mut Value, path: &str, value: Value) {
    let parts: Vec<&str> = segments(path).collect();
    let Some((last, parents)) = parts.split_last() else {
        return;
    };

    let mut current = record;
    for segment in parents {
        let map = ensure_object(current);
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    ensure_object(current).insert(last.to_string(), value);
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced with an object"),
    }
}

/// String representation used for vote grouping and conflict detection
///
/// Strings are used verbatim; every other value is rendered as compact JSON,
/// so `"1"` and `1` group separately.
pub fn value_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Deep structural equality
///
/// Values of different JSON types are simply unequal; numbers compare by
/// their `f64` value so `1` and `1.0` match.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xm), Value::Object(ym)) => {
            xm.len() == ym.len()
                && xm
                    .iter()
                    .all(|(k, xv)| ym.get(k).is_some_and(|yv| values_equal(xv, yv)))
        }
        _ => a == b,
    }
}

/// False for null, blank strings, and empty lists or mappings
pub fn is_populated(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}
