//! Strategy fold implementations
//!
//! Pure functions over `serde_json::Value`; nothing here touches the
//! filesystem. Contributions arrive in ascending precedence order.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

use super::layer::{Layer, json_kind};
use crate::error::{Error, Result};

/// Fold arrays into one, de-duplicated by value, first occurrence kept.
pub(super) fn union(path: &str, contributions: &[(&Layer, &Value)]) -> Result<Value> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();

    for (layer, value) in contributions {
        let Value::Array(items) = value else {
            return Err(mismatch(
                path,
                format!(
                    "union requires arrays, layer '{}' supplies {}",
                    layer.source_id,
                    json_kind(value)
                ),
            ));
        };
        for item in items {
            if seen.insert(canonical_key(item)) {
                out.push(item.clone());
            }
        }
    }

    Ok(Value::Array(out))
}

/// Fold objects key-wise, or arrays of objects grouped by `group_by`.
///
/// Objects merge recursively: nested arrays are concatenated and grouped or
/// de-duplicated, scalar siblings use last-writer-wins. Arrays group their
/// object elements by the `group_by` field; elements in the same group merge
/// like objects, everything else de-duplicates by the `dedup_by`-derived key.
pub(super) fn deep_merge(
    path: &str,
    contributions: &[(&Layer, &Value)],
    group_by: Option<&str>,
    dedup_by: Option<&str>,
) -> Result<Value> {
    match contributions[0].1 {
        Value::Object(_) => {
            let mut acc = Map::new();
            for (layer, value) in contributions {
                let Value::Object(map) = value else {
                    return Err(mismatch(
                        path,
                        format!(
                            "deep-merge started with an object, layer '{}' supplies {}",
                            layer.source_id,
                            json_kind(value)
                        ),
                    ));
                };
                merge_objects(&mut acc, map, path, group_by, dedup_by)?;
            }
            Ok(Value::Object(acc))
        }
        Value::Array(_) => {
            let mut acc: Vec<Value> = Vec::new();
            for (layer, value) in contributions {
                let Value::Array(items) = value else {
                    return Err(mismatch(
                        path,
                        format!(
                            "deep-merge started with an array, layer '{}' supplies {}",
                            layer.source_id,
                            json_kind(value)
                        ),
                    ));
                };
                acc = grouped_concat(&acc, items, path, group_by, dedup_by)?;
            }
            Ok(Value::Array(acc))
        }
        other => Err(mismatch(
            path,
            format!(
                "deep-merge requires an object or array, layer '{}' supplies {}",
                contributions[0].0.source_id,
                json_kind(other)
            ),
        )),
    }
}

/// Take the highest-precedence value wholesale.
///
/// A JSON type change between layers is treated as a configuration error
/// rather than silently discarding structure.
pub(super) fn last_writer_wins(
    path: &str,
    contributions: &[(&Layer, &Value)],
) -> Result<Option<Value>> {
    let Some((_, last)) = contributions.last() else {
        return Ok(None);
    };
    for (layer, value) in contributions {
        if json_kind(value) != json_kind(last) {
            return Err(mismatch(
                path,
                format!(
                    "layer '{}' supplies {}, a later layer supplies {}",
                    layer.source_id,
                    json_kind(value),
                    json_kind(last)
                ),
            ));
        }
    }
    Ok(Some((*last).clone()))
}

fn merge_objects(
    base: &mut Map<String, Value>,
    overlay: &Map<String, Value>,
    path: &str,
    group_by: Option<&str>,
    dedup_by: Option<&str>,
) -> Result<()> {
    for (key, incoming) in overlay {
        let sub_path = format!("{path}.{key}");
        match base.get_mut(key) {
            None => {
                base.insert(key.clone(), incoming.clone());
            }
            Some(existing) => merge_value(existing, incoming, &sub_path, group_by, dedup_by)?,
        }
    }
    Ok(())
}

fn merge_value(
    existing: &mut Value,
    incoming: &Value,
    path: &str,
    group_by: Option<&str>,
    dedup_by: Option<&str>,
) -> Result<()> {
    match (existing, incoming) {
        (Value::Object(base), Value::Object(overlay)) => {
            merge_objects(base, overlay, path, group_by, dedup_by)
        }
        (Value::Array(base), Value::Array(overlay)) => {
            *base = grouped_concat(base, overlay, path, group_by, dedup_by)?;
            Ok(())
        }
        // Scalar siblings: last writer wins within the group
        (existing, incoming) if json_kind(existing) == json_kind(incoming) => {
            *existing = incoming.clone();
            Ok(())
        }
        (existing, incoming) => Err(mismatch(
            path,
            format!(
                "cannot merge {} with {}",
                json_kind(existing),
                json_kind(incoming)
            ),
        )),
    }
}

/// Concatenate two arrays, merging same-group objects and dropping duplicates.
///
/// Elements whose identity comes from the `group_by` field merge into their
/// group; everything else de-duplicates stably — later duplicates are
/// dropped, never replacing earlier elements.
fn grouped_concat(
    base: &[Value],
    overlay: &[Value],
    path: &str,
    group_by: Option<&str>,
    dedup_by: Option<&str>,
) -> Result<Vec<Value>> {
    let mut out: Vec<Value> = Vec::new();
    let mut index: BTreeMap<String, usize> = BTreeMap::new();

    for item in base.iter().chain(overlay.iter()) {
        let (identity, mergeable) = element_identity(item, group_by, dedup_by);
        match index.get(&identity) {
            Some(&at) if mergeable => {
                if let (Value::Object(grouped), Value::Object(incoming)) = (&mut out[at], item) {
                    merge_objects(grouped, incoming, path, group_by, dedup_by)?;
                }
            }
            Some(_) => {
                // Duplicate dropped, first occurrence kept
            }
            None => {
                index.insert(identity, out.len());
                out.push(item.clone());
            }
        }
    }

    Ok(out)
}

/// Identity of an array element, and whether same-identity elements merge.
///
/// A `group_by` field on an object element makes it a group (mergeable). A
/// `dedup_by` field yields a plain de-dup key (e.g. a command string), as
/// does the element's canonical JSON otherwise.
fn element_identity(
    item: &Value,
    group_by: Option<&str>,
    dedup_by: Option<&str>,
) -> (String, bool) {
    if let Some(field) = group_by
        && let Value::Object(map) = item
        && let Some(value) = map.get(field)
    {
        return (format!("group:{}", value_string(value)), true);
    }
    if let Some(field) = dedup_by
        && let Value::Object(map) = item
        && let Some(value) = map.get(field)
    {
        return (format!("field:{}", value_string(value)), false);
    }
    (format!("value:{}", canonical_key(item)), false)
}

fn value_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => canonical_key(other),
    }
}

/// Canonical JSON of a value; object keys are already sorted by serde_json.
pub(super) fn canonical_key(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

fn mismatch(path: &str, detail: String) -> Error {
    Error::StrategyTypeMismatch {
        key_path: path.to_string(),
        detail,
    }
}
