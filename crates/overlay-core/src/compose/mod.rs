//! Layer composition
//!
//! `compose` folds an ordered list of JSON fragments into one settings
//! document under per-key merge strategies, overlaying `Preserved` keys from
//! the installed document. Composition is a pure function: identical inputs
//! produce byte-identical rendered output.

mod layer;
mod merge;
mod strategy;

pub use layer::Layer;
pub use strategy::{MergeStrategy, StrategyTable};

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::report::{ChangeAction, ChangeSet};
use layer::json_kind;

/// Result of a composition: the document plus what changed per key.
#[derive(Debug)]
pub struct Composed {
    pub document: Value,
    pub changes: ChangeSet,
}

/// Compose layers into one settings document.
///
/// Keys are collected across all fragments first, then folded per strategy in
/// ascending precedence order. `Preserved` keys ignore layers entirely and
/// are carried over from `installed` when present there.
pub fn compose(
    layers: &[Layer],
    installed: Option<&Value>,
    table: &StrategyTable,
) -> Result<Composed> {
    let ordered = order_layers(layers)?;

    let installed_map = match installed {
        Some(Value::Object(map)) => Some(map),
        Some(other) => {
            tracing::warn!(
                kind = json_kind(other),
                "installed document is not a JSON object; nothing will be preserved"
            );
            None
        }
        None => None,
    };

    // Top-level keys: everything any fragment contributes, plus roots of
    // preserved rules so installed values survive even with no contribution.
    let mut keys: std::collections::BTreeSet<String> = ordered
        .iter()
        .flat_map(|l| l.fragment().keys().cloned())
        .collect();
    for root in table.preserved_roots() {
        keys.insert(root.to_string());
    }

    let mut result = Map::new();
    let mut changes = ChangeSet::default();

    for key in keys {
        let contributions: Vec<(&Layer, &Value)> = ordered
            .iter()
            .filter_map(|l| l.fragment().get(&key).map(|v| (*l, v)))
            .collect();
        let installed_value = installed_map.and_then(|m| m.get(&key));

        let composed = compose_node(&key, &contributions, installed_value, table)?;

        let preserved = matches!(table.get(&key), Some(MergeStrategy::Preserved));
        match composed {
            Some(value) => {
                let action = if preserved {
                    ChangeAction::Preserved
                } else {
                    match installed_value {
                        None => ChangeAction::Added,
                        Some(prior) if *prior == value => ChangeAction::Unchanged,
                        Some(_) => ChangeAction::Updated,
                    }
                };
                changes.record(key.as_str(), action);
                result.insert(key, value);
            }
            None => {
                if preserved {
                    changes.record_with_detail(
                        key.as_str(),
                        ChangeAction::Skipped,
                        "preserved key absent from installed document",
                    );
                }
            }
        }
    }

    Ok(Composed {
        document: Value::Object(result),
        changes,
    })
}

/// Render a composed document canonically: pretty-printed JSON with
/// lexicographic keys and a trailing newline, so repeated runs are diff-free.
pub fn render_canonical(document: &Value) -> String {
    let mut text = serde_json::to_string_pretty(document).unwrap_or_else(|_| "{}".to_string());
    text.push('\n');
    text
}

/// Resolve the strategy at one key path and fold the contributions.
fn compose_node(
    path: &str,
    contributions: &[(&Layer, &Value)],
    installed: Option<&Value>,
    table: &StrategyTable,
) -> Result<Option<Value>> {
    match table.get(path) {
        Some(MergeStrategy::Union) => {
            if contributions.is_empty() {
                Ok(None)
            } else {
                merge::union(path, contributions).map(Some)
            }
        }
        Some(MergeStrategy::DeepMerge { group_by, dedup_by }) => {
            if contributions.is_empty() {
                Ok(None)
            } else {
                merge::deep_merge(path, contributions, group_by.as_deref(), dedup_by.as_deref())
                    .map(Some)
            }
        }
        Some(MergeStrategy::Preserved) => {
            if !contributions.is_empty() {
                tracing::debug!(key_path = path, "ignoring layer values for preserved key");
            }
            Ok(installed.cloned())
        }
        Some(MergeStrategy::LastWriterWins) => merge::last_writer_wins(path, contributions),
        None => {
            if table.has_rules_under(path) {
                descend(path, contributions, installed, table)
            } else {
                merge::last_writer_wins(path, contributions)
            }
        }
    }
}

/// Structural descent for keys without their own rule but with rules below.
fn descend(
    path: &str,
    contributions: &[(&Layer, &Value)],
    installed: Option<&Value>,
    table: &StrategyTable,
) -> Result<Option<Value>> {
    let mut maps = Vec::with_capacity(contributions.len());
    for (layer, value) in contributions {
        let Value::Object(map) = value else {
            return Err(Error::StrategyTypeMismatch {
                key_path: path.to_string(),
                detail: format!(
                    "layer '{}' supplies {}, but nested merge rules require an object",
                    layer.source_id,
                    json_kind(value)
                ),
            });
        };
        maps.push((*layer, map));
    }
    let installed_map = installed.and_then(|v| v.as_object());

    let mut keys: std::collections::BTreeSet<&str> = maps
        .iter()
        .flat_map(|(_, m)| m.keys().map(String::as_str))
        .collect();
    keys.extend(table.child_segments(path));

    let mut out = Map::new();
    for key in keys {
        let sub_path = format!("{path}.{key}");
        let sub_contributions: Vec<(&Layer, &Value)> = maps
            .iter()
            .filter_map(|(l, m)| m.get(key).map(|v| (*l, v)))
            .collect();
        let sub_installed = installed_map.and_then(|m| m.get(key));
        if let Some(value) = compose_node(&sub_path, &sub_contributions, sub_installed, table)? {
            out.insert(key.to_string(), value);
        }
    }

    if contributions.is_empty() && out.is_empty() {
        Ok(None)
    } else {
        Ok(Some(Value::Object(out)))
    }
}

/// Sort layers by precedence, rejecting duplicates.
fn order_layers(layers: &[Layer]) -> Result<Vec<&Layer>> {
    let mut ordered: Vec<&Layer> = layers.iter().collect();
    ordered.sort_by_key(|l| l.precedence);
    for pair in ordered.windows(2) {
        if pair[0].precedence == pair[1].precedence {
            return Err(Error::DuplicatePrecedence {
                precedence: pair[0].precedence,
                first: pair[0].source_id.clone(),
                second: pair[1].source_id.clone(),
            });
        }
    }
    Ok(ordered)
}
