//! Per-key merge strategies
//!
//! The strategy table is first-class configuration: a map from dotted key
//! paths to strategies, passed into `compose` alongside the layers. Keys
//! without a rule fall back to last-writer-wins.

use std::collections::BTreeMap;

/// How layer values for one key path are folded together.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MergeStrategy {
    /// Arrays concatenated in precedence order, de-duplicated by value,
    /// first occurrence kept
    Union,
    /// Objects merged key-wise; arrays of objects grouped by `group_by`;
    /// nested arrays de-duplicated by the `dedup_by` field of each element;
    /// scalar siblings last-writer-wins
    DeepMerge {
        group_by: Option<String>,
        dedup_by: Option<String>,
    },
    /// The highest-precedence definition replaces the value wholesale
    #[default]
    LastWriterWins,
    /// Never taken from layers; carried over from the installed document
    /// when present there
    Preserved,
}

/// Dotted key path → strategy.
#[derive(Debug, Clone, Default)]
pub struct StrategyTable {
    rules: BTreeMap<String, MergeStrategy>,
}

impl StrategyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style rule registration.
    pub fn with_rule(mut self, key_path: impl Into<String>, strategy: MergeStrategy) -> Self {
        self.insert(key_path, strategy);
        self
    }

    pub fn insert(&mut self, key_path: impl Into<String>, strategy: MergeStrategy) {
        self.rules.insert(key_path.into(), strategy);
    }

    /// Exact rule for a key path, if declared.
    pub fn get(&self, key_path: &str) -> Option<&MergeStrategy> {
        self.rules.get(key_path)
    }

    /// Whether any rule is declared strictly below this key path.
    ///
    /// A rule at `permissions.allow` makes `permissions` merge structurally
    /// even without its own rule, so the nested rule stays reachable.
    pub fn has_rules_under(&self, key_path: &str) -> bool {
        let prefix = format!("{key_path}.");
        self.rules
            .range(prefix.clone()..)
            .next()
            .is_some_and(|(k, _)| k.starts_with(&prefix))
    }

    /// Next path segments of all rules declared strictly below a key path.
    pub fn child_segments(&self, key_path: &str) -> Vec<&str> {
        let prefix = format!("{key_path}.");
        let mut segments: Vec<&str> = self
            .rules
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .filter_map(|(k, _)| k[prefix.len()..].split('.').next())
            .collect();
        segments.dedup();
        segments
    }

    /// First segments of every `Preserved` rule path.
    ///
    /// These top-level keys must be visited even when no layer contributes
    /// them, so installed values can be carried over.
    pub fn preserved_roots(&self) -> impl Iterator<Item = &str> {
        self.rules
            .iter()
            .filter(|(_, s)| matches!(s, MergeStrategy::Preserved))
            .filter_map(|(k, _)| k.split('.').next())
    }
}
