//! Change reporting for compose and apply operations
//!
//! Every mutating operation reports exactly what it did per key or section,
//! so callers can print "added/updated/unchanged" without re-diffing.

use serde::Serialize;

/// What happened to one key or section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeAction {
    Added,
    Updated,
    Unchanged,
    /// Carried over from the installed document, not supplied by layers
    Preserved,
    /// Declared but not applicable (e.g. a preserved key with no installed value)
    Skipped,
    Removed,
}

/// One reported change.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeEntry {
    pub subject: String,
    pub action: ChangeAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Ordered list of changes from one operation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChangeSet {
    pub entries: Vec<ChangeEntry>,
}

impl ChangeSet {
    /// Record a change without detail.
    pub fn record(&mut self, subject: impl Into<String>, action: ChangeAction) {
        self.entries.push(ChangeEntry {
            subject: subject.into(),
            action,
            detail: None,
        });
    }

    /// Record a change with a human-readable detail.
    pub fn record_with_detail(
        &mut self,
        subject: impl Into<String>,
        action: ChangeAction,
        detail: impl Into<String>,
    ) {
        self.entries.push(ChangeEntry {
            subject: subject.into(),
            action,
            detail: Some(detail.into()),
        });
    }

    /// True when nothing would change on disk.
    pub fn is_noop(&self) -> bool {
        self.entries.iter().all(|e| {
            matches!(
                e.action,
                ChangeAction::Unchanged | ChangeAction::Preserved | ChangeAction::Skipped
            )
        })
    }

    /// Compact summary like "2 added, 1 updated, 3 unchanged".
    pub fn summary(&self) -> String {
        let mut counts: Vec<(ChangeAction, usize)> = Vec::new();
        for entry in &self.entries {
            match counts.iter_mut().find(|(a, _)| *a == entry.action) {
                Some((_, n)) => *n += 1,
                None => counts.push((entry.action, 1)),
            }
        }
        if counts.is_empty() {
            return "no changes".to_string();
        }
        counts
            .iter()
            .map(|(action, n)| {
                let label = match action {
                    ChangeAction::Added => "added",
                    ChangeAction::Updated => "updated",
                    ChangeAction::Unchanged => "unchanged",
                    ChangeAction::Preserved => "preserved",
                    ChangeAction::Skipped => "skipped",
                    ChangeAction::Removed => "removed",
                };
                format!("{n} {label}")
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_by_action() {
        let mut changes = ChangeSet::default();
        changes.record("a", ChangeAction::Added);
        changes.record("b", ChangeAction::Added);
        changes.record("c", ChangeAction::Updated);

        assert_eq!(changes.summary(), "2 added, 1 updated");
    }

    #[test]
    fn empty_changeset_is_noop() {
        assert!(ChangeSet::default().is_noop());
        assert_eq!(ChangeSet::default().summary(), "no changes");
    }

    #[test]
    fn added_entries_are_not_noop() {
        let mut changes = ChangeSet::default();
        changes.record("key", ChangeAction::Added);
        assert!(!changes.is_noop());
    }

    #[test]
    fn preserved_and_unchanged_are_noop() {
        let mut changes = ChangeSet::default();
        changes.record("a", ChangeAction::Unchanged);
        changes.record("b", ChangeAction::Preserved);
        assert!(changes.is_noop());
    }
}
