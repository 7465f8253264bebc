//! Manifest-driven synchronization
//!
//! The syncer reads the manifest, computes the desired state of every
//! declared target (a pure step), then pushes each changed target through the
//! engine's apply sequence. The read that feeds composition also supplies the
//! expected prior digest, closing the decide-then-write window.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use overlay_content::{Anchor, Section, SectionDocument, SectionOutcome};
use overlay_fs::content_digest;

use crate::apply::{ApplyOutcome, Engine, TargetKind};
use crate::compose::{Layer, compose, render_canonical};
use crate::drift::DriftState;
use crate::error::{Error, Result};
use crate::manifest::{DocumentTarget, Manifest, SettingsTarget};
use crate::report::{ChangeAction, ChangeSet};

/// Directory under the project root holding manifest, backups, and state
pub const STATE_DIR: &str = ".overlay";

/// Manifest file name inside the state directory
pub const MANIFEST_FILE: &str = "config.toml";

/// Options for sync operations.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Simulate without writing; actions are prefixed with "[dry-run]"
    pub dry_run: bool,
    /// Tags activating conditional layers and sections (supplied by the
    /// caller, e.g. from language detection)
    pub tags: Vec<String>,
}

/// Report from a sync operation.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    /// Whether the operation completed without errors
    pub success: bool,
    /// Actions taken, one line per target
    pub actions: Vec<String>,
    /// Errors encountered
    pub errors: Vec<String>,
}

impl SyncReport {
    /// Create a successful empty report.
    pub fn success() -> Self {
        Self {
            success: true,
            actions: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Add an action to the report.
    pub fn with_action(mut self, action: String) -> Self {
        self.actions.push(action);
        self
    }
}

/// A computed target state, before any write.
#[derive(Debug)]
pub struct TargetPreview {
    pub path: PathBuf,
    pub kind: TargetKind,
    /// Installed content, if the file exists
    pub current: Option<String>,
    /// What the file should contain
    pub desired: String,
    /// Per-key or per-section outcomes
    pub changes: ChangeSet,
    /// Digest of `current`, fed to the optimistic check on apply
    pub prior_digest: Option<String>,
}

/// Synchronizes all targets declared in a manifest.
pub struct Syncer {
    root: PathBuf,
    manifest: Manifest,
    engine: Engine,
}

impl Syncer {
    /// Load the manifest from `<root>/.overlay/config.toml`.
    pub fn load(root: &Path) -> Result<Self> {
        let manifest_path = root.join(STATE_DIR).join(MANIFEST_FILE);
        let manifest = Manifest::load(&manifest_path)?;
        Ok(Self::with_manifest(root, manifest))
    }

    /// Use an already-parsed manifest.
    pub fn with_manifest(root: &Path, manifest: Manifest) -> Self {
        Self {
            root: root.to_path_buf(),
            manifest,
            engine: Engine::new(root.join(STATE_DIR)),
        }
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// All declared target paths, resolved against the project root.
    pub fn targets(&self) -> Vec<PathBuf> {
        let mut targets: Vec<PathBuf> = self
            .manifest
            .settings
            .iter()
            .map(|s| self.root.join(&s.target))
            .collect();
        targets.extend(self.manifest.document.iter().map(|d| self.root.join(&d.target)));
        targets
    }

    /// Resolve a target by its manifest-relative name.
    pub fn resolve_target(&self, name: &str) -> Result<PathBuf> {
        let declared = self
            .manifest
            .settings
            .iter()
            .map(|s| s.target.as_str())
            .chain(self.manifest.document.iter().map(|d| d.target.as_str()))
            .any(|t| t == name);
        if !declared {
            return Err(Error::UnknownTarget {
                name: name.to_string(),
            });
        }
        Ok(self.root.join(name))
    }

    /// Compute the desired state of every target without writing anything.
    pub fn preview(&self, tags: &[String]) -> Result<Vec<TargetPreview>> {
        let mut previews = Vec::new();
        for settings in &self.manifest.settings {
            previews.push(self.preview_settings(settings, tags)?);
        }
        for document in &self.manifest.document {
            previews.push(self.preview_document(document, tags)?);
        }
        Ok(previews)
    }

    /// Apply every preview that differs from the installed state.
    pub fn sync(&self, options: &SyncOptions) -> Result<SyncReport> {
        let mut report = SyncReport::success();
        let previews = self.preview(&options.tags)?;

        for preview in previews {
            let display = preview
                .path
                .strip_prefix(&self.root)
                .unwrap_or(&preview.path)
                .display()
                .to_string();

            if preview.current.as_deref() == Some(preview.desired.as_str()) {
                report = report.with_action(format!("Unchanged {display}"));
                continue;
            }

            if options.dry_run {
                report = report.with_action(format!(
                    "[dry-run] Would update {display} ({})",
                    preview.changes.summary()
                ));
                continue;
            }

            match self.engine.apply(
                &preview.path,
                &preview.desired,
                preview.kind,
                preview.prior_digest.as_deref(),
            ) {
                Ok(ApplyOutcome::Written { backup, .. }) => {
                    report = report.with_action(format!(
                        "Updated {display} ({}); backup at {}",
                        preview.changes.summary(),
                        backup.backup_path.display()
                    ));
                }
                Ok(ApplyOutcome::Unchanged) => {
                    report = report.with_action(format!("Unchanged {display}"));
                }
                Err(e) => {
                    report.errors.push(format!("Failed to update {display}: {e}"));
                }
            }
        }

        report.success = report.errors.is_empty();
        Ok(report)
    }

    /// Drift state of every declared target.
    pub fn status(&self) -> Result<Vec<(PathBuf, DriftState)>> {
        let mut states = Vec::new();
        for target in self.targets() {
            let state = self.engine.status(&target)?;
            states.push((target, state));
        }
        Ok(states)
    }

    fn preview_settings(&self, spec: &SettingsTarget, tags: &[String]) -> Result<TargetPreview> {
        let path = self.root.join(&spec.target);
        let current = read_optional(&path)?;

        let installed: Option<Value> = match &current {
            Some(text) => {
                Some(
                    serde_json::from_str(text).map_err(|e| Error::InvalidContent {
                        path: path.clone(),
                        kind: "JSON".to_string(),
                        message: format!("installed document is unreadable: {e}"),
                    })?,
                )
            }
            None => None,
        };

        let mut layers = Vec::new();
        for layer_spec in &spec.layer {
            if !layer_spec.active_for(tags) {
                tracing::debug!(source = %layer_spec.source, "layer inactive for supplied tags");
                continue;
            }
            let layer_path = self.root.join(&layer_spec.path);
            let text = fs::read_to_string(&layer_path)
                .map_err(|e| overlay_fs::Error::io(&layer_path, e))?;
            layers.push(Layer::parse(&layer_spec.source, layer_spec.precedence, &text)?);
        }

        let table = spec.strategy_table()?;
        let composed = compose(&layers, installed.as_ref(), &table)?;
        let desired = render_canonical(&composed.document);
        let prior_digest = current.as_ref().map(|t| content_digest(t.as_bytes()));

        Ok(TargetPreview {
            path,
            kind: TargetKind::Json,
            current,
            desired,
            changes: composed.changes,
            prior_digest,
        })
    }

    fn preview_document(&self, spec: &DocumentTarget, tags: &[String]) -> Result<TargetPreview> {
        let path = self.root.join(&spec.target);
        let current = read_optional(&path)?;
        let mut text = current.clone().unwrap_or_default();
        let mut changes = ChangeSet::default();

        for section_spec in &spec.section {
            if !section_spec.active_for(tags) {
                tracing::debug!(section = %section_spec.name, "section inactive for supplied tags");
                continue;
            }
            let body_path = self.root.join(&section_spec.source);
            let body = fs::read_to_string(&body_path)
                .map_err(|e| overlay_fs::Error::io(&body_path, e))?;

            let section = Section::new(&section_spec.name, section_spec.version.clone(), body);
            let document = SectionDocument::parse(text.as_str())?;
            let (next, outcome) = document.upsert(&section, &Anchor::Auto)?;

            let action = match outcome {
                SectionOutcome::Inserted => ChangeAction::Added,
                SectionOutcome::Updated { .. } => ChangeAction::Updated,
                SectionOutcome::Unchanged => ChangeAction::Unchanged,
            };
            changes.record(section_spec.name.as_str(), action);
            text = next;
        }

        let prior_digest = current.as_ref().map(|t| content_digest(t.as_bytes()));

        Ok(TargetPreview {
            path,
            kind: TargetKind::Text,
            current,
            desired: text,
            changes,
            prior_digest,
        })
    }
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(overlay_fs::Error::io(path, e).into()),
    }
}
