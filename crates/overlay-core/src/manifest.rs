//! Compose manifest parsing (.overlay/config.toml)
//!
//! The manifest declares, per JSON target, the ordered layer list and the
//! strategy table, and per text target, the managed section list. Paths are
//! relative to the project root.
//!
//! ```toml
//! [[settings]]
//! target = ".assistant/settings.json"
//!
//! [[settings.layer]]
//! source = "base"
//! precedence = 0
//! path = "layers/base.json"
//!
//! [[settings.layer]]
//! source = "python"
//! precedence = 10
//! path = "layers/python.json"
//! when = ["python"]
//!
//! [settings.strategy]
//! "permissions.allow" = "union"
//! hooks = { strategy = "deep-merge", dedup-by = "command" }
//! feedbackSurveyState = "preserved"
//!
//! [[document]]
//! target = "ASSISTANT.md"
//!
//! [[document.section]]
//! name = "python"
//! version = "0.1.0"
//! source = "sections/python.md"
//! when = ["python"]
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use semver::Version;
use serde::Deserialize;

use crate::compose::{MergeStrategy, StrategyTable};
use crate::error::{Error, Result};

/// The parsed manifest.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    /// JSON settings targets
    #[serde(default)]
    pub settings: Vec<SettingsTarget>,

    /// Managed text document targets
    #[serde(default)]
    pub document: Vec<DocumentTarget>,
}

/// One composed JSON settings file.
#[derive(Debug, Clone, Deserialize)]
pub struct SettingsTarget {
    /// Path of the installed file, relative to the project root
    pub target: String,

    /// Ordered layer list
    #[serde(default)]
    pub layer: Vec<LayerSpec>,

    /// Key path → strategy
    #[serde(default)]
    pub strategy: BTreeMap<String, StrategySpec>,
}

impl SettingsTarget {
    /// Build the strategy table from the declared specs.
    pub fn strategy_table(&self) -> Result<StrategyTable> {
        let mut table = StrategyTable::new();
        for (key_path, spec) in &self.strategy {
            table.insert(key_path.clone(), spec.resolve()?);
        }
        Ok(table)
    }
}

/// One layer contributing to a settings target.
#[derive(Debug, Clone, Deserialize)]
pub struct LayerSpec {
    /// Name used in error reports
    pub source: String,
    /// Lower is applied first; unique per target
    pub precedence: u32,
    /// Fragment file, relative to the project root
    pub path: String,
    /// Activation tags; empty means always active
    #[serde(default)]
    pub when: Vec<String>,
}

impl LayerSpec {
    /// Whether this layer participates given the caller's tags.
    pub fn active_for(&self, tags: &[String]) -> bool {
        self.when.is_empty() || self.when.iter().any(|t| tags.contains(t))
    }
}

/// One managed text document.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentTarget {
    /// Path of the installed file, relative to the project root
    pub target: String,

    /// Managed sections to upsert, in order
    #[serde(default)]
    pub section: Vec<SectionSpec>,
}

/// One managed section of a document target.
#[derive(Debug, Clone, Deserialize)]
pub struct SectionSpec {
    pub name: String,
    pub version: Version,
    /// Body file, relative to the project root
    pub source: String,
    /// Activation tags; empty means always active
    #[serde(default)]
    pub when: Vec<String>,
}

impl SectionSpec {
    pub fn active_for(&self, tags: &[String]) -> bool {
        self.when.is_empty() || self.when.iter().any(|t| tags.contains(t))
    }
}

/// A strategy as written in the manifest: a bare name or a detailed table.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StrategySpec {
    Name(String),
    Detailed {
        strategy: String,
        #[serde(default, rename = "group-by")]
        group_by: Option<String>,
        #[serde(default, rename = "dedup-by")]
        dedup_by: Option<String>,
    },
}

impl StrategySpec {
    /// Resolve to a [`MergeStrategy`].
    pub fn resolve(&self) -> Result<MergeStrategy> {
        let (name, group_by, dedup_by) = match self {
            StrategySpec::Name(name) => (name.as_str(), None, None),
            StrategySpec::Detailed {
                strategy,
                group_by,
                dedup_by,
            } => (strategy.as_str(), group_by.clone(), dedup_by.clone()),
        };

        match name {
            "union" => Ok(MergeStrategy::Union),
            "deep-merge" => Ok(MergeStrategy::DeepMerge { group_by, dedup_by }),
            "last-writer-wins" => Ok(MergeStrategy::LastWriterWins),
            "preserved" => Ok(MergeStrategy::Preserved),
            other => Err(Error::UnknownStrategy {
                name: other.to_string(),
            }),
        }
    }
}

impl Manifest {
    /// Parse a manifest from TOML content.
    pub fn parse(content: &str) -> Result<Self> {
        let manifest: Manifest = toml::from_str(content)?;
        Ok(manifest)
    }

    /// Load a manifest from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| overlay_fs::Error::io(path, e))?;
        Self::parse(&content)
    }
}
