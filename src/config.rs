//! Engine configuration, persisted as TOML.
//!
//! ```toml
//! [[sources]]
//! name = "community"
//! path = "stats/community.jsonl"
//!
//! [[sources]]
//! name = "local"
//! path = "stats/local.jsonl"
//! enabled = false
//!
//! [catalog]
//! accept_unlisted = true
//! source_nodes = ["csv-reader"]
//!
//! [catalog.aliases]
//! "legacy.CSVReader" = "csv-reader"
//! ```
//!
//! Relative source paths resolve against the directory of the config file.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::node::{NodeCatalog, NodeType};
use crate::source::{FileStatisticsSource, StatisticsSource};

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// One `[[sources]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Display name; unique within a config.
    pub name: String,
    /// JSON-lines statistics file.
    pub path: PathBuf,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// The `[catalog]` table: which node ids are known and what type they have.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Resolve ids that are not listed as ordinary nodes.
    #[serde(default)]
    pub accept_unlisted: bool,
    /// Nodes without input ports.
    #[serde(default)]
    pub source_nodes: Vec<String>,
    #[serde(default)]
    pub other_nodes: Vec<String>,
    /// Legacy id → current id.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

impl CatalogConfig {
    pub fn to_catalog(&self) -> NodeCatalog {
        let mut catalog = NodeCatalog::new().accepting_unlisted(self.accept_unlisted);
        for id in &self.other_nodes {
            catalog.insert(id.as_str(), NodeType::Other);
        }
        for id in &self.source_nodes {
            catalog.insert(id.as_str(), NodeType::Source);
        }
        for (legacy, current) in &self.aliases {
            catalog.alias(legacy.as_str(), current.as_str());
        }
        catalog
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

fn default_enabled() -> bool {
    true
}

impl EngineConfig {
    /// A starter config pointing at `stats/default.jsonl`.
    pub fn example() -> Self {
        Self {
            sources: vec![SourceConfig {
                name: "default".into(),
                path: PathBuf::from("stats/default.jsonl"),
                enabled: true,
            }],
            catalog: CatalogConfig {
                accept_unlisted: true,
                ..Default::default()
            },
        }
    }

    /// Load and validate a config file. Relative source paths are made
    /// absolute against the file's directory.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut config = Self::parse(&content, path)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        for source in &mut config.sources {
            if source.path.is_relative() {
                source.path = base.join(&source.path);
            }
        }
        Ok(config)
    }

    fn parse(content: &str, path: &Path) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let mut names = HashSet::new();
        for source in &self.sources {
            if !names.insert(source.name.as_str()) {
                return Err(ConfigError::DuplicateSource {
                    name: source.name.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: path.display().to_string(),
                source,
            })?;
        }
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.display().to_string(),
            source,
        })
    }

    /// One file source per `[[sources]]` entry, in config order.
    pub fn statistics_sources(&self) -> Vec<Arc<dyn StatisticsSource>> {
        self.sources
            .iter()
            .map(|s| {
                Arc::new(
                    FileStatisticsSource::new(s.name.clone(), s.path.clone())
                        .with_enabled(s.enabled),
                ) as Arc<dyn StatisticsSource>
            })
            .collect()
    }
}
