//! Configuration parsing for symtree
//!
//! Handles the YAML configuration file that lists the source roots, the
//! glob patterns to match below them and the destination of the mirrored
//! link tree.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::resolver::clean_path;

/// Configuration file names looked up in the start directory, in order
pub const CONFIG_FILE_NAMES: &[&str] = &["config.yml", "config.yaml"];

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Root of the mirrored link tree
    #[serde(alias = "destination_path", alias = "destinationpath")]
    pub destination_path: PathBuf,

    /// Glob patterns matched below every source path
    pub patterns: Vec<String>,

    /// Roots searched for matches, in order
    #[serde(alias = "source_paths", alias = "sourcepaths")]
    pub source_paths: Vec<PathBuf>,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        if config.destination_path.as_os_str().is_empty() {
            anyhow::bail!(
                "Invalid config file {}: destinationPath must not be empty",
                path.display()
            );
        }

        Ok(config)
    }

    /// Find the configuration file in `start_dir`
    pub fn find_config(start_dir: &Path) -> Result<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| start_dir.join(name))
            .find(|candidate| candidate.is_file())
            .with_context(|| {
                format!(
                    "Could not find {} in {}",
                    CONFIG_FILE_NAMES.join(" or "),
                    start_dir.display()
                )
            })
    }

    /// Make every path absolute against `base` and clean it lexically.
    ///
    /// Cleaning matters beyond cosmetics: the source roots are later
    /// stripped from discovered paths byte for byte.
    pub fn resolve(self, base: &Path) -> Self {
        let absolute = |path: &Path| {
            if path.is_absolute() {
                clean_path(path)
            } else {
                clean_path(&base.join(path))
            }
        };

        Self {
            destination_path: absolute(&self.destination_path),
            patterns: self.patterns,
            source_paths: self.source_paths.iter().map(|p| absolute(p)).collect(),
        }
    }
}
