//! Configuration handling for shapeio
//!
//! Configuration is read from `~/.config/shapeio/config.toml` (global) and
//! the nearest `shapeio.toml` found by walking up from the working directory
//! (project). Keys set in the project file override the global ones.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::{DecodeOptions, FormatOptions, LineEnding, TextEncoding, UnknownBlocks};
use crate::storage::SaveOptions;

/// File name of the project configuration
pub const PROJECT_CONFIG_FILE: &str = "shapeio.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Layout of written shape files
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FormatConfig {
    /// Indent units per nesting level
    pub indent: usize,

    /// Indent with tabs instead of spaces
    pub use_tabs: bool,

    pub line_ending: LineEnding,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            indent: 1,
            use_tabs: true,
            line_ending: LineEnding::Crlf,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct DecodeConfig {
    /// What to do with unknown shape-level blocks
    pub unknown_blocks: UnknownBlocks,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct IoConfig {
    /// Encoding of written files
    pub encoding: TextEncoding,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ToolsConfig {
    /// Path to the compression tool
    pub ffeditc: Option<PathBuf>,
}

/// Merged settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub format: FormatConfig,
    pub decode: DecodeConfig,
    pub io: IoConfig,
    pub tools: ToolsConfig,
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.format.indent == 0 && !self.format.use_tabs {
            return Err(ConfigError::Invalid(
                "format.indent must be at least 1 when indenting with spaces".to_string(),
            ));
        }
        if self.format.indent > 16 {
            return Err(ConfigError::Invalid(format!(
                "format.indent of {} is too large",
                self.format.indent
            )));
        }
        Ok(())
    }

    pub fn format_options(&self) -> FormatOptions {
        FormatOptions {
            indent: self.format.indent,
            use_tabs: self.format.use_tabs,
            line_ending: self.format.line_ending,
        }
    }

    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            unknown_blocks: self.decode.unknown_blocks,
        }
    }

    pub fn save_options(&self) -> SaveOptions {
        SaveOptions {
            format: self.format_options(),
            encoding: self.io.encoding,
        }
    }
}

/// Combined configuration (global + project)
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub settings: Settings,
    pub project_root: Option<PathBuf>,
}

impl Config {
    /// Loads configuration from default locations
    pub fn load() -> Result<Self> {
        let global = Self::global_config_dir().map(|dir| dir.join("config.toml"));
        let project_root = Self::find_project_root();
        let project = project_root
            .as_ref()
            .map(|root| root.join(PROJECT_CONFIG_FILE));

        let settings = Self::load_layers(global.as_deref(), project.as_deref())?;
        Ok(Self {
            settings,
            project_root,
        })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "shapeio", "shapeio").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Reads both layers and merges them key by key
    pub fn load_layers(global: Option<&Path>, project: Option<&Path>) -> Result<Settings> {
        let mut merged = toml::Table::new();
        for path in [global, project].into_iter().flatten() {
            if let Some(layer) = Self::read_table(path)? {
                merge_tables(&mut merged, layer);
            }
        }

        let settings: Settings = toml::Value::Table(merged)
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Parse(e.to_string()))
            .context("Failed to parse configuration")?;

        settings.validate()?;
        Ok(settings)
    }

    fn read_table(path: &Path) -> Result<Option<toml::Table>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        toml::from_str(&content)
            .map(Some)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Finds the nearest directory holding a `shapeio.toml`
    pub fn find_project_root() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;

        loop {
            if current.join(PROJECT_CONFIG_FILE).is_file() {
                return Some(current);
            }

            if !current.pop() {
                return None;
            }
        }
    }
}

fn merge_tables(base: &mut toml::Table, layer: toml::Table) {
    for (key, value) in layer {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming)
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
