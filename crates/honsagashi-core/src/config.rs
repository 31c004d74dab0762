use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{NdlError, Result};

pub const DEFAULT_BASE_URL: &str = "https://ndlsearch.ndl.go.jp";
pub const DEFAULT_MAX_RESULTS: u32 = 20;
/// Upper bound documented for the `cnt` parameter of the OpenSearch API.
pub const OPENSEARCH_MAX_RESULTS: u32 = 500;
pub const DEFAULT_FILENAME_SHORTCUT: bool = true;
pub const DEFAULT_CLEAN_AUTHORNAME: bool = true;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Host-managed options, loaded from `~/.config/honsagashi/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PluginConfig {
    pub max_results: u32,
    pub filename_shortcut: bool,
    pub clean_authorname: bool,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
            filename_shortcut: DEFAULT_FILENAME_SHORTCUT,
            clean_authorname: DEFAULT_CLEAN_AUTHORNAME,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    Number,
    Bool,
}

/// Describes one entry of the configuration surface for the host's option UI.
#[derive(Debug, Clone, Serialize)]
pub struct OptionDescriptor {
    pub name: &'static str,
    pub kind: OptionKind,
    pub default: serde_json::Value,
    pub label: &'static str,
    pub tooltip: &'static str,
}

impl PluginConfig {
    /// Standard config file path, overridable with `HONSAGASHI_CONFIG`.
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("HONSAGASHI_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("honsagashi")
            .join("config.toml")
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load from a specific path, falling back to defaults if the file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(NdlError::Config("base_url must not be empty".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(NdlError::Config("timeout_secs must be positive".to_string()));
        }
        Ok(())
    }

    /// `max_results` clamped to what the OpenSearch endpoint accepts.
    pub fn effective_max_results(&self) -> u32 {
        self.max_results.clamp(1, OPENSEARCH_MAX_RESULTS)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn options() -> Vec<OptionDescriptor> {
        vec![
            OptionDescriptor {
                name: "max_results",
                kind: OptionKind::Number,
                default: DEFAULT_MAX_RESULTS.into(),
                label: "Maximum number of search results",
                tooltip: "The NDL OpenSearch API returns at most 500 records per query.",
            },
            OptionDescriptor {
                name: "filename_shortcut",
                kind: OptionKind::Bool,
                default: DEFAULT_FILENAME_SHORTCUT.into(),
                label: "Filename-based quick import",
                tooltip: "Write the NDLBibID into the title as [NDLBibID] and the record is downloaded directly.",
            },
            OptionDescriptor {
                name: "clean_authorname",
                kind: OptionKind::Bool,
                default: DEFAULT_CLEAN_AUTHORNAME.into(),
                label: "Clean author names",
                tooltip: "Remove spaces, commas and digits (such as birth years) from author names.",
            },
        ]
    }
}
