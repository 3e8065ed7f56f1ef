//! Tool configuration.
//!
//! Settings come from an optional JSON file; every field has a default, so a
//! missing file or an empty object is a valid configuration. Per-command CLI
//! flags override the values loaded here.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use nus3kit_audio::{DEFAULT_CONVERSION_EXTENSIONS, DEFAULT_TIMEOUT_SECS};

/// Config file consulted when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "nus3kit.json";

/// Bank template file name under the resources directory.
pub const NUS3BANK_TEMPLATE_FILE: &str = "template.nus3bank";

/// Bank id reference table file name under the resources directory.
pub const NUS3BANK_IDS_FILE: &str = "nus3bank_ids.csv";

/// Top-level tool configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory searched for the external tool executables.
    pub tools_path: PathBuf,
    /// Directory holding the bank template and the id reference table.
    pub resources_path: PathBuf,
    /// Root for scoped conversion staging directories; system temp when unset.
    pub temp_path: Option<PathBuf>,
    /// Codec conversion targets and triggers.
    pub conversion: ConversionConfig,
    /// Kill external tools after this many seconds.
    pub tool_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tools_path: PathBuf::from("tools"),
            resources_path: PathBuf::from("resources"),
            temp_path: None,
            conversion: ConversionConfig::default(),
            tool_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Conversion section of the configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConversionConfig {
    /// Primary conversion target format.
    pub format: String,
    /// Retried once after a failed primary conversion; empty disables it.
    pub fallback_format: String,
    /// Input extensions that require conversion before embedding.
    pub extensions: Vec<String>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            format: "lopus".to_string(),
            fallback_format: "idsp".to_string(),
            extensions: DEFAULT_CONVERSION_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

impl Config {
    /// Loads the configuration.
    ///
    /// An explicitly given path must exist and parse. Without one, the
    /// default file is read when present and the built-in defaults are used
    /// otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Path of the bank template inside the resources directory.
    pub fn template_path(&self) -> PathBuf {
        self.resources_path.join(NUS3BANK_TEMPLATE_FILE)
    }

    /// Path of the id reference table inside the resources directory.
    pub fn ids_path(&self) -> PathBuf {
        self.resources_path.join(NUS3BANK_IDS_FILE)
    }

    /// Root directory for conversion staging.
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_path
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}
