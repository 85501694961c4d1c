//! Configuration file support for the CLI.
//!
//! The CLI reads an optional TOML file holding output preferences and the
//! storage settings used when opening or generating files:
//!
//! ```toml
//! output_format = "json"
//! default_limit = 50
//!
//! [reader]
//! batch_size = 256
//!
//! [writer]
//! compression = "lz4"
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use strata_columnar::{ReaderConfig, StrataConfig, WriterConfig};

/// CLI configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    /// Default output format.
    #[serde(default = "default_format")]
    pub output_format: String,

    /// Default row limit for `dump`.
    #[serde(default)]
    pub default_limit: Option<usize>,

    /// Reader settings.
    #[serde(default)]
    pub reader: ReaderConfig,

    /// Writer settings, used by `generate`.
    #[serde(default)]
    pub writer: WriterConfig,
}

fn default_format() -> String {
    "table".to_string()
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            output_format: default_format(),
            default_limit: None,
            reader: ReaderConfig::default(),
            writer: WriterConfig::default(),
        }
    }
}

impl CliConfig {
    /// Loads and validates configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        config.storage().validate()?;
        Ok(config)
    }

    /// Storage settings as a combined config.
    pub fn storage(&self) -> StrataConfig {
        StrataConfig {
            writer: self.writer.clone(),
            reader: self.reader.clone(),
        }
    }
}
