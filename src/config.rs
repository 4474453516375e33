//! Report Configuration
//! Input table locations, their text encodings and output settings.
//!
//! Every field has a default matching the standard data layout, so a run
//! without `report.toml` reads `data/*.csv` and writes into `charts/`.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Optional configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = "report.toml";

/// Resolution of the written chart images.
pub const DEFAULT_DPI: u32 = 300;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Output DPI must be positive")]
    ZeroDpi,
}

/// Text encoding of an input table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Utf8,
    Latin1,
}

fn default_encoding() -> Encoding {
    Encoding::Latin1
}

/// One input CSV file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TableSource {
    pub path: PathBuf,
    #[serde(default = "default_encoding")]
    pub encoding: Encoding,
}

impl TableSource {
    fn latin1(path: &str) -> Self {
        Self {
            path: PathBuf::from(path),
            encoding: Encoding::Latin1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub incidents: TableSource,
    pub income: TableSource,
    pub education: TableSource,
    pub poverty: TableSource,
    pub race_share: TableSource,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            incidents: TableSource::latin1("data/Deaths_by_Police_US.csv"),
            income: TableSource::latin1("data/Median_Household_Income_2015.csv"),
            education: TableSource::latin1("data/Pct_Over_25_Completed_High_School.csv"),
            poverty: TableSource::latin1("data/Pct_People_Below_Poverty_Level.csv"),
            race_share: TableSource::latin1("data/Share_of_Race_By_City.csv"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub dpi: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("charts"),
            dpi: DEFAULT_DPI,
        }
    }
}

/// Complete report configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub input: InputConfig,
    pub output: OutputConfig,
}

impl ReportConfig {
    /// Parse a configuration from TOML text; absent keys keep their defaults.
    pub fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: ReportConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if config.output.dpi == 0 {
            return Err(ConfigError::ZeroDpi);
        }

        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml(&content, path)
    }
}
