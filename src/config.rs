// Tue Jan 13 2026 - Alex

use crate::memory::scanner::DEFAULT_EXCLUDED_MAPPINGS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub scanning: ScanningConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanningConfig {
    pub alignment: usize,
    pub max_results: usize,
    /// Mapping names never scanned, matched exactly against the backing name.
    pub excluded_mappings: Vec<String>,
    /// Regions larger than this are skipped.
    pub max_region_size: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            scanning: ScanningConfig::default(),
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl Default for ScanningConfig {
    fn default() -> Self {
        Self {
            alignment: 1,
            max_results: 64,
            excluded_mappings: DEFAULT_EXCLUDED_MAPPINGS.iter().map(|s| s.to_string()).collect(),
            max_region_size: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !ext.eq_ignore_ascii_case("json") {
            return Err(ConfigError::UnsupportedFormat(ext.to_string()));
        }

        let contents = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = serde_json::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        fs::write(path, contents)?;
        Ok(())
    }

    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                log::debug!("Using default config ({})", e);
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if crate::utils::logging::level_from_str(&self.general.log_level).is_none() {
            return Err(ConfigError::Validation(format!(
                "unknown log_level '{}'",
                self.general.log_level
            )));
        }
        if self.scanning.alignment == 0 {
            return Err(ConfigError::Validation("alignment must be > 0".to_string()));
        }
        if self.scanning.max_results == 0 {
            return Err(ConfigError::Validation("max_results must be > 0".to_string()));
        }
        if self.scanning.max_region_size == Some(0) {
            return Err(ConfigError::Validation("max_region_size must be > 0".to_string()));
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0:?}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Validation error: {0}")]
    Validation(String),
}
