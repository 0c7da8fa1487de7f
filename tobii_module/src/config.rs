use crate::stream_engine::StreamEngineLibrary;
use anyhow::{Context, Result};
use api::ModuleLogger;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILENAME: &str = "tobii_module.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TobiiConfig {
    /// Stream Engine shared library to load.
    pub library_path: PathBuf,
    /// Pause after every update cycle.
    pub update_delay_ms: u64,
    /// Directory searched for static images.
    pub assets_dir: PathBuf,
}

impl Default for TobiiConfig {
    fn default() -> Self {
        Self {
            library_path: PathBuf::from(StreamEngineLibrary::default_file_name()),
            update_delay_ms: 10,
            assets_dir: PathBuf::from("assets"),
        }
    }
}

impl TobiiConfig {
    /// Reads `path`, writing a default file first if none exists.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {:?}", path))?;
            let config = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config {:?}", path))?;
            Ok(config)
        } else {
            let config = Self::default();
            let content = serde_json::to_string_pretty(&config)?;
            fs::write(path, content)
                .with_context(|| format!("Failed to write default config {:?}", path))?;
            Ok(config)
        }
    }

    /// Like [`TobiiConfig::load`], but never fails: problems are logged and defaults used.
    pub fn load_or_default(path: &Path, logger: &ModuleLogger) -> Self {
        match Self::load(path) {
            Ok(config) => {
                logger.debug(&format!("Loaded config from {:?}", path));
                config
            }
            Err(e) => {
                logger.warn(&format!("{:#}. Using defaults.", e));
                Self::default()
            }
        }
    }
}
