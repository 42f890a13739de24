//! Configuration
//!
//! Settings come from an optional TOML file overlaid with `MEMCLIST_*`
//! environment variables (`MEMCLIST_MEMFILE__BLOCK_SIZE=4096`).

use crate::error::{Error, Result};
use crate::memfile::compression::CompressionAlgorithm;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Bytes per logical block
pub const MEMFILE_DATA_SIZE: usize = 16384;
/// Footprint at which a memory file starts compressing
pub const COMPRESSION_THRESHOLD: usize = 32_000_000;

const MIN_BLOCK_SIZE: usize = 256;
const MAX_BLOCK_SIZE: usize = 16 * 1024 * 1024;

/// Memory file configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemFileConfig {
    /// Logical and physical block size (bytes)
    pub block_size: usize,
    /// Total allocated bytes above which blocks are compressed
    pub compression_threshold: usize,
    /// Compress at all once the threshold is crossed
    pub compress: bool,
    pub algorithm: CompressionAlgorithm,
    pub compression_level: i32,
    /// Lower bound on decompression cache buffers
    pub min_raw_buffers: usize,
    /// One cache buffer per this many logical blocks
    pub blocks_per_raw_buffer: usize,
}

impl Default for MemFileConfig {
    fn default() -> Self {
        Self {
            block_size: MEMFILE_DATA_SIZE,
            compression_threshold: COMPRESSION_THRESHOLD,
            compress: true,
            algorithm: CompressionAlgorithm::Zlib,
            compression_level: 6,
            min_raw_buffers: 8,
            blocks_per_raw_buffer: 32,
        }
    }
}

impl MemFileConfig {
    pub fn validate(&self) -> Result<()> {
        if !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&self.block_size) {
            return Err(Error::Config(format!(
                "block_size {} outside {}..={}",
                self.block_size, MIN_BLOCK_SIZE, MAX_BLOCK_SIZE
            )));
        }
        if self.min_raw_buffers == 0 {
            return Err(Error::Config("min_raw_buffers must be at least 1".to_string()));
        }
        if self.blocks_per_raw_buffer == 0 {
            return Err(Error::Config(
                "blocks_per_raw_buffer must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` wins when set
    pub level: String,
    /// Colored console output
    pub ansi: bool,
    /// JSON console output
    pub json: bool,
    /// Directory for daily rolling log files; console only when unset
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            ansi: true,
            json: false,
            directory: None,
            file_prefix: "memclist.log".to_string(),
        }
    }
}

/// Top-level settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub memfile: MemFileConfig,
    pub logging: LoggingConfig,
}

impl Settings {
    /// Load from an optional TOML file plus `MEMCLIST_*` environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, Self::environment())
    }

    fn environment() -> Environment {
        Environment::with_prefix("MEMCLIST")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    fn load_with_env(path: Option<&Path>, env: Environment) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        let settings: Settings = builder
            .add_source(env)
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(|e| Error::Config(format!("Failed to load settings: {}", e)))?;
        settings.memfile.validate()?;
        Ok(settings)
    }

    /// Parse settings from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(text)
            .map_err(|e| Error::Config(format!("Failed to parse settings: {}", e)))?;
        settings.memfile.validate()?;
        Ok(settings)
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to render settings: {}", e)))
    }
}
