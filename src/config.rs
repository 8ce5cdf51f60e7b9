//! Service configuration.
//!
//! Configuration is read once at start-up and shared read-only. The
//! hash algorithm is not configurable; it is pinned by the ledger format.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

/// Generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Minimum number of distinct entropy sources required per generation.
    pub min_sources: usize,
    /// Largest count accepted by stream generation.
    pub max_stream_count: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            min_sources: 3,
            max_stream_count: 10_000,
        }
    }
}

impl GeneratorConfig {
    /// Validates the generation parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_sources == 0 {
            return Err(ConfigError::InvalidMinSources);
        }
        if self.max_stream_count == 0 {
            return Err(ConfigError::InvalidStreamLimit);
        }
        Ok(())
    }
}

/// Statistical analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Number of histogram bins.
    pub bin_count: usize,
    /// p-value at or below which uniformity is rejected.
    pub significance: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            bin_count: 10,
            significance: 0.05,
        }
    }
}

impl AnalysisConfig {
    /// Validates the analysis parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bin_count < 2 {
            return Err(ConfigError::InvalidBinCount);
        }
        if !(self.significance > 0.0 && self.significance < 1.0) {
            return Err(ConfigError::InvalidSignificance);
        }
        Ok(())
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the API server to.
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: ([0, 0, 0, 0], 8000).into(),
        }
    }
}

impl ServerConfig {
    /// Creates a config with a custom port.
    pub fn with_port(port: u16) -> Self {
        Self {
            bind_addr: ([0, 0, 0, 0], port).into(),
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("min_sources must be at least 1")]
    InvalidMinSources,
    #[error("max_stream_count must be at least 1")]
    InvalidStreamLimit,
    #[error("bin_count must be at least 2")]
    InvalidBinCount,
    #[error("significance must be strictly between 0 and 1")]
    InvalidSignificance,
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Generation settings.
    #[serde(default)]
    pub generator: GeneratorConfig,
    /// Analysis settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.generator.validate()?;
        self.analysis.validate()?;
        Ok(())
    }
}
