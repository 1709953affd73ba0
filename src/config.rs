//! Service configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub stream: StreamConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// HTTP port. The `PORT` environment variable takes precedence.
    #[serde(default)]
    pub http_port: Option<u16>,

    /// Address to bind the listener on
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Directory holding the live viewer page
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

/// Background record generator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Whether the generator runs
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Tick interval in milliseconds
    #[serde(default = "default_generator_interval")]
    pub interval_ms: u64,

    /// Lowest measurement drawn (inclusive)
    #[serde(default = "default_min_measurement")]
    pub min_measurement: i64,

    /// Highest measurement drawn (inclusive)
    #[serde(default = "default_max_measurement")]
    pub max_measurement: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Push interval for `/stream` in milliseconds
    #[serde(default = "default_stream_interval")]
    pub interval_ms: u64,
}

// Defaults
fn default_true() -> bool { true }
fn default_bind_address() -> String { "0.0.0.0".to_string() }
fn default_static_dir() -> String { "static".to_string() }
fn default_generator_interval() -> u64 { 2000 }
fn default_min_measurement() -> i64 { 60 }
fn default_max_measurement() -> i64 { 100 }
fn default_stream_interval() -> u64 { 1000 }

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            http_port: None,
            bind_address: default_bind_address(),
            static_dir: default_static_dir(),
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: default_generator_interval(),
            min_measurement: default_min_measurement(),
            max_measurement: default_max_measurement(),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_stream_interval(),
        }
    }
}

impl GeneratorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl StreamConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Config {
    /// Load from a TOML file, falling back to defaults when it does not exist
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Port to listen on, required
    pub fn http_port(&self) -> Result<u16, ConfigError> {
        self.api.http_port.ok_or(ConfigError::MissingPort)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.http_port()?;
        if self.generator.interval_ms == 0 {
            return Err(ConfigError::Invalid("generator.interval_ms must be > 0".to_string()));
        }
        if self.stream.interval_ms == 0 {
            return Err(ConfigError::Invalid("stream.interval_ms must be > 0".to_string()));
        }
        if self.generator.min_measurement > self.generator.max_measurement {
            return Err(ConfigError::Invalid(format!(
                "generator.min_measurement ({}) exceeds generator.max_measurement ({})",
                self.generator.min_measurement, self.generator.max_measurement
            )));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("No listening port configured (set PORT)")]
    MissingPort,

    #[error("Failed to read config: {0}")]
    Io(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api.http_port, None);
        assert_eq!(config.generator.interval(), Duration::from_secs(2));
        assert_eq!(config.generator.min_measurement, 60);
        assert_eq!(config.generator.max_measurement, 100);
        assert_eq!(config.stream.interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_missing_port_is_fatal() {
        let config = Config::default();
        assert_eq!(config.validate(), Err(ConfigError::MissingPort));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let mut config = Config::default();
        config.api.http_port = Some(8080);
        config.generator.min_measurement = 120;

        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
