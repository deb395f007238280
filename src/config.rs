//! # Configuration Management
//!
//! Centralized configuration for the secure conversation layer.
//!
//! This module provides structured configuration for the chunk pipeline,
//! the continuation point manager and logging.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Environment variables via `from_env()` (`OPCUA_SC_*`)
//! - Direct instantiation with defaults
//!
//! ## Security Considerations
//! - Chunk and message size limits bound the memory one peer can pin
//! - A continuation point limit bounds the memory one session can pin
//! - Offending-bytes dumps are off by default; they may contain user data

use crate::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::Level;

/// Smallest receive buffer a peer may negotiate
pub const MIN_CHUNK_SIZE: usize = 8192;

/// Default maximum size of one chunk (64 KiB)
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 64 * 1024;

/// Default maximum size of one reassembled message (16 MiB)
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Default maximum number of open continuation points per session
pub const DEFAULT_MAX_CONTINUATION_POINTS: usize = 10;

/// Main configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Chunk pipeline limits
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Continuation point manager settings
    #[serde(default)]
    pub continuation: ContinuationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    ///
    /// Unparseable values are reported rather than silently ignored.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(val) = env_usize("OPCUA_SC_MAX_CHUNK_SIZE")? {
            config.pipeline.max_chunk_size = val;
        }
        if let Some(val) = env_usize("OPCUA_SC_MAX_MESSAGE_SIZE")? {
            config.pipeline.max_message_size = val;
        }
        if let Some(val) = env_usize("OPCUA_SC_MAX_CHUNK_COUNT")? {
            config.pipeline.max_chunk_count = val;
        }
        if let Ok(val) = std::env::var("OPCUA_SC_DUMP_ON_DECODE_ERROR") {
            config.pipeline.dump_on_decode_error = matches!(val.as_str(), "1" | "true" | "yes");
        }
        if let Some(val) = env_usize("OPCUA_SC_MAX_CONTINUATION_POINTS")? {
            config.continuation.max_continuation_points = val;
        }
        if let Ok(level) = std::env::var("OPCUA_SC_LOG_LEVEL") {
            config.logging.log_level = level.parse::<Level>().map_err(|_| {
                ProtocolError::ConfigError(format!("Invalid OPCUA_SC_LOG_LEVEL: {level}"))
            })?;
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.pipeline.validate());
        errors.extend(self.continuation.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

fn env_usize(name: &str) -> Result<Option<usize>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<usize>()
            .map(Some)
            .map_err(|_| ProtocolError::ConfigError(format!("Invalid {name}: {raw}"))),
        Err(_) => Ok(None),
    }
}

/// Chunk pipeline limits
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Largest chunk accepted from the peer
    pub max_chunk_size: usize,

    /// Largest reassembled message body (0 = unlimited)
    pub max_message_size: usize,

    /// Most chunks one message may span (0 = unlimited)
    pub max_chunk_count: usize,

    /// Attach the offending bytes to pipeline errors and log a hex dump
    pub dump_on_decode_error: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            max_chunk_count: 0,
            dump_on_decode_error: false,
        }
    }
}

impl PipelineConfig {
    /// Validate pipeline configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.max_chunk_size < MIN_CHUNK_SIZE {
            errors.push(format!(
                "max_chunk_size too small: {} bytes (minimum: {MIN_CHUNK_SIZE})",
                self.max_chunk_size
            ));
        } else if self.max_chunk_size > u32::MAX as usize {
            errors.push(format!(
                "max_chunk_size too large: {} bytes (chunk sizes are 32-bit)",
                self.max_chunk_size
            ));
        }

        if self.max_message_size != 0 && self.max_message_size < self.max_chunk_size {
            errors.push(format!(
                "max_message_size ({}) is smaller than max_chunk_size ({})",
                self.max_message_size, self.max_chunk_size
            ));
        }

        if self.max_chunk_count != 0
            && self.max_message_size != 0
            && self.max_chunk_count.saturating_mul(self.max_chunk_size)
                < self.max_message_size
        {
            errors.push(format!(
                "max_chunk_count ({}) chunks of max_chunk_size can never reach max_message_size ({})",
                self.max_chunk_count, self.max_message_size
            ));
        }

        errors
    }
}

/// Continuation point manager settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContinuationConfig {
    /// Open continuation points allowed per session (0 = unlimited)
    pub max_continuation_points: usize,
}

impl Default for ContinuationConfig {
    fn default() -> Self {
        Self {
            max_continuation_points: DEFAULT_MAX_CONTINUATION_POINTS,
        }
    }
}

impl ContinuationConfig {
    /// Validate continuation configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.max_continuation_points > 10_000 {
            errors.push(format!(
                "max_continuation_points too large: {} (maximum: 10000)",
                self.max_continuation_points
            ));
        }
        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to log to console
    pub log_to_console: bool,

    /// Whether to log to file
    pub log_to_file: bool,

    /// Path to log file (if log_to_file is true)
    pub log_file_path: Option<String>,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("opcua-secure-conversation"),
            log_level: Level::INFO,
            log_to_console: true,
            log_to_file: false,
            log_file_path: None,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        if self.log_to_file {
            if let Some(ref path) = self.log_file_path {
                if let Some(parent) = std::path::Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        errors.push(format!(
                            "Log file directory does not exist: {}",
                            parent.display()
                        ));
                    }
                }
            } else {
                errors.push("log_file_path must be specified when log_to_file is true".to_string());
            }
        }

        if !self.log_to_console && !self.log_to_file {
            errors
                .push("At least one logging output (console or file) must be enabled".to_string());
        }

        errors
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
