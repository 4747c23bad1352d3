//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{BridgeError, Result};
use crate::protocol::ProtocolSelection;
use crate::radio::TxPower;
use crate::serial::SUPPORTED_BAUD_RATES;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,

    #[serde(default)]
    pub radio: RadioConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Host link serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
}

/// Radio configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RadioConfig {
    /// Seed for the transmitter identity
    #[serde(default = "default_controller_id")]
    pub controller_id: u32,

    #[serde(default)]
    pub tx_power: TxPower,

    /// Simulated radio acknowledges every packet
    #[serde(default = "default_ack_simulation")]
    pub ack_simulation: bool,
}

/// Protocol engine configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct EngineConfig {
    /// Protocol selection word to start at boot
    #[serde(default)]
    pub auto_start: Option<u32>,

    /// Reset controls after this long without injection (0 = never)
    #[serde(default)]
    pub controls_timeout_ms: u64,
}

/// Telemetry configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,

    #[serde(default = "default_log_interval_ms")]
    pub log_interval_ms: u64,

    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Diagnostic logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily log files (empty = console only)
    #[serde(default)]
    pub directory: String,
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_baud_rate() -> u32 { 115_200 }
fn default_reconnect_interval_ms() -> u64 { 1000 }

fn default_controller_id() -> u32 { 0x1234_5678 }
fn default_ack_simulation() -> bool { true }

fn default_telemetry_enabled() -> bool { false }
fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }
fn default_log_interval_ms() -> u64 { 1000 }
fn default_log_format() -> String { "jsonl".to_string() }

fn default_log_level() -> String { "info".to_string() }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
        }
    }
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            controller_id: default_controller_id(),
            tx_power: TxPower::default(),
            ack_simulation: default_ack_simulation(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_telemetry_enabled(),
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
            log_interval_ms: default_log_interval_ms(),
            format: default_log_format(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: String::new(),
        }
    }
}

fn invalid(msg: impl std::fmt::Display) -> BridgeError {
    BridgeError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rc_rf_bridge::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // Serial
        if self.serial.port.is_empty() {
            return Err(invalid("serial port cannot be empty"));
        }

        if !SUPPORTED_BAUD_RATES.contains(&self.serial.baud_rate) {
            return Err(invalid(format!(
                "baud_rate must be one of: {:?}",
                SUPPORTED_BAUD_RATES
            )));
        }

        if self.serial.reconnect_interval_ms == 0 || self.serial.reconnect_interval_ms > 60000 {
            return Err(invalid("reconnect_interval_ms must be between 1 and 60000"));
        }

        // Radio
        if self.radio.controller_id == 0 {
            return Err(invalid("controller_id must be non-zero"));
        }

        // Engine
        if let Some(value) = self.engine.auto_start {
            ProtocolSelection::from_u32(value)
                .kind()
                .map_err(|e| invalid(format!("auto_start {:#010x}: {}", value, e)))?;
        }

        if self.engine.controls_timeout_ms > 60000 {
            return Err(invalid("controls_timeout_ms must be between 0 and 60000"));
        }

        // Telemetry
        if self.telemetry.enabled && self.telemetry.log_dir.is_empty() {
            return Err(invalid("telemetry log_dir cannot be empty when enabled"));
        }

        if self.telemetry.log_interval_ms == 0 || self.telemetry.log_interval_ms > 60000 {
            return Err(invalid("log_interval_ms must be between 1 and 60000"));
        }

        if self.telemetry.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if self.telemetry.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        if self.telemetry.format != "jsonl" {
            return Err(invalid("log format must be 'jsonl' (only supported format)"));
        }

        // Logging
        if self.logging.level.trim().is_empty() {
            return Err(invalid("logging level cannot be empty"));
        }

        Ok(())
    }
}
