use clap::ArgMatches;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::modbus::{ParityConfig, SerialSettings};
use crate::utils::error::TracerError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // Connection settings
    pub serial_port: String,
    pub baud_rate: u32,
    pub parity: ParityConfig,
    pub timeout_ms: u64, // Per-frame response timeout

    // Monitoring settings
    pub update_interval_seconds: u64,

    // Output settings
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub default_format: String,
    pub file_path: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_format: "text".to_string(),
            file_path: None,
        }
    }
}

pub const OUTPUT_FORMATS: [&str; 2] = ["text", "json"];

impl Default for Config {
    fn default() -> Self {
        Self {
            serial_port: "/dev/ttyUSB0".to_string(),
            baud_rate: SerialSettings::DEFAULT_BAUD_RATE,
            parity: ParityConfig::None,
            timeout_ms: SerialSettings::DEFAULT_TIMEOUT.as_millis() as u64,
            update_interval_seconds: 10,
            output: OutputConfig::default(),
        }
    }
}

impl Config {
    /// Layers command line arguments over `base`. Absent arguments keep the base value.
    pub fn from_matches(base: Config, matches: &ArgMatches) -> Result<Self, TracerError> {
        let mut config = base;

        if let Some(port) = matches.get_one::<String>("port") {
            config.serial_port = port.clone();
        }
        if let Some(baud) = matches.get_one::<String>("baud") {
            config.baud_rate = baud
                .parse()
                .map_err(|e| TracerError::ConfigError(format!("Invalid baud rate '{}': {}", baud, e)))?;
        }
        if let Some(timeout) = matches.get_one::<String>("timeout-ms") {
            config.timeout_ms = timeout
                .parse()
                .map_err(|e| TracerError::ConfigError(format!("Invalid timeout '{}': {}", timeout, e)))?;
        }
        if let Some(format) = matches.get_one::<String>("format") {
            config.output.default_format = format.clone();
        }
        if let Some(path) = matches.get_one::<String>("output-file") {
            config.output.file_path = Some(path.clone());
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TracerError> {
        let path = path.as_ref();
        debug!("Loading configuration from {}", path.display());

        let content = std::fs::read_to_string(path).map_err(|e| {
            TracerError::ConfigError(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;

        info!("📋 Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), TracerError> {
        let path = path.as_ref();
        // Create directory if it doesn't exist
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    TracerError::ConfigError(format!("Cannot create {}: {}", parent.display(), e))
                })?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| {
            TracerError::ConfigError(format!("Cannot write {}: {}", path.display(), e))
        })?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), TracerError> {
        if self.serial_port.trim().is_empty() {
            return Err(TracerError::ConfigError("serial_port must not be empty".to_string()));
        }
        if self.baud_rate == 0 {
            return Err(TracerError::ConfigError("baud_rate must be positive".to_string()));
        }
        if self.timeout_ms == 0 {
            return Err(TracerError::ConfigError("timeout_ms must be positive".to_string()));
        }
        if !OUTPUT_FORMATS.contains(&self.output.default_format.as_str()) {
            return Err(TracerError::ConfigError(format!(
                "Unknown output format '{}', expected one of {:?}",
                self.output.default_format, OUTPUT_FORMATS
            )));
        }
        Ok(())
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_seconds.max(1))
    }

    pub fn serial_settings(&self) -> SerialSettings {
        SerialSettings::new(&self.serial_port)
            .with_baud_rate(self.baud_rate)
            .with_parity(self.parity)
            .with_timeout(self.response_timeout())
    }
}
