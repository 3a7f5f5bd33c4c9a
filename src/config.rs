//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub serial: SerialConfig,
    pub handshake: HandshakeConfig,
    pub logging: LoggingConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    /// Device path; leave empty to probe every port on the machine
    #[serde(default)]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

/// XBee handshake timing configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HandshakeConfig {
    #[serde(default = "default_guard_delay_ms")]
    pub guard_delay_ms: u64,

    #[serde(default = "default_command_delay_ms")]
    pub command_delay_ms: u64,
}

/// Telemetry logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_directory")]
    pub directory: String,

    /// Recording name; leave empty for a timestamped name per run
    #[serde(default)]
    pub file_prefix: String,
}

// Default value functions
fn default_baud_rate() -> u32 {
    115_200
}
fn default_guard_delay_ms() -> u64 {
    110
}
fn default_command_delay_ms() -> u64 {
    50
}
fn default_log_directory() -> String {
    "./logs".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            serial: SerialConfig::default(),
            handshake: HandshakeConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: default_baud_rate(),
        }
    }
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            guard_delay_ms: default_guard_delay_ms(),
            command_delay_ms: default_command_delay_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_log_directory(),
            file_prefix: String::new(),
        }
    }
}

impl LoggingConfig {
    /// Base path for a new recording.
    ///
    /// A configured prefix is used verbatim; otherwise each run gets a
    /// timestamped name so recordings never overwrite each other.
    pub fn session_base_path(&self) -> String {
        let name = if self.file_prefix.is_empty() {
            format!("xbimu_{}", chrono::Local::now().format("%Y%m%d_%H%M%S"))
        } else {
            self.file_prefix.clone()
        };

        Path::new(&self.directory)
            .join(name)
            .to_string_lossy()
            .into_owned()
    }
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
    /// use xbimu_logger::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file is absent
    ///
    /// A missing file is not an error; a present but invalid file is.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            debug!("No config file at {}; using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Validate configuration values
    ///
    /// # Returns
    ///
    /// * `Result<()>` - Ok if valid, Err if invalid
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        // Serial port may be empty (auto-detect), but the baud rate must be
        // one the transceiver hardware supports.
        if ![9600, 19200, 38400, 57600, 115200, 230400].contains(&self.serial.baud_rate) {
            return Err(crate::error::XbimuError::Config(toml::de::Error::custom(
                "baud_rate must be one of: 9600, 19200, 38400, 57600, 115200, 230400",
            )));
        }

        if self.handshake.guard_delay_ms == 0 || self.handshake.guard_delay_ms > 10000 {
            return Err(crate::error::XbimuError::Config(toml::de::Error::custom(
                "guard_delay_ms must be between 1 and 10000",
            )));
        }

        if self.handshake.command_delay_ms == 0 || self.handshake.command_delay_ms > 10000 {
            return Err(crate::error::XbimuError::Config(toml::de::Error::custom(
                "command_delay_ms must be between 1 and 10000",
            )));
        }

        if self.logging.directory.is_empty() {
            return Err(crate::error::XbimuError::Config(toml::de::Error::custom(
                "logging directory cannot be empty",
            )));
        }

        Ok(())
    }
}
