//! Configuration management for vmfleet API
//!
//! Settings are resolved from:
//! 1. Environment variables (highest priority)
//! 2. Configuration file (TOML format)
//! 3. Default values (lowest priority)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration struct for vmfleet
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Host inventory configuration
    pub inventory: InventoryConfig,
    /// Hypervisor client configuration
    pub remote: RemoteConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Directory for log files
    pub log_dir: PathBuf,
    /// Enable file logging
    pub file_logging_enabled: bool,
    /// Emit console logs as JSON
    pub json_format: bool,
}

/// Host inventory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    /// Path to the JSON inventory file
    pub path: PathBuf,
    /// Fetch each host's VMs from its hypervisor at startup
    pub refresh_on_start: bool,
}

/// Hypervisor client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Timeout for each hypervisor request, in seconds
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: PathBuf::from("/var/log/vmfleet"),
            file_logging_enabled: false,
            json_format: false,
        }
    }
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./hosts.json"),
            refresh_on_start: true,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl FleetConfig {
    /// Load configuration from an explicit file, or the first standard
    /// location that exists, then apply environment overrides
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => Self::load_from_file(path)?,
            None => match Self::find_config_file() {
                Some(path) => Self::load_from_file(&path)?,
                None => Self::default(),
            },
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file path
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_path_buf(), e.to_string()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let paths = [
            std::env::var("VMFLEET_CONFIG").ok().map(PathBuf::from),
            Some(PathBuf::from("/etc/vmfleet/config.toml")),
            Some(PathBuf::from("./vmfleet.toml")),
        ];

        paths.into_iter()
            .flatten()
            .find(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // Server
        if let Ok(host) = std::env::var("VMFLEET_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("VMFLEET_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }

        // Logging
        if let Ok(level) = std::env::var("VMFLEET_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(path) = std::env::var("VMFLEET_LOG_DIR") {
            self.logging.log_dir = PathBuf::from(path);
        }
        if let Ok(enabled) = std::env::var("VMFLEET_FILE_LOGGING") {
            self.logging.file_logging_enabled = enabled.parse().unwrap_or(false);
        }

        // Inventory
        if let Ok(path) = std::env::var("VMFLEET_INVENTORY") {
            self.inventory.path = PathBuf::from(path);
        }
        if let Ok(refresh) = std::env::var("VMFLEET_REFRESH_ON_START") {
            self.inventory.refresh_on_start = refresh.parse().unwrap_or(true);
        }

        // Remote
        if let Ok(timeout) = std::env::var("VMFLEET_REMOTE_TIMEOUT") {
            if let Ok(timeout) = timeout.parse() {
                self.remote.timeout_secs = timeout;
            }
        }
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }

    /// Address the server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("Port cannot be 0".to_string()));
        }

        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::Validation("Log level cannot be empty".to_string()));
        }

        if self.remote.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "Remote timeout must be at least 1 second".to_string()
            ));
        }

        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("Failed to read config file {0:?}: {1}")]
    FileRead(PathBuf, String),
    /// Failed to parse configuration
    #[error("Failed to parse config: {0}")]
    Parse(String),
    /// Configuration validation failed
    #[error("Config validation failed: {0}")]
    Validation(String),
}
