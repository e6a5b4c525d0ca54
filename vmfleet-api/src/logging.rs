///! Logging setup
///! Console output plus an optional daily-rotated JSON log file

use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use std::io;

use crate::config;

const LOG_FILE_NAME: &str = "vmfleet.log";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,              // log level (trace, debug, info, warn, error)
    pub file_dir: Option<String>,   // directory for rotated log files
    pub json_format: bool,          // JSON console output
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_dir: None,
            json_format: false,
        }
    }
}

impl From<&config::LoggingConfig> for LoggingConfig {
    fn from(settings: &config::LoggingConfig) -> Self {
        Self {
            level: settings.level.clone(),
            file_dir: settings
                .file_logging_enabled
                .then(|| settings.log_dir.to_string_lossy().to_string()),
            json_format: settings.json_format,
        }
    }
}

impl LoggingConfig {
    /// Initialize the global subscriber.
    ///
    /// The returned guard flushes the file writer and must live as long as
    /// the process logs.
    pub fn init(&self) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
        // RUST_LOG wins over the configured level
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))?;

        let console_layer = if self.json_format {
            fmt::layer().json().with_writer(io::stdout).boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_ansi(true)
                .with_writer(io::stdout)
                .boxed()
        };

        let (file_layer, guard) = match self.file_dir {
            Some(ref dir) => {
                let (writer, guard) = non_blocking(rolling::daily(dir, LOG_FILE_NAME));
                let layer = fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_ansi(false)
                    .json()
                    .with_writer(writer);
                (Some(layer), Some(guard))
            }
            None => (None, None),
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .try_init()?;

        tracing::info!("Logging initialized - level: {}", self.level);

        Ok(guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert!(config.file_dir.is_none());
    }

    #[test]
    fn test_from_settings() {
        let mut settings = config::LoggingConfig::default();
        settings.level = "debug".to_string();
        assert!(LoggingConfig::from(&settings).file_dir.is_none());

        settings.file_logging_enabled = true;
        settings.log_dir = PathBuf::from("/tmp/vmfleet-logs");
        let config = LoggingConfig::from(&settings);
        assert_eq!(config.level, "debug");
        assert_eq!(config.file_dir.as_deref(), Some("/tmp/vmfleet-logs"));
    }
}
