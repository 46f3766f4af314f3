use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

/// Construction-time engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    /// Instrument symbols the venue trades. Fixed for the lifetime of the
    /// gateway built from this config.
    pub symbols: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LogFormat {
    COMPACT,
    JSON,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum LogLevel {
    TRACE,
    DEBUG,
    INFO,
    WARN,
    ERROR,
}

impl From<LogLevel> for LevelFilter {
    fn from(val: LogLevel) -> Self {
        match val {
            LogLevel::TRACE => LevelFilter::TRACE,
            LogLevel::DEBUG => LevelFilter::DEBUG,
            LogLevel::INFO => LevelFilter::INFO,
            LogLevel::WARN => LevelFilter::WARN,
            LogLevel::ERROR => LevelFilter::ERROR,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::INFO,
            format: LogFormat::COMPACT,
        }
    }
}

impl LogConfig {
    /// Install the global tracing subscriber. Call once at startup.
    pub fn init(&self) {
        match self.format {
            LogFormat::JSON => {
                tracing_subscriber::fmt()
                    .json()
                    .with_max_level(self.level)
                    .with_current_span(true)
                    .init();
            }
            LogFormat::COMPACT => {
                tracing_subscriber::fmt()
                    .compact()
                    .with_max_level(self.level)
                    .init();
            }
        }
    }
}

/// Top-level application configuration wrapper.
///
/// Loaded with the following precedence (lowest to highest):
/// 1) Built-in defaults
/// 2) Optional config file (if present)
/// 3) Environment variables
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub logger: LogConfig,
}

impl AppConfig {
    pub fn load(config_path: &Path) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

        if config_path.exists() {
            figment = figment.merge(Toml::file(config_path));
        }
        figment = figment.merge(Env::prefixed("MATCHBOOK_").split("_"));

        let cfg = figment.extract()?;
        Ok(cfg)
    }
}
