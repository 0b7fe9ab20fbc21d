//! Application configuration.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::application::PipelineConfig;
use crate::infrastructure::crypto::CiphertextEncoding;
use crate::infrastructure::network::DEFAULT_TIMEOUT_SECS;

use super::args::CliArgs;

pub(super) const APP_NAME: &str = "spotview";
pub(super) const APP_QUALIFIER: &str = "com";
pub(super) const APP_ORGANIZATION: &str = "linuxmobile";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Converts to tracing level.
    #[must_use]
    pub const fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Settings for the network and crypto adapters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Prefix for locators that are not absolute URLs.
    #[serde(default)]
    pub base_url: Option<String>,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// How fetched ciphertext is encoded on the wire.
    #[serde(default)]
    pub ciphertext_encoding: CiphertextEncoding,
}

fn default_fetch_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            fetch_timeout_secs: DEFAULT_TIMEOUT_SECS,
            ciphertext_encoding: CiphertextEncoding::default(),
        }
    }
}

/// Application configuration, read from `config.toml` and overridden by CLI.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration file path.
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[serde(skip)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Pipeline tuning.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Fetcher and decryptor settings.
    #[serde(default)]
    pub transport: TransportConfig,
}

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(config_path) = &args.config {
            self.config = Some(config_path.clone());
        }
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(display_height) = args.display_height {
            self.pipeline.display_height = display_height;
        }
        if let Some(cache_bytes) = args.memory_cache_bytes {
            self.pipeline.memory_cache_bytes = cache_bytes;
        }
        if let Some(workers) = args.max_concurrent_workers {
            self.pipeline.max_concurrent_workers = workers;
        }
        if let Some(enable_animations) = args.enable_animations {
            self.pipeline.enable_animations = enable_animations;
        }
        if let Some(base_url) = &args.base_url {
            self.transport.base_url = Some(base_url.clone());
        }
        if let Some(timeout) = args.fetch_timeout_secs {
            self.transport.fetch_timeout_secs = timeout;
        }
        if let Some(encoding) = args.ciphertext_encoding {
            self.transport.ciphertext_encoding = encoding;
        }
    }

    /// Returns default config directory.
    #[must_use]
    pub fn default_config_dir() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Returns default config file path.
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        Self::default_config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Returns default log file path.
    #[must_use]
    pub fn default_log_path() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.data_dir().join("spotview.log"))
    }

    /// Returns effective config path.
    #[must_use]
    pub fn effective_config_path(&self) -> Option<PathBuf> {
        self.config.clone().or_else(Self::default_config_path)
    }

    /// Returns effective log path.
    #[must_use]
    pub fn effective_log_path(&self) -> Option<PathBuf> {
        self.log_path.clone().or_else(Self::default_log_path)
    }
}
