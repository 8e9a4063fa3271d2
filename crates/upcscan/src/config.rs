//! Configuration management for upcscan.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::item::Symbology;
use crate::lookup::DEFAULT_BASE_URL;
use crate::scanner::{DecoderConfig, FacingMode, InputStream};
use crate::storage::items::DEFAULT_STORAGE_KEY;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "upcscan";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "upcscan.db";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `UPCSCAN_`, sections split on `__`)
/// 2. TOML config file at `~/.config/upcscan/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Product API configuration.
    pub api: ApiConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Scanner configuration.
    pub scanner: ScannerConfig,
    /// Connectivity monitoring configuration.
    pub connectivity: ConnectivityConfig,
}

/// Product API configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the lookup service.
    pub base_url: String,
    /// Request timeout in seconds. 0 waits indefinitely.
    pub request_timeout_secs: u64,
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/upcscan/upcscan.db`
    pub database_path: Option<PathBuf>,
    /// Key of the slot holding the scanned item list.
    pub storage_key: String,
}

/// Scanner configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Target frame width in pixels.
    pub width: u32,
    /// Target frame height in pixels.
    pub height: u32,
    /// Preferred camera.
    pub facing_mode: FacingMode,
    /// Minimum accepted aspect ratio.
    pub aspect_ratio_min: f32,
    /// Maximum accepted aspect ratio.
    pub aspect_ratio_max: f32,
    /// Accepted symbologies, in match priority order.
    pub readers: Vec<Symbology>,
}

/// Connectivity monitoring configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
    /// Probe the API host for reachability. When disabled the network is
    /// always assumed to be up.
    pub enabled: bool,
    /// Interval between probes in milliseconds.
    pub probe_interval_ms: u64,
    /// Probe connection timeout in milliseconds.
    pub probe_timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 0,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None, // Will be resolved to default at runtime
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        let decoder = DecoderConfig::default();
        Self {
            width: decoder.width,
            height: decoder.height,
            facing_mode: decoder.facing_mode,
            aspect_ratio_min: decoder.aspect_ratio_min,
            aspect_ratio_max: decoder.aspect_ratio_max,
            readers: decoder.readers,
        }
    }
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            probe_interval_ms: 5_000,
            probe_timeout_ms: 2_000,
        }
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::ConfigValidation {
        message: message.into(),
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("UPCSCAN_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.api.base_url)
            .map_err(|e| invalid(format!("invalid base_url '{}': {e}", self.api.base_url)))?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(invalid(format!(
                "base_url must be an http(s) URL with a host: {}",
                self.api.base_url
            )));
        }

        if self.storage.storage_key.is_empty() {
            return Err(invalid("storage_key must not be empty"));
        }

        let scanner = &self.scanner;
        if scanner.width == 0 || scanner.height == 0 {
            return Err(invalid(format!(
                "scanner resolution must be non-zero, got {}x{}",
                scanner.width, scanner.height
            )));
        }
        if scanner.aspect_ratio_min <= 0.0 || scanner.aspect_ratio_min > scanner.aspect_ratio_max {
            return Err(invalid(format!(
                "aspect_ratio_min ({}) must be positive and not greater than aspect_ratio_max ({})",
                scanner.aspect_ratio_min, scanner.aspect_ratio_max
            )));
        }
        if scanner.readers.is_empty() {
            return Err(invalid("at least one barcode reader must be configured"));
        }

        if self.connectivity.probe_interval_ms == 0 {
            return Err(invalid("probe_interval_ms must be greater than 0"));
        }
        if self.connectivity.probe_timeout_ms == 0 {
            return Err(invalid("probe_timeout_ms must be greater than 0"));
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the per-request timeout, if any.
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        if self.api.request_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.api.request_timeout_secs))
        }
    }

    /// Get the probe interval as a Duration.
    #[must_use]
    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.connectivity.probe_interval_ms)
    }

    /// Get the probe timeout as a Duration.
    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.connectivity.probe_timeout_ms)
    }

    /// Build the decoder configuration used on every scanner activation.
    #[must_use]
    pub fn decoder_config(&self) -> DecoderConfig {
        DecoderConfig {
            input: InputStream::LiveStream,
            facing_mode: self.scanner.facing_mode,
            width: self.scanner.width,
            height: self.scanner.height,
            aspect_ratio_min: self.scanner.aspect_ratio_min,
            aspect_ratio_max: self.scanner.aspect_ratio_max,
            readers: self.scanner.readers.clone(),
        }
    }
}
