//! # Store configuration — `gomarket.toml`
//!
//! Settings for where the cart is persisted and how write-back behaves. The
//! file is optional: a missing or empty file is the default configuration.
//!
//! ## Structure
//!
//! ```toml
//! [storage]
//! key = "@GoMarket:Products"     # key the whole cart is stored under, 1 to 120 bytes
//! data_dir = "/var/lib/gomarket"  # optional, FileStore base directory
//!
//! [persistence]
//! write_retries = 2               # extra attempts after a failed write
//! retry_backoff_ms = 100          # delay before each retry, multiplied by the attempt number
//! ```
//!
//! ## Types
//!
//! | Struct | Purpose |
//! |--------|---------|
//! | [`StoreConfig`] | Top-level config. TOML (de)serialisation, loading from disk, data directory resolution. |
//! | [`StorageConfig`] | Storage key and optional base directory. |
//! | [`PersistenceConfig`] | Retry policy for background writes. |

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Key the cart is stored under unless configured otherwise.
pub const DEFAULT_STORAGE_KEY: &str = "@GoMarket:Products";

/// Longest accepted storage key. [`crate::FileStore`] hex-encodes keys into
/// file names, and `2 * 120 + ".json.tmp"` stays under 255 bytes.
pub const MAX_KEY_BYTES: usize = 120;

const APP_DIR: &str = "gomarket";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("storage key must be 1 to {MAX_KEY_BYTES} bytes, got {0}")]
    KeyLength(usize),
}

/// Top-level configuration stored in `gomarket.toml`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_key")]
    pub key: String,
    /// Base directory for file-backed storage. `None` means the platform data dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            key: default_storage_key(),
            data_dir: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default = "default_write_retries")]
    pub write_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_write_retries() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    100
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            write_retries: default_write_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl StoreConfig {
    /// The well-known filename for the config file.
    pub fn filename() -> &'static str {
        "gomarket.toml"
    }

    /// `<platform config dir>/gomarket/gomarket.toml`, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(Self::filename()))
    }

    /// Builder method to override the storage directory.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage.data_dir = Some(dir.into());
        self
    }

    /// Builder method to set the retry policy.
    pub fn with_retries(mut self, retries: u32, backoff_ms: u64) -> Self {
        self.persistence.write_retries = retries;
        self.persistence.retry_backoff_ms = backoff_ms;
        self
    }

    /// Parse from TOML string.
    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Serialize to TOML string.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Check values that parse but cannot be used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let len = self.storage.key.len();
        if len == 0 || len > MAX_KEY_BYTES {
            return Err(ConfigError::KeyLength(len));
        }
        Ok(())
    }

    /// Read and validate the config at `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                let config = Self::from_toml(&contents)?;
                config.validate()?;
                Ok(config)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Directory the file-backed store should use.
    pub fn data_dir(&self) -> PathBuf {
        match &self.storage.data_dir {
            Some(dir) => dir.clone(),
            None => dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR),
        }
    }
}
