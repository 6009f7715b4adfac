//! # Filesystem-backed key-value store
//!
//! [`FileStore`] is a [`KeyValueStore`] implementation that keeps each key in
//! its own file under a base directory. It is what the `gomarket` binary uses to
//! retain the cart across process restarts.
//!
//! ## Layout
//!
//! ```text
//! <base_dir>/
//! └── <hex(key)>.json        # value for one key
//! ```
//!
//! Keys such as `@GoMarket:Products` contain characters that are not portable
//! in file names, so the file name is the lowercase hex encoding of the key's
//! bytes. That doubles the length, so configured keys are capped at
//! [`MAX_KEY_BYTES`](crate::config::MAX_KEY_BYTES) to keep the name within the
//! common 255-byte file name limit. Writes land in a sibling `.tmp` file first
//! and are then renamed over the target, so a reader never sees a half-written
//! value.
//!
//! ## Platform data directories
//!
//! [`StoreConfig::data_dir`](crate::StoreConfig::data_dir) picks the base from
//! [`dirs::data_dir()`]:
//!
//! | Platform | Path |
//! |----------|------|
//! | macOS | `~/Library/Application Support/gomarket/` |
//! | Linux | `~/.local/share/gomarket/` |
//! | Windows | `C:\Users\<user>\AppData\Roaming\gomarket\` |

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::kv::{KeyValueStore, StorageError};

/// Filesystem-backed KeyValueStore.
#[derive(Clone, Debug)]
pub struct FileStore {
    base: PathBuf,
}

impl FileStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Path of the file holding `key`.
    pub fn key_path(&self, key: &str) -> PathBuf {
        self.base.join(file_name_for(key))
    }
}

fn file_name_for(key: &str) -> String {
    let hex: String = key.bytes().map(|b| format!("{b:02x}")).collect();
    format!("{hex}.json")
}

impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match tokio::fs::read_to_string(self.key_path(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StorageError::io(key, err)),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        let path = self.key_path(key);
        let tmp = path.with_extension("json.tmp");

        tokio::fs::create_dir_all(&self.base)
            .await
            .map_err(|err| StorageError::io(key, err))?;
        tokio::fs::write(&tmp, value)
            .await
            .map_err(|err| StorageError::io(key, err))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|err| StorageError::io(key, err))?;
        Ok(())
    }
}
