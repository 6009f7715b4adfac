//! # Key-value storage contract
//!
//! The cart store persists through the [`KeyValueStore`] trait: an async
//! `get`/`set` pair over string keys and string values. Implementations live in
//! sibling modules ([`crate::MemoryStore`], [`crate::FileStore`]); anything else
//! that can fetch and overwrite a string by key can back the cart too.
//!
//! Both methods are fallible. A missing key is `Ok(None)`, not an error.
//! The returned futures must be `Send` because writes run on a background
//! Tokio task.

use std::future::Future;

use thiserror::Error;

/// Failure reported by a [`KeyValueStore`] backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("i/o error on key {key:?}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    pub fn io(key: &str, source: std::io::Error) -> Self {
        Self::Io {
            key: key.to_string(),
            source,
        }
    }
}

/// Async trait for reading and overwriting string values by key.
pub trait KeyValueStore: Send + Sync + 'static {
    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<String>, StorageError>> + Send;
    fn set(
        &self,
        key: &str,
        value: String,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
}
