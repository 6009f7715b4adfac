pub mod cart;
pub mod cart_store;
pub mod config;
pub mod kv;
pub mod models;
pub mod snapshot;

mod memory;
pub use memory::MemoryStore;

mod file_store;
pub use file_store::FileStore;

pub use cart::{Cart, Change};
pub use cart_store::{CartError, CartHandle, CartSnapshot, CartStore, LoadOutcome};
pub use config::{StoreConfig, DEFAULT_STORAGE_KEY, MAX_KEY_BYTES};
pub use kv::{KeyValueStore, StorageError};
pub use models::{NewProduct, Product};
