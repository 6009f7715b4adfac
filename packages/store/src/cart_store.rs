//! # Cart store — in-memory cart with background write-back
//!
//! [`CartStore`] owns the cart for one session. It is opened once at
//! application start; consumers get [`CartHandle`] values from it and never see
//! the store itself.
//!
//! ## Lifecycle
//!
//! 1. [`CartStore::open`] reads the snapshot under the configured key from a
//!    [`KeyValueStore`]. The outcome is kept as a [`LoadOutcome`]. A restored cart
//!    is immediately written back, which upgrades legacy snapshots to the current
//!    format.
//! 2. Handles mutate the cart with [`add_to_cart`](CartHandle::add_to_cart),
//!    [`increment`](CartHandle::increment) and [`decrement`](CartHandle::decrement).
//!    The in-memory change is visible as soon as the call returns.
//! 3. [`CartStore::close`] flushes pending writes and ends the lifetime. Handles
//!    used afterwards return [`CartError::Inactive`]. Dropping the store has the
//!    same effect on handles, without waiting for the flush.
//!
//! ## Write-back
//!
//! The current cart lives inside a `tokio::sync::watch` channel together with a
//! revision counter that only moves when a mutation actually changed something.
//! A single writer task holds a receiver: it wakes on every new revision, encodes
//! the newest cart and writes it. Revisions produced while a write is in flight
//! collapse into one follow-up write, so at most one write is outstanding and an
//! older snapshot can never land after a newer one.
//!
//! Failed writes are retried per [`PersistenceConfig`], unless a newer revision
//! is already waiting. Failures are logged and never reach the caller.
//!
//! ## Load failures
//!
//! | Stored value | Result |
//! |--------------|--------|
//! | absent | empty cart, [`LoadOutcome::Empty`] |
//! | valid snapshot | restored cart, [`LoadOutcome::Restored`], written back |
//! | malformed | empty cart, [`LoadOutcome::Malformed`], stored value left untouched until the next mutation |
//! | backend error | empty cart, [`LoadOutcome::Unavailable`] |

use std::sync::{Arc, Weak};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::cart::{Cart, Change};
use crate::config::{PersistenceConfig, StoreConfig};
use crate::kv::KeyValueStore;
use crate::models::{NewProduct, Product};
use crate::snapshot;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    /// The handle outlived the [`CartStore`] it came from.
    #[error("cart handle used outside an active cart store")]
    Inactive,
    /// NaN and infinite prices have no JSON representation.
    #[error("product {id:?} has a non-finite price")]
    InvalidPrice { id: String },
}

/// How the initial load went.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    Empty,
    Restored { items: usize },
    Malformed,
    Unavailable,
}

/// A cart value together with the revision that produced it.
#[derive(Clone, Debug, Default)]
pub struct CartSnapshot {
    revision: u64,
    cart: Cart,
}

impl CartSnapshot {
    /// Monotonic counter, bumped once per effective change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn products(&self) -> &[Product] {
        self.cart.products()
    }
}

struct Shared {
    snapshots: watch::Sender<CartSnapshot>,
}

impl Shared {
    fn apply(&self, op: impl FnOnce(&mut Cart) -> Change) -> Change {
        let mut change = Change::Unchanged;
        self.snapshots.send_if_modified(|snapshot| {
            change = op(&mut snapshot.cart);
            if change.is_change() {
                snapshot.revision += 1;
            }
            change.is_change()
        });
        change
    }

    fn replace(&self, cart: Cart) {
        self.snapshots.send_modify(|snapshot| {
            snapshot.cart = cart;
            snapshot.revision += 1;
        });
    }

    fn products(&self) -> Vec<Product> {
        self.snapshots.borrow().cart.to_vec()
    }
}

/// Owner of the session cart and its persistence.
pub struct CartStore {
    shared: Arc<Shared>,
    persisted: watch::Receiver<u64>,
    writer: JoinHandle<()>,
    load: LoadOutcome,
}

impl CartStore {
    /// Load the saved cart from `kv` and start the write-back task.
    ///
    /// Must be called from within a Tokio runtime. Never fails: load problems
    /// are logged and leave the cart empty, see [`LoadOutcome`].
    pub async fn open<S: KeyValueStore>(kv: S, config: &StoreConfig) -> Self {
        let key = config.storage.key.clone();
        let (restored, outcome) = load(&kv, &key).await;

        let (snapshots, updates) = watch::channel(CartSnapshot::default());
        let (persisted_tx, persisted) = watch::channel(0);
        let writer = tokio::spawn(write_back(
            kv,
            key,
            config.persistence.clone(),
            updates,
            persisted_tx,
        ));

        let shared = Arc::new(Shared { snapshots });
        if let Some(cart) = restored {
            shared.replace(cart);
        }

        Self {
            shared,
            persisted,
            writer,
            load: outcome,
        }
    }

    pub fn load_outcome(&self) -> LoadOutcome {
        self.load
    }

    /// A new handle onto this store's cart.
    pub fn handle(&self) -> CartHandle {
        CartHandle {
            shared: Arc::downgrade(&self.shared),
        }
    }

    pub fn products(&self) -> Vec<Product> {
        self.shared.products()
    }

    /// Wait until the newest revision at call time has been written or given up on.
    pub async fn flush(&self) {
        let target = self.shared.snapshots.borrow().revision;
        if target == 0 {
            return;
        }
        let mut persisted = self.persisted.clone();
        if persisted.wait_for(|done| *done >= target).await.is_err() {
            warn!(revision = target, "cart writer stopped before flush completed");
        }
    }

    /// Flush, then end the store lifetime. Outstanding handles become inactive.
    pub async fn close(self) {
        self.flush().await;
        let Self { shared, writer, .. } = self;
        drop(shared);
        if let Err(err) = writer.await {
            error!(error = %err, "cart writer task failed");
        }
    }
}

/// Cheap, cloneable access to a [`CartStore`]'s cart.
///
/// Every method checks that the store is still alive and returns
/// [`CartError::Inactive`] if it is not.
#[derive(Clone, Debug)]
pub struct CartHandle {
    shared: Weak<Shared>,
}

impl CartHandle {
    fn shared(&self) -> Result<Arc<Shared>, CartError> {
        self.shared.upgrade().ok_or(CartError::Inactive)
    }

    pub fn is_active(&self) -> bool {
        self.shared.strong_count() > 0
    }

    /// Current lines, in cart order. The returned vector is a copy.
    pub fn products(&self) -> Result<Vec<Product>, CartError> {
        Ok(self.shared()?.products())
    }

    /// Add one unit of `item`, appending it if its id is new.
    ///
    /// Items whose price is NaN or infinite are rejected with
    /// [`CartError::InvalidPrice`] and the cart is left as it was.
    pub fn add_to_cart(&self, item: NewProduct) -> Result<Change, CartError> {
        let shared = self.shared()?;
        if !item.price.is_finite() {
            warn!(id = %item.id, price = item.price, "rejecting product with non-finite price");
            return Err(CartError::InvalidPrice { id: item.id });
        }
        Ok(shared.apply(|cart| cart.add(item)))
    }

    pub fn increment(&self, id: &str) -> Result<Change, CartError> {
        let shared = self.shared()?;
        let change = shared.apply(|cart| cart.increment(id));
        if !change.is_change() {
            debug!(id, "increment ignored, no such cart item");
        }
        Ok(change)
    }

    pub fn decrement(&self, id: &str) -> Result<Change, CartError> {
        let shared = self.shared()?;
        let change = shared.apply(|cart| cart.decrement(id));
        if !change.is_change() {
            debug!(id, "decrement ignored, no such cart item");
        }
        Ok(change)
    }

    /// Receiver that is notified on every effective cart change.
    pub fn subscribe(&self) -> Result<watch::Receiver<CartSnapshot>, CartError> {
        Ok(self.shared()?.snapshots.subscribe())
    }
}

async fn load<S: KeyValueStore>(kv: &S, key: &str) -> (Option<Cart>, LoadOutcome) {
    let raw = match kv.get(key).await {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            info!(key, "no saved cart, starting empty");
            return (None, LoadOutcome::Empty);
        }
        Err(err) => {
            error!(key, error = %err, "failed to read saved cart, starting empty");
            return (None, LoadOutcome::Unavailable);
        }
    };

    match snapshot::decode(&raw) {
        Ok(decoded) => {
            let cart = Cart::from_products(decoded.products);
            let items = cart.len();
            info!(key, items, format = ?decoded.format, "restored saved cart");
            (Some(cart), LoadOutcome::Restored { items })
        }
        Err(err) => {
            error!(key, error = %err, "saved cart is malformed, starting empty");
            (None, LoadOutcome::Malformed)
        }
    }
}

async fn write_back<S: KeyValueStore>(
    kv: S,
    key: String,
    policy: PersistenceConfig,
    mut updates: watch::Receiver<CartSnapshot>,
    persisted: watch::Sender<u64>,
) {
    while updates.changed().await.is_ok() {
        let (revision, encoded) = {
            let snapshot = updates.borrow_and_update();
            (snapshot.revision, snapshot::encode(snapshot.products()))
        };

        match encoded {
            Ok(value) => persist(&kv, &key, value, &policy, &updates).await,
            Err(err) => error!(key = %key, revision, error = %err, "failed to encode cart"),
        }
        persisted.send_replace(revision);
    }
    debug!(key = %key, "cart write-back stopped");
}

async fn persist<S: KeyValueStore>(
    kv: &S,
    key: &str,
    value: String,
    policy: &PersistenceConfig,
    updates: &watch::Receiver<CartSnapshot>,
) {
    let mut attempt = 0;
    loop {
        let err = match kv.set(key, value.clone()).await {
            Ok(()) => {
                debug!(key, "cart saved");
                return;
            }
            Err(err) => err,
        };

        if updates.has_changed().unwrap_or(false) {
            warn!(key, error = %err, "cart write failed, newer cart pending");
            return;
        }
        if attempt >= policy.write_retries {
            error!(key, error = %err, attempts = attempt + 1, "giving up on cart write");
            return;
        }

        attempt += 1;
        warn!(key, error = %err, attempt, "cart write failed, retrying");
        let backoff = policy.retry_backoff_ms.saturating_mul(u64::from(attempt));
        if backoff > 0 {
            tokio::time::sleep(Duration::from_millis(backoff)).await;
        }
    }
}
