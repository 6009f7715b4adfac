//! # Persisted cart format
//!
//! The whole cart is stored as one JSON string under a single key. This module
//! owns the encoding in both directions.
//!
//! ## Current format
//!
//! ```json
//! {
//!   "version": 1,
//!   "products": [
//!     { "id": "a", "title": "Shoe", "image_url": "u", "price": 10.0, "quantity": 2 }
//!   ]
//! }
//! ```
//!
//! [`encode`] always writes this envelope with [`SNAPSHOT_VERSION`].
//!
//! ## Legacy format
//!
//! Older builds stored a bare JSON array of line items with no version. [`decode`]
//! still accepts it and reports [`SnapshotFormat::Legacy`]; the next write-back
//! replaces it with the envelope.
//!
//! ## Rejections
//!
//! | Input | Error |
//! |-------|-------|
//! | not JSON, or records with missing/mistyped fields | [`SnapshotError::Json`] |
//! | object without a numeric `version` | [`SnapshotError::MissingVersion`] |
//! | `version` other than [`SNAPSHOT_VERSION`] | [`SnapshotError::UnsupportedVersion`] |
//! | any other JSON value (string, number, null) | [`SnapshotError::UnexpectedShape`] |
//!
//! On the write side, [`encode`] refuses NaN or infinite prices with
//! [`SnapshotError::NonFinitePrice`].

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::models::Product;

/// Version written into every new snapshot.
pub const SNAPSHOT_VERSION: u64 = 1;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot is not valid cart JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot object has no version field")]
    MissingVersion,
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u64),
    #[error("snapshot must be a JSON array or object")]
    UnexpectedShape,
    #[error("product {0:?} has a non-finite price")]
    NonFinitePrice(String),
}

/// Which layout a decoded snapshot was stored in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnapshotFormat {
    Legacy,
    Versioned,
}

#[derive(Debug)]
pub struct Decoded {
    pub products: Vec<Product>,
    pub format: SnapshotFormat,
}

#[derive(Serialize)]
struct Envelope<'a> {
    version: u64,
    products: &'a [Product],
}

/// Serialize the full cart into the current envelope.
///
/// Fails on NaN or infinite prices. JSON has no representation for them and
/// `serde_json` would write `null`, which [`decode`] rejects.
pub fn encode(products: &[Product]) -> Result<String, SnapshotError> {
    if let Some(bad) = products.iter().find(|p| !p.price.is_finite()) {
        return Err(SnapshotError::NonFinitePrice(bad.id.clone()));
    }
    let envelope = Envelope {
        version: SNAPSHOT_VERSION,
        products,
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Parse a stored snapshot in either the current or the legacy layout.
pub fn decode(raw: &str) -> Result<Decoded, SnapshotError> {
    let value: Value = serde_json::from_str(raw)?;
    match value {
        Value::Array(_) => Ok(Decoded {
            products: serde_json::from_value(value)?,
            format: SnapshotFormat::Legacy,
        }),
        Value::Object(mut fields) => {
            let version = fields
                .get("version")
                .and_then(Value::as_u64)
                .ok_or(SnapshotError::MissingVersion)?;
            if version != SNAPSHOT_VERSION {
                return Err(SnapshotError::UnsupportedVersion(version));
            }
            let products = fields.remove("products").unwrap_or(Value::Array(Vec::new()));
            Ok(Decoded {
                products: serde_json::from_value(products)?,
                format: SnapshotFormat::Versioned,
            })
        }
        _ => Err(SnapshotError::UnexpectedShape),
    }
}
