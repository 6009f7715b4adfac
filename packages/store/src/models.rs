//! # Domain models for cart line items
//!
//! These are the values that cross the store boundary: consumers pass a
//! [`NewProduct`] into [`crate::CartHandle::add_to_cart`] and read back
//! [`Product`] snapshots. Both are `Serialize + Deserialize` because they are
//! also the records inside the persisted snapshot (see [`crate::snapshot`]).
//!
//! | Struct | Represents |
//! |--------|-----------|
//! | [`Product`] | One line in the cart: the product fields plus a `quantity` that is always at least 1. |
//! | [`NewProduct`] | The descriptor a consumer adds. Same fields as [`Product`] without `quantity`. |
//!
//! `title`, `image_url` and `price` are opaque to the store. Nothing here does
//! arithmetic on `price`.

use serde::{Deserialize, Serialize};

/// A line item in the cart.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Stable product identifier; unique within a cart.
    pub id: String,
    pub title: String,
    pub image_url: String,
    pub price: f64,
    /// Number of units, never below 1 while the item is in a cart.
    pub quantity: u32,
}

/// A product as handed to `add_to_cart`, before it has a quantity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub id: String,
    pub title: String,
    pub image_url: String,
    pub price: f64,
}

impl NewProduct {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        image_url: impl Into<String>,
        price: f64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            image_url: image_url.into(),
            price,
        }
    }

    /// Turn the descriptor into a line item with the given quantity.
    pub fn with_quantity(self, quantity: u32) -> Product {
        Product {
            id: self.id,
            title: self.title,
            image_url: self.image_url,
            price: self.price,
            quantity,
        }
    }
}
