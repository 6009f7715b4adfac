//! In-memory cart: an ordered list of [`Product`] lines, unique by id.

use tracing::warn;

use crate::models::{NewProduct, Product};

/// What a mutation did to the cart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Change {
    /// A new line was appended with quantity 1.
    Added,
    /// An existing line now has `quantity` units.
    Incremented { quantity: u32 },
    /// An existing line now has `quantity` units (still at least 1).
    Decremented { quantity: u32 },
    /// The line was at quantity 1 and has been removed.
    Removed,
    /// Nothing matched, the cart is as it was.
    Unchanged,
}

impl Change {
    pub fn is_change(self) -> bool {
        self != Change::Unchanged
    }
}

/// Ordered cart lines. Order is insertion order; increments and decrements
/// update lines in place.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cart {
    products: Vec<Product>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cart from previously stored lines.
    ///
    /// Lines with a zero quantity are dropped and repeated ids are folded into
    /// their first occurrence, so the result always satisfies the cart
    /// invariants even if the input did not.
    pub fn from_products(products: Vec<Product>) -> Self {
        let mut cart = Self::new();
        for product in products {
            if product.quantity == 0 {
                warn!(id = %product.id, "dropping stored cart line with zero quantity");
                continue;
            }
            match cart.position(&product.id) {
                Some(idx) => {
                    warn!(id = %product.id, "merging duplicate stored cart line");
                    let existing = &mut cart.products[idx];
                    existing.quantity = existing.quantity.saturating_add(product.quantity);
                }
                None => cart.products.push(product),
            }
        }
        cart
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Owned copy of the lines; changes to it never reach the cart.
    pub fn to_vec(&self) -> Vec<Product> {
        self.products.clone()
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.products.iter().position(|p| p.id == id)
    }

    /// Sum of all line quantities.
    pub fn total_quantity(&self) -> u64 {
        self.products.iter().map(|p| u64::from(p.quantity)).sum()
    }

    /// Add one unit of `item`. An id already in the cart is incremented
    /// instead of appended.
    pub fn add(&mut self, item: NewProduct) -> Change {
        if self.position(&item.id).is_some() {
            return self.increment(&item.id);
        }
        self.products.push(item.with_quantity(1));
        Change::Added
    }

    pub fn increment(&mut self, id: &str) -> Change {
        let Some(idx) = self.position(id) else {
            return Change::Unchanged;
        };
        let product = &mut self.products[idx];
        match product.quantity.checked_add(1) {
            Some(quantity) => {
                product.quantity = quantity;
                Change::Incremented { quantity }
            }
            None => Change::Unchanged,
        }
    }

    /// Remove one unit; a line at quantity 1 leaves the cart.
    pub fn decrement(&mut self, id: &str) -> Change {
        let Some(idx) = self.position(id) else {
            return Change::Unchanged;
        };
        let product = &mut self.products[idx];
        if product.quantity > 1 {
            product.quantity -= 1;
            Change::Decremented {
                quantity: product.quantity,
            }
        } else {
            self.products.remove(idx);
            Change::Removed
        }
    }
}
