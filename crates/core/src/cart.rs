//! Cart line identity, quantities, and collection invariants.
//!
//! A cart (or wishlist) is a small ordered collection of lines keyed by
//! `(product, variant)`. Two invariants hold everywhere:
//!
//! - at most one line per [`LineKey`]; adding an existing key merges into it
//! - no line has quantity zero; setting quantity to zero removes the line
//!
//! Prices never appear here. What is in the cart and how it is priced are
//! separate concerns - persisted lines carry only identity and quantity, and
//! the catalog is re-consulted for prices at read time.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{ProductId, VariantId};

/// Composite identity of a cart line: which variant of which product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineKey {
    pub product_id: ProductId,
    pub variant_id: VariantId,
}

impl LineKey {
    /// Create a new line key.
    #[must_use]
    pub const fn new(product_id: ProductId, variant_id: VariantId) -> Self {
        Self {
            product_id,
            variant_id,
        }
    }
}

/// A persisted cart line: identity plus quantity, nothing else.
///
/// Quantity is always positive. Constructing or deserializing a line with
/// quantity zero is allowed at the type level but [`LineSet`] never stores one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineQuantity {
    #[serde(flatten)]
    pub key: LineKey,
    pub quantity: u32,
}

impl LineQuantity {
    /// Create a new line.
    #[must_use]
    pub const fn new(key: LineKey, quantity: u32) -> Self {
        Self { key, quantity }
    }
}

/// A catalog-enriched view of a cart line, recomputed on every fetch.
///
/// `sale_price` is only populated while the catalog sale window is active;
/// the repository that builds this view resolves the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineDetail {
    #[serde(flatten)]
    pub key: LineKey,
    pub quantity: u32,
    pub product_name: String,
    pub variant_name: String,
    pub variant_color: Option<String>,
    pub image_url: Option<String>,
    pub unit_price: Decimal,
    pub sale_price: Option<Decimal>,
}

impl LineDetail {
    /// The base effective unit price: the active sale price if there is one,
    /// otherwise the catalog price.
    #[must_use]
    pub fn effective_unit_price(&self) -> Decimal {
        self.sale_price.unwrap_or(self.unit_price)
    }
}

/// An ordered collection of cart lines with the one-line-per-key invariant.
///
/// Insertion order is preserved so the cart renders stably across updates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineSet {
    lines: Vec<LineQuantity>,
}

impl LineSet {
    /// Create an empty line set.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Build a line set from untrusted persisted lines (e.g., a guest cookie).
    ///
    /// Lines with quantity zero are dropped. Duplicate keys collapse to the
    /// last occurrence, consistent with last-write-wins persistence.
    #[must_use]
    pub fn sanitize(lines: Vec<LineQuantity>) -> Self {
        let mut set = Self::new();
        for line in lines {
            if line.quantity == 0 {
                continue;
            }
            set.set_quantity(line.key, line.quantity);
        }
        set
    }

    /// Add `quantity` of a line, merging into an existing line for the same key.
    pub fn add(&mut self, key: LineKey, quantity: u32) {
        if quantity == 0 {
            return;
        }
        match self.lines.iter_mut().find(|l| l.key == key) {
            Some(line) => line.quantity = line.quantity.saturating_add(quantity),
            None => self.lines.push(LineQuantity::new(key, quantity)),
        }
    }

    /// Set the quantity for a key. Zero removes the line.
    pub fn set_quantity(&mut self, key: LineKey, quantity: u32) {
        if quantity == 0 {
            self.remove(&key);
            return;
        }
        match self.lines.iter_mut().find(|l| l.key == key) {
            Some(line) => line.quantity = quantity,
            None => self.lines.push(LineQuantity::new(key, quantity)),
        }
    }

    /// Remove the line for a key, if present.
    pub fn remove(&mut self, key: &LineKey) {
        self.lines.retain(|l| l.key != *key);
    }

    /// Remove all lines.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Merge guest lines into this (server) set on login.
    ///
    /// Union by identity: guest-only keys are appended; for keys present on
    /// both sides the server quantity wins. Quantities never sum across the
    /// merge, so a line is not double-counted by logging in.
    pub fn merge_from_guest(&mut self, guest: &Self) {
        for line in &guest.lines {
            if line.quantity == 0 {
                continue;
            }
            if !self.contains(&line.key) {
                self.lines.push(*line);
            }
        }
    }

    /// Whether a line with this key exists.
    #[must_use]
    pub fn contains(&self, key: &LineKey) -> bool {
        self.lines.iter().any(|l| l.key == *key)
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total unit count across all lines.
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.lines
            .iter()
            .fold(0, |acc, l| acc.saturating_add(l.quantity))
    }

    /// Iterate over the lines in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &LineQuantity> {
        self.lines.iter()
    }

    /// The lines as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[LineQuantity] {
        &self.lines
    }

    /// Consume the set, returning the lines.
    #[must_use]
    pub fn into_vec(self) -> Vec<LineQuantity> {
        self.lines
    }
}

impl FromIterator<LineQuantity> for LineSet {
    fn from_iter<I: IntoIterator<Item = LineQuantity>>(iter: I) -> Self {
        Self::sanitize(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(p: i32, v: i32) -> LineKey {
        LineKey::new(ProductId::new(p), VariantId::new(v))
    }

    #[test]
    fn test_add_merges_same_key() {
        let mut set = LineSet::new();
        set.add(key(1, 1), 1);
        set.add(key(1, 1), 2);
        assert_eq!(set.len(), 1);
        assert_eq!(set.as_slice().first().map(|l| l.quantity), Some(3));
    }

    #[test]
    fn test_same_product_different_variant_is_distinct() {
        let mut set = LineSet::new();
        set.add(key(1, 1), 1);
        set.add(key(1, 2), 1);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let mut set = LineSet::new();
        set.add(key(1, 1), 5);
        set.set_quantity(key(1, 1), 0);
        assert!(set.is_empty());
    }

    #[test]
    fn test_set_quantity_replaces_not_adds() {
        let mut set = LineSet::new();
        set.add(key(1, 1), 5);
        set.set_quantity(key(1, 1), 2);
        assert_eq!(set.as_slice().first().map(|l| l.quantity), Some(2));
    }

    #[test]
    fn test_no_zero_quantity_after_any_sequence() {
        let mut set = LineSet::new();
        set.add(key(1, 1), 0);
        set.add(key(2, 1), 3);
        set.set_quantity(key(2, 1), 0);
        set.add(key(3, 1), 1);
        set.remove(&key(3, 1));
        assert!(set.iter().all(|l| l.quantity > 0));
        assert!(set.is_empty());
    }

    #[test]
    fn test_sanitize_drops_zeroes_and_collapses_duplicates() {
        let set = LineSet::sanitize(vec![
            LineQuantity::new(key(1, 1), 2),
            LineQuantity::new(key(2, 1), 0),
            LineQuantity::new(key(1, 1), 7),
        ]);
        assert_eq!(set.len(), 1);
        // last occurrence wins
        assert_eq!(set.as_slice().first().map(|l| l.quantity), Some(7));
    }

    #[test]
    fn test_merge_from_guest_union_server_wins() {
        let mut server = LineSet::sanitize(vec![LineQuantity::new(key(1, 1), 2)]);
        let guest = LineSet::sanitize(vec![
            LineQuantity::new(key(1, 1), 9),
            LineQuantity::new(key(2, 1), 1),
        ]);
        server.merge_from_guest(&guest);

        assert_eq!(server.len(), 2);
        // server quantity wins for the shared key, no summing
        assert_eq!(server.as_slice().first().map(|l| l.quantity), Some(2));
        assert!(server.contains(&key(2, 1)));
    }

    #[test]
    fn test_clear_empties() {
        let mut set = LineSet::sanitize(vec![LineQuantity::new(key(1, 1), 2)]);
        set.clear();
        assert!(set.is_empty());
        assert_eq!(set.total_quantity(), 0);
    }

    #[test]
    fn test_effective_unit_price_prefers_sale() {
        let mut detail = LineDetail {
            key: key(1, 1),
            quantity: 1,
            product_name: "Mug".to_owned(),
            variant_name: "Large".to_owned(),
            variant_color: None,
            image_url: None,
            unit_price: Decimal::from(20),
            sale_price: Some(Decimal::from(15)),
        };
        assert_eq!(detail.effective_unit_price(), Decimal::from(15));
        detail.sale_price = None;
        assert_eq!(detail.effective_unit_price(), Decimal::from(20));
    }

    #[test]
    fn test_line_quantity_serde_shape() {
        let line = LineQuantity::new(key(3, 4), 2);
        let json = serde_json::to_value(&line).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({"product_id": 3, "variant_id": 4, "quantity": 2})
        );
    }
}
