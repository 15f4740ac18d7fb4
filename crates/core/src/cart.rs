//! Client-side cart container.
//!
//! A [`Cart`] holds at most one line per product and mirrors itself into a
//! [`CartStorage`] under [`CART_STORAGE_KEY`] after every mutation. On
//! startup it rehydrates from the same key; anything unreadable yields an
//! empty cart.
//!
//! Revealing the cart drawer is a UI concern. [`Cart::add`] only reports what
//! changed; a [`CartDrawer`] decides what to do with that.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::types::id::ProductId;
use crate::types::price::{PriceBreakdown, Rupees};
use crate::types::product::{CartItem, ProductSnapshot};

/// Durable storage key for the serialized cart.
pub const CART_STORAGE_KEY: &str = "saumara-cart";

/// Errors raised by a [`CartStorage`] backend.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("storage write failed: {0}")]
    Write(String),
}

/// Errors raised by cart mutations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    /// `add` was called with a quantity of zero.
    #[error("quantity must be at least 1")]
    ZeroQuantity,
    /// The cart could not be serialized.
    #[error("failed to serialize cart: {0}")]
    Serialize(String),
    /// The mutation was applied in memory but could not be persisted.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// A string key-value store that survives reloads (browser local storage,
/// a file, or memory in tests).
pub trait CartStorage {
    /// Read the value stored under `key`, if any.
    fn read(&self, key: &str) -> Option<String>;

    /// Replace the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write.
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// In-memory storage. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value, e.g. a cart left over from a previous session.
    #[must_use]
    pub fn with_value(self, key: &str, value: &str) -> Self {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value.to_owned());
        self
    }
}

impl CartStorage for MemoryStorage {
    fn read(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// What an `add` did to the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartChange {
    pub product_id: ProductId,
    /// Quantity of the line after the add.
    pub quantity: u32,
    /// Whether the add merged into an existing line.
    pub merged: bool,
}

/// The per-browser cart.
#[derive(Debug)]
pub struct Cart<S> {
    items: Vec<CartItem>,
    storage: S,
}

impl<S: CartStorage> Cart<S> {
    /// Rehydrate from storage, starting empty if nothing usable is stored.
    ///
    /// Stored lines with a zero quantity are dropped and duplicate products
    /// are merged, so a hand-edited value cannot break the line invariants.
    pub fn restore(storage: S) -> Self {
        let stored = storage
            .read(CART_STORAGE_KEY)
            .and_then(|raw| serde_json::from_str::<Vec<CartItem>>(&raw).ok())
            .unwrap_or_default();

        let mut items: Vec<CartItem> = Vec::with_capacity(stored.len());
        for item in stored.into_iter().filter(|item| item.quantity > 0) {
            match items.iter_mut().find(|line| line.product.id == item.product.id) {
                Some(line) => line.quantity = line.quantity.saturating_add(item.quantity),
                None => items.push(item),
            }
        }

        Self { items, storage }
    }

    /// Add `quantity` of `product`, merging into an existing line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::ZeroQuantity`] without touching the cart, or
    /// [`CartError::Storage`] if the updated cart could not be persisted.
    pub fn add(&mut self, product: ProductSnapshot, quantity: u32) -> Result<CartChange, CartError> {
        if quantity == 0 {
            return Err(CartError::ZeroQuantity);
        }

        let change = match self.line_mut(&product.id) {
            Some(line) => {
                line.quantity = line.quantity.saturating_add(quantity);
                CartChange {
                    product_id: product.id,
                    quantity: line.quantity,
                    merged: true,
                }
            }
            None => {
                let product_id = product.id.clone();
                self.items.push(CartItem { product, quantity });
                CartChange {
                    product_id,
                    quantity,
                    merged: false,
                }
            }
        };

        self.persist()?;
        Ok(change)
    }

    /// Drop the line for `product_id`. Absent products are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the updated cart could not be persisted.
    pub fn remove(&mut self, product_id: &ProductId) -> Result<(), CartError> {
        self.items.retain(|item| &item.product.id != product_id);
        self.persist()
    }

    /// Set the quantity of an existing line; zero or less removes it.
    ///
    /// # Errors
    ///
    /// Returns an error if the updated cart could not be persisted.
    pub fn update(&mut self, product_id: &ProductId, quantity: i64) -> Result<(), CartError> {
        if quantity <= 0 {
            return self.remove(product_id);
        }

        if let Some(line) = self.line_mut(product_id) {
            line.quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        }
        self.persist()
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the empty cart could not be persisted.
    pub fn clear(&mut self) -> Result<(), CartError> {
        self.items.clear();
        self.persist()
    }

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of quantities across lines.
    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |acc, item| acc.saturating_add(item.quantity))
    }

    #[must_use]
    pub fn subtotal(&self) -> Rupees {
        self.price().subtotal
    }

    /// Client-side totals. The server recomputes these before charging.
    #[must_use]
    pub fn price(&self) -> PriceBreakdown {
        PriceBreakdown::for_items(&self.items)
    }

    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    fn line_mut(&mut self, product_id: &ProductId) -> Option<&mut CartItem> {
        self.items
            .iter_mut()
            .find(|item| &item.product.id == product_id)
    }

    fn persist(&self) -> Result<(), CartError> {
        let json =
            serde_json::to_string(&self.items).map_err(|e| CartError::Serialize(e.to_string()))?;
        self.storage.write(CART_STORAGE_KEY, &json)?;
        Ok(())
    }
}

/// Open/closed state of the slide-out cart drawer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CartDrawer {
    open: bool,
}

impl CartDrawer {
    /// React to an add by revealing the drawer.
    pub const fn on_change(&mut self, _change: &CartChange) {
        self.open = true;
    }

    pub const fn open(&mut self) {
        self.open = true;
    }

    pub const fn close(&mut self) {
        self.open = false;
    }

    pub const fn toggle(&mut self) {
        self.open = !self.open;
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.open
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::product::Category;

    fn product(id: &str, price: u64) -> ProductSnapshot {
        ProductSnapshot {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            slug: Some(id.to_string()),
            price: Rupees::new(price),
            category: Category::Skincare,
            image_url: format!("/img/{id}.jpg"),
        }
    }

    fn stored(storage: &MemoryStorage) -> Vec<CartItem> {
        serde_json::from_str(&storage.read(CART_STORAGE_KEY).unwrap()).unwrap()
    }

    #[test]
    fn test_add_merges_duplicates() {
        let mut cart = Cart::restore(MemoryStorage::new());
        let first = cart.add(product("p1", 500), 2).unwrap();
        assert!(!first.merged);
        let second = cart.add(product("p1", 500), 3).unwrap();
        assert!(second.merged);
        assert_eq!(second.quantity, 5);

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items().first().unwrap().quantity, 5);
        assert_eq!(cart.total_items(), 5);
        assert_eq!(cart.subtotal(), Rupees::new(2500));
    }

    #[test]
    fn test_add_zero_is_rejected() {
        let mut cart = Cart::restore(MemoryStorage::new());
        assert_eq!(cart.add(product("p1", 500), 0), Err(CartError::ZeroQuantity));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_keeps_insertion_order() {
        let mut cart = Cart::restore(MemoryStorage::new());
        cart.add(product("b", 100), 1).unwrap();
        cart.add(product("a", 100), 1).unwrap();
        cart.add(product("b", 100), 1).unwrap();
        let ids: Vec<&str> = cart.items().iter().map(|i| i.product.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_update_zero_equals_remove() {
        let build = || {
            let mut cart = Cart::restore(MemoryStorage::new());
            cart.add(product("p1", 500), 2).unwrap();
            cart.add(product("p2", 800), 1).unwrap();
            cart
        };

        let mut updated = build();
        updated.update(&ProductId::new("p1"), 0).unwrap();
        let mut removed = build();
        removed.remove(&ProductId::new("p1")).unwrap();
        let mut negative = build();
        negative.update(&ProductId::new("p1"), -3).unwrap();

        assert_eq!(updated.items(), removed.items());
        assert_eq!(negative.items(), removed.items());
        assert_eq!(stored(updated.storage()), stored(removed.storage()));
    }

    #[test]
    fn test_update_sets_quantity() {
        let mut cart = Cart::restore(MemoryStorage::new());
        cart.add(product("p1", 500), 2).unwrap();
        cart.update(&ProductId::new("p1"), 7).unwrap();
        assert_eq!(cart.total_items(), 7);
        cart.update(&ProductId::new("missing"), 4).unwrap();
        assert_eq!(cart.items().len(), 1);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut cart = Cart::restore(MemoryStorage::new());
        cart.add(product("p1", 500), 1).unwrap();
        cart.remove(&ProductId::new("p9")).unwrap();
        assert_eq!(cart.items().len(), 1);
    }

    #[test]
    fn test_every_mutation_persists() {
        let storage = MemoryStorage::new();
        let mut cart = Cart::restore(storage.clone());
        cart.add(product("p1", 500), 1).unwrap();
        assert_eq!(stored(&storage).len(), 1);
        cart.add(product("p2", 250), 4).unwrap();
        assert_eq!(stored(&storage).len(), 2);
        cart.update(&ProductId::new("p2"), 2).unwrap();
        assert_eq!(stored(&storage).get(1).unwrap().quantity, 2);
    }

    #[test]
    fn test_clear_leaves_empty_list_in_storage() {
        let storage = MemoryStorage::new();
        let mut cart = Cart::restore(storage.clone());
        cart.add(product("p1", 500), 1).unwrap();
        cart.update(&ProductId::new("p1"), 3).unwrap();
        cart.add(product("p2", 500), 1).unwrap();
        cart.clear().unwrap();
        assert!(cart.is_empty());
        assert_eq!(storage.read(CART_STORAGE_KEY).as_deref(), Some("[]"));
    }

    #[test]
    fn test_restore_survives_reload() {
        let storage = MemoryStorage::new();
        {
            let mut cart = Cart::restore(storage.clone());
            cart.add(product("p1", 1500), 2).unwrap();
        }
        let cart = Cart::restore(storage);
        assert_eq!(cart.total_items(), 2);
        assert_eq!(cart.items().first().unwrap().product.image_url, "/img/p1.jpg");
    }

    #[test]
    fn test_restore_garbage_starts_empty() {
        let storage = MemoryStorage::new().with_value(CART_STORAGE_KEY, "{not json");
        let cart = Cart::restore(storage);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_restore_repairs_invariants() {
        let raw = r#"[
            {"product":{"id":"p1","name":"A","price":100,"category":"skincare"},"quantity":1},
            {"product":{"id":"p1","name":"A","price":100,"category":"skincare"},"quantity":2},
            {"product":{"id":"p2","name":"B","price":100,"category":"skincare"},"quantity":0}
        ]"#;
        let cart = Cart::restore(MemoryStorage::new().with_value(CART_STORAGE_KEY, raw));
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.total_items(), 3);
    }

    #[test]
    fn test_drawer_opens_on_add() {
        let mut cart = Cart::restore(MemoryStorage::new());
        let mut drawer = CartDrawer::default();
        assert!(!drawer.is_open());
        let change = cart.add(product("p1", 500), 1).unwrap();
        drawer.on_change(&change);
        assert!(drawer.is_open());
        drawer.close();
        assert!(!drawer.is_open());
    }

    struct FailingStorage;

    impl CartStorage for FailingStorage {
        fn read(&self, _key: &str) -> Option<String> {
            None
        }

        fn write(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Write("quota exceeded".to_string()))
        }
    }

    #[test]
    fn test_storage_failure_keeps_memory_state() {
        let mut cart = Cart::restore(FailingStorage);
        let err = cart.add(product("p1", 500), 1).unwrap_err();
        assert!(matches!(err, CartError::Storage(_)));
        assert_eq!(cart.total_items(), 1);
    }
}
