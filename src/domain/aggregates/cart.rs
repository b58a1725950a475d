//! Cart Aggregate

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use crate::domain::pricing::PricingLine;
use crate::domain::value_objects::Money;

/// Upper bound on a single line, to keep arithmetic well inside `i32` stock math.
pub const MAX_LINE_QUANTITY: u32 = 999;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cart {
    user_id: Uuid,
    items: Vec<CartItem>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub available: bool,
}

impl CartItem {
    pub fn line_total(&self) -> Money { self.unit_price.times(self.quantity) }
}

impl Cart {
    pub fn new(user_id: Uuid) -> Self { Self { user_id, items: vec![] } }

    pub fn with_items(user_id: Uuid, items: Vec<CartItem>) -> Self { Self { user_id, items } }

    pub fn user_id(&self) -> Uuid { self.user_id }
    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn item_count(&self) -> u32 { self.items.iter().map(|i| i.quantity).sum() }
    pub fn subtotal(&self) -> Money { self.items.iter().map(CartItem::line_total).sum() }

    /// Adds or merges into an existing line; returns the resulting quantity.
    pub fn add_item(&mut self, item: CartItem) -> Result<u32, CartError> {
        if item.quantity == 0 { return Err(CartError::InvalidQuantity); }
        if !item.available { return Err(CartError::ProductUnavailable(item.product_id)); }
        if let Some(existing) = self.items.iter_mut().find(|i| i.product_id == item.product_id) {
            let merged = existing.quantity + item.quantity;
            if merged > MAX_LINE_QUANTITY { return Err(CartError::QuantityTooLarge(merged)); }
            existing.quantity = merged;
            existing.unit_price = item.unit_price;
            Ok(merged)
        } else {
            if item.quantity > MAX_LINE_QUANTITY { return Err(CartError::QuantityTooLarge(item.quantity)); }
            let qty = item.quantity;
            self.items.push(item);
            Ok(qty)
        }
    }

    /// Sets a line quantity; zero removes the line.
    pub fn update_quantity(&mut self, product_id: Uuid, quantity: u32) -> Result<(), CartError> {
        if quantity > MAX_LINE_QUANTITY { return Err(CartError::QuantityTooLarge(quantity)); }
        let item = self.items.iter_mut().find(|i| i.product_id == product_id).ok_or(CartError::ItemNotFound(product_id))?;
        if quantity == 0 { self.items.retain(|i| i.product_id != product_id); }
        else { item.quantity = quantity; }
        Ok(())
    }

    pub fn remove_item(&mut self, product_id: Uuid) -> Result<(), CartError> {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        if self.items.len() == before { return Err(CartError::ItemNotFound(product_id)); }
        Ok(())
    }

    pub fn clear(&mut self) { self.items.clear(); }

    /// Lines ready for pricing; fails on empty carts or archived products.
    pub fn pricing_lines(&self) -> Result<Vec<PricingLine>, CartError> {
        if self.items.is_empty() { return Err(CartError::Empty); }
        self.items
            .iter()
            .map(|i| {
                if !i.available { return Err(CartError::ProductUnavailable(i.product_id)); }
                Ok(PricingLine { product_id: i.product_id, name: i.name.clone(), unit_price: i.unit_price, quantity: i.quantity })
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CartError {
    #[error("cart is empty")]
    Empty,
    #[error("product {0} is not in the cart")]
    ItemNotFound(Uuid),
    #[error("quantity must be at least 1")]
    InvalidQuantity,
    #[error("quantity {0} exceeds the per-line limit")]
    QuantityTooLarge(u32),
    #[error("product {0} is no longer available")]
    ProductUnavailable(Uuid),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: Uuid, qty: u32) -> CartItem {
        CartItem { product_id: id, name: "Milk".into(), unit_price: Money::rupiah(18_000), quantity: qty, available: true }
    }

    #[test]
    fn test_cart_operations() {
        let p1 = Uuid::new_v4();
        let mut cart = Cart::new(Uuid::new_v4());
        cart.add_item(item(p1, 2)).unwrap();
        assert_eq!(cart.subtotal(), Money::rupiah(36_000));
        assert_eq!(cart.add_item(item(p1, 1)).unwrap(), 3); // Merged
        assert_eq!(cart.items().len(), 1);
        cart.update_quantity(p1, 0).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_cart_rejects_bad_input() {
        let p1 = Uuid::new_v4();
        let mut cart = Cart::new(Uuid::nil());
        assert_eq!(cart.add_item(item(p1, 0)).unwrap_err(), CartError::InvalidQuantity);
        assert_eq!(cart.remove_item(p1).unwrap_err(), CartError::ItemNotFound(p1));
        assert_eq!(cart.pricing_lines().unwrap_err(), CartError::Empty);
        cart.add_item(item(p1, MAX_LINE_QUANTITY)).unwrap();
        assert!(matches!(cart.add_item(item(p1, 1)), Err(CartError::QuantityTooLarge(_))));
    }

    #[test]
    fn test_archived_product_blocks_checkout() {
        let p1 = Uuid::new_v4();
        let mut archived = item(p1, 1);
        archived.available = false;
        let cart = Cart::with_items(Uuid::nil(), vec![archived]);
        assert_eq!(cart.pricing_lines().unwrap_err(), CartError::ProductUnavailable(p1));
    }
}
