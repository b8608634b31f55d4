//! Cart Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub email: String,
    pub items: Vec<CartItem>,
}

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: Uuid,
    pub quantity: i64,
    /// Included in the next checkout.
    pub checked: bool,
    pub added_at: DateTime<Utc>,
}

impl Cart {
    pub fn new(email: impl Into<String>) -> Self { Self { email: email.into(), items: vec![] } }

    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn checked_items(&self) -> impl Iterator<Item = &CartItem> { self.items.iter().filter(|i| i.checked) }

    /// Adds to an existing line or creates a new checked one.
    pub fn add_item(&mut self, product_id: Uuid, quantity: i64) {
        if let Some(existing) = self.items.iter_mut().find(|i| i.product_id == product_id) {
            existing.quantity += quantity;
        } else {
            self.items.push(CartItem { product_id, quantity, checked: true, added_at: Utc::now() });
        }
    }

    pub fn set_checked(&mut self, product_id: Uuid, checked: bool) -> Result<(), CartError> {
        let item = self.items.iter_mut().find(|i| i.product_id == product_id).ok_or(CartError::ItemNotFound)?;
        item.checked = checked;
        Ok(())
    }

    pub fn update_quantity(&mut self, product_id: Uuid, quantity: i64) -> Result<(), CartError> {
        let item = self.items.iter_mut().find(|i| i.product_id == product_id).ok_or(CartError::ItemNotFound)?;
        if quantity <= 0 { self.items.retain(|i| i.product_id != product_id); }
        else { item.quantity = quantity; }
        Ok(())
    }

    pub fn remove_item(&mut self, product_id: Uuid) -> Result<(), CartError> {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        if self.items.len() == before { return Err(CartError::ItemNotFound); }
        Ok(())
    }

    /// Drops the checked lines for the given products, leaving everything else.
    pub fn remove_checked(&mut self, product_ids: &[Uuid]) {
        self.items.retain(|i| !(i.checked && product_ids.contains(&i.product_id)));
    }
}

#[derive(Debug, Clone)] pub enum CartError { ItemNotFound }
impl std::error::Error for CartError {}
impl std::fmt::Display for CartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "Item not found in cart") }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_cart_operations() {
        let p1 = Uuid::new_v4();
        let mut cart = Cart::new("a@b.c");
        cart.add_item(p1, 2);
        cart.add_item(p1, 1);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 3); // Merged
        cart.update_quantity(p1, 0).unwrap();
        assert!(cart.is_empty());
    }
    #[test]
    fn test_remove_checked_keeps_unchecked() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut cart = Cart::new("a@b.c");
        cart.add_item(a, 2);
        cart.add_item(b, 1);
        cart.set_checked(b, false).unwrap();
        assert_eq!(cart.checked_items().count(), 1);
        cart.remove_checked(&[a, b]);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].product_id, b);
    }
}
