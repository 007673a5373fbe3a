//! Cart Aggregate
//!
//! A cart lives inside its user's record and only holds references; prices are
//! resolved against the catalog when the cart is shown or checked out.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartItem>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: Uuid,
    pub quantity: u32,
    pub variant: Option<String>,
}

impl CartItem {
    fn matches(&self, product_id: Uuid, variant: Option<&str>) -> bool {
        self.product_id == product_id && variant.is_none_or(|v| self.variant.as_deref() == Some(v))
    }
}

impl Cart {
    pub fn new() -> Self { Self::default() }
    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn item_count(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    /// Adds a line, merging into an existing one for the same product and variant.
    pub fn add_item(&mut self, item: CartItem) -> Result<(), CartError> {
        if item.quantity == 0 { return Err(CartError::InvalidQuantity); }
        if let Some(existing) = self.items.iter_mut().find(|i| i.product_id == item.product_id && i.variant == item.variant) {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
        } else {
            self.items.push(item);
        }
        Ok(())
    }

    /// Sets the quantity of a line; zero removes it. Without a variant the first
    /// line for the product is targeted.
    pub fn update_quantity(&mut self, product_id: Uuid, variant: Option<&str>, quantity: u32) -> Result<(), CartError> {
        let pos = self.items.iter().position(|i| i.matches(product_id, variant)).ok_or(CartError::ItemNotFound)?;
        if quantity == 0 { self.items.remove(pos); }
        else { self.items[pos].quantity = quantity; }
        Ok(())
    }

    /// Removes every line for the product.
    pub fn remove_item(&mut self, product_id: Uuid) -> Result<(), CartError> {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        if self.items.len() == before { return Err(CartError::ItemNotFound); }
        Ok(())
    }

    pub fn clear(&mut self) { self.items.clear(); }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum CartError { ItemNotFound, InvalidQuantity }
impl std::error::Error for CartError {}
impl std::fmt::Display for CartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self { Self::ItemNotFound => write!(f, "Product not found in cart"), Self::InvalidQuantity => write!(f, "Quantity must be at least 1") }
    }
}

impl From<CartError> for crate::EcommerceError {
    fn from(e: CartError) -> Self {
        match e {
            CartError::ItemNotFound => crate::EcommerceError::NotFound("Cart item"),
            CartError::InvalidQuantity => crate::EcommerceError::Validation(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product_id: Uuid, quantity: u32, variant: Option<&str>) -> CartItem {
        CartItem { product_id, quantity, variant: variant.map(String::from) }
    }

    #[test]
    fn test_cart_operations() {
        let p1 = Uuid::new_v4();
        let mut cart = Cart::new();
        cart.add_item(line(p1, 2, Some("Black"))).unwrap();
        assert_eq!(cart.item_count(), 1);
        cart.add_item(line(p1, 1, Some("Black"))).unwrap();
        assert_eq!(cart.items()[0].quantity, 3); // Merged
        cart.add_item(line(p1, 1, Some("Blue"))).unwrap();
        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.add_item(line(p1, 0, None)), Err(CartError::InvalidQuantity));
    }

    #[test]
    fn test_update_and_remove() {
        let (p1, p2) = (Uuid::new_v4(), Uuid::new_v4());
        let mut cart = Cart::new();
        cart.add_item(line(p1, 2, None)).unwrap();
        cart.add_item(line(p2, 1, Some("Red"))).unwrap();
        cart.update_quantity(p2, Some("Red"), 4).unwrap();
        assert_eq!(cart.items()[1].quantity, 4);
        assert_eq!(cart.update_quantity(p2, Some("Green"), 1), Err(CartError::ItemNotFound));
        cart.update_quantity(p1, None, 0).unwrap();
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.remove_item(p1), Err(CartError::ItemNotFound));
        cart.remove_item(p2).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_serializes_as_list() {
        let p1 = Uuid::nil();
        let mut cart = Cart::new();
        cart.add_item(line(p1, 1, None)).unwrap();
        let json = serde_json::to_value(&cart).unwrap();
        assert!(json.is_array());
        assert_eq!(serde_json::from_value::<Cart>(json).unwrap(), cart);
    }
}
