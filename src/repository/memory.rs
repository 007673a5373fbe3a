//! In-memory store

use std::cmp::Reverse;
use std::collections::HashMap;
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;
use crate::domain::aggregates::{Cart, Order, Product, Shipment, User};
use crate::domain::value_objects::OrderNumber;
use crate::repository::{plan_deduction, OnHand, OrderRepository, ProductFilter, ProductRepository, StockLevel, StockRequest, UserRepository};
use crate::{EcommerceError, Result};

#[derive(Default)]
struct Fulfillment {
    orders: HashMap<Uuid, Order>,
    shipments: HashMap<Uuid, Shipment>,
}

/// Keeps everything in process. Orders and shipments share one lock so that
/// accepting an order is a single step.
#[derive(Default)]
pub struct MemoryStore {
    products: RwLock<HashMap<Uuid, Product>>,
    users: RwLock<HashMap<Uuid, User>>,
    fulfillment: RwLock<Fulfillment>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

fn newest_first<T, K: Ord>(mut items: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    items.sort_by_key(|item| Reverse(key(item)));
    items
}

impl ProductFilter {
    fn matches(&self, product: &Product) -> bool {
        match self {
            Self::All => true,
            Self::Category(category) => product.category == *category,
            Self::NameContains(query) => product.name.to_lowercase().contains(&query.to_lowercase()),
            Self::LowStock => product.stock.is_low(),
            Self::OutOfStock => product.stock.is_zero(),
        }
    }
}

#[async_trait]
impl ProductRepository for MemoryStore {
    async fn insert_product(&self, product: &Product) -> Result<()> {
        let mut products = self.products.write().await;
        if products.values().any(|p| p.code == product.code) {
            return Err(EcommerceError::StorageError(format!("duplicate product code {}", product.code)));
        }
        products.insert(product.id, product.clone());
        Ok(())
    }

    async fn update_product(&self, product: &Product) -> Result<()> {
        let mut products = self.products.write().await;
        let slot = products.get_mut(&product.id).ok_or(EcommerceError::NotFound("Product"))?;
        let reviews = std::mem::take(&mut slot.reviews);
        *slot = Product { reviews, rating: slot.rating, review_count: slot.review_count, ..product.clone() };
        Ok(())
    }

    async fn save_reviews(&self, product: &Product) -> Result<()> {
        let mut products = self.products.write().await;
        let slot = products.get_mut(&product.id).ok_or(EcommerceError::NotFound("Product"))?;
        slot.reviews = product.reviews.clone();
        slot.rating = product.rating;
        slot.review_count = product.review_count;
        slot.updated_at = product.updated_at;
        Ok(())
    }

    async fn find_product(&self, id: Uuid) -> Result<Option<Product>> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn delete_product(&self, id: Uuid) -> Result<Option<Product>> {
        Ok(self.products.write().await.remove(&id))
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        let products = self.products.read().await;
        let matching: Vec<Product> = products.values().filter(|p| filter.matches(p)).cloned().collect();
        Ok(newest_first(matching, |p| (p.created_at, p.id)))
    }

    async fn deduct_stock(&self, lines: &[StockRequest]) -> Result<Vec<StockLevel>> {
        let mut products = self.products.write().await;
        let on_hand: OnHand = lines.iter()
            .filter_map(|l| products.get(&l.product_id))
            .map(|p| (p.id, (p.stock, p.name.clone())))
            .collect();
        let levels = plan_deduction(&on_hand, lines)?;
        let now = chrono::Utc::now();
        for level in &levels {
            if let Some(product) = products.get_mut(&level.product_id) {
                product.stock = level.remaining;
                product.updated_at = now;
            }
        }
        Ok(levels)
    }

    async fn restore_stock(&self, lines: &[StockRequest]) -> Result<()> {
        let mut products = self.products.write().await;
        for line in lines {
            if let Some(product) = products.get_mut(&line.product_id) {
                product.stock = product.stock.add(line.quantity);
            }
        }
        Ok(())
    }

    async fn strip_reviews_by(&self, user_id: Uuid) -> Result<u64> {
        let mut products = self.products.write().await;
        Ok(products.values_mut().map(|p| p.strip_reviews_by(user_id)).filter(|touched| *touched).count() as u64)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<()> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(EcommerceError::Validation("User already exists".into()));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.users.read().await.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let users: Vec<User> = self.users.read().await.values().cloned().collect();
        Ok(newest_first(users, |u| (u.created_at, u.id)))
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool> {
        Ok(self.users.write().await.remove(&id).is_some())
    }

    async fn save_cart(&self, user_id: Uuid, cart: &Cart) -> Result<()> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&user_id).ok_or(EcommerceError::NotFound("User"))?;
        user.cart = cart.clone();
        Ok(())
    }

    async fn has_admin(&self) -> Result<bool> {
        Ok(self.users.read().await.values().any(|u| u.is_admin))
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn insert_order(&self, order: &Order) -> Result<()> {
        let mut state = self.fulfillment.write().await;
        if state.orders.values().any(|o| o.order_number == order.order_number) {
            return Err(EcommerceError::StorageError(format!("duplicate order number {}", order.order_number)));
        }
        state.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn find_order(&self, id: Uuid) -> Result<Option<Order>> {
        Ok(self.fulfillment.read().await.orders.get(&id).cloned())
    }

    async fn list_orders(&self, user_id: Option<Uuid>) -> Result<Vec<Order>> {
        let state = self.fulfillment.read().await;
        let orders: Vec<Order> = state.orders.values().filter(|o| user_id.is_none_or(|u| o.user_id == u)).cloned().collect();
        Ok(newest_first(orders, |o| (o.created_at, o.id)))
    }

    async fn update_order(&self, order: &Order) -> Result<()> {
        let mut state = self.fulfillment.write().await;
        let slot = state.orders.get_mut(&order.id).ok_or(EcommerceError::NotFound("Order"))?;
        *slot = order.clone();
        Ok(())
    }

    async fn delete_order(&self, id: Uuid) -> Result<Option<Order>> {
        let mut state = self.fulfillment.write().await;
        let removed = state.orders.remove(&id);
        if removed.is_some() {
            state.shipments.retain(|_, s| s.order_id != Some(id));
        }
        Ok(removed)
    }

    async fn order_number_taken(&self, number: &OrderNumber) -> Result<bool> {
        let state = self.fulfillment.read().await;
        Ok(state.orders.values().any(|o| &o.order_number == number) || state.shipments.values().any(|s| &s.order_number == number))
    }

    async fn accept_order(&self, order_id: Uuid, shipment: &Shipment) -> Result<()> {
        let mut state = self.fulfillment.write().await;
        if state.shipments.values().any(|s| s.order_id == Some(order_id)) { return Err(EcommerceError::AlreadyShipped); }
        if state.orders.remove(&order_id).is_none() { return Err(EcommerceError::NotFound("Order")); }
        state.shipments.insert(shipment.id, shipment.clone());
        Ok(())
    }

    async fn find_shipment(&self, id: Uuid) -> Result<Option<Shipment>> {
        Ok(self.fulfillment.read().await.shipments.get(&id).cloned())
    }

    async fn find_shipment_by_order(&self, order_id: Uuid) -> Result<Option<Shipment>> {
        Ok(self.fulfillment.read().await.shipments.values().find(|s| s.order_id == Some(order_id)).cloned())
    }

    async fn list_shipments(&self, user_id: Option<Uuid>) -> Result<Vec<Shipment>> {
        let state = self.fulfillment.read().await;
        let shipments: Vec<Shipment> = state.shipments.values().filter(|s| user_id.is_none_or(|u| s.user_id == u)).cloned().collect();
        Ok(newest_first(shipments, |s| (s.created_at, s.id)))
    }

    async fn update_shipment(&self, shipment: &Shipment) -> Result<()> {
        let mut state = self.fulfillment.write().await;
        let slot = state.shipments.get_mut(&shipment.id).ok_or(EcommerceError::NotFound("Shipment"))?;
        *slot = shipment.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::order::tests::{address, line};
    use crate::domain::aggregates::product::tests::charger_draft;
    use crate::domain::aggregates::PaymentMethod;
    use crate::domain::value_objects::ProductCode;
    use rust_decimal_macros::dec;

    async fn seed(store: &MemoryStore, name: &str, stock: u32) -> Uuid {
        let mut draft = charger_draft(dec!(100), stock);
        draft.name = name.into();
        let product = Product::create(ProductCode::generate(&mut rand::thread_rng()), draft).unwrap();
        store.insert_product(&product).await.unwrap();
        product.id
    }

    #[tokio::test]
    async fn test_deduct_is_all_or_nothing() {
        let store = MemoryStore::new();
        let a = seed(&store, "A", 5).await;
        let b = seed(&store, "B", 1).await;
        let err = store.deduct_stock(&[StockRequest { product_id: a, quantity: 2 }, StockRequest { product_id: b, quantity: 2 }]).await.unwrap_err();
        assert!(matches!(err, EcommerceError::InsufficientStock { ref name, .. } if name == "B"));
        assert_eq!(store.find_product(a).await.unwrap().unwrap().stock.value(), 5);
    }

    #[tokio::test]
    async fn test_deduct_counts_repeated_lines_together() {
        let store = MemoryStore::new();
        let a = seed(&store, "A", 5).await;
        let line = StockRequest { product_id: a, quantity: 3 };
        assert!(store.deduct_stock(&[line, line]).await.is_err());
        let levels = store.deduct_stock(&[StockRequest { product_id: a, quantity: 2 }, StockRequest { product_id: a, quantity: 1 }]).await.unwrap();
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].remaining.value(), 2);
    }

    #[tokio::test]
    async fn test_delete_order_takes_its_shipments() {
        let store = MemoryStore::new();
        let buyer = User::register("Nimal Silva", "nimal@example.com", "secret1").unwrap();
        let order = Order::place(OrderNumber::from_suffix(2468).unwrap(), buyer.id, vec![line("A", 1, dec!(100))], address(), PaymentMethod::CashOnDelivery, None).unwrap();
        let shipment = order.clone().accept(Some(&buyer)).unwrap();
        let other = Order::place(OrderNumber::from_suffix(1357).unwrap(), buyer.id, vec![line("B", 1, dec!(50))], address(), PaymentMethod::CashOnDelivery, None).unwrap()
            .accept(Some(&buyer)).unwrap();
        store.insert_order(&order).await.unwrap();
        {
            let mut state = store.fulfillment.write().await;
            state.shipments.insert(shipment.id, shipment.clone());
            state.shipments.insert(other.id, other.clone());
        }

        assert_eq!(store.delete_order(order.id).await.unwrap().map(|o| o.id), Some(order.id));
        assert!(store.find_shipment(shipment.id).await.unwrap().is_none());
        assert!(store.find_shipment(other.id).await.unwrap().is_some());
        assert!(store.delete_order(order.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_filters() {
        let store = MemoryStore::new();
        seed(&store, "Fast Charger", 0).await;
        seed(&store, "Slow charger", 3).await;
        seed(&store, "Cable", 30).await;
        assert_eq!(store.list_products(&ProductFilter::OutOfStock).await.unwrap().len(), 1);
        assert_eq!(store.list_products(&ProductFilter::LowStock).await.unwrap()[0].name, "Slow charger");
        assert_eq!(store.list_products(&ProductFilter::NameContains("CHARGER".into())).await.unwrap().len(), 2);
        assert_eq!(store.list_products(&ProductFilter::All).await.unwrap().len(), 3);
    }
}
