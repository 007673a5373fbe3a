//! Persistence seams.
//!
//! Services talk to these traits only. [`PgStore`] backs production; [`MemoryStore`]
//! backs tests and database-less development. Both honour the same atomicity rules:
//! stock deduction is all-or-nothing, and accepting or deleting an order touches
//! orders and shipments as one unit.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use std::collections::HashMap;
use std::sync::Arc;
use async_trait::async_trait;
use uuid::Uuid;
use crate::domain::aggregates::{Cart, Category, Order, Product, Shipment, User};
use crate::domain::value_objects::{OrderNumber, Quantity};
use crate::{EcommerceError, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProductFilter {
    All,
    Category(Category),
    /// Case-insensitive substring of the name.
    NameContains(String),
    LowStock,
    OutOfStock,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StockRequest { pub product_id: Uuid, pub quantity: u32 }

/// Stock left on a product after a deduction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StockLevel { pub product_id: Uuid, pub name: String, pub remaining: Quantity }

/// Stock on hand and display name for each product an order touches.
pub(crate) type OnHand = HashMap<Uuid, (Quantity, String)>;

/// Works out what every product is left with once all lines are taken, checking
/// lines in the order given so the first short line is the one reported. Repeated
/// lines for one product draw down the same balance. Nothing is written.
pub(crate) fn plan_deduction(on_hand: &OnHand, lines: &[StockRequest]) -> Result<Vec<StockLevel>> {
    let mut levels: Vec<StockLevel> = Vec::new();
    for line in lines {
        let (stock, name) = on_hand.get(&line.product_id).ok_or(EcommerceError::NotFound("Product"))?;
        let level = match levels.iter().position(|l| l.product_id == line.product_id) {
            Some(i) => &mut levels[i],
            None => {
                levels.push(StockLevel { product_id: line.product_id, name: name.clone(), remaining: *stock });
                let last = levels.len() - 1;
                &mut levels[last]
            }
        };
        level.remaining = level.remaining.subtract(line.quantity)
            .ok_or_else(|| EcommerceError::InsufficientStock { product_id: line.product_id, name: name.clone() })?;
    }
    Ok(levels)
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn insert_product(&self, product: &Product) -> Result<()>;
    /// Writes the editable fields and stock; reviews and the rating aggregate are kept.
    async fn update_product(&self, product: &Product) -> Result<()>;
    /// Writes only the reviews and the rating aggregate, leaving stock alone.
    async fn save_reviews(&self, product: &Product) -> Result<()>;
    async fn find_product(&self, id: Uuid) -> Result<Option<Product>>;
    async fn delete_product(&self, id: Uuid) -> Result<Option<Product>>;
    /// Newest first.
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>>;
    /// Deducts every line or none. Fails with `InsufficientStock` naming the first
    /// line that cannot be covered. Returns one level per distinct product.
    async fn deduct_stock(&self, lines: &[StockRequest]) -> Result<Vec<StockLevel>>;
    async fn restore_stock(&self, lines: &[StockRequest]) -> Result<()>;
    /// Removes a user's reviews everywhere; returns the number of products touched.
    async fn strip_reviews_by(&self, user_id: Uuid) -> Result<u64>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with a validation error when the email is taken.
    async fn insert_user(&self, user: &User) -> Result<()>;
    async fn find_user(&self, id: Uuid) -> Result<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn list_users(&self) -> Result<Vec<User>>;
    async fn delete_user(&self, id: Uuid) -> Result<bool>;
    async fn save_cart(&self, user_id: Uuid, cart: &Cart) -> Result<()>;
    async fn has_admin(&self) -> Result<bool>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn insert_order(&self, order: &Order) -> Result<()>;
    async fn find_order(&self, id: Uuid) -> Result<Option<Order>>;
    /// Newest first, optionally restricted to one buyer.
    async fn list_orders(&self, user_id: Option<Uuid>) -> Result<Vec<Order>>;
    async fn update_order(&self, order: &Order) -> Result<()>;
    /// Deletes the order and any shipment created from it.
    async fn delete_order(&self, id: Uuid) -> Result<Option<Order>>;
    /// True when a live order or a shipment already carries the number.
    async fn order_number_taken(&self, number: &OrderNumber) -> Result<bool>;
    /// Inserts the shipment and deletes its source order in one step.
    async fn accept_order(&self, order_id: Uuid, shipment: &Shipment) -> Result<()>;
    async fn find_shipment(&self, id: Uuid) -> Result<Option<Shipment>>;
    async fn find_shipment_by_order(&self, order_id: Uuid) -> Result<Option<Shipment>>;
    async fn list_shipments(&self, user_id: Option<Uuid>) -> Result<Vec<Shipment>>;
    async fn update_shipment(&self, shipment: &Shipment) -> Result<()>;
}

/// Everything the services need from one backend.
pub trait Store: ProductRepository + UserRepository + OrderRepository {}
impl<T: ProductRepository + UserRepository + OrderRepository> Store for T {}

/// Postgres when a URL is given, otherwise a fresh in-memory store.
pub async fn open(database_url: Option<&str>) -> Result<Arc<dyn Store>> {
    let store: Arc<dyn Store> = match database_url {
        Some(url) => {
            let store = PgStore::connect(url).await?;
            tracing::info!("connected to postgres, migrations applied");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, keeping data in memory");
            Arc::new(MemoryStore::new())
        }
    };
    Ok(store)
}
