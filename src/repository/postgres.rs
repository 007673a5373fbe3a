//! PostgreSQL store
//!
//! Documents that are always read whole (line items, addresses, details, reviews,
//! carts) live in JSONB columns; everything that is filtered on is a plain column.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Map, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;
use crate::domain::aggregates::{
    Cart, Category, LineItem, Order, OrderStatus, PaymentMethod, PaymentStatus, Product, Review, Shipment,
    ShipmentStatus, ShippingAddress, User,
};
use crate::domain::value_objects::{Money, OrderNumber, ProductCode, Quantity, LOW_STOCK_THRESHOLD};
use crate::repository::{plan_deduction, OnHand, OrderRepository, ProductFilter, ProductRepository, StockLevel, StockRequest, UserRepository};
use crate::{EcommerceError, Result};

#[derive(Clone)]
pub struct PgStore { pool: PgPool }

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(10).connect(database_url).await?;
        sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| EcommerceError::StorageError(e.to_string()))?;
        Ok(Self { pool })
    }
}

fn corrupt(what: &str, value: impl std::fmt::Display) -> EcommerceError {
    EcommerceError::StorageError(format!("unreadable {what} in database: {value}"))
}

fn to_i32(value: u32) -> Result<i32> {
    i32::try_from(value).map_err(|_| EcommerceError::Validation(format!("quantity {value} is too large")))
}

fn unique_violation(e: sqlx::Error, conflict: EcommerceError) -> EcommerceError {
    match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => conflict,
        other => other.into(),
    }
}

// =============================================================================
// Rows
// =============================================================================

const PRODUCT_COLUMNS: &str = "id, code, name, category, price, discount_price, currency, description, long_description, \
    warranty_period, pay_later, images, stock, details, reviews, rating, review_count, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid, code: String, name: String, category: String, price: Decimal, discount_price: Option<Decimal>,
    currency: String, description: String, long_description: Option<String>, warranty_period: String,
    pay_later: bool, images: Vec<String>, stock: i32, details: Json<Map<String, Value>>, reviews: Json<Vec<Review>>,
    rating: f64, review_count: i32, created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = EcommerceError;
    fn try_from(r: ProductRow) -> Result<Self> {
        Ok(Product {
            id: r.id,
            code: ProductCode::parse(&r.code).map_err(|e| corrupt("product code", e))?,
            category: Category::parse(&r.category).ok_or_else(|| corrupt("category", &r.category))?,
            price: Money::new(r.price, &r.currency),
            discount_price: r.discount_price.map(|d| Money::new(d, &r.currency)),
            stock: Quantity::new(u32::try_from(r.stock).map_err(|_| corrupt("stock", r.stock))?),
            review_count: u32::try_from(r.review_count).unwrap_or_default(),
            name: r.name, description: r.description, long_description: r.long_description,
            warranty_period: r.warranty_period, pay_later: r.pay_later, images: r.images, details: r.details.0,
            reviews: r.reviews.0, rating: r.rating, created_at: r.created_at, updated_at: r.updated_at,
        })
    }
}

const USER_COLUMNS: &str = "id, name, email, password_hash, is_admin, cart, created_at";

#[derive(sqlx::FromRow)]
struct UserRow { id: Uuid, name: String, email: String, password_hash: String, is_admin: bool, cart: Json<Cart>, created_at: DateTime<Utc> }

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        User { id: r.id, name: r.name, email: r.email, password_hash: r.password_hash, is_admin: r.is_admin, cart: r.cart.0, created_at: r.created_at }
    }
}

const ORDER_COLUMNS: &str = "id, order_number, user_id, items, shipping_address, payment_method, payment_status, \
    bank_transfer_proof, status, total_amount, currency, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid, order_number: String, user_id: Uuid, items: Json<Vec<LineItem>>, shipping_address: Json<ShippingAddress>,
    payment_method: String, payment_status: String, bank_transfer_proof: Option<String>, status: String,
    total_amount: Decimal, currency: String, created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = EcommerceError;
    fn try_from(r: OrderRow) -> Result<Self> {
        Ok(Order {
            id: r.id,
            order_number: OrderNumber::parse(r.order_number).map_err(|e| corrupt("order number", e))?,
            user_id: r.user_id,
            items: r.items.0,
            shipping_address: r.shipping_address.0,
            payment_method: PaymentMethod::parse(&r.payment_method).ok_or_else(|| corrupt("payment method", &r.payment_method))?,
            payment_status: PaymentStatus::parse(&r.payment_status).ok_or_else(|| corrupt("payment status", &r.payment_status))?,
            bank_transfer_proof: r.bank_transfer_proof,
            status: OrderStatus::parse(&r.status).ok_or_else(|| corrupt("order status", &r.status))?,
            total_price: Money::new(r.total_amount, &r.currency),
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

const SHIPMENT_COLUMNS: &str = "id, order_id, user_id, order_number, customer_name, email, mobile_number, address, city, \
    postal_code, payment_method, payment_status, total_amount, currency, items, status, shipped_at, delivered_at, \
    created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ShipmentRow {
    id: Uuid, order_id: Option<Uuid>, user_id: Uuid, order_number: String, customer_name: String, email: String,
    mobile_number: String, address: String, city: String, postal_code: String, payment_method: String,
    payment_status: String, total_amount: Decimal, currency: String, items: Json<Vec<LineItem>>, status: String,
    shipped_at: Option<DateTime<Utc>>, delivered_at: Option<DateTime<Utc>>, created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
}

impl TryFrom<ShipmentRow> for Shipment {
    type Error = EcommerceError;
    fn try_from(r: ShipmentRow) -> Result<Self> {
        Ok(Shipment {
            id: r.id,
            order_id: r.order_id,
            user_id: r.user_id,
            order_number: OrderNumber::parse(r.order_number).map_err(|e| corrupt("order number", e))?,
            payment_method: PaymentMethod::parse(&r.payment_method).ok_or_else(|| corrupt("payment method", &r.payment_method))?,
            payment_status: PaymentStatus::parse(&r.payment_status).ok_or_else(|| corrupt("payment status", &r.payment_status))?,
            status: ShipmentStatus::parse(&r.status).ok_or_else(|| corrupt("shipment status", &r.status))?,
            total_price: Money::new(r.total_amount, &r.currency),
            customer_name: r.customer_name, email: r.email, mobile_number: r.mobile_number, address: r.address,
            city: r.city, postal_code: r.postal_code, items: r.items.0, shipped_at: r.shipped_at,
            delivered_at: r.delivered_at, created_at: r.created_at, updated_at: r.updated_at,
        })
    }
}

// =============================================================================
// Products
// =============================================================================

async fn write_reviews(executor: &mut sqlx::PgConnection, product: &Product) -> Result<u64> {
    let done = sqlx::query("UPDATE products SET reviews = $2, rating = $3, review_count = $4, updated_at = $5 WHERE id = $1")
        .bind(product.id).bind(Json(&product.reviews)).bind(product.rating).bind(to_i32(product.review_count)?)
        .bind(product.updated_at)
        .execute(executor).await?;
    Ok(done.rows_affected())
}

#[async_trait]
impl ProductRepository for PgStore {
    async fn insert_product(&self, p: &Product) -> Result<()> {
        sqlx::query(&format!("INSERT INTO products ({PRODUCT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)"))
            .bind(p.id).bind(p.code.as_str()).bind(&p.name).bind(p.category.as_str()).bind(p.price.amount())
            .bind(p.discount_price.as_ref().map(Money::amount)).bind(p.price.currency()).bind(&p.description)
            .bind(&p.long_description).bind(&p.warranty_period).bind(p.pay_later).bind(&p.images)
            .bind(to_i32(p.stock.value())?).bind(Json(&p.details)).bind(Json(&p.reviews)).bind(p.rating)
            .bind(to_i32(p.review_count)?).bind(p.created_at).bind(p.updated_at)
            .execute(&self.pool).await
            .map_err(|e| unique_violation(e, EcommerceError::StorageError(format!("duplicate product code {}", p.code))))?;
        Ok(())
    }

    async fn update_product(&self, p: &Product) -> Result<()> {
        let done = sqlx::query(
            "UPDATE products SET name = $2, category = $3, price = $4, discount_price = $5, currency = $6, description = $7, \
             long_description = $8, warranty_period = $9, pay_later = $10, images = $11, stock = $12, details = $13, \
             updated_at = $14 WHERE id = $1")
            .bind(p.id).bind(&p.name).bind(p.category.as_str()).bind(p.price.amount())
            .bind(p.discount_price.as_ref().map(Money::amount)).bind(p.price.currency()).bind(&p.description)
            .bind(&p.long_description).bind(&p.warranty_period).bind(p.pay_later).bind(&p.images)
            .bind(to_i32(p.stock.value())?).bind(Json(&p.details)).bind(p.updated_at)
            .execute(&self.pool).await?;
        if done.rows_affected() == 0 { return Err(EcommerceError::NotFound("Product")); }
        Ok(())
    }

    async fn find_product(&self, id: Uuid) -> Result<Option<Product>> {
        sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id).fetch_optional(&self.pool).await?
            .map(Product::try_from).transpose()
    }

    async fn save_reviews(&self, p: &Product) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        if write_reviews(&mut conn, p).await? == 0 { return Err(EcommerceError::NotFound("Product")); }
        Ok(())
    }

    async fn delete_product(&self, id: Uuid) -> Result<Option<Product>> {
        sqlx::query_as::<_, ProductRow>(&format!("DELETE FROM products WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"))
            .bind(id).fetch_optional(&self.pool).await?
            .map(Product::try_from).transpose()
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        let base = format!("SELECT {PRODUCT_COLUMNS} FROM products");
        let order = "ORDER BY created_at DESC, id DESC";
        let threshold = i32::try_from(LOW_STOCK_THRESHOLD).unwrap_or(i32::MAX);
        let rows = match filter {
            ProductFilter::All => sqlx::query_as::<_, ProductRow>(&format!("{base} {order}")).fetch_all(&self.pool).await?,
            ProductFilter::Category(c) => sqlx::query_as::<_, ProductRow>(&format!("{base} WHERE category = $1 {order}"))
                .bind(c.as_str()).fetch_all(&self.pool).await?,
            ProductFilter::NameContains(q) => {
                let pattern = format!("%{}%", q.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_"));
                sqlx::query_as::<_, ProductRow>(&format!("{base} WHERE name ILIKE $1 {order}"))
                    .bind(pattern).fetch_all(&self.pool).await?
            }
            ProductFilter::LowStock => sqlx::query_as::<_, ProductRow>(&format!("{base} WHERE stock > 0 AND stock < $1 {order}"))
                .bind(threshold).fetch_all(&self.pool).await?,
            ProductFilter::OutOfStock => sqlx::query_as::<_, ProductRow>(&format!("{base} WHERE stock = 0 {order}"))
                .fetch_all(&self.pool).await?,
        };
        rows.into_iter().map(Product::try_from).collect()
    }

    async fn deduct_stock(&self, lines: &[StockRequest]) -> Result<Vec<StockLevel>> {
        let mut ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
        ids.sort_unstable();
        ids.dedup();
        let mut tx = self.pool.begin().await?;
        // Rows are locked in id order so concurrent checkouts cannot deadlock.
        let rows: Vec<(Uuid, i32, String)> = sqlx::query_as("SELECT id, stock, name FROM products WHERE id = ANY($1) ORDER BY id FOR UPDATE")
            .bind(&ids).fetch_all(&mut *tx).await?;
        let mut on_hand = OnHand::new();
        for (id, stock, name) in rows {
            on_hand.insert(id, (Quantity::new(u32::try_from(stock).map_err(|_| corrupt("stock", stock))?), name));
        }
        let levels = match plan_deduction(&on_hand, lines) {
            Ok(levels) => levels,
            Err(e) => {
                tx.rollback().await?;
                return Err(e);
            }
        };
        for level in &levels {
            sqlx::query("UPDATE products SET stock = $2, updated_at = NOW() WHERE id = $1")
                .bind(level.product_id).bind(to_i32(level.remaining.value())?)
                .execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(levels)
    }

    async fn restore_stock(&self, lines: &[StockRequest]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for line in lines {
            sqlx::query("UPDATE products SET stock = stock + $2, updated_at = NOW() WHERE id = $1")
                .bind(line.product_id).bind(to_i32(line.quantity)?)
                .execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn strip_reviews_by(&self, user_id: Uuid) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let rows = sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE reviews @> $1 FOR UPDATE"))
            .bind(Json(json!([{ "user_id": user_id }])))
            .fetch_all(&mut *tx).await?;
        let mut touched = 0;
        for row in rows {
            let mut product = Product::try_from(row)?;
            if product.strip_reviews_by(user_id) {
                write_reviews(&mut tx, &product).await?;
                touched += 1;
            }
        }
        tx.commit().await?;
        Ok(touched)
    }
}

// =============================================================================
// Users
// =============================================================================

#[async_trait]
impl UserRepository for PgStore {
    async fn insert_user(&self, u: &User) -> Result<()> {
        sqlx::query(&format!("INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)"))
            .bind(u.id).bind(&u.name).bind(&u.email).bind(&u.password_hash).bind(u.is_admin).bind(Json(&u.cart)).bind(u.created_at)
            .execute(&self.pool).await
            .map_err(|e| unique_violation(e, EcommerceError::Validation("User already exists".into())))?;
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(User::from))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email).fetch_optional(&self.pool).await?;
        Ok(row.map(User::from))
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"))
            .fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool> {
        let done = sqlx::query("DELETE FROM users WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(done.rows_affected() > 0)
    }

    async fn save_cart(&self, user_id: Uuid, cart: &Cart) -> Result<()> {
        let done = sqlx::query("UPDATE users SET cart = $2 WHERE id = $1")
            .bind(user_id).bind(Json(cart)).execute(&self.pool).await?;
        if done.rows_affected() == 0 { return Err(EcommerceError::NotFound("User")); }
        Ok(())
    }

    async fn has_admin(&self) -> Result<bool> {
        let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM users WHERE is_admin)")
            .fetch_one(&self.pool).await?;
        Ok(exists)
    }
}

// =============================================================================
// Orders and shipments
// =============================================================================

async fn insert_shipment(executor: &mut sqlx::PgConnection, s: &Shipment) -> Result<()> {
    sqlx::query(&format!("INSERT INTO shipments ({SHIPMENT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)"))
        .bind(s.id).bind(s.order_id).bind(s.user_id).bind(s.order_number.as_str()).bind(&s.customer_name).bind(&s.email)
        .bind(&s.mobile_number).bind(&s.address).bind(&s.city).bind(&s.postal_code).bind(s.payment_method.as_str())
        .bind(s.payment_status.as_str()).bind(s.total_price.amount()).bind(s.total_price.currency()).bind(Json(&s.items))
        .bind(s.status.as_str()).bind(s.shipped_at).bind(s.delivered_at).bind(s.created_at).bind(s.updated_at)
        .execute(executor).await
        .map_err(|e| unique_violation(e, EcommerceError::AlreadyShipped))?;
    Ok(())
}

#[async_trait]
impl OrderRepository for PgStore {
    async fn insert_order(&self, o: &Order) -> Result<()> {
        sqlx::query(&format!("INSERT INTO orders ({ORDER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"))
            .bind(o.id).bind(o.order_number.as_str()).bind(o.user_id).bind(Json(&o.items)).bind(Json(&o.shipping_address))
            .bind(o.payment_method.as_str()).bind(o.payment_status.as_str()).bind(&o.bank_transfer_proof)
            .bind(o.status.as_str()).bind(o.total_price.amount()).bind(o.total_price.currency())
            .bind(o.created_at).bind(o.updated_at)
            .execute(&self.pool).await
            .map_err(|e| unique_violation(e, EcommerceError::StorageError(format!("duplicate order number {}", o.order_number))))?;
        Ok(())
    }

    async fn find_order(&self, id: Uuid) -> Result<Option<Order>> {
        sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id).fetch_optional(&self.pool).await?
            .map(Order::try_from).transpose()
    }

    async fn list_orders(&self, user_id: Option<Uuid>) -> Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE ($1::uuid IS NULL OR user_id = $1) ORDER BY created_at DESC, id DESC"))
            .bind(user_id).fetch_all(&self.pool).await?;
        rows.into_iter().map(Order::try_from).collect()
    }

    async fn update_order(&self, o: &Order) -> Result<()> {
        let done = sqlx::query("UPDATE orders SET status = $2, payment_status = $3, updated_at = $4 WHERE id = $1")
            .bind(o.id).bind(o.status.as_str()).bind(o.payment_status.as_str()).bind(o.updated_at)
            .execute(&self.pool).await?;
        if done.rows_affected() == 0 { return Err(EcommerceError::NotFound("Order")); }
        Ok(())
    }

    async fn delete_order(&self, id: Uuid) -> Result<Option<Order>> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, OrderRow>(&format!("DELETE FROM orders WHERE id = $1 RETURNING {ORDER_COLUMNS}"))
            .bind(id).fetch_optional(&mut *tx).await?;
        if row.is_some() {
            sqlx::query("DELETE FROM shipments WHERE order_id = $1").bind(id).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        row.map(Order::try_from).transpose()
    }

    async fn order_number_taken(&self, number: &OrderNumber) -> Result<bool> {
        let (taken,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM orders WHERE order_number = $1) OR EXISTS (SELECT 1 FROM shipments WHERE order_number = $1)")
            .bind(number.as_str()).fetch_one(&self.pool).await?;
        Ok(taken)
    }

    async fn accept_order(&self, order_id: Uuid, shipment: &Shipment) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM shipments WHERE order_id = $1")
            .bind(order_id).fetch_optional(&mut *tx).await?;
        if existing.is_some() {
            tx.rollback().await?;
            return Err(EcommerceError::AlreadyShipped);
        }
        let deleted = sqlx::query("DELETE FROM orders WHERE id = $1").bind(order_id).execute(&mut *tx).await?;
        if deleted.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(EcommerceError::NotFound("Order"));
        }
        insert_shipment(&mut tx, shipment).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn find_shipment(&self, id: Uuid) -> Result<Option<Shipment>> {
        sqlx::query_as::<_, ShipmentRow>(&format!("SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE id = $1"))
            .bind(id).fetch_optional(&self.pool).await?
            .map(Shipment::try_from).transpose()
    }

    async fn find_shipment_by_order(&self, order_id: Uuid) -> Result<Option<Shipment>> {
        sqlx::query_as::<_, ShipmentRow>(&format!("SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE order_id = $1"))
            .bind(order_id).fetch_optional(&self.pool).await?
            .map(Shipment::try_from).transpose()
    }

    async fn list_shipments(&self, user_id: Option<Uuid>) -> Result<Vec<Shipment>> {
        let rows = sqlx::query_as::<_, ShipmentRow>(&format!(
            "SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE ($1::uuid IS NULL OR user_id = $1) ORDER BY created_at DESC, id DESC"))
            .bind(user_id).fetch_all(&self.pool).await?;
        rows.into_iter().map(Shipment::try_from).collect()
    }

    async fn update_shipment(&self, s: &Shipment) -> Result<()> {
        let done = sqlx::query("UPDATE shipments SET status = $2, shipped_at = $3, delivered_at = $4, updated_at = $5 WHERE id = $1")
            .bind(s.id).bind(s.status.as_str()).bind(s.shipped_at).bind(s.delivered_at).bind(s.updated_at)
            .execute(&self.pool).await?;
        if done.rows_affected() == 0 { return Err(EcommerceError::NotFound("Shipment")); }
        Ok(())
    }
}
