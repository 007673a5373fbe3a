use axum::{extract::{Path, Query, State}, http::StatusCode, routing::get, Json, Router};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Map, Value};
use uuid::Uuid;
use validator::Validate;
use crate::domain::aggregates::{Category, Product, ProductDraft, Review};
use crate::domain::value_objects::Money;
use crate::http::auth::{AdminPrincipal, Principal};
use crate::http::body::JsonBody;
use crate::http::AppState;
use crate::{EcommerceError, Result};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/products", get(list_products).post(create_product))
        .route("/api/v1/products/search", get(search_products))
        .route("/api/v1/products/category/:category", get(list_by_category))
        .route("/api/v1/products/low-stock", get(low_stock))
        .route("/api/v1/products/out-of-stock", get(out_of_stock))
        .route("/api/v1/products/:id", get(get_product).put(update_product).delete(delete_product))
        .route("/api/v1/products/:id/reviews", get(list_reviews).post(add_review))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProductRequest {
    #[validate(length(max = 200))]
    pub name: String,
    pub category: String,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    #[validate(length(max = 2000))]
    pub description: String,
    pub long_description: Option<String>,
    pub warranty_period: Option<String>,
    #[serde(default)]
    pub pay_later: bool,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub details: Map<String, Value>,
}

impl ProductRequest {
    fn into_draft(self, currency: &str) -> Result<ProductDraft> {
        self.validate()?;
        let category = Category::parse(&self.category)
            .ok_or_else(|| EcommerceError::Validation(format!("Unknown category: {}", self.category)))?;
        Ok(ProductDraft {
            name: self.name,
            category,
            price: Money::new(self.price, currency),
            discount_price: self.discount_price.map(|d| Money::new(d, currency)),
            description: self.description,
            long_description: self.long_description,
            warranty_period: self.warranty_period,
            pay_later: self.pay_later,
            images: self.images,
            stock: self.stock,
            details: self.details,
        })
    }
}

async fn list_products(State(s): State<AppState>) -> Result<Json<Vec<Product>>> {
    Ok(Json(s.catalog.list_products().await?))
}

async fn create_product(State(s): State<AppState>, _admin: AdminPrincipal, JsonBody(r): JsonBody<ProductRequest>) -> Result<(StatusCode, Json<Product>)> {
    let product = s.catalog.create_product(r.into_draft(&s.currency)?).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

#[derive(Debug, Deserialize)] pub struct SearchParams { #[serde(default)] pub q: String }

async fn search_products(State(s): State<AppState>, Query(p): Query<SearchParams>) -> Result<Json<Vec<Product>>> {
    Ok(Json(s.catalog.search(&p.q).await?))
}

async fn list_by_category(State(s): State<AppState>, Path(category): Path<String>) -> Result<Json<Vec<Product>>> {
    Ok(Json(s.catalog.list_by_category(&category).await?))
}

async fn low_stock(State(s): State<AppState>, _admin: AdminPrincipal) -> Result<Json<Vec<Product>>> {
    Ok(Json(s.catalog.low_stock().await?))
}

async fn out_of_stock(State(s): State<AppState>, _admin: AdminPrincipal) -> Result<Json<Vec<Product>>> {
    Ok(Json(s.catalog.out_of_stock().await?))
}

async fn get_product(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Product>> {
    Ok(Json(s.catalog.get_product(id).await?))
}

async fn update_product(State(s): State<AppState>, _admin: AdminPrincipal, Path(id): Path<Uuid>, JsonBody(r): JsonBody<ProductRequest>) -> Result<Json<Product>> {
    Ok(Json(s.catalog.update_product(id, r.into_draft(&s.currency)?).await?))
}

async fn delete_product(State(s): State<AppState>, _admin: AdminPrincipal, Path(id): Path<Uuid>) -> Result<StatusCode> {
    s.catalog.delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReviewRequest {
    #[validate(range(min = 1, max = 5))]
    pub rating: u8,
    #[validate(length(max = 2000))]
    #[serde(default)]
    pub comment: String,
}

async fn list_reviews(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Vec<Review>>> {
    Ok(Json(s.catalog.list_reviews(id).await?))
}

async fn add_review(State(s): State<AppState>, caller: Principal, Path(id): Path<Uuid>, JsonBody(r): JsonBody<ReviewRequest>) -> Result<(StatusCode, Json<Product>)> {
    r.validate()?;
    let product = s.catalog.add_review(id, caller.user_id, r.rating, &r.comment).await?;
    Ok((StatusCode::CREATED, Json(product)))
}
