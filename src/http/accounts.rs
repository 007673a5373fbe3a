use axum::{extract::{Path, State}, http::StatusCode, routing::{delete, get, post}, Json, Router};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;
use crate::domain::aggregates::User;
use crate::http::auth::{AdminPrincipal, Principal};
use crate::http::body::JsonBody;
use crate::http::AppState;
use crate::services::CartView;
use crate::Result;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/users", post(register).get(list_users))
        .route("/api/v1/users/:id", delete(delete_user))
        .route("/api/v1/cart", get(get_cart).post(add_to_cart).put(update_cart).delete(clear_cart))
        .route("/api/v1/cart/:product_id", delete(remove_from_cart))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, max = 128))]
    pub password: String,
}

async fn register(State(s): State<AppState>, JsonBody(r): JsonBody<RegisterRequest>) -> Result<(StatusCode, Json<User>)> {
    r.validate()?;
    let user = s.accounts.register(&r.name, &r.email, &r.password).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn list_users(State(s): State<AppState>, _admin: AdminPrincipal) -> Result<Json<Vec<User>>> {
    Ok(Json(s.accounts.list_users().await?))
}

async fn delete_user(State(s): State<AppState>, _admin: AdminPrincipal, Path(id): Path<Uuid>) -> Result<StatusCode> {
    s.accounts.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, Validate)]
pub struct CartItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 1000))]
    pub quantity: u32,
    pub variant: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CartQuantityRequest {
    pub product_id: Uuid,
    #[validate(range(max = 1000))]
    pub quantity: u32,
    pub variant: Option<String>,
}

async fn get_cart(State(s): State<AppState>, caller: Principal) -> Result<Json<CartView>> {
    Ok(Json(s.accounts.get_cart(caller.user_id).await?))
}

async fn add_to_cart(State(s): State<AppState>, caller: Principal, JsonBody(r): JsonBody<CartItemRequest>) -> Result<Json<CartView>> {
    r.validate()?;
    Ok(Json(s.accounts.add_to_cart(caller.user_id, r.product_id, r.quantity, r.variant).await?))
}

async fn update_cart(State(s): State<AppState>, caller: Principal, JsonBody(r): JsonBody<CartQuantityRequest>) -> Result<Json<CartView>> {
    r.validate()?;
    Ok(Json(s.accounts.update_cart_item(caller.user_id, r.product_id, r.variant, r.quantity).await?))
}

async fn remove_from_cart(State(s): State<AppState>, caller: Principal, Path(product_id): Path<Uuid>) -> Result<Json<CartView>> {
    Ok(Json(s.accounts.remove_cart_item(caller.user_id, product_id).await?))
}

async fn clear_cart(State(s): State<AppState>, caller: Principal) -> Result<StatusCode> {
    s.accounts.clear_cart(caller.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
