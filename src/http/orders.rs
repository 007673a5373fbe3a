use axum::{extract::{Path, State}, http::StatusCode, routing::{get, patch}, Json, Router};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;
use crate::domain::aggregates::{Order, Shipment, ShippingAddress};
use crate::http::auth::{AdminPrincipal, Principal};
use crate::http::body::JsonBody;
use crate::http::AppState;
use crate::services::{OrderLineRequest, PlaceOrder, StatusOutcome};
use crate::{EcommerceError, Result};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/orders", get(list_orders).post(create_order))
        .route("/api/v1/orders/mine", get(my_orders))
        .route("/api/v1/orders/:id", get(get_order).delete(delete_order))
        .route("/api/v1/orders/:id/status", patch(update_status))
        .route("/api/v1/orders/:id/payment", patch(update_payment))
        .route("/api/v1/shipments", get(list_shipments))
        .route("/api/v1/shipments/mine", get(my_shipments))
        .route("/api/v1/shipments/:id", get(get_shipment))
        .route("/api/v1/shipments/:id/status", patch(update_shipment_status))
}

#[derive(Debug, Deserialize)]
pub struct LineRequest {
    pub product_id: Uuid,
    pub quantity: u32,
    pub variant: Option<String>,
}

/// Missing address fields arrive as blanks so the service can name all of them.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AddressRequest {
    pub full_name: String,
    pub email: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub phone: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    /// Falls back to the caller's cart when absent.
    pub items: Option<Vec<LineRequest>>,
    #[serde(default)]
    pub shipping_address: AddressRequest,
    #[validate(length(min = 1))]
    pub payment_method: String,
    #[validate(length(max = 2048))]
    pub bank_transfer_proof: Option<String>,
}

async fn create_order(State(s): State<AppState>, caller: Principal, JsonBody(r): JsonBody<CreateOrderRequest>) -> Result<(StatusCode, Json<Order>)> {
    r.validate()?;
    let a = r.shipping_address;
    let order = s.checkout.place_order(PlaceOrder {
        user_id: caller.user_id,
        items: r.items.map(|items| items.into_iter()
            .map(|l| OrderLineRequest { product_id: l.product_id, quantity: l.quantity, variant: l.variant })
            .collect()),
        shipping_address: ShippingAddress {
            full_name: a.full_name, email: a.email, address: a.address, city: a.city, postal_code: a.postal_code, phone: a.phone,
        },
        payment_method: r.payment_method,
        bank_transfer_proof: r.bank_transfer_proof,
    }).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn list_orders(State(s): State<AppState>, _admin: AdminPrincipal) -> Result<Json<Vec<Order>>> {
    Ok(Json(s.fulfillment.list_orders().await?))
}

async fn my_orders(State(s): State<AppState>, caller: Principal) -> Result<Json<Vec<Order>>> {
    Ok(Json(s.fulfillment.orders_for(caller.user_id).await?))
}

async fn get_order(State(s): State<AppState>, caller: Principal, Path(id): Path<Uuid>) -> Result<Json<Order>> {
    let order = s.fulfillment.get_order(id).await?;
    if !caller.can_see(order.user_id) { return Err(EcommerceError::Forbidden); }
    Ok(Json(order))
}

async fn delete_order(State(s): State<AppState>, _admin: AdminPrincipal, Path(id): Path<Uuid>) -> Result<StatusCode> {
    s.fulfillment.delete_order(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)] pub struct StatusRequestBody { pub status: String }
#[derive(Debug, Deserialize)] pub struct PaymentRequestBody { pub payment_status: String }

async fn update_status(State(s): State<AppState>, _admin: AdminPrincipal, Path(id): Path<Uuid>, JsonBody(r): JsonBody<StatusRequestBody>) -> Result<Json<StatusOutcome>> {
    Ok(Json(s.fulfillment.update_status(id, &r.status).await?))
}

async fn update_payment(State(s): State<AppState>, _admin: AdminPrincipal, Path(id): Path<Uuid>, JsonBody(r): JsonBody<PaymentRequestBody>) -> Result<Json<Order>> {
    Ok(Json(s.fulfillment.update_payment_status(id, &r.payment_status).await?))
}

async fn list_shipments(State(s): State<AppState>, _admin: AdminPrincipal) -> Result<Json<Vec<Shipment>>> {
    Ok(Json(s.fulfillment.list_shipments().await?))
}

async fn my_shipments(State(s): State<AppState>, caller: Principal) -> Result<Json<Vec<Shipment>>> {
    Ok(Json(s.fulfillment.shipments_for(caller.user_id).await?))
}

async fn get_shipment(State(s): State<AppState>, caller: Principal, Path(id): Path<Uuid>) -> Result<Json<Shipment>> {
    let shipment = s.fulfillment.get_shipment(id).await?;
    if !caller.can_see(shipment.user_id) { return Err(EcommerceError::Forbidden); }
    Ok(Json(shipment))
}

async fn update_shipment_status(State(s): State<AppState>, _admin: AdminPrincipal, Path(id): Path<Uuid>, JsonBody(r): JsonBody<StatusRequestBody>) -> Result<Json<Shipment>> {
    Ok(Json(s.fulfillment.update_shipment_status(id, &r.status).await?))
}
