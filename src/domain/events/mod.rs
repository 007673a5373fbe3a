//! Domain events
use crate::domain::value_objects::{Money, OrderNumber};
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Clone, Debug)]
pub enum DomainEvent {
    Product(ProductEvent),
    Order(OrderEvent),
}

#[derive(Clone, Debug)]
pub enum ProductEvent {
    StockLow { product_id: Uuid, name: String, remaining: u32 },
    /// Image URLs no longer referenced by any product; the host copy can go.
    ImagesDiscarded { product_id: Uuid, urls: Vec<String> },
}

#[derive(Clone, Debug)]
pub enum OrderEvent {
    Placed { order_id: Uuid, order_number: OrderNumber, buyer_email: String, total: Money, placed_at: DateTime<Utc> },
    StatusChanged { order_id: Uuid, from: String, to: String },
    Accepted { order_id: Uuid, shipment_id: Uuid, order_number: OrderNumber },
    ShipmentAdvanced { shipment_id: Uuid, order_number: OrderNumber, status: String },
    Deleted { order_id: Uuid },
}
