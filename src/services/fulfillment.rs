//! Order fulfillment: status changes, acceptance into shipments, payment
//! updates and deletion.

use std::sync::Arc;
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use crate::domain::aggregates::{Order, OrderStatus, PaymentStatus, Shipment, ShipmentStatus, StatusRequest, StatusTarget};
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::notify::Dispatcher;
use crate::repository::Store;
use crate::{EcommerceError, Result};

/// The record a status change ended up on.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusOutcome {
    Order(Order),
    Shipment(Shipment),
}

#[derive(Clone)]
pub struct FulfillmentService {
    store: Arc<dyn Store>,
    dispatcher: Dispatcher,
}

impl FulfillmentService {
    pub fn new(store: Arc<dyn Store>, dispatcher: Dispatcher) -> Self { Self { store, dispatcher } }

    /// Applies a wire status to the order `id`. Order-phase statuses edit the order,
    /// `accepted` moves it into a shipment, `shipped`/`delivered` advance that shipment.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn update_status(&self, id: Uuid, status: &str) -> Result<StatusOutcome> {
        let request = StatusRequest::parse(status).ok_or_else(|| EcommerceError::InvalidStatus(status.to_string()))?;
        match request.target() {
            StatusTarget::Order(next) => self.set_order_status(id, next).await.map(StatusOutcome::Order),
            StatusTarget::Accept => self.accept(id).await.map(StatusOutcome::Shipment),
            StatusTarget::Shipment(next) => self.advance_for_order(id, next).await.map(StatusOutcome::Shipment),
        }
    }

    async fn set_order_status(&self, id: Uuid, next: OrderStatus) -> Result<Order> {
        let mut order = self.get_order(id).await?;
        let from = order.status;
        order.set_status(next)?;
        self.store.update_order(&order).await?;
        info!(from = from.as_str(), to = next.as_str(), "order status changed");
        self.dispatcher.publish(DomainEvent::Order(OrderEvent::StatusChanged {
            order_id: id, from: from.as_str().to_string(), to: next.as_str().to_string(),
        }));
        Ok(order)
    }

    async fn accept(&self, id: Uuid) -> Result<Shipment> {
        let order = self.get_order(id).await?;
        if self.store.find_shipment_by_order(id).await?.is_some() { return Err(EcommerceError::AlreadyShipped); }
        let buyer = self.store.find_user(order.user_id).await?;
        if buyer.is_none() { warn!(user_id = %order.user_id, "buyer account no longer exists"); }
        let shipment = order.accept(buyer.as_ref())?;
        self.store.accept_order(id, &shipment).await?;
        info!(shipment_id = %shipment.id, order_number = %shipment.order_number, "order accepted for shipment");
        self.dispatcher.publish(DomainEvent::Order(OrderEvent::Accepted {
            order_id: id, shipment_id: shipment.id, order_number: shipment.order_number.clone(),
        }));
        Ok(shipment)
    }

    /// `id` may name the source order or the shipment itself.
    async fn advance_for_order(&self, id: Uuid, next: ShipmentStatus) -> Result<Shipment> {
        let shipment = match self.store.find_shipment_by_order(id).await? {
            Some(shipment) => shipment,
            None => match self.store.find_shipment(id).await? {
                Some(shipment) => shipment,
                None => {
                    let order = self.get_order(id).await?;
                    return Err(EcommerceError::InvalidTransition {
                        from: order.status.as_str().to_string(), to: next.as_str().to_string(),
                    });
                }
            },
        };
        self.advance(shipment, next).await
    }

    /// Admin update addressed by shipment id; only `shipped`, `delivered` and
    /// `cancelled` are accepted.
    #[instrument(skip(self), fields(shipment_id = %id))]
    pub async fn update_shipment_status(&self, id: Uuid, status: &str) -> Result<Shipment> {
        let next = ShipmentStatus::parse(status)
            .filter(|s| *s != ShipmentStatus::Accepted)
            .ok_or_else(|| EcommerceError::InvalidStatus(status.to_string()))?;
        let shipment = self.get_shipment(id).await?;
        self.advance(shipment, next).await
    }

    async fn advance(&self, mut shipment: Shipment, next: ShipmentStatus) -> Result<Shipment> {
        shipment.advance(next)?;
        self.store.update_shipment(&shipment).await?;
        info!(shipment_id = %shipment.id, status = next.as_str(), "shipment advanced");
        self.dispatcher.publish(DomainEvent::Order(OrderEvent::ShipmentAdvanced {
            shipment_id: shipment.id, order_number: shipment.order_number.clone(), status: next.as_str().to_string(),
        }));
        Ok(shipment)
    }

    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn update_payment_status(&self, id: Uuid, status: &str) -> Result<Order> {
        let status = PaymentStatus::parse(status).ok_or_else(|| EcommerceError::InvalidStatus(status.to_string()))?;
        let mut order = self.get_order(id).await?;
        order.set_payment_status(status);
        self.store.update_order(&order).await?;
        Ok(order)
    }

    /// Deletes the order together with any shipment created from it.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn delete_order(&self, id: Uuid) -> Result<()> {
        self.store.delete_order(id).await?.ok_or(EcommerceError::NotFound("Order"))?;
        info!("order deleted");
        self.dispatcher.publish(DomainEvent::Order(OrderEvent::Deleted { order_id: id }));
        Ok(())
    }

    pub async fn get_order(&self, id: Uuid) -> Result<Order> {
        self.store.find_order(id).await?.ok_or(EcommerceError::NotFound("Order"))
    }

    pub async fn list_orders(&self) -> Result<Vec<Order>> { self.store.list_orders(None).await }

    pub async fn orders_for(&self, user_id: Uuid) -> Result<Vec<Order>> { self.store.list_orders(Some(user_id)).await }

    pub async fn get_shipment(&self, id: Uuid) -> Result<Shipment> {
        self.store.find_shipment(id).await?.ok_or(EcommerceError::NotFound("Shipment"))
    }

    pub async fn list_shipments(&self) -> Result<Vec<Shipment>> { self.store.list_shipments(None).await }

    pub async fn shipments_for(&self, user_id: Uuid) -> Result<Vec<Shipment>> { self.store.list_shipments(Some(user_id)).await }
}
