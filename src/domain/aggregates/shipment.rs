//! Shipment Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::aggregates::order::{LineItem, Order, OrderError, PaymentMethod, PaymentStatus};
use crate::domain::aggregates::user::User;
use crate::domain::value_objects::{Money, OrderNumber};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus { #[default] Accepted, Shipped, Delivered, Cancelled }

impl ShipmentStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "accepted" => Some(Self::Accepted), "shipped" => Some(Self::Shipped),
            "delivered" => Some(Self::Delivered), "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self { Self::Accepted => "accepted", Self::Shipped => "shipped", Self::Delivered => "delivered", Self::Cancelled => "cancelled" }
    }

    fn can_move_to(&self, next: ShipmentStatus) -> bool {
        matches!(
            (self, next),
            (Self::Accepted, Self::Shipped) | (Self::Shipped, Self::Delivered) | (Self::Accepted | Self::Shipped, Self::Cancelled)
        )
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Shipment {
    pub id: Uuid,
    pub order_id: Option<Uuid>,
    pub user_id: Uuid,
    pub order_number: OrderNumber,
    pub customer_name: String,
    pub email: String,
    pub mobile_number: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub total_price: Money,
    pub items: Vec<LineItem>,
    pub status: ShipmentStatus,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Shipment {
    pub(crate) fn from_order(order: Order, buyer: &User) -> Self {
        let address = order.shipping_address;
        let customer_name = [buyer.name.as_str(), address.full_name.as_str()]
            .into_iter()
            .find(|n| !n.trim().is_empty())
            .unwrap_or("N/A")
            .to_string();
        let email = if buyer.email.trim().is_empty() { address.email } else { buyer.email.clone() };
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(), order_id: Some(order.id), user_id: order.user_id, order_number: order.order_number,
            customer_name, email, mobile_number: address.phone, address: address.address, city: address.city,
            postal_code: address.postal_code, payment_method: order.payment_method, payment_status: order.payment_status,
            total_price: order.total_price, items: order.items, status: ShipmentStatus::Accepted,
            shipped_at: None, delivered_at: None, created_at: now, updated_at: now,
        }
    }

    pub fn advance(&mut self, next: ShipmentStatus) -> Result<(), OrderError> {
        if self.status == next { return Err(OrderError::NoChange(next.as_str().to_string())); }
        if !self.status.can_move_to(next) {
            return Err(OrderError::InvalidTransition { from: self.status.as_str().to_string(), to: next.as_str().to_string() });
        }
        let now = Utc::now();
        match next {
            ShipmentStatus::Shipped => self.shipped_at = Some(now),
            ShipmentStatus::Delivered => self.delivered_at = Some(now),
            ShipmentStatus::Accepted | ShipmentStatus::Cancelled => {}
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::order::tests::{address, line};
    use rust_decimal_macros::dec;

    fn order_for(user: &User) -> Order {
        Order::place(OrderNumber::from_suffix(1111).unwrap(), user.id, vec![line("A", 2, dec!(100))], address(), PaymentMethod::BankTransfer, None).unwrap()
    }

    #[test]
    fn test_accept_copies_order() {
        let user = User::register("Nimal Silva", "nimal@example.com", "secret1").unwrap();
        let order = order_for(&user);
        let order_id = order.id;
        let shipment = order.accept(Some(&user)).unwrap();
        assert_eq!(shipment.order_id, Some(order_id));
        assert_eq!(shipment.order_number.as_str(), "OID-1111");
        assert_eq!(shipment.customer_name, "Nimal Silva");
        assert_eq!(shipment.email, "nimal@example.com");
        assert_eq!(shipment.city, "Colombo");
        assert_eq!(shipment.total_price.amount(), dec!(200));
        assert_eq!(shipment.status, ShipmentStatus::Accepted);
        assert_eq!(shipment.items.len(), 1);
    }

    #[test]
    fn test_customer_name_falls_back_to_address() {
        let mut user = User::register("", "nimal@example.com", "secret1").unwrap();
        user.name.clear();
        let shipment = order_for(&user).accept(Some(&user)).unwrap();
        assert_eq!(shipment.customer_name, "Kamal Perera");
    }

    #[test]
    fn test_accept_requires_buyer_and_items() {
        let user = User::register("Nimal", "nimal@example.com", "secret1").unwrap();
        assert_eq!(order_for(&user).accept(None).unwrap_err(), OrderError::Incomplete);
        let mut order = order_for(&user);
        order.items.clear();
        assert_eq!(order.accept(Some(&user)).unwrap_err(), OrderError::Incomplete);
    }

    #[test]
    fn test_advance() {
        let user = User::register("Nimal", "nimal@example.com", "secret1").unwrap();
        let mut shipment = order_for(&user).accept(Some(&user)).unwrap();
        assert!(matches!(shipment.advance(ShipmentStatus::Delivered), Err(OrderError::InvalidTransition { .. })));
        shipment.advance(ShipmentStatus::Shipped).unwrap();
        assert!(shipment.shipped_at.is_some());
        assert_eq!(shipment.advance(ShipmentStatus::Shipped), Err(OrderError::NoChange("shipped".into())));
        shipment.advance(ShipmentStatus::Delivered).unwrap();
        assert!(shipment.delivered_at.is_some());
        assert!(shipment.advance(ShipmentStatus::Cancelled).is_err());
    }
}
