//! Order Aggregate
//!
//! An order is the pre-acceptance phase of a purchase. Accepting it consumes the
//! order and yields a [`Shipment`]; from then on the shipment carries the state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::aggregates::shipment::{Shipment, ShipmentStatus};
use crate::domain::aggregates::user::User;
use crate::domain::value_objects::{Money, OrderNumber};
use crate::EcommerceError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: Uuid,
    pub quantity: u32,
    pub price: Money,
    pub name: String,
    pub image: String,
    pub variant: Option<String>,
}

impl LineItem {
    pub fn line_total(&self) -> Money { self.price.multiply(self.quantity) }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub full_name: String,
    pub email: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub phone: String,
}

impl ShippingAddress {
    /// Names of required fields that are blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("full_name", &self.full_name), ("email", &self.email), ("address", &self.address),
            ("city", &self.city), ("postal_code", &self.postal_code), ("phone", &self.phone),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    pub fn is_complete(&self) -> bool { self.missing_fields().is_empty() }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod { CashOnDelivery, Card, BankTransfer }

impl PaymentMethod {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "cash_on_delivery" => Some(Self::CashOnDelivery),
            "card" => Some(Self::Card),
            "bank_transfer" => Some(Self::BankTransfer),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self { Self::CashOnDelivery => "cash_on_delivery", Self::Card => "card", Self::BankTransfer => "bank_transfer" }
    }

    /// Card checkout is switched off until a gateway is wired in.
    pub fn is_enabled(&self) -> bool { !matches!(self, Self::Card) }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus { #[default] Pending, Completed, Failed }

impl PaymentStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() { "pending" => Some(Self::Pending), "completed" => Some(Self::Completed), "failed" => Some(Self::Failed), _ => None }
    }

    pub fn as_str(&self) -> &'static str {
        match self { Self::Pending => "pending", Self::Completed => "completed", Self::Failed => "failed" }
    }
}

/// Status of an order that has not been accepted yet.
///
/// Pipeline: `pending -> approved -> accepted (moved to a shipment)`; `declined` and
/// `denied` reject the order for good.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus { #[default] Pending, Approved, Declined, Denied }

impl OrderStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "pending" => Some(Self::Pending), "approved" => Some(Self::Approved),
            "declined" => Some(Self::Declined), "denied" => Some(Self::Denied),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self { Self::Pending => "pending", Self::Approved => "approved", Self::Declined => "declined", Self::Denied => "denied" }
    }

    pub fn is_terminal(&self) -> bool { matches!(self, Self::Declined | Self::Denied) }
}

/// A status an admin may ask for, before it is known which record it lands on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusRequest { Pending, Accepted, Declined, Approved, Denied, Shipped, Delivered }

/// Where a [`StatusRequest`] takes effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusTarget { Order(OrderStatus), Accept, Shipment(ShipmentStatus) }

impl StatusRequest {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "pending" => Some(Self::Pending), "accepted" => Some(Self::Accepted), "declined" => Some(Self::Declined),
            "approved" => Some(Self::Approved), "denied" => Some(Self::Denied), "shipped" => Some(Self::Shipped),
            "delivered" => Some(Self::Delivered),
            _ => None,
        }
    }

    pub fn target(&self) -> StatusTarget {
        match self {
            Self::Pending => StatusTarget::Order(OrderStatus::Pending),
            Self::Approved => StatusTarget::Order(OrderStatus::Approved),
            Self::Declined => StatusTarget::Order(OrderStatus::Declined),
            Self::Denied => StatusTarget::Order(OrderStatus::Denied),
            Self::Accepted => StatusTarget::Accept,
            Self::Shipped => StatusTarget::Shipment(ShipmentStatus::Shipped),
            Self::Delivered => StatusTarget::Shipment(ShipmentStatus::Delivered),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub order_number: OrderNumber,
    pub user_id: Uuid,
    pub items: Vec<LineItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub bank_transfer_proof: Option<String>,
    pub status: OrderStatus,
    pub total_price: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Builds a pending order. The total is the sum of the snapshotted line totals.
    pub fn place(
        order_number: OrderNumber,
        user_id: Uuid,
        items: Vec<LineItem>,
        shipping_address: ShippingAddress,
        payment_method: PaymentMethod,
        bank_transfer_proof: Option<String>,
    ) -> Result<Self, OrderError> {
        let first = items.first().ok_or(OrderError::NoItems)?;
        let total_price = items.iter().try_fold(Money::zero(first.price.currency()), |acc, i| acc.add(&i.line_total()))
            .map_err(|_| OrderError::CurrencyMismatch)?;
        let bank_transfer_proof = bank_transfer_proof
            .filter(|proof| payment_method == PaymentMethod::BankTransfer && !proof.trim().is_empty());
        let now = Utc::now();
        Ok(Self {
            id: Uuid::now_v7(), order_number, user_id, items, shipping_address, payment_method,
            payment_status: PaymentStatus::Pending, bank_transfer_proof, status: OrderStatus::Pending,
            total_price, created_at: now, updated_at: now,
        })
    }

    pub fn set_status(&mut self, status: OrderStatus) -> Result<(), OrderError> {
        if self.status == status { return Err(OrderError::NoChange(status.as_str().to_string())); }
        if self.status.is_terminal() {
            return Err(OrderError::InvalidTransition { from: self.status.as_str().to_string(), to: status.as_str().to_string() });
        }
        self.status = status;
        self.touch();
        Ok(())
    }

    pub fn set_payment_status(&mut self, status: PaymentStatus) {
        self.payment_status = status;
        self.touch();
    }

    /// Consumes the order into a shipment in the `accepted` state.
    pub fn accept(self, buyer: Option<&User>) -> Result<Shipment, OrderError> {
        if self.status.is_terminal() {
            return Err(OrderError::InvalidTransition { from: self.status.as_str().to_string(), to: "accepted".to_string() });
        }
        let buyer = buyer.filter(|u| u.id == self.user_id).ok_or(OrderError::Incomplete)?;
        if self.items.is_empty() || !self.shipping_address.is_complete() { return Err(OrderError::Incomplete); }
        Ok(Shipment::from_order(self, buyer))
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderError { NoItems, CurrencyMismatch, NoChange(String), InvalidTransition { from: String, to: String }, Incomplete }
impl std::error::Error for OrderError {}
impl std::fmt::Display for OrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoItems => write!(f, "No items"),
            Self::CurrencyMismatch => write!(f, "Order lines are priced in different currencies"),
            Self::NoChange(status) => write!(f, "Already {status}"),
            Self::InvalidTransition { from, to } => write!(f, "Cannot move from {from} to {to}"),
            Self::Incomplete => write!(f, "Incomplete order data"),
        }
    }
}

impl From<OrderError> for EcommerceError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::NoItems => EcommerceError::EmptyOrder,
            OrderError::CurrencyMismatch => EcommerceError::Validation(e.to_string()),
            OrderError::NoChange(status) => EcommerceError::NoStatusChange(status),
            OrderError::InvalidTransition { from, to } => EcommerceError::InvalidTransition { from, to },
            OrderError::Incomplete => EcommerceError::IncompleteOrderData,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    pub(crate) fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Kamal Perera".into(), email: "kamal@example.com".into(), address: "12 Galle Rd".into(),
            city: "Colombo".into(), postal_code: "00300".into(), phone: "0771234567".into(),
        }
    }

    pub(crate) fn line(name: &str, quantity: u32, price: Decimal) -> LineItem {
        LineItem {
            product_id: Uuid::new_v4(), quantity, price: Money::new(price, "LKR"), name: name.into(),
            image: format!("https://img.example/{name}.jpg"), variant: None,
        }
    }

    fn number() -> OrderNumber { OrderNumber::from_suffix(4321).unwrap() }

    #[test]
    fn test_total_is_sum_of_lines() {
        let order = Order::place(number(), Uuid::new_v4(), vec![line("A", 3, dec!(100)), line("B", 1, dec!(250))], address(), PaymentMethod::CashOnDelivery, None).unwrap();
        assert_eq!(order.total_price.amount(), dec!(550));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
    }

    #[test]
    fn test_place_rejects_empty_and_mixed_currency() {
        assert_eq!(Order::place(number(), Uuid::new_v4(), vec![], address(), PaymentMethod::CashOnDelivery, None).unwrap_err(), OrderError::NoItems);
        let mut usd = line("B", 1, dec!(5));
        usd.price = Money::new(dec!(5), "USD");
        let err = Order::place(number(), Uuid::new_v4(), vec![line("A", 1, dec!(1)), usd], address(), PaymentMethod::CashOnDelivery, None).unwrap_err();
        assert_eq!(err, OrderError::CurrencyMismatch);
    }

    #[test]
    fn test_bank_proof_only_for_bank_transfer() {
        let proof = Some("https://img.example/slip.jpg".to_string());
        let cod = Order::place(number(), Uuid::new_v4(), vec![line("A", 1, dec!(1))], address(), PaymentMethod::CashOnDelivery, proof.clone()).unwrap();
        assert_eq!(cod.bank_transfer_proof, None);
        let bank = Order::place(number(), Uuid::new_v4(), vec![line("A", 1, dec!(1))], address(), PaymentMethod::BankTransfer, proof.clone()).unwrap();
        assert_eq!(bank.bank_transfer_proof, proof);
        let blank = Order::place(number(), Uuid::new_v4(), vec![line("A", 1, dec!(1))], address(), PaymentMethod::BankTransfer, Some("  ".into())).unwrap();
        assert_eq!(blank.bank_transfer_proof, None);
    }

    #[test]
    fn test_status_rules() {
        let mut order = Order::place(number(), Uuid::new_v4(), vec![line("A", 1, dec!(1))], address(), PaymentMethod::CashOnDelivery, None).unwrap();
        assert_eq!(order.set_status(OrderStatus::Pending), Err(OrderError::NoChange("pending".into())));
        order.set_status(OrderStatus::Approved).unwrap();
        order.set_status(OrderStatus::Denied).unwrap();
        assert!(matches!(order.set_status(OrderStatus::Pending), Err(OrderError::InvalidTransition { .. })));
    }

    #[test]
    fn test_missing_address_fields() {
        let mut a = address();
        a.city = " ".into();
        a.phone.clear();
        assert_eq!(a.missing_fields(), vec!["city", "phone"]);
    }

    #[test]
    fn test_status_request_targets() {
        assert_eq!(StatusRequest::parse("accepted").map(|s| s.target()), Some(StatusTarget::Accept));
        assert_eq!(StatusRequest::parse("shipped").map(|s| s.target()), Some(StatusTarget::Shipment(ShipmentStatus::Shipped)));
        assert_eq!(StatusRequest::parse("approved").map(|s| s.target()), Some(StatusTarget::Order(OrderStatus::Approved)));
        assert_eq!(StatusRequest::parse("cancelled"), None);
    }
}
