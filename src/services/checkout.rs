//! Order creation.
//!
//! Placing an order snapshots prices from the catalog, deducts stock for every
//! line in one atomic step, then assigns an order number and persists the order.
//! Anything that fails after the deduction puts the stock back.

use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use crate::domain::aggregates::{LineItem, Order, PaymentMethod, ShippingAddress};
use crate::domain::events::{DomainEvent, OrderEvent, ProductEvent};
use crate::domain::value_objects::OrderNumber;
use crate::notify::Dispatcher;
use crate::repository::{StockRequest, Store};
use crate::services::OrderNumberSource;
use crate::{EcommerceError, Result};

pub const ORDER_NUMBER_ATTEMPTS: usize = 5;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderLineRequest { pub product_id: Uuid, pub quantity: u32, pub variant: Option<String> }

#[derive(Clone, Debug)]
pub struct PlaceOrder {
    pub user_id: Uuid,
    /// Explicit lines; when absent or empty the buyer's cart is used.
    pub items: Option<Vec<OrderLineRequest>>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub bank_transfer_proof: Option<String>,
}

#[derive(Clone)]
pub struct CheckoutService {
    store: Arc<dyn Store>,
    dispatcher: Dispatcher,
    numbers: Arc<dyn OrderNumberSource>,
}

impl CheckoutService {
    pub fn new(store: Arc<dyn Store>, dispatcher: Dispatcher, numbers: Arc<dyn OrderNumberSource>) -> Self {
        Self { store, dispatcher, numbers }
    }

    #[instrument(skip(self, request), fields(user_id = %request.user_id))]
    pub async fn place_order(&self, request: PlaceOrder) -> Result<Order> {
        let missing = request.shipping_address.missing_fields();
        if !missing.is_empty() {
            return Err(EcommerceError::Validation(format!("Missing shipping address fields: {}", missing.join(", "))));
        }
        let payment_method = PaymentMethod::parse(&request.payment_method)
            .ok_or_else(|| EcommerceError::Validation(format!("Invalid payment method: {}", request.payment_method)))?;
        if !payment_method.is_enabled() {
            return Err(EcommerceError::Validation("Card payments are not available".into()));
        }

        let mut buyer = self.store.find_user(request.user_id).await?.ok_or(EcommerceError::NotFound("User"))?;
        let (lines, from_cart) = match request.items {
            Some(items) if !items.is_empty() => (items, false),
            _ => {
                let lines = buyer.cart.items().iter()
                    .map(|i| OrderLineRequest { product_id: i.product_id, quantity: i.quantity, variant: i.variant.clone() })
                    .collect();
                (lines, true)
            }
        };
        if lines.is_empty() { return Err(EcommerceError::EmptyOrder); }
        if lines.iter().any(|l| l.quantity == 0) { return Err(EcommerceError::Validation("Quantity must be at least 1".into())); }

        let items = self.snapshot(&lines).await?;
        let requests: Vec<StockRequest> = items.iter().map(|i| StockRequest { product_id: i.product_id, quantity: i.quantity }).collect();
        let levels = self.store.deduct_stock(&requests).await?;

        let order = match self.persist(request.user_id, items, request.shipping_address, payment_method, request.bank_transfer_proof).await {
            Ok(order) => order,
            Err(e) => {
                if let Err(restore) = self.store.restore_stock(&requests).await {
                    error!(error = %restore, "failed to restore stock after a failed order");
                }
                return Err(e);
            }
        };
        info!(order_id = %order.id, order_number = %order.order_number, total = %order.total_price, "order placed");

        for level in levels.into_iter().filter(|l| l.remaining.is_low()) {
            warn!(product_id = %level.product_id, remaining = level.remaining.value(), "stock running low");
            self.dispatcher.publish(DomainEvent::Product(ProductEvent::StockLow {
                product_id: level.product_id, name: level.name, remaining: level.remaining.value(),
            }));
        }

        if from_cart {
            buyer.cart.clear();
            if let Err(e) = self.store.save_cart(buyer.id, &buyer.cart).await {
                warn!(error = %e, "order placed but the cart could not be cleared");
            }
        }

        self.dispatcher.publish(DomainEvent::Order(OrderEvent::Placed {
            order_id: order.id,
            order_number: order.order_number.clone(),
            buyer_email: order.shipping_address.email.clone(),
            total: order.total_price.clone(),
            placed_at: order.created_at,
        }));
        Ok(order)
    }

    /// Prices, names and images always come from the catalog, never the client.
    async fn snapshot(&self, lines: &[OrderLineRequest]) -> Result<Vec<LineItem>> {
        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            let product = self.store.find_product(line.product_id).await?.ok_or(EcommerceError::NotFound("Product"))?;
            items.push(LineItem {
                product_id: product.id,
                quantity: line.quantity,
                image: product.main_image().to_string(),
                price: product.price,
                name: product.name,
                variant: line.variant.clone(),
            });
        }
        Ok(items)
    }

    async fn persist(
        &self,
        user_id: Uuid,
        items: Vec<LineItem>,
        address: ShippingAddress,
        payment_method: PaymentMethod,
        proof: Option<String>,
    ) -> Result<Order> {
        let number = self.unique_number().await?;
        let order = Order::place(number, user_id, items, address, payment_method, proof)?;
        self.store.insert_order(&order).await?;
        Ok(order)
    }

    async fn unique_number(&self) -> Result<OrderNumber> {
        for _ in 0..ORDER_NUMBER_ATTEMPTS {
            let candidate = self.numbers.next_number();
            if !self.store.order_number_taken(&candidate).await? { return Ok(candidate); }
        }
        Err(EcommerceError::OrderNumberExhausted)
    }
}
