//! Outbound notifications
//!
//! Services raise [`DomainEvent`]s; the [`Dispatcher`] turns the ones people care
//! about into emails and hands them to a [`Notifier`] on a spawned task. Delivery is
//! best-effort: a failed send is logged and never reaches the caller.

use std::sync::Arc;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use crate::domain::events::{DomainEvent, OrderEvent, ProductEvent};
use crate::{EcommerceError, Result};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email { pub to: String, pub subject: String, pub body: String }

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, email: Email) -> Result<()>;
}

/// Writes emails to the log instead of sending them.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, email: Email) -> Result<()> {
        info!(to = %email.to, subject = %email.subject, "email (log only)");
        Ok(())
    }
}

/// Publishes emails as JSON onto a NATS subject for the mailer worker.
pub struct NatsNotifier { client: async_nats::Client, subject: String }

impl NatsNotifier {
    pub const SUBJECT: &'static str = "notifications.email";

    pub fn new(client: async_nats::Client) -> Self { Self { client, subject: Self::SUBJECT.to_string() } }
}

#[async_trait]
impl Notifier for NatsNotifier {
    async fn send(&self, email: Email) -> Result<()> {
        let payload = serde_json::to_vec(&email).map_err(|e| EcommerceError::Upstream(e.to_string()))?;
        self.client.publish(self.subject.clone(), payload.into()).await
            .map_err(|e| EcommerceError::Upstream(format!("nats publish failed: {e}")))?;
        Ok(())
    }
}

/// Keeps every email in memory.
#[derive(Default)]
pub struct MemoryNotifier { sent: Mutex<Vec<Email>> }

impl MemoryNotifier {
    pub fn new() -> Self { Self::default() }
    pub async fn sent(&self) -> Vec<Email> { self.sent.lock().await.clone() }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn send(&self, email: Email) -> Result<()> {
        self.sent.lock().await.push(email);
        Ok(())
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    notifier: Arc<dyn Notifier>,
    alert_email: String,
    storefront_url: Option<String>,
}

impl Dispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, alert_email: impl Into<String>, storefront_url: Option<String>) -> Self {
        Self { notifier, alert_email: alert_email.into(), storefront_url }
    }

    /// Fire and forget. Must be called from within a tokio runtime.
    pub fn publish(&self, event: DomainEvent) {
        for email in self.render(&event) {
            let notifier = Arc::clone(&self.notifier);
            tokio::spawn(async move {
                let (to, subject) = (email.to.clone(), email.subject.clone());
                if let Err(e) = notifier.send(email).await {
                    warn!(%to, %subject, error = %e, "failed to send notification");
                }
            });
        }
    }

    fn render(&self, event: &DomainEvent) -> Vec<Email> {
        match event {
            DomainEvent::Product(ProductEvent::StockLow { product_id, name, remaining }) => vec![Email {
                to: self.alert_email.clone(),
                subject: format!("Low stock alert: {name}"),
                body: format!("Only {remaining} left in stock for {name} ({product_id}). Consider restocking soon."),
            }],
            DomainEvent::Product(ProductEvent::ImagesDiscarded { product_id, urls }) => {
                info!(%product_id, count = urls.len(), ?urls, "product images no longer referenced");
                vec![]
            }
            DomainEvent::Order(OrderEvent::Placed { order_id, order_number, buyer_email, total, placed_at }) => {
                let date = placed_at.format("%Y-%m-%d %H:%M UTC");
                let mut confirmation = format!(
                    "Thank you for your order.\n\nOrder number: {order_number}\nTotal: {total}\nPlaced: {date}\n"
                );
                if let Some(base) = &self.storefront_url {
                    confirmation.push_str(&format!("\nTrack it at {base}/orders/{order_id}\n"));
                }
                vec![
                    Email { to: buyer_email.clone(), subject: format!("Order confirmation {order_number}"), body: confirmation },
                    Email {
                        to: self.alert_email.clone(),
                        subject: format!("New order {order_number}"),
                        body: format!("Order {order_number} ({order_id}) was placed by {buyer_email} for {total} at {date}."),
                    },
                ]
            }
            DomainEvent::Order(other) => {
                debug!(event = ?other, "order event");
                vec![]
            }
        }
    }
}
