//! HTTP surface
//!
//! JSON over axum. Handlers stay thin: they pull the caller and the payload out of
//! the request, call a service, and let [`EcommerceError`](crate::EcommerceError)
//! become the error response.

pub mod auth;
pub mod body;
mod accounts;
mod error;
mod orders;
mod products;

use std::sync::Arc;
use axum::{routing::get, Json, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use crate::notify::{Dispatcher, Notifier};
use crate::repository::Store;
use crate::services::{AccountService, CatalogService, CheckoutService, FulfillmentService, OrderNumberSource, RandomOrderNumbers};
use crate::Config;

#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,
    pub accounts: AccountService,
    pub checkout: CheckoutService,
    pub fulfillment: FulfillmentService,
    /// Currency new catalog prices are recorded in.
    pub currency: String,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>, config: &Config) -> Self {
        Self::with_numbers(store, notifier, Arc::new(RandomOrderNumbers), config)
    }

    pub fn with_numbers(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>, numbers: Arc<dyn OrderNumberSource>, config: &Config) -> Self {
        let dispatcher = Dispatcher::new(notifier, config.alert_email.clone(), config.storefront_url.clone());
        Self {
            catalog: CatalogService::new(store.clone(), dispatcher.clone()),
            accounts: AccountService::new(store.clone()),
            checkout: CheckoutService::new(store.clone(), dispatcher.clone(), numbers),
            fulfillment: FulfillmentService::new(store, dispatcher),
            currency: config.currency.clone(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "opensase-storefront"})) }))
        .merge(products::routes())
        .merge(accounts::routes())
        .merge(orders::routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
