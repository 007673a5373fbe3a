//! OpenSASE Storefront
//!
//! Storefront and admin backend for a phone and laptop retailer.
//!
//! ## Features
//! - Product catalog with category-specific details and reviews
//! - Per-user carts
//! - Checkout with atomic stock deduction and low-stock alerts
//! - Order fulfillment: orders are accepted into shipments and tracked to delivery

pub mod bootstrap;
pub mod config;
pub mod domain;
pub mod http;
pub mod notify;
pub mod repository;
pub mod services;

use thiserror::Error;
use uuid::Uuid;

pub use config::Config;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum EcommerceError {
    #[error("{0}")]
    Validation(String),

    #[error("No items to order")]
    EmptyOrder,

    #[error("Insufficient stock for product: {name}")]
    InsufficientStock { product_id: Uuid, name: String },

    #[error("Order is already marked for shipment")]
    AlreadyShipped,

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Already {0}")]
    NoStatusChange(String),

    #[error("Cannot move from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Not allowed to access this resource")]
    Forbidden,

    #[error("Order user, shipping address, or items missing for shipment transfer")]
    IncompleteOrderData,

    #[error("Failed to generate a unique order number")]
    OrderNumberExhausted,

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Storage error: {0}")]
    StorageError(String),
}

impl From<sqlx::Error> for EcommerceError {
    fn from(e: sqlx::Error) -> Self { EcommerceError::StorageError(e.to_string()) }
}

impl From<validator::ValidationErrors> for EcommerceError {
    fn from(e: validator::ValidationErrors) -> Self { EcommerceError::Validation(e.to_string()) }
}

pub type Result<T> = std::result::Result<T, EcommerceError>;
