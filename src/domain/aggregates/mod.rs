//! Aggregates module
pub mod cart;
pub mod order;
pub mod product;
pub mod shipment;
pub mod user;

pub use cart::{Cart, CartError, CartItem};
pub use order::{LineItem, Order, OrderError, OrderStatus, PaymentMethod, PaymentStatus, ShippingAddress, StatusRequest, StatusTarget};
pub use product::{Category, Product, ProductDraft, ProductError, Review};
pub use shipment::{Shipment, ShipmentStatus};
pub use user::User;
