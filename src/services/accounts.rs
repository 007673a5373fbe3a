//! Users and their carts.

use std::sync::Arc;
use serde::Serialize;
use tracing::{debug, info, instrument};
use uuid::Uuid;
use crate::domain::aggregates::{Cart, CartItem, User};
use crate::domain::aggregates::user::normalize_email;
use crate::domain::value_objects::Money;
use crate::repository::Store;
use crate::{EcommerceError, Result};

pub const MIN_PASSWORD_LEN: usize = 6;

/// A cart line joined with the product as it currently is.
#[derive(Clone, Debug, Serialize)]
pub struct CartLine {
    pub product_id: Uuid,
    pub name: String,
    pub image: String,
    pub price: Money,
    pub quantity: u32,
    pub variant: Option<String>,
    pub in_stock: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct CartView { pub items: Vec<CartLine>, pub item_count: usize }

#[derive(Clone)]
pub struct AccountService { store: Arc<dyn Store> }

impl AccountService {
    pub fn new(store: Arc<dyn Store>) -> Self { Self { store } }

    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<User> {
        if name.trim().is_empty() { return Err(EcommerceError::Validation("Name is required".into())); }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(EcommerceError::Validation(format!("Password must be at least {MIN_PASSWORD_LEN} characters")));
        }
        if self.store.find_user_by_email(&normalize_email(email)).await?.is_some() {
            return Err(EcommerceError::Validation("User already exists".into()));
        }
        let user = User::register(name, email, password)?;
        self.store.insert_user(&user).await?;
        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    pub async fn get_user(&self, id: Uuid) -> Result<User> {
        self.store.find_user(id).await?.ok_or(EcommerceError::NotFound("User"))
    }

    pub async fn list_users(&self) -> Result<Vec<User>> { self.store.list_users().await }

    /// Deletes the account and every review it left.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: Uuid) -> Result<()> {
        if !self.store.delete_user(id).await? { return Err(EcommerceError::NotFound("User")); }
        let touched = self.store.strip_reviews_by(id).await?;
        info!(user_id = %id, products_touched = touched, "user deleted");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Cart
    // -------------------------------------------------------------------------

    pub async fn get_cart(&self, user_id: Uuid) -> Result<CartView> {
        let user = self.get_user(user_id).await?;
        self.view(&user.cart).await
    }

    #[instrument(skip(self))]
    pub async fn add_to_cart(&self, user_id: Uuid, product_id: Uuid, quantity: u32, variant: Option<String>) -> Result<CartView> {
        if self.store.find_product(product_id).await?.is_none() { return Err(EcommerceError::NotFound("Product")); }
        self.edit_cart(user_id, |cart| cart.add_item(CartItem { product_id, quantity, variant }).map_err(Into::into)).await
    }

    #[instrument(skip(self))]
    pub async fn update_cart_item(&self, user_id: Uuid, product_id: Uuid, variant: Option<String>, quantity: u32) -> Result<CartView> {
        self.edit_cart(user_id, |cart| cart.update_quantity(product_id, variant.as_deref(), quantity).map_err(Into::into)).await
    }

    pub async fn remove_cart_item(&self, user_id: Uuid, product_id: Uuid) -> Result<CartView> {
        self.edit_cart(user_id, |cart| cart.remove_item(product_id).map_err(Into::into)).await
    }

    pub async fn clear_cart(&self, user_id: Uuid) -> Result<()> {
        self.edit_cart(user_id, |cart| { cart.clear(); Ok(()) }).await.map(|_| ())
    }

    async fn edit_cart(&self, user_id: Uuid, edit: impl FnOnce(&mut Cart) -> Result<()>) -> Result<CartView> {
        let mut user = self.get_user(user_id).await?;
        edit(&mut user.cart)?;
        self.store.save_cart(user_id, &user.cart).await?;
        self.view(&user.cart).await
    }

    async fn view(&self, cart: &Cart) -> Result<CartView> {
        let mut items = Vec::with_capacity(cart.item_count());
        for item in cart.items() {
            let Some(product) = self.store.find_product(item.product_id).await? else {
                debug!(product_id = %item.product_id, "cart references a deleted product");
                continue;
            };
            items.push(CartLine {
                product_id: product.id,
                image: product.main_image().to_string(),
                in_stock: product.stock.value() >= item.quantity,
                name: product.name,
                price: product.price,
                quantity: item.quantity,
                variant: item.variant.clone(),
            });
        }
        Ok(CartView { item_count: items.len(), items })
    }
}
