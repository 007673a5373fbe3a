//! User Aggregate

use argon2::password_hash::{rand_core::OsRng, PasswordHasher, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::aggregates::cart::Cart;
use crate::{EcommerceError, Result};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub is_admin: bool,
    pub cart: Cart,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn register(name: impl Into<String>, email: &str, password: &str) -> Result<Self> {
        Ok(Self {
            id: Uuid::now_v7(),
            name: name.into().trim().to_string(),
            email: normalize_email(email),
            password_hash: hash_password(password)?,
            is_admin: false,
            cart: Cart::new(),
            created_at: Utc::now(),
        })
    }

    pub fn admin(name: impl Into<String>, email: &str, password: &str) -> Result<Self> {
        let mut user = Self::register(name, email, password)?;
        user.is_admin = true;
        Ok(user)
    }
}

pub fn normalize_email(email: &str) -> String { email.trim().to_lowercase() }

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| EcommerceError::Upstream(format!("password hashing failed: {e}")))
}
