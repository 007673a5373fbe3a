//! One-off admin provisioning.
//!
//! Run through the `bootstrap-admin` binary. Does nothing once any admin exists,
//! so it is safe to run on every deploy.

use tracing::info;
use crate::config::ConfigError;
use crate::domain::aggregates::User;
use crate::repository::Store;
use crate::Result;

#[derive(Clone, Debug)]
pub struct AdminSeed { pub name: String, pub email: String, pub password: String }

impl AdminSeed {
    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        let required = |name: &'static str| {
            std::env::var(name).ok().filter(|v| !v.trim().is_empty()).ok_or(ConfigError::Missing { name })
        };
        Ok(Self {
            name: std::env::var("ADMIN_NAME").ok().filter(|v| !v.trim().is_empty()).unwrap_or_else(|| "Administrator".into()),
            email: required("ADMIN_EMAIL")?,
            password: required("ADMIN_PASSWORD")?,
        })
    }
}

#[derive(Debug)]
pub enum BootstrapOutcome { Created(User), AlreadyPresent }

pub async fn ensure_admin(store: &dyn Store, seed: &AdminSeed) -> Result<BootstrapOutcome> {
    if store.has_admin().await? {
        info!("an admin account already exists, nothing to do");
        return Ok(BootstrapOutcome::AlreadyPresent);
    }
    let admin = User::admin(seed.name.as_str(), &seed.email, &seed.password)?;
    store.insert_user(&admin).await?;
    info!(user_id = %admin.id, email = %admin.email, "admin account created");
    Ok(BootstrapOutcome::Created(admin))
}
