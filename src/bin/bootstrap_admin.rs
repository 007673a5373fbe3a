//! Creates the first admin account when none exists.

use anyhow::Result;
use opensase_storefront::bootstrap::{ensure_admin, AdminSeed, BootstrapOutcome};
use opensase_storefront::{repository, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let Some(url) = config.database_url.as_deref() else {
        anyhow::bail!("DATABASE_URL must be set; an in-memory admin would vanish on exit");
    };
    let seed = AdminSeed::from_env()?;
    let store = repository::open(Some(url)).await?;
    match ensure_admin(store.as_ref(), &seed).await? {
        BootstrapOutcome::Created(admin) => println!("created admin {}", admin.email),
        BootstrapOutcome::AlreadyPresent => println!("admin already present"),
    }
    Ok(())
}
