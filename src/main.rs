//! OpenSASE Storefront - catalog, checkout and fulfillment service

use std::sync::Arc;
use anyhow::Result;
use opensase_storefront::http::{router, AppState};
use opensase_storefront::notify::{LogNotifier, NatsNotifier, Notifier};
use opensase_storefront::{repository, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let store = repository::open(config.database_url.as_deref()).await?;
    let notifier: Arc<dyn Notifier> = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => {
                tracing::info!(subject = NatsNotifier::SUBJECT, "publishing emails to nats");
                Arc::new(NatsNotifier::new(client))
            }
            Err(e) => {
                tracing::warn!(error = %e, "nats unavailable, emails will only be logged");
                Arc::new(LogNotifier)
            }
        },
        None => Arc::new(LogNotifier),
    };

    let app = router(AppState::new(store, notifier, &config));
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("🚀 OpenSASE Storefront listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, app).await?;
    Ok(())
}
