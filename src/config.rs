//! Service configuration

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{name} is not a valid port: {value}")]
    InvalidPort { name: &'static str, value: String },

    #[error("{name} must not be empty")]
    Empty { name: &'static str },

    #[error("{name} must be set")]
    Missing { name: &'static str },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL; without it the service keeps everything in memory
    pub database_url: Option<String>,
    pub port: u16,
    /// NATS server for the mail queue; emails are only logged when unset
    pub nats_url: Option<String>,
    /// Operator mailbox for low-stock and new-order alerts
    pub alert_email: String,
    /// Base URL used for links in outgoing emails
    pub storefront_url: Option<String>,
    /// ISO currency every catalog price is held in
    pub currency: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            port: 8083,
            nats_url: None,
            alert_email: "alerts@localhost".into(),
            storefront_url: None,
            currency: "LKR".into(),
        }
    }
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let port = match optional("PORT") {
            Some(value) => value.parse().map_err(|_| ConfigError::InvalidPort { name: "PORT", value })?,
            None => defaults.port,
        };
        let currency = match std::env::var("STORE_CURRENCY") {
            Ok(v) if v.trim().is_empty() => return Err(ConfigError::Empty { name: "STORE_CURRENCY" }),
            Ok(v) => v.trim().to_uppercase(),
            Err(_) => defaults.currency,
        };

        Ok(Self {
            database_url: optional("DATABASE_URL"),
            port,
            nats_url: optional("NATS_URL"),
            alert_email: optional("ALERT_EMAIL").unwrap_or(defaults.alert_email),
            storefront_url: optional("STOREFRONT_URL").map(|u| u.trim_end_matches('/').to_string()),
            currency,
        })
    }
}
