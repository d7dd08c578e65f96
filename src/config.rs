//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `PAYMENT_KEY_SECRET` - secret shared with the payment gateway for signatures
//!
//! ## Optional
//! - `HOST` - bind address (default: 0.0.0.0)
//! - `PORT` - listen port (default: 8083)
//! - `DATABASE_MAX_CONNECTIONS` - pool size (default: 10)
//! - `NATS_URL` - publish domain events when set
//! - `MAX_QTY_PER_ITEM` - per-product cart cap (default: 5)
//! - `COD_LIMIT` - largest order total payable on delivery (default: 1000)
//! - `RETURN_WINDOW_DAYS` - days after delivery a return may be requested (default: 7)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Business rules that handlers consult.
#[derive(Clone)]
pub struct StoreSettings {
    pub max_qty_per_item: u32,
    pub cod_limit: Decimal,
    pub return_window_days: i64,
    pub payment_key_secret: String,
}

impl std::fmt::Debug for StoreSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreSettings")
            .field("max_qty_per_item", &self.max_qty_per_item)
            .field("cod_limit", &self.cod_limit)
            .field("return_window_days", &self.return_window_days)
            .field("payment_key_secret", &"[REDACTED]")
            .finish()
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            max_qty_per_item: 5,
            cod_limit: Decimal::new(1000, 0),
            return_window_days: 7,
            payment_key_secret: String::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub host: IpAddr,
    pub port: u16,
    pub nats_url: Option<String>,
    pub store: StoreSettings,
}

impl Config {
    /// Load configuration from the environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            database_max_connections: parsed("DATABASE_MAX_CONNECTIONS", 10)?,
            host: parsed("HOST", IpAddr::from([0, 0, 0, 0]))?,
            port: parsed("PORT", 8083)?,
            nats_url: optional("NATS_URL"),
            store: StoreSettings {
                max_qty_per_item: parsed("MAX_QTY_PER_ITEM", 5)?,
                cod_limit: parsed("COD_LIMIT", Decimal::new(1000, 0))?,
                return_window_days: parsed("RETURN_WINDOW_DAYS", 7)?,
                payment_key_secret: required("PAYMENT_KEY_SECRET")?,
            },
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn required(key: &str) -> Result<String, ConfigError> {
    optional(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

fn parsed<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}
