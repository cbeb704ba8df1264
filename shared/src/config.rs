use anyhow::{Context, Result};
use std::time::Duration;

const DEFAULT_RECONCILE_TICK_SECONDS: u64 = 30;
const DEFAULT_SEARCH_LOOKAHEAD_DAYS: u32 = 7;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub reconciler: ReconcilerConfig,
    pub admission: AdmissionConfig,
    pub notification: NotificationConfig,
}

impl AppConfig {
    pub fn new() -> Result<Self> {
        let database = DatabaseConfig {
            host: std::env::var("DATABASE_HOST")?,
            port: std::env::var("DATABASE_PORT")?
                .parse()
                .context("DATABASE_PORT must be a port number")?,
            username: std::env::var("DATABASE_USERNAME")?,
            password: std::env::var("DATABASE_PASSWORD")?,
            database: std::env::var("DATABASE_NAME")?,
        };
        let reconciler = ReconcilerConfig {
            tick_interval: Duration::from_secs(parse_or(
                "RECONCILE_TICK_SECONDS",
                DEFAULT_RECONCILE_TICK_SECONDS,
            )?),
        };
        let admission = AdmissionConfig {
            lookahead_days: parse_or("SEARCH_LOOKAHEAD_DAYS", DEFAULT_SEARCH_LOOKAHEAD_DAYS)?,
        };
        let notification = NotificationConfig {
            webhook_url: std::env::var("NOTIFICATION_WEBHOOK_URL")
                .ok()
                .filter(|url| !url.is_empty()),
        };
        Ok(Self {
            database,
            reconciler,
            admission,
            notification,
        })
    }
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(v) => v
            .parse()
            .with_context(|| format!("{key} has an invalid value: {v}")),
        Err(_) => Ok(default),
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
}

#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    pub tick_interval: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(DEFAULT_RECONCILE_TICK_SECONDS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdmissionConfig {
    pub lookahead_days: u32,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            lookahead_days: DEFAULT_SEARCH_LOOKAHEAD_DAYS,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NotificationConfig {
    pub webhook_url: Option<String>,
}
