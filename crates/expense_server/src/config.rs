//! Server configuration, read once from the environment at startup.

use anyhow::{Context, Result};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:4200";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub jwt_secret: String,
    /// `None` runs against the in-memory store.
    pub database_url: Option<String>,
    pub bind_addr: String,
    pub db_max_connections: u32,
}

impl ServerConfig {
    /// Reads:
    ///   EXPENSE_JWT_SECRET         — JWT HMAC secret (required)
    ///   EXPENSE_DATABASE_URL       — Postgres connection string (optional)
    ///   EXPENSE_BIND_ADDR          — listen address (default: 0.0.0.0:4200)
    ///   EXPENSE_DB_MAX_CONNECTIONS — pool size (default: 10)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = get("EXPENSE_JWT_SECRET")
            .filter(|s| !s.is_empty())
            .context("EXPENSE_JWT_SECRET must be set")?;
        let database_url = get("EXPENSE_DATABASE_URL").filter(|s| !s.is_empty());
        let bind_addr = get("EXPENSE_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into());
        let db_max_connections = match get("EXPENSE_DB_MAX_CONNECTIONS") {
            Some(v) => v
                .parse()
                .with_context(|| format!("EXPENSE_DB_MAX_CONNECTIONS is not a number: {v}"))?,
            None => DEFAULT_DB_MAX_CONNECTIONS,
        };
        Ok(Self {
            jwt_secret,
            database_url,
            bind_addr,
            db_max_connections,
        })
    }
}
