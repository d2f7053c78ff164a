//! expense_server — standalone REST server for project collaboration and budget cycles.
//!
//! Configuration comes from the environment (see `ServerConfig::from_env`);
//! a `.env` file is loaded first when present.

use std::sync::Arc;

use anyhow::Context;
use expense_core::memory::MemoryStore;
use expense_core::ports::Stores;
use expense_core::ProjectServices;
use expense_postgres::{PgStores, MIGRATOR};
use expense_server::config::ServerConfig;
use expense_server::middleware::jwt::JwtConfig;
use expense_server::router::build_router;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,expense_server=debug".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;

    let stores = match &config.database_url {
        Some(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.db_max_connections)
                .connect(database_url)
                .await
                .context("failed to connect to database")?;
            tracing::info!("Connected to database");

            MIGRATOR
                .run(&pool)
                .await
                .context("failed to run migrations")?;
            PgStores::new(pool).into_stores()
        }
        None => {
            tracing::warn!("EXPENSE_DATABASE_URL not set; using in-memory store");
            Stores::in_memory(Arc::new(MemoryStore::new()))
        }
    };

    let services = Arc::new(ProjectServices::new(stores));
    let jwt_config = JwtConfig::from_secret(config.jwt_secret.as_bytes());
    let app = build_router(services, jwt_config);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;
    tracing::info!("expense_server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
