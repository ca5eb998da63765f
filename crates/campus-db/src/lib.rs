//! # Campus DB
//!
//! PostgreSQL connection pool setup.
//!
//! # Environment Variables
//!
//! - `DATABASE_URL`: connection string (required)
//! - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
//!
//! ```ignore
//! let pool = campus_db::init_db_pool().await?;
//! ```

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use std::env;

/// Connects a pool using `DATABASE_URL`.
pub async fn init_db_pool() -> anyhow::Result<PgPool> {
    let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(10);

    connect(&database_url, max_connections).await
}

pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!(max_connections, "database pool ready");
    Ok(pool)
}

pub use sqlx::PgPool;
