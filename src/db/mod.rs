//! Database layer
//!
//! SQLite-backed storage for users, the product catalog, orders, invoices,
//! dealer inventory, service tickets, attendance and notifications. Embedded
//! collections (order lines, specifications, read receipts, status history)
//! are stored as JSON text columns.

mod attendance_repository;
mod inventory_repository;
mod order_repository;
mod product_repository;
mod sale_repository;
mod service_repository;

pub use attendance_repository::AttendanceRepository;
pub use inventory_repository::InventoryRepository;
pub use order_repository::{OrderRepository, OrderScope};
pub use product_repository::ProductRepository;
pub use sale_repository::{SaleRepository, SaleScope};
pub use service_repository::{ServiceRepository, ServiceScope};

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::config::DatabaseConfig;

/// Database connection pool type
pub type DbPool = Pool<Sqlite>;

/// Initialize the database connection pool and run migrations
pub async fn init_pool(config: &DatabaseConfig) -> Result<DbPool> {
    let connect_options = config
        .url
        .parse::<SqliteConnectOptions>()
        .context("Failed to parse database URL")?
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(config.connect_timeout_secs))
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .connect_with(connect_options)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    Ok(pool)
}

/// Check database connectivity
pub async fn check_health(pool: &DbPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .context("Database health check failed")?;
    Ok(())
}

/// Parse a stored timestamp, tolerating both RFC 3339 and the bare
/// `YYYY-MM-DD HH:MM:SS` form SQLite functions produce.
pub(crate) fn parse_db_timestamp(ts: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S") {
        return DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc);
    }
    Utc::now()
}

pub(crate) fn parse_opt_timestamp(ts: Option<&str>) -> Option<DateTime<Utc>> {
    ts.filter(|s| !s.is_empty()).map(parse_db_timestamp)
}

pub(crate) fn parse_db_uuid(id: &str) -> Uuid {
    Uuid::parse_str(id).unwrap_or_else(|_| Uuid::nil())
}

pub(crate) fn parse_opt_uuid(id: Option<&str>) -> Option<Uuid> {
    id.filter(|s| !s.is_empty()).map(parse_db_uuid)
}

/// Deserialize a JSON text column, falling back to the type's default on
/// missing or malformed content.
pub(crate) fn parse_json_column<T: serde::de::DeserializeOwned + Default>(
    raw: Option<&str>,
) -> T {
    raw.and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default()
}
