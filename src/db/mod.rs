//! Database layer
//!
//! SQLite storage for user accounts, the product catalogue and the audit log.
//! The schema lives in `migrations/` and is applied when the pool is created.

pub mod audit_repository;
pub mod product_repository;
pub mod user_repository;

pub use audit_repository::AuditRepository;
pub use product_repository::{ProductRepository, StockAdjustment};
pub use user_repository::{NewUser, UserRepository};

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite, SqlitePool};
use tracing::info;

use crate::config::{BootstrapAdminConfig, DatabaseConfig};
use crate::models::Rang;
use crate::services::password;

/// Database connection pool type
pub type DbPool = Pool<Sqlite>;

/// Initialize the database connection pool and run migrations
pub async fn init_pool(config: &DatabaseConfig) -> Result<DbPool> {
    let options = SqliteConnectOptions::from_str(&config.url)
        .with_context(|| format!("Invalid database URL: {}", config.url))?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .connect_with(options)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    Ok(pool)
}

/// Round-trip a trivial query to prove the pool is usable
pub async fn check_health(pool: &SqlitePool) -> Result<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .context("Database health check failed")?;
    Ok(())
}

/// Create the configured administrator if no user exists yet.
///
/// Returns true when an account was created.
pub async fn seed_bootstrap_admin(pool: &SqlitePool, admin: &BootstrapAdminConfig) -> Result<bool> {
    let repo = UserRepository::new(pool);
    if repo.count().await? > 0 {
        return Ok(false);
    }

    let jelszo = password::hash_password(&admin.jelszo)?;
    let user = repo
        .create(&NewUser {
            nev: admin.nev.clone(),
            felhasznalonev: admin.felhasznalonev.clone(),
            email: None,
            telefonszam: None,
            rang: Rang::Admin,
            must_change_password: true,
            jelszo,
        })
        .await
        .context("Failed to create bootstrap administrator")?;

    info!(user_id = user.id, felhasznalonev = %user.felhasznalonev, "Created bootstrap administrator");
    Ok(true)
}

/// Current time in the fixed-width form stored in every timestamp column
pub(crate) fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// Fixed width with microseconds, so string order equals time order
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Query bound in stored form, or `None` past year 9999 where the text form
/// gains a sign and no longer sorts after stored timestamps
pub(crate) fn format_bound(ts: DateTime<Utc>) -> Option<String> {
    (ts.year() <= 9999).then(|| format_timestamp(ts))
}

pub(crate) fn parse_db_timestamp(ts: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return Ok(dt.with_timezone(&Utc));
    }
    let naive = chrono::NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S")
        .with_context(|| format!("Unparseable timestamp in database: {}", ts))?;
    Ok(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
}
