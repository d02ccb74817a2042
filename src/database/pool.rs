use crate::config::DatabaseConfig;
use sqlx::migrate::{MigrateError, Migrator};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;

/// Schema for users, listings and bookings, compiled into the binary
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database unreachable at startup: {0}")]
    Connect(sqlx::Error),

    #[error("Timed out waiting for a database connection")]
    Timeout,

    #[error("Schema migration failed: {0}")]
    Migration(#[from] MigrateError),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => DatabaseError::Timeout,
            other => DatabaseError::Connect(other),
        }
    }
}

/// Open the booking store pool. `connect` fails fast when the server is down.
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .idle_timeout(config.idle_timeout())
        .max_lifetime(config.max_lifetime())
        .test_before_acquire(config.test_before_acquire)
        .connect(&config.url)
        .await?;
    Ok(pool)
}

/// Bring the schema up to date; already-applied versions are skipped.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DatabaseError> {
    MIGRATOR.run(pool).await?;
    info!("Schema at migration {}", MIGRATOR.iter().map(|m| m.version).max().unwrap_or(0));
    Ok(())
}
