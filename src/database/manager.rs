use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;

/// Errors from the relational store
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Not found: {0}")]
    NotFound(String),

    /// A unique constraint rejected the write; carries the constraint name
    #[error("Unique violation: {0}")]
    UniqueViolation(String),

    /// The row changed since it was read (optimistic concurrency token mismatch)
    #[error("Concurrent modification of {0}")]
    Conflict(String),

    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

/// Constraint names shared by the schema and both store implementations
pub mod constraints {
    pub const REQUEST_NUMBER: &str = "requests_number_key";
    pub const AREA_NAME: &str = "areas_name_key";
    pub const USER_USERNAME: &str = "users_username_key";
    pub const USER_EMAIL: &str = "users_email_key";
    pub const REQUEST_TYPE_NAME: &str = "request_types_area_name_key";
}

impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(ref db) if db.code().as_deref() == Some("23505") => {
                DatabaseError::UniqueViolation(db.constraint().unwrap_or_default().to_string())
            }
            sqlx::Error::RowNotFound => DatabaseError::NotFound("Record not found".to_string()),
            other => DatabaseError::Sqlx(other),
        }
    }
}

impl DatabaseError {
    pub fn is_unique_violation(&self, constraint: &str) -> bool {
        matches!(self, DatabaseError::UniqueViolation(name) if name == constraint)
    }
}

/// Builds the PostgreSQL pool from injected configuration and runs migrations
pub struct DatabaseManager;

impl DatabaseManager {
    pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
        let url = config
            .url
            .as_deref()
            .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;
        let redacted = Self::redact(url)?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        info!("Created database pool for: {}", redacted);
        Ok(pool)
    }

    /// Apply the embedded schema migrations
    pub async fn migrate(pool: &PgPool) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations").run(pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(pool: &PgPool) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }

    /// Connection string safe for logs: credentials removed
    fn redact(url: &str) -> Result<String, DatabaseError> {
        let mut parsed = url::Url::parse(url).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        if !matches!(parsed.scheme(), "postgres" | "postgresql") {
            return Err(DatabaseError::InvalidDatabaseUrl);
        }
        parsed
            .set_username("")
            .map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        parsed
            .set_password(None)
            .map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        Ok(parsed.into())
    }
}
