//! Database module for the local SQLite store
//!
//! This module provides the lazily opened connection handle, configuration,
//! schema creation and health checks for the on-device database.

use crate::error::{DatabaseError, DatabaseResult};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::env;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{error, info};

/// Statements executed once per process, right after the pool is opened.
const SCHEMA: [&str; 2] = [
    r#"
    CREATE TABLE IF NOT EXISTS user_genre_preferences (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL,
        genre_id INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS key_value_store (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
    "#,
];

/// Database configuration struct
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database connection URL
    pub database_url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// Create a new DatabaseConfig from environment variables
    ///
    /// # Environment Variables
    /// - `DATABASE_URL`: SQLite connection URL (default: "sqlite://movies.db?mode=rwc")
    /// - `DATABASE_MAX_CONNECTIONS`: Maximum number of connections (default: 1)
    pub fn from_env() -> DatabaseResult<Self> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://movies.db?mode=rwc".to_string());

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1);

        if max_connections == 0 {
            return Err(DatabaseError::Configuration(
                "DATABASE_MAX_CONNECTIONS must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            database_url,
            max_connections,
        })
    }

    /// Configuration for a private in-memory database
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
        }
    }

    fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
    }
}

/// Handle to the local database
///
/// Construction performs no I/O. The pool is opened and the schema created on
/// the first call to [`Database::pool`]; concurrent first callers wait on the
/// same open sequence. Clones share the same underlying pool.
#[derive(Debug, Clone)]
pub struct Database {
    config: Arc<DatabaseConfig>,
    pool: Arc<OnceCell<SqlitePool>>,
}

impl Database {
    /// Create a new, unopened database handle
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config: Arc::new(config),
            pool: Arc::new(OnceCell::new()),
        }
    }

    /// Get the connection pool, opening it on first use
    pub async fn pool(&self) -> DatabaseResult<&SqlitePool> {
        self.pool
            .get_or_try_init(|| init_pool(&self.config))
            .await
    }

    /// Whether the pool has already been opened
    pub fn is_open(&self) -> bool {
        self.pool.initialized()
    }

    /// Check database connectivity
    pub async fn health_check(&self) -> DatabaseResult<bool> {
        let pool = self.pool().await?;
        health_check(pool).await
    }
}

/// Open a SQLite connection pool and create the schema
///
/// # Arguments
///
/// * `config` - Database configuration
///
/// # Returns
///
/// * `DatabaseResult<SqlitePool>` - SQLite connection pool or error
pub async fn init_pool(config: &DatabaseConfig) -> DatabaseResult<SqlitePool> {
    info!("Opening local database");

    if !config.database_url.starts_with("sqlite:") {
        return Err(DatabaseError::Configuration(format!(
            "Unsupported database URL: {}",
            config.database_url
        )));
    }

    let options = SqliteConnectOptions::from_str(&config.database_url)
        .map_err(|e| DatabaseError::Configuration(format!("Invalid database URL: {}", e)))?
        .create_if_missing(true);

    // An in-memory database lives only as long as its connection.
    let max_connections = if config.is_in_memory() {
        1
    } else {
        config.max_connections
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .map_err(|e| {
            error!("Failed to open local database: {}", e);
            DatabaseError::Connection(e)
        })?;

    create_schema(&pool).await?;

    info!("Local database ready");
    Ok(pool)
}

/// Create every table the client needs; safe to run repeatedly
pub async fn create_schema(pool: &SqlitePool) -> DatabaseResult<()> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(DatabaseError::Schema)?;
    }

    Ok(())
}

/// Check database connectivity
///
/// # Arguments
///
/// * `pool` - SQLite connection pool
///
/// # Returns
///
/// * `DatabaseResult<bool>` - True if connection is successful
pub async fn health_check(pool: &SqlitePool) -> DatabaseResult<bool> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(DatabaseError::Query)?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_database_config_from_env() {
        unsafe {
            env::remove_var("DATABASE_URL");
            env::remove_var("DATABASE_MAX_CONNECTIONS");
        }

        let config = DatabaseConfig::from_env().expect("Failed to create database config");
        assert_eq!(config.max_connections, 1);
        assert_eq!(config.database_url, "sqlite://movies.db?mode=rwc");
    }

    #[test]
    #[serial]
    fn test_database_config_rejects_zero_connections() {
        unsafe {
            env::set_var("DATABASE_MAX_CONNECTIONS", "0");
        }

        let result = DatabaseConfig::from_env();
        assert!(matches!(result, Err(DatabaseError::Configuration(_))));

        unsafe {
            env::remove_var("DATABASE_MAX_CONNECTIONS");
        }
    }

    #[tokio::test]
    async fn test_pool_is_opened_lazily() {
        let db = Database::new(DatabaseConfig::in_memory());
        assert!(!db.is_open());

        assert!(db.health_check().await.unwrap());
        assert!(db.is_open());
    }

    #[tokio::test]
    async fn test_concurrent_first_access_shares_one_pool() {
        let db = Database::new(DatabaseConfig::in_memory());

        let (a, b, c) = tokio::join!(db.pool(), db.pool(), db.pool());
        let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());

        assert!(std::ptr::eq(a, b));
        assert!(std::ptr::eq(b, c));
    }

    #[tokio::test]
    async fn test_schema_creation_is_idempotent() {
        let db = Database::new(DatabaseConfig::in_memory());
        let pool = db.pool().await.unwrap();

        create_schema(pool).await.unwrap();
        create_schema(pool).await.unwrap();

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name IN ('user_genre_preferences', 'key_value_store') ORDER BY name",
        )
        .fetch_all(pool)
        .await
        .unwrap();

        assert_eq!(tables, vec!["key_value_store", "user_genre_preferences"]);
    }

    #[tokio::test]
    async fn test_invalid_url_is_a_configuration_error() {
        let db = Database::new(DatabaseConfig {
            database_url: "postgres://not-sqlite".to_string(),
            max_connections: 1,
        });

        assert!(matches!(
            db.pool().await,
            Err(DatabaseError::Configuration(_))
        ));
        assert!(!db.is_open());
    }
}
