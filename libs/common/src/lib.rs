//! Common library for the movie-review client
//!
//! This crate provides shared functionality used by the client services,
//! including the local database handle, durable key-value storage, backend
//! configuration and storage error types.

pub mod config;
pub mod database;
pub mod error;
pub mod kv;

/// Example usage of the database module
///
/// ```rust,no_run
/// use common::database::{Database, DatabaseConfig};
/// use common::kv::{KeyValueStore, SqliteKeyValueStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let db = Database::new(DatabaseConfig::from_env()?);
///     println!("Database health check: {}", db.health_check().await?);
///
///     let store = SqliteKeyValueStore::new(db);
///     store.set("token", "abc").await?;
///     Ok(())
/// }
/// ```
pub fn example_usage() {}
