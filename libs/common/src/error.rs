//! Custom error types for the common library
//!
//! This module defines the storage error types shared by every crate that
//! touches the local database.

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Custom error type for local storage operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred while opening the database
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// Error occurred while creating the schema
    #[error("Database schema error: {0}")]
    Schema(#[source] SqlxError),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;
