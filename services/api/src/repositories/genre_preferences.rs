//! Genre preference repository for database operations

use async_trait::async_trait;
use common::database::Database;
use common::error::{DatabaseError, DatabaseResult};
use sqlx::FromRow;
use std::collections::BTreeSet;
use tracing::debug;

/// Per-user storage of preferred genre ids
#[async_trait]
pub trait GenrePreferenceStore: Send + Sync {
    /// Distinct genre ids stored for a user
    async fn get_user_genres(&self, user_id: &str) -> DatabaseResult<BTreeSet<i64>>;

    /// Insert one row without checking for an existing one
    async fn save_user_genre(&self, user_id: &str, genre_id: i64) -> DatabaseResult<()>;

    /// Delete every row matching the pair, returning how many were removed
    async fn remove_user_genre(&self, user_id: &str, genre_id: i64) -> DatabaseResult<u64>;
}

/// One row of `user_genre_preferences`
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct GenrePreference {
    pub id: i64,
    pub user_id: String,
    pub genre_id: i64,
}

/// Genre preference repository backed by the shared database handle
#[derive(Debug, Clone)]
pub struct GenrePreferenceRepository {
    db: Database,
}

impl GenrePreferenceRepository {
    /// Create a new genre preference repository
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Raw rows for a user, duplicates included, in insertion order
    pub async fn list_rows(&self, user_id: &str) -> DatabaseResult<Vec<GenrePreference>> {
        let pool = self.db.pool().await?;

        let rows = sqlx::query_as::<_, GenrePreference>(
            r#"
            SELECT id, user_id, genre_id
            FROM user_genre_preferences
            WHERE user_id = ?
            ORDER BY id
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
        .map_err(DatabaseError::Query)?;

        Ok(rows)
    }
}

#[async_trait]
impl GenrePreferenceStore for GenrePreferenceRepository {
    async fn get_user_genres(&self, user_id: &str) -> DatabaseResult<BTreeSet<i64>> {
        let pool = self.db.pool().await?;

        let genres: Vec<i64> = sqlx::query_scalar(
            "SELECT DISTINCT genre_id FROM user_genre_preferences WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
        .map_err(DatabaseError::Query)?;

        Ok(genres.into_iter().collect())
    }

    async fn save_user_genre(&self, user_id: &str, genre_id: i64) -> DatabaseResult<()> {
        let pool = self.db.pool().await?;

        sqlx::query("INSERT INTO user_genre_preferences (user_id, genre_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(genre_id)
            .execute(pool)
            .await
            .map_err(DatabaseError::Query)?;

        debug!(user_id, genre_id, "Saved genre preference");
        Ok(())
    }

    async fn remove_user_genre(&self, user_id: &str, genre_id: i64) -> DatabaseResult<u64> {
        let pool = self.db.pool().await?;

        let result =
            sqlx::query("DELETE FROM user_genre_preferences WHERE user_id = ? AND genre_id = ?")
                .bind(user_id)
                .bind(genre_id)
                .execute(pool)
                .await
                .map_err(DatabaseError::Query)?;

        debug!(
            user_id,
            genre_id,
            removed = result.rows_affected(),
            "Removed genre preference"
        );
        Ok(result.rows_affected())
    }
}
