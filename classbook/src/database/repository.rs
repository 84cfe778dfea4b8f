//! Repository layer for database operations
//!
//! The notebook persists each record collection as one JSON value under a
//! fixed key. Multi-key writes share a transaction.

use crate::error::Result;
use crate::storage::KeyValueStore;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the value stored under a key
    pub async fn get_value(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM kv_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        tracing::debug!("Read key {} (present: {})", key, value.is_some());
        Ok(value)
    }

    /// Insert or replace several keys in one transaction
    pub async fn set_values(&self, entries: &[(&str, String)]) -> Result<()> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        for (key, value) in entries {
            sqlx::query(
                r#"
                INSERT INTO kv_store (key, value, updated_at) VALUES (?, ?, ?)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
                "#,
            )
            .bind(*key)
            .bind(value)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::debug!("Stored {} key(s)", entries.len());
        Ok(())
    }

}

#[async_trait]
impl KeyValueStore for Repository {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.get_value(key).await
    }

    async fn set_many(&self, entries: &[(&str, String)]) -> Result<()> {
        self.set_values(entries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::schema::initialize_database;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_repo() -> Repository {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();

        Repository::new(pool)
    }

    #[tokio::test]
    async fn test_missing_key_is_none() {
        let repo = create_test_repo().await;

        let value = repo.get_value("teacher_app_logs").await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_set_and_get_value() {
        let repo = create_test_repo().await;

        repo.set_values(&[("teacher_app_notes", "[]".to_string())])
            .await
            .unwrap();

        let value = repo.get_value("teacher_app_notes").await.unwrap();
        assert_eq!(value, Some("[]".to_string()));
    }

    #[tokio::test]
    async fn test_overwrite_existing_key() {
        let repo = create_test_repo().await;

        repo.set("students", "[1]".to_string()).await.unwrap();
        repo.set("students", "[2]".to_string()).await.unwrap();

        assert_eq!(repo.get("students").await.unwrap(), Some("[2]".to_string()));

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM kv_store")
            .fetch_one(&repo.pool)
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn test_set_many_writes_all_keys() {
        let repo = create_test_repo().await;

        repo.set_many(&[("b", "2".to_string()), ("a", "1".to_string())])
            .await
            .unwrap();

        assert_eq!(repo.get("a").await.unwrap(), Some("1".to_string()));
        assert_eq!(repo.get("b").await.unwrap(), Some("2".to_string()));
    }
}
