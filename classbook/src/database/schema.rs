//! Database schema and migrations
//!
//! The notebook keeps its collections in a single `kv_store` table. Schema
//! changes are versioned in a `migrations` table and each one is applied
//! once, inside a transaction, so existing notebook data is never rewritten
//! by a restart.

use crate::error::Result;
use sqlx::sqlite::SqlitePool;

/// Bring the schema up to date and report what the notebook already holds.
///
/// Journal mode and busy timeout come from the connection options in
/// `database::connect_options`.
pub async fn initialize_database(pool: &SqlitePool) -> Result<()> {
    tracing::info!("Initializing database schema");

    // Version bookkeeping lives outside the numbered migrations
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    let current_version = schema_version(pool).await?;
    tracing::info!("Current database version: {}", current_version);

    apply_migrations(pool, current_version).await?;

    let collections: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM kv_store")
        .fetch_one(pool)
        .await?;
    tracing::info!(
        "Database ready at version {} with {} stored collection(s)",
        schema_version(pool).await?,
        collections
    );

    Ok(())
}

/// Highest applied migration, 0 for a fresh database
pub async fn schema_version(pool: &SqlitePool) -> Result<i32> {
    let version: i32 = sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM migrations")
        .fetch_one(pool)
        .await?;
    Ok(version)
}

async fn apply_migrations(pool: &SqlitePool, current_version: i32) -> Result<()> {
    for (version, sql) in get_migrations() {
        // Already applied on an earlier start
        if version <= current_version {
            continue;
        }

        tracing::info!("Applying migration version {}", version);

        let mut tx = pool.begin().await?;

        // Migration files may hold several statements
        for statement in sql.split(';').filter(|s| !s.trim().is_empty()) {
            sqlx::query(statement).execute(&mut *tx).await?;
        }

        // Record migration
        sqlx::query("INSERT INTO migrations (version) VALUES (?)")
            .bind(version)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!("Migration version {} applied successfully", version);
    }

    Ok(())
}

fn get_migrations() -> Vec<(i32, &'static str)> {
    vec![(1, include_str!("migrations/001_initial_schema.sql"))]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LOGS_KEY, STUDENTS_KEY};
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_fresh_database_gets_kv_store() {
        let pool = memory_pool().await;
        assert_eq!(
            sqlx::query_scalar::<_, i32>("SELECT COUNT(*) FROM sqlite_master WHERE name = 'kv_store'")
                .fetch_one(&pool)
                .await
                .unwrap(),
            0
        );

        initialize_database(&pool).await.unwrap();

        let tables: i32 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'kv_store'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();

        assert_eq!(tables, 1);
        assert_eq!(
            schema_version(&pool).await.unwrap(),
            get_migrations().len() as i32
        );
    }

    #[tokio::test]
    async fn test_restart_keeps_notebook_rows() {
        let pool = memory_pool().await;
        initialize_database(&pool).await.unwrap();

        for (key, value) in [(STUDENTS_KEY, r#"[{"id":"hs01"}]"#), (LOGS_KEY, "[]")] {
            sqlx::query("INSERT INTO kv_store (key, value, updated_at) VALUES (?, ?, '2024-05-01')")
                .bind(key)
                .bind(value)
                .execute(&pool)
                .await
                .unwrap();
        }

        initialize_database(&pool).await.unwrap();

        let students: String = sqlx::query_scalar("SELECT value FROM kv_store WHERE key = ?")
            .bind(STUDENTS_KEY)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(students, r#"[{"id":"hs01"}]"#);

        let applied: i32 = sqlx::query_scalar("SELECT COUNT(*) FROM migrations")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(applied, get_migrations().len() as i32);
    }
}
