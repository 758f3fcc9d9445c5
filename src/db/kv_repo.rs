use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

/// Raw key/value access to the local database.
#[derive(Clone, Debug)]
pub struct KvRepository {
    pool: SqlitePool,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct KvEntry {
    pub key: String,
    pub value: String,
    pub updated_at: String,
}

impl KvRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, key: &str) -> Result<Option<KvEntry>, sqlx::Error> {
        sqlx::query_as::<_, KvEntry>(
            "SELECT key, value, updated_at FROM kv_entries WHERE key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
    }

    /// Inserts or replaces an entry.
    pub async fn put(
        &self,
        key: &str,
        value: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO kv_entries (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Deletes an entry. Returns true if a row was removed.
    pub async fn delete(&self, key: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM kv_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists keys starting with `prefix`, in key order.
    pub async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT key FROM kv_entries WHERE substr(key, 1, length(?)) = ? ORDER BY key",
        )
        .bind(prefix)
        .bind(prefix)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(key,)| key).collect())
    }
}
