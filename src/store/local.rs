//! SQLite-backed local durable store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::path::Path;

use packwise_core::{EntityKind, TripId};

use super::transport::{collection_key, LocalTransport, TransportError};
use crate::db::{init_db, KvRepository};

/// Key prefix for temporary entries removed by the cleanup sweep.
pub const TEMP_PREFIX: &str = "temp_";
/// Key prefix for cached entries removed by the cleanup sweep.
pub const CACHE_PREFIX: &str = "cache_";
/// Field holding the write time (milliseconds since epoch) in ephemeral entries.
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// Kind of ephemeral entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EphemeralKind {
    Temp,
    Cache,
}

impl EphemeralKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            EphemeralKind::Temp => TEMP_PREFIX,
            EphemeralKind::Cache => CACHE_PREFIX,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SqliteLocalStore {
    repo: KvRepository,
}

impl SqliteLocalStore {
    pub fn new(repo: KvRepository) -> Self {
        Self { repo }
    }

    /// Opens (or creates) the database at `path`.
    pub async fn open(path: &Path) -> Result<Self, TransportError> {
        let pool = init_db(path).await?;
        Ok(Self::new(KvRepository::new(pool)))
    }

    /// Writes an ephemeral entry stamped with `now`. Returns its key.
    pub async fn put_ephemeral(
        &self,
        kind: EphemeralKind,
        name: &str,
        data: Value,
        now: DateTime<Utc>,
    ) -> Result<String, TransportError> {
        let key = format!("{}{}", kind.prefix(), name);
        let entry = json!({
            TIMESTAMP_FIELD: now.timestamp_millis(),
            "data": data,
        });
        self.repo.put(&key, &entry.to_string(), now).await?;
        Ok(key)
    }

    async fn read_value(&self, key: &str) -> Result<Option<Value>, TransportError> {
        match self.repo.get(key).await? {
            Some(entry) => serde_json::from_str(&entry.value)
                .map(Some)
                .map_err(|e| TransportError::Decode(format!("{}: {}", key, e))),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl LocalTransport for SqliteLocalStore {
    async fn load(
        &self,
        trip_id: &TripId,
        kind: EntityKind,
    ) -> Result<Option<Value>, TransportError> {
        self.read_value(&collection_key(trip_id, kind)).await
    }

    async fn save(
        &self,
        trip_id: &TripId,
        kind: EntityKind,
        payload: &Value,
    ) -> Result<(), TransportError> {
        let key = collection_key(trip_id, kind);
        self.repo.put(&key, &payload.to_string(), Utc::now()).await?;
        Ok(())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, TransportError> {
        Ok(self.repo.keys_with_prefix(prefix).await?)
    }

    async fn get_raw(&self, key: &str) -> Result<Option<Value>, TransportError> {
        self.read_value(key).await
    }

    async fn put_raw(&self, key: &str, value: &Value) -> Result<(), TransportError> {
        self.repo.put(key, &value.to_string(), Utc::now()).await?;
        Ok(())
    }

    async fn delete_raw(&self, key: &str) -> Result<bool, TransportError> {
        Ok(self.repo.delete(key).await?)
    }
}
