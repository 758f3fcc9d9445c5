//! Storage transports.
//!
//! Both transports move raw JSON payloads keyed by trip and collection kind.
//! Typed decoding and the remote/local policy live in [`crate::hybrid`].

use async_trait::async_trait;
use serde_json::Value;

use packwise_core::{EntityKind, PersistError, TripId};

/// Errors that can occur while talking to a store.
#[derive(Debug)]
pub enum TransportError {
    /// Remote backend is not configured
    NotConfigured,
    /// Request could not be sent or the connection failed
    Unreachable(String),
    /// Remote backend answered with a non-success status
    Status(u16),
    /// Payload could not be decoded
    Decode(String),
    /// Configured server URL cannot address a collection
    InvalidUrl(String),
    /// Local database failure
    Local(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::NotConfigured => write!(
                f,
                "Remote backend not configured. Add server_url and api_key to config."
            ),
            TransportError::Unreachable(e) => write!(f, "Backend unreachable: {}", e),
            TransportError::Status(code) => write!(f, "Backend returned status {}", code),
            TransportError::Decode(e) => write!(f, "Failed to decode payload: {}", e),
            TransportError::InvalidUrl(e) => write!(f, "Invalid server URL: {}", e),
            TransportError::Local(e) => write!(f, "Local store error: {}", e),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<sqlx::Error> for TransportError {
    fn from(e: sqlx::Error) -> Self {
        TransportError::Local(e.to_string())
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => TransportError::Status(status.as_u16()),
            None if e.is_decode() => TransportError::Decode(e.to_string()),
            None => TransportError::Unreachable(e.to_string()),
        }
    }
}

impl From<TransportError> for PersistError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Local(msg) => PersistError::LocalStore(msg),
            other => PersistError::BackendUnavailable(other.to_string()),
        }
    }
}

/// Key under which a trip's collection is stored locally.
pub fn collection_key(trip_id: &TripId, kind: EntityKind) -> String {
    format!("trip:{}:{}", trip_id, kind.segment())
}

/// Local marker key set while a collection's last remote save failed.
pub fn pending_sync_key(trip_id: &TripId, kind: EntityKind) -> String {
    format!("pending_sync:{}", collection_key(trip_id, kind))
}

/// Hosted transactional backend.
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    /// Returns `Ok(None)` when the backend has no collection for this trip yet.
    async fn load(&self, trip_id: &TripId, kind: EntityKind)
        -> Result<Option<Value>, TransportError>;

    async fn save(
        &self,
        trip_id: &TripId,
        kind: EntityKind,
        payload: &Value,
    ) -> Result<(), TransportError>;
}

/// Durable store on the local device.
#[async_trait]
pub trait LocalTransport: Send + Sync {
    async fn load(&self, trip_id: &TripId, kind: EntityKind)
        -> Result<Option<Value>, TransportError>;

    async fn save(
        &self,
        trip_id: &TripId,
        kind: EntityKind,
        payload: &Value,
    ) -> Result<(), TransportError>;

    /// Lists raw keys starting with `prefix`.
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, TransportError>;

    async fn get_raw(&self, key: &str) -> Result<Option<Value>, TransportError>;

    async fn put_raw(&self, key: &str, value: &Value) -> Result<(), TransportError>;

    /// Deletes a raw entry. Returns true if it existed.
    async fn delete_raw(&self, key: &str) -> Result<bool, TransportError>;
}
