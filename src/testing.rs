//! Test doubles for the storage transports.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use packwise_core::{EntityKind, TripId};

use crate::store::{collection_key, LocalTransport, RemoteTransport, TransportError};

/// In-memory remote backend with switchable failures.
#[derive(Default)]
pub struct FakeRemote {
    data: Mutex<BTreeMap<String, Value>>,
    pub fail_loads: AtomicBool,
    pub fail_saves: AtomicBool,
    /// Drops `assignedGroup` from saved records, like a lossy backend.
    pub strip_groups: AtomicBool,
    pub loads: AtomicUsize,
    pub saves: AtomicUsize,
}

impl FakeRemote {
    pub fn stored(&self, trip_id: &TripId, kind: EntityKind) -> Option<Value> {
        self.data
            .lock()
            .unwrap()
            .get(&collection_key(trip_id, kind))
            .cloned()
    }

    pub fn seed(&self, trip_id: &TripId, kind: EntityKind, payload: Value) {
        self.data
            .lock()
            .unwrap()
            .insert(collection_key(trip_id, kind), payload);
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteTransport for FakeRemote {
    async fn load(
        &self,
        trip_id: &TripId,
        kind: EntityKind,
    ) -> Result<Option<Value>, TransportError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(TransportError::Unreachable("connection refused".into()));
        }
        Ok(self.stored(trip_id, kind))
    }

    async fn save(
        &self,
        trip_id: &TripId,
        kind: EntityKind,
        payload: &Value,
    ) -> Result<(), TransportError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(TransportError::Status(503));
        }

        let mut payload = payload.clone();
        if self.strip_groups.load(Ordering::SeqCst) {
            if let Some(records) = payload.as_array_mut() {
                for record in records.iter_mut().filter_map(Value::as_object_mut) {
                    record.remove("assignedGroup");
                }
            }
        }
        self.seed(trip_id, kind, payload);
        Ok(())
    }
}

/// In-memory local store.
#[derive(Default)]
pub struct MemoryLocal {
    data: Mutex<BTreeMap<String, Value>>,
    pub fail_saves: AtomicBool,
    pub saves: AtomicUsize,
}

impl MemoryLocal {
    pub fn stored(&self, trip_id: &TripId, kind: EntityKind) -> Option<Value> {
        self.data
            .lock()
            .unwrap()
            .get(&collection_key(trip_id, kind))
            .cloned()
    }

    pub fn insert_raw(&self, key: &str, value: Value) {
        self.data.lock().unwrap().insert(key.to_string(), value);
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.lock().unwrap().contains_key(key)
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocalTransport for MemoryLocal {
    async fn load(
        &self,
        trip_id: &TripId,
        kind: EntityKind,
    ) -> Result<Option<Value>, TransportError> {
        Ok(self.stored(trip_id, kind))
    }

    async fn save(
        &self,
        trip_id: &TripId,
        kind: EntityKind,
        payload: &Value,
    ) -> Result<(), TransportError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(TransportError::Local("disk I/O error".into()));
        }
        self.insert_raw(&collection_key(trip_id, kind), payload.clone());
        Ok(())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, TransportError> {
        Ok(self
            .data
            .lock()
            .unwrap()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn get_raw(&self, key: &str) -> Result<Option<Value>, TransportError> {
        Ok(self.data.lock().unwrap().get(key).cloned())
    }

    async fn put_raw(&self, key: &str, value: &Value) -> Result<(), TransportError> {
        self.insert_raw(key, value.clone());
        Ok(())
    }

    async fn delete_raw(&self, key: &str) -> Result<bool, TransportError> {
        Ok(self.data.lock().unwrap().remove(key).is_some())
    }
}
