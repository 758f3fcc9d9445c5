//! Hybrid persistence: remote first when signed in, local cache always.
//!
//! Loads degrade to the local copy and saves always land at least in the
//! local store. A collection whose remote save failed is marked pending;
//! until it reaches the remote again its local copy wins over remote loads.
//! After a successful remote save, packing items are read back and their
//! group assignments counted to catch a lossy backend.

use chrono::Utc;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

use packwise_core::{Collection, DeletedIngredients, EntityKind, PersistError, TripId};

use crate::cleanup::{CleanupTask, Clock, SystemClock};
use crate::config::{CleanupConfig, Config};
use crate::store::{
    pending_sync_key, select_backend, Backend, HttpRemoteStore, LocalTransport, RemoteTransport, SessionSignal,
    SqliteLocalStore, TransportError,
};

/// Number of integrity failures kept for diagnostics.
const INTEGRITY_HISTORY: usize = 32;

/// Result of the post-write check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Integrity {
    /// Not applicable for this kind, disabled, or the read-back failed.
    Skipped,
    Verified,
    Mismatch { expected: usize, found: usize },
}

/// What happened to a successful save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveReport {
    pub backend: Backend,
    /// Whether a remote write was also mirrored into the local store.
    pub mirrored: bool,
    pub integrity: Integrity,
}

impl fmt::Display for SaveReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "saved to {}", self.backend)?;
        if self.mirrored {
            write!(f, " (mirrored locally)")?;
        }
        Ok(())
    }
}

fn local_error(e: TransportError) -> PersistError {
    PersistError::LocalStore(e.to_string())
}

fn decode<C: Collection>(payload: Value) -> Result<C, String> {
    serde_json::from_value(payload).map_err(|e| format!("{}: {}", C::KIND, e))
}

pub struct HybridStore {
    session: Arc<dyn SessionSignal>,
    remote: Option<Arc<dyn RemoteTransport>>,
    local: Arc<dyn LocalTransport>,
    verify_group_assignments: bool,
    integrity_failures: Mutex<VecDeque<PersistError>>,
    cleanup: Mutex<Option<CleanupTask>>,
}

impl HybridStore {
    pub fn new(
        session: Arc<dyn SessionSignal>,
        remote: Option<Arc<dyn RemoteTransport>>,
        local: Arc<dyn LocalTransport>,
    ) -> Self {
        Self {
            session,
            remote,
            local,
            verify_group_assignments: true,
            integrity_failures: Mutex::new(VecDeque::new()),
            cleanup: Mutex::new(None),
        }
    }

    /// Builds a store from config: SQLite at `database_path`, HTTP remote if configured.
    ///
    /// The ephemeral cleanup sweep starts right away on the system clock and
    /// runs until the store is dropped.
    pub async fn from_config(
        config: &Config,
        session: Arc<dyn SessionSignal>,
    ) -> Result<Self, PersistError> {
        let local = SqliteLocalStore::open(&config.database_path.value)
            .await
            .map_err(local_error)?;

        let remote: Option<Arc<dyn RemoteTransport>> = if config.remote.is_configured() {
            let client = HttpRemoteStore::from_config(&config.remote)?;
            Some(Arc::new(client))
        } else {
            None
        };

        let store = Self::new(session, remote, Arc::new(local))
            .with_verification(config.verify_group_assignments);
        store.start_cleanup(Arc::new(SystemClock), &config.cleanup);

        Ok(store)
    }

    pub fn with_verification(mut self, enabled: bool) -> Self {
        self.verify_group_assignments = enabled;
        self
    }

    pub fn local(&self) -> Arc<dyn LocalTransport> {
        Arc::clone(&self.local)
    }

    /// Backend the next operation will try first.
    pub fn backend(&self) -> Backend {
        select_backend(self.session.is_session_active() && self.remote.is_some())
    }

    fn remote_for_session(&self) -> Option<&Arc<dyn RemoteTransport>> {
        match self.backend() {
            Backend::Remote => self.remote.as_ref(),
            Backend::Local => None,
        }
    }

    /// Loads a trip's collection.
    ///
    /// A failed remote read falls back to the local copy without retrying.
    /// A successful one refreshes the local copy, unless the local copy is a
    /// backup of a failed save: then it is pushed to the remote and returned.
    pub async fn load<C: Collection>(&self, trip_id: &TripId) -> Result<C, PersistError> {
        if let Some(remote) = self.remote_for_session() {
            if self.has_pending_sync(trip_id, C::KIND).await {
                return self.push_pending(&**remote, trip_id).await;
            }

            match remote.load(trip_id, C::KIND).await {
                Ok(Some(payload)) => match decode::<C>(payload) {
                    Ok(collection) => {
                        let collection = collection.reconcile();
                        self.mirror(trip_id, &collection).await;
                        return Ok(collection);
                    }
                    Err(e) => warn!(trip = %trip_id, error = %e, "Remote payload unreadable, using local copy"),
                },
                Ok(None) => {
                    debug!(trip = %trip_id, kind = %C::KIND, "No remote collection yet, using local copy")
                }
                Err(e) => {
                    warn!(trip = %trip_id, kind = %C::KIND, error = %e, "Remote load failed, using local copy")
                }
            }
        }

        self.load_local(trip_id).await
    }

    /// Sends the local backup of a collection to the remote again.
    async fn push_pending<C: Collection>(
        &self,
        remote: &dyn RemoteTransport,
        trip_id: &TripId,
    ) -> Result<C, PersistError> {
        let collection: C = self.load_local(trip_id).await?;
        let payload = serde_json::to_value(&collection)
            .map_err(|e| PersistError::LocalStore(e.to_string()))?;

        match remote.save(trip_id, C::KIND, &payload).await {
            Ok(()) => {
                info!(trip = %trip_id, kind = %C::KIND, "Local backup pushed to remote");
                self.clear_pending_sync(trip_id, C::KIND).await;
            }
            Err(e) => {
                warn!(trip = %trip_id, kind = %C::KIND, error = %e, "Local backup still not on remote")
            }
        }
        Ok(collection)
    }

    async fn has_pending_sync(&self, trip_id: &TripId, kind: EntityKind) -> bool {
        match self.local.get_raw(&pending_sync_key(trip_id, kind)).await {
            Ok(marker) => marker.is_some(),
            Err(e) => {
                warn!(trip = %trip_id, %kind, error = %e, "Could not read pending sync marker");
                false
            }
        }
    }

    async fn mark_pending_sync(&self, trip_id: &TripId, kind: EntityKind) {
        let marker = json!({ "since": Utc::now().timestamp_millis() });
        if let Err(e) = self.local.put_raw(&pending_sync_key(trip_id, kind), &marker).await {
            warn!(trip = %trip_id, %kind, error = %e, "Could not mark local backup as pending");
        }
    }

    async fn clear_pending_sync(&self, trip_id: &TripId, kind: EntityKind) {
        if let Err(e) = self.local.delete_raw(&pending_sync_key(trip_id, kind)).await {
            warn!(trip = %trip_id, %kind, error = %e, "Could not clear pending sync marker");
        }
    }

    async fn load_local<C: Collection>(&self, trip_id: &TripId) -> Result<C, PersistError> {
        match self.local.load(trip_id, C::KIND).await.map_err(local_error)? {
            Some(payload) => {
                let collection = decode::<C>(payload).map_err(PersistError::LocalStore)?;
                Ok(collection.reconcile())
            }
            None => Ok(C::default()),
        }
    }

    /// Saves a trip's collection.
    ///
    /// Invalid records are rejected before any I/O. When the remote write
    /// fails the collection is written locally and
    /// [`PersistError::BackendUnavailable`] is returned.
    pub async fn save<C: Collection>(
        &self,
        trip_id: &TripId,
        collection: &C,
    ) -> Result<SaveReport, PersistError> {
        collection
            .validate()
            .map_err(PersistError::ValidationRejected)?;

        let collection = collection.clone().reconcile();
        let payload = serde_json::to_value(&collection)
            .map_err(|e| PersistError::ValidationRejected(e.to_string()))?;

        let Some(remote) = self.remote_for_session() else {
            self.local
                .save(trip_id, C::KIND, &payload)
                .await
                .map_err(local_error)?;
            return Ok(SaveReport {
                backend: Backend::Local,
                mirrored: false,
                integrity: Integrity::Skipped,
            });
        };

        if let Err(e) = remote.save(trip_id, C::KIND, &payload).await {
            warn!(trip = %trip_id, kind = %C::KIND, error = %e, "Remote save failed, kept local backup");
            self.local
                .save(trip_id, C::KIND, &payload)
                .await
                .map_err(local_error)?;
            self.mark_pending_sync(trip_id, C::KIND).await;
            return Err(e.into());
        }

        let mirrored = match self.local.save(trip_id, C::KIND, &payload).await {
            Ok(()) => true,
            Err(e) => {
                warn!(trip = %trip_id, kind = %C::KIND, error = %e, "Failed to mirror remote save locally");
                false
            }
        };
        self.clear_pending_sync(trip_id, C::KIND).await;

        let integrity = self.verify(&**remote, trip_id, &collection).await;

        Ok(SaveReport {
            backend: Backend::Remote,
            mirrored,
            integrity,
        })
    }

    /// Writes a collection to the local store only.
    ///
    /// Used to put back a value after a failed write was rolled back in
    /// memory. A pending remote sync marker is left as it is.
    pub async fn save_local<C: Collection>(
        &self,
        trip_id: &TripId,
        collection: &C,
    ) -> Result<(), PersistError> {
        let collection = collection.clone().reconcile();
        let payload = serde_json::to_value(&collection)
            .map_err(|e| PersistError::ValidationRejected(e.to_string()))?;
        self.local
            .save(trip_id, C::KIND, &payload)
            .await
            .map_err(local_error)
    }

    async fn mirror<C: Collection>(&self, trip_id: &TripId, collection: &C) {
        let payload = match serde_json::to_value(collection) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Failed to encode collection for local mirror");
                return;
            }
        };
        if let Err(e) = self.local.save(trip_id, C::KIND, &payload).await {
            warn!(trip = %trip_id, kind = %C::KIND, error = %e, "Failed to refresh local mirror");
        }
    }

    async fn verify<C: Collection>(
        &self,
        remote: &dyn RemoteTransport,
        trip_id: &TripId,
        written: &C,
    ) -> Integrity {
        if !self.verify_group_assignments {
            return Integrity::Skipped;
        }
        let Some(expected) = written.integrity_weight() else {
            return Integrity::Skipped;
        };

        let read_back = match remote.load(trip_id, C::KIND).await {
            Ok(Some(payload)) => decode::<C>(payload),
            Ok(None) => Ok(C::default()),
            Err(e) => Err(e.to_string()),
        };
        let found = match read_back {
            Ok(collection) => collection.integrity_weight().unwrap_or(0),
            Err(e) => {
                warn!(trip = %trip_id, kind = %C::KIND, error = %e, "Could not read back for verification");
                return Integrity::Skipped;
            }
        };

        if found == expected {
            return Integrity::Verified;
        }

        let failure = PersistError::PersistenceIntegrityMismatch {
            kind: C::KIND,
            expected,
            found,
        };
        error!(trip = %trip_id, "{}", failure);
        self.record_integrity_failure(failure);

        Integrity::Mismatch { expected, found }
    }

    fn record_integrity_failure(&self, failure: PersistError) {
        if let Ok(mut failures) = self.integrity_failures.lock() {
            if failures.len() == INTEGRITY_HISTORY {
                failures.pop_front();
            }
            failures.push_back(failure);
        }
    }

    /// Recent post-write verification failures, oldest first.
    pub fn integrity_failures(&self) -> Vec<PersistError> {
        self.integrity_failures
            .lock()
            .map(|failures| failures.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn load_deleted_ingredients(
        &self,
        trip_id: &TripId,
    ) -> Result<DeletedIngredients, PersistError> {
        self.load(trip_id).await
    }

    pub async fn save_deleted_ingredients(
        &self,
        trip_id: &TripId,
        deleted: &DeletedIngredients,
    ) -> Result<SaveReport, PersistError> {
        self.save(trip_id, deleted).await
    }

    /// Forgets every deleted ingredient of a trip.
    pub async fn clear_deleted_ingredients(
        &self,
        trip_id: &TripId,
    ) -> Result<SaveReport, PersistError> {
        self.save(trip_id, &DeletedIngredients::new()).await
    }

    /// Starts the ephemeral cleanup sweep. Restarts it if already running.
    pub fn start_cleanup(&self, clock: Arc<dyn Clock>, config: &CleanupConfig) {
        let mut task = CleanupTask::new(Arc::clone(&self.local), clock, config);
        task.start();
        if let Ok(mut slot) = self.cleanup.lock() {
            // Dropping the previous task stops it.
            *slot = Some(task);
        }
    }

    pub fn stop_cleanup(&self) {
        if let Ok(mut slot) = self.cleanup.lock() {
            if let Some(mut task) = slot.take() {
                task.stop();
            }
        }
    }

    pub fn is_cleanup_running(&self) -> bool {
        self.cleanup
            .lock()
            .map(|slot| slot.as_ref().map(CleanupTask::is_running).unwrap_or(false))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleanup::ManualClock;
    use crate::store::{EphemeralKind, StaticSession};
    use crate::testing::{FakeRemote, MemoryLocal};
    use packwise_core::{EntityKind, Meal, MealType, PackingCategory, PackingItem};
    use serde_json::json;
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Fixture {
        store: HybridStore,
        session: Arc<StaticSession>,
        remote: Arc<FakeRemote>,
        local: Arc<MemoryLocal>,
    }

    fn fixture(signed_in: bool) -> Fixture {
        let session = Arc::new(if signed_in {
            StaticSession::signed_in("user-1")
        } else {
            StaticSession::signed_out()
        });
        let remote = Arc::new(FakeRemote::default());
        let local = Arc::new(MemoryLocal::default());
        let store = HybridStore::new(
            session.clone(),
            Some(remote.clone() as Arc<dyn RemoteTransport>),
            local.clone(),
        );
        Fixture {
            store,
            session,
            remote,
            local,
        }
    }

    fn trip() -> TripId {
        TripId::new("sierra-loop")
    }

    fn grouped_items() -> Vec<PackingItem> {
        vec![
            PackingItem::new("Tent", PackingCategory::Shelter).with_group("g1"),
            PackingItem::new("Stove", PackingCategory::Kitchen).with_group("g2"),
            PackingItem::new("Headlamp", PackingCategory::Electronics).personal(),
        ]
    }

    #[tokio::test]
    async fn test_signed_out_never_touches_remote() {
        let f = fixture(false);
        let report = f.store.save(&trip(), &grouped_items()).await.unwrap();
        assert_eq!(report.backend, Backend::Local);

        let loaded: Vec<PackingItem> = f.store.load(&trip()).await.unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(f.remote.load_count(), 0);
        assert_eq!(f.remote.save_count(), 0);
    }

    #[tokio::test]
    async fn test_remote_save_mirrors_and_verifies() {
        let f = fixture(true);
        let report = f.store.save(&trip(), &grouped_items()).await.unwrap();

        assert_eq!(
            report,
            SaveReport {
                backend: Backend::Remote,
                mirrored: true,
                integrity: Integrity::Verified,
            }
        );
        assert!(f.remote.stored(&trip(), EntityKind::PackingItems).is_some());
        assert!(f.local.stored(&trip(), EntityKind::PackingItems).is_some());
        assert!(f.store.integrity_failures().is_empty());
    }

    #[tokio::test]
    async fn test_remote_save_failure_keeps_local_backup() {
        let f = fixture(true);
        f.remote.fail_saves.store(true, Ordering::SeqCst);

        let err = f.store.save(&trip(), &grouped_items()).await.unwrap_err();
        assert!(matches!(err, PersistError::BackendUnavailable(_)));
        assert!(err.is_retryable());

        let backup = f.local.stored(&trip(), EntityKind::PackingItems).unwrap();
        assert_eq!(backup.as_array().unwrap().len(), 3);
        assert!(f
            .local
            .contains_key(&pending_sync_key(&trip(), EntityKind::PackingItems)));
    }

    #[tokio::test]
    async fn test_backup_of_failed_save_survives_next_remote_load() {
        let f = fixture(true);
        let first = vec![PackingItem::new("Tent", PackingCategory::Shelter)];
        f.store.save(&trip(), &first).await.unwrap();

        f.remote.fail_saves.store(true, Ordering::SeqCst);
        let mut second = first.clone();
        second.push(PackingItem::new("Stove", PackingCategory::Kitchen));
        f.store.save(&trip(), &second).await.unwrap_err();

        f.remote.fail_saves.store(false, Ordering::SeqCst);
        let loaded: Vec<PackingItem> = f.store.load(&trip()).await.unwrap();
        assert_eq!(loaded, second);

        // The backup went out and the remote copy is current again.
        let remote = f.remote.stored(&trip(), EntityKind::PackingItems).unwrap();
        assert_eq!(remote.as_array().unwrap().len(), 2);
        assert!(!f
            .local
            .contains_key(&pending_sync_key(&trip(), EntityKind::PackingItems)));

        let loads = f.remote.load_count();
        let again: Vec<PackingItem> = f.store.load(&trip()).await.unwrap();
        assert_eq!(again, second);
        assert_eq!(f.remote.load_count(), loads + 1);
    }

    #[tokio::test]
    async fn test_pending_backup_wins_while_remote_rejects_writes() {
        let f = fixture(true);
        f.remote.seed(
            &trip(),
            EntityKind::Meals,
            serde_json::to_value(vec![Meal::new("Stale", 0, MealType::Lunch)]).unwrap(),
        );
        f.remote.fail_saves.store(true, Ordering::SeqCst);
        let meals = vec![Meal::new("Fresh", 0, MealType::Lunch)];
        f.store.save(&trip(), &meals).await.unwrap_err();

        let loaded: Vec<Meal> = f.store.load(&trip()).await.unwrap();
        assert_eq!(loaded, meals);
        assert_eq!(f.remote.save_count(), 2);
        assert!(f
            .local
            .contains_key(&pending_sync_key(&trip(), EntityKind::Meals)));
    }

    #[tokio::test]
    async fn test_save_local_skips_remote() {
        let f = fixture(true);
        f.store.save_local(&trip(), &grouped_items()).await.unwrap();

        assert_eq!(f.remote.save_count(), 0);
        let stored = f.local.stored(&trip(), EntityKind::PackingItems).unwrap();
        assert_eq!(stored.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_remote_load_failure_falls_back_to_local_without_retry() {
        let f = fixture(false);
        f.store.save(&trip(), &grouped_items()).await.unwrap();

        f.session.sign_in("user-1");
        f.remote.fail_loads.store(true, Ordering::SeqCst);

        let loaded: Vec<PackingItem> = f.store.load(&trip()).await.unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(f.remote.load_count(), 1);
    }

    #[tokio::test]
    async fn test_remote_load_refreshes_local_mirror() {
        let f = fixture(true);
        let meals = vec![Meal::new("Chili", 1, MealType::Dinner).with_ingredients(["beans"])];
        f.remote.seed(
            &trip(),
            EntityKind::Meals,
            serde_json::to_value(&meals).unwrap(),
        );

        let loaded: Vec<Meal> = f.store.load(&trip()).await.unwrap();
        assert_eq!(loaded, meals);

        f.session.sign_out();
        let offline: Vec<Meal> = f.store.load(&trip()).await.unwrap();
        assert_eq!(offline, meals);
    }

    #[tokio::test]
    async fn test_missing_remote_collection_uses_local_copy() {
        let f = fixture(false);
        f.store.save(&trip(), &grouped_items()).await.unwrap();
        f.session.sign_in("user-1");

        let loaded: Vec<PackingItem> = f.store.load(&trip()).await.unwrap();
        assert_eq!(loaded.len(), 3);
    }

    #[tokio::test]
    async fn test_integrity_mismatch_is_reported_not_retried() {
        let f = fixture(true);
        f.remote.strip_groups.store(true, Ordering::SeqCst);

        let report = f.store.save(&trip(), &grouped_items()).await.unwrap();
        assert_eq!(
            report.integrity,
            Integrity::Mismatch {
                expected: 2,
                found: 0
            }
        );
        assert_eq!(f.remote.save_count(), 1);
        assert_eq!(
            f.store.integrity_failures(),
            vec![PersistError::PersistenceIntegrityMismatch {
                kind: EntityKind::PackingItems,
                expected: 2,
                found: 0,
            }]
        );
    }

    #[tokio::test]
    async fn test_verification_only_applies_to_packing_items() {
        let f = fixture(true);
        let meals = vec![Meal::new("Oatmeal", 1, MealType::Breakfast).with_group("g1")];

        let report = f.store.save(&trip(), &meals).await.unwrap();
        assert_eq!(report.integrity, Integrity::Skipped);
        assert_eq!(f.remote.load_count(), 0);
    }

    #[tokio::test]
    async fn test_verification_can_be_disabled() {
        let f = fixture(true);
        let store = f.store.with_verification(false);
        f.remote.strip_groups.store(true, Ordering::SeqCst);

        let report = store.save(&trip(), &grouped_items()).await.unwrap();
        assert_eq!(report.integrity, Integrity::Skipped);
        assert!(store.integrity_failures().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_record_rejected_before_io() {
        let f = fixture(true);
        let items = vec![PackingItem::new("  ", PackingCategory::Other)];

        let err = f.store.save(&trip(), &items).await.unwrap_err();
        assert!(matches!(err, PersistError::ValidationRejected(_)));
        assert_eq!(f.remote.save_count(), 0);
        assert_eq!(f.local.save_count(), 0);
    }

    #[tokio::test]
    async fn test_duplicates_collapse_on_save_and_load() {
        let f = fixture(false);
        let mut items = grouped_items();
        items.push(PackingItem::new("tent", PackingCategory::Shelter));

        f.store.save(&trip(), &items).await.unwrap();
        let stored = f.local.stored(&trip(), EntityKind::PackingItems).unwrap();
        assert_eq!(stored.as_array().unwrap().len(), 3);

        // A duplicate written by another tab straight into the store.
        let mut raw = stored.as_array().unwrap().clone();
        raw.push(serde_json::to_value(PackingItem::new("TENT", PackingCategory::Shelter)).unwrap());
        f.local
            .save(&trip(), EntityKind::PackingItems, &Value::Array(raw))
            .await
            .unwrap();

        let loaded: Vec<PackingItem> = f.store.load(&trip()).await.unwrap();
        assert_eq!(loaded.len(), 3);
        let tent = loaded.iter().find(|i| i.name == "Tent").unwrap();
        assert_eq!(tent.assigned_group.as_deref(), Some("g1"));
    }

    #[tokio::test]
    async fn test_local_store_failure_surfaces() {
        let f = fixture(false);
        f.local.fail_saves.store(true, Ordering::SeqCst);

        let err = f.store.save(&trip(), &grouped_items()).await.unwrap_err();
        assert!(matches!(err, PersistError::LocalStore(_)));
    }

    #[tokio::test]
    async fn test_signed_in_without_remote_uses_local() {
        let local = Arc::new(MemoryLocal::default());
        let store = HybridStore::new(Arc::new(StaticSession::signed_in("u")), None, local.clone());

        let report = store.save(&trip(), &grouped_items()).await.unwrap();
        assert_eq!(report.backend, Backend::Local);
        assert!(local.stored(&trip(), EntityKind::PackingItems).is_some());
    }

    #[tokio::test]
    async fn test_deleted_ingredients_round_trip_and_clear() {
        let f = fixture(true);
        let mut deleted = DeletedIngredients::new();
        deleted.insert("Kelp Noodles");

        f.store.save_deleted_ingredients(&trip(), &deleted).await.unwrap();
        let loaded = f.store.load_deleted_ingredients(&trip()).await.unwrap();
        assert!(loaded.contains("kelp noodles"));
        assert_eq!(
            f.remote.stored(&trip(), EntityKind::DeletedIngredients),
            Some(json!(["kelp noodles"]))
        );

        f.store.clear_deleted_ingredients(&trip()).await.unwrap();
        assert!(f.store.load_deleted_ingredients(&trip()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_from_config_uses_sqlite() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, "database_path: data/trips.db\n").unwrap();
        let config = Config::load(Some(config_path)).unwrap();

        let store = HybridStore::from_config(&config, Arc::new(StaticSession::signed_in("u")))
            .await
            .unwrap();
        assert_eq!(store.backend(), Backend::Local);

        store.save(&trip(), &grouped_items()).await.unwrap();
        let loaded: Vec<PackingItem> = store.load(&trip()).await.unwrap();
        assert_eq!(loaded.len(), 3);
        assert!(temp_dir.path().join("data/trips.db").exists());
        assert!(store.is_cleanup_running());
    }

    #[tokio::test]
    async fn test_from_config_sweeps_expired_entries() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("trips.db");
        let seeded = SqliteLocalStore::open(&db_path).await.unwrap();
        let key = seeded
            .put_ephemeral(
                EphemeralKind::Cache,
                "forecast",
                json!({"high": 18}),
                chrono::Utc::now() - chrono::Duration::days(1),
            )
            .await
            .unwrap();
        drop(seeded);

        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, "database_path: trips.db\n").unwrap();
        let config = Config::load(Some(config_path)).unwrap();
        let store = HybridStore::from_config(&config, Arc::new(StaticSession::signed_out()))
            .await
            .unwrap();

        // The first sweep runs at construction, long before the interval.
        let local = store.local();
        for _ in 0..200 {
            if local.get_raw(&key).await.unwrap().is_none() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(local.get_raw(&key).await.unwrap().is_none());

        drop(store);
    }

    #[tokio::test]
    async fn test_cleanup_lifecycle_sweeps_sqlite_store() {
        let temp_dir = TempDir::new().unwrap();
        let sqlite = Arc::new(
            SqliteLocalStore::open(&temp_dir.path().join("local.db"))
                .await
                .unwrap(),
        );
        let clock = Arc::new(ManualClock::new(chrono::Utc::now()));
        let written = clock.now() - chrono::Duration::hours(1);
        let key = sqlite
            .put_ephemeral(EphemeralKind::Temp, "draft", json!({"x": 1}), written)
            .await
            .unwrap();

        let store = HybridStore::new(Arc::new(StaticSession::signed_out()), None, sqlite.clone());
        store.start_cleanup(clock, &CleanupConfig::default());
        assert!(store.is_cleanup_running());

        // The first sweep runs right after start.
        for _ in 0..200 {
            if sqlite.get_raw(&key).await.unwrap().is_none() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(sqlite.get_raw(&key).await.unwrap().is_none());

        store.stop_cleanup();
        assert!(!store.is_cleanup_running());
    }
}
