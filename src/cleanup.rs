//! Periodic removal of expired ephemeral entries.
//!
//! Ephemeral entries live under `temp_`/`cache_` keys in the local store and
//! carry the time they were written. A sweep deletes those older than the
//! retention window. Canonical collections are never touched.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::CleanupConfig;
use crate::store::{LocalTransport, TransportError, CACHE_PREFIX, TEMP_PREFIX, TIMESTAMP_FIELD};

/// Shortest sweep interval accepted by [`CleanupTask`].
const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Source of the current wall-clock time for sweeps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        if let Ok(mut guard) = self.now.lock() {
            *guard += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub removed: usize,
    /// Entries left alone because their timestamp was missing or unreadable.
    pub skipped: usize,
}

fn entry_timestamp(value: &Value) -> Option<i64> {
    value.get(TIMESTAMP_FIELD).and_then(Value::as_i64)
}

/// Deletes ephemeral entries written more than `retention` before `now`.
pub async fn sweep_expired(
    local: &dyn LocalTransport,
    now: DateTime<Utc>,
    retention: Duration,
) -> Result<SweepReport, TransportError> {
    // A window too large for i64 milliseconds keeps everything.
    let retention_ms = i64::try_from(retention.as_millis()).unwrap_or(i64::MAX);
    let cutoff = now.timestamp_millis().saturating_sub(retention_ms);
    let mut report = SweepReport::default();

    for prefix in [TEMP_PREFIX, CACHE_PREFIX] {
        for key in local.keys_with_prefix(prefix).await? {
            report.scanned += 1;

            let timestamp = match local.get_raw(&key).await {
                Ok(Some(value)) => entry_timestamp(&value),
                Ok(None) => continue,
                Err(e) => {
                    debug!(key = %key, error = %e, "Unreadable ephemeral entry");
                    None
                }
            };

            match timestamp {
                Some(written) if written < cutoff => {
                    if local.delete_raw(&key).await? {
                        report.removed += 1;
                    }
                }
                Some(_) => {}
                None => report.skipped += 1,
            }
        }
    }

    Ok(report)
}

/// Background sweep with an explicit lifecycle.
///
/// The first sweep runs as soon as the task starts, then once per interval
/// until [`stop`](Self::stop) is called or the task is dropped.
pub struct CleanupTask {
    local: Arc<dyn LocalTransport>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    retention: Duration,
    handle: Option<JoinHandle<()>>,
}

impl CleanupTask {
    pub fn new(
        local: Arc<dyn LocalTransport>,
        clock: Arc<dyn Clock>,
        config: &CleanupConfig,
    ) -> Self {
        Self {
            local,
            clock,
            interval: config.interval().max(MIN_INTERVAL),
            retention: config.retention(),
            handle: None,
        }
    }

    /// Spawns the sweep loop. Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }

        let local = Arc::clone(&self.local);
        let clock = Arc::clone(&self.clock);
        let period = self.interval;
        let retention = self.retention;

        info!(
            interval_secs = period.as_secs(),
            retention_secs = retention.as_secs(),
            "Starting ephemeral cleanup"
        );

        self.handle = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                match sweep_expired(local.as_ref(), clock.now(), retention).await {
                    Ok(report) if report.removed > 0 => {
                        info!(removed = report.removed, scanned = report.scanned, "Removed expired entries");
                    }
                    Ok(report) => debug!(scanned = report.scanned, "Cleanup sweep found nothing to remove"),
                    Err(e) => warn!(error = %e, "Cleanup sweep failed"),
                }
            }
        }));
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("Stopped ephemeral cleanup");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for CleanupTask {
    fn drop(&mut self) {
        self.stop();
    }
}
