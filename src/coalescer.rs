//! Debounced and immediate persistence for one collection stream.
//!
//! Every update replaces the in-memory value right away. A debounced update
//! persists once the stream has been quiet for the configured period; each
//! new update supersedes the pending one. An immediate update persists the
//! latest value before returning. Persist calls of one stream never overlap.

use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use packwise_core::{Collection, PersistError};

/// Capacity of the error channel.
const ERROR_CHANNEL_CAPACITY: usize = 16;

type PersistFn<C> = Arc<dyn Fn(C) -> BoxFuture<'static, Result<(), PersistError>> + Send + Sync>;

struct State<C> {
    value: C,
    /// Bumped on every update; a pending write only fires if it still matches.
    generation: u64,
    dirty: bool,
}

struct Inner<C> {
    state: Mutex<State<C>>,
    gate: tokio::sync::Mutex<()>,
    persist: PersistFn<C>,
    quiet: Duration,
    errors: broadcast::Sender<PersistError>,
}

impl<C: Collection> Inner<C> {
    fn lock(&self) -> MutexGuard<'_, State<C>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn generation(&self) -> u64 {
        self.lock().generation
    }

    fn replace(&self, value: C) -> u64 {
        let mut state = self.lock();
        state.value = value;
        state.generation += 1;
        state.dirty = true;
        state.generation
    }

    /// Persists the current value. Caller must hold the gate.
    async fn write_current(&self) -> Result<(), PersistError> {
        let (value, generation) = {
            let state = self.lock();
            (state.value.clone(), state.generation)
        };

        match (self.persist)(value).await {
            Ok(()) => {
                let mut state = self.lock();
                if state.generation == generation {
                    state.dirty = false;
                }
                Ok(())
            }
            Err(e) => {
                warn!(kind = %C::KIND, error = %e, "Persist failed");
                // No receivers is fine.
                let _ = self.errors.send(e.clone());
                Err(e)
            }
        }
    }
}

pub struct WriteCoalescer<C: Collection> {
    inner: Arc<Inner<C>>,
}

impl<C: Collection> WriteCoalescer<C> {
    pub fn new<F, Fut>(initial: C, quiet: Duration, persist: F) -> Self
    where
        F: Fn(C) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), PersistError>> + Send + 'static,
    {
        let (errors, _) = broadcast::channel(ERROR_CHANNEL_CAPACITY);
        Self::with_error_channel(initial, quiet, persist, errors)
    }

    /// Like [`new`](Self::new), publishing failures on a shared channel.
    pub fn with_error_channel<F, Fut>(
        initial: C,
        quiet: Duration,
        persist: F,
        errors: broadcast::Sender<PersistError>,
    ) -> Self
    where
        F: Fn(C) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), PersistError>> + Send + 'static,
    {
        let persist: PersistFn<C> = Arc::new(move |value| persist(value).boxed());
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    value: initial,
                    generation: 0,
                    dirty: false,
                }),
                gate: tokio::sync::Mutex::new(()),
                persist,
                quiet,
                errors,
            }),
        }
    }

    pub fn snapshot(&self) -> C {
        self.inner.lock().value.clone()
    }

    /// Whether an update has not been persisted yet.
    pub fn is_dirty(&self) -> bool {
        self.inner.lock().dirty
    }

    /// Subscribes to persist failures.
    pub fn errors(&self) -> broadcast::Receiver<PersistError> {
        self.inner.errors.subscribe()
    }

    /// Replaces the in-memory value without scheduling a write.
    pub fn replace_local(&self, value: C) {
        self.inner.lock().value = value;
    }

    /// Replaces the value and persists it after the quiet period.
    ///
    /// Must be called from within a tokio runtime.
    pub fn update(&self, value: C) {
        let generation = self.inner.replace(value);
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            tokio::time::sleep(inner.quiet).await;
            if inner.generation() != generation {
                return;
            }

            let _gate = inner.gate.lock().await;
            // An immediate write or flush may have run while we waited.
            if inner.generation() != generation {
                return;
            }
            debug!(kind = %C::KIND, generation, "Debounced write");
            let _ = inner.write_current().await;
        });
    }

    /// Replaces the value and persists it before returning.
    pub async fn update_immediate(&self, value: C) -> Result<(), PersistError> {
        self.inner.replace(value);
        self.write_now().await
    }

    /// Schedules or performs a write depending on `immediate`.
    pub async fn submit(&self, value: C, immediate: bool) -> Result<(), PersistError> {
        if immediate {
            self.update_immediate(value).await
        } else {
            self.update(value);
            Ok(())
        }
    }

    /// Cancels any pending write and persists the current value.
    pub async fn flush(&self) -> Result<(), PersistError> {
        self.inner.lock().generation += 1;
        self.write_now().await
    }

    /// Final flush on teardown.
    pub async fn close(self) -> Result<(), PersistError> {
        self.flush().await
    }

    async fn write_now(&self) -> Result<(), PersistError> {
        let _gate = self.inner.gate.lock().await;
        self.inner.write_current().await
    }
}

impl<C: Collection> Drop for WriteCoalescer<C> {
    fn drop(&mut self) {
        if !self.is_dirty() {
            return;
        }
        // Dropped without close(): write the last value in the background.
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(kind = %C::KIND, "Dropped with unsaved changes outside a runtime");
            return;
        };

        let inner = Arc::clone(&self.inner);
        inner.lock().generation += 1;
        handle.spawn(async move {
            let _gate = inner.gate.lock().await;
            let _ = inner.write_current().await;
        });
    }
}
