//! Packwise persistence layer.
//!
//! Stores trip collections remotely when a session is active and always
//! keeps a local copy. Edits go through per-collection write coalescers and
//! the shopping list is re-derived from packing items and meals.

pub mod cleanup;
pub mod coalescer;
pub mod config;
pub mod db;
pub mod hybrid;
pub mod logging;
pub mod store;
pub mod templates;
pub mod trip;

#[cfg(test)]
mod testing;

pub use cleanup::{sweep_expired, CleanupTask, Clock, ManualClock, SweepReport, SystemClock};
pub use coalescer::WriteCoalescer;
pub use config::{Config, ConfigError};
pub use hybrid::{HybridStore, Integrity, SaveReport};
pub use store::{
    select_backend, Backend, HttpRemoteStore, LocalTransport, RemoteTransport, SessionSignal,
    SqliteLocalStore, StaticSession, TransportError,
};
pub use templates::{NoTemplates, StaticTemplates, TemplateProvider};
pub use trip::TripSession;

pub use packwise_core::{PersistError, TripId};
