//! Storage backends and backend selection.

pub mod local;
pub mod remote;
pub mod session;
pub mod transport;

use std::fmt;

pub use local::{EphemeralKind, SqliteLocalStore, CACHE_PREFIX, TEMP_PREFIX, TIMESTAMP_FIELD};
pub use remote::{check_server, HttpRemoteStore};
pub use session::{SessionSignal, StaticSession};
pub use transport::{
    collection_key, pending_sync_key, LocalTransport, RemoteTransport, TransportError,
};

/// Which store an operation targets first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Remote,
    Local,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Remote => write!(f, "remote"),
            Backend::Local => write!(f, "local"),
        }
    }
}

/// Picks the backend for the current session state.
pub fn select_backend(session_active: bool) -> Backend {
    if session_active {
        Backend::Remote
    } else {
        Backend::Local
    }
}
