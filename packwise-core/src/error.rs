//! Persistence error taxonomy.

use thiserror::Error;

use crate::collection::EntityKind;

/// Errors surfaced by the persistence layer.
///
/// None of these are fatal: loads degrade to the local cache and saves land
/// in the local store whenever the remote backend is unreachable.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PersistError {
    /// Remote transport failed. The data was handled locally instead.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Post-write verification found a different number of group-assigned records.
    #[error(
        "Persistence integrity mismatch for {kind}: expected {expected} group-assigned record(s), found {found}"
    )]
    PersistenceIntegrityMismatch {
        kind: EntityKind,
        expected: usize,
        found: usize,
    },

    /// A record failed validation. Not retried.
    #[error("Validation rejected: {0}")]
    ValidationRejected(String),

    /// A referenced record no longer exists. The caller should refresh state.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The local durable store itself failed.
    #[error("Local store error: {0}")]
    LocalStore(String),
}

impl PersistError {
    /// Whether retrying the same operation later can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PersistError::BackendUnavailable(_) | PersistError::LocalStore(_)
        )
    }
}
