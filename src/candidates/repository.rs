//! Storage port for candidates.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::error;

use super::Candidate;
use crate::error::DomainError;

pub(crate) const CANDIDATE_EXISTS_CODE: &str = "ERR_CANDIDATE_EXISTS";
pub(crate) const CANDIDATE_EXISTS_MESSAGE: &str = "Candidate already exists";
const DATABASE_ERROR_CODE: &str = "DATABASE_ERROR";
const DATABASE_TIMEOUT_CODE: &str = "DATABASE_TIMEOUT";

/// Failures a storage adapter can report.
///
/// The `Display` text may carry backend detail; it is logged, never sent.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Another record already holds this composite key.
    #[error("composite key `{0}` is already taken")]
    Conflict(String),

    /// The request deadline passed before the backend answered.
    #[error("storage deadline exceeded")]
    DeadlineExceeded,

    #[error("id is required for update")]
    MissingId,

    #[error("storage backend: {0}")]
    Backend(#[from] anyhow::Error),
}

impl StorageError {
    /// Logs the raw failure and returns what the caller may see.
    pub(crate) fn into_domain(self, operation: &'static str) -> DomainError {
        match self {
            Self::Conflict(_) => DomainError::conflict(CANDIDATE_EXISTS_CODE, CANDIDATE_EXISTS_MESSAGE),
            Self::MissingId => DomainError::bad_request("VALIDATION_ERROR", "ID is required for update"),
            Self::DeadlineExceeded => {
                error!(operation, "candidate storage timed out");
                DomainError::internal(DATABASE_TIMEOUT_CODE, "Candidate storage timed out")
            }
            Self::Backend(e) => {
                error!(operation, error = ?e, "candidate storage failed");
                DomainError::internal(DATABASE_ERROR_CODE, "Failed to access candidate data")
            }
        }
    }
}

/// Persistence operations the candidate service depends on.
///
/// `Ok(None)` from a lookup means absent, which is not a failure.
#[async_trait]
pub trait CandidateRepository: Send + Sync {
    async fn get_by_id(&self, id: &str) -> Result<Option<Candidate>, StorageError>;

    async fn get_by_composite_key(&self, key: &str) -> Result<Option<Candidate>, StorageError>;

    /// Inserts `candidate` unless its composite key is already stored, in
    /// which case [`StorageError::Conflict`] is returned and nothing changes.
    async fn create(&self, candidate: Candidate) -> Result<(), StorageError>;

    /// Sets the given wire-named fields on the record with `id`.
    ///
    /// An empty `fields` map is a no-op and `null` values are skipped. An
    /// empty `id` is refused with [`StorageError::MissingId`].
    async fn update(&self, id: &str, fields: Map<String, Value>) -> Result<(), StorageError>;

    /// Removes the record with `id`. Removing an absent record succeeds.
    async fn delete(&self, id: &str) -> Result<(), StorageError>;
}
