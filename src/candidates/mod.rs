//! The candidate resource.
//!
//! ```text
//! controller  ── transport adapter: path params, JSON, validation, envelopes
//!     │
//! service     ── entity operations: get by id, create, delete
//!     │
//! repository  ── storage port
//!     │
//! dynamo      ── DynamoDB adapter (memory: in-process adapter)
//! ```

mod controller;
mod dynamo;
mod memory;
mod repository;
mod service;

pub use controller::CandidateController;
pub use dynamo::{COMPOSITE_KEY_INDEX, DynamoCandidateRepository, shared_client};
pub use memory::MemoryCandidateRepository;
pub use repository::{CandidateRepository, StorageError};
pub use service::{CandidateService, CandidateView, CreateCandidate};

use serde::{Deserialize, Serialize};

/// Actor recorded on records written by the service itself.
pub const SYSTEM_USER: &str = "System";

/// A stored candidate.
///
/// Unique on [`composite_key`](Candidate::composite_key), `{id}#{sheetId}`.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: String,
    pub composite_key: String,
    pub sheet_id: String,
    pub row_id: String,
    pub column_postulant_response_id: String,
    pub column_postulant_date_time_response_id: String,
    pub column_postulant_confirmed_id: String,

    pub created_at: String,
    pub created_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_by: Option<String>,
    pub deleted: bool,
}

/// `{id}#{sheet_id}`.
///
/// Neither part is escaped, so a `#` inside either one makes keys collide:
/// `("a#b", "c")` and `("a", "b#c")` both give `a#b#c`. Stored keys use this
/// exact format, so changing it means rewriting the table.
pub fn composite_key(id: &str, sheet_id: &str) -> String {
    format!("{id}#{sheet_id}")
}
