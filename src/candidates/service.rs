//! Entity operations on candidates.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::repository::{CANDIDATE_EXISTS_CODE, CANDIDATE_EXISTS_MESSAGE, CandidateRepository, StorageError};
use super::{Candidate, SYSTEM_USER, composite_key};
use crate::error::DomainError;
use crate::request::Context;
use crate::validation::{Checks, Rule, Trim, Validate};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Body of a create request.
///
/// Missing fields default to empty strings so validation, not parsing,
/// reports them.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateCandidate {
    pub id: String,
    pub sheet_id: String,
    pub row_id: String,
    pub column_postulant_response_id: String,
    pub column_postulant_date_time_response_id: String,
    pub column_postulant_confirmed_id: String,
}

impl Trim for CreateCandidate {
    fn trim_strings(&mut self) {
        self.id.trim_strings();
        self.sheet_id.trim_strings();
        self.row_id.trim_strings();
        self.column_postulant_response_id.trim_strings();
        self.column_postulant_date_time_response_id.trim_strings();
        self.column_postulant_confirmed_id.trim_strings();
    }
}

impl Validate for CreateCandidate {
    fn checks(&self, checks: &mut Checks) {
        const RULES: &[Rule] = &[Rule::Required, Rule::NotBlank];
        checks
            .field("id", Some(self.id.as_str()), RULES)
            .field("sheetId", Some(self.sheet_id.as_str()), RULES)
            .field("rowId", Some(self.row_id.as_str()), RULES)
            .field("columnPostulantResponseId", Some(self.column_postulant_response_id.as_str()), RULES)
            .field("columnPostulantDateTimeResponseId", Some(self.column_postulant_date_time_response_id.as_str()), RULES)
            .field("columnPostulantConfirmedId", Some(self.column_postulant_confirmed_id.as_str()), RULES);
    }
}

/// What a lookup returns to callers.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateView {
    pub id: String,
    pub sheet_id: String,
    pub column_postulant_response_id: String,
    pub column_postulant_date_time_response_id: String,
    pub column_postulant_confirmed_id: String,
}

impl From<Candidate> for CandidateView {
    fn from(c: Candidate) -> Self {
        Self {
            id: c.id,
            sheet_id: c.sheet_id,
            column_postulant_response_id: c.column_postulant_response_id,
            column_postulant_date_time_response_id: c.column_postulant_date_time_response_id,
            column_postulant_confirmed_id: c.column_postulant_confirmed_id,
        }
    }
}

/// Get, create and delete over a [`CandidateRepository`].
///
/// Every storage call is bounded by the request deadline when the
/// [`Context`] carries one.
#[derive(Clone)]
pub struct CandidateService {
    repository: Arc<dyn CandidateRepository>,
    time_zone: Tz,
}

impl CandidateService {
    pub fn new(repository: Arc<dyn CandidateRepository>, time_zone: Tz) -> Self {
        Self { repository, time_zone }
    }

    pub async fn get_by_id(&self, ctx: &Context, id: &str) -> Result<CandidateView, DomainError> {
        let found = bounded(ctx, "get_by_id", self.repository.get_by_id(id)).await?;
        found
            .map(CandidateView::from)
            .ok_or_else(|| DomainError::not_found("ERR_CANDIDATE_NOT_FOUND", "Candidate not found"))
    }

    /// Stores a new candidate unless one with the same `{id}#{sheetId}`
    /// already exists.
    pub async fn create(&self, ctx: &Context, input: CreateCandidate) -> Result<(), DomainError> {
        let key = composite_key(&input.id, &input.sheet_id);

        let existing = bounded(ctx, "get_by_composite_key", self.repository.get_by_composite_key(&key)).await?;
        if existing.is_some() {
            warn!(composite_key = %key, "candidate already exists");
            return Err(DomainError::conflict(CANDIDATE_EXISTS_CODE, CANDIDATE_EXISTS_MESSAGE));
        }

        let candidate = Candidate {
            id: input.id,
            composite_key: key,
            sheet_id: input.sheet_id,
            row_id: input.row_id,
            column_postulant_response_id: input.column_postulant_response_id,
            column_postulant_date_time_response_id: input.column_postulant_date_time_response_id,
            column_postulant_confirmed_id: input.column_postulant_confirmed_id,
            created_at: self.now(),
            created_by: SYSTEM_USER.to_owned(),
            updated_at: None,
            updated_by: None,
            deleted_at: None,
            deleted_by: None,
            deleted: false,
        };
        bounded(ctx, "create", self.repository.create(candidate)).await
    }

    /// Removes the candidate. An unknown id is not an error.
    pub async fn delete(&self, ctx: &Context, id: &str) -> Result<(), DomainError> {
        bounded(ctx, "delete", self.repository.delete(id)).await
    }

    fn now(&self) -> String {
        local_timestamp(Utc::now(), self.time_zone)
    }
}

fn local_timestamp(at: DateTime<Utc>, zone: Tz) -> String {
    at.with_timezone(&zone).format(TIMESTAMP_FORMAT).to_string()
}

async fn bounded<T>(
    ctx: &Context,
    operation: &'static str,
    call: impl Future<Output = Result<T, StorageError>>,
) -> Result<T, DomainError> {
    let result = match ctx.deadline() {
        Some(deadline) => tokio::time::timeout_at(deadline, call)
            .await
            .unwrap_or(Err(StorageError::DeadlineExceeded)),
        None => call.await,
    };
    result.map_err(|e| e.into_domain(operation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidates::MemoryCandidateRepository;
    use crate::error::ErrorKind;
    use async_trait::async_trait;
    use chrono::NaiveDateTime;
    use serde_json::{Map, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::Instant;

    /// Wraps the in-memory store and counts `create` calls.
    #[derive(Default)]
    struct Counting {
        inner: MemoryCandidateRepository,
        creates: AtomicUsize,
        stall: Option<Duration>,
    }

    #[async_trait]
    impl CandidateRepository for Counting {
        async fn get_by_id(&self, id: &str) -> Result<Option<Candidate>, StorageError> {
            if let Some(stall) = self.stall {
                tokio::time::sleep(stall).await;
            }
            self.inner.get_by_id(id).await
        }

        async fn get_by_composite_key(&self, key: &str) -> Result<Option<Candidate>, StorageError> {
            self.inner.get_by_composite_key(key).await
        }

        async fn create(&self, candidate: Candidate) -> Result<(), StorageError> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            self.inner.create(candidate).await
        }

        async fn update(&self, id: &str, fields: Map<String, Value>) -> Result<(), StorageError> {
            self.inner.update(id, fields).await
        }

        async fn delete(&self, id: &str) -> Result<(), StorageError> {
            self.inner.delete(id).await
        }
    }

    struct Broken;

    #[async_trait]
    impl CandidateRepository for Broken {
        async fn get_by_id(&self, _: &str) -> Result<Option<Candidate>, StorageError> {
            Err(anyhow::anyhow!("ResourceNotFoundException: table candidates-dev").into())
        }
        async fn get_by_composite_key(&self, _: &str) -> Result<Option<Candidate>, StorageError> {
            Err(anyhow::anyhow!("throttled").into())
        }
        async fn create(&self, _: Candidate) -> Result<(), StorageError> {
            Err(anyhow::anyhow!("throttled").into())
        }
        async fn update(&self, _: &str, _: Map<String, Value>) -> Result<(), StorageError> {
            Err(anyhow::anyhow!("throttled").into())
        }
        async fn delete(&self, _: &str) -> Result<(), StorageError> {
            Err(anyhow::anyhow!("throttled").into())
        }
    }

    fn lima() -> Tz {
        chrono_tz::America::Lima
    }

    fn input(id: &str, sheet: &str) -> CreateCandidate {
        CreateCandidate {
            id: id.to_owned(),
            sheet_id: sheet.to_owned(),
            row_id: "7".to_owned(),
            column_postulant_response_id: "c-resp".to_owned(),
            column_postulant_date_time_response_id: "c-dt".to_owned(),
            column_postulant_confirmed_id: "c-conf".to_owned(),
        }
    }

    #[tokio::test]
    async fn create_stamps_audit_fields() {
        let repo = Arc::new(Counting::default());
        let service = CandidateService::new(repo.clone(), lima());

        service.create(&Context::default(), input("c1", "s1")).await.unwrap();

        let stored = repo.inner.get_by_id("c1").await.unwrap().unwrap();
        assert_eq!(stored.composite_key, "c1#s1");
        assert_eq!(stored.created_by, "System");
        assert!(!stored.deleted);
        assert!(NaiveDateTime::parse_from_str(&stored.created_at, TIMESTAMP_FORMAT).is_ok());
    }

    #[test]
    fn timestamps_follow_daylight_saving() {
        let madrid = chrono_tz::Europe::Madrid;
        let winter = "2025-01-15T12:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let summer = "2025-07-15T12:00:00Z".parse::<DateTime<Utc>>().unwrap();

        assert_eq!(local_timestamp(winter, madrid), "2025-01-15 13:00:00");
        assert_eq!(local_timestamp(summer, madrid), "2025-07-15 14:00:00");
        assert_eq!(local_timestamp(summer, lima()), "2025-07-15 07:00:00");
    }

    #[tokio::test]
    async fn duplicate_create_conflicts_without_calling_create() {
        let repo = Arc::new(Counting::default());
        let service = CandidateService::new(repo.clone(), lima());
        let ctx = Context::default();

        service.create(&ctx, input("c1", "s1")).await.unwrap();
        let err = service.create(&ctx, input("c1", "s1")).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.code(), "ERR_CANDIDATE_EXISTS");
        assert_eq!(repo.creates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn get_by_id_projects_view() {
        let service = CandidateService::new(Arc::new(Counting::default()), lima());
        let ctx = Context::default();
        service.create(&ctx, input("c1", "s1")).await.unwrap();

        let view = service.get_by_id(&ctx, "c1").await.unwrap();
        assert_eq!(
            serde_json::to_value(&view).unwrap(),
            serde_json::json!({
                "id": "c1",
                "sheetId": "s1",
                "columnPostulantResponseId": "c-resp",
                "columnPostulantDateTimeResponseId": "c-dt",
                "columnPostulantConfirmedId": "c-conf",
            }),
        );
    }

    #[tokio::test]
    async fn missing_candidate_is_not_found() {
        let service = CandidateService::new(Arc::new(Counting::default()), lima());
        let err = service.get_by_id(&Context::default(), "nope").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.code(), "ERR_CANDIDATE_NOT_FOUND");
    }

    #[tokio::test]
    async fn storage_failure_is_not_not_found() {
        let service = CandidateService::new(Arc::new(Broken), lima());
        let err = service.get_by_id(&Context::default(), "c1").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.code(), "DATABASE_ERROR");
        assert!(!err.message().contains("candidates-dev"));
    }

    #[tokio::test]
    async fn delete_of_unknown_id_succeeds() {
        let service = CandidateService::new(Arc::new(Counting::default()), lima());
        service.delete(&Context::default(), "ghost").await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn storage_call_gives_up_at_deadline() {
        let repo = Counting { stall: Some(Duration::from_secs(60)), ..Counting::default() };
        let service = CandidateService::new(Arc::new(repo), lima());

        let mut ctx = Context::default();
        ctx.set_deadline(Instant::now() + Duration::from_secs(1));

        let err = service.get_by_id(&ctx, "c1").await.unwrap_err();
        assert_eq!(err.code(), "DATABASE_TIMEOUT");
    }
}
