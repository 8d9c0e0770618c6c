//! Error model.
//!
//! A handler can fail with three shapes of error:
//!
//! - a [`DomainError`] raised by the entity operations or the validation
//!   layer, carrying an [`ErrorKind`], a stable machine code, a message and an
//!   optional structured payload;
//! - a [`NormalizedError`] that already knows its HTTP status;
//! - anything else (I/O, serialisation, an [`anyhow::Error`] from a
//!   collaborator).
//!
//! [`classify`] collapses all three into one [`NormalizedError`]. It is total:
//! every [`Error`] maps to exactly one normalized value and nothing here can
//! panic. Only the error middleware turns that value into a response body.

use std::borrow::Cow;

use http::StatusCode;
use serde::Serialize;
use serde_json::Value;

/// Machine code used when an error carries no classification of its own.
pub const GENERIC_ERROR_CODE: &str = "GENERIC_ERROR";

const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Convenience alias used by handlers and services.
pub type Result<T, E = Error> = std::result::Result<T, E>;

// ── ErrorKind ─────────────────────────────────────────────────────────────────

/// Classification of a failure, independent of the transport.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    NotAllowed,
    UnsupportedContentType,
    UnprocessableEntity,
    Conflict,
    Internal,
}

impl ErrorKind {
    /// Wire name of the kind (e.g. `"NOT_FOUND"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BadRequest             => "BAD_REQUEST",
            Self::Unauthorized           => "UNAUTHORIZED",
            Self::Forbidden              => "FORBIDDEN",
            Self::NotFound               => "NOT_FOUND",
            Self::NotAllowed             => "NOT_ALLOWED",
            Self::UnsupportedContentType => "UNSUPPORTED_CONTENT_TYPE",
            Self::UnprocessableEntity    => "UNPROCESSABLE_ENTITY",
            Self::Conflict               => "CONFLICT",
            Self::Internal               => "INTERNAL",
        }
    }

    /// Static kind → status table. Kinds outside the client-error table
    /// resolve to `500 Internal Server Error`.
    pub fn status(self) -> StatusCode {
        match self {
            Self::BadRequest             => StatusCode::BAD_REQUEST,
            Self::Unauthorized           => StatusCode::UNAUTHORIZED,
            Self::Forbidden              => StatusCode::FORBIDDEN,
            Self::NotFound               => StatusCode::NOT_FOUND,
            Self::NotAllowed             => StatusCode::METHOD_NOT_ALLOWED,
            Self::UnsupportedContentType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::UnprocessableEntity    => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Conflict               => StatusCode::CONFLICT,
            Self::Internal               => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── DomainError ───────────────────────────────────────────────────────────────

/// A classified failure raised below the transport layer.
#[derive(Clone, Debug, thiserror::Error)]
#[error("{code}: {message}")]
pub struct DomainError {
    kind: ErrorKind,
    code: Cow<'static, str>,
    message: Cow<'static, str>,
    payload: Option<Value>,
}

impl DomainError {
    pub fn new(
        kind: ErrorKind,
        code: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self { kind, code: code.into(), message: message.into(), payload: None }
    }

    pub fn bad_request(
        code: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::new(ErrorKind::BadRequest, code, message)
    }

    pub fn not_found(
        code: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::new(ErrorKind::NotFound, code, message)
    }

    pub fn conflict(
        code: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::new(ErrorKind::Conflict, code, message)
    }

    pub fn internal(
        code: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::new(ErrorKind::Internal, code, message)
    }

    /// Attach a structured payload (e.g. field-level validation issues).
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn kind(&self) -> ErrorKind { self.kind }
    pub fn code(&self) -> &str { &self.code }
    pub fn message(&self) -> &str { &self.message }
    pub fn payload(&self) -> Option<&Value> { self.payload.as_ref() }
}

// ── NormalizedError ───────────────────────────────────────────────────────────

/// The single error shape seen at the transport boundary.
#[derive(Clone, Debug, thiserror::Error)]
#[error("{status} {code}: {message}")]
pub struct NormalizedError {
    status: StatusCode,
    kind: ErrorKind,
    code: Cow<'static, str>,
    message: Cow<'static, str>,
    payload: Option<Value>,
}

impl NormalizedError {
    /// Builds a normalized error whose status comes from the kind table.
    pub fn new(
        kind: ErrorKind,
        code: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            status: kind.status(),
            kind,
            code: code.into(),
            message: message.into(),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    fn generic() -> Self {
        Self::new(ErrorKind::BadRequest, GENERIC_ERROR_CODE, GENERIC_ERROR_MESSAGE)
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn kind(&self) -> ErrorKind { self.kind }
    pub fn code(&self) -> &str { &self.code }
    pub fn message(&self) -> &str { &self.message }
    pub fn payload(&self) -> Option<&Value> { self.payload.as_ref() }
}

impl From<DomainError> for NormalizedError {
    fn from(e: DomainError) -> Self {
        Self {
            status: e.kind.status(),
            kind: e.kind,
            code: e.code,
            message: e.message,
            payload: e.payload,
        }
    }
}

// ── Error ─────────────────────────────────────────────────────────────────────

/// Every way a handler can fail.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Normalized(#[from] NormalizedError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Collapses any [`Error`] into its [`NormalizedError`].
///
/// Classified and already-normalized errors keep their code, message and
/// payload. Everything else becomes a `400` with [`GENERIC_ERROR_CODE`]; the
/// underlying detail is left for the caller to log and never reaches the
/// normalized message.
pub fn classify(err: &Error) -> NormalizedError {
    match err {
        Error::Domain(e) => e.clone().into(),
        Error::Normalized(e) => e.clone(),
        Error::Io(_) | Error::Other(_) => NormalizedError::generic(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn not_found_keeps_code_and_maps_to_404() {
        let err = Error::from(DomainError::not_found("ERR_CANDIDATE_NOT_FOUND", "Candidate not found"));
        let normalized = classify(&err);

        assert_eq!(normalized.status(), StatusCode::NOT_FOUND);
        assert_eq!(normalized.code(), "ERR_CANDIDATE_NOT_FOUND");
        assert_eq!(normalized.message(), "Candidate not found");
    }

    #[test]
    fn unclassified_error_falls_back_to_generic_bad_request() {
        let err = Error::from(anyhow::anyhow!("socket closed by peer at 10.0.0.7"));
        let normalized = classify(&err);

        assert_eq!(normalized.status(), StatusCode::BAD_REQUEST);
        assert_eq!(normalized.code(), GENERIC_ERROR_CODE);
        assert!(!normalized.message().contains("10.0.0.7"));
    }

    #[test]
    fn io_error_is_generic() {
        let err = Error::from(std::io::Error::other("disk"));
        assert_eq!(classify(&err).code(), GENERIC_ERROR_CODE);
    }

    #[test]
    fn normalized_error_passes_through_unchanged() {
        let original = NormalizedError::new(ErrorKind::Forbidden, "ERR_SCOPE", "nope")
            .with_payload(json!({"scope": "admin"}));
        let normalized = classify(&Error::from(original));

        assert_eq!(normalized.status(), StatusCode::FORBIDDEN);
        assert_eq!(normalized.code(), "ERR_SCOPE");
        assert_eq!(normalized.payload(), Some(&json!({"scope": "admin"})));
    }

    #[test]
    fn domain_payload_survives_classification() {
        let issues = json!([{"key": "sheetId", "message": "validation failed on 'required' constraint"}]);
        let err = DomainError::bad_request("ERR_INVALID_PAYLOAD", "Invalid payload supplied")
            .with_payload(issues.clone());

        let normalized = classify(&err.into());
        assert_eq!(normalized.status(), StatusCode::BAD_REQUEST);
        assert_eq!(normalized.payload(), Some(&issues));
    }

    #[test]
    fn kind_table() {
        let table = [
            (ErrorKind::BadRequest, 400),
            (ErrorKind::Unauthorized, 401),
            (ErrorKind::Forbidden, 403),
            (ErrorKind::NotFound, 404),
            (ErrorKind::NotAllowed, 405),
            (ErrorKind::UnsupportedContentType, 415),
            (ErrorKind::UnprocessableEntity, 422),
            (ErrorKind::Conflict, 409),
            (ErrorKind::Internal, 500),
        ];
        for (kind, status) in table {
            assert_eq!(kind.status().as_u16(), status, "{kind}");
        }
    }
}
