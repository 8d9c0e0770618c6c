//! Outgoing HTTP response type, the JSON envelopes, and the [`IntoResponse`]
//! conversion trait.
//!
//! Every body this service writes is one of two envelopes:
//!
//! ```text
//! {"success": true,  "message": "...", "data": {...}}
//! {"success": false, "message": "...", "code": "ERR_...", "payload": ...}
//! ```
//!
//! `payload` is omitted when the error carries none.

use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;
use serde::Serialize;
use serde_json::Value;
use tracing::error;

use crate::error::{Error, NormalizedError};

/// Machine code of the response returned when no route matches.
pub const ROUTE_NOT_FOUND_CODE: &str = "ROUTE_NOT_FOUND";

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// ```rust
/// use candidates::Response;
/// use http::StatusCode;
///
/// Response::json(br#"{"id":1}"#.to_vec());
/// Response::status(StatusCode::NO_CONTENT);
///
/// Response::builder()
///     .status(StatusCode::CREATED)
///     .header("location", "/candidates/42")
///     .json(br#"{"id":42}"#.to_vec());
/// ```
#[derive(Debug)]
pub struct Response {
    pub(crate) body: Bytes,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) status: StatusCode,
}

impl Response {
    /// `200 OK`, `application/json`.
    pub fn json(body: Vec<u8>) -> Self {
        Self::builder().json(body)
    }

    /// `200 OK`, `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::builder().text(body)
    }

    /// Response with no body.
    pub fn status(code: StatusCode) -> Self {
        Self { body: Bytes::new(), headers: Vec::new(), status: code }
    }

    /// Builder for responses that need a custom status or extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: Vec::new(), status: StatusCode::OK }
    }

    /// Success envelope: `{"success": true, "message", "data"}`.
    pub fn success<T: Serialize>(
        status: StatusCode,
        message: &str,
        data: T,
    ) -> Result<Self, Error> {
        let envelope = SuccessEnvelope { success: true, message, data };
        let body = serde_json::to_vec(&envelope).map_err(anyhow::Error::from)?;
        Ok(Self::builder().status(status).json(body))
    }

    /// Failure envelope for a normalized error, with the status it carries.
    pub fn failure(err: &NormalizedError) -> Self {
        failure_envelope(err.status(), err.message(), err.code(), err.payload())
    }

    /// The fixed `404` envelope the router answers with when nothing matches.
    pub fn route_not_found() -> Self {
        failure_envelope(StatusCode::NOT_FOUND, "Route not found", ROUTE_NOT_FOUND_CODE, None)
    }

    pub fn status_code(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Sets a header, replacing any existing value under the same name.
    pub fn set_header(&mut self, name: &str, value: &str) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_owned(), value.to_owned()));
    }

    pub(crate) fn into_inner(self) -> http::Response<Full<Bytes>> {
        let mut builder = http::Response::builder().status(self.status);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder.body(Full::new(self.body)).unwrap_or_else(|e| {
            error!("dropping malformed response: {e}");
            let mut fallback = http::Response::new(Full::new(Bytes::new()));
            *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            fallback
        })
    }
}

// ── Envelopes ─────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct SuccessEnvelope<'a, T> {
    success: bool,
    message: &'a str,
    data: T,
}

#[derive(Serialize)]
struct FailureEnvelope<'a> {
    success: bool,
    message: &'a str,
    code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<&'a Value>,
}

fn failure_envelope(
    status: StatusCode,
    message: &str,
    code: &str,
    payload: Option<&Value>,
) -> Response {
    let envelope = FailureEnvelope { success: false, message, code, payload };
    let body = serde_json::to_vec(&envelope).unwrap_or_else(|e| {
        error!(code, "failed to serialise failure envelope: {e}");
        Vec::new()
    });
    Response::builder().status(status).json(body)
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to `200 OK`.
/// Terminated by a typed body method.
pub struct ResponseBuilder {
    headers: Vec<(String, String)>,
    status: StatusCode,
}

impl ResponseBuilder {
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Terminate with a JSON body (`application/json`).
    pub fn json(self, body: Vec<u8>) -> Response {
        self.finish("application/json", body)
    }

    /// Terminate with a plain-text body (`text/plain; charset=utf-8`).
    pub fn text(self, body: impl Into<String>) -> Response {
        self.finish("text/plain; charset=utf-8", body.into().into_bytes())
    }

    fn finish(self, content_type: &str, body: Vec<u8>) -> Response {
        let mut headers = vec![("content-type".to_owned(), content_type.to_owned())];
        headers.extend(self.headers);
        Response { body: Bytes::from(body), headers, status: self.status }
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into an HTTP [`Response`].
///
/// Handlers return `Result<impl IntoResponse, Error>`.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::text(self) }
}

/// Return a bare status from a handler: `Ok(StatusCode::NO_CONTENT)`.
impl IntoResponse for StatusCode {
    fn into_response(self) -> Response { Response::status(self) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, NormalizedError};
    use serde_json::json;

    fn body_json(res: &Response) -> Value {
        serde_json::from_slice(res.body()).unwrap()
    }

    #[test]
    fn success_envelope_shape() {
        let res = Response::success(StatusCode::OK, "ok", json!({"id": "1"})).unwrap();
        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.header("Content-Type"), Some("application/json"));
        assert_eq!(body_json(&res), json!({"success": true, "message": "ok", "data": {"id": "1"}}));
    }

    #[test]
    fn failure_envelope_omits_missing_payload() {
        let err = NormalizedError::new(ErrorKind::NotFound, "ERR_X", "missing");
        let res = Response::failure(&err);
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(&res), json!({"success": false, "message": "missing", "code": "ERR_X"}));
    }

    #[test]
    fn route_not_found_is_fixed() {
        let res = Response::route_not_found();
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(&res)["code"], ROUTE_NOT_FOUND_CODE);
    }

    #[test]
    fn set_header_replaces_case_insensitively() {
        let mut res = Response::json(b"{}".to_vec());
        res.set_header("Content-Type", "application/problem+json");
        assert_eq!(res.headers().len(), 1);
        assert_eq!(res.header("content-type"), Some("application/problem+json"));
    }
}
