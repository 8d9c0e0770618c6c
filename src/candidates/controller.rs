//! HTTP adapter for the candidate operations.

use http::StatusCode;
use serde_json::Map;
use tracing::info;

use super::service::{CandidateService, CreateCandidate};
use crate::error::{DomainError, Error};
use crate::request::Request;
use crate::response::Response;
use crate::validation::{Checks, Rule, Trim, Validate, validate_schema};

/// Path id of a get or delete, checked with the rules of that operation.
struct IdParam {
    id: String,
    rules: &'static [Rule],
}

impl Trim for IdParam {
    fn trim_strings(&mut self) {
        self.id.trim_strings();
    }
}

impl Validate for IdParam {
    fn checks(&self, checks: &mut Checks) {
        checks.field("id", Some(self.id.as_str()), self.rules);
    }
}

fn path_id(req: &Request, rules: &'static [Rule]) -> Result<String, DomainError> {
    let id = req
        .param("id")
        .filter(|id| !id.is_empty())
        .ok_or_else(|| DomainError::bad_request("ERR_INVALID_ID", "Invalid ID"))?;

    let mut param = IdParam { id: id.to_owned(), rules };
    validate_schema(&mut param)?;
    Ok(param.id)
}

/// Handlers for `candidates/...` routes. Each answers `200` with the success
/// envelope or fails with an [`Error`] for the error middleware to render.
#[derive(Clone)]
pub struct CandidateController {
    service: CandidateService,
}

impl CandidateController {
    pub fn new(service: CandidateService) -> Self {
        Self { service }
    }

    /// `GET candidates/{id}`
    pub async fn get_by_id(&self, req: Request) -> Result<Response, Error> {
        let id = path_id(&req, &[Rule::NotBlank])?;

        info!(id = %id, "get candidate");
        let view = self.service.get_by_id(req.context(), &id).await?;

        info!(?view, "got candidate");
        Response::success(StatusCode::OK, "Got candidate successfully", view)
    }

    /// `POST candidates/`
    pub async fn create(&self, req: Request) -> Result<Response, Error> {
        let mut input: CreateCandidate = serde_json::from_slice(req.body())
            .map_err(|_| DomainError::bad_request("ERR_INVALID_JSON", "Invalid JSON format"))?;
        validate_schema(&mut input)?;

        info!(?input, "create candidate");
        self.service.create(req.context(), input).await?;

        Response::success(StatusCode::OK, "Create candidate successfully", Map::new())
    }

    /// `DELETE candidates/{id}`
    pub async fn delete(&self, req: Request) -> Result<Response, Error> {
        let id = path_id(&req, &[Rule::Required, Rule::NotBlank])?;

        info!(id = %id, "delete candidate");
        self.service.delete(req.context(), &id).await?;

        Response::success(StatusCode::OK, "Delete candidate successfully", Map::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidates::MemoryCandidateRepository;
    use crate::error::ErrorKind;
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn controller() -> CandidateController {
        let repo = Arc::new(MemoryCandidateRepository::new("candidates"));
        CandidateController::new(CandidateService::new(repo, chrono_tz::UTC))
    }

    fn with_id(method: &str, id: &str) -> Request {
        let mut req = Request::new(method, format!("/candidates/{id}"));
        req.merge_params(HashMap::from([("id".to_owned(), id.to_owned())]));
        req
    }

    fn domain(err: Error) -> DomainError {
        match err {
            Error::Domain(e) => e,
            other => panic!("expected a domain error, got {other:?}"),
        }
    }

    fn body(res: &Response) -> Value {
        serde_json::from_slice(res.body()).unwrap()
    }

    const VALID: &str = r#"{
        "id": " c1 ",
        "sheetId": "s1",
        "rowId": "3",
        "columnPostulantResponseId": "r",
        "columnPostulantDateTimeResponseId": "d",
        "columnPostulantConfirmedId": "k"
    }"#;

    #[tokio::test]
    async fn create_then_get() {
        let ctl = controller();

        let res = ctl.create(Request::new("POST", "/candidates/").with_body(VALID)).await.unwrap();
        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(
            body(&res),
            json!({"success": true, "message": "Create candidate successfully", "data": {}}),
        );

        let res = ctl.get_by_id(with_id("GET", "c1")).await.unwrap();
        let body = body(&res);
        assert_eq!(body["message"], "Got candidate successfully");
        assert_eq!(body["data"]["id"], "c1");
        assert_eq!(body["data"]["columnPostulantConfirmedId"], "k");
    }

    #[tokio::test]
    async fn missing_path_id_is_invalid_id() {
        let err = domain(controller().get_by_id(Request::new("GET", "/candidates/")).await.unwrap_err());
        assert_eq!(err.code(), "ERR_INVALID_ID");
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }

    #[tokio::test]
    async fn blank_path_id_fails_validation() {
        let err = domain(controller().delete(with_id("DELETE", "   ")).await.unwrap_err());
        assert_eq!(err.code(), "ERR_INVALID_PAYLOAD");
        assert_eq!(err.payload().unwrap()[0]["message"], "validation failed on 'required' constraint");

        let err = domain(controller().get_by_id(with_id("GET", "\t")).await.unwrap_err());
        assert_eq!(err.payload().unwrap()[0]["message"], "validation failed on 'notblank' constraint");
    }

    #[tokio::test]
    async fn malformed_json_is_invalid_json() {
        let err = domain(
            controller()
                .create(Request::new("POST", "/candidates/").with_body("{not json"))
                .await
                .unwrap_err(),
        );
        assert_eq!(err.code(), "ERR_INVALID_JSON");
        assert_eq!(err.message(), "Invalid JSON format");
    }

    #[tokio::test]
    async fn missing_fields_are_reported_by_name() {
        let err = domain(
            controller()
                .create(Request::new("POST", "/candidates/").with_body(r#"{"id":"c1","sheetId":"  "}"#))
                .await
                .unwrap_err(),
        );

        assert_eq!(err.code(), "ERR_INVALID_PAYLOAD");
        let keys: Vec<&str> = err.payload().unwrap().as_array().unwrap()
            .iter()
            .map(|issue| issue["key"].as_str().unwrap())
            .collect();
        assert_eq!(
            keys,
            ["sheetId", "rowId", "columnPostulantResponseId", "columnPostulantDateTimeResponseId", "columnPostulantConfirmedId"],
        );
    }
}
