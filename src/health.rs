//! Liveness and readiness probes.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? Failure → restart. |
//! | **Readiness** | `/readyz` | Can the process serve traffic? Failure → no new requests. |
//!
//! Both are mounted outside the middleware stack: no trace span, no request
//! log line, no security headers. Answers carry `cache-control: no-store`.

use crate::error::Error;
use crate::request::Request;
use crate::response::Response;

/// Always `200 OK` with body `"ok"`.
pub async fn liveness(_req: Request) -> Result<Response, Error> {
    Ok(uncached_text("ok"))
}

/// `200 OK` with body `"ready"`. The router only exists once configuration
/// and storage are in place, so answering at all means ready.
pub async fn readiness(_req: Request) -> Result<Response, Error> {
    Ok(uncached_text("ready"))
}

fn uncached_text(body: &str) -> Response {
    Response::builder().header("cache-control", "no-store").text(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[tokio::test]
    async fn probes_answer_plain_text() {
        let live = liveness(Request::new("GET", "/healthz")).await.unwrap();
        assert_eq!(live.status_code(), StatusCode::OK);
        assert_eq!(live.body(), b"ok");

        let ready = readiness(Request::new("GET", "/readyz")).await.unwrap();
        assert_eq!(ready.body(), b"ready");
        assert_eq!(ready.header("content-type"), Some("text/plain; charset=utf-8"));
        assert_eq!(ready.header("cache-control"), Some("no-store"));
    }
}
