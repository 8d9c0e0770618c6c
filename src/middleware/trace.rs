//! Trace-id propagation.
//!
//! Reuses the caller's `x-trace-id` when present and non-blank, otherwise
//! generates a UUID v4. The id is stored on the request [`Context`] and the
//! rest of the stack runs inside a `request` span carrying it, so every log
//! line below this middleware is correlated.
//!
//! [`Context`]: crate::request::Context

use std::sync::Arc;

use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler};
use crate::middleware::Middleware;
use crate::request::Request;

/// Header carrying the caller-supplied trace identifier.
pub const TRACE_ID_HEADER: &str = "x-trace-id";

/// Trace-id middleware. Never fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct Trace;

impl Middleware for Trace {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(TraceHandler { next })
    }
}

struct TraceHandler {
    next: BoxedHandler,
}

impl ErasedHandler for TraceHandler {
    fn call(&self, mut req: Request) -> BoxFuture {
        let trace_id = extract_or_generate(&req);
        let span = info_span!("request", trace_id = %trace_id);
        span.in_scope(|| info!("trace id: {trace_id}"));

        req.context_mut().set_trace_id(trace_id);
        Box::pin(self.next.call(req).instrument(span))
    }
}

fn extract_or_generate(req: &Request) -> String {
    match req.header(TRACE_ID_HEADER) {
        Some(id) if !id.trim().is_empty() => id.to_owned(),
        _ => Uuid::new_v4().to_string(),
    }
}
