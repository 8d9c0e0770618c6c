//! Incoming request type and its request-scoped context.

use std::collections::HashMap;

use bytes::Bytes;
use tokio::time::Instant;

/// Values attached to one request as it travels through the middleware stack.
#[derive(Clone, Debug, Default)]
pub struct Context {
    trace_id: Option<String>,
    deadline: Option<Instant>,
}

impl Context {
    /// Correlation identifier set by the trace middleware.
    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    pub fn set_trace_id(&mut self, trace_id: impl Into<String>) {
        self.trace_id = Some(trace_id.into());
    }

    /// Point in time after which storage calls for this request give up.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn set_deadline(&mut self, deadline: Instant) {
        self.deadline = Some(deadline);
    }
}

/// An incoming HTTP request with its body fully buffered.
#[derive(Debug)]
pub struct Request {
    pub(crate) method: String,
    pub(crate) path: String,
    pub(crate) query: Option<String>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Bytes,
    pub(crate) params: HashMap<String, String>,
    pub(crate) context: Context,
}

impl Request {
    /// A request with no headers, no query and an empty body.
    ///
    /// ```rust
    /// use candidates::Request;
    ///
    /// let req = Request::new("POST", "/candidates/")
    ///     .with_header("x-trace-id", "abc")
    ///     .with_body(r#"{"id":"42"}"#);
    /// assert_eq!(req.header("X-Trace-Id"), Some("abc"));
    /// ```
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            query: None,
            headers: Vec::new(),
            body: Bytes::new(),
            params: HashMap::new(),
            context: Context::default(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &str { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn query(&self) -> Option<&str> { self.query.as_deref() }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn params(&self) -> &HashMap<String, String> { &self.params }
    pub fn context(&self) -> &Context { &self.context }
    pub fn context_mut(&mut self) -> &mut Context { &mut self.context }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `candidates/{id}`, `req.param("id")` on `/candidates/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub(crate) fn merge_params(&mut self, captured: HashMap<String, String>) {
        self.params.extend(captured);
    }

    /// Body decoded as UTF-8 for logging; invalid sequences are replaced.
    pub(crate) fn body_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}
