//! Ranked request router.
//!
//! One ranked pattern list per HTTP method. Patterns mix literal segments
//! and `{name}` placeholders:
//!
//! ```text
//! candidates/{id}      GET, DELETE
//! candidates/          POST
//! ```
//!
//! # Ranking
//!
//! Patterns without placeholders are tried before patterns with any; inside
//! each class longer patterns (by character count) come first, and equal
//! lengths keep registration order. The order is computed once, when a route
//! is registered, so every request walks the same list.
//!
//! # Matching
//!
//! For each ranked pattern: exact string equality with the path wins
//! immediately. Otherwise both sides lose their leading/trailing `/`, split
//! on `/`, and must have the same number of segments. Placeholders match any
//! non-empty segment and capture it percent-decoded (a segment that does not
//! decode to UTF-8 fails the match); literals match ASCII case-insensitively.
//! The first matching pattern handles the request. No fallthrough.
//!
//! Unknown methods, methods without routes and unmatched paths all produce
//! the fixed `ROUTE_NOT_FOUND` response. That is an answer, not an error.

use std::collections::HashMap;
use std::sync::Arc;

use matchit::Router as ConflictIndex;

use crate::handler::{BoxedHandler, Handler, HandlerResult};
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;

/// Why a route was refused at registration.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("wildcard segments are not supported")]
    Wildcard,

    #[error(transparent)]
    Pattern(#[from] matchit::InsertError),
}

#[derive(Debug)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

impl Segment {
    fn parse(raw: &str) -> Self {
        match raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(name) => Self::Placeholder(name.to_owned()),
            None => Self::Literal(raw.to_owned()),
        }
    }
}

struct Route {
    pattern: String,
    segments: Vec<Segment>,
    has_placeholders: bool,
    len: usize,
    handler: BoxedHandler,
}

impl Route {
    fn new(pattern: &str, handler: BoxedHandler) -> Self {
        let segments: Vec<Segment> = split(pattern).map(Segment::parse).collect();
        let has_placeholders = segments.iter().any(|s| matches!(s, Segment::Placeholder(_)));
        Self {
            pattern: pattern.to_owned(),
            segments,
            has_placeholders,
            len: pattern.chars().count(),
            handler,
        }
    }

    /// Captured placeholder values on a match.
    fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        if self.pattern == path {
            return Some(HashMap::new());
        }

        let parts: Vec<&str> = split(path).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut captured = HashMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Placeholder(name) if !part.is_empty() => {
                    let value = urlencoding::decode(part).ok()?;
                    captured.insert(name.clone(), value.into_owned());
                }
                Segment::Literal(literal) if literal.eq_ignore_ascii_case(part) => {}
                _ => return None,
            }
        }
        Some(captured)
    }
}

fn split(path: &str) -> std::str::Split<'_, char> {
    path.trim_matches('/').split('/')
}

struct MethodRoutes {
    ranked: Vec<Route>,
    // Normalised shapes already registered, used only to refuse duplicates.
    shapes: ConflictIndex<()>,
}

impl Default for MethodRoutes {
    fn default() -> Self {
        Self { ranked: Vec::new(), shapes: ConflictIndex::new() }
    }
}

impl MethodRoutes {
    fn insert(&mut self, pattern: &str, handler: BoxedHandler) -> Result<(), RouteError> {
        if pattern.contains("{*") {
            return Err(RouteError::Wildcard);
        }
        let shape = format!("/{}", pattern.trim_matches('/').to_lowercase());
        self.shapes.insert(shape, ())?;

        self.ranked.push(Route::new(pattern, handler));
        self.ranked.sort_by(|a, b| {
            a.has_placeholders
                .cmp(&b.has_placeholders)
                .then_with(|| b.len.cmp(&a.len))
        });
        Ok(())
    }
}

/// The application router.
///
/// Build it once at startup; share it behind an `Arc`. Each [`Router::on`]
/// call returns `self` so registrations chain naturally.
#[derive(Default)]
pub struct Router {
    routes: HashMap<Method, MethodRoutes>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a method + pattern pair. Returns `self` for chaining.
    ///
    /// ```rust,no_run
    /// # use candidates::{Error, Method, Request, Response, Router};
    /// # async fn get(_: Request) -> Result<Response, Error> { Ok(Response::text("")) }
    /// # async fn create(_: Request) -> Result<Response, Error> { Ok(Response::text("")) }
    /// Router::new()
    ///     .on(Method::Get,  "candidates/{id}", get)
    ///     .on(Method::Post, "candidates/",     create);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if the pattern duplicates one already registered for `method`
    /// (literals compared case-insensitively, surrounding slashes ignored),
    /// is malformed, or contains a wildcard. A broken route table is a
    /// startup bug.
    pub fn on(mut self, method: Method, pattern: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(pattern, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{method} {pattern}`: {e}"));
        self
    }

    pub(crate) fn lookup(
        &self,
        method: &str,
        path: &str,
    ) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let method: Method = method.parse().ok()?;
        self.routes.get(&method)?.ranked.iter().find_map(|route| {
            route.matches(path).map(|params| (Arc::clone(&route.handler), params))
        })
    }

    /// Routes one request and produces its result.
    ///
    /// Captured placeholders are merged into the request's path parameters
    /// before the handler runs.
    pub async fn dispatch(&self, mut req: Request) -> HandlerResult {
        match self.lookup(req.method(), req.path()) {
            Some((handler, params)) => {
                req.merge_params(params);
                handler.call(req).await
            }
            None => Ok(Response::route_not_found()),
        }
    }
}
