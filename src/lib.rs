//! # candidates
//!
//! A CRUD service for recruiting candidates, built on a small ranked router
//! with composable middleware and one error model.
//!
//! ## Request path
//!
//! ```text
//! hyper ─► Server ─► Router ─► Trace ─► Base ─► ErrorTranslation ─► CandidateController
//!                      │                                                    │
//!                      └─ no match: 404 ROUTE_NOT_FOUND                     ▼
//!                                                                   CandidateService
//!                                                                           │
//!                                                                   CandidateRepository
//!                                                                           │
//!                                                                DynamoDB or in-process table
//! ```
//!
//! - [`Router`]: per-method pattern lists, static before placeholder, longer
//!   before shorter, ranked once at registration.
//! - [`middleware`]: `[Trace, Base, ErrorTranslation]`, first is outermost.
//! - [`classify`]: the single mapping from any [`Error`] to a status, code
//!   and message. Unclassified errors never leak their detail.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use candidates::{Config, Server, app, telemetry};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     telemetry::init();
//!     let config = Config::load()?;
//!     Server::bind(config.listen_addr)
//!         .request_timeout(config.request_timeout)
//!         .serve(app::build(&config).await)
//!         .await?;
//!     Ok(())
//! }
//! ```

mod error;
mod handler;
mod method;
mod request;
mod response;
mod router;
mod server;

pub mod app;
pub mod candidates;
pub mod config;
pub mod health;
pub mod middleware;
pub mod telemetry;
pub mod validation;

pub use config::{Config, ConfigError, Storage};
pub use error::{DomainError, Error, ErrorKind, GENERIC_ERROR_CODE, NormalizedError, Result, classify};
pub use handler::{BoxFuture, BoxedHandler, ErasedHandler, Handler, HandlerResult};
pub use method::Method;
pub use request::{Context, Request};
pub use response::{IntoResponse, ROUTE_NOT_FOUND_CODE, Response, ResponseBuilder};
pub use router::{RouteError, Router};
pub use server::Server;
