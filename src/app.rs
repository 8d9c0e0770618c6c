//! Wiring: storage, service, controller, middleware and the route table.
//!
//! ```text
//! GET    candidates/{id}   Trace → Base → ErrorTranslation → get_by_id
//! POST   candidates/       Trace → Base → ErrorTranslation → create
//! DELETE candidates/{id}   Trace → Base → ErrorTranslation → delete
//! GET    healthz           liveness
//! GET    readyz            readiness
//! ```

use std::future::Future;
use std::sync::Arc;

use tracing::info;

use crate::candidates::{
    CandidateController, CandidateRepository, CandidateService, DynamoCandidateRepository, MemoryCandidateRepository,
};
use crate::config::{Config, Storage};
use crate::handler::{Handler, HandlerResult};
use crate::health;
use crate::method::Method;
use crate::middleware::{self, compose};
use crate::request::Request;
use crate::router::Router;

/// The router for this process, over the process-wide candidate store
/// selected by `config.storage`.
pub async fn build(config: &Config) -> Router {
    let table = &config.candidates_table_name;
    let store: Arc<dyn CandidateRepository> = match config.storage {
        Storage::DynamoDb => Arc::new(DynamoCandidateRepository::shared(table).await),
        Storage::Memory => MemoryCandidateRepository::shared(table),
    };
    info!(storage = %config.storage, table = %table, "candidate store ready");
    router(config, store)
}

/// The router over an explicit repository.
pub fn router(config: &Config, repository: Arc<dyn CandidateRepository>) -> Router {
    let controller = Arc::new(CandidateController::new(CandidateService::new(repository, config.time_zone)));
    let stack = middleware::standard();

    let get_by_id = bind(&controller, |c, req| async move { c.get_by_id(req).await });
    let create = bind(&controller, |c, req| async move { c.create(req).await });
    let delete = bind(&controller, |c, req| async move { c.delete(req).await });

    Router::new()
        .on(Method::Get,    "candidates/{id}", compose(get_by_id, &stack))
        .on(Method::Post,   "candidates/",     compose(create, &stack))
        .on(Method::Delete, "candidates/{id}", compose(delete, &stack))
        .on(Method::Get,    "healthz",         health::liveness)
        .on(Method::Get,    "readyz",          health::readiness)
}

fn bind<F, Fut>(controller: &Arc<CandidateController>, f: F) -> impl Handler
where
    F: Fn(Arc<CandidateController>, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    let controller = Arc::clone(controller);
    move |req: Request| f(Arc::clone(&controller), req)
}
