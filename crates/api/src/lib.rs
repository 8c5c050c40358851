//! HTTP API server with observability for the daykeeper planner.
//!
//! Thin request/response mapping over the domain services and the
//! history facade, with structured logging (tracing) and Prometheus
//! metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use domain::{
    JsonCollection, PlannerStateProvider, ShoppingService, TaskService, TimeBlockService,
};
use event_store::HistoryStore;
use history::HistoryService;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S: HistoryStore> {
    pub tasks: TaskService<S>,
    pub shopping: ShoppingService<S>,
    pub timeblocks: TimeBlockService<S>,
    pub history: HistoryService<S>,
}

impl<S: HistoryStore + Clone> AppState<S> {
    /// Ensures the three current-state files exist. Idempotent.
    pub async fn init(&self) -> Result<(), domain::DomainError> {
        self.tasks.collection().init().await?;
        self.shopping.collection().init().await?;
        self.timeblocks.collection().init().await?;
        Ok(())
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: HistoryStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route("/tasks", get(routes::tasks::list::<S>))
        .route("/tasks", post(routes::tasks::create::<S>))
        .route("/tasks/{id}", put(routes::tasks::update::<S>))
        .route("/tasks/{id}", delete(routes::tasks::remove::<S>))
        .route("/shopping", get(routes::shopping::list::<S>))
        .route("/shopping", post(routes::shopping::create::<S>))
        .route("/shopping/{id}", put(routes::shopping::update::<S>))
        .route("/shopping/{id}", delete(routes::shopping::remove::<S>))
        .route("/timeblocks", get(routes::timeblocks::list::<S>))
        .route("/timeblocks", post(routes::timeblocks::create::<S>))
        .route("/timeblocks/{id}", put(routes::timeblocks::update::<S>))
        .route("/timeblocks/{id}", delete(routes::timeblocks::remove::<S>))
        .route("/history/events", get(routes::history::events::<S>))
        .route("/history/analytics", get(routes::history::analytics::<S>))
        .route("/history/export", get(routes::history::export::<S>))
        .route("/history/snapshots", post(routes::history::create_snapshot::<S>))
        .route("/history/snapshots", get(routes::history::list_snapshots::<S>))
        .route("/history/snapshots/{id}", get(routes::history::read_snapshot::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state: current-state collections under
/// `data_dir`, the history facade wired for daily snapshots, and the
/// three entity services sharing one recorder.
pub fn create_default_state<S: HistoryStore + Clone + 'static>(
    store: S,
    data_dir: &Path,
) -> Arc<AppState<S>> {
    let tasks = JsonCollection::new(data_dir.join("tasks.json"));
    let shopping = JsonCollection::new(data_dir.join("shopping.json"));
    let timeblocks = JsonCollection::new(data_dir.join("timeblocks.json"));

    let provider = Arc::new(PlannerStateProvider::new(
        tasks.clone(),
        shopping.clone(),
        timeblocks.clone(),
    ));
    let history = HistoryService::new(store).with_state_provider(provider);
    let log = history.log().clone();

    Arc::new(AppState {
        tasks: TaskService::new(tasks, log.clone()),
        shopping: ShoppingService::new(shopping, log.clone()),
        timeblocks: TimeBlockService::new(timeblocks, log),
        history,
    })
}
