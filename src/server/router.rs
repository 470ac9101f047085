use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{DefaultBodyLimit, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{
    Json, Router,
    routing::{get, post},
};
use serde_json::{Value, json};

use super::schemas::{self, MAX_UPLOAD_SIZE};
use crate::blob::ContentStore;
use crate::registry::Registry;
use crate::store::Store;

pub struct AppState {
    pub registry: Registry,
}

impl AppState {
    /// `schemas_dir` is the blob root; stored paths are relative to it.
    pub fn new(store: Arc<dyn Store>, schemas_dir: &Path) -> Self {
        Self {
            registry: Registry::new(store, ContentStore::new(schemas_dir)),
        }
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/upload",
            // Leave headroom for multipart framing around the file itself.
            post(schemas::upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE + 64 * 1024)),
        )
        .route("/schema", get(schemas::get_schema))
        .route("/schema/versions", get(schemas::list_versions))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
