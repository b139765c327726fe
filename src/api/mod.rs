pub mod health;
pub mod legs;

use crate::orchestration::LegPipeline;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<LegPipeline>,
}

impl AppState {
    pub fn new(pipeline: Arc<LegPipeline>) -> Self {
        Self { pipeline }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/legs", get(legs::get_legs))
        .layer(cors)
        .with_state(state)
}
