use crate::services::health_service::HealthService;
use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

pub mod health;

#[derive(Clone, Debug)]
pub struct MgmtState {
    pub health_service: HealthService,
}

pub fn mgmt_router(state: MgmtState) -> Router {
    Router::new()
        .route("/livez", get(health::livez))
        .route("/readyz", get(health::readyz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
