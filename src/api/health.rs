use crate::api::MgmtState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ReadinessReport {
    pub status: &'static str,
    pub redis: &'static str,
    pub pending_groups: usize,
}

pub async fn livez() -> impl IntoResponse {
    StatusCode::OK
}

/// 503 while Redis is unreachable; the reassembly backlog is reported but never fails the probe.
pub async fn readyz(State(state): State<MgmtState>) -> impl IntoResponse {
    let redis = state.health_service.check_redis().await;
    let pending_groups = state.health_service.pending_groups();

    let (code, redis) = match redis {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(e) => {
            tracing::warn!(error = %e, component = "redis", "Readiness probe failed");
            (StatusCode::SERVICE_UNAVAILABLE, "error")
        }
    };

    (code, Json(ReadinessReport { status: redis, redis, pending_groups }))
}
