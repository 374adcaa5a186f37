// src/routes/health.rs
//! Liveness endpoint for the box registry.
//!
//! `GET /health` answers without touching upstream or the cache directory,
//! so it stays cheap enough for container health checks. It reports how many boxes
//! are currently registered.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::{Registry, Upstream};

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    boxes: usize,
}

async fn health<U>(State((registry, _)): State<(Registry, U)>) -> Json<HealthResponse>
where
    U: Upstream + Clone + 'static,
{
    Json(HealthResponse {
        status: "ok",
        boxes: registry.len().await,
    })
}

/// Create a subrouter containing the `/health` route.
pub fn router<U>() -> Router<(Registry, U)>
where
    U: Upstream + Clone + 'static,
{
    Router::new().route("/health", get(health::<U>))
}
