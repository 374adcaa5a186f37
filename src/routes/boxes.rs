//! Box lifecycle endpoints: `GET|POST /box/{id}` registers, `DELETE /box/{id}`
//! removes the box and its cache artifact.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::{Error, OutputFormat, Registry, Upstream};

// ---

pub fn router<U>() -> Router<(Registry, U)>
where
    U: Upstream + Clone + 'static,
{
    // ---
    Router::new().route(
        "/box/{id}",
        get(register::<U>).post(register::<U>).delete(remove::<U>),
    )
}

#[derive(Debug, Deserialize)]
struct RegisterQuery {
    format: Option<OutputFormat>,
}

async fn register<U>(
    Path(id): Path<String>,
    Query(params): Query<RegisterQuery>,
    State((registry, _)): State<(Registry, U)>,
) -> Result<Json<Value>, Error>
where
    U: Upstream + Clone + 'static,
{
    // ---
    info!("register box {} ({:?})", id, params);
    registry
        .register(&id, params.format.unwrap_or_default())
        .await?;
    Ok(Json(json!({ "Success": true, "Box": id })))
}

async fn remove<U>(
    Path(id): Path<String>,
    State((registry, _)): State<(Registry, U)>,
) -> Result<Json<Value>, Error>
where
    U: Upstream + Clone + 'static,
{
    // ---
    info!("remove box {}", id);
    registry.remove(&id).await?;
    Ok(Json(json!({ "Success": true, "Box": id })))
}
