use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tracing::debug;

use crate::{Error, Registry, Upstream};

// ---

pub fn router<U>() -> Router<(Registry, U)>
where
    U: Upstream + Clone + 'static,
{
    // ---
    Router::new().route("/{id}/print_data", get(handler::<U>))
}

/// Every rendered measurement of box `id`, oldest snapshot first.
async fn handler<U>(
    Path(id): Path<String>,
    State((registry, _)): State<(Registry, U)>,
) -> Result<Json<Value>, Error>
where
    U: Upstream + Clone + 'static,
{
    // ---
    let bx = registry.get(&id).await?;
    let bx = bx.lock().await;
    let lines = bx.lines();

    debug!("GET /{}/print_data - {} lines", id, lines.len());
    Ok(Json(json!({
        "Success": true,
        "Box": bx.id(),
        "Data": lines,
    })))
}
