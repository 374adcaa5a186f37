use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::{Error, Registry, Upstream};

// ---

pub fn router<U>() -> Router<(Registry, U)>
where
    U: Upstream + Clone + 'static,
{
    // ---
    Router::new().route("/{id}/read_api", get(handler::<U>))
}

/// Trigger a read of box `id`: upstream fetch when stale, cache replay otherwise.
async fn handler<U>(
    Path(id): Path<String>,
    State((registry, upstream)): State<(Registry, U)>,
) -> Result<Json<Value>, Error>
where
    U: Upstream + Clone + 'static,
{
    // ---
    debug!("GET /{}/read_api", id);
    let bx = registry.get(&id).await?;
    let mut bx = bx.lock().await;

    let outcome = bx.read(&upstream).await.map_err(|e| {
        error!(box_id = %id, error = %e, "Read failed");
        e
    })?;

    debug!(box_id = %id, from_cache = outcome.from_cache, "Read complete");
    Ok(Json(json!({
        "Success": true,
        "Box": bx.id(),
        "Timestamp": outcome.last_fetch_at,
        "Read_from_cache": outcome.from_cache,
    })))
}
