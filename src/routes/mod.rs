//! Route gateway: merges the per-endpoint subrouters and attaches state.
//!
//! State is the `(Registry, upstream)` pair; handlers only see the crate
//! root re-exports.

use axum::Router;

use crate::{Registry, Upstream};

mod boxes;
mod health;
mod print_data;
mod read_api;

// ---

pub fn router<U>(registry: Registry, upstream: U) -> Router
where
    U: Upstream + Clone + 'static,
{
    // ---
    Router::new()
        .merge(boxes::router())
        .merge(read_api::router())
        .merge(print_data::router())
        .merge(health::router())
        .with_state((registry, upstream))
}
