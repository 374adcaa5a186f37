//! Caching registry for openSenseMap sensor boxes.
//!
//! Callers register a box id, trigger reads, and print the accumulated
//! measurement history. Upstream calls are limited to one per box every five
//! minutes; reads in between replay the cached payload from disk.
//!
//! Module boundaries follow the same gateway layout as the binary: `routes`
//! only sees the re-exports below, never the sibling modules directly.

pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod registry;
pub mod routes;
pub mod sense_box;
pub mod snapshot;
pub mod upstream;

pub use cache::{CacheEntry, CacheStore};
pub use config::Config;
pub use error::{Error, Result};
pub use models::{Category, Measurement};
pub use registry::Registry;
pub use sense_box::{ReadOutcome, SenseBox};
pub use snapshot::Snapshot;
pub use upstream::{OutputFormat, SenseApiClient, Upstream};
