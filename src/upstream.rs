//! openSenseMap API client.
//!
//! [`Upstream`] is the seam between the box logic and the network: the box
//! only needs "give me the raw body for this id", which keeps the freshness
//! logic testable without HTTP.

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Error, Result};

// ---

/// Payload format requested from the upstream API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Geojson,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Json => "json",
            OutputFormat::Geojson => "geojson",
        })
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "json" => Ok(OutputFormat::Json),
            "geojson" => Ok(OutputFormat::Geojson),
            other => Err(format!("unknown output format '{other}'")),
        }
    }
}

/// Source of raw box payloads.
///
/// Any failure, including a non-200 status or a timeout, is reported as
/// [`Error::UpstreamUnavailable`].
pub trait Upstream: Send + Sync {
    fn fetch_box(
        &self,
        box_id: &str,
        format: OutputFormat,
    ) -> impl Future<Output = Result<String>> + Send;
}

/// HTTP client for `GET {base_url}/boxes/{id}?format={format}`.
#[derive(Debug, Clone)]
pub struct SenseApiClient {
    http: Client,
    base_url: String,
}

impl SenseApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        // ---
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::UpstreamUnavailable(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn box_url(&self, box_id: &str, format: OutputFormat) -> String {
        format!("{}/boxes/{}?format={}", self.base_url, box_id, format)
    }
}

impl Upstream for SenseApiClient {
    async fn fetch_box(&self, box_id: &str, format: OutputFormat) -> Result<String> {
        // ---
        let url = self.box_url(box_id, format);
        debug!("Fetching box {} from: {}", box_id, url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::UpstreamUnavailable(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            info!("Upstream answered {} for box {}", status, box_id);
            return Err(Error::UpstreamUnavailable(format!("status {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::UpstreamUnavailable(e.to_string()))?;

        debug!("Box {} payload: {} bytes", box_id, body.len());
        Ok(body)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    // ---
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Scripted upstream: replays queued responses, counting calls.
    #[derive(Clone, Default)]
    pub(crate) struct FakeUpstream {
        responses: Arc<Mutex<VecDeque<Result<String>>>>,
        calls: Arc<AtomicUsize>,
    }

    impl FakeUpstream {
        pub(crate) fn push_ok(&self, body: impl Into<String>) {
            self.responses.lock().unwrap().push_back(Ok(body.into()));
        }

        pub(crate) fn push_unavailable(&self) {
            self.responses
                .lock()
                .unwrap()
                .push_back(Err(Error::UpstreamUnavailable("status 503 Service Unavailable".into())));
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Upstream for FakeUpstream {
        async fn fetch_box(&self, _box_id: &str, _format: OutputFormat) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.responses.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Err(Error::UpstreamUnavailable("no scripted response".into())))
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_box_url() {
        // ---
        let client = SenseApiClient::new("https://api.opensensemap.org/", Duration::from_secs(5)).unwrap();
        assert_eq!(
            client.box_url("5a0c2cc89fd3c200111118f0", OutputFormat::Json),
            "https://api.opensensemap.org/boxes/5a0c2cc89fd3c200111118f0?format=json"
        );
        assert_eq!(
            client.box_url("abc", OutputFormat::Geojson),
            "https://api.opensensemap.org/boxes/abc?format=geojson"
        );
    }

    #[test]
    fn test_output_format_parsing() {
        // ---
        assert_eq!("json".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("geojson".parse::<OutputFormat>(), Ok(OutputFormat::Geojson));
        assert!("xml".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::default(), OutputFormat::Json);
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_unavailable() {
        // ---
        // Port 9 (discard) on localhost is closed in test environments.
        let client = SenseApiClient::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let err = client.fetch_box("abc", OutputFormat::Json).await.unwrap_err();
        assert!(matches!(err, Error::UpstreamUnavailable(_)));
    }
}
