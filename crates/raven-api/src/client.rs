// Backend HTTP client
//
// Wraps `reqwest::Client` with raven endpoint URL construction and response
// decoding. Every method is a single request/response exchange: nothing is
// retried or sequenced here.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::models::LaunchResponse;
use crate::transport::TransportConfig;

const PUSH_PATH: &str = "rvn-push";
const MOUNT_PATH: &str = "rvn-mount";
const LAUNCH_PATH: &str = "rvn-launch";
const CONFIGURE_PATH: &str = "rvn-configure";
const DESTROY_PATH: &str = "rvn-destroy";
const STATUS_PATH: &str = "rvn-status";

/// Raw HTTP client for the orchestration backend.
///
/// Topology-scoped endpoints take the topology name as the `topo` query
/// parameter. Document-carrying endpoints take any serializable body so the
/// canonical model stays in `raven-core`.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: Url,
    /// Request timeout the client was built with, when known.
    timeout: Option<Duration>,
}

impl BackendClient {
    /// Create a new client from a `TransportConfig`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            timeout: Some(transport.timeout),
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            timeout: None,
        }
    }

    /// The backend base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// Submit a canonical topology document.
    pub async fn push(&self, topology: &(impl Serialize + Sync)) -> Result<String, Error> {
        let url = self.endpoint(PUSH_PATH, None)?;
        self.post_text(url, topology).await
    }

    /// Ask the backend to export the topology's mounts and generate host config.
    pub async fn mount(&self, topology: &(impl Serialize + Sync)) -> Result<String, Error> {
        let url = self.endpoint(MOUNT_PATH, None)?;
        self.post_text(url, topology).await
    }

    /// Launch a previously pushed topology.
    pub async fn launch(&self, topo: &str) -> Result<LaunchResponse, Error> {
        let url = self.endpoint(LAUNCH_PATH, Some(topo))?;
        let body = self.get_text(url).await?;
        Ok(LaunchResponse::parse(&body))
    }

    /// Run configuration for every host of a topology.
    pub async fn configure(&self, topo: &str) -> Result<String, Error> {
        let url = self.endpoint(CONFIGURE_PATH, Some(topo))?;
        self.get_text(url).await
    }

    /// Tear a topology down.
    pub async fn destroy(&self, topo: &str) -> Result<String, Error> {
        let url = self.endpoint(DESTROY_PATH, Some(topo))?;
        self.get_text(url).await
    }

    /// Fetch structured status (category → name → status) for a topology.
    pub async fn status<T: DeserializeOwned>(&self, topo: &str) -> Result<T, Error> {
        let url = self.endpoint(STATUS_PATH, Some(topo))?;
        self.get_json(url).await
    }

    /// Fetch the pre-rendered status board fragment for a topology.
    pub async fn status_fragment(&self, topo: &str) -> Result<String, Error> {
        let mut url = self.endpoint(STATUS_PATH, Some(topo))?;
        url.query_pairs_mut().append_pair("fragment", "true");
        self.get_text(url).await
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/{path}` with an optional `topo` query parameter.
    pub(crate) fn endpoint(&self, path: &str, topo: Option<&str>) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let mut url = Url::parse(&format!("{base}/{path}"))?;
        if let Some(topo) = topo {
            url.query_pairs_mut().append_pair("topo", topo);
        }
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    async fn get_text(&self, url: Url) -> Result<String, Error> {
        debug!("GET {}", url);
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.read_body(resp).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        let body = self.get_text(url).await?;
        serde_json::from_str(&body).map_err(|e| {
            let preview = truncate(&body, 200);
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: body.clone(),
            }
        })
    }

    async fn post_text(&self, url: Url, body: &(impl Serialize + Sync)) -> Result<String, Error> {
        debug!("POST {}", url);
        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.read_body(resp).await
    }

    /// Return the body of a successful response, or `Error::Backend`
    /// carrying a truncated body for anything else.
    async fn read_body(&self, resp: reqwest::Response) -> Result<String, Error> {
        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.transport_error(e))?;
        trace!(status = status.as_u16(), len = body.len(), "backend response");

        if !status.is_success() {
            return Err(Error::Backend {
                status: status.as_u16(),
                message: truncate(body.trim(), 200).to_owned(),
            });
        }
        Ok(body)
    }

    fn transport_error(&self, err: reqwest::Error) -> Error {
        match self.timeout {
            Some(timeout) if err.is_timeout() => Error::Timeout {
                timeout_secs: timeout.as_secs(),
            },
            _ => Error::Transport(err),
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
