// ── Lifecycle commands ──
//
// One request, one response, keyed by topology name. Nothing here
// sequences commands or retries them: a failure goes straight back to the
// caller. The same client feeds the status overlay.

use std::sync::Arc;

use raven_api::{BackendClient, LaunchResponse};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use crate::config::BackendConfig;
use crate::error::CoreError;
use crate::model::Topology;
use crate::status::{StatusMap, StatusSource};

/// Outcome of a launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "errors", rename_all = "snake_case")]
pub enum LaunchReport {
    /// Every host came up.
    Ok,
    /// Per-host failures reported by the backend.
    Errors(Vec<String>),
}

impl LaunchReport {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl From<LaunchResponse> for LaunchReport {
    fn from(resp: LaunchResponse) -> Self {
        match resp {
            LaunchResponse::Ok => Self::Ok,
            LaunchResponse::Errors(errors) => Self::Errors(errors),
        }
    }
}

/// A lifecycle request, for callers that route commands as values.
#[derive(Debug, Clone)]
pub enum LifecycleCommand {
    Push(Arc<Topology>),
    Mount(Arc<Topology>),
    Launch(String),
    Configure(String),
    Destroy(String),
    Status(String),
}

impl LifecycleCommand {
    /// The topology name the command targets.
    pub fn topology(&self) -> &str {
        match self {
            Self::Push(t) | Self::Mount(t) => &t.name,
            Self::Launch(n) | Self::Configure(n) | Self::Destroy(n) | Self::Status(n) => n,
        }
    }
}

/// What a routed command produced.
#[derive(Debug, Clone)]
pub enum LifecycleOutcome {
    /// The backend's reply body (push, mount, configure, destroy).
    Accepted(String),
    Launched(LaunchReport),
    Status(StatusMap),
}

/// Client for the orchestration backend's lifecycle endpoints.
#[derive(Debug, Clone)]
pub struct LifecycleClient {
    api: BackendClient,
}

impl LifecycleClient {
    pub fn new(config: &BackendConfig) -> Result<Self, CoreError> {
        let api = BackendClient::new(config.url.clone(), &config.transport())?;
        Ok(Self { api })
    }

    pub fn from_api(api: BackendClient) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &BackendClient {
        &self.api
    }

    /// Submit the canonical document.
    #[instrument(skip_all, fields(topology = %topology.name))]
    pub async fn push(&self, topology: &Topology) -> Result<String, CoreError> {
        let reply = self.api.push(topology).await?;
        info!("topology pushed");
        Ok(reply)
    }

    /// Ask the backend to export mounts and generate host configuration.
    #[instrument(skip_all, fields(topology = %topology.name))]
    pub async fn mount(&self, topology: &Topology) -> Result<String, CoreError> {
        let reply = self.api.mount(topology).await?;
        info!("topology mounted");
        Ok(reply)
    }

    #[instrument(skip(self))]
    pub async fn launch(&self, topology: &str) -> Result<LaunchReport, CoreError> {
        let report = LaunchReport::from(self.api.launch(topology).await?);
        match &report {
            LaunchReport::Ok => info!("topology launched"),
            LaunchReport::Errors(errors) => {
                info!(errors = errors.len(), "topology launched with errors");
            }
        }
        Ok(report)
    }

    #[instrument(skip(self))]
    pub async fn configure(&self, topology: &str) -> Result<String, CoreError> {
        let reply = self.api.configure(topology).await?;
        info!("topology configured");
        Ok(reply)
    }

    #[instrument(skip(self))]
    pub async fn destroy(&self, topology: &str) -> Result<String, CoreError> {
        let reply = self.api.destroy(topology).await?;
        info!("topology destroyed");
        Ok(reply)
    }

    pub async fn status(&self, topology: &str) -> Result<StatusMap, CoreError> {
        let raw: serde_json::Value = self.api.status(topology).await?;
        StatusMap::from_json(raw)
    }

    pub async fn status_fragment(&self, topology: &str) -> Result<String, CoreError> {
        Ok(self.api.status_fragment(topology).await?)
    }

    /// Run one command and wait for its outcome.
    pub async fn execute(&self, command: LifecycleCommand) -> Result<LifecycleOutcome, CoreError> {
        debug!(topology = command.topology(), ?command, "executing lifecycle command");
        Ok(match command {
            LifecycleCommand::Push(t) => LifecycleOutcome::Accepted(self.push(&t).await?),
            LifecycleCommand::Mount(t) => LifecycleOutcome::Accepted(self.mount(&t).await?),
            LifecycleCommand::Launch(n) => LifecycleOutcome::Launched(self.launch(&n).await?),
            LifecycleCommand::Configure(n) => {
                LifecycleOutcome::Accepted(self.configure(&n).await?)
            }
            LifecycleCommand::Destroy(n) => LifecycleOutcome::Accepted(self.destroy(&n).await?),
            LifecycleCommand::Status(n) => LifecycleOutcome::Status(self.status(&n).await?),
        })
    }

    /// Fire and forget: run `command` on the runtime and hand back its
    /// handle. Must be called within a tokio runtime.
    pub fn dispatch(&self, command: LifecycleCommand) -> JoinHandle<Result<LifecycleOutcome, CoreError>> {
        let client = self.clone();
        tokio::spawn(async move { client.execute(command).await })
    }
}

impl StatusSource for LifecycleClient {
    async fn fetch_status(&self, topology: &str) -> Result<StatusMap, CoreError> {
        self.status(topology).await
    }

    async fn fetch_fragment(&self, topology: &str) -> Result<String, CoreError> {
        self.status_fragment(topology).await
    }
}
