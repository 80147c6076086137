// ── Runtime configuration ──
//
// These types describe how to reach the backend, how far a script may run,
// and how the status overlay polls. They never touch disk: the CLI builds
// them (usually through raven-config) and hands them in.

use std::time::Duration;

use raven_api::{TlsMode, TransportConfig};
use url::Url;

/// TLS verification strategy for HTTPS backends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed lab certs).
    DangerAcceptInvalid,
}

/// How to reach the orchestration backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Backend base URL (e.g. `http://localhost:9000`).
    pub url: Url,
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl BackendConfig {
    /// Backend at `url` with the default 30s timeout and system TLS roots.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Build the raven-api transport settings for this backend.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: match &self.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
                TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
            },
            timeout: self.timeout,
        }
    }
}

/// Bounds applied to every script evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalLimits {
    /// Wall-clock budget for one run.
    pub timeout: Duration,
    /// Total memory the script engine may hold for one run, in bytes.
    pub max_heap_bytes: usize,
    /// Native stack the engine may use, in bytes. Bounds recursion depth.
    pub max_stack_bytes: usize,
}

impl Default for EvalLimits {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(5000),
            max_heap_bytes: 64 * 1024 * 1024,
            max_stack_bytes: 1024 * 1024,
        }
    }
}

/// Status overlay polling settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayConfig {
    /// Interval between poll cycles.
    pub poll_interval: Duration,
    /// Upper bound for a single poll; a slower poll is abandoned.
    pub poll_timeout: Duration,
    /// Also refresh the server-rendered status fragment.
    pub fragment: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1000),
            poll_timeout: Duration::from_millis(5000),
            fragment: false,
        }
    }
}
