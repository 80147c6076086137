//! Configuration for the raven tools.
//!
//! A TOML file in the platform config directory, layered over built-in
//! defaults and under `RAVEN_`-prefixed environment variables, translated
//! into the plain settings types `raven_core` consumes. Core never reads
//! this crate's types or touches the file itself.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use raven_core::{
    BackendConfig, EvalLimits, NodeColor, OverlayConfig, ProjectionStyle, TlsVerification,
};

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "RAVEN_CONFIG";

const ENV_PREFIX: &str = "RAVEN_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config file already exists at {}", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level configuration shared by `rvn` and `run-model`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendSection,

    #[serde(default)]
    pub eval: EvalSection,

    #[serde(default)]
    pub overlay: OverlaySection,

    #[serde(default)]
    pub graph: GraphSection,
}

/// Where the orchestration backend lives.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendSection {
    pub url: String,
    pub timeout_secs: u64,
    /// Skip TLS verification (self-signed lab backends).
    pub insecure: bool,
    /// Path to a custom CA certificate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            url: "http://localhost:9000".into(),
            timeout_secs: 30,
            insecure: false,
            ca_cert: None,
        }
    }
}

/// Bounds for script evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct EvalSection {
    pub timeout_ms: u64,
    pub max_heap_bytes: usize,
    pub max_stack_bytes: usize,
    /// Expose the host process environment to scripts as `env`.
    pub inherit_env: bool,
}

impl Default for EvalSection {
    fn default() -> Self {
        let limits = EvalLimits::default();
        Self {
            timeout_ms: u64::try_from(limits.timeout.as_millis()).unwrap_or(u64::MAX),
            max_heap_bytes: limits.max_heap_bytes,
            max_stack_bytes: limits.max_stack_bytes,
            inherit_env: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct OverlaySection {
    pub poll_interval_ms: u64,
    pub poll_timeout_ms: u64,
    pub fragment: bool,
}

impl Default for OverlaySection {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            poll_timeout_ms: 5000,
            fragment: false,
        }
    }
}

/// Display graph styling.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GraphSection {
    pub switch_background: String,
    pub switch_border: String,
    pub default_level: i64,
    pub shape: String,
}

impl Default for GraphSection {
    fn default() -> Self {
        let style = ProjectionStyle::default();
        Self {
            switch_background: style.switch_color.background,
            switch_border: style.switch_color.border,
            default_level: style.default_level,
            shape: style.shape,
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `$RAVEN_CONFIG`, else the platform
/// config directory.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("org", "raven", "raven").map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("raven");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the effective Config: defaults, then the config file, then the
/// environment (`RAVEN_BACKEND__URL=...`).
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Like [`load_config`] with an explicit file. A missing file is not an
/// error.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

/// Write a default config file at the canonical path unless one exists
/// (or `force` is set). Returns the path written.
pub fn init_config(force: bool) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    if path.exists() && !force {
        return Err(ConfigError::AlreadyExists { path });
    }
    save_config_to(&Config::default(), &path)?;
    Ok(path)
}

// ── Translation to core settings ────────────────────────────────────

impl Config {
    /// Backend settings, with an optional URL override (e.g. `--backend`).
    pub fn backend_config(&self, url_override: Option<&str>) -> Result<BackendConfig, ConfigError> {
        let raw = url_override.unwrap_or(&self.backend.url);
        let url: url::Url = raw.parse().map_err(|_| ConfigError::Validation {
            field: "backend.url".into(),
            reason: format!("invalid URL: {raw}"),
        })?;

        let tls = if self.backend.insecure {
            TlsVerification::DangerAcceptInvalid
        } else if let Some(ref ca_path) = self.backend.ca_cert {
            TlsVerification::CustomCa(ca_path.clone())
        } else {
            TlsVerification::SystemDefaults
        };

        Ok(BackendConfig {
            url,
            tls,
            timeout: Duration::from_secs(self.backend.timeout_secs),
        })
    }

    pub fn eval_limits(&self) -> EvalLimits {
        let eval = &self.eval;
        EvalLimits {
            timeout: Duration::from_millis(eval.timeout_ms),
            max_heap_bytes: eval.max_heap_bytes,
            max_stack_bytes: eval.max_stack_bytes,
        }
    }

    pub fn overlay_config(&self) -> OverlayConfig {
        OverlayConfig {
            poll_interval: Duration::from_millis(self.overlay.poll_interval_ms),
            poll_timeout: Duration::from_millis(self.overlay.poll_timeout_ms),
            fragment: self.overlay.fragment,
        }
    }

    pub fn projection_style(&self) -> ProjectionStyle {
        ProjectionStyle {
            switch_color: NodeColor {
                background: self.graph.switch_background.clone(),
                border: self.graph.switch_border.clone(),
            },
            default_level: self.graph.default_level,
            shape: self.graph.shape.clone(),
            ..ProjectionStyle::default()
        }
    }
}
