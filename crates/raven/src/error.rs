//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help
//! text. Script failures carry the script text so miette can point at the
//! offending construct.

use std::path::Path;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use raven_config::ConfigError;
use raven_core::{CoreError, EvaluationError, EvaluationErrorKind};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const SCRIPT: i32 = 3;
    pub const VALIDATION: i32 = 4;
    pub const BACKEND: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
#[allow(dead_code)]
pub enum CliError {
    // ── Script ───────────────────────────────────────────────────────
    #[error("Could not read script {path}")]
    #[diagnostic(code(raven::read_script), help("Check the path and file permissions."))]
    ReadScript {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Script {kind}: {message}")]
    #[diagnostic(code(raven::script))]
    Script {
        kind: EvaluationErrorKind,
        message: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("{kind}")]
        span: Option<SourceSpan>,
        #[help]
        advice: Option<String>,
    },

    #[error("Invalid argument to a modeling primitive: {message}")]
    #[diagnostic(code(raven::invalid_argument))]
    InvalidArgument { message: String },

    #[error("Script {path} produced no topology")]
    #[diagnostic(
        code(raven::missing_result),
        help("Assign the topology to `topo`, or `return` it from the top level.")
    )]
    MissingResult { path: String },

    // ── Model ────────────────────────────────────────────────────────
    #[error("Invalid topology ({rule}) at `{entity}`: {detail}")]
    #[diagnostic(
        code(raven::validation),
        help("Fix `{entity}` in the script and run it again.")
    )]
    Validation {
        rule: String,
        entity: String,
        detail: String,
    },

    #[error("No node, switch or link named '{name}'")]
    #[diagnostic(
        code(raven::entity_not_found),
        help("Run: rvn model {script} to list the topology's entities")
    )]
    EntityNotFound { name: String, script: String },

    // ── Backend ──────────────────────────────────────────────────────
    #[error("Could not reach the backend at {url}")]
    #[diagnostic(
        code(raven::backend_unavailable),
        help(
            "Check that the raven backend is running and accessible.\n\
             Reason: {reason}\n\
             Try: rvn --backend http://<host>:9000 status <TOPO>"
        )
    )]
    BackendUnavailable { url: String, reason: String },

    #[error("Backend rejected the request (HTTP {status}): {message}")]
    #[diagnostic(code(raven::rejected))]
    Rejected { status: u16, message: String },

    #[error("Unexpected backend response: {message}")]
    #[diagnostic(code(raven::unexpected_response))]
    UnexpectedResponse { message: String },

    #[error("Launch of '{topology}' reported {count} error(s)")]
    #[diagnostic(code(raven::launch_failed), help("{details}"))]
    LaunchFailed {
        topology: String,
        count: usize,
        details: String,
    },

    // ── Usage ────────────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(raven::usage))]
    Usage { field: String, reason: String },

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(raven::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(raven::config),
        help("Inspect the effective settings with: rvn config show")
    )]
    Config(Box<ConfigError>),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(raven::render))]
    Render(String),

    #[error("Internal error: {0}")]
    #[diagnostic(code(raven::internal))]
    Internal(String),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Script {
                kind: EvaluationErrorKind::Timeout,
                ..
            } => exit_code::TIMEOUT,
            Self::Script { .. } | Self::InvalidArgument { .. } | Self::MissingResult { .. } => {
                exit_code::SCRIPT
            }
            Self::Validation { .. } => exit_code::VALIDATION,
            Self::BackendUnavailable { .. }
            | Self::Rejected { .. }
            | Self::UnexpectedResponse { .. }
            | Self::LaunchFailed { .. } => exit_code::BACKEND,
            Self::Usage { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Like the `From<CoreError>` conversion, but keeps the script text so
    /// evaluation errors render with a labelled span.
    pub fn from_script(err: CoreError, path: &Path, source: &str) -> Self {
        match err {
            CoreError::Evaluation(e) => Self::script(e, path, source),
            CoreError::MissingResult => Self::MissingResult {
                path: path.display().to_string(),
            },
            other => other.into(),
        }
    }

    fn script(err: EvaluationError, path: &Path, source: &str) -> Self {
        let span = err
            .location
            .map(|loc| SourceSpan::from((loc.offset, loc.length.max(1))));
        let advice = match err.kind {
            EvaluationErrorKind::Timeout => {
                Some("The script ran past its time budget; raise eval.timeout_ms if it is legitimately slow.".into())
            }
            EvaluationErrorKind::ResourceLimit => {
                Some("The script exceeded an evaluation limit; see the [eval] section of rvn config show.".into())
            }
            EvaluationErrorKind::Reference => {
                Some("Scripts can only use the modeling prelude and `env`.".into())
            }
            _ => None,
        };
        Self::Script {
            kind: err.kind,
            message: err.message,
            src: NamedSource::new(path.display().to_string(), source.to_owned()),
            span,
            advice,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidArgument { message } => CliError::InvalidArgument { message },

            CoreError::Evaluation(e) => CliError::Script {
                kind: e.kind,
                message: e.message,
                src: NamedSource::new("<script>", String::new()),
                span: None,
                advice: None,
            },

            CoreError::MissingResult => CliError::MissingResult {
                path: "<script>".into(),
            },

            CoreError::Validation(v) => CliError::Validation {
                rule: v.rule.to_string(),
                entity: v.entity,
                detail: v.detail,
            },

            CoreError::BackendUnavailable { url, reason } => {
                CliError::BackendUnavailable { url, reason }
            }

            CoreError::Rejected { status, message } => CliError::Rejected { status, message },

            CoreError::UnexpectedResponse { message } => CliError::UnexpectedResponse { message },

            CoreError::Config { message } => CliError::Usage {
                field: "backend".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use raven_core::{SourceLocation, ValidationError, ValidationRule};

    #[test]
    fn exit_codes() {
        let timeout = CoreError::Evaluation(EvaluationError::new(
            EvaluationErrorKind::Timeout,
            "script exceeded 5000ms",
        ));
        assert_eq!(CliError::from(timeout).exit_code(), exit_code::TIMEOUT);

        let syntax = CoreError::Evaluation(EvaluationError::new(
            EvaluationErrorKind::Syntax,
            "unexpected token",
        ));
        assert_eq!(CliError::from(syntax).exit_code(), exit_code::SCRIPT);

        let unavailable = CoreError::BackendUnavailable {
            url: "http://localhost:9000".into(),
            reason: "connection refused".into(),
        };
        assert_eq!(CliError::from(unavailable).exit_code(), exit_code::BACKEND);
        assert_eq!(CliError::from(CoreError::MissingResult).exit_code(), exit_code::SCRIPT);
    }

    #[test]
    fn validation_keeps_entity() {
        let err = ValidationError {
            rule: ValidationRule::DanglingEndpoint,
            entity: "ghost".into(),
            detail: "link `a_1-ghost_1` references an unknown entity".into(),
        };
        let cli = CliError::from(CoreError::Validation(err));
        assert_eq!(cli.exit_code(), exit_code::VALIDATION);
        assert!(cli.to_string().contains("`ghost`"), "{cli}");
    }

    #[test]
    fn script_errors_carry_span() {
        let source = "topo = {\n  name: nope\n}";
        let err = EvaluationError::new(EvaluationErrorKind::Reference, "nope is not defined")
            .with_location(SourceLocation::from_span(source, 17, 4));
        let cli = CliError::from_script(CoreError::Evaluation(err), Path::new("t.js"), source);
        let CliError::Script { span, advice, .. } = &cli else {
            panic!("expected a script error");
        };
        assert_eq!(span.unwrap().offset(), 17);
        assert!(advice.is_some());
        assert_eq!(cli.exit_code(), exit_code::SCRIPT);
    }
}
