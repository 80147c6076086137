// ── Core error types ──
//
// User-facing errors from raven-core. Consumers never see HTTP status
// codes or JSON parse failures directly: the `From<raven_api::Error>` impl
// translates transport-layer errors into the taxonomy below. Script and
// validation failures carry enough structure to point an author at the fix.

use std::fmt;

use serde::Serialize;
use strum::{Display, IntoStaticStr};
use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Script errors ────────────────────────────────────────────────
    /// Malformed input to a modeling primitive (e.g. a negative count).
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// The script failed to run.
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    /// The script ran but left no topology behind.
    #[error("Script produced no topology: assign one to `topo` or return it")]
    MissingResult,

    // ── Model errors ─────────────────────────────────────────────────
    /// A topology was produced but violates a model invariant.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    // ── Backend errors ───────────────────────────────────────────────
    #[error("Backend unavailable at {url}: {reason}")]
    BackendUnavailable { url: String, reason: String },

    #[error("Backend rejected the request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Unexpected backend response: {message}")]
    UnexpectedResponse { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// `true` when the backend could not be reached at all.
    pub fn is_backend_unavailable(&self) -> bool {
        matches!(self, Self::BackendUnavailable { .. })
    }
}

// ── Evaluation errors ────────────────────────────────────────────────

/// What went wrong while running a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationErrorKind {
    #[strum(to_string = "syntax error")]
    Syntax,
    #[strum(to_string = "reference error")]
    Reference,
    #[strum(to_string = "type error")]
    Type,
    #[strum(to_string = "range error")]
    Range,
    #[strum(to_string = "invalid argument")]
    InvalidArgument,
    #[strum(to_string = "uncaught exception")]
    Thrown,
    #[strum(to_string = "timeout")]
    Timeout,
    #[strum(to_string = "cancelled")]
    Cancelled,
    #[strum(to_string = "resource limit exceeded")]
    ResourceLimit,
}

/// A position in the script text. `line` and `column` are 1-based;
/// `offset` and `length` are byte offsets into the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
    pub length: usize,
}

impl SourceLocation {
    /// Resolve a byte span into line/column form.
    pub fn from_span(source: &str, offset: usize, length: usize) -> Self {
        let offset = offset.min(source.len());
        let before = source.get(..offset).unwrap_or_default();
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let column = before.get(line_start..).map_or(0, |s| s.chars().count()) + 1;
        Self {
            line,
            column,
            offset,
            length,
        }
    }
}

impl SourceLocation {
    /// Resolve a 1-based line/column pair, clamped to the source text.
    /// The location covers one character.
    pub fn from_line_column(source: &str, line: usize, column: usize) -> Self {
        let mut offset = 0;
        for (i, text) in source.split_inclusive('\n').enumerate() {
            if i + 1 == line {
                offset += text
                    .char_indices()
                    .nth(column.saturating_sub(1))
                    .map_or(text.trim_end_matches('\n').len(), |(at, _)| at);
                break;
            }
            offset += text.len();
        }
        let length = source
            .get(offset..)
            .and_then(|rest| rest.chars().next())
            .map_or(0, char::len_utf8);
        Self::from_span(source, offset, length)
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A script failure, always attributable to the script rather than the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{kind}: {message}{}", location_suffix(.location.as_ref()))]
pub struct EvaluationError {
    pub kind: EvaluationErrorKind,
    pub message: String,
    pub location: Option<SourceLocation>,
}

fn location_suffix(location: Option<&SourceLocation>) -> String {
    location.map(|l| format!(" (at {l})")).unwrap_or_default()
}

impl EvaluationError {
    pub fn new(kind: EvaluationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            location: None,
        }
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }
}

// ── Validation errors ────────────────────────────────────────────────

/// The model invariant a topology failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
pub enum ValidationRule {
    #[strum(to_string = "schema")]
    Schema,
    #[strum(to_string = "empty name")]
    EmptyName,
    #[strum(to_string = "duplicate name")]
    DuplicateName,
    #[strum(to_string = "dangling endpoint")]
    DanglingEndpoint,
    #[strum(to_string = "duplicate link")]
    DuplicateLink,
    #[strum(to_string = "invalid level")]
    InvalidLevel,
    #[strum(to_string = "invalid mount")]
    InvalidMount,
    #[strum(to_string = "invalid cpu")]
    InvalidCpu,
    #[strum(to_string = "invalid size")]
    InvalidSize,
    #[strum(to_string = "duplicate image")]
    DuplicateImage,
}

/// A topology invariant violation naming the rule and the offending entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("Invalid topology ({rule}) at `{entity}`: {detail}")]
pub struct ValidationError {
    pub rule: ValidationRule,
    pub entity: String,
    pub detail: String,
}

impl ValidationError {
    pub(crate) fn new(
        rule: ValidationRule,
        entity: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            rule,
            entity: entity.into(),
            detail: detail.into(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<raven_api::Error> for CoreError {
    fn from(err: raven_api::Error) -> Self {
        if err.is_unreachable() {
            let url = match &err {
                raven_api::Error::Transport(e) => e
                    .url()
                    .map_or_else(|| "<unknown>".into(), ToString::to_string),
                _ => "<unknown>".into(),
            };
            return CoreError::BackendUnavailable {
                url,
                reason: err.to_string(),
            };
        }

        match err {
            raven_api::Error::Backend { status, message } => {
                CoreError::Rejected { status, message }
            }
            raven_api::Error::Transport(ref e) => match e.status() {
                Some(status) => CoreError::Rejected {
                    status: status.as_u16(),
                    message: e.to_string(),
                },
                None => CoreError::UnexpectedResponse {
                    message: e.to_string(),
                },
            },
            raven_api::Error::Deserialization { message, body: _ } => {
                CoreError::UnexpectedResponse { message }
            }
            raven_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid backend URL: {e}"),
            },
            raven_api::Error::Tls(message) => CoreError::Config { message },
            raven_api::Error::Timeout { timeout_secs } => CoreError::BackendUnavailable {
                url: "<unknown>".into(),
                reason: format!("timed out after {timeout_secs}s"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_from_span() {
        let src = "a = 1\nbb = @";
        let loc = SourceLocation::from_span(src, 11, 1);
        assert_eq!(loc.line, 2);
        assert_eq!(loc.column, 6);
        assert_eq!(loc.to_string(), "2:6");
    }

    #[test]
    fn location_from_line_column() {
        let src = "a = 1\nbb = @\n";
        let loc = SourceLocation::from_line_column(src, 2, 6);
        assert_eq!(loc.offset, 11);
        assert_eq!(loc.length, 1);
        assert_eq!(loc.to_string(), "2:6");

        let past_end = SourceLocation::from_line_column(src, 9, 1);
        assert_eq!(past_end.offset, src.len());
        assert_eq!(past_end.length, 0);
    }

    #[test]
    fn evaluation_error_display() {
        let err = EvaluationError::new(EvaluationErrorKind::Reference, "foo is not defined")
            .with_location(SourceLocation {
                line: 3,
                column: 7,
                offset: 20,
                length: 3,
            });
        assert_eq!(
            err.to_string(),
            "reference error: foo is not defined (at 3:7)"
        );
    }

    #[test]
    fn backend_errors_map_to_rejected() {
        let err: CoreError = raven_api::Error::Backend {
            status: 500,
            message: "libvirt down".into(),
        }
        .into();
        assert!(matches!(err, CoreError::Rejected { status: 500, .. }));
    }

    #[test]
    fn api_timeout_maps_to_unavailable() {
        let err: CoreError = raven_api::Error::Timeout { timeout_secs: 2 }.into();
        assert!(err.is_backend_unavailable());
    }

    #[test]
    fn validation_error_display() {
        let err = ValidationError::new(
            ValidationRule::DanglingEndpoint,
            "ghost",
            "link `n0_eth0-ghost_eth0` references an unknown entity",
        );
        assert_eq!(
            err.to_string(),
            "Invalid topology (dangling endpoint) at `ghost`: link `n0_eth0-ghost_eth0` references an unknown entity"
        );
    }
}
