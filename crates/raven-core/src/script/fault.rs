// Translation of engine exceptions into `EvaluationError`s.

use rquickjs::convert::Coerced;
use rquickjs::{CaughtError, Exception};

use super::{Stop, WRAP_OPEN};
use crate::config::EvalLimits;
use crate::error::{EvaluationError, EvaluationErrorKind as Kind, SourceLocation};

/// `name` of the errors thrown by prelude builders on bad arguments.
pub(crate) const INVALID_ARGUMENT_ERROR: &str = "InvalidArgumentError";
/// `name` of the errors thrown when a builder would exceed the heap budget.
pub(crate) const RESOURCE_LIMIT_ERROR: &str = "ResourceLimitError";

/// The error for a run the interrupt handler ended.
pub(crate) fn stopped(stop: Stop, limits: &EvalLimits) -> EvaluationError {
    match stop {
        Stop::Cancelled => EvaluationError::new(Kind::Cancelled, "evaluation was cancelled"),
        Stop::TimedOut | Stop::Running => EvaluationError::new(
            Kind::Timeout,
            format!(
                "script did not finish within {} ms",
                limits.timeout.as_millis()
            ),
        ),
    }
}

/// The engine could not be set up, which only happens under a heap limit
/// too small to hold the built-ins.
#[allow(clippy::needless_pass_by_value)]
pub(crate) fn engine(err: rquickjs::Error) -> EvaluationError {
    EvaluationError::new(
        Kind::ResourceLimit,
        format!("cannot start the script engine: {err}"),
    )
}

pub(crate) fn classify(caught: CaughtError<'_>, source: &str) -> EvaluationError {
    match caught {
        CaughtError::Exception(exception) => from_exception(&exception, source),
        CaughtError::Value(value) => {
            let text = value
                .get::<Coerced<String>>()
                .map_or_else(|_| "a non-error value".to_owned(), |c| c.0);
            EvaluationError::new(Kind::Thrown, text)
        }
        CaughtError::Error(rquickjs::Error::Allocation) => {
            EvaluationError::new(Kind::ResourceLimit, "out of memory")
        }
        CaughtError::Error(err) => EvaluationError::new(Kind::Type, err.to_string()),
    }
}

fn from_exception(exception: &Exception<'_>, source: &str) -> EvaluationError {
    let name: String = exception
        .as_object()
        .get::<_, Option<String>>("name")
        .ok()
        .flatten()
        .unwrap_or_default();
    let message = exception.message().unwrap_or_default();

    let kind = match name.as_str() {
        "SyntaxError" => Kind::Syntax,
        "ReferenceError" => Kind::Reference,
        "TypeError" => Kind::Type,
        "RangeError" if message.contains("call stack") => Kind::ResourceLimit,
        "RangeError" => Kind::Range,
        "InternalError" if is_exhaustion(&message) => Kind::ResourceLimit,
        INVALID_ARGUMENT_ERROR => Kind::InvalidArgument,
        RESOURCE_LIMIT_ERROR => Kind::ResourceLimit,
        _ => Kind::Thrown,
    };
    let message = match kind {
        Kind::Thrown if !name.is_empty() && name != "Error" => format!("{name}: {message}"),
        _ => message,
    };

    let error = EvaluationError::new(kind, message);
    match exception.stack().as_deref().and_then(position) {
        Some((line, column)) => error.with_location(locate(source, line, column)),
        None => error,
    }
}

fn is_exhaustion(message: &str) -> bool {
    ["out of memory", "stack overflow", "too long"]
        .iter()
        .any(|needle| message.contains(needle))
}

/// Map an engine position back onto the script text, undoing the wrapper
/// prefix on the first line.
fn locate(source: &str, line: usize, column: usize) -> SourceLocation {
    let column = if line == 1 {
        column.saturating_sub(WRAP_OPEN.len()).max(1)
    } else {
        column
    };
    SourceLocation::from_line_column(source, line, column)
}

/// First `line[:column]` found in a stack trace. Frames look like
/// `at eval_script:3:12` or `at f (eval_script:3:12)`; native frames carry
/// no position and are skipped.
fn position(stack: &str) -> Option<(usize, usize)> {
    stack.lines().find_map(|frame| {
        let frame = frame.trim().strip_prefix("at ")?;
        let place = match frame.rfind('(') {
            Some(open) => frame.get(open + 1..)?.trim_end_matches(')'),
            None => frame,
        };
        let mut parts = place.rsplit(':');
        let last = parts.next()?.parse::<usize>().ok()?;
        match parts.next().and_then(|p| p.parse::<usize>().ok()) {
            Some(line) => Some((line, last)),
            None => Some((last, 1)),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_positions() {
        assert_eq!(position("    at eval_script:3:12\n"), Some((3, 12)));
        assert_eq!(
            position("    at Node (native)\n    at <anonymous> (eval_script:5:3)\n"),
            Some((5, 3))
        );
        assert_eq!(position("    at f (eval_script:7)\n"), Some((7, 1)));
        assert_eq!(position("    at Node (native)\n"), None);
    }

    #[test]
    fn first_line_drops_wrapper() {
        let loc = locate("topo = @", 1, WRAP_OPEN.len() + 8);
        assert_eq!((loc.line, loc.column), (1, 8));
    }
}
