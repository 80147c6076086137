// ── Topology scripts ──
//
// Scripts run in an embedded QuickJS engine. Every run builds its own
// runtime and context, so nothing survives from one run to the next. The
// runtime carries a heap limit and a native stack limit, and its interrupt
// handler enforces the deadline and cancellation. A run sees the standard
// built-ins, the modeling prelude and `env`: the engine has no module
// loader and no filesystem, network or process bindings.

mod fault;
pub mod json;
pub mod prelude;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Instant;

use rquickjs::{CatchResultExt, CaughtError, Context, Ctx, Function, Runtime, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::config::EvalLimits;
use crate::error::EvaluationError;

/// Name of the binding a script leaves its result in.
pub const RESULT_BINDING: &str = "topo";

/// Opening of the function a script body runs in. Kept on the first line so
/// engine line numbers match the script text.
pub(crate) const WRAP_OPEN: &str = "(function () {";

/// Closes the wrapper, falling back to a function-scoped `topo` binding.
const WRAP_CLOSE: &str =
    "\n;return typeof topo === 'undefined' ? undefined : topo;\n})";

/// Why the interrupt handler stopped a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum Stop {
    Running = 0,
    TimedOut = 1,
    Cancelled = 2,
}

impl Stop {
    fn load(flag: &AtomicU8) -> Self {
        match flag.load(Ordering::Acquire) {
            1 => Self::TimedOut,
            2 => Self::Cancelled,
            _ => Self::Running,
        }
    }
}

/// Run `source` to completion and return its result as JSON.
///
/// A top-level `return` wins; otherwise the `topo` binding is read.
/// `Ok(None)` means the script finished without producing either.
pub fn run(
    source: &str,
    env: &BTreeMap<String, String>,
    limits: &EvalLimits,
    cancel: Option<&CancellationToken>,
) -> Result<Option<serde_json::Value>, EvaluationError> {
    if cancel.is_some_and(CancellationToken::is_cancelled) {
        return Err(fault::stopped(Stop::Cancelled, limits));
    }

    let stop = Arc::new(AtomicU8::new(Stop::Running as u8));
    let runtime = Runtime::new().map_err(fault::engine)?;
    runtime.set_memory_limit(limits.max_heap_bytes);
    runtime.set_max_stack_size(limits.max_stack_bytes);
    runtime.set_interrupt_handler(Some(Box::new(interrupt(
        Instant::now() + limits.timeout,
        cancel.cloned(),
        Arc::clone(&stop),
    ))));
    let context = Context::full(&runtime).map_err(fault::engine)?;
    debug!(
        heap = limits.max_heap_bytes,
        stack = limits.max_stack_bytes,
        "script engine ready"
    );

    context.with(|ctx| {
        execute(&ctx, source, env, limits).map_err(|caught| {
            let stopped = Stop::load(&stop);
            if stopped == Stop::Running {
                fault::classify(caught, source)
            } else {
                fault::stopped(stopped, limits)
            }
        })
    })
}

fn execute<'js>(
    ctx: &Ctx<'js>,
    source: &str,
    env: &BTreeMap<String, String>,
    limits: &EvalLimits,
) -> Result<Option<serde_json::Value>, CaughtError<'js>> {
    prelude::install(ctx, env, limits.max_heap_bytes).catch(ctx)?;

    let body: Function<'js> = ctx
        .eval(format!("{WRAP_OPEN}{source}{WRAP_CLOSE}"))
        .catch(ctx)?;
    let mut result: Value<'js> = body.call(()).catch(ctx)?;
    if result.is_undefined() {
        result = ctx.globals().get(RESULT_BINDING).catch(ctx)?;
    }
    trace!(kind = ?result.type_of(), "script returned");

    if result.is_undefined() {
        return Ok(None);
    }
    json::to_json(ctx, result).catch(ctx)
}

/// Polled by the engine between instructions; `true` aborts the run with
/// an uncatchable exception.
fn interrupt(
    deadline: Instant,
    cancel: Option<CancellationToken>,
    stop: Arc<AtomicU8>,
) -> impl FnMut() -> bool + Send + 'static {
    move || {
        let reason = if cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            Stop::Cancelled
        } else if Instant::now() >= deadline {
            Stop::TimedOut
        } else {
            return false;
        };
        stop.store(reason as u8, Ordering::Release);
        true
    }
}

