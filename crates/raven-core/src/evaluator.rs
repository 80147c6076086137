// ── Sandboxed evaluator ──
//
// Runs a topology script and turns its result into a validated `Topology`.
// Each call builds a fresh engine on its own thread, so evaluations share
// no state and may run concurrently. The engine interrupts itself at the
// deadline; the caller additionally stops waiting shortly after it, so a
// long native call inside the engine cannot hold the caller past its
// budget.

use std::collections::BTreeMap;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::config::EvalLimits;
use crate::error::{CoreError, EvaluationError, EvaluationErrorKind};
use crate::model::Topology;
use crate::script;
use crate::validate;

/// Native stack for the engine thread on top of the engine's own limit.
const THREAD_STACK_HEADROOM: usize = 8 * 1024 * 1024;
/// How long past the deadline the caller waits for the engine to report.
const DEADLINE_GRACE: Duration = Duration::from_millis(250);
/// How often a waiting caller checks for cancellation.
const WAIT_TICK: Duration = Duration::from_millis(20);

/// Stateless, reentrant script evaluator.
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    limits: EvalLimits,
}

impl Evaluator {
    pub fn new(limits: EvalLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &EvalLimits {
        &self.limits
    }

    /// Run `source` and return its raw result without validation.
    pub fn evaluate_raw(
        &self,
        source: &str,
        env: &BTreeMap<String, String>,
    ) -> Result<serde_json::Value, CoreError> {
        self.run(source, env, None)
    }

    /// Run `source` and validate the result into a canonical topology.
    pub fn evaluate(
        &self,
        source: &str,
        env: &BTreeMap<String, String>,
    ) -> Result<Topology, CoreError> {
        validate::from_value(self.run(source, env, None)?)
    }

    /// Like [`evaluate`](Self::evaluate), abandoning the run once `cancel`
    /// fires.
    pub fn evaluate_with_cancel(
        &self,
        source: &str,
        env: &BTreeMap<String, String>,
        cancel: &CancellationToken,
    ) -> Result<Topology, CoreError> {
        validate::from_value(self.run(source, env, Some(cancel))?)
    }

    /// Evaluate on the blocking pool so an async caller stays responsive.
    pub async fn evaluate_async(
        &self,
        source: String,
        env: BTreeMap<String, String>,
        cancel: CancellationToken,
    ) -> Result<Topology, CoreError> {
        let evaluator = self.clone();
        tokio::task::spawn_blocking(move || evaluator.evaluate_with_cancel(&source, &env, &cancel))
            .await
            .map_err(|e| CoreError::Internal(format!("evaluation task failed: {e}")))?
    }

    #[instrument(skip_all, fields(bytes = source.len()))]
    fn run(
        &self,
        source: &str,
        env: &BTreeMap<String, String>,
        cancel: Option<&CancellationToken>,
    ) -> Result<serde_json::Value, CoreError> {
        let (tx, rx) = mpsc::sync_channel(1);
        let limits = self.limits.clone();
        let (owned_source, owned_env) = (source.to_owned(), env.clone());
        let engine_cancel = cancel.cloned();
        thread::Builder::new()
            .name("raven-eval".into())
            .stack_size(self.limits.max_stack_bytes.saturating_add(THREAD_STACK_HEADROOM))
            .spawn(move || {
                let outcome = script::run(&owned_source, &owned_env, &limits, engine_cancel.as_ref());
                // The caller may have stopped waiting.
                let _ = tx.send(outcome);
            })
            .map_err(|e| CoreError::Internal(format!("cannot start evaluator thread: {e}")))?;

        let outcome = self.wait(&rx, cancel)?;
        match outcome? {
            Some(value) => {
                debug!("script produced a result");
                Ok(value)
            }
            None => Err(CoreError::MissingResult),
        }
    }

    /// Wait for the engine thread, giving up at the deadline plus grace or
    /// on cancellation. An abandoned thread finishes on its own once the
    /// engine's interrupt fires.
    fn wait(
        &self,
        rx: &mpsc::Receiver<Result<Option<serde_json::Value>, EvaluationError>>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Result<Option<serde_json::Value>, EvaluationError>, CoreError> {
        let mut give_up = Instant::now() + self.limits.timeout + DEADLINE_GRACE;
        let mut cancelled = false;
        loop {
            match rx.recv_timeout(WAIT_TICK) {
                Ok(outcome) => return Ok(outcome),
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    return Err(CoreError::Internal("evaluator thread panicked".into()));
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {}
            }
            if !cancelled && cancel.is_some_and(CancellationToken::is_cancelled) {
                cancelled = true;
                give_up = give_up.min(Instant::now() + DEADLINE_GRACE);
            }
            if Instant::now() >= give_up {
                warn!(cancelled, "abandoning an evaluation still running inside the engine");
                let err = if cancelled {
                    EvaluationError::new(EvaluationErrorKind::Cancelled, "evaluation was cancelled")
                } else {
                    EvaluationError::new(
                        EvaluationErrorKind::Timeout,
                        format!(
                            "script did not finish within {} ms",
                            self.limits.timeout.as_millis()
                        ),
                    )
                };
                return Ok(Err(err));
            }
        }
    }
}
