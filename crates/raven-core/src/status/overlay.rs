// ── Status overlay pollers ──
//
// Background tasks that keep a `StatusBoard` (and optionally a
// `FragmentBoard`) fresh. One poll is in flight per board at a time: the
// next tick waits for the current poll, and ticks missed meanwhile are
// skipped rather than queued. Failures leave the previous snapshot in
// place and are only logged.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::board::{FragmentBoard, StatusBoard};
use super::map::StatusMap;
use crate::config::OverlayConfig;
use crate::error::CoreError;

/// Where status comes from. Implemented by the lifecycle client; tests
/// supply their own.
pub trait StatusSource: Send + Sync + 'static {
    /// Structured per-entity status for a topology.
    fn fetch_status(
        &self,
        topology: &str,
    ) -> impl Future<Output = Result<StatusMap, CoreError>> + Send;

    /// Server-rendered status fragment for a topology.
    fn fetch_fragment(
        &self,
        topology: &str,
    ) -> impl Future<Output = Result<String, CoreError>> + Send;
}

/// Handle to the running pollers. Dropping it stops them.
#[derive(Debug)]
pub struct StatusOverlay {
    board: Arc<StatusBoard>,
    fragments: Option<Arc<FragmentBoard>>,
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl StatusOverlay {
    /// Start polling `topology`. Must be called within a tokio runtime.
    pub fn spawn<S: StatusSource>(source: Arc<S>, topology: &str, config: &OverlayConfig) -> Self {
        let board = Arc::new(StatusBoard::new(topology));
        let cancel = CancellationToken::new();
        let mut handles = Vec::with_capacity(2);

        handles.push(tokio::spawn(status_poll_task(
            Arc::clone(&source),
            Arc::clone(&board),
            config.poll_interval,
            config.poll_timeout,
            cancel.child_token(),
        )));

        let fragments = config.fragment.then(|| {
            let fragments = Arc::new(FragmentBoard::default());
            handles.push(tokio::spawn(fragment_poll_task(
                source,
                topology.to_owned(),
                Arc::clone(&fragments),
                config.poll_interval,
                config.poll_timeout,
                cancel.child_token(),
            )));
            fragments
        });

        debug!(topology, interval = ?config.poll_interval, "status overlay started");
        Self {
            board,
            fragments,
            cancel,
            handles,
        }
    }

    pub fn board(&self) -> &Arc<StatusBoard> {
        &self.board
    }

    pub fn fragments(&self) -> Option<&Arc<FragmentBoard>> {
        self.fragments.as_ref()
    }

    /// Stop polling and wait for the tasks to finish.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        for handle in self.handles.drain(..) {
            let _ = handle.await;
        }
    }
}

impl Drop for StatusOverlay {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn ticker(period: Duration) -> tokio::time::Interval {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

/// Poll structured status; the first tick fires immediately.
async fn status_poll_task<S: StatusSource>(
    source: Arc<S>,
    board: Arc<StatusBoard>,
    period: Duration,
    timeout: Duration,
    cancel: CancellationToken,
) {
    let mut interval = ticker(period);
    let topology = board.topology();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let outcome = tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    r = tokio::time::timeout(timeout, source.fetch_status(&topology)) => r,
                };
                match outcome {
                    Ok(Ok(map)) => {
                        let cycle = board.replace(map);
                        debug!(topology = %topology, cycle, "status refreshed");
                    }
                    Ok(Err(e)) => {
                        let failures = board.record_failure();
                        warn!(topology = %topology, error = %e, failures, "status poll failed");
                    }
                    Err(_) => {
                        let failures = board.record_failure();
                        warn!(topology = %topology, ?timeout, failures, "status poll timed out");
                    }
                }
            }
        }
    }
    debug!(topology = %topology, "status poller stopped");
}

async fn fragment_poll_task<S: StatusSource>(
    source: Arc<S>,
    topology: String,
    fragments: Arc<FragmentBoard>,
    period: Duration,
    timeout: Duration,
    cancel: CancellationToken,
) {
    let mut interval = ticker(period);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let outcome = tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    r = tokio::time::timeout(timeout, source.fetch_fragment(&topology)) => r,
                };
                match outcome {
                    Ok(Ok(fragment)) => {
                        fragments.replace(fragment);
                    }
                    Ok(Err(e)) => warn!(topology = %topology, error = %e, "fragment poll failed"),
                    Err(_) => warn!(topology = %topology, ?timeout, "fragment poll timed out"),
                }
            }
        }
    }
}
