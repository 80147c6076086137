#![allow(clippy::unwrap_used)]
// Status overlay polling with a scripted source and paused time.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use raven_core::status::UNKNOWN;
use raven_core::{Category, CoreError, OverlayConfig, StatusMap, StatusOverlay, StatusSource, StatusValue};

// ── Scripted source ─────────────────────────────────────────────────

/// Answers polls from a queue (`None` = backend down), then keeps
/// answering `"steady"`.
#[derive(Default)]
struct ScriptedSource {
    replies: Mutex<VecDeque<Option<&'static str>>>,
    delay: Duration,
    calls: AtomicU64,
    in_flight: AtomicU64,
    max_in_flight: AtomicU64,
}

impl ScriptedSource {
    fn new(replies: &[Option<&'static str>], delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().copied().collect()),
            delay,
            ..Self::default()
        })
    }

    fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    async fn respond(&self) -> Result<&'static str, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let reply = self.replies.lock().unwrap().pop_front().unwrap_or(Some("steady"));
        reply.ok_or_else(|| CoreError::BackendUnavailable {
            url: "http://backend.test".into(),
            reason: "connection refused".into(),
        })
    }
}

impl StatusSource for ScriptedSource {
    async fn fetch_status(&self, _topology: &str) -> Result<StatusMap, CoreError> {
        let state = self.respond().await?;
        let mut map = StatusMap::default();
        map.insert(Category::Nodes, "n0", StatusValue::Text(state.into()));
        Ok(map)
    }

    async fn fetch_fragment(&self, topology: &str) -> Result<String, CoreError> {
        Ok(format!("<div>{topology}</div>"))
    }
}

fn config(interval_ms: u64, timeout_ms: u64) -> OverlayConfig {
    OverlayConfig {
        poll_interval: Duration::from_millis(interval_ms),
        poll_timeout: Duration::from_millis(timeout_ms),
        fragment: false,
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_failed_poll_keeps_previous_map() {
    let source = ScriptedSource::new(&[Some("running"), None, Some("off")], Duration::ZERO);
    let overlay = StatusOverlay::spawn(Arc::clone(&source), "lab", &config(1000, 500));
    let board = Arc::clone(overlay.board());
    let mut cycles = board.subscribe();

    // first poll fires immediately
    cycles.changed().await.unwrap();
    assert_eq!(board.state(Category::Nodes, "n0"), "running");
    assert_eq!(board.snapshot().cycle, 1);

    // second poll fails: stale but intact
    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert_eq!(source.calls(), 2);
    assert_eq!(board.state(Category::Nodes, "n0"), "running");
    assert_eq!(board.consecutive_failures(), 1);

    cycles.changed().await.unwrap();
    assert_eq!(board.state(Category::Nodes, "n0"), "off");
    assert_eq!(board.consecutive_failures(), 0);
    assert_eq!(board.state(Category::Links, "anything"), UNKNOWN);
}

#[tokio::test(start_paused = true)]
async fn test_slow_polls_never_overlap() {
    let source = ScriptedSource::new(&[], Duration::from_millis(2500));
    let overlay = StatusOverlay::spawn(Arc::clone(&source), "lab", &config(1000, 5000));

    tokio::time::sleep(Duration::from_secs(9)).await;
    assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 1);
    // an overrun tick starts the next poll right away, never a backlog:
    // polls start at 0, 2.5, 5 and 7.5 seconds
    assert_eq!(source.calls(), 4);
    assert_eq!(overlay.board().snapshot().cycle, 3);
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_poll_counts_as_failure() {
    let source = ScriptedSource::new(&[], Duration::from_secs(60));
    let overlay = StatusOverlay::spawn(Arc::clone(&source), "lab", &config(1000, 1000));

    tokio::time::sleep(Duration::from_millis(1500)).await;
    let board = overlay.board();
    assert_eq!(board.consecutive_failures(), 1);
    assert_eq!(board.snapshot().cycle, 0);
    assert_eq!(board.state(Category::Nodes, "n0"), UNKNOWN);
}

#[tokio::test(start_paused = true)]
async fn test_drop_stops_polling() {
    let source = ScriptedSource::new(&[], Duration::ZERO);
    let overlay = StatusOverlay::spawn(Arc::clone(&source), "lab", &config(1000, 500));

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(source.calls(), 3);
    drop(overlay);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(source.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_fragment_refresh() {
    let source = ScriptedSource::new(&[], Duration::ZERO);
    let overlay = StatusOverlay::spawn(
        Arc::clone(&source),
        "lab",
        &OverlayConfig {
            fragment: true,
            ..config(1000, 500)
        },
    );

    tokio::time::sleep(Duration::from_millis(100)).await;
    let fragments = overlay.fragments().unwrap();
    assert_eq!(fragments.get().unwrap().as_str(), "<div>lab</div>");
    overlay.shutdown().await;
}
