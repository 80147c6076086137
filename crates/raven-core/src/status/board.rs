// ── Status boards ──
//
// Readers load the current snapshot without locking; a successful poll
// swaps in a whole new snapshot, so a reader sees one cycle or the next,
// never a mix. Each swap bumps the cycle and wakes `watch` subscribers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::{ArcSwap, ArcSwapOption};
use chrono::{DateTime, Utc};
use tokio::sync::watch;

use super::map::{Category, StatusMap, StatusValue, UNKNOWN};

/// One complete poll result.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub topology: String,
    /// Number of successful polls so far; `0` before the first one.
    pub cycle: u64,
    pub fetched_at: Option<DateTime<Utc>>,
    pub map: StatusMap,
}

/// Latest status for one topology.
#[derive(Debug)]
pub struct StatusBoard {
    current: ArcSwap<StatusSnapshot>,
    cycles: watch::Sender<u64>,
    failures: AtomicU64,
}

impl StatusBoard {
    pub fn new(topology: impl Into<String>) -> Self {
        let (cycles, _) = watch::channel(0);
        Self {
            current: ArcSwap::from_pointee(StatusSnapshot {
                topology: topology.into(),
                cycle: 0,
                fetched_at: None,
                map: StatusMap::default(),
            }),
            cycles,
            failures: AtomicU64::new(0),
        }
    }

    pub fn topology(&self) -> String {
        self.current.load().topology.clone()
    }

    /// The current snapshot (cheap `Arc` clone).
    pub fn snapshot(&self) -> Arc<StatusSnapshot> {
        self.current.load_full()
    }

    /// Status of one entity, or `None` if it was never reported.
    pub fn lookup(&self, category: Category, name: &str) -> Option<StatusValue> {
        self.current.load().map.get(category, name).cloned()
    }

    /// Display state of one entity, or [`UNKNOWN`].
    pub fn state(&self, category: Category, name: &str) -> String {
        self.lookup(category, name)
            .map_or_else(|| UNKNOWN.to_owned(), |v| v.state().to_owned())
    }

    /// Replace the whole map and return the new cycle number.
    pub fn replace(&self, map: StatusMap) -> u64 {
        let previous = self.current.load();
        let cycle = previous.cycle + 1;
        self.current.store(Arc::new(StatusSnapshot {
            topology: previous.topology.clone(),
            cycle,
            fetched_at: Some(Utc::now()),
            map,
        }));
        self.failures.store(0, Ordering::Relaxed);
        self.cycles.send_replace(cycle);
        cycle
    }

    /// Count a swallowed poll failure; returns the consecutive total.
    pub fn record_failure(&self) -> u64 {
        self.failures.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn consecutive_failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Subscribe to cycle numbers as snapshots are swapped in.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.cycles.subscribe()
    }
}

/// Latest server-rendered status fragment.
#[derive(Debug, Default)]
pub struct FragmentBoard {
    current: ArcSwapOption<String>,
    updates: AtomicU64,
}

impl FragmentBoard {
    pub fn get(&self) -> Option<Arc<String>> {
        self.current.load_full()
    }

    pub fn replace(&self, fragment: String) -> u64 {
        self.current.store(Some(Arc::new(fragment)));
        self.updates.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn updates(&self) -> u64 {
        self.updates.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn map_with(state: &str) -> StatusMap {
        let mut map = StatusMap::default();
        map.insert(Category::Nodes, "n0", StatusValue::Text(state.into()));
        map.insert(Category::Nodes, "n1", StatusValue::Text(state.into()));
        map
    }

    #[test]
    fn empty_board_reads_unknown() {
        let board = StatusBoard::new("lab");
        assert_eq!(board.state(Category::Nodes, "n0"), UNKNOWN);
        assert_eq!(board.snapshot().cycle, 0);
        assert!(board.snapshot().fetched_at.is_none());
    }

    #[test]
    fn replace_swaps_whole_map() {
        let board = StatusBoard::new("lab");
        board.replace(map_with("running"));
        let mut next = StatusMap::default();
        next.insert(Category::Links, "l0", StatusValue::Text("up".into()));
        assert_eq!(board.replace(next), 2);

        assert_eq!(board.state(Category::Nodes, "n0"), UNKNOWN);
        assert_eq!(board.state(Category::Links, "l0"), "up");
        assert_eq!(board.snapshot().topology, "lab");
    }

    #[test]
    fn failures_reset_on_success() {
        let board = StatusBoard::new("lab");
        assert_eq!(board.record_failure(), 1);
        assert_eq!(board.record_failure(), 2);
        board.replace(StatusMap::default());
        assert_eq!(board.consecutive_failures(), 0);
    }

    #[test]
    fn readers_never_see_mixed_cycles() {
        let board = Arc::new(StatusBoard::new("lab"));
        let writer = {
            let board = Arc::clone(&board);
            std::thread::spawn(move || {
                for i in 0..500 {
                    let state = if i % 2 == 0 { "running" } else { "off" };
                    board.replace(map_with(state));
                }
            })
        };
        for _ in 0..2000 {
            let snap = board.snapshot();
            assert_eq!(
                snap.map.state(Category::Nodes, "n0"),
                snap.map.state(Category::Nodes, "n1")
            );
        }
        writer.join().unwrap();
        assert_eq!(board.snapshot().cycle, 500);
    }

    #[test]
    fn subscribers_see_new_cycles() {
        let board = StatusBoard::new("lab");
        let mut rx = board.subscribe();
        board.replace(StatusMap::default());
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), 1);
    }

    #[test]
    fn fragment_board() {
        let board = FragmentBoard::default();
        assert!(board.get().is_none());
        board.replace("<table/>".into());
        assert_eq!(board.get().unwrap().as_str(), "<table/>");
        assert_eq!(board.updates(), 1);
    }
}
