// ── Status overlay ──
//
// Runtime status lives beside the topology, never inside it: a board per
// topology name, refreshed wholesale by a background poller and joined
// with entities at read time.

pub mod board;
pub mod inspect;
pub mod map;
pub mod overlay;

pub use board::{FragmentBoard, StatusBoard, StatusSnapshot};
pub use inspect::inspect;
pub use map::{Category, DomainStatus, StatusMap, StatusValue, UNKNOWN};
pub use overlay::{StatusOverlay, StatusSource};
