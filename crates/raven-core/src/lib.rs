//! Topology evaluation, validation, projection and status overlay.
//!
//! This crate owns everything between a topology script and what an
//! operator sees:
//!
//! - **[`Evaluator`]**: Runs a script in a fresh, isolated script engine
//!   ([`script`]) seeded only with the modeling prelude and a read-only
//!   `env`, bounded by [`EvalLimits`], and validates the result.
//!
//! - **Model** ([`model`]): The canonical [`Topology`] document with typed
//!   core fields and open extension maps. [`validate`] enforces its
//!   invariants and fails closed.
//!
//! - **[`project`]**: Pure, deterministic projection of a topology into a
//!   [`DisplayGraph`] of nodes, edges and layout hints.
//!
//! - **Status** ([`status`]): A [`StatusBoard`] per topology, refreshed
//!   wholesale by a background [`StatusOverlay`] and joined with entities at
//!   read time by [`inspect`].
//!
//! - **[`LifecycleClient`]**: push, mount, launch, configure, destroy and
//!   status requests against the orchestration backend.
//!
//! - **Primitives** ([`primitives`], [`units`]): The builder functions the
//!   script prelude exposes, callable directly from Rust.

pub mod config;
pub mod error;
pub mod evaluator;
pub mod graph;
pub mod lifecycle;
pub mod model;
pub mod primitives;
pub mod script;
pub mod status;
pub mod units;
pub mod validate;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{BackendConfig, EvalLimits, OverlayConfig, TlsVerification};
pub use error::{
    CoreError, EvaluationError, EvaluationErrorKind, SourceLocation, ValidationError,
    ValidationRule,
};
pub use evaluator::Evaluator;
pub use graph::{
    DisplayGraph, GraphEdge, GraphNode, LayoutHints, NodeColor, NodeKind, ProjectionStyle, project,
};
pub use lifecycle::{LaunchReport, LifecycleClient, LifecycleCommand, LifecycleOutcome};
pub use model::{
    Cpu, EffectiveCpu, Endpoint, EntityRef, Image, Link, Memory, Mount, Node, Participant, Role,
    Switch, Topology,
};
pub use status::{
    Category, FragmentBoard, StatusBoard, StatusMap, StatusOverlay, StatusSnapshot, StatusSource,
    StatusValue, inspect,
};
pub use units::{Size, SizeUnit};
