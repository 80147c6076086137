// raven-api: Async Rust client for the raven orchestration backend

pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use client::BackendClient;
pub use error::Error;
pub use models::LaunchResponse;
pub use transport::{TlsMode, TransportConfig};
