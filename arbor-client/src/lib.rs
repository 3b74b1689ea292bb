//! arbor-client - adapter over a hierarchical realtime tree store
//!
//! - `TreeAdapter` is the generic read/subscribe/write/presence facade
//! - `TreeTransport` is the seam to a store; `InProcessTransport` talks to
//!   an `arbor-store` actor in the same process
//! - `TreeClient::builder()` wires them together from a `ClientConfig`

pub mod adapter;
pub mod client;
pub mod config;
pub mod error;
pub mod in_process;
pub mod presence;
pub mod subscription;
pub mod transport;

pub use adapter::TreeAdapter;
pub use client::{TreeClient, TreeClientBuilder};
pub use config::ClientConfig;
pub use error::ClientError;
pub use in_process::InProcessTransport;
pub use presence::PresenceMonitor;
pub use subscription::Subscription;
pub use transport::{AsyncResult, SnapshotStream, TreeTransport};
