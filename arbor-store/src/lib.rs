//! arbor-store - in-process hierarchical realtime tree store
//!
//! Plays the part of the hosted backend: it owns the authoritative JSON
//! tree, orders concurrent writes, pushes snapshots to listeners, and
//! executes on-disconnect hooks itself when a client's session channel
//! closes.
//!
//! - `StoreHandle::spawn` starts the actor on the current tokio runtime
//! - `Session` ties on-disconnect hooks to one client connection

mod actor;
pub mod config;
mod handle;
pub mod tree;

pub use actor::{ListenerId, Listening, SessionId};
pub use config::StoreConfig;
pub use handle::{Session, StoreHandle};
pub use tree::Tree;
