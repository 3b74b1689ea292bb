//! arbor-model - shared vocabulary for the Arbor tree store
//!
//! Everything both sides of the transport agree on: paths, JSON node
//! values and their ordering, list queries, push-key generation, clocks
//! and the error type.

pub mod clock;
pub mod error;
pub mod ops;
pub mod path;
pub mod push_id;
pub mod query;
pub mod value;

pub use clock::{Clock, MockClock, SystemClock};
pub use error::{TreeError, TreeResult};
pub use ops::DisconnectOp;
pub use path::{Path, INFO_ROOT};
pub use push_id::{push_id_timestamp, PushIdGenerator};
pub use query::{Limit, OrderBy, Query};
pub use value::{children_of, server_timestamp, ListItem, Snapshot};

pub use serde_json::{Map, Value};

/// Virtual path carrying the client's connection state.
pub const CONNECTED_PATH: &str = ".info/connected";

/// Virtual path carrying the server clock offset estimate in milliseconds.
pub const SERVER_TIME_OFFSET_PATH: &str = ".info/serverTimeOffset";
