pub mod config;
pub mod core;
/// Aguja - backend selection core for a read/write-split database proxy
///
/// Aguja decides which backend server serves a read, how many read
/// replicas a session pre-connects, and which server becomes the master.
/// Selection combines configured policies (connection counts, replication
/// lag, in-flight operations, response-time weighted roulette) with
/// priority grouping and idempotent bring-up semantics, all on the
/// request hot path.
///
/// The crate deliberately stops at the selection boundary: wire
/// protocols, authentication and health monitoring live in other layers
/// and are consumed through the `Backend` trait and the monitor-owned
/// `Server` state.
pub mod error;
pub mod routing;
pub mod utils;
pub mod worker;

pub use crate::config::{Config, MasterFailureMode, SelectCriteria};
pub use crate::core::backend::{Backend, BackendList, RouterBackend};
pub use crate::core::session::{Session, SessionCommand, SessionCommandList};
pub use crate::core::{Server, ServerRef, ServerStats};
pub use crate::error::{AgujaError, AgujaResult};
pub use crate::routing::{
    backend_select_function, find_best_backend, get_root_master, get_slave_counts, BackendSelect,
    ConnectionType, Router, RouterSettings, Selection, SlaveCounts,
};
