/// Backend abstraction consumed by the routing core
///
/// A `Backend` pairs one server with the connection state of one client
/// session. Backends are shared by reference (`Arc<dyn Backend>`) between
/// the session and the router's backend list, so state changes made by
/// `connect` are observed by both sides. The wire-level connection itself
/// is driven by the protocol layer; from the router's point of view
/// `connect` is an atomic step that either attaches the backend or fails.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::core::session::{Session, SessionCommandList};
use crate::core::ServerRef;

/// Capability surface the routing core needs from one backend.
pub trait Backend: Send + Sync {
    fn is_master(&self) -> bool;
    fn is_slave(&self) -> bool;
    fn is_relay(&self) -> bool;

    /// Whether this session currently holds a connection to the backend.
    fn in_use(&self) -> bool;

    /// Whether the backend accepts new connections. A drained or down
    /// server reports false.
    fn can_connect(&self) -> bool;

    /// Whether replayed session commands are still executing on this
    /// backend.
    fn has_session_commands(&self) -> bool;

    /// The per-service server reference carrying weight and statistics.
    fn server(&self) -> &ServerRef;

    /// Attach the backend to the session, replaying `sescmd_list` if one is
    /// given. Returns false when the attachment could not be made; the
    /// caller is expected to move on to another candidate.
    fn connect(&self, session: &Session, sescmd_list: Option<&SessionCommandList>) -> bool;

    fn name(&self) -> &str;
}

/// List of backends as seen by one session.
pub type BackendList = Vec<Arc<dyn Backend>>;

/// Standard `Backend` implementation doing the router-side bookkeeping.
///
/// Role and availability are delegated to the shared `Server`; `in_use`
/// and the pending-session-command flag are per-session state.
#[derive(Debug)]
pub struct RouterBackend {
    server_ref: Arc<ServerRef>,
    in_use: AtomicBool,
    has_sescmd: AtomicBool,
}

impl RouterBackend {
    pub fn new(server_ref: Arc<ServerRef>) -> Self {
        Self {
            server_ref,
            in_use: AtomicBool::new(false),
            has_sescmd: AtomicBool::new(false),
        }
    }

    /// Called by the session layer once the replayed session commands have
    /// all produced their responses.
    pub fn session_commands_complete(&self) {
        self.has_sescmd.store(false, Ordering::Relaxed);
    }

    /// Detach from the session and release the connection counters. Driven
    /// by session close; the routing core never calls this.
    pub fn close(&self) {
        if self.in_use.swap(false, Ordering::Relaxed) {
            self.server_ref.dec_connections();
            self.server_ref
                .server()
                .stats
                .n_current
                .fetch_sub(1, Ordering::Relaxed);
        }
    }
}

impl Backend for RouterBackend {
    fn is_master(&self) -> bool {
        self.server_ref.server().is_master()
    }

    fn is_slave(&self) -> bool {
        self.server_ref.server().is_slave()
    }

    fn is_relay(&self) -> bool {
        self.server_ref.server().is_relay()
    }

    fn in_use(&self) -> bool {
        self.in_use.load(Ordering::Relaxed)
    }

    fn can_connect(&self) -> bool {
        let server = self.server_ref.server();
        server.is_running() && !server.is_draining()
    }

    fn has_session_commands(&self) -> bool {
        self.has_sescmd.load(Ordering::Relaxed)
    }

    fn server(&self) -> &ServerRef {
        &self.server_ref
    }

    fn connect(&self, session: &Session, sescmd_list: Option<&SessionCommandList>) -> bool {
        if self.in_use() || !self.can_connect() {
            return false;
        }

        self.in_use.store(true, Ordering::Relaxed);
        self.server_ref.inc_connections();
        self.server_ref
            .server()
            .stats
            .n_current
            .fetch_add(1, Ordering::Relaxed);

        if let Some(commands) = sescmd_list {
            if !commands.is_empty() {
                self.has_sescmd.store(true, Ordering::Relaxed);
                tracing::debug!(
                    "Replaying {} session commands on {} for {}",
                    commands.len(),
                    self.name(),
                    session.id
                );
            }
        }

        tracing::debug!("Session {} attached to backend {}", session.id, self.name());
        true
    }

    fn name(&self) -> &str {
        self.server_ref.server().name()
    }
}
