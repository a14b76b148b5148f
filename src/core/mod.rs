/// Shared server model consumed by the routing core
///
/// A `Server` is owned by the monitor/configuration layer and outlives any
/// client session. The routing core only reads its state; the monitor
/// mutates status bits, replication lag and the response-time average at
/// runtime, so all of those live in atomics and are read with relaxed
/// ordering. Readers must tolerate stale values.
pub mod backend;
pub mod session;

use std::sync::atomic::{AtomicI64, AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;

/// Server status bits, maintained by the monitor subsystem.
pub mod status {
    pub const RUNNING: u8 = 1 << 0;
    pub const MASTER: u8 = 1 << 1;
    pub const SLAVE: u8 = 1 << 2;
    pub const RELAY: u8 = 1 << 3;
    pub const DRAINING: u8 = 1 << 4;
}

/// Replication lag reported by the monitor while the lag of a replica is
/// still unknown.
pub const RLAG_UNDETERMINED: i64 = -1;

/// Process-wide connection statistics for one server.
#[derive(Debug, Default)]
pub struct ServerStats {
    /// Current connections to this server across all routing services.
    pub n_current: AtomicUsize,
    /// In-flight operations on this server.
    pub n_current_ops: AtomicUsize,
}

/// One configured database server.
#[derive(Debug)]
pub struct Server {
    name: String,
    address: String,
    port: u16,
    status: AtomicU8,
    /// Seconds this replica trails its source; `RLAG_UNDETERMINED` when the
    /// monitor does not know.
    rlag: AtomicI64,
    /// Average response time in seconds, stored as f64 bits so the monitor
    /// can update it lock-free.
    response_time: AtomicU64,
    pub stats: ServerStats,
}

impl Server {
    pub fn new(name: impl Into<String>, address: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            port,
            status: AtomicU8::new(0),
            rlag: AtomicI64::new(RLAG_UNDETERMINED),
            response_time: AtomicU64::new(0f64.to_bits()),
            stats: ServerStats::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_running(&self) -> bool {
        self.status.load(Ordering::Relaxed) & status::RUNNING != 0
    }

    pub fn is_draining(&self) -> bool {
        self.status.load(Ordering::Relaxed) & status::DRAINING != 0
    }

    /// A master that is down does not count as a master.
    pub fn is_master(&self) -> bool {
        let bits = self.status.load(Ordering::Relaxed);
        bits & status::RUNNING != 0 && bits & status::MASTER != 0
    }

    pub fn is_slave(&self) -> bool {
        let bits = self.status.load(Ordering::Relaxed);
        bits & status::RUNNING != 0 && bits & status::SLAVE != 0
    }

    pub fn is_relay(&self) -> bool {
        let bits = self.status.load(Ordering::Relaxed);
        bits & status::RUNNING != 0 && bits & status::RELAY != 0
    }

    /// Replace the full status bitmask (monitor interface).
    pub fn set_status(&self, bits: u8) {
        self.status.store(bits, Ordering::Relaxed);
    }

    pub fn rlag(&self) -> i64 {
        self.rlag.load(Ordering::Relaxed)
    }

    pub fn set_rlag(&self, seconds: i64) {
        self.rlag.store(seconds, Ordering::Relaxed);
    }

    /// Average response time in seconds as last published by the monitor.
    pub fn response_time_average(&self) -> f64 {
        f64::from_bits(self.response_time.load(Ordering::Relaxed))
    }

    pub fn set_response_time_average(&self, seconds: f64) {
        self.response_time.store(seconds.to_bits(), Ordering::Relaxed);
    }

    /// Human-readable status, e.g. "Master, Running".
    pub fn status_string(&self) -> String {
        let bits = self.status.load(Ordering::Relaxed);
        let mut parts = Vec::new();
        if bits & status::MASTER != 0 {
            parts.push("Master");
        }
        if bits & status::RELAY != 0 {
            parts.push("Relay Master");
        }
        if bits & status::SLAVE != 0 {
            parts.push("Slave");
        }
        if bits & status::DRAINING != 0 {
            parts.push("Draining");
        }
        if bits & status::RUNNING != 0 {
            parts.push("Running");
        } else {
            parts.push("Down");
        }
        parts.join(", ")
    }
}

/// Per-service reference to a server.
///
/// Holds the state local to one routing service: the number of connections
/// this router has opened to the server and the configured selection
/// weight. Shared between all sessions of the service.
#[derive(Debug)]
pub struct ServerRef {
    server: Arc<Server>,
    /// Router-local live connections to this server.
    connections: AtomicUsize,
    /// Configuration-derived weight; 0.0 excludes the server from
    /// non-adaptive selection.
    server_weight: f64,
}

impl ServerRef {
    pub fn new(server: Arc<Server>, server_weight: f64) -> Self {
        Self {
            server,
            connections: AtomicUsize::new(0),
            server_weight,
        }
    }

    pub fn server(&self) -> &Arc<Server> {
        &self.server
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::Relaxed)
    }

    pub fn inc_connections(&self) {
        self.connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec_connections(&self) {
        self.connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn weight(&self) -> f64 {
        self.server_weight
    }
}
