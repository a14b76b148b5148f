/// Read/write-split backend selection
///
/// The router picks which backend serves a read and brings sessions up:
/// it locates the master, applies the master-failure policy, connects the
/// master when asked to, and tops the session up with read replicas until
/// the configured quota is met. Within one bring-up no backend is ever
/// offered to `connect` twice.
pub mod adaptive;
pub mod score;

use std::sync::Arc;

use tracing::Level;

use crate::config::{MasterFailureMode, RouterOptions, SelectCriteria};
use crate::core::backend::{Backend, BackendList};
use crate::core::session::{Session, SessionCommandList};
use crate::error::{AgujaError, AgujaResult};
use crate::utils::format_seconds;

pub use adaptive::AdaptiveRouting;
pub use score::{backend_select_function, BackendSelect};

/// What a bring-up round should connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionType {
    /// Pick the master this round as well as the replicas.
    All,
    /// Top up replicas only.
    Slave,
}

/// Runtime router options, fixed for the lifetime of a session.
#[derive(Debug, Clone)]
pub struct RouterSettings {
    pub slave_selection_criteria: SelectCriteria,
    /// Upper bound on replica connections per session; 0 disables the
    /// bound check.
    pub max_slave_connections: usize,
    pub master_accepts_reads: bool,
    pub master_failure_mode: MasterFailureMode,
}

impl From<&RouterOptions> for RouterSettings {
    fn from(options: &RouterOptions) -> Self {
        Self {
            slave_selection_criteria: options.slave_selection_criteria,
            max_slave_connections: options.max_slave_connections,
            master_accepts_reads: options.master_accepts_reads,
            master_failure_mode: options.master_failure_mode,
        }
    }
}

/// Outcome of one bring-up round.
#[derive(Default)]
pub struct Selection {
    /// The connected master, when this round selected one.
    pub master: Option<Arc<dyn Backend>>,
    /// Replica connections held by the session after the round, including
    /// ones that already existed.
    pub slaves_connected: usize,
    /// Replay responses the caller should expect: one per replica newly
    /// connected with a non-empty session-command list.
    pub expected_responses: usize,
}

/// The per-service router. Binds the selection function once so it stays
/// stable for every session of the service.
pub struct Router {
    settings: RouterSettings,
    backend_select: Box<dyn BackendSelect>,
}

/// Check whether it's possible to use this backend as a slave.
pub fn valid_for_slave(backend: &Arc<dyn Backend>, master: Option<&Arc<dyn Backend>>) -> bool {
    (backend.is_slave() || backend.is_relay())
        && master.map_or(true, |master| !Arc::ptr_eq(backend, master))
}

/// First backend in list order whose server is the master. List order is
/// authoritative and stable across calls within a session.
pub fn get_root_master(backends: &[Arc<dyn Backend>]) -> Option<Arc<dyn Backend>> {
    backends.iter().find(|backend| backend.is_master()).cloned()
}

/// How many valid slave candidates exist and how many of them this
/// session is already connected to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlaveCounts {
    pub found: usize,
    pub connected: usize,
}

pub fn get_slave_counts(
    backends: &[Arc<dyn Backend>],
    master: Option<&Arc<dyn Backend>>,
) -> SlaveCounts {
    let mut counts = SlaveCounts {
        found: 0,
        connected: 0,
    };

    for backend in backends {
        if backend.can_connect() && valid_for_slave(backend, master) {
            counts.found += 1;

            if backend.in_use() {
                counts.connected += 1;
            }
        }
    }

    counts
}

// Low numbers are high priority.
const PRIORITY_IDLE_READER: u8 = 1;
const PRIORITY_IDLE_MASTER: u8 = 2;
const PRIORITY_BUSY_READER: u8 = 13;

/// Find the best backend for routing reads.
///
/// Backends are grouped by priority: idle read-capable servers first,
/// then servers that only act as master, and busy read-capable servers
/// last. Only the best non-empty group is offered to the selection
/// function. Returns an index into `backends`.
pub fn find_best_backend(
    backends: &[Arc<dyn Backend>],
    select: &dyn BackendSelect,
    masters_accept_reads: bool,
) -> Option<usize> {
    let mut priorities = Vec::with_capacity(backends.len());
    let mut best_priority = u8::MAX;

    for backend in backends {
        let is_busy = backend.in_use() && backend.has_session_commands();
        let acts_slave = backend.is_slave() || (backend.is_master() && masters_accept_reads);

        let priority = if acts_slave {
            if is_busy {
                PRIORITY_BUSY_READER
            } else {
                PRIORITY_IDLE_READER
            }
        } else {
            PRIORITY_IDLE_MASTER
        };

        best_priority = best_priority.min(priority);
        priorities.push(priority);
    }

    let group: Vec<usize> = priorities
        .iter()
        .enumerate()
        .filter(|(_, priority)| **priority == best_priority)
        .map(|(index, _)| index)
        .collect();
    let contenders: BackendList = group.iter().map(|&index| backends[index].clone()).collect();

    let winner = select.select(&contenders)?;
    Some(group[winner])
}

/// One info line per backend showing the metric the configured policy
/// selects on.
fn log_server_connections(criteria: SelectCriteria, backends: &[Arc<dyn Backend>]) {
    tracing::info!(
        "Servers and {} connection counts:",
        if criteria == SelectCriteria::LeastGlobalConnections {
            "process-wide"
        } else {
            "router"
        }
    );

    for backend in backends {
        let server_ref = backend.server();
        let server = server_ref.server();

        match criteria {
            SelectCriteria::LeastGlobalConnections => tracing::info!(
                "Global connections : {} in [{}]:{} {}",
                server.stats.n_current.load(std::sync::atomic::Ordering::Relaxed),
                server.address(),
                server.port(),
                server.status_string()
            ),
            SelectCriteria::LeastRouterConnections => tracing::info!(
                "Router connections : {} in [{}]:{} {}",
                server_ref.connections(),
                server.address(),
                server.port(),
                server.status_string()
            ),
            SelectCriteria::LeastCurrentOperations => tracing::info!(
                "Current operations : {} in [{}]:{} {}",
                server.stats.n_current_ops.load(std::sync::atomic::Ordering::Relaxed),
                server.address(),
                server.port(),
                server.status_string()
            ),
            SelectCriteria::LeastBehindMaster => tracing::info!(
                "Replication lag : {} in [{}]:{} {}",
                server.rlag(),
                server.address(),
                server.port(),
                server.status_string()
            ),
            SelectCriteria::AdaptiveRouting => tracing::info!(
                "Adaptive avg. select time: {} from [{}]:{} {}",
                format_seconds(server.response_time_average()),
                server.address(),
                server.port(),
                server.status_string()
            ),
        }
    }
}

impl Router {
    pub fn new(settings: RouterSettings) -> Self {
        let backend_select = backend_select_function(settings.slave_selection_criteria);
        Self {
            settings,
            backend_select,
        }
    }

    pub fn settings(&self) -> &RouterSettings {
        &self.settings
    }

    pub fn max_slave_count(&self) -> usize {
        self.settings.max_slave_connections
    }

    /// Pick the backend that should serve the next read. Returns an index
    /// into `backends`.
    pub fn select_read_backend(&self, backends: &[Arc<dyn Backend>]) -> Option<usize> {
        find_best_backend(
            backends,
            self.backend_select.as_ref(),
            self.settings.master_accepts_reads,
        )
    }

    /// Select and connect backend servers for a session.
    ///
    /// Locates the master, applies the master-failure policy, connects
    /// the master when `connection_type` is `All`, then tops the session
    /// up with replicas until the quota is met or the candidates run out.
    /// Replica connect failures are recovered by moving on to the next
    /// candidate; the failed backend is not retried within this call.
    pub fn select_connect_backends(
        &self,
        session: &Session,
        backends: &[Arc<dyn Backend>],
        sescmd_list: Option<&SessionCommandList>,
        connection_type: ConnectionType,
    ) -> AgujaResult<Selection> {
        let master = get_root_master(backends);

        let master_usable = master.as_ref().map_or(false, |master| master.can_connect());
        if !master_usable && self.settings.master_failure_mode == MasterFailureMode::FailInstantly {
            let error = match &master {
                None => AgujaError::MasterNotFound {
                    candidates: backends.len(),
                },
                Some(master) => AgujaError::MasterDraining {
                    address: master.server().server().address().to_string(),
                },
            };
            tracing::error!("{}", error);
            return Err(error);
        }

        if tracing::enabled!(Level::INFO) {
            log_server_connections(self.settings.slave_selection_criteria, backends);
        }

        let mut selection = Selection::default();

        if connection_type == ConnectionType::All {
            if let Some(root) = &master {
                for backend in backends {
                    if Arc::ptr_eq(backend, root) {
                        if backend.can_connect() && backend.connect(session, None) {
                            tracing::info!("Selected Master: {}", backend.name());
                            selection.master = Some(backend.clone());
                        }
                        break;
                    }
                }
            }
        }

        let counts = get_slave_counts(backends, master.as_ref());
        let mut slaves_connected = counts.connected;
        let max_nslaves = self.max_slave_count();

        debug_assert!(slaves_connected <= max_nslaves || max_nslaves == 0);

        let mut candidates: BackendList = backends
            .iter()
            .filter(|backend| {
                !backend.in_use() && backend.can_connect() && valid_for_slave(backend, master.as_ref())
            })
            .cloned()
            .collect();

        while slaves_connected < max_nslaves && !candidates.is_empty() {
            let Some(index) = self.backend_select.select(&candidates) else {
                break;
            };

            let backend = candidates[index].clone();

            if backend.connect(session, sescmd_list) {
                tracing::info!("Selected Slave: {}", backend.name());

                if sescmd_list.map_or(false, |commands| !commands.is_empty()) {
                    selection.expected_responses += 1;
                }

                slaves_connected += 1;
            }

            // Consumed whether or not the connect succeeded; a backend is
            // never retried within one bring-up.
            candidates.remove(index);
        }

        selection.slaves_connected = slaves_connected;
        Ok(selection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{status, Server, ServerRef};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Backend double with scriptable role, availability and connect
    /// outcomes, counting every connect attempt.
    struct TestBackend {
        server_ref: Arc<ServerRef>,
        master: bool,
        slave: bool,
        relay: bool,
        connectable: bool,
        in_use: AtomicBool,
        has_sescmd: AtomicBool,
        fail_connects: AtomicUsize,
        connect_attempts: AtomicUsize,
    }

    impl TestBackend {
        fn new(name: &str, master: bool, slave: bool, relay: bool) -> Self {
            let server = Arc::new(Server::new(name, "10.0.0.1", 3306));
            let mut bits = status::RUNNING;
            if master {
                bits |= status::MASTER;
            }
            if slave {
                bits |= status::SLAVE;
            }
            if relay {
                bits |= status::RELAY;
            }
            server.set_status(bits);

            Self {
                server_ref: Arc::new(ServerRef::new(server, 1.0)),
                master,
                slave,
                relay,
                connectable: true,
                in_use: AtomicBool::new(false),
                has_sescmd: AtomicBool::new(false),
                fail_connects: AtomicUsize::new(0),
                connect_attempts: AtomicUsize::new(0),
            }
        }

        fn master(name: &str) -> Self {
            Self::new(name, true, false, false)
        }

        fn slave(name: &str) -> Self {
            Self::new(name, false, true, false)
        }

        fn relay(name: &str) -> Self {
            Self::new(name, false, false, true)
        }

        fn drained(mut self) -> Self {
            self.connectable = false;
            self
        }

        fn busy(self) -> Self {
            self.in_use.store(true, Ordering::Relaxed);
            self.has_sescmd.store(true, Ordering::Relaxed);
            self
        }

        fn with_router_connections(self, connections: usize) -> Self {
            for _ in 0..connections {
                self.server_ref.inc_connections();
            }
            self
        }

        fn failing_connects(self, failures: usize) -> Self {
            self.fail_connects.store(failures, Ordering::Relaxed);
            self
        }

        fn attempts(&self) -> usize {
            self.connect_attempts.load(Ordering::Relaxed)
        }
    }

    impl Backend for TestBackend {
        fn is_master(&self) -> bool {
            self.master
        }

        fn is_slave(&self) -> bool {
            self.slave
        }

        fn is_relay(&self) -> bool {
            self.relay
        }

        fn in_use(&self) -> bool {
            self.in_use.load(Ordering::Relaxed)
        }

        fn can_connect(&self) -> bool {
            self.connectable
        }

        fn has_session_commands(&self) -> bool {
            self.has_sescmd.load(Ordering::Relaxed)
        }

        fn server(&self) -> &ServerRef {
            &self.server_ref
        }

        fn connect(&self, _session: &Session, sescmd_list: Option<&SessionCommandList>) -> bool {
            self.connect_attempts.fetch_add(1, Ordering::Relaxed);

            if self.fail_connects.load(Ordering::Relaxed) > 0 {
                self.fail_connects.fetch_sub(1, Ordering::Relaxed);
                return false;
            }
            if self.in_use() || !self.can_connect() {
                return false;
            }

            self.in_use.store(true, Ordering::Relaxed);
            self.server_ref.inc_connections();
            if sescmd_list.map_or(false, |commands| !commands.is_empty()) {
                self.has_sescmd.store(true, Ordering::Relaxed);
            }
            true
        }

        fn name(&self) -> &str {
            self.server_ref.server().name()
        }
    }

    fn as_list(backends: &[Arc<TestBackend>]) -> BackendList {
        backends
            .iter()
            .map(|backend| backend.clone() as Arc<dyn Backend>)
            .collect()
    }

    fn router(criteria: SelectCriteria, max_slaves: usize) -> Router {
        Router::new(RouterSettings {
            slave_selection_criteria: criteria,
            max_slave_connections: max_slaves,
            master_accepts_reads: false,
            master_failure_mode: MasterFailureMode::FailInstantly,
        })
    }

    #[test]
    fn test_valid_for_slave() {
        let master: Arc<dyn Backend> = Arc::new(TestBackend::master("m"));
        let slave: Arc<dyn Backend> = Arc::new(TestBackend::slave("s"));
        let relay: Arc<dyn Backend> = Arc::new(TestBackend::relay("r"));

        assert!(valid_for_slave(&slave, None));
        assert!(valid_for_slave(&slave, Some(&master)));
        assert!(valid_for_slave(&relay, Some(&master)));
        assert!(!valid_for_slave(&master, None));
        // The master itself is never a slave candidate.
        assert!(!valid_for_slave(&master, Some(&master)));
    }

    #[test]
    fn test_get_root_master_takes_first_in_list_order() {
        let m1 = Arc::new(TestBackend::master("m1"));
        let m2 = Arc::new(TestBackend::master("m2"));
        let list = as_list(&[Arc::new(TestBackend::slave("s")), m1.clone(), m2]);

        let root = get_root_master(&list).unwrap();
        assert!(Arc::ptr_eq(&root, &list[1]));
        assert_eq!(root.name(), "m1");
    }

    #[test]
    fn test_get_slave_counts() {
        let master = Arc::new(TestBackend::master("m"));
        let connected = Arc::new(TestBackend::slave("s1").busy());
        let idle = Arc::new(TestBackend::slave("s2"));
        let drained = Arc::new(TestBackend::slave("s3").drained());
        let list = as_list(&[master, connected, idle, drained]);

        let root = get_root_master(&list);
        let counts = get_slave_counts(&list, root.as_ref());
        assert_eq!(
            counts,
            SlaveCounts {
                found: 2,
                connected: 1
            }
        );
    }

    #[test]
    fn test_three_slave_pool_prefers_open_connections() {
        // S3 is busy replaying session commands and loses to any idle
        // slave; S2 beats S1 on router connections.
        let s1 = Arc::new(TestBackend::slave("s1").with_router_connections(2));
        let s2 = Arc::new(TestBackend::slave("s2").with_router_connections(1));
        let s3 = Arc::new(TestBackend::slave("s3").busy());
        let list = as_list(&[s1, s2, s3]);

        let select = backend_select_function(SelectCriteria::LeastRouterConnections);
        assert_eq!(find_best_backend(&list, select.as_ref(), false), Some(1));
    }

    #[test]
    fn test_idle_master_preempts_busy_slave_when_reads_allowed() {
        let master = Arc::new(TestBackend::master("m"));
        let slave = Arc::new(TestBackend::slave("s").busy());
        let list = as_list(&[slave, master]);

        let select = backend_select_function(SelectCriteria::LeastCurrentOperations);
        assert_eq!(find_best_backend(&list, select.as_ref(), true), Some(1));
        // With reads-to-master disabled the idle master still outranks the
        // busy slave, via the middle priority group.
        assert_eq!(find_best_backend(&list, select.as_ref(), false), Some(1));
    }

    #[test]
    fn test_priority_preemption() {
        let idle = Arc::new(TestBackend::slave("idle"));
        let busy1 = Arc::new(TestBackend::slave("busy1").busy());
        let busy2 = Arc::new(TestBackend::slave("busy2").busy());
        let list = as_list(&[busy1, busy2, idle]);

        let select = backend_select_function(SelectCriteria::LeastRouterConnections);
        assert_eq!(find_best_backend(&list, select.as_ref(), false), Some(2));
    }

    #[test]
    fn test_find_best_backend_empty_list() {
        let select = backend_select_function(SelectCriteria::LeastRouterConnections);
        assert_eq!(find_best_backend(&[], select.as_ref(), false), None);
    }

    #[test]
    fn test_bring_up_connects_master_and_slaves() {
        let master = Arc::new(TestBackend::master("m"));
        let s1 = Arc::new(TestBackend::slave("s1"));
        let s2 = Arc::new(TestBackend::slave("s2"));
        let s3 = Arc::new(TestBackend::slave("s3"));
        let list = as_list(&[master.clone(), s1, s2, s3]);

        let router = router(SelectCriteria::LeastRouterConnections, 2);
        let session = Session::default();
        let selection = router
            .select_connect_backends(&session, &list, None, ConnectionType::All)
            .unwrap();

        let root = get_root_master(&list).unwrap();
        assert!(Arc::ptr_eq(selection.master.as_ref().unwrap(), &root));
        assert!(master.in_use());
        assert_eq!(selection.slaves_connected, 2);
        assert_eq!(selection.expected_responses, 0);

        let connected_slaves = list
            .iter()
            .filter(|backend| backend.in_use() && valid_for_slave(backend, Some(&root)))
            .count();
        assert_eq!(connected_slaves, 2);
    }

    #[test]
    fn test_slave_round_leaves_master_alone() {
        let master = Arc::new(TestBackend::master("m"));
        let slave = Arc::new(TestBackend::slave("s"));
        let list = as_list(&[master.clone(), slave]);

        let router = router(SelectCriteria::LeastRouterConnections, 1);
        let session = Session::default();
        let selection = router
            .select_connect_backends(&session, &list, None, ConnectionType::Slave)
            .unwrap();

        assert!(selection.master.is_none());
        assert!(!master.in_use());
        assert_eq!(master.attempts(), 0);
        assert_eq!(selection.slaves_connected, 1);
    }

    #[test]
    fn test_instant_fail_without_master() {
        let list = as_list(&[
            Arc::new(TestBackend::slave("s1")),
            Arc::new(TestBackend::slave("s2")),
        ]);

        let router = router(SelectCriteria::LeastRouterConnections, 2);
        let session = Session::default();
        let result = router.select_connect_backends(&session, &list, None, ConnectionType::All);

        assert!(matches!(
            result,
            Err(AgujaError::MasterNotFound { candidates: 2 })
        ));
    }

    #[test]
    fn test_instant_fail_with_drained_master() {
        let master = Arc::new(TestBackend::master("m").drained());
        let slave = Arc::new(TestBackend::slave("s"));
        let list = as_list(&[master.clone(), slave.clone()]);

        let router = router(SelectCriteria::LeastRouterConnections, 2);
        let session = Session::default();
        let result = router.select_connect_backends(&session, &list, None, ConnectionType::All);

        assert!(matches!(result, Err(AgujaError::MasterDraining { .. })));
        assert_eq!(master.attempts(), 0);
        assert_eq!(slave.attempts(), 0);
    }

    #[test]
    fn test_fail_on_write_proceeds_without_master() {
        let slave = Arc::new(TestBackend::slave("s"));
        let list = as_list(&[slave.clone()]);

        let router = Router::new(RouterSettings {
            slave_selection_criteria: SelectCriteria::LeastRouterConnections,
            max_slave_connections: 1,
            master_accepts_reads: false,
            master_failure_mode: MasterFailureMode::FailOnWrite,
        });
        let session = Session::default();
        let selection = router
            .select_connect_backends(&session, &list, None, ConnectionType::All)
            .unwrap();

        assert!(selection.master.is_none());
        assert_eq!(selection.slaves_connected, 1);
        assert!(slave.in_use());
    }

    #[test]
    fn test_connect_failure_moves_to_next_candidate() {
        // C1 wins the first round but refuses the connection; the second
        // round must pick C2 and never come back to C1.
        let master = Arc::new(TestBackend::master("m"));
        let c1 = Arc::new(TestBackend::slave("c1").failing_connects(1));
        let c2 = Arc::new(TestBackend::slave("c2").with_router_connections(5));
        let list = as_list(&[master, c1.clone(), c2.clone()]);

        let router = router(SelectCriteria::LeastRouterConnections, 2);
        let session = Session::default();
        let selection = router
            .select_connect_backends(&session, &list, None, ConnectionType::All)
            .unwrap();

        assert_eq!(c1.attempts(), 1);
        assert_eq!(c2.attempts(), 1);
        assert!(c2.in_use());
        assert_eq!(selection.slaves_connected, 1);
    }

    #[test]
    fn test_no_backend_attempted_twice_when_all_connects_fail() {
        let master = Arc::new(TestBackend::master("m"));
        let slaves: Vec<Arc<TestBackend>> = (0..3)
            .map(|i| Arc::new(TestBackend::slave(&format!("s{}", i)).failing_connects(10)))
            .collect();
        let mut backends = vec![master.clone()];
        backends.extend(slaves.iter().cloned());
        let list = as_list(&backends);

        let router = router(SelectCriteria::LeastRouterConnections, 5);
        let session = Session::default();
        let selection = router
            .select_connect_backends(&session, &list, None, ConnectionType::All)
            .unwrap();

        assert_eq!(selection.slaves_connected, 0);
        for slave in &slaves {
            assert_eq!(slave.attempts(), 1);
        }
    }

    #[test]
    fn test_top_up_ranks_relays_by_score_alone() {
        // In the top-up loop the configured policy alone governs the
        // ordering; a relay with less lag beats a slave with more.
        let master = Arc::new(TestBackend::master("m"));
        let slave = Arc::new(TestBackend::slave("s"));
        slave.server().server().set_rlag(30);
        let relay = Arc::new(TestBackend::relay("r"));
        relay.server().server().set_rlag(0);
        let list = as_list(&[master, slave.clone(), relay.clone()]);

        let router = router(SelectCriteria::LeastBehindMaster, 1);
        let session = Session::default();
        let selection = router
            .select_connect_backends(&session, &list, None, ConnectionType::All)
            .unwrap();

        assert_eq!(selection.slaves_connected, 1);
        assert!(relay.in_use());
        assert_eq!(slave.attempts(), 0);
    }

    #[test]
    fn test_zero_max_slaves_connects_none() {
        let master = Arc::new(TestBackend::master("m"));
        let slave = Arc::new(TestBackend::slave("s"));
        let list = as_list(&[master, slave.clone()]);

        let router = router(SelectCriteria::LeastRouterConnections, 0);
        let session = Session::default();
        let selection = router
            .select_connect_backends(&session, &list, None, ConnectionType::All)
            .unwrap();

        assert_eq!(selection.slaves_connected, 0);
        assert_eq!(slave.attempts(), 0);
    }

    #[test]
    fn test_bring_up_is_idempotent() {
        let master = Arc::new(TestBackend::master("m"));
        let s1 = Arc::new(TestBackend::slave("s1"));
        let s2 = Arc::new(TestBackend::slave("s2"));
        let s3 = Arc::new(TestBackend::slave("s3"));
        let list = as_list(&[master, s1.clone(), s2.clone(), s3.clone()]);

        let router = router(SelectCriteria::LeastRouterConnections, 2);
        let session = Session::default();
        router
            .select_connect_backends(&session, &list, None, ConnectionType::All)
            .unwrap();

        // A second top-up finds the quota already met and connects nothing.
        let selection = router
            .select_connect_backends(&session, &list, None, ConnectionType::Slave)
            .unwrap();
        assert_eq!(selection.slaves_connected, 2);
        let total_attempts = s1.attempts() + s2.attempts() + s3.attempts();
        assert_eq!(total_attempts, 2);
    }

    #[test]
    fn test_expected_responses_counts_replayed_slaves() {
        let master = Arc::new(TestBackend::master("m"));
        let s1 = Arc::new(TestBackend::slave("s1"));
        let s2 = Arc::new(TestBackend::slave("s2"));
        let failing = Arc::new(TestBackend::slave("s3").failing_connects(10));
        let list = as_list(&[master, s1, s2, failing]);

        let mut commands = SessionCommandList::new();
        commands.push(crate::core::session::SessionCommand::new("SET sql_mode=''"));

        let router = router(SelectCriteria::LeastRouterConnections, 3);
        let session = Session::default();
        let selection = router
            .select_connect_backends(&session, &list, Some(&commands), ConnectionType::All)
            .unwrap();

        // Two replicas connected and received the replay; the failing one
        // contributes nothing.
        assert_eq!(selection.slaves_connected, 2);
        assert_eq!(selection.expected_responses, 2);
    }

    #[test]
    fn test_empty_command_list_expects_no_responses() {
        let master = Arc::new(TestBackend::master("m"));
        let slave = Arc::new(TestBackend::slave("s"));
        let list = as_list(&[master, slave]);

        let commands = SessionCommandList::new();
        let router = router(SelectCriteria::LeastRouterConnections, 1);
        let session = Session::default();
        let selection = router
            .select_connect_backends(&session, &list, Some(&commands), ConnectionType::All)
            .unwrap();

        assert_eq!(selection.slaves_connected, 1);
        assert_eq!(selection.expected_responses, 0);
    }

    #[test]
    fn test_select_read_backend_uses_configured_policy() {
        let lagging = Arc::new(TestBackend::slave("lagging"));
        lagging.server().server().set_rlag(30);
        let fresh = Arc::new(TestBackend::slave("fresh"));
        fresh.server().server().set_rlag(1);
        let list = as_list(&[lagging, fresh]);

        let router = router(SelectCriteria::LeastBehindMaster, 2);
        assert_eq!(router.select_read_backend(&list), Some(1));
    }
}
