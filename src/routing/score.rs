/// Scoring-based backend selection for the non-adaptive policies
///
/// Every policy maps a server to a real-valued score where lower is
/// better, then takes the minimum over the candidate set. A candidate the
/// session is not yet connected to competes with an inflated score of
/// `(score + 5.0) * 1.5`, which biases selection toward connections that
/// are already open. A server weight of 0.0 maps to `f64::MAX` and
/// effectively excludes the server.
use std::sync::Arc;

use crate::config::SelectCriteria;
use crate::core::backend::Backend;
use crate::core::ServerRef;
use crate::routing::adaptive::AdaptiveRouting;

/// A bound backend selection function.
///
/// Returns an index into the candidate slice, or `None` when no candidate
/// qualifies. The caller owns candidate removal; the selection function
/// never mutates the set.
pub trait BackendSelect: Send + Sync {
    fn select(&self, candidates: &[Arc<dyn Backend>]) -> Option<usize>;
}

/// Minimum-score scan shared by the non-adaptive policies.
///
/// Ties break toward the earliest candidate. When every score works out
/// to `f64::MAX` (all candidates excluded by weight) no winner exists.
pub(crate) fn best_score(
    candidates: &[Arc<dyn Backend>],
    server_score: impl Fn(&ServerRef) -> f64,
) -> Option<usize> {
    let mut min = f64::MAX;
    let mut best = None;

    for (index, candidate) in candidates.iter().enumerate() {
        let mut score = server_score(candidate.server());

        if !candidate.in_use() {
            // Prefer servers we are already connected to.
            score = (score + 5.0) * 1.5;
        }

        if min > score {
            min = score;
            best = Some(index);
        }
    }

    best
}

fn router_connections_score(server: &ServerRef) -> f64 {
    let weight = server.weight();
    if weight == 0.0 {
        return f64::MAX;
    }
    (server.connections() as f64 + 1.0) / weight
}

fn global_connections_score(server: &ServerRef) -> f64 {
    let weight = server.weight();
    if weight == 0.0 {
        return f64::MAX;
    }
    let n_current = server
        .server()
        .stats
        .n_current
        .load(std::sync::atomic::Ordering::Relaxed);
    (n_current as f64 + 1.0) / weight
}

fn behind_master_score(server: &ServerRef) -> f64 {
    let weight = server.weight();
    if weight == 0.0 {
        return f64::MAX;
    }
    server.server().rlag() as f64 / weight
}

fn current_operations_score(server: &ServerRef) -> f64 {
    let weight = server.weight();
    if weight == 0.0 {
        return f64::MAX;
    }
    let n_current_ops = server
        .server()
        .stats
        .n_current_ops
        .load(std::sync::atomic::Ordering::Relaxed);
    (n_current_ops as f64 + 1.0) / weight
}

/// Fewest connections opened by this router.
#[derive(Debug, Default)]
pub struct LeastRouterConnections;

impl BackendSelect for LeastRouterConnections {
    fn select(&self, candidates: &[Arc<dyn Backend>]) -> Option<usize> {
        best_score(candidates, router_connections_score)
    }
}

/// Fewest connections across all sources.
#[derive(Debug, Default)]
pub struct LeastGlobalConnections;

impl BackendSelect for LeastGlobalConnections {
    fn select(&self, candidates: &[Arc<dyn Backend>]) -> Option<usize> {
        best_score(candidates, global_connections_score)
    }
}

/// Smallest replication lag.
#[derive(Debug, Default)]
pub struct LeastBehindMaster;

impl BackendSelect for LeastBehindMaster {
    fn select(&self, candidates: &[Arc<dyn Backend>]) -> Option<usize> {
        best_score(candidates, behind_master_score)
    }
}

/// Fewest in-flight operations.
#[derive(Debug, Default)]
pub struct LeastCurrentOperations;

impl BackendSelect for LeastCurrentOperations {
    fn select(&self, candidates: &[Arc<dyn Backend>]) -> Option<usize> {
        best_score(candidates, current_operations_score)
    }
}

/// Bind the selection function for a policy. Called once per session so
/// the bound function stays stable for the session's lifetime.
pub fn backend_select_function(criteria: SelectCriteria) -> Box<dyn BackendSelect> {
    match criteria {
        SelectCriteria::LeastGlobalConnections => Box::new(LeastGlobalConnections),
        SelectCriteria::LeastRouterConnections => Box::new(LeastRouterConnections),
        SelectCriteria::LeastBehindMaster => Box::new(LeastBehindMaster),
        SelectCriteria::LeastCurrentOperations => Box::new(LeastCurrentOperations),
        SelectCriteria::AdaptiveRouting => Box::new(AdaptiveRouting),
    }
}
