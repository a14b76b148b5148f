/// Response-time weighted probabilistic selection
///
/// Builds a roulette wheel over the candidates from the inverse cube of
/// each server's response-time average, so faster servers are strongly
/// preferred, then draws the winner with the worker-local random engine.
/// Every candidate keeps a floor share of the wheel so that a server that
/// has been slow keeps getting sampled and can recover once it speeds up.
use std::sync::Arc;

use crate::core::backend::Backend;
use crate::routing::score::BackendSelect;
use crate::worker;

/// Substitute for a response-time average of zero: an arbitrary very
/// short duration (0.1 us), used and updated (almost) immediately.
const VERY_QUICK: f64 = 1.0 / 10_000_000.0;

/// Floor divisor, ~0.5% of the pre-normalized wheel mass.
const DIVISOR: f64 = 197.0;

/// Adaptive routing selection.
#[derive(Debug, Default)]
pub struct AdaptiveRouting;

impl BackendSelect for AdaptiveRouting {
    fn select(&self, candidates: &[Arc<dyn Backend>]) -> Option<usize> {
        if candidates.is_empty() {
            return None;
        }

        let slots = roulette_slots(candidates);
        let ball = worker::with_random_engine(|engine| engine.zero_to_one_exclusive());

        let mut slot_walk = 0.0;
        for (winner, slot) in slots.iter().enumerate() {
            slot_walk += slot;
            if ball < slot_walk {
                return Some(winner);
            }
        }

        // Only reachable through floating-point drift in the cumulative
        // sum; the last candidate wins.
        Some(candidates.len() - 1)
    }
}

/// Normalized wheel slots for the candidates; the slots sum to 1.0.
pub(crate) fn roulette_slots(candidates: &[Arc<dyn Backend>]) -> Vec<f64> {
    let mut slots = Vec::with_capacity(candidates.len());

    // Fill slots with inverses of averages, cubed to favor faster
    // servers even more.
    let mut pre_total = 0.0;
    for candidate in candidates {
        let ave = candidate.server().server().response_time_average();
        let inverse = if ave == 0.0 { 1.0 / VERY_QUICK } else { 1.0 / ave };
        let slot = inverse * inverse * inverse;
        pre_total += slot;
        slots.push(slot);
    }

    // Guarantee the slowest servers a fraction of the wheel so they keep
    // being sampled.
    let floor = pre_total / DIVISOR;
    let mut total = 0.0;
    for slot in slots.iter_mut() {
        *slot = slot.max(floor);
        total += *slot;
    }

    for slot in slots.iter_mut() {
        *slot /= total;
    }

    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::backend::{BackendList, RouterBackend};
    use crate::core::{status, Server, ServerRef};

    fn slave_with_response_time(name: &str, seconds: f64) -> Arc<dyn Backend> {
        let server = Arc::new(Server::new(name, "10.0.0.1", 3306));
        server.set_status(status::RUNNING | status::SLAVE);
        server.set_response_time_average(seconds);
        Arc::new(RouterBackend::new(Arc::new(ServerRef::new(server, 1.0))))
    }

    #[test]
    fn test_slots_sum_to_one() {
        let list: BackendList = vec![
            slave_with_response_time("a", 0.001),
            slave_with_response_time("b", 0.010),
            slave_with_response_time("c", 0.100),
            slave_with_response_time("d", 1.0),
        ];

        let slots = roulette_slots(&list);
        let total: f64 = slots.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_every_candidate_keeps_floor_probability() {
        let list: BackendList = vec![
            slave_with_response_time("fast", 0.0001),
            slave_with_response_time("slow-1", 2.0),
            slave_with_response_time("slow-2", 5.0),
            slave_with_response_time("slow-3", 9.0),
        ];

        let slots = roulette_slots(&list);
        let floor = 1.0 / (198.0 * list.len() as f64);
        for slot in slots {
            assert!(slot >= floor, "slot {} fell below floor {}", slot, floor);
        }
    }

    #[test]
    fn test_zero_average_counts_as_very_fast() {
        let list: BackendList = vec![
            slave_with_response_time("unmeasured", 0.0),
            slave_with_response_time("slow", 0.5),
        ];

        let slots = roulette_slots(&list);
        assert!(slots[0] > slots[1]);
        assert!(slots[0] > 0.99);
    }

    #[test]
    fn test_single_candidate_always_wins() {
        let list: BackendList = vec![slave_with_response_time("only", 0.3)];
        for _ in 0..100 {
            assert_eq!(AdaptiveRouting.select(&list), Some(0));
        }
    }

    #[test]
    fn test_empty_candidates_yield_none() {
        let list: BackendList = Vec::new();
        assert_eq!(AdaptiveRouting.select(&list), None);
    }

    #[test]
    fn test_fast_server_dominates_draws() {
        // 1ms vs 1s averages: the fast server holds ~99.5% of the wheel
        // once the floor is applied.
        let list: BackendList = vec![
            slave_with_response_time("fast", 0.001),
            slave_with_response_time("slow", 1.0),
        ];

        worker::reseed(42);
        let mut fast_wins = 0;
        for _ in 0..10_000 {
            if AdaptiveRouting.select(&list) == Some(0) {
                fast_wins += 1;
            }
        }

        assert!(
            (9_800..=9_990).contains(&fast_wins),
            "fast server won {} of 10000 draws",
            fast_wins
        );
    }
}
