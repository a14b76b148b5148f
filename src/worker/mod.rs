/// Worker-local facilities
///
/// Every client session is bound to exactly one worker thread, and all
/// selection work for that session runs on it. The pseudo-random engine
/// used by adaptive routing is therefore kept in thread-local storage:
/// no locking, no sharing between workers, one independent entropy seed
/// per worker.
use std::cell::RefCell;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Pseudo-random engine owned by one worker.
#[derive(Debug)]
pub struct RandomEngine {
    rng: SmallRng,
}

impl RandomEngine {
    /// Engine seeded from the system entropy source.
    pub fn from_entropy() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
        }
    }

    /// Deterministically seeded engine for tests and benchmarks.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Uniform draw from the half-open interval [0, 1).
    pub fn zero_to_one_exclusive(&mut self) -> f64 {
        self.rng.gen()
    }
}

thread_local! {
    static ENGINE: RefCell<RandomEngine> = RefCell::new(RandomEngine::from_entropy());
}

/// Run `f` with the current worker's random engine.
pub fn with_random_engine<T>(f: impl FnOnce(&mut RandomEngine) -> T) -> T {
    ENGINE.with(|engine| f(&mut engine.borrow_mut()))
}

/// Replace the current worker's engine with a deterministically seeded one.
/// Meant for tests and benchmarks that need reproducible draws.
pub fn reseed(seed: u64) {
    ENGINE.with(|engine| *engine.borrow_mut() = RandomEngine::seeded(seed));
}
