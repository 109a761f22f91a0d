//! Injectable randomness
//!
//! Confidence jitter and every template/phrase pick go through [`Randomness`]
//! so callers can pin outputs with a seed or a stub.

use rand::rngs::{StdRng, ThreadRng};
use rand::{Rng, SeedableRng};

/// Source of the engine's random choices
pub trait Randomness {
    /// Index in `0..len`. `len` is never zero.
    fn index(&mut self, len: usize) -> usize;

    /// Uniform value in `[low, high)`
    fn uniform(&mut self, low: f64, high: f64) -> f64;
}

/// Pick one element of a pool, `None` for an empty pool
pub fn choose<'a, T>(rng: &mut dyn Randomness, pool: &'a [T]) -> Option<&'a T> {
    if pool.is_empty() {
        return None;
    }
    pool.get(rng.index(pool.len()))
}

/// [`Randomness`] backed by any `rand` generator
#[derive(Debug, Clone)]
pub struct RngSource<R> {
    rng: R,
}

impl<R: Rng> RngSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngSource<StdRng> {
    /// Deterministic generator for reproducible runs
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Independent generator seeded from the OS
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl RngSource<ThreadRng> {
    /// Thread-local generator
    pub fn thread() -> Self {
        Self::new(rand::thread_rng())
    }
}

impl<R: Rng> Randomness for RngSource<R> {
    fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        if high <= low {
            return low;
        }
        self.rng.gen_range(low..high)
    }
}

/// Stub that always takes the first option and the low end of every range
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstChoice;

impl Randomness for FirstChoice {
    fn index(&mut self, _len: usize) -> usize {
        0
    }

    fn uniform(&mut self, low: f64, _high: f64) -> f64 {
        low
    }
}
