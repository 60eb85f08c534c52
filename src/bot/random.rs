//! Random source for bot decisions.
//!
//! Production passes a `rand` generator; tests pass a seeded one or a
//! `ScriptedRandom` to pin each draw.

use rand::Rng;
use std::collections::VecDeque;

pub trait RandomSource {
    /// Uniform in `[0, 1)`.
    fn next_f64(&mut self) -> f64;

    /// Uniform index in `[0, n)`. `n` must be non-zero.
    fn below(&mut self, n: usize) -> usize {
        debug_assert!(n > 0);
        ((self.next_f64() * n as f64) as usize).min(n.saturating_sub(1))
    }

    /// Uniform in `[lo, hi)`.
    fn between(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    /// Uniform integer in `[lo, hi]`.
    fn inclusive(&mut self, lo: u64, hi: u64) -> u64 {
        if hi <= lo {
            return lo;
        }
        let span = usize::try_from((hi - lo).saturating_add(1)).unwrap_or(usize::MAX);
        lo.saturating_add(self.below(span) as u64)
    }

    /// True with probability `p`.
    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}

impl<R: Rng> RandomSource for R {
    fn next_f64(&mut self) -> f64 {
        self.gen::<f64>()
    }
}

/// Replays a fixed list of draws, then repeats the last one.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRandom {
    draws: VecDeque<f64>,
    last: f64,
    consumed: usize,
}

impl ScriptedRandom {
    pub fn new(draws: impl IntoIterator<Item = f64>) -> Self {
        Self {
            draws: draws.into_iter().collect(),
            last: 0.0,
            consumed: 0,
        }
    }

    pub fn consumed(&self) -> usize {
        self.consumed
    }
}

impl RandomSource for ScriptedRandom {
    fn next_f64(&mut self) -> f64 {
        self.consumed += 1;
        if let Some(v) = self.draws.pop_front() {
            self.last = v;
        }
        self.last
    }
}

/// In-place Fisher-Yates shuffle.
pub(crate) fn shuffle<T>(items: &mut [T], rng: &mut impl RandomSource) {
    for i in (1..items.len()).rev() {
        let j = rng.below(i + 1);
        items.swap(i, j);
    }
}
