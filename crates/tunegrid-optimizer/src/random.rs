//! Injectable randomness for the explorer.

use std::collections::VecDeque;

use rand::Rng;

/// Source of uniform indices.
pub trait RandomSource: Send {
    /// Return an index in `0..len`. `len` is never zero.
    fn index(&mut self, len: usize) -> usize;
}

/// Adapter for any `rand` generator.
#[derive(Debug, Clone)]
pub struct RngSource<R>(pub R);

impl RngSource<rand::rngs::StdRng> {
    /// OS-seeded standard generator.
    pub fn from_entropy() -> Self {
        use rand::SeedableRng;
        RngSource(rand::rngs::StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        use rand::SeedableRng;
        RngSource(rand::rngs::StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng + Send> RandomSource for RngSource<R> {
    fn index(&mut self, len: usize) -> usize {
        self.0.gen_range(0..len)
    }
}

/// Replays a fixed sequence of indices, then repeats the last one.
///
/// Each value is reduced modulo the requested `len`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    script: VecDeque<usize>,
    last: usize,
}

impl ScriptedSource {
    pub fn new(script: impl IntoIterator<Item = usize>) -> Self {
        Self {
            script: script.into_iter().collect(),
            last: 0,
        }
    }

    /// Values not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl RandomSource for ScriptedSource {
    fn index(&mut self, len: usize) -> usize {
        if let Some(next) = self.script.pop_front() {
            self.last = next;
        }
        self.last % len
    }
}
