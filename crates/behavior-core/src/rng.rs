//! Deterministic RNG helpers.
//!
//! Small and dependency-free so that a module's random choices can be
//! persisted as a single `u64` and replayed exactly after restore. Not
//! cryptographic.

pub trait DeterministicRng {
    fn next_u64(&mut self) -> u64;

    fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    /// Uniform index in `0..len`. Returns 0 for `len == 0`.
    fn next_index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        // Multiply-shift keeps the bias negligible for the child counts we see.
        ((self.next_u64() as u128 * len as u128) >> 64) as usize
    }

    fn next_bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// SplitMix64: tiny generator whose whole state is one word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Current state; feeding it back to [`SplitMix64::new`] resumes the stream.
    pub fn state(&self) -> u64 {
        self.state
    }

    fn step(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E3779B97F4A7C15);
        mix64(self.state)
    }
}

impl DeterministicRng for SplitMix64 {
    fn next_u64(&mut self) -> u64 {
        self.step()
    }
}

pub fn mix64(mut x: u64) -> u64 {
    x ^= x >> 30;
    x = x.wrapping_mul(0xBF58476D1CE4E5B9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94D049BB133111EB);
    x ^ (x >> 31)
}
