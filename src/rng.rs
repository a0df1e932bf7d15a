//! The single seedable uniform-random source threaded through every
//! probability-of-success decision (§5, §9).

use rand::{RngCore, SeedableRng};
use rand_core::impls::fill_bytes_via_next;
use rand_core::Error;

/// Thin wrapper around a seeded PRNG. Kept as a distinct type (rather
/// than exposing `rand::rngs::StdRng` directly) so the rest of the
/// crate depends on one narrow `uniform()` contract instead of on
/// `rand`'s full API surface.
pub struct Rng {
    inner: rand::rngs::StdRng,
}

impl Rng {
    /// Construct from an explicit seed. Same seed, same sequence of
    /// draws, same scenario outcome — the reproducibility §5 requires.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            inner: rand::rngs::StdRng::seed_from_u64(seed),
        }
    }

    /// Draw one uniform sample `r ∈ [0, 1)`, the quantity every
    /// decode-success comparison (`p > r`) in §4.3 consumes.
    pub fn uniform(&mut self) -> f64 {
        // `next_u64` is uniform over its full range; dividing by
        // 2^64 keeps the result in [0, 1) without ever rounding up to 1.0.
        (self.inner.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }
}

impl RngCore for Rng {
    fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        fill_bytes_via_next(self, dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = Rng::from_seed(42);
        let mut b = Rng::from_seed(42);
        for _ in 0..16 {
            assert_eq!(a.uniform(), b.uniform());
        }
    }

    #[test]
    fn stays_in_unit_interval() {
        let mut rng = Rng::from_seed(7);
        for _ in 0..1000 {
            let r = rng.uniform();
            assert!((0.0..1.0).contains(&r));
        }
    }
}
