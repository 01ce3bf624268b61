//! Deterministic random number generation.
//!
//! Every stochastic draw in a model instance flows through one
//! [`JavaRandom`], a 48-bit linear congruential generator compatible with
//! `java.util.Random`. Published reference trajectories for this family of
//! models were produced with that generator, so bit-identical replication
//! requires the exact same update rule, seeding and bit extraction, not
//! merely "a seeded RNG".
//!
//! The generator state is serializable (including the cached second
//! Gaussian deviate) so that a restored snapshot continues the exact
//! stream it was interrupted on.

use serde::{Deserialize, Serialize};

const MULTIPLIER: u64 = 0x5DEE_CE66D;
const ADDEND: u64 = 0xB;
const MASK: u64 = (1 << 48) - 1;

/// Seeded 48-bit LCG with the `java.util.Random` contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JavaRandom {
    state: u64,
    /// Second deviate produced by the polar method, consumed by the next
    /// `next_gaussian` call. Any other draw interleaved between the two
    /// paired calls shifts the stream; callers keep Gaussian pairs adjacent.
    gaussian_cache: Option<f64>,
}

impl JavaRandom {
    /// Create a generator from a 64-bit seed, scrambled as
    /// `(seed ^ 0x5DEECE66D) mod 2^48`.
    pub fn new(seed: u64) -> Self {
        JavaRandom {
            state: (seed ^ MULTIPLIER) & MASK,
            gaussian_cache: None,
        }
    }

    /// Reset to the stream produced by `seed`, discarding any cached
    /// Gaussian deviate.
    pub fn set_seed(&mut self, seed: u64) {
        self.state = (seed ^ MULTIPLIER) & MASK;
        self.gaussian_cache = None;
    }

    /// Advance the LCG once and return the top `bits` bits of the new state.
    fn next(&mut self, bits: u32) -> u32 {
        debug_assert!(bits >= 1 && bits <= 32);
        self.state = self
            .state
            .wrapping_mul(MULTIPLIER)
            .wrapping_add(ADDEND)
            & MASK;
        (self.state >> (48 - bits)) as u32
    }

    /// Uniform double in `[0, 1)` built from a 26-bit and a 27-bit draw
    /// combined into a 53-bit mantissa.
    pub fn next_double(&mut self) -> f64 {
        let hi = (self.next(26) as u64) << 27;
        let lo = self.next(27) as u64;
        (hi + lo) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Uniform integer in `[0, bound)`.
    ///
    /// A bound that is a power of two uses the high bits directly; any
    /// other bound goes through an unbiased rejection loop. A bound of
    /// zero or less is a fatal input error.
    pub fn next_int(&mut self, bound: i32) -> i32 {
        assert!(bound > 0, "next_int bound must be positive, got {bound}");
        if (bound & bound.wrapping_neg()) == bound {
            // Power of two: scale the 31-bit draw.
            return ((bound as i64 * self.next(31) as i64) >> 31) as i32;
        }
        loop {
            let bits = self.next(31) as i32;
            let val = bits % bound;
            // Reject draws from the incomplete top interval (the check is
            // the 32-bit overflow test from the reference algorithm).
            if (bits as i64) - (val as i64) + (bound as i64 - 1) <= i32::MAX as i64 {
                return val;
            }
        }
    }

    /// Uniform 64-bit integer from two consecutive 32-bit draws.
    pub fn next_long(&mut self) -> i64 {
        let hi = self.next(32) as i32 as i64;
        let lo = self.next(32) as i32 as i64;
        (hi << 32).wrapping_add(lo)
    }

    /// Standard normal deviate via the polar (Box–Muller rejection) method.
    ///
    /// Each rejection round consumes two `next_double` draws and produces
    /// two deviates; the second is cached and returned by the following
    /// call without touching the LCG.
    pub fn next_gaussian(&mut self) -> f64 {
        if let Some(g) = self.gaussian_cache.take() {
            return g;
        }
        loop {
            let v1 = 2.0 * self.next_double() - 1.0;
            let v2 = 2.0 * self.next_double() - 1.0;
            let s = v1 * v1 + v2 * v2;
            if s < 1.0 && s != 0.0 {
                let multiplier = (-2.0 * s.ln() / s).sqrt();
                self.gaussian_cache = Some(v2 * multiplier);
                return v1 * multiplier;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // Reference vectors computed from the java.util.Random algorithm.

    #[test]
    fn next_double_matches_reference_for_seed_13() {
        let mut rng = JavaRandom::new(13);
        let expected = [
            0.7298032243379924,
            0.44461356134079055,
            0.05128392223198952,
            0.7200775170504272,
            0.41028338463901914,
            0.08090263533974473,
        ];
        for want in expected {
            assert_eq!(rng.next_double(), want);
        }
    }

    #[test]
    fn next_double_matches_reference_for_seed_42() {
        let mut rng = JavaRandom::new(42);
        assert_eq!(rng.next_double(), 0.7275636800328681);
        assert_eq!(rng.next_double(), 0.6832234717598454);
        assert_eq!(rng.next_double(), 0.30871945533265976);
        assert_eq!(rng.next_double(), 0.27707849007413665);
    }

    #[test]
    fn next_int_matches_reference_for_non_power_of_two_bound() {
        let mut rng = JavaRandom::new(13);
        let expected = [2, 0, 5, 8, 3, 0, 3, 3];
        for want in expected {
            assert_eq!(rng.next_int(10), want);
        }
        let mut rng = JavaRandom::new(42);
        let expected = [30, 63, 48, 84, 70, 25];
        for want in expected {
            assert_eq!(rng.next_int(100), want);
        }
    }

    #[test]
    fn next_int_matches_reference_for_power_of_two_bound() {
        let mut rng = JavaRandom::new(13);
        let expected = [11, 5, 7, 0, 0, 12, 11, 2];
        for want in expected {
            assert_eq!(rng.next_int(16), want);
        }
        let mut rng = JavaRandom::new(0);
        let expected = [784870680, 892752974, 258274014, 651058223];
        for want in expected {
            assert_eq!(rng.next_int(1 << 30), want);
        }
    }

    #[test]
    fn next_long_matches_reference_for_seed_13() {
        let mut rng = JavaRandom::new(13);
        let expected: [i64; 4] = [
            -4984250756083210152,
            8201672769755439997,
            946021207972520316,
            -5163658404114984934,
        ];
        for want in expected {
            assert_eq!(rng.next_long(), want);
        }
    }

    #[test]
    fn next_gaussian_matches_reference() {
        // Gaussian deviates pass through ln/sqrt, so allow a few ULP of
        // libm slack instead of exact bit equality.
        let mut rng = JavaRandom::new(13);
        let expected = [
            1.6828831870102465,
            -0.40560312709480156,
            -0.037654366027471325,
            0.0184679796245639,
        ];
        for want in expected {
            assert_relative_eq!(rng.next_gaussian(), want, epsilon = 1e-12);
        }
        let mut rng = JavaRandom::new(42);
        assert_relative_eq!(rng.next_gaussian(), 1.141905315473055, epsilon = 1e-12);
        assert_relative_eq!(rng.next_gaussian(), 0.919407948982788, epsilon = 1e-12);
    }

    #[test]
    #[should_panic(expected = "bound must be positive")]
    fn next_int_rejects_non_positive_bound() {
        let mut rng = JavaRandom::new(1);
        rng.next_int(0);
    }

    #[test]
    fn same_seed_yields_same_stream() {
        let mut a = JavaRandom::new(987_654_321);
        let mut b = JavaRandom::new(987_654_321);
        for _ in 0..1000 {
            assert_eq!(a.next_double(), b.next_double());
        }
    }

    #[test]
    fn set_seed_restarts_the_stream() {
        let mut rng = JavaRandom::new(13);
        let first = rng.next_double();
        rng.next_gaussian();
        rng.set_seed(13);
        assert_eq!(rng.next_double(), first);
    }

    #[test]
    fn serialized_state_continues_the_exact_stream() {
        let mut rng = JavaRandom::new(77);
        // Leave a cached Gaussian deviate pending before the snapshot.
        rng.next_gaussian();
        let json = serde_json::to_string(&rng).unwrap();
        let mut restored: JavaRandom = serde_json::from_str(&json).unwrap();
        for _ in 0..16 {
            assert_eq!(restored.next_gaussian(), rng.next_gaussian());
            assert_eq!(restored.next_double(), rng.next_double());
        }
    }

    #[test]
    fn next_double_stays_in_unit_interval() {
        let mut rng = JavaRandom::new(2024);
        for _ in 0..10_000 {
            let x = rng.next_double();
            assert!((0.0..1.0).contains(&x));
        }
    }

    #[test]
    fn next_int_stays_in_bound() {
        let mut rng = JavaRandom::new(7);
        for bound in [1, 2, 3, 7, 10, 100, 1_000_000] {
            for _ in 0..200 {
                let v = rng.next_int(bound);
                assert!((0..bound).contains(&v));
            }
        }
    }
}
