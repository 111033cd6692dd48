//! RNG oracle for deterministic random rolls.
//!
//! Condition nodes such as `Chance` roll through this trait. Every roll is a
//! pure function of its seed, so replaying an activation with the same seed
//! walks the same graph branches.

/// RNG oracle for deterministic random number generation.
///
/// Implementations must produce the same value for the same seed.
pub trait RngOracle: Send + Sync {
    /// Generate a random u32 value from a seed.
    fn next_u32(&self, seed: u64) -> u32;

    /// Uniform value in `[0, 1)`.
    fn unit_f32(&self, seed: u64) -> f32 {
        (self.next_u32(seed) >> 8) as f32 / (1u32 << 24) as f32
    }

    /// True with probability `probability`, clamped to `[0, 1]`.
    fn chance(&self, seed: u64, probability: f32) -> bool {
        if probability <= 0.0 {
            return false;
        }
        if probability >= 1.0 {
            return true;
        }
        self.unit_f32(seed) < probability
    }
}

/// PCG-XSH-RR generator: 64-bit state, 32-bit output.
///
/// - Deterministic: same seed, same output
/// - A single multiply, xorshift and rotate per value
#[derive(Clone, Copy, Debug, Default)]
pub struct PcgRng;

impl PcgRng {
    const MULTIPLIER: u64 = 6364136223846793005;
    const INCREMENT: u64 = 1442695040888963407;

    #[inline]
    fn step(state: u64) -> u64 {
        state
            .wrapping_mul(Self::MULTIPLIER)
            .wrapping_add(Self::INCREMENT)
    }

    /// XSH-RR output permutation.
    #[inline]
    fn output(state: u64) -> u32 {
        let xorshifted = (((state >> 18) ^ state) >> 27) as u32;
        let rot = (state >> 59) as u32;
        xorshifted.rotate_right(rot)
    }
}

impl RngOracle for PcgRng {
    fn next_u32(&self, seed: u64) -> u32 {
        Self::output(Self::step(seed))
    }
}

/// Mixes the inputs of one roll into a seed.
///
/// * `run_seed` - seed of the ability run
/// * `nonce` - per-roll sequence number (the spec id of the rolling node)
/// * `unit` - rolling unit
/// * `context` - distinguishes several rolls made by one node
pub fn compute_seed(run_seed: u64, nonce: u64, unit: u32, context: u32) -> u64 {
    // SplitMix64 / FxHash multipliers
    let mut hash = run_seed;
    hash ^= nonce.wrapping_mul(0x9e3779b97f4a7c15);
    hash ^= (unit as u64).wrapping_mul(0x517cc1b727220a95);
    hash ^= (context as u64).wrapping_mul(0x85ebca6b);

    hash ^= hash >> 33;
    hash = hash.wrapping_mul(0xff51afd7ed558ccd);
    hash ^= hash >> 33;

    hash
}
