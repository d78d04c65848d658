use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Entropy for one channel: Gaussian noise, HRV random walk steps and drift rolls.
#[derive(Clone, Debug)]
pub struct NoiseSource {
    rng: StdRng,
}

impl NoiseSource {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Seeded per channel when `seed` is set, otherwise from OS entropy.
    pub fn for_channel(seed: Option<u64>, channel_id: usize) -> Self {
        match seed {
            Some(seed) => Self::from_seed(seed.wrapping_add(channel_id as u64)),
            None => Self::from_entropy(),
        }
    }

    /// Draw from N(0, 1).
    pub fn gaussian(&mut self) -> f64 {
        self.rng.sample(StandardNormal)
    }

    /// True with probability `p` (clamped to [0, 1]).
    pub fn chance(&mut self, p: f64) -> bool {
        self.rng.gen::<f64>() < p.clamp(0.0, 1.0)
    }

    /// Uniform draw from `[low, high)`; returns `low` for an empty range.
    pub fn uniform(&mut self, low: f64, high: f64) -> f64 {
        if high > low {
            self.rng.gen_range(low..high)
        } else {
            low
        }
    }
}
