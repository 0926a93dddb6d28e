use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Score every agent starts with; also the floor of the high-score record.
pub const STARTING_SCORE: u32 = 2;

/// Shared state of one training run: the master random stream and the
/// all-time high score. Owned by the population controller and lent to
/// agents while they are constructed or bred.
#[derive(Debug, Clone)]
pub struct SimContext {
    master_seed: u64,
    rng: ChaCha8Rng,
    high_score: u32,
}

impl SimContext {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed, rng: ChaCha8Rng::seed_from_u64(master_seed), high_score: STARTING_SCORE }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    /// Next per-agent seed drawn from the master stream.
    pub fn derive_seed(&mut self) -> u64 {
        self.rng.r#gen()
    }

    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    /// Raises the record; returns true when `score` beat it.
    pub fn record_score(&mut self, score: u32) -> bool {
        if score > self.high_score {
            self.high_score = score;
            true
        } else {
            false
        }
    }
}
