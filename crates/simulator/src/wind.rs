//! Seeded wind gusts.

use crate::{WindConfig, WIND};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tickwork_core::{Context, KernelError, Process};
use tracing::trace;

/// Sends a smoothed random force on the wind channel.
///
/// The generator is reseeded on every start, so restarted runs see the same
/// gusts.
#[derive(Debug)]
pub struct Wind {
    config: WindConfig,
    seed: u64,
    rng: ChaCha8Rng,
    force: f64,
}

impl Wind {
    pub fn new(config: WindConfig, seed: u64) -> Self {
        Self {
            config,
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            force: 0.0,
        }
    }

    pub fn force(&self) -> f64 {
        self.force
    }
}

impl Process for Wind {
    fn name(&self) -> &str {
        "Wind"
    }

    fn start(&mut self, _ctx: &mut Context<'_>) -> Result<(), KernelError> {
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.force = 0.0;
        Ok(())
    }

    fn update(&mut self, ctx: &mut Context<'_>) -> Result<(), KernelError> {
        let max = self.config.max_gust;
        let gust = self.rng.gen_range(-max..=max);
        let weight = self.config.gustiness;
        self.force = (1.0 - weight) * self.force + weight * gust;

        trace!(gust, force = self.force, "Wind");
        ctx.channel(WIND)?.send(self.force);
        Ok(())
    }
}
