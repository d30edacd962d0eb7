use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Resource counting fixed simulation steps.
///
/// Every controller and station tick of one step sees the same value. All
/// countdowns in the autopilot are expressed in these ticks.
#[derive(Resource, Debug, Clone, Default)]
pub struct SimClock {
    pub tick: u64,
}

impl SimClock {
    /// Advances the clock by one tick.
    pub fn advance(&mut self) {
        self.tick = self.tick.saturating_add(1);
    }

    /// Elapsed simulation seconds at `tick_rate`.
    pub fn elapsed_secs(&self, tick_rate: u32) -> f64 {
        self.tick as f64 / tick_rate.max(1) as f64
    }
}

/// Deterministic random source for order decisions (idle wandering).
#[derive(Resource, Debug)]
pub struct SectorRng(pub StdRng);

impl SectorRng {
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl Default for SectorRng {
    fn default() -> Self {
        Self::seeded(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_advance() {
        let mut clock = SimClock::default();
        for _ in 0..120 {
            clock.advance();
        }
        assert_eq!(clock.tick, 120);
        assert!((clock.elapsed_secs(60) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_seeded_rng_is_repeatable() {
        let mut a = SectorRng::seeded(42);
        let mut b = SectorRng::seeded(42);
        let xs: Vec<f32> = (0..4).map(|_| a.0.gen()).collect();
        let ys: Vec<f32> = (0..4).map(|_| b.0.gen()).collect();
        assert_eq!(xs, ys);
    }
}
