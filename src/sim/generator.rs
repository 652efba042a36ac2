//! Wave composition
//!
//! Waves are a pure function of the difficulty tier so a given tier always
//! produces the same enemies in the same order.

use super::enemies::EnemyKind;
use crate::tuning::WaveTuning;

/// Builds waves from the wave tuning table
#[derive(Debug, Clone)]
pub struct EnemyGenerator {
    tuning: WaveTuning,
}

impl EnemyGenerator {
    pub fn new(tuning: &WaveTuning) -> Self {
        Self {
            tuning: tuning.clone(),
        }
    }

    /// Number of enemies in a wave at `tier`
    pub fn wave_size(&self, tier: u32) -> usize {
        let count = self
            .tuning
            .base_count
            .saturating_add(self.tuning.count_per_tier.saturating_mul(tier));
        count.min(self.tuning.max_count) as usize
    }

    /// Enemies for one wave, in spawn order
    pub fn generate_enemies(&self, tier: u32) -> Vec<EnemyKind> {
        (0..self.wave_size(tier))
            .map(|slot| kind_for_slot(tier, slot))
            .collect()
    }
}

/// Brutes join from tier 2, ghouls from tier 1
fn kind_for_slot(tier: u32, slot: usize) -> EnemyKind {
    if tier >= 2 && slot % 4 == 3 {
        EnemyKind::Brute
    } else if tier >= 1 && slot % 3 == 2 {
        EnemyKind::Ghoul
    } else {
        EnemyKind::Zombie
    }
}
