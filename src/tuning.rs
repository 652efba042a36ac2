//! Game balance tuning
//!
//! Every number that shapes a session lives here so a run can be rebalanced
//! from a JSON file without touching the simulation. Missing fields fall back
//! to the defaults below.

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{MAP_HEIGHT, MAP_WIDTH};

/// Errors raised while loading or validating tuning data
#[derive(Debug, Error)]
pub enum TuningError {
    #[error("failed to read tuning file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed tuning json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid tuning value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Player resources and growth
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    pub max_health: f32,
    pub max_mana: f32,
    /// Health restored every tick
    pub health_regen: f32,
    /// Mana restored every tick
    pub mana_regen: f32,
    /// Melee damage dealt to each touching enemy per tick at level 1
    pub base_attack: f32,
    pub attack_per_level: f32,
    /// Fractional damage reduction gained per level
    pub defense_per_level: f32,
    pub max_defense: f32,
    /// Spell damage multiplier gained per level
    pub spell_power_per_level: f32,
    pub health_per_level: f32,
    pub mana_per_level: f32,
    /// Movement speed at full stick deflection (units/sec)
    pub move_speed: f32,
    /// Experience needed to leave level 1
    pub exp_base: f32,
    /// Each level needs this many times the previous threshold
    pub exp_growth: f32,
    pub start_position: Vec2,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            max_mana: 100.0,
            health_regen: 0.02,
            mana_regen: 0.25,
            base_attack: 0.5,
            attack_per_level: 0.1,
            defense_per_level: 0.03,
            max_defense: 0.5,
            spell_power_per_level: 0.1,
            health_per_level: 10.0,
            mana_per_level: 5.0,
            move_speed: 180.0,
            exp_base: 100.0,
            exp_growth: 1.5,
            start_position: Vec2::new(300.0, 160.0),
        }
    }
}

/// Enemy scaling with difficulty tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyTuning {
    /// Health/attack multiplier added per tier
    pub tier_step: f32,
    /// Upper bound of the health/attack multiplier
    pub max_multiplier: f32,
    /// Experience reward multiplier added per tier
    pub exp_tier_step: f32,
    /// Minimum distance between a fresh spawn and the player
    pub spawn_clearance: f32,
    /// Extra random distance beyond the clearance
    pub spawn_band: f32,
}

impl Default for EnemyTuning {
    fn default() -> Self {
        Self {
            tier_step: 0.2,
            max_multiplier: 4.0,
            exp_tier_step: 0.1,
            spawn_clearance: 200.0,
            spawn_band: 300.0,
        }
    }
}

/// Wave size and pacing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveTuning {
    pub base_count: u32,
    pub count_per_tier: u32,
    pub max_count: u32,
    /// Inclusive range of ticks between two spawns of the same wave
    pub spawn_delay_min: u32,
    pub spawn_delay_max: u32,
    /// Ticks between clearing a wave and the next one starting
    pub next_wave_delay: u32,
}

impl Default for WaveTuning {
    fn default() -> Self {
        Self {
            base_count: 5,
            count_per_tier: 2,
            max_count: 30,
            spawn_delay_min: 0,
            spawn_delay_max: 36,
            next_wave_delay: 240,
        }
    }
}

/// Complete balance table for a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub player: PlayerTuning,
    pub enemies: EnemyTuning,
    pub waves: WaveTuning,
    pub map_size: Vec2,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            player: PlayerTuning::default(),
            enemies: EnemyTuning::default(),
            waves: WaveTuning::default(),
            map_size: Vec2::new(MAP_WIDTH, MAP_HEIGHT),
        }
    }
}

impl Tuning {
    /// Parse and validate tuning from JSON
    pub fn from_json_str(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Load tuning from a JSON file
    pub fn load(path: &Path) -> Result<Self, TuningError> {
        let json = std::fs::read_to_string(path)?;
        let tuning = Self::from_json_str(&json)?;
        log::info!("Loaded tuning from {}", path.display());
        Ok(tuning)
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), TuningError> {
        fn invalid(field: &'static str, reason: impl Into<String>) -> TuningError {
            TuningError::Invalid {
                field,
                reason: reason.into(),
            }
        }

        let p = &self.player;
        if p.max_health <= 0.0 {
            return Err(invalid("player.max_health", "must be positive"));
        }
        if p.max_mana <= 0.0 {
            return Err(invalid("player.max_mana", "must be positive"));
        }
        if p.health_regen < 0.0 || p.mana_regen < 0.0 {
            return Err(invalid("player.*_regen", "must not be negative"));
        }
        if p.exp_base <= 0.0 {
            return Err(invalid("player.exp_base", "must be positive"));
        }
        if p.exp_growth < 1.0 {
            return Err(invalid("player.exp_growth", "must be at least 1.0"));
        }
        if !(0.0..1.0).contains(&p.max_defense) {
            return Err(invalid("player.max_defense", "must be in [0, 1)"));
        }

        let e = &self.enemies;
        if e.tier_step < 0.0 || e.max_multiplier < 1.0 {
            return Err(invalid(
                "enemies.tier_step",
                "scaling must not shrink enemies",
            ));
        }
        if e.spawn_clearance < 0.0 || e.spawn_band < 0.0 {
            return Err(invalid("enemies.spawn_clearance", "must not be negative"));
        }

        let w = &self.waves;
        if w.spawn_delay_min > w.spawn_delay_max {
            return Err(invalid(
                "waves.spawn_delay_min",
                format!(
                    "{} exceeds spawn_delay_max {}",
                    w.spawn_delay_min, w.spawn_delay_max
                ),
            ));
        }
        if w.max_count == 0 {
            return Err(invalid("waves.max_count", "must be positive"));
        }

        if self.map_size.x <= 0.0 || self.map_size.y <= 0.0 {
            return Err(invalid("map_size", "must be positive on both axes"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Tuning::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let tuning = Tuning::from_json_str(r#"{ "waves": { "base_count": 9 } }"#).unwrap();
        assert_eq!(tuning.waves.base_count, 9);
        assert_eq!(tuning.waves.max_count, WaveTuning::default().max_count);
        assert_eq!(tuning.player, PlayerTuning::default());
    }

    #[test]
    fn test_rejects_inverted_spawn_delay() {
        let err = Tuning::from_json_str(
            r#"{ "waves": { "spawn_delay_min": 10, "spawn_delay_max": 2 } }"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            TuningError::Invalid {
                field: "waves.spawn_delay_min",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_shrinking_exp_schedule() {
        let err = Tuning::from_json_str(r#"{ "player": { "exp_growth": 0.5 } }"#).unwrap_err();
        assert!(matches!(err, TuningError::Invalid { .. }));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            Tuning::from_json_str("{ nope"),
            Err(TuningError::Json(_))
        ));
    }
}
