//! Spell catalogue and projectile descriptors

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{SIM_DT, SPELL_RANGE};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpellError {
    #[error("unknown spell `{0}`")]
    UnknownSpell(String),
}

/// The closed set of castable spells
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum SpellKind {
    Lightning,
    #[default]
    Fireball,
    ArcaneBolt,
}

impl SpellKind {
    pub const ALL: [SpellKind; 3] = [
        SpellKind::Lightning,
        SpellKind::Fireball,
        SpellKind::ArcaneBolt,
    ];

    /// Stable index for per-spell tables
    pub fn index(self) -> usize {
        match self {
            SpellKind::Lightning => 0,
            SpellKind::Fireball => 1,
            SpellKind::ArcaneBolt => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SpellKind::Lightning => "Lightning",
            SpellKind::Fireball => "Fireball",
            SpellKind::ArcaneBolt => "ArcaneBolt",
        }
    }

    /// Base damage before the caster's modifier
    pub fn damage(self) -> f32 {
        match self {
            SpellKind::Lightning => 30.0,
            SpellKind::Fireball => 45.0,
            SpellKind::ArcaneBolt => 15.0,
        }
    }

    /// Projectile speed (units/sec)
    pub fn speed(self) -> f32 {
        match self {
            SpellKind::Lightning => 700.0,
            SpellKind::Fireball => 400.0,
            SpellKind::ArcaneBolt => 600.0,
        }
    }

    pub fn mana_cost(self) -> f32 {
        match self {
            SpellKind::Lightning => 20.0,
            SpellKind::Fireball => 30.0,
            SpellKind::ArcaneBolt => 8.0,
        }
    }

    /// Ticks before the same spell can be cast again
    pub fn cooldown_ticks(self) -> u32 {
        match self {
            SpellKind::Lightning => 20,
            SpellKind::Fireball => 40,
            SpellKind::ArcaneBolt => 10,
        }
    }

    /// Penetrating spells pass through enemies instead of fizzling
    pub fn penetrating(self) -> bool {
        matches!(self, SpellKind::Lightning)
    }

    /// Ticks until the projectile has covered its full range
    pub fn lifetime_ticks(self) -> u32 {
        (SPELL_RANGE / self.speed() / SIM_DT).ceil() as u32
    }
}

impl fmt::Display for SpellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpellKind {
    type Err = SpellError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lightning" => Ok(SpellKind::Lightning),
            "fireball" => Ok(SpellKind::Fireball),
            "arcanebolt" | "arcane_bolt" | "arcane bolt" => Ok(SpellKind::ArcaneBolt),
            _ => Err(SpellError::UnknownSpell(s.to_string())),
        }
    }
}

/// What a successful cast produces; the presentation layer flies it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpellProjectile {
    pub kind: SpellKind,
    /// Damage on hit, caster modifier already applied
    pub damage: f32,
    pub speed: f32,
    /// Direction of travel (radians)
    pub direction: f32,
    pub penetrating: bool,
    pub lifetime_ticks: u32,
}
