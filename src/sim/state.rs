//! Session state
//!
//! Everything that must survive a save/load or be reproduced from a seed
//! lives here.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::enemies::{EnemiesModel, EnemyId, EnemyKind};
use super::events::ProjectileId;
use super::player::PlayerModel;
use super::spell::{SpellKind, SpellProjectile};
use crate::tuning::{Tuning, TuningError};

/// Current phase of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Active gameplay
    Playing,
    /// Session is paused
    Paused,
    /// Player died
    GameOver,
}

/// Where the wave cycle currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WavePhase {
    /// Draining the pending queue one enemy at a time
    Spawning,
    /// Everything spawned, waiting for the last enemy to die
    Fighting,
    /// Wave cleared, next one starts when the timer runs out
    Intermission { ticks_remaining: u32 },
}

/// Spawn pacing: a queue of pending spawns and a tick countdown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaveScheduler {
    pub phase: WavePhase,
    pending: VecDeque<EnemyKind>,
    spawn_countdown: u32,
    /// Waves started this session
    pub waves_started: u32,
}

impl Default for WaveScheduler {
    fn default() -> Self {
        Self {
            // First wave starts on the first tick
            phase: WavePhase::Intermission { ticks_remaining: 0 },
            pending: VecDeque::new(),
            spawn_countdown: 0,
            waves_started: 0,
        }
    }
}

impl WaveScheduler {
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Advance the intermission timer; true when the next wave should start
    pub fn intermission_elapsed(&mut self) -> bool {
        match &mut self.phase {
            WavePhase::Intermission { ticks_remaining } => {
                *ticks_remaining = ticks_remaining.saturating_sub(1);
                *ticks_remaining == 0
            }
            _ => false,
        }
    }

    /// Queue a freshly generated wave
    pub fn begin(&mut self, wave: Vec<EnemyKind>) {
        self.pending = wave.into();
        self.spawn_countdown = 0;
        self.waves_started += 1;
        self.phase = if self.pending.is_empty() {
            WavePhase::Fighting
        } else {
            WavePhase::Spawning
        };
    }

    /// Next enemy to spawn this tick, if the countdown allows one
    ///
    /// After each spawn the countdown is redrawn from `delay` (inclusive).
    pub fn next_spawn<R: Rng>(
        &mut self,
        rng: &mut R,
        delay: std::ops::RangeInclusive<u32>,
    ) -> Option<EnemyKind> {
        if self.phase != WavePhase::Spawning {
            return None;
        }
        if self.spawn_countdown > 0 {
            self.spawn_countdown -= 1;
            return None;
        }
        let kind = self.pending.pop_front()?;
        self.spawn_countdown = rng.random_range(delay);
        if self.pending.is_empty() {
            self.phase = WavePhase::Fighting;
        }
        Some(kind)
    }

    /// The wave is fully spawned and dead: wait `delay` ticks for the next
    pub fn wave_cleared(&mut self, delay: u32) {
        self.phase = WavePhase::Intermission {
            ticks_remaining: delay,
        };
    }
}

/// A spell in flight
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projectile {
    pub id: ProjectileId,
    pub kind: SpellKind,
    pub damage: f32,
    pub penetrating: bool,
    pub ticks_remaining: u32,
    /// Enemies this projectile overlapped last tick
    pub touching: BTreeSet<EnemyId>,
}

impl Projectile {
    pub fn new(id: ProjectileId, spell: &SpellProjectile) -> Self {
        Self {
            id,
            kind: spell.kind,
            damage: spell.damage,
            penetrating: spell.penetrating,
            ticks_remaining: spell.lifetime_ticks,
            touching: BTreeSet::new(),
        }
    }
}

/// Last HUD fractions sent out, so unchanged values are not re-sent
#[derive(Debug, Clone, Default)]
pub struct HudCache {
    pub health: Option<f32>,
    pub mana: Option<f32>,
    pub exp: Option<f32>,
}

/// Complete session state (deterministic, serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub rng: Pcg32,
    pub tuning: Tuning,
    pub phase: GamePhase,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub player: PlayerModel,
    pub player_pos: Vec2,
    /// Direction the player faces (radians)
    pub facing: f32,
    pub enemies: EnemiesModel,
    pub waves: WaveScheduler,
    /// Enemies in contact with the player, as of the last tick
    pub touching: BTreeSet<EnemyId>,
    /// Spells in flight (sorted by id for determinism)
    pub projectiles: BTreeMap<ProjectileId, Projectile>,
    pub kills: u32,
    #[serde(skip)]
    pub hud: HudCache,
    next_projectile_id: u32,
}

impl GameState {
    /// Create a new session with default tuning
    pub fn new(seed: u64) -> Self {
        Self::with_tuning(seed, Tuning::default())
    }

    /// Create a new session with `tuning` used as given
    ///
    /// The tuning is not checked here; `Tuning::load` and
    /// `Tuning::from_json_str` validate, hand-built values should go through
    /// `Tuning::validate` first.
    pub fn with_tuning(seed: u64, tuning: Tuning) -> Self {
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            player: PlayerModel::new(&tuning.player),
            player_pos: tuning.player.start_position,
            facing: 0.0,
            enemies: EnemiesModel::new(&tuning.enemies),
            waves: WaveScheduler::default(),
            touching: BTreeSet::new(),
            projectiles: BTreeMap::new(),
            kills: 0,
            hud: HudCache::default(),
            next_projectile_id: 1,
            phase: GamePhase::Playing,
            time_ticks: 0,
            tuning,
        }
    }

    /// Check that the session can be ticked
    ///
    /// Restored sessions carry their own tuning plus the copies held by the
    /// player and enemy models; all of them must be valid and agree.
    pub fn validate(&self) -> Result<(), TuningError> {
        self.tuning.validate()?;
        if self.player.tuning() != &self.tuning.player {
            return Err(TuningError::Invalid {
                field: "player",
                reason: "player model tuning differs from the session tuning".into(),
            });
        }
        if self.enemies.tuning() != &self.tuning.enemies {
            return Err(TuningError::Invalid {
                field: "enemies",
                reason: "enemy model tuning differs from the session tuning".into(),
            });
        }
        let threshold = self.player.experience_to_next_level();
        if !(threshold > 0.0 && threshold.is_finite()) {
            return Err(TuningError::Invalid {
                field: "player.experience_to_next_level",
                reason: format!("{threshold} is not a positive threshold"),
            });
        }
        Ok(())
    }

    /// Allocate a new projectile ID
    pub fn next_projectile_id(&mut self) -> ProjectileId {
        let id = ProjectileId(self.next_projectile_id);
        self.next_projectile_id += 1;
        id
    }

    /// Whether the player is touching `id` (derived from the contact set)
    pub fn is_touching(&self, id: EnemyId) -> bool {
        self.touching.contains(&id)
    }
}
