//! Enemy population: per-enemy bookkeeping and difficulty scaling

use std::collections::BTreeMap;
use std::fmt;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::meter::{Hit, ResourceMeter};
use crate::polar_to_cartesian;
use crate::tuning::EnemyTuning;

/// Spawn attempts before falling back to the farthest map corner
const SPAWN_ATTEMPTS: usize = 16;

/// Unique per spawned enemy, stable for its lifetime, never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EnemyId(pub u32);

impl fmt::Display for EnemyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "enemy#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EnemyError {
    /// The id was never issued or its enemy was already removed
    #[error("unknown enemy: {0}")]
    Unknown(EnemyId),
}

/// Enemy archetypes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyKind {
    /// Slow, average
    Zombie,
    /// Fast and fragile
    Ghoul,
    /// Slow and tough
    Brute,
}

impl EnemyKind {
    pub fn base_health(self) -> f32 {
        match self {
            EnemyKind::Zombie => 60.0,
            EnemyKind::Ghoul => 40.0,
            EnemyKind::Brute => 150.0,
        }
    }

    /// Contact damage per tick
    pub fn base_attack(self) -> f32 {
        match self {
            EnemyKind::Zombie => 0.3,
            EnemyKind::Ghoul => 0.25,
            EnemyKind::Brute => 0.6,
        }
    }

    /// Units/sec
    pub fn movement_speed(self) -> f32 {
        match self {
            EnemyKind::Zombie => 60.0,
            EnemyKind::Ghoul => 110.0,
            EnemyKind::Brute => 40.0,
        }
    }

    pub fn base_exp(self) -> f32 {
        match self {
            EnemyKind::Zombie => 20.0,
            EnemyKind::Ghoul => 25.0,
            EnemyKind::Brute => 50.0,
        }
    }
}

/// One live enemy
///
/// Read-only outside the simulation; `EnemiesModel` makes every change.
///
/// ```compile_fail
/// use borba_sim::sim::{EnemyKind, GameState};
/// use glam::Vec2;
///
/// let mut state = GameState::new(1);
/// state.enemies.add_enemy(EnemyKind::Zombie, Vec2::ZERO);
/// for record in state.enemies.iter_mut() {
///     record.attack = 1000.0;
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemyRecord {
    id: EnemyId,
    kind: EnemyKind,
    health: ResourceMeter,
    attack: f32,
    movement_speed: f32,
    /// Experience granted to the player on death
    exp_value: f32,
    /// Tier this enemy was spawned at
    tier: u32,
    position: Vec2,
}

impl EnemyRecord {
    pub fn id(&self) -> EnemyId {
        self.id
    }

    pub fn kind(&self) -> EnemyKind {
        self.kind
    }

    pub fn health(&self) -> &ResourceMeter {
        &self.health
    }

    pub fn attack(&self) -> f32 {
        self.attack
    }

    pub fn movement_speed(&self) -> f32 {
        self.movement_speed
    }

    pub fn exp_value(&self) -> f32 {
        self.exp_value
    }

    pub fn tier(&self) -> u32 {
        self.tier
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn is_alive(&self) -> bool {
        !self.health.is_empty()
    }

    /// Walk toward `target`, stopping on it
    pub(crate) fn move_toward(&mut self, target: Vec2, dt: f32) {
        let to_target = target - self.position;
        let step = self.movement_speed * dt;
        if to_target.length() <= step {
            self.position = target;
        } else {
            self.position += to_target.normalize_or_zero() * step;
        }
    }
}

/// Sole owner of every enemy record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemiesModel {
    records: BTreeMap<EnemyId, EnemyRecord>,
    difficulty_tier: u32,
    next_id: u32,
    tuning: EnemyTuning,
}

impl EnemiesModel {
    pub fn new(tuning: &EnemyTuning) -> Self {
        Self {
            records: BTreeMap::new(),
            difficulty_tier: 0,
            next_id: 1,
            tuning: tuning.clone(),
        }
    }

    pub(crate) fn tuning(&self) -> &EnemyTuning {
        &self.tuning
    }

    pub fn difficulty_tier(&self) -> u32 {
        self.difficulty_tier
    }

    /// Health/attack multiplier for enemies spawned at `tier`
    pub fn tier_multiplier(&self, tier: u32) -> f32 {
        (1.0 + self.tuning.tier_step * tier as f32).min(self.tuning.max_multiplier)
    }

    /// Create an enemy at the current tier and return its fresh id
    pub fn add_enemy(&mut self, kind: EnemyKind, position: Vec2) -> EnemyId {
        let id = EnemyId(self.next_id);
        self.next_id += 1;

        let tier = self.difficulty_tier;
        let scale = self.tier_multiplier(tier);
        let exp_scale = 1.0 + self.tuning.exp_tier_step * tier as f32;
        let record = EnemyRecord {
            id,
            kind,
            health: ResourceMeter::new(kind.base_health() * scale, 0.0),
            attack: kind.base_attack() * scale,
            movement_speed: kind.movement_speed(),
            exp_value: kind.base_exp() * exp_scale,
            tier,
            position,
        };
        self.records.insert(id, record);
        id
    }

    pub fn get(&self, id: EnemyId) -> Result<&EnemyRecord, EnemyError> {
        self.records.get(&id).ok_or(EnemyError::Unknown(id))
    }

    /// Records in id order, including enemies killed this tick
    pub fn iter(&self) -> impl Iterator<Item = &EnemyRecord> {
        self.records.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut EnemyRecord> {
        self.records.values_mut()
    }

    /// Replace an enemy's attack and health so tests can stage exact exchanges
    #[cfg(test)]
    pub(crate) fn override_stats(&mut self, id: EnemyId, attack: f32, max_health: f32) {
        if let Some(record) = self.records.get_mut(&id) {
            record.attack = attack;
            record.health = ResourceMeter::new(max_health, 0.0);
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Enemy exists and still has health
    pub fn is_alive(&self, id: EnemyId) -> bool {
        self.records.get(&id).is_some_and(EnemyRecord::is_alive)
    }

    /// Damage an enemy
    ///
    /// The killing blow reports `killed`; the record stays until
    /// `remove_dead` so the caller can still read its position and reward.
    /// Hits on an enemy already at zero do nothing.
    pub fn take_damage(&mut self, id: EnemyId, amount: f32) -> Result<Hit, EnemyError> {
        let record = self.records.get_mut(&id).ok_or(EnemyError::Unknown(id))?;
        if !record.is_alive() {
            return Ok(Hit::default());
        }
        let report = record.health.take_damage(amount);
        Ok(Hit {
            removed: report.removed,
            killed: report.depleted,
        })
    }

    /// Drop every dead record, returning them in id order
    pub fn remove_dead(&mut self) -> Vec<EnemyRecord> {
        let dead: Vec<EnemyId> = self
            .records
            .values()
            .filter(|r| !r.is_alive())
            .map(|r| r.id)
            .collect();
        dead.into_iter()
            .filter_map(|id| self.records.remove(&id))
            .collect()
    }

    pub fn get_attack_value(&self, id: EnemyId) -> Result<f32, EnemyError> {
        self.get(id).map(|r| r.attack)
    }

    pub fn get_movement_speed(&self, id: EnemyId) -> Result<f32, EnemyError> {
        self.get(id).map(|r| r.movement_speed)
    }

    pub fn get_exp_value(&self, id: EnemyId) -> Result<f32, EnemyError> {
        self.get(id).map(|r| r.exp_value)
    }

    /// Only affects enemies spawned afterwards
    pub fn increment_difficulty(&mut self) {
        self.difficulty_tier += 1;
        log::info!("Difficulty tier now {}", self.difficulty_tier);
    }

    /// Pick a spawn point inside `[0, map_size]` away from the player
    ///
    /// Tries random points on a ring `spawn_clearance..spawn_clearance +
    /// spawn_band` around the player. If none lands on the map, the map
    /// corner farthest from the player is used: it is the point with the
    /// most clearance available, so it satisfies the clearance whenever any
    /// point on the map does.
    pub fn get_enemy_spawn_position<R: Rng>(
        &self,
        player_pos: Vec2,
        map_size: Vec2,
        rng: &mut R,
    ) -> Vec2 {
        let player_pos = player_pos.clamp(Vec2::ZERO, map_size);
        let clearance = self.tuning.spawn_clearance;
        let band = self.tuning.spawn_band;

        for _ in 0..SPAWN_ATTEMPTS {
            let theta = rng.random_range(-std::f32::consts::PI..std::f32::consts::PI);
            let r = clearance + band * rng.random::<f32>();
            let candidate = player_pos + polar_to_cartesian(r, theta);
            let inside = candidate.cmpge(Vec2::ZERO).all() && candidate.cmple(map_size).all();
            if inside && candidate.distance(player_pos) >= clearance {
                return candidate;
            }
        }

        farthest_corner(player_pos, map_size)
    }
}

fn farthest_corner(from: Vec2, map_size: Vec2) -> Vec2 {
    let x = if from.x * 2.0 < map_size.x { map_size.x } else { 0.0 };
    let y = if from.y * 2.0 < map_size.y { map_size.y } else { 0.0 };
    Vec2::new(x, y)
}
