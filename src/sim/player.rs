//! Player resources, leveling and spell casting

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::events::Joystick;
use super::meter::{Hit, ResourceMeter};
use super::spell::{SpellKind, SpellProjectile};
use crate::tuning::PlayerTuning;

/// The player's combat state for one session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerModel {
    health: ResourceMeter,
    mana: ResourceMeter,
    level: u32,
    experience: f32,
    experience_to_next_level: f32,
    active_spell: SpellKind,
    /// Remaining cooldown ticks, indexed by `SpellKind::index`
    cooldowns: [u32; 3],
    is_dead: bool,
    tuning: PlayerTuning,
}

impl PlayerModel {
    pub fn new(tuning: &PlayerTuning) -> Self {
        Self {
            health: ResourceMeter::new(tuning.max_health, tuning.health_regen),
            mana: ResourceMeter::new(tuning.max_mana, tuning.mana_regen),
            level: 1,
            experience: 0.0,
            experience_to_next_level: tuning.exp_base,
            active_spell: SpellKind::default(),
            cooldowns: [0; 3],
            is_dead: false,
            tuning: tuning.clone(),
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn experience(&self) -> f32 {
        self.experience
    }

    pub fn experience_to_next_level(&self) -> f32 {
        self.experience_to_next_level
    }

    pub fn health(&self) -> &ResourceMeter {
        &self.health
    }

    pub fn mana(&self) -> &ResourceMeter {
        &self.mana
    }

    pub fn active_spell(&self) -> SpellKind {
        self.active_spell
    }

    pub fn is_dead(&self) -> bool {
        self.is_dead
    }

    pub(crate) fn tuning(&self) -> &PlayerTuning {
        &self.tuning
    }

    pub fn remaining_cooldown(&self, spell: SpellKind) -> u32 {
        self.cooldowns[spell.index()]
    }

    /// Melee damage dealt to each touching enemy per tick
    pub fn attack(&self) -> f32 {
        self.tuning.base_attack + self.tuning.attack_per_level * self.levels_gained()
    }

    /// Fraction of incoming damage ignored
    pub fn defense(&self) -> f32 {
        (self.tuning.defense_per_level * self.levels_gained()).min(self.tuning.max_defense)
    }

    pub fn spell_damage_modifier(&self) -> f32 {
        1.0 + self.tuning.spell_power_per_level * self.levels_gained()
    }

    fn levels_gained(&self) -> f32 {
        (self.level - 1) as f32
    }

    pub fn health_fraction(&self) -> f32 {
        self.health.fraction_remaining()
    }

    pub fn mana_fraction(&self) -> f32 {
        self.mana.fraction_remaining()
    }

    pub fn exp_fraction(&self) -> f32 {
        (self.experience / self.experience_to_next_level).clamp(0.0, 1.0)
    }

    pub fn regen_mana(&mut self) {
        if !self.is_dead {
            self.mana.regen();
        }
    }

    pub fn regen_health(&mut self) {
        if !self.is_dead {
            self.health.regen();
        }
    }

    /// Count every spell cooldown down by one tick
    pub fn tick_cooldowns(&mut self) {
        for remaining in &mut self.cooldowns {
            *remaining = remaining.saturating_sub(1);
        }
    }

    pub fn can_use_spell(&self) -> bool {
        let spell = self.active_spell;
        !self.is_dead
            && self.mana.current() >= spell.mana_cost()
            && self.cooldowns[spell.index()] == 0
    }

    /// Cast the active spell toward `facing`
    ///
    /// Callers must check `can_use_spell` first. Debug builds assert it;
    /// release builds return `None` without touching any state.
    pub fn handle_spell_cast(&mut self, facing: f32) -> Option<SpellProjectile> {
        debug_assert!(
            self.can_use_spell(),
            "handle_spell_cast called while {} is unavailable",
            self.active_spell
        );
        if !self.can_use_spell() {
            log::warn!("Ignored cast of unavailable spell {}", self.active_spell);
            return None;
        }

        let spell = self.active_spell;
        if !self.mana.spend(spell.mana_cost()) {
            return None;
        }
        self.cooldowns[spell.index()] = spell.cooldown_ticks();

        Some(SpellProjectile {
            kind: spell,
            damage: spell.damage() * self.spell_damage_modifier(),
            speed: spell.speed(),
            direction: crate::normalize_angle(facing),
            penetrating: spell.penetrating(),
            lifetime_ticks: spell.lifetime_ticks(),
        })
    }

    pub fn set_active_spell(&mut self, spell: SpellKind) {
        self.active_spell = spell;
    }

    /// Switch spells by display name
    ///
    /// Unknown names are a caller bug: debug builds panic, release builds
    /// log and keep the current spell.
    pub fn set_active_skill(&mut self, name: &str) {
        match name.parse::<SpellKind>() {
            Ok(spell) => self.active_spell = spell,
            Err(err) => {
                debug_assert!(false, "set_active_skill: {err}");
                log::warn!("Ignored skill selection: {err}");
            }
        }
    }

    /// Apply enemy damage after defense
    ///
    /// `killed` is reported only by the hit that empties the meter; once
    /// dead, further damage does nothing.
    pub fn take_damage(&mut self, amount: f32) -> Hit {
        if self.is_dead {
            return Hit::default();
        }
        let report = self.health.take_damage(amount * (1.0 - self.defense()));
        if report.depleted {
            self.is_dead = true;
        }
        Hit {
            removed: report.removed,
            killed: report.depleted,
        }
    }

    /// Add experience; `check_if_leveled_up` must follow
    pub fn gain_exp(&mut self, amount: f32) {
        if amount > 0.0 {
            self.experience += amount;
        }
    }

    /// Consume experience thresholds, returning every level reached in order
    ///
    /// Each level refills health and mana after growing their maxima.
    pub fn check_if_leveled_up(&mut self) -> Vec<u32> {
        let mut reached = Vec::new();
        if self.is_dead {
            return reached;
        }
        while self.experience >= self.experience_to_next_level {
            self.experience -= self.experience_to_next_level;
            self.level += 1;
            self.experience_to_next_level = self.threshold_for(self.level);

            self.health.set_max(self.health.max() + self.tuning.health_per_level);
            self.mana.set_max(self.mana.max() + self.tuning.mana_per_level);
            self.health.refill();
            self.mana.refill();
            reached.push(self.level);
        }
        reached
    }

    /// Experience needed to leave `level`
    fn threshold_for(&self, level: u32) -> f32 {
        self.tuning.exp_base * self.tuning.exp_growth.powi(level as i32 - 1)
    }

    /// Position after one tick of movement-stick input
    ///
    /// Pure: the caller decides whether to apply it.
    pub fn get_new_player_position(
        &self,
        vx: f32,
        vy: f32,
        angle: f32,
        position: Vec2,
        dt: f32,
    ) -> Vec2 {
        let stick = Joystick { x: vx, y: vy, angle };
        if stick.is_idle() {
            return position;
        }
        let direction = Vec2::new(angle.cos(), angle.sin());
        position + direction * stick.magnitude() * self.tuning.move_speed * dt
    }
}
