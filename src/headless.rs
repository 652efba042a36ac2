//! Headless session driver
//!
//! Plays whole sessions without a renderer. `DemoPhysics` stands in for the
//! physics engine of the presentation layer (circle overlaps, projectile
//! flight) and `autopilot` drives the thumbsticks, so the CLI and the
//! integration tests can exercise the core end to end.

use std::collections::BTreeMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::{MAX_SUBSTEPS, SIM_DT};
use crate::{cartesian_to_polar, polar_to_cartesian};
use crate::sim::{
    Contact, GameEvent, GamePhase, GameState, Joystick, ProjectileId, SpellKind, TickInput, tick,
};

/// Body radii used for overlap tests
pub const HERO_RADIUS: f32 = 20.0;
pub const ENEMY_RADIUS: f32 = 18.0;
pub const SPELL_RADIUS: f32 = 8.0;

/// Autopilot backs away from anything closer than this
const KITE_DISTANCE: f32 = 220.0;
/// Autopilot only aims at enemies within this distance
const AIM_RANGE: f32 = 600.0;

#[derive(Debug, Clone, Copy)]
struct Flight {
    position: Vec2,
    velocity: Vec2,
    penetrating: bool,
}

/// Minimal physics: circle overlaps and straight-line projectile flight
#[derive(Debug, Clone, Default)]
pub struct DemoPhysics {
    flights: BTreeMap<ProjectileId, Flight>,
}

impl DemoPhysics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Projectiles currently in flight
    pub fn in_flight(&self) -> usize {
        self.flights.len()
    }

    /// Launch or remove projectile bodies as the core reports casts and fizzles
    pub fn observe(&mut self, events: &[GameEvent]) {
        for event in events {
            match *event {
                GameEvent::SpellCast {
                    projectile,
                    kind,
                    origin,
                    direction,
                } => {
                    self.flights.insert(
                        projectile,
                        Flight {
                            position: origin,
                            velocity: Vec2::from_angle(direction) * kind.speed(),
                            penetrating: kind.penetrating(),
                        },
                    );
                }
                GameEvent::SpellFizzled(id) => {
                    self.flights.remove(&id);
                }
                _ => {}
            }
        }
    }

    /// Move projectiles and drop the ones the core has expired
    pub fn step(&mut self, state: &GameState, dt: f32) {
        self.flights.retain(|id, _| state.projectiles.contains_key(id));
        for flight in self.flights.values_mut() {
            flight.position += flight.velocity * dt;
        }
    }

    /// Every overlap involving an enemy, hero contacts first
    pub fn contacts(&self, state: &GameState) -> Vec<Contact> {
        let mut contacts = Vec::new();
        for enemy in state.enemies.iter() {
            if enemy.position().distance(state.player_pos) <= HERO_RADIUS + ENEMY_RADIUS {
                contacts.push(Contact::hero_enemy(enemy.id()));
            }
        }
        for (&id, flight) in &self.flights {
            for enemy in state.enemies.iter() {
                if enemy.position().distance(flight.position) <= SPELL_RADIUS + ENEMY_RADIUS {
                    contacts.push(Contact::spell_enemy(id, flight.penetrating, enemy.id()));
                }
            }
        }
        contacts
    }
}

/// Thumbstick readings for a simple kiting caster
///
/// Aims the skill stick at the nearest live enemy in range and pushes the
/// move stick away from it when it gets close.
pub fn autopilot(state: &GameState) -> (Joystick, Joystick) {
    let position = state.player_pos;
    let nearest = state
        .enemies
        .iter()
        .filter(|e| e.is_alive())
        .min_by(|a, b| {
            a.position()
                .distance_squared(position)
                .total_cmp(&b.position().distance_squared(position))
        });
    let Some(target) = nearest else {
        return (Joystick::default(), Joystick::default());
    };

    let (distance, angle) = cartesian_to_polar(target.position() - position);
    let toward = polar_to_cartesian(1.0, angle);

    let skill = if distance <= AIM_RANGE {
        Joystick::new(toward.x, toward.y)
    } else {
        Joystick::default()
    };
    let movement = if distance < KITE_DISTANCE {
        Joystick::new(-toward.x, -toward.y)
    } else {
        Joystick::default()
    };
    (movement, skill)
}

/// Options for a headless run, loadable from JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadlessConfig {
    /// Maximum ticks to simulate
    pub ticks: u64,
    /// Spell selected on the first tick
    pub spell: SpellKind,
    /// Drive the sticks with `autopilot`; otherwise the player stands still
    pub autopilot: bool,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            ticks: 3600,
            spell: SpellKind::default(),
            autopilot: true,
        }
    }
}

/// Outcome of a headless run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub seed: u64,
    /// Ticks simulated by this run
    pub ticks_run: u64,
    /// Session clock at the end (includes ticks from a loaded save)
    pub final_tick: u64,
    pub level: u32,
    pub kills: u32,
    pub difficulty_tier: u32,
    pub waves_started: u32,
    pub spells_cast: u32,
    pub health_fraction: f32,
    pub player_alive: bool,
    /// Session tick the player died on
    pub died_at_tick: Option<u64>,
}

/// A running session plus its stand-in presentation layer
#[derive(Debug, Clone)]
pub struct Session {
    pub state: GameState,
    pub physics: DemoPhysics,
    pub autopilot: bool,
    accumulator: f32,
    pending_spell: Option<SpellKind>,
    spells_cast: u32,
    died_at_tick: Option<u64>,
}

impl Session {
    pub fn new(state: GameState) -> Self {
        Self {
            state,
            physics: DemoPhysics::new(),
            autopilot: true,
            accumulator: 0.0,
            pending_spell: None,
            spells_cast: 0,
            died_at_tick: None,
        }
    }

    /// Queue a spell selection for the next tick
    pub fn select_spell(&mut self, spell: SpellKind) {
        self.pending_spell = Some(spell);
    }

    /// Run exactly one simulation tick
    pub fn step(&mut self) -> Vec<GameEvent> {
        let (move_stick, skill_stick) = if self.autopilot {
            autopilot(&self.state)
        } else {
            (Joystick::default(), Joystick::default())
        };
        let input = TickInput {
            move_stick,
            skill_stick,
            contacts: self.physics.contacts(&self.state),
            select_spell: self.pending_spell.take(),
            pause: false,
        };

        let events = tick(&mut self.state, &input, SIM_DT);
        for event in &events {
            match event {
                GameEvent::SpellCast { .. } => self.spells_cast += 1,
                GameEvent::PlayerDied => self.died_at_tick = Some(self.state.time_ticks),
                _ => {}
            }
        }
        self.physics.observe(&events);
        self.physics.step(&self.state, SIM_DT);
        events
    }

    /// Advance by a frame's wall-clock time, running up to `MAX_SUBSTEPS` ticks
    pub fn advance(&mut self, frame_dt: f32) -> Vec<GameEvent> {
        self.accumulator += frame_dt.min(0.1);

        let mut events = Vec::new();
        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            events.extend(self.step());
            self.accumulator -= SIM_DT;
            substeps += 1;
        }
        events
    }

    pub fn is_over(&self) -> bool {
        self.state.phase == GamePhase::GameOver
    }

    pub fn summary(&self, ticks_run: u64) -> SessionSummary {
        SessionSummary {
            seed: self.state.seed,
            ticks_run,
            final_tick: self.state.time_ticks,
            level: self.state.player.level(),
            kills: self.state.kills,
            difficulty_tier: self.state.enemies.difficulty_tier(),
            waves_started: self.state.waves.waves_started,
            spells_cast: self.spells_cast,
            health_fraction: self.state.player.health_fraction(),
            player_alive: !self.state.player.is_dead(),
            died_at_tick: self.died_at_tick,
        }
    }
}

/// Play `state` for up to `config.ticks` ticks or until the player dies
pub fn run_session(state: GameState, config: &HeadlessConfig) -> (GameState, SessionSummary) {
    let mut session = Session::new(state);
    session.autopilot = config.autopilot;
    session.select_spell(config.spell);

    let mut ticks_run = 0;
    while ticks_run < config.ticks && !session.is_over() {
        session.step();
        ticks_run += 1;
    }

    let summary = session.summary(ticks_run);
    log::info!(
        "Session finished after {} ticks: level {}, {} kills, tier {}",
        summary.ticks_run,
        summary.level,
        summary.kills,
        summary.difficulty_tier
    );
    (session.state, summary)
}
