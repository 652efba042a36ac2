//! Tick input from the presentation layer and the notifications sent back
//!
//! The core never calls into visuals. Each tick the presentation layer hands
//! in joystick values and the contacts its physics engine reported, and gets
//! back an ordered list of `GameEvent`s to render.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::enemies::{EnemyId, EnemyKind};
use super::spell::SpellKind;

/// Identifier of a live spell projectile
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProjectileId(pub u32);

/// Virtual thumbstick reading
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Joystick {
    /// Thumb deflection, each axis in [-1, 1]
    pub x: f32,
    pub y: f32,
    /// Deflection angle (radians)
    pub angle: f32,
}

impl Joystick {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            angle: y.atan2(x),
        }
    }

    /// Thumb at rest
    pub fn is_idle(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    /// Deflection strength in [0, 1]
    pub fn magnitude(&self) -> f32 {
        Vec2::new(self.x, self.y).length().min(1.0)
    }
}

/// Physics body categories the presentation layer reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Hero,
    Enemy,
    Spell,
    PenetratingSpell,
    Map,
}

/// One side of a contact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactBody {
    pub category: Category,
    /// Enemy or projectile id, when the body has one
    pub id: Option<u32>,
}

/// An overlap reported by the physics engine for the current tick
///
/// Body order is arbitrary, as with any physics contact callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub a: ContactBody,
    pub b: ContactBody,
}

/// A contact the resolver acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactPair {
    HeroEnemy(EnemyId),
    SpellEnemy {
        projectile: ProjectileId,
        enemy: EnemyId,
    },
}

impl Contact {
    pub fn hero_enemy(enemy: EnemyId) -> Self {
        Self {
            a: ContactBody {
                category: Category::Hero,
                id: None,
            },
            b: ContactBody {
                category: Category::Enemy,
                id: Some(enemy.0),
            },
        }
    }

    pub fn spell_enemy(projectile: ProjectileId, penetrating: bool, enemy: EnemyId) -> Self {
        let category = if penetrating {
            Category::PenetratingSpell
        } else {
            Category::Spell
        };
        Self {
            a: ContactBody {
                category,
                id: Some(projectile.0),
            },
            b: ContactBody {
                category: Category::Enemy,
                id: Some(enemy.0),
            },
        }
    }

    /// Classify the contact regardless of body order
    ///
    /// Contacts the core has no rule for (hero against map, enemy against
    /// enemy, bodies missing their id) yield `None`.
    pub fn pair(&self) -> Option<ContactPair> {
        classify(self.a, self.b).or_else(|| classify(self.b, self.a))
    }
}

fn classify(subject: ContactBody, other: ContactBody) -> Option<ContactPair> {
    if other.category != Category::Enemy {
        return None;
    }
    let enemy = EnemyId(other.id?);
    match subject.category {
        Category::Hero => Some(ContactPair::HeroEnemy(enemy)),
        Category::Spell | Category::PenetratingSpell => Some(ContactPair::SpellEnemy {
            projectile: ProjectileId(subject.id?),
            enemy,
        }),
        _ => None,
    }
}

/// Notifications emitted by a tick, in the order they happened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    HealthChanged(f32),
    ManaChanged(f32),
    ExpChanged(f32),
    LeveledUp(u32),
    WaveStarted {
        tier: u32,
        size: usize,
    },
    EnemySpawned {
        id: EnemyId,
        kind: EnemyKind,
        position: Vec2,
    },
    EnemyDied {
        id: EnemyId,
        position: Vec2,
    },
    KillCountChanged(u32),
    PlayerDied,
    SpellCast {
        projectile: ProjectileId,
        kind: SpellKind,
        origin: Vec2,
        direction: f32,
    },
    SpellFizzled(ProjectileId),
}
