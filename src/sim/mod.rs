//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod enemies;
pub mod events;
pub mod generator;
pub mod meter;
pub mod player;
pub mod spell;
pub mod state;
pub mod tick;

pub use enemies::{EnemiesModel, EnemyError, EnemyId, EnemyKind, EnemyRecord};
pub use events::{Category, Contact, ContactBody, ContactPair, GameEvent, Joystick, ProjectileId};
pub use generator::EnemyGenerator;
pub use meter::{DamageReport, Hit, ResourceMeter};
pub use player::PlayerModel;
pub use spell::{SpellError, SpellKind, SpellProjectile};
pub use state::{GamePhase, GameState, Projectile, WavePhase, WaveScheduler};
pub use tick::{TickInput, tick};
