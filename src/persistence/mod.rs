//! Save/load persistence
//!
//! Features:
//! - Versioned JSON envelope
//! - Atomic writes (tmp → save)
//! - Version and tuning checks on load

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sim::GameState;
use crate::tuning::TuningError;

/// Current save format version
pub const SAVE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("save file i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("save file is not valid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported save version {found}")]
    UnsupportedVersion { found: u32 },
    #[error("save holds unusable tuning: {0}")]
    Tuning(#[from] TuningError),
}

/// Envelope written to disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveGame {
    pub version: u32,
    /// Tick the session was saved on
    pub saved_at_tick: u64,
    pub state: GameState,
}

/// Only the version, so an old or future save can be rejected before the
/// full state is parsed
#[derive(Deserialize)]
struct VersionHeader {
    version: u32,
}

impl SaveGame {
    pub fn new(state: &GameState) -> Self {
        Self {
            version: SAVE_VERSION,
            saved_at_tick: state.time_ticks,
            state: state.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String, PersistenceError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, PersistenceError> {
        let header: VersionHeader = serde_json::from_str(json)?;
        if header.version != SAVE_VERSION {
            return Err(PersistenceError::UnsupportedVersion {
                found: header.version,
            });
        }
        let save: SaveGame = serde_json::from_str(json)?;
        save.state.validate()?;
        Ok(save)
    }

    /// Write to `path` through a temporary file and rename
    pub fn save_to_path(&self, path: &Path) -> Result<(), PersistenceError> {
        let json = self.to_json()?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        log::info!(
            "Game saved to {} (tick {})",
            path.display(),
            self.saved_at_tick
        );
        Ok(())
    }

    pub fn load_from_path(path: &Path) -> Result<Self, PersistenceError> {
        let json = std::fs::read_to_string(path)?;
        let save = Self::from_json(&json)?;
        log::info!(
            "Loaded save from {} (tick {})",
            path.display(),
            save.saved_at_tick
        );
        Ok(save)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use crate::sim::{GameEvent, TickInput, tick};

    fn played_state() -> GameState {
        let mut state = GameState::new(2024);
        for _ in 0..90 {
            tick(&mut state, &TickInput::default(), SIM_DT);
        }
        state
    }

    #[test]
    fn test_restored_session_continues_identically() {
        let mut original = played_state();
        let json = SaveGame::new(&original).to_json().unwrap();
        let mut restored = SaveGame::from_json(&json).unwrap().state;

        assert_eq!(restored.time_ticks, original.time_ticks);
        assert_eq!(restored.enemies.len(), original.enemies.len());

        // HUD cache is not saved, so the restored session re-sends fractions
        let first = tick(&mut restored, &TickInput::default(), SIM_DT);
        assert!(first.iter().any(|e| matches!(e, GameEvent::HealthChanged(_))));
        tick(&mut original, &TickInput::default(), SIM_DT);

        for _ in 0..120 {
            let a = tick(&mut original, &TickInput::default(), SIM_DT);
            let b = tick(&mut restored, &TickInput::default(), SIM_DT);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_rejects_other_versions() {
        let mut save = SaveGame::new(&GameState::new(1));
        save.version = 99;
        let json = save.to_json().unwrap();
        assert!(matches!(
            SaveGame::from_json(&json),
            Err(PersistenceError::UnsupportedVersion { found: 99 })
        ));
    }

    /// Serialize a fresh save, let `edit` change the raw json, and reload it
    fn reload_edited(
        edit: impl FnOnce(&mut serde_json::Value),
    ) -> Result<SaveGame, PersistenceError> {
        let json = SaveGame::new(&GameState::new(3)).to_json().unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        edit(&mut value);
        SaveGame::from_json(&value.to_string())
    }

    #[test]
    fn test_rejects_inverted_spawn_delay() {
        let result = reload_edited(|save| {
            let waves = &mut save["state"]["tuning"]["waves"];
            waves["spawn_delay_min"] = serde_json::json!(10);
            waves["spawn_delay_max"] = serde_json::json!(2);
        });
        assert!(matches!(
            result,
            Err(PersistenceError::Tuning(TuningError::Invalid {
                field: "waves.spawn_delay_min",
                ..
            }))
        ));
    }

    #[test]
    fn test_rejects_broken_player_tuning_copy() {
        let result = reload_edited(|save| {
            save["state"]["player"]["tuning"]["exp_base"] = serde_json::json!(0.0);
        });
        assert!(matches!(result, Err(PersistenceError::Tuning(_))));

        let result = reload_edited(|save| {
            save["state"]["player"]["experience_to_next_level"] = serde_json::json!(0.0);
        });
        assert!(matches!(result, Err(PersistenceError::Tuning(_))));
    }

    #[test]
    fn test_untouched_save_passes_checks() {
        assert!(reload_edited(|_| {}).is_ok());
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(
            SaveGame::from_json("not a save"),
            Err(PersistenceError::Json(_))
        ));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = std::env::temp_dir().join(format!("borba-sim-save-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("session.json");

        let state = played_state();
        SaveGame::new(&state).save_to_path(&path).unwrap();
        assert!(!path.with_extension("tmp").exists());

        let loaded = SaveGame::load_from_path(&path).unwrap();
        assert_eq!(loaded.saved_at_tick, state.time_ticks);
        assert_eq!(loaded.state.kills, state.kills);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
