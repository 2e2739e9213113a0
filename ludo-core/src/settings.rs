//! Game settings: player names and transition pacing

use crate::pieces::Color;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid settings JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Display names per seat; purely cosmetic
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerNames {
    pub red: String,
    pub green: String,
    pub yellow: String,
    pub blue: String,
}

impl PlayerNames {
    pub fn get(&self, color: Color) -> &str {
        match color {
            Color::Red => &self.red,
            Color::Green => &self.green,
            Color::Yellow => &self.yellow,
            Color::Blue => &self.blue,
        }
    }
}

impl Default for PlayerNames {
    fn default() -> Self {
        Self {
            red: Color::Red.label().to_string(),
            green: Color::Green.label().to_string(),
            yellow: Color::Yellow.label().to_string(),
            blue: Color::Blue.label().to_string(),
        }
    }
}

/// Artificial pauses between transitions, in milliseconds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Timings {
    /// Dice suspense before the face resolves
    pub roll_ms: u64,
    /// Pause before a three-sixes forfeit hands the turn over
    pub penalty_ms: u64,
    /// Pause before a roll with no legal move hands the turn over
    pub pass_ms: u64,
    /// Pause before a forced single move is applied
    pub auto_move_ms: u64,
}

impl Timings {
    /// No pauses at all (simulation, tests)
    pub fn instant() -> Self {
        Self {
            roll_ms: 0,
            penalty_ms: 0,
            pass_ms: 0,
            auto_move_ms: 0,
        }
    }

    pub fn roll(&self) -> Duration {
        Duration::from_millis(self.roll_ms)
    }

    pub fn penalty(&self) -> Duration {
        Duration::from_millis(self.penalty_ms)
    }

    pub fn pass(&self) -> Duration {
        Duration::from_millis(self.pass_ms)
    }

    pub fn auto_move(&self) -> Duration {
        Duration::from_millis(self.auto_move_ms)
    }
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            roll_ms: 1000,
            penalty_ms: 1000,
            pass_ms: 1000,
            auto_move_ms: 1200,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameSettings {
    pub player_names: PlayerNames,
    pub timings: Timings,
}

impl GameSettings {
    /// Load from a JSON file. Missing fields fall back to defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
