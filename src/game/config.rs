//! Game configuration.
//!
//! Read once at startup from `config.json` in the user's config directory.
//! A missing or broken file falls back to the built-in defaults.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::cell::{CellCoord, GridLayout, PLAYFIELD_HEIGHT, PLAYFIELD_WIDTH};

/// Errors from loading a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Launcher tuning.
#[derive(Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    /// Speed of a fired bubble in pixels per second.
    pub speed: f32,
    /// Delay before the next bubble is loaded.
    pub reload_delay_secs: f32,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            speed: 600.0,
            reload_delay_secs: 0.25,
        }
    }
}

/// Everything tunable about a game session.
#[derive(Resource, Debug, Clone, Default, PartialEq, Reflect, Serialize, Deserialize)]
#[reflect(Resource)]
#[serde(default)]
pub struct GameConfig {
    pub grid: GridLayout,
    pub launcher: LauncherConfig,
}

impl GameConfig {
    /// Get the file path for the config file.
    fn file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("bobble").join("config.json"))
    }

    /// Load the config from disk, falling back to defaults.
    pub fn load() -> Self {
        let Some(path) = Self::file_path() else {
            warn!("Could not determine config directory, using default config");
            return Self::default();
        };

        if !path.exists() {
            info!("No config file found at {:?}, using defaults", path);
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => {
                info!("Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                warn!("Ignoring config file {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Read and validate a config file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Parse and validate a JSON config. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the values describe a usable grid and launcher.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let grid = &self.grid;
        if grid.rows == 0 || grid.columns == 0 {
            return Err(ConfigError::Invalid(format!(
                "grid must have at least one cell, got {}x{}",
                grid.rows, grid.columns
            )));
        }
        let (Ok(rows), Ok(columns)) = (i32::try_from(grid.rows), i32::try_from(grid.columns)) else {
            return Err(ConfigError::Invalid(format!(
                "grid of {}x{} cells is too large",
                grid.rows, grid.columns
            )));
        };
        if !(grid.cell_size.is_finite() && grid.cell_size > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "cell size must be positive, got {}",
                grid.cell_size
            )));
        }
        if !(grid.offset_x.is_finite() && grid.offset_y.is_finite()) {
            return Err(ConfigError::Invalid("grid offset must be finite".to_string()));
        }

        // Every cell must be reachable by a bubble inside the walls.
        let first = grid.cell_to_position(CellCoord::new(0, 0));
        let last = grid.cell_to_position(CellCoord::new(rows - 1, columns - 1));
        if first.x < 0.0 || first.y < 0.0 || last.x > PLAYFIELD_WIDTH || last.y > PLAYFIELD_HEIGHT {
            return Err(ConfigError::Invalid(format!(
                "grid spans {:?} to {:?}, outside the {}x{} playfield",
                first, last, PLAYFIELD_WIDTH, PLAYFIELD_HEIGHT
            )));
        }

        let launcher = &self.launcher;
        if !(launcher.speed.is_finite() && launcher.speed > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "launcher speed must be positive, got {}",
                launcher.speed
            )));
        }
        if !(launcher.reload_delay_secs.is_finite() && launcher.reload_delay_secs >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "reload delay must not be negative, got {}",
                launcher.reload_delay_secs
            )));
        }

        Ok(())
    }
}
