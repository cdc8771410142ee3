/// Save and load game progress.
///
/// ## File format (TOML):
///   ```toml
///   level = "meadow"
///
///   [player]
///   x = 412.0
///   y = 260.0
///   health = 80
///
///   [[enemies]]
///   kind = "duck"
///   x = 544.0
///   y = 268.0
///   health = 40
///   max_health = 50
///   ```
///
/// Restoring rebuilds the saved level (fresh map and obstacles), then puts the
/// player and the saved enemies back. Enemy kinds go through the closed
/// `EnemyKind` registry; an unknown kind fails the whole restore before the
/// world is touched.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::entity::{EnemyKind, Health, UnknownEnemyKind};
use crate::sim::level::{LevelId, LevelLoadError};
use crate::sim::world::World;

// ══════════════════════════════════════════════════════════════
// Public types
// ══════════════════════════════════════════════════════════════

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SaveData {
    pub level: String,
    pub player: PlayerSave,
    #[serde(default)]
    pub enemies: Vec<EnemySave>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PlayerSave {
    pub x: f64,
    pub y: f64,
    pub health: i32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct EnemySave {
    pub kind: String,
    pub x: f64,
    pub y: f64,
    pub health: i32,
    /// Older saves carry only `health`; it then doubles as the maximum.
    #[serde(default)]
    pub max_health: Option<i32>,
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("could not access save file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("save file is malformed: {0}")]
    Decode(#[from] toml::de::Error),
    #[error("could not encode save: {0}")]
    Encode(#[from] toml::ser::Error),
    #[error("unknown level `{0}` in save")]
    UnknownLevel(String),
    #[error(transparent)]
    UnknownEnemyKind(#[from] UnknownEnemyKind),
    #[error("could not rebuild saved level: {0}")]
    Level(#[from] LevelLoadError),
}

// ══════════════════════════════════════════════════════════════
// Capture / restore
// ══════════════════════════════════════════════════════════════

/// Snapshot the parts of the world a save keeps. Enemies already dying are
/// left out; they would be gone within a second anyway.
pub fn capture(world: &World) -> SaveData {
    SaveData {
        level: world.level.name().to_string(),
        player: PlayerSave {
            x: world.player.x,
            y: world.player.y,
            health: world.player.health.current(),
        },
        enemies: world.enemies.iter()
            .filter(|e| e.is_alive())
            .filter_map(|e| {
                let kind = e.kind()?;
                Some(EnemySave {
                    kind: kind.as_str().to_string(),
                    x: e.x,
                    y: e.y,
                    health: e.health.current(),
                    max_health: Some(e.health.max()),
                })
            })
            .collect(),
    }
}

pub fn restore(world: &mut World, data: &SaveData) -> Result<(), SaveError> {
    let level = LevelId::from_name(&data.level)
        .ok_or_else(|| SaveError::UnknownLevel(data.level.clone()))?;

    // Resolve every kind up front so a bad entry leaves the world untouched.
    let kinds = data.enemies.iter()
        .map(|e| e.kind.parse::<EnemyKind>())
        .collect::<Result<Vec<_>, _>>()?;

    world.change_level(level)?;

    let enemies = data.enemies.iter()
        .zip(kinds)
        .map(|(e, kind)| {
            let max = e.max_health.unwrap_or(e.health);
            world.build_enemy(kind, e.x, e.y, Health::with_current(e.health, max))
        })
        .collect();
    world.replace_enemies(enemies);

    world.player.x = data.player.x;
    world.player.y = data.player.y;
    world.player.health = Health::with_current(data.player.health, world.rules.player_max_health);
    world.follow_camera();

    tracing::info!(level = level.name(), enemies = world.enemies.len(), "save restored");
    Ok(())
}

// ══════════════════════════════════════════════════════════════
// File I/O
// ══════════════════════════════════════════════════════════════

pub fn encode(data: &SaveData) -> Result<String, SaveError> {
    Ok(toml::to_string_pretty(data)?)
}

pub fn decode(text: &str) -> Result<SaveData, SaveError> {
    Ok(toml::from_str(text)?)
}

pub fn save_to(world: &World, path: &Path) -> Result<(), SaveError> {
    let text = encode(&capture(world))?;
    std::fs::write(path, text)
        .map_err(|source| SaveError::Io { path: path.to_path_buf(), source })?;
    tracing::info!(path = %path.display(), "game saved");
    Ok(())
}

pub fn load_from(world: &mut World, path: &Path) -> Result<(), SaveError> {
    let text = std::fs::read_to_string(path)
        .map_err(|source| SaveError::Io { path: path.to_path_buf(), source })?;
    let data = decode(&text)?;
    restore(world, &data)
}
