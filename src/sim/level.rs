/// Levels and map loading.
///
/// ## Progression
///   Meadow → Pasture → (end)
///
/// Each level is a map resource plus a population routine that adds
/// enemies and obstacles through the world's staged mutation interface.
///
/// ## Map sources (priority order):
///   1. `<maps_dir>/<file>` on disk
///   2. The bundled copy of the same file compiled into the binary
///
/// ## Map format:
///   One row per line, whitespace-separated integer tile codes.
///   Blank lines are ignored. Every row must have the same length.
///   `1` = Grass   `2` = Wall   `3` = Stone

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::entity::EnemyKind;
use crate::domain::inventory::{Item, ItemStack};
use crate::domain::object::Obstacle;
use crate::domain::tile::{Tile, TileGrid};
use crate::sim::world::World;

/// Where the player stands when a new game starts.
pub const START_POSITION: (f64, f64) = (80.0, 80.0);

#[derive(Debug, Error)]
pub enum LevelLoadError {
    #[error("map `{0}` not found on disk or among the bundled maps")]
    Missing(String),
    #[error("failed to read map {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("map `{name}` line {line}: `{token}` is not a tile code")]
    Malformed { name: String, line: usize, token: String },
    #[error("map `{0}` has no rows")]
    Empty(String),
    #[error("map `{name}` line {line} has {found} tiles, expected {expected}")]
    Ragged { name: String, line: usize, found: usize, expected: usize },
    #[error("map `{name}` line {line} column {column}: unknown tile code {code}")]
    UnknownTile { name: String, line: usize, column: usize, code: u32 },
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum LevelId {
    Meadow,
    Pasture,
}

impl LevelId {
    pub const FIRST: LevelId = LevelId::Meadow;

    /// Stable identifier used in save files.
    pub fn name(self) -> &'static str {
        match self {
            LevelId::Meadow => "meadow",
            LevelId::Pasture => "pasture",
        }
    }

    pub fn from_name(name: &str) -> Option<LevelId> {
        match name {
            "meadow" => Some(LevelId::Meadow),
            "pasture" => Some(LevelId::Pasture),
            _ => None,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            LevelId::Meadow => "The Meadow",
            LevelId::Pasture => "The Pasture",
        }
    }

    pub fn map_file(self) -> &'static str {
        match self {
            LevelId::Meadow => "meadow.txt",
            LevelId::Pasture => "pasture.txt",
        }
    }

    /// Successor in the progression. `None` marks the last level.
    pub fn next(self) -> Option<LevelId> {
        match self {
            LevelId::Meadow => Some(LevelId::Pasture),
            LevelId::Pasture => None,
        }
    }

    /// Where the player lands after transitioning into this level.
    pub fn spawn_point(self) -> (f64, f64) {
        (100.0, 100.0)
    }

    /// Add this level's enemies and obstacles. Everything is staged;
    /// the caller commits.
    pub fn populate(self, world: &mut World) {
        let chest = world.rules.chest_sprite;
        let door = world.rules.door_sprite;
        let tree = world.rules.tree_sprite;
        let potions = |n| ItemStack::new(Item::HealingPotion, n);
        let keys = |n| ItemStack::new(Item::Key, n);

        match self {
            LevelId::Meadow => {
                world.spawn_enemy(EnemyKind::Duck, 544.0, 268.0, 50);
                world.spawn_enemy(EnemyKind::Duck, 100.0, 700.0, 50);
                world.spawn_enemy(EnemyKind::Sheep, 950.0, 200.0, 100);

                world.add_obstacle(Obstacle::chest(500.0, 100.0, chest, vec![potions(2)]));
                world.add_obstacle(Obstacle::chest(750.0, 100.0, chest, vec![potions(2), keys(1)]));
                world.add_obstacle(Obstacle::tree(300.0, 420.0, tree));
                world.add_obstacle(Obstacle::door(1420.0, 1400.0, door));
            }
            LevelId::Pasture => {
                world.spawn_enemy(EnemyKind::Duck, 400.0, 150.0, 60);
                world.spawn_enemy(EnemyKind::Duck, 200.0, 100.0, 70);
                world.spawn_enemy(EnemyKind::Sheep, 200.0, 200.0, 120);

                world.add_obstacle(Obstacle::chest(750.0, 200.0, chest, vec![potions(2)]));
                world.add_obstacle(Obstacle::chest(850.0, 300.0, chest, vec![potions(2), keys(1)]));
                world.add_obstacle(Obstacle::tree(1100.0, 1000.0, tree));
                world.add_obstacle(Obstacle::door(780.0, 600.0, door));
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Map loading
// ══════════════════════════════════════════════════════════════

/// Bundled copies of the shipped maps.
fn bundled_map(file: &str) -> Option<&'static str> {
    match file {
        "meadow.txt" => Some(include_str!("../../maps/meadow.txt")),
        "pasture.txt" => Some(include_str!("../../maps/pasture.txt")),
        _ => None,
    }
}

/// Load a map by file name: disk first, then the bundled copy.
pub fn load_map(maps_dir: &Path, file: &str) -> Result<TileGrid, LevelLoadError> {
    let path = maps_dir.join(file);
    let grid = if path.is_file() {
        let text = std::fs::read_to_string(&path)
            .map_err(|source| LevelLoadError::Io { path: path.clone(), source })?;
        parse_map(file, &text)?
    } else {
        let text = bundled_map(file).ok_or_else(|| LevelLoadError::Missing(file.to_string()))?;
        parse_map(file, text)?
    };

    tracing::debug!(
        file,
        from_disk = path.is_file(),
        width = grid.width(),
        height = grid.height(),
        "map loaded"
    );
    Ok(grid)
}

/// Parse a whitespace-separated code matrix. Unknown codes and ragged rows
/// are errors; nothing is silently defaulted.
pub fn parse_map(name: &str, text: &str) -> Result<TileGrid, LevelLoadError> {
    let mut rows: Vec<Vec<Tile>> = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        if line.trim().is_empty() { continue; }

        let mut row = Vec::new();
        for (col, token) in line.split_whitespace().enumerate() {
            let code: u32 = token.parse().map_err(|_| LevelLoadError::Malformed {
                name: name.to_string(),
                line: line_no,
                token: token.to_string(),
            })?;
            let tile = Tile::from_code(code).ok_or_else(|| LevelLoadError::UnknownTile {
                name: name.to_string(),
                line: line_no,
                column: col + 1,
                code,
            })?;
            row.push(tile);
        }

        if let Some(first) = rows.first() {
            if row.len() != first.len() {
                return Err(LevelLoadError::Ragged {
                    name: name.to_string(),
                    line: line_no,
                    found: row.len(),
                    expected: first.len(),
                });
            }
        }
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(LevelLoadError::Empty(name.to_string()));
    }
    Ok(TileGrid::from_rows(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_codes() {
        let grid = parse_map("t", "2 2 2\n2 1 3\n\n2 2 2\n").unwrap();
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.height(), 3);
        assert_eq!(grid.tile_at(1, 1), Tile::Grass);
        assert_eq!(grid.tile_at(2, 1), Tile::Stone);
        assert!(grid.blocks_movement_at(0, 0));
    }

    #[test]
    fn unknown_code_is_rejected() {
        let err = parse_map("t", "1 1\n1 7\n").unwrap_err();
        assert!(matches!(
            err,
            LevelLoadError::UnknownTile { line: 2, column: 2, code: 7, .. }
        ));
    }

    #[test]
    fn non_numeric_token_is_rejected() {
        let err = parse_map("t", "1 x\n").unwrap_err();
        assert!(matches!(err, LevelLoadError::Malformed { line: 1, .. }));
    }

    #[test]
    fn ragged_and_empty_are_rejected() {
        assert!(matches!(
            parse_map("t", "1 1 1\n1 1\n").unwrap_err(),
            LevelLoadError::Ragged { found: 2, expected: 3, .. }
        ));
        assert!(matches!(parse_map("t", "\n \n").unwrap_err(), LevelLoadError::Empty(_)));
    }

    #[test]
    fn bundled_maps_load_and_are_walled() {
        let nowhere = Path::new("/nonexistent-maps-dir");
        for level in [LevelId::Meadow, LevelId::Pasture] {
            let grid = load_map(nowhere, level.map_file()).unwrap();
            assert_eq!((grid.width(), grid.height()), (24, 24));
            assert!(grid.blocks_movement_at(0, 0));
            assert!(grid.blocks_movement_at(23, 23));
            assert!(!grid.blocks_movement_at(1, 1));
        }
    }

    #[test]
    fn missing_map_is_an_error() {
        let err = load_map(Path::new("/nonexistent-maps-dir"), "nope.txt").unwrap_err();
        assert!(matches!(err, LevelLoadError::Missing(name) if name == "nope.txt"));
    }

    #[test]
    fn disk_map_wins_over_bundled() {
        let dir = std::env::temp_dir().join(format!("tileworld-maps-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("meadow.txt"), "1 1\n1 1\n").unwrap();
        let grid = load_map(&dir, "meadow.txt").unwrap();
        assert_eq!(grid.width(), 2);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn progression_and_names() {
        assert_eq!(LevelId::FIRST.next(), Some(LevelId::Pasture));
        assert_eq!(LevelId::Pasture.next(), None);
        for level in [LevelId::Meadow, LevelId::Pasture] {
            assert_eq!(LevelId::from_name(level.name()), Some(level));
        }
        assert_eq!(LevelId::from_name("castle"), None);
    }
}
