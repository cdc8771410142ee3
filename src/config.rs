/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.
///
/// Durations are written in milliseconds. The simulation never sees them:
/// `GameConfig::rules()` converts everything into whole ticks once, and the
/// resulting `Rules` is handed to the world at construction.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::domain::entity::{EnemyKind, SpriteSize};

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub timing: TimingConfig,
    pub player: PlayerConfig,
    pub enemies: EnemyConfig,
    pub objects: ObjectConfig,
    pub sprites: SpriteConfig,
    pub view: ViewConfig,
    pub maps_dir: PathBuf,
    pub save_file: PathBuf,
}

#[derive(Clone, Debug)]
pub struct TimingConfig {
    pub ticks_per_second: u32,
    pub max_catch_up_ticks: u32, // per frame; the rest of the backlog is dropped
}

#[derive(Clone, Debug)]
pub struct PlayerConfig {
    pub speed: f64,
    pub max_health: i32,
    pub spawn_health: i32,
    pub attack_reach: f64,
    pub attack_damage: i32,
    pub attack_ms: u64,
    pub inventory_slots: usize,
}

#[derive(Clone, Debug)]
pub struct EnemyConfig {
    pub duck_speed: f64,
    pub sheep_speed: f64,
    pub attack_range: f64,
    pub attack_damage: i32,
    pub attack_cooldown_ms: u64,
    pub attack_anim_ms: u64,
    pub death_ms: u64,
    pub detection_range: f64,
    pub patrol_interval_ms: u64,
}

#[derive(Clone, Debug)]
pub struct ObjectConfig {
    pub chest_reach: f64,
    pub door_reach: f64,
    pub door_cooldown_ms: u64,
    pub potion_heal: i32,
}

#[derive(Clone, Debug)]
pub struct SpriteConfig {
    pub player: SpriteSize,
    pub duck: SpriteSize,
    pub sheep: SpriteSize,
    pub chest: SpriteSize,
    pub door: SpriteSize,
    pub tree: SpriteSize,
}

#[derive(Clone, Debug)]
pub struct ViewConfig {
    pub width: f64,
    pub height: f64,
}

/// Tick-based rules the simulation runs on.
#[derive(Clone, Debug)]
pub struct Rules {
    pub player_speed: f64,
    pub player_max_health: i32,
    pub player_spawn_health: i32,
    pub player_sprite: SpriteSize,
    pub sword_reach: f64,
    pub sword_damage: i32,
    pub sword_ticks: u64,
    pub inventory_slots: usize,

    pub duck: KindRules,
    pub sheep: KindRules,
    pub attack_range: f64,
    pub attack_damage: i32,
    pub attack_cooldown_ticks: u64,
    pub attack_anim_ticks: u64,
    pub death_ticks: u64,
    pub detection_range: f64,
    pub patrol_interval_ticks: u64,

    pub chest_reach: f64,
    pub door_reach: f64,
    pub door_cooldown_ticks: u64,
    pub potion_heal: i32,
    pub chest_sprite: SpriteSize,
    pub door_sprite: SpriteSize,
    pub tree_sprite: SpriteSize,

    pub view_w: f64,
    pub view_h: f64,
}

/// Per-kind movement parameters.
#[derive(Clone, Copy, Debug)]
pub struct KindRules {
    pub speed: f64,
    pub sprite: SpriteSize,
}

impl Rules {
    pub fn kind(&self, kind: EnemyKind) -> KindRules {
        match kind {
            EnemyKind::Duck => self.duck,
            EnemyKind::Sheep => self.sheep,
        }
    }
}

impl Default for Rules {
    fn default() -> Self {
        GameConfig::default().rules()
    }
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    player: TomlPlayer,
    #[serde(default)]
    enemies: TomlEnemies,
    #[serde(default)]
    objects: TomlObjects,
    #[serde(default)]
    sprites: TomlSprites,
    #[serde(default)]
    view: TomlView,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_tps")]
    ticks_per_second: u32,
    #[serde(default = "default_catch_up")]
    max_catch_up_ticks: u32,
}

#[derive(Deserialize, Debug)]
struct TomlPlayer {
    #[serde(default = "default_player_speed")]
    speed: f64,
    #[serde(default = "default_player_health")]
    max_health: i32,
    #[serde(default = "default_player_health")]
    spawn_health: i32,
    #[serde(default = "default_attack_reach")]
    attack_reach: f64,
    #[serde(default = "default_damage")]
    attack_damage: i32,
    #[serde(default = "default_attack_ms")]
    attack_ms: u64,
    #[serde(default = "default_slots")]
    inventory_slots: usize,
}

#[derive(Deserialize, Debug)]
struct TomlEnemies {
    #[serde(default = "default_enemy_speed")]
    duck_speed: f64,
    #[serde(default = "default_enemy_speed")]
    sheep_speed: f64,
    #[serde(default = "default_attack_reach")]
    attack_range: f64,
    #[serde(default = "default_damage")]
    attack_damage: i32,
    #[serde(default = "default_cooldown_ms")]
    attack_cooldown_ms: u64,
    #[serde(default = "default_attack_ms")]
    attack_anim_ms: u64,
    #[serde(default = "default_death_ms")]
    death_ms: u64,
    #[serde(default = "default_detection")]
    detection_range: f64,
    #[serde(default = "default_patrol_ms")]
    patrol_interval_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlObjects {
    #[serde(default = "default_reach")]
    chest_reach: f64,
    #[serde(default = "default_reach")]
    door_reach: f64,
    #[serde(default = "default_cooldown_ms")]
    door_cooldown_ms: u64,
    #[serde(default = "default_potion_heal")]
    potion_heal: i32,
}

/// Sprite sizes as `[width, height]` pairs.
#[derive(Deserialize, Debug)]
struct TomlSprites {
    #[serde(default = "default_player_sprite")]
    player: [f64; 2],
    #[serde(default = "default_duck_sprite")]
    duck: [f64; 2],
    #[serde(default = "default_sheep_sprite")]
    sheep: [f64; 2],
    #[serde(default = "default_chest_sprite")]
    chest: [f64; 2],
    #[serde(default = "default_door_sprite")]
    door: [f64; 2],
    #[serde(default = "default_tree_sprite")]
    tree: [f64; 2],
}

#[derive(Deserialize, Debug)]
struct TomlView {
    #[serde(default = "default_view_w")]
    width: f64,
    #[serde(default = "default_view_h")]
    height: f64,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_maps_dir")]
    maps_dir: String,
    #[serde(default = "default_save_file")]
    save_file: String,
}

// ── Defaults ──

fn default_tps() -> u32 { 60 }
fn default_catch_up() -> u32 { 5 }
fn default_player_speed() -> f64 { 3.0 }
fn default_player_health() -> i32 { 100 }
fn default_attack_reach() -> f64 { 50.0 }
fn default_damage() -> i32 { 10 }
fn default_attack_ms() -> u64 { 500 }
fn default_slots() -> usize { 4 }
fn default_enemy_speed() -> f64 { 1.0 }
fn default_cooldown_ms() -> u64 { 1000 }
fn default_death_ms() -> u64 { 1000 }
fn default_detection() -> f64 { 200.0 }
fn default_patrol_ms() -> u64 { 2000 }
fn default_reach() -> f64 { 64.0 }
fn default_potion_heal() -> i32 { 25 }
fn default_player_sprite() -> [f64; 2] { [48.0, 48.0] }
fn default_duck_sprite() -> [f64; 2] { [40.0, 40.0] }
fn default_sheep_sprite() -> [f64; 2] { [48.0, 40.0] }
fn default_chest_sprite() -> [f64; 2] { [48.0, 48.0] }
fn default_door_sprite() -> [f64; 2] { [64.0, 64.0] }
fn default_tree_sprite() -> [f64; 2] { [64.0, 96.0] }
fn default_view_w() -> f64 { 800.0 }
fn default_view_h() -> f64 { 600.0 }
fn default_maps_dir() -> String { "maps".into() }
fn default_save_file() -> String { "save.toml".into() }

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming {
            ticks_per_second: default_tps(),
            max_catch_up_ticks: default_catch_up(),
        }
    }
}

impl Default for TomlPlayer {
    fn default() -> Self {
        TomlPlayer {
            speed: default_player_speed(),
            max_health: default_player_health(),
            spawn_health: default_player_health(),
            attack_reach: default_attack_reach(),
            attack_damage: default_damage(),
            attack_ms: default_attack_ms(),
            inventory_slots: default_slots(),
        }
    }
}

impl Default for TomlEnemies {
    fn default() -> Self {
        TomlEnemies {
            duck_speed: default_enemy_speed(),
            sheep_speed: default_enemy_speed(),
            attack_range: default_attack_reach(),
            attack_damage: default_damage(),
            attack_cooldown_ms: default_cooldown_ms(),
            attack_anim_ms: default_attack_ms(),
            death_ms: default_death_ms(),
            detection_range: default_detection(),
            patrol_interval_ms: default_patrol_ms(),
        }
    }
}

impl Default for TomlObjects {
    fn default() -> Self {
        TomlObjects {
            chest_reach: default_reach(),
            door_reach: default_reach(),
            door_cooldown_ms: default_cooldown_ms(),
            potion_heal: default_potion_heal(),
        }
    }
}

impl Default for TomlSprites {
    fn default() -> Self {
        TomlSprites {
            player: default_player_sprite(),
            duck: default_duck_sprite(),
            sheep: default_sheep_sprite(),
            chest: default_chest_sprite(),
            door: default_door_sprite(),
            tree: default_tree_sprite(),
        }
    }
}

impl Default for TomlView {
    fn default() -> Self {
        TomlView { width: default_view_w(), height: default_view_h() }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            maps_dir: default_maps_dir(),
            save_file: default_save_file(),
        }
    }
}

fn size([w, h]: [f64; 2]) -> SpriteSize {
    SpriteSize::new(w.max(1.0), h.max(1.0))
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);

        // Maps directory: first candidate that actually has it, else relative to CWD
        let maps_dir_str = toml_cfg.general.maps_dir.clone();
        let maps_dir = if Path::new(&maps_dir_str).is_absolute() {
            PathBuf::from(&maps_dir_str)
        } else {
            search_dirs.iter()
                .map(|d| d.join(&maps_dir_str))
                .find(|p| p.is_dir())
                .unwrap_or_else(|| PathBuf::from(&maps_dir_str))
        };

        let mut cfg = GameConfig::from_toml(toml_cfg);
        cfg.maps_dir = maps_dir;
        cfg
    }

    /// Parse a config document directly.
    #[cfg(test)]
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str::<TomlConfig>(text).map(GameConfig::from_toml)
    }

    fn from_toml(t: TomlConfig) -> Self {
        GameConfig {
            timing: TimingConfig {
                ticks_per_second: t.timing.ticks_per_second.max(1),
                max_catch_up_ticks: t.timing.max_catch_up_ticks.max(1),
            },
            player: PlayerConfig {
                speed: t.player.speed,
                max_health: t.player.max_health,
                spawn_health: t.player.spawn_health,
                attack_reach: t.player.attack_reach,
                attack_damage: t.player.attack_damage,
                attack_ms: t.player.attack_ms,
                inventory_slots: t.player.inventory_slots,
            },
            enemies: EnemyConfig {
                duck_speed: t.enemies.duck_speed,
                sheep_speed: t.enemies.sheep_speed,
                attack_range: t.enemies.attack_range,
                attack_damage: t.enemies.attack_damage,
                attack_cooldown_ms: t.enemies.attack_cooldown_ms,
                attack_anim_ms: t.enemies.attack_anim_ms,
                death_ms: t.enemies.death_ms,
                detection_range: t.enemies.detection_range,
                patrol_interval_ms: t.enemies.patrol_interval_ms,
            },
            objects: ObjectConfig {
                chest_reach: t.objects.chest_reach,
                door_reach: t.objects.door_reach,
                door_cooldown_ms: t.objects.door_cooldown_ms,
                potion_heal: t.objects.potion_heal,
            },
            sprites: SpriteConfig {
                player: size(t.sprites.player),
                duck: size(t.sprites.duck),
                sheep: size(t.sprites.sheep),
                chest: size(t.sprites.chest),
                door: size(t.sprites.door),
                tree: size(t.sprites.tree),
            },
            view: ViewConfig { width: t.view.width, height: t.view.height },
            maps_dir: PathBuf::from(t.general.maps_dir),
            save_file: PathBuf::from(t.general.save_file),
        }
    }

    /// Milliseconds → whole ticks at the configured rate.
    pub fn ms_to_ticks(&self, ms: u64) -> u64 {
        ms * self.timing.ticks_per_second as u64 / 1000
    }

    /// Freeze the config into tick-based rules for the simulation.
    pub fn rules(&self) -> Rules {
        Rules {
            player_speed: self.player.speed,
            player_max_health: self.player.max_health,
            player_spawn_health: self.player.spawn_health,
            player_sprite: self.sprites.player,
            sword_reach: self.player.attack_reach,
            sword_damage: self.player.attack_damage,
            sword_ticks: self.ms_to_ticks(self.player.attack_ms),
            inventory_slots: self.player.inventory_slots,

            duck: KindRules { speed: self.enemies.duck_speed, sprite: self.sprites.duck },
            sheep: KindRules { speed: self.enemies.sheep_speed, sprite: self.sprites.sheep },
            attack_range: self.enemies.attack_range,
            attack_damage: self.enemies.attack_damage,
            attack_cooldown_ticks: self.ms_to_ticks(self.enemies.attack_cooldown_ms),
            attack_anim_ticks: self.ms_to_ticks(self.enemies.attack_anim_ms),
            death_ticks: self.ms_to_ticks(self.enemies.death_ms),
            detection_range: self.enemies.detection_range,
            patrol_interval_ticks: self.ms_to_ticks(self.enemies.patrol_interval_ms).max(1),

            chest_reach: self.objects.chest_reach,
            door_reach: self.objects.door_reach,
            door_cooldown_ticks: self.ms_to_ticks(self.objects.door_cooldown_ms),
            potion_heal: self.objects.potion_heal,
            chest_sprite: self.sprites.chest,
            door_sprite: self.sprites.door,
            tree_sprite: self.sprites.tree,

            view_w: self.view.width,
            view_h: self.view.height,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::from_toml(TomlConfig::default())
    }
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "config parse error, using defaults");
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "could not read config");
                }
            }
        }
    }
    TomlConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_convert_to_ticks() {
        assert_eq!(GameConfig::default().timing.ticks_per_second, 60);
        let rules = Rules::default();
        assert_eq!(rules.patrol_interval_ticks, 120);
        assert_eq!(rules.attack_cooldown_ticks, 60);
        assert_eq!(rules.attack_anim_ticks, 30);
        assert_eq!(rules.death_ticks, 60);
        assert_eq!(rules.door_cooldown_ticks, 60);
        assert_eq!(rules.sword_ticks, 30);
        assert_eq!(rules.player_sprite, SpriteSize::new(48.0, 48.0));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let cfg = GameConfig::parse(
            "[timing]\nticks_per_second = 30\n\n[sprites]\nduck = [32, 24]\n",
        ).unwrap();
        assert_eq!(cfg.timing.ticks_per_second, 30);
        assert_eq!(cfg.timing.max_catch_up_ticks, 5);
        assert_eq!(cfg.sprites.duck, SpriteSize::new(32.0, 24.0));
        assert_eq!(cfg.rules().patrol_interval_ticks, 60);
        assert_eq!(cfg.save_file, PathBuf::from("save.toml"));
    }

    #[test]
    fn bad_document_is_an_error() {
        assert!(GameConfig::parse("[timing]\nticks_per_second = \"fast\"\n").is_err());
    }

    #[test]
    fn kind_lookup() {
        let rules = Rules::default();
        assert_eq!(rules.kind(EnemyKind::Sheep).sprite, SpriteSize::new(48.0, 40.0));
        assert_eq!(rules.kind(EnemyKind::Duck).speed, 1.0);
    }
}
