/// World: the complete state of a running game.
///
/// ## Ownership
///
/// The world exclusively owns the tile grid, the obstacle and enemy
/// collections, and the player. Nothing else mutates them.
///
/// ## Staged mutation
///
/// `add_enemy` / `add_obstacle` never touch the live collections.
/// Additions wait in a staging area until `commit_staged()`, which runs at
/// fixed points only: the end of a tick and the end of a level population.
/// Removals work the same way: enemies are flagged `Life::Removed` and
/// `purge_removed()` drops them at the end of the tick.
///
/// ## Camera
///
/// World coordinates are pixels. The camera is a pixel rectangle centered
/// on the player and clamped to the map; maps smaller than the viewport
/// are centered instead.

use std::path::PathBuf;

use crate::config::Rules;
use crate::domain::collision::{self, CollisionView};
use crate::domain::entity::{Actor, EnemyKind, Health, Life};
use crate::domain::inventory::{Inventory, Item};
use crate::domain::object::Obstacle;
use crate::domain::tile::TileGrid;
use super::level::{self, LevelId, LevelLoadError, START_POSITION};

/// Camera: a pixel viewport into the world.
#[derive(Clone, Debug)]
pub struct Camera {
    /// World X of the top-left visible pixel (negative when centering a small map)
    pub x: f64,
    /// World Y of the top-left visible pixel
    pub y: f64,
    pub view_w: f64,
    pub view_h: f64,
}

impl Camera {
    pub fn new(view_w: f64, view_h: f64) -> Self {
        Camera { x: 0.0, y: 0.0, view_w, view_h }
    }

    /// Center on a target point, clamped to the world bounds.
    pub fn center_on(&mut self, target_x: f64, target_y: f64, world_w: f64, world_h: f64) {
        self.x = center_axis(target_x, self.view_w, world_w);
        self.y = center_axis(target_y, self.view_h, world_h);
    }
}

fn center_axis(target: f64, view: f64, world: f64) -> f64 {
    if world <= view {
        -((view - world) / 2.0)
    } else {
        (target - view / 2.0).clamp(0.0, world - view)
    }
}

pub struct World {
    pub grid: TileGrid,
    pub obstacles: Vec<Obstacle>,
    pub enemies: Vec<Actor>,
    pub player: Actor,
    pub inventory: Inventory,
    pub level: LevelId,
    pub camera: Camera,
    pub tick: u64,
    pub rules: Rules,
    pub maps_dir: PathBuf,

    // Status line shown by the frontend
    pub message: String,
    pub message_timer: u32,

    staged_enemies: Vec<Actor>,
    staged_obstacles: Vec<Obstacle>,
    pending_level: Option<LevelId>,
    next_enemy_id: u32,
}

impl World {
    /// Start a new game on the first level.
    pub fn new(rules: Rules, maps_dir: PathBuf) -> Result<World, LevelLoadError> {
        let level = LevelId::FIRST;
        let grid = level::load_map(&maps_dir, level.map_file())?;

        let mut world = World::with_grid(grid, rules, maps_dir);
        world.level = level;
        level.populate(&mut world);
        world.commit_staged();
        world.follow_camera();

        tracing::info!(level = level.name(), "new game");
        Ok(world)
    }

    /// An unpopulated world around an existing grid. The player stands at
    /// the start position carrying a sword.
    pub fn with_grid(grid: TileGrid, rules: Rules, maps_dir: PathBuf) -> World {
        let player = Actor::player(
            START_POSITION.0,
            START_POSITION.1,
            rules.player_sprite,
            rules.player_speed,
            Health::with_current(rules.player_spawn_health, rules.player_max_health),
        );
        let mut inventory = Inventory::new(rules.inventory_slots);
        inventory.add(Item::Sword, 1);

        World {
            grid,
            obstacles: Vec::new(),
            enemies: Vec::new(),
            player,
            inventory,
            level: LevelId::FIRST,
            camera: Camera::new(rules.view_w, rules.view_h),
            tick: 0,
            rules,
            maps_dir,
            message: String::new(),
            message_timer: 0,
            staged_enemies: Vec::new(),
            staged_obstacles: Vec::new(),
            pending_level: None,
            next_enemy_id: 1,
        }
    }

    // ── Enemy factory ──

    /// Build an enemy of `kind` with this world's per-kind rules and a fresh id.
    pub fn build_enemy(&mut self, kind: EnemyKind, x: f64, y: f64, health: Health) -> Actor {
        let id = self.next_enemy_id;
        self.next_enemy_id += 1;
        let k = self.rules.kind(kind);
        Actor::enemy(id, kind, x, y, k.sprite, k.speed, health)
    }

    /// Build and stage a full-health enemy. Returns its id.
    pub fn spawn_enemy(&mut self, kind: EnemyKind, x: f64, y: f64, max_health: i32) -> u32 {
        let enemy = self.build_enemy(kind, x, y, Health::full(max_health));
        let id = enemy.id;
        self.add_enemy(enemy);
        id
    }

    // ── Staged mutation ──

    pub fn add_enemy(&mut self, enemy: Actor) {
        self.staged_enemies.push(enemy);
    }

    pub fn add_obstacle(&mut self, obstacle: Obstacle) {
        self.staged_obstacles.push(obstacle);
    }

    /// Move staged additions into the live collections, preserving order.
    pub fn commit_staged(&mut self) {
        self.enemies.append(&mut self.staged_enemies);
        self.obstacles.append(&mut self.staged_obstacles);
    }

    /// Drop every enemy flagged `Removed`. Returns their ids in collection order.
    pub fn purge_removed(&mut self) -> Vec<u32> {
        let removed: Vec<u32> = self.enemies.iter()
            .filter(|e| e.life == Life::Removed)
            .map(|e| e.id)
            .collect();
        if !removed.is_empty() {
            self.enemies.retain(|e| e.life != Life::Removed);
            tracing::debug!(?removed, "purged enemies");
        }
        removed
    }

    /// Replace every enemy at once (save restore). Staged enemies are discarded.
    pub fn replace_enemies(&mut self, enemies: Vec<Actor>) {
        self.staged_enemies.clear();
        self.enemies = enemies;
    }

    // ── Level transitions ──

    /// Ask for a transition. It runs at the next transition point of the tick.
    pub fn request_level_change(&mut self, level: LevelId) {
        self.pending_level = Some(level);
    }

    pub fn take_pending_level(&mut self) -> Option<LevelId> {
        self.pending_level.take()
    }

    /// Switch to `level`. The map loads first; if it fails the world is untouched.
    /// On success every old enemy and obstacle is gone, the collections hold
    /// exactly what the new level populated, and the player is at its spawn point.
    pub fn change_level(&mut self, level: LevelId) -> Result<(), LevelLoadError> {
        let grid = level::load_map(&self.maps_dir, level.map_file())?;

        self.enemies.clear();
        self.obstacles.clear();
        self.staged_enemies.clear();
        self.staged_obstacles.clear();
        self.pending_level = None;

        self.grid = grid;
        self.level = level;
        level.populate(self);
        self.commit_staged();

        let (sx, sy) = level.spawn_point();
        self.player.x = sx;
        self.player.y = sy;
        self.player.moving = false;
        self.follow_camera();

        tracing::info!(
            level = level.name(),
            enemies = self.enemies.len(),
            obstacles = self.obstacles.len(),
            "level changed"
        );
        Ok(())
    }

    // ── Queries ──

    pub fn collision_view(&self) -> CollisionView<'_> {
        CollisionView {
            grid: &self.grid,
            obstacles: &self.obstacles,
            enemies: &self.enemies,
            player: Some(&self.player),
        }
    }

    pub fn can_move(&self, actor: &Actor, tx: f64, ty: f64) -> bool {
        collision::can_move(&self.collision_view(), actor, tx, ty)
    }

    pub fn follow_camera(&mut self) {
        let cx = self.player.x + self.player.sprite.w / 2.0;
        let cy = self.player.y + self.player.sprite.h / 2.0;
        let (w, h) = (self.grid.pixel_width(), self.grid.pixel_height());
        self.camera.center_on(cx, cy, w, h);
    }

    pub fn set_message(&mut self, msg: impl Into<String>, ticks: u32) {
        self.message = msg.into();
        self.message_timer = ticks;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tile::Tile;

    fn open_world() -> World {
        World::with_grid(TileGrid::filled(24, 24, Tile::Grass), Rules::default(), PathBuf::from("/nonexistent"))
    }

    #[test]
    fn additions_are_staged_until_commit() {
        let mut w = open_world();
        w.spawn_enemy(EnemyKind::Duck, 300.0, 300.0, 50);
        w.add_obstacle(Obstacle::tree(0.0, 0.0, w.rules.tree_sprite));
        assert!(w.enemies.is_empty());
        assert!(w.obstacles.is_empty());
        w.commit_staged();
        assert_eq!(w.enemies.len(), 1);
        assert_eq!(w.obstacles.len(), 1);
    }

    #[test]
    fn factory_uses_kind_rules_and_unique_ids() {
        let mut w = open_world();
        let a = w.spawn_enemy(EnemyKind::Duck, 0.0, 0.0, 50);
        let b = w.spawn_enemy(EnemyKind::Sheep, 0.0, 0.0, 100);
        assert_ne!(a, b);
        w.commit_staged();
        assert_eq!(w.enemies[1].sprite, w.rules.sheep.sprite);
        assert_eq!(w.enemies[1].health.max(), 100);
    }

    #[test]
    fn purge_drops_only_removed() {
        let mut w = open_world();
        let a = w.spawn_enemy(EnemyKind::Duck, 0.0, 0.0, 50);
        let b = w.spawn_enemy(EnemyKind::Duck, 100.0, 0.0, 50);
        w.commit_staged();
        w.enemies[0].life = Life::Removed;
        assert_eq!(w.purge_removed(), vec![a]);
        assert_eq!(w.enemies.len(), 1);
        assert_eq!(w.enemies[0].id, b);
    }

    #[test]
    fn new_game_populates_first_level() {
        let w = World::new(Rules::default(), PathBuf::from("/nonexistent")).unwrap();
        assert_eq!(w.level, LevelId::Meadow);
        assert_eq!(w.enemies.len(), 3);
        assert_eq!(w.obstacles.len(), 4);
        assert_eq!((w.player.x, w.player.y), START_POSITION);
        assert_eq!(w.inventory.selected_item(), Some(Item::Sword));
    }

    #[test]
    fn level_change_replaces_everything() {
        let mut w = World::new(Rules::default(), PathBuf::from("/nonexistent")).unwrap();
        let old_ids: Vec<u32> = w.enemies.iter().map(|e| e.id).collect();
        w.spawn_enemy(EnemyKind::Duck, 500.0, 500.0, 10); // staged leftover
        w.change_level(LevelId::Pasture).unwrap();

        assert_eq!(w.level, LevelId::Pasture);
        assert_eq!(w.enemies.len(), 3);
        assert_eq!(w.obstacles.len(), 4);
        assert!(w.enemies.iter().all(|e| !old_ids.contains(&e.id)));
        let healths: Vec<i32> = w.enemies.iter().map(|e| e.health.max()).collect();
        assert_eq!(healths, vec![60, 70, 120]);
        assert_eq!((w.player.x, w.player.y), LevelId::Pasture.spawn_point());
    }

    #[test]
    fn failed_level_change_leaves_world_untouched() {
        let dir = std::env::temp_dir().join(format!("tileworld-broken-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("pasture.txt"), "1 9\n").unwrap();

        let mut w = World::new(Rules::default(), dir.clone()).unwrap();
        let before = (w.enemies.len(), w.obstacles.len(), w.grid.width());
        assert!(w.change_level(LevelId::Pasture).is_err());
        assert_eq!(w.level, LevelId::Meadow);
        assert_eq!((w.enemies.len(), w.obstacles.len(), w.grid.width()), before);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn camera_clamps_and_centers() {
        let mut cam = Camera::new(800.0, 600.0);
        cam.center_on(100.0, 100.0, 1536.0, 1536.0);
        assert_eq!((cam.x, cam.y), (0.0, 0.0));
        cam.center_on(1500.0, 1500.0, 1536.0, 1536.0);
        assert_eq!((cam.x, cam.y), (736.0, 936.0));
        cam.center_on(700.0, 700.0, 1536.0, 1536.0);
        assert_eq!((cam.x, cam.y), (300.0, 400.0));
        // Map narrower than the view is centered.
        cam.center_on(10.0, 10.0, 400.0, 1536.0);
        assert_eq!(cam.x, -200.0);
    }
}
