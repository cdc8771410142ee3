/// Actors: the player and enemies share one record.
///
/// What differs between them is data, not type:
///   - `role` says who the actor is (player or which enemy kind)
///   - `intent` says how it decides where to go each tick
///   - `combat` is the shared attack clock, identical for every kind
///
/// Life cycle: Alive → Dying (health hit zero) → Removed (death clock ran out).

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::collision::Rect;

/// Player hitbox edge, independent of the player's sprite size.
pub const PLAYER_HITBOX: f64 = 48.0;

/// Reserved id of the player actor. Enemies get ids starting at 1.
pub const PLAYER_ID: u32 = 0;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    None,
}

impl Direction {
    /// Unit step for this direction in screen space (y grows downwards).
    pub fn unit(self) -> (f64, f64) {
        match self {
            Direction::Up => (0.0, -1.0),
            Direction::Down => (0.0, 1.0),
            Direction::Left => (-1.0, 0.0),
            Direction::Right => (1.0, 0.0),
            Direction::None => (0.0, 0.0),
        }
    }
}

/// Frame input: movement is continuous (held keys), slot cycling and
/// item use are edge-triggered (fresh presses).
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct FrameInput {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub cycle_slot: bool,
    pub use_item: bool,
}

impl FrameInput {
    /// Axis signs from held keys; opposite keys cancel.
    pub fn axes(&self) -> (f64, f64) {
        let dx = (self.right as i32 - self.left as i32) as f64;
        let dy = (self.down as i32 - self.up as i32) as f64;
        (dx, dy)
    }

    /// Clear the one-shot actions once a tick has consumed them.
    pub fn consume_edges(&mut self) {
        self.cycle_slot = false;
        self.use_item = false;
    }
}

/// Pixel size of a sprite. The only thing the simulation knows about art.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct SpriteSize {
    pub w: f64,
    pub h: f64,
}

impl SpriteSize {
    pub const fn new(w: f64, h: f64) -> Self {
        SpriteSize { w, h }
    }
}

/// Current/maximum health. `current` always stays within `0..=max`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Health {
    current: i32,
    max: i32,
}

impl Health {
    pub fn full(max: i32) -> Self {
        let max = max.max(0);
        Health { current: max, max }
    }

    /// Health restored from saved state, clamped into range.
    pub fn with_current(current: i32, max: i32) -> Self {
        let max = max.max(0);
        Health { current: current.clamp(0, max), max }
    }

    pub fn current(&self) -> i32 { self.current }
    pub fn max(&self) -> i32 { self.max }
    pub fn is_zero(&self) -> bool { self.current == 0 }

    /// Subtract `amount`, never going below zero.
    pub fn damage(&mut self, amount: i32) {
        self.current = (self.current - amount.max(0)).max(0);
    }

    /// Add `amount`, never going above max.
    pub fn heal(&mut self, amount: i32) {
        self.current = (self.current + amount.max(0)).min(self.max);
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Life {
    Alive,
    /// Health reached zero at tick `since`. Not updated, waiting for removal.
    Dying { since: u64 },
    /// Purged at the end of the current tick.
    Removed,
}

/// Closed set of enemy kinds. Saved games refer to kinds by `as_str()`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum EnemyKind {
    Duck,
    Sheep,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown enemy kind `{0}`")]
pub struct UnknownEnemyKind(pub String);

impl EnemyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EnemyKind::Duck => "duck",
            EnemyKind::Sheep => "sheep",
        }
    }

    /// Movement strategy each kind is born with.
    pub fn intent(self) -> Intent {
        match self {
            EnemyKind::Duck => Intent::DirectPursuit,
            EnemyKind::Sheep => Intent::PatrolDetect(Patrol::default()),
        }
    }
}

impl fmt::Display for EnemyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnemyKind {
    type Err = UnknownEnemyKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "duck" => Ok(EnemyKind::Duck),
            "sheep" => Ok(EnemyKind::Sheep),
            other => Err(UnknownEnemyKind(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Role {
    Player,
    Enemy(EnemyKind),
}

/// Fixed patrol route: each phase lasts one patrol interval.
pub const PATROL_ROUTE: [Direction; 4] =
    [Direction::Left, Direction::Right, Direction::Up, Direction::Down];

/// Patrol progress. `phase_ticks` only counts ticks spent patrolling.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Patrol {
    pub phase: usize,
    pub phase_ticks: u64,
}

impl Patrol {
    pub fn direction(&self) -> Direction {
        PATROL_ROUTE[self.phase % PATROL_ROUTE.len()]
    }
}

/// How an actor picks its movement each tick.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Intent {
    PlayerControlled,
    DirectPursuit,
    PatrolDetect(Patrol),
}

/// Attack timing shared by every actor that attacks.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct CombatClock {
    /// Tick of the most recent attack. `None` means the first attack is free.
    pub last_attack: Option<u64>,
    /// Presentation-only attack window; ends at this tick (exclusive).
    pub attacking_until: u64,
}

impl CombatClock {
    pub fn is_attacking(&self, now: u64) -> bool {
        now < self.attacking_until
    }
}

#[derive(Clone, Debug)]
pub struct Actor {
    pub id: u32,
    pub role: Role,
    pub x: f64,
    pub y: f64,
    pub sprite: SpriteSize,
    pub facing: Direction,
    pub moving: bool,
    pub health: Health,
    pub life: Life,
    pub intent: Intent,
    pub combat: CombatClock,
    pub speed: f64,
}

impl Actor {
    pub fn player(x: f64, y: f64, sprite: SpriteSize, speed: f64, health: Health) -> Self {
        Actor {
            id: PLAYER_ID,
            role: Role::Player,
            x, y,
            sprite,
            facing: Direction::Down,
            moving: false,
            health,
            life: Life::Alive,
            intent: Intent::PlayerControlled,
            combat: CombatClock::default(),
            speed,
        }
    }

    pub fn enemy(
        id: u32,
        kind: EnemyKind,
        x: f64, y: f64,
        sprite: SpriteSize,
        speed: f64,
        health: Health,
    ) -> Self {
        Actor {
            id,
            role: Role::Enemy(kind),
            x, y,
            sprite,
            facing: Direction::Down,
            moving: false,
            health,
            life: Life::Alive,
            intent: kind.intent(),
            combat: CombatClock::default(),
            speed,
        }
    }

    pub fn is_player(&self) -> bool {
        self.role == Role::Player
    }

    pub fn kind(&self) -> Option<EnemyKind> {
        match self.role {
            Role::Enemy(kind) => Some(kind),
            Role::Player => None,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.life == Life::Alive
    }

    /// Sprite-sized box at an arbitrary top-left. Used for tile and object checks.
    pub fn sprite_box_at(&self, x: f64, y: f64) -> Rect {
        Rect::new(x, y, self.sprite.w, self.sprite.h)
    }

    /// Actor-vs-actor box. The player always uses a fixed 48x48 box,
    /// everyone else uses their sprite box.
    pub fn hitbox_at(&self, x: f64, y: f64) -> Rect {
        if self.is_player() {
            Rect::new(x, y, PLAYER_HITBOX, PLAYER_HITBOX)
        } else {
            self.sprite_box_at(x, y)
        }
    }

    pub fn hitbox(&self) -> Rect {
        self.hitbox_at(self.x, self.y)
    }

    /// Apply damage at tick `now`. Ignored unless alive.
    /// Returns true when this hit brought health to zero.
    pub fn take_damage(&mut self, amount: i32, now: u64) -> bool {
        if !self.is_alive() { return false; }
        self.health.damage(amount);
        if self.health.is_zero() {
            self.life = Life::Dying { since: now };
            return true;
        }
        false
    }

    pub fn heal(&mut self, amount: i32) {
        self.health.heal(amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn duck(sprite: SpriteSize) -> Actor {
        Actor::enemy(1, EnemyKind::Duck, 10.0, 20.0, sprite, 1.0, Health::full(50))
    }

    #[test]
    fn player_hitbox_ignores_sprite() {
        let p = Actor::player(10.0, 20.0, SpriteSize::new(32.0, 96.0), 3.0, Health::full(100));
        assert_eq!(p.hitbox(), Rect::new(10.0, 20.0, 48.0, 48.0));
        // Sprite box still follows the sprite.
        assert_eq!(p.sprite_box_at(0.0, 0.0), Rect::new(0.0, 0.0, 32.0, 96.0));
    }

    #[test]
    fn enemy_hitbox_is_sprite_box() {
        let d = duck(SpriteSize::new(40.0, 30.0));
        assert_eq!(d.hitbox(), Rect::new(10.0, 20.0, 40.0, 30.0));
        assert_eq!(d.hitbox_at(1.0, 2.0), Rect::new(1.0, 2.0, 40.0, 30.0));
    }

    #[test]
    fn damage_clamps_and_starts_dying() {
        let mut d = duck(SpriteSize::new(40.0, 40.0));
        assert!(!d.take_damage(30, 5));
        assert_eq!(d.health.current(), 20);
        assert!(d.take_damage(30, 7));
        assert_eq!(d.health.current(), 0);
        assert_eq!(d.life, Life::Dying { since: 7 });

        // Further hits are ignored; the death tick does not move.
        assert!(!d.take_damage(30, 9));
        assert_eq!(d.health.current(), 0);
        assert_eq!(d.life, Life::Dying { since: 7 });
    }

    #[test]
    fn heal_clamps_at_max() {
        let mut h = Health::full(100);
        h.damage(10);
        for _ in 0..5 { h.heal(25); }
        assert_eq!(h.current(), 100);
        for _ in 0..10 { h.damage(40); }
        assert_eq!(h.current(), 0);
    }

    #[test]
    fn restored_health_is_clamped() {
        assert_eq!(Health::with_current(150, 100).current(), 100);
        assert_eq!(Health::with_current(-3, 100).current(), 0);
    }

    #[test]
    fn kind_registry_round_trip_and_unknown() {
        for kind in [EnemyKind::Duck, EnemyKind::Sheep] {
            assert_eq!(kind.as_str().parse::<EnemyKind>(), Ok(kind));
        }
        assert_eq!(
            "goose".parse::<EnemyKind>(),
            Err(UnknownEnemyKind("goose".to_string()))
        );
    }

    #[test]
    fn kinds_pick_their_strategy() {
        assert_eq!(EnemyKind::Duck.intent(), Intent::DirectPursuit);
        assert_eq!(
            EnemyKind::Sheep.intent(),
            Intent::PatrolDetect(Patrol { phase: 0, phase_ticks: 0 })
        );
        assert_eq!(Patrol::default().direction(), Direction::Left);
    }
}
