/// Collision rules: may an actor move to a proposed top-left position?
///
/// Pure functions over a borrowed view of the world. No side effects.
///
/// ## Admissibility Table
///
/// A move is rejected if ANY row in the "deny" column matches.
///
/// ┌────────────────────────────────────────────┬────────┬────────────────────────────┐
/// │ Condition                                  │ Result │ Notes                      │
/// ├────────────────────────────────────────────┼────────┼────────────────────────────┤
/// │ sprite box touches a blocking tile         │ DENY   │ right/bottom edge -1px     │
/// │ sprite box overlaps a SOLID obstacle       │ DENY   │ open interval              │
/// │ hitbox overlaps another actor's hitbox     │ DENY   │ player skips itself only   │
/// │   ... but already overlapping, moving away │ skip   │ escape: dot(delta, AB) < 0 │
/// │ otherwise                                  │ ALLOW  │                            │
/// └────────────────────────────────────────────┴────────┴────────────────────────────┘
///
/// ## Actor candidates
///
/// Every enemy, plus the player when the mover is not the player.
/// The mover itself is excluded by id.
///
/// Missing data never blocks: an empty grid and empty collections admit every move.

use super::entity::Actor;
use super::object::Obstacle;
use super::tile::{pixel_to_tile, TileGrid};

/// Axis-aligned rectangle in world pixels.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Rect { x, y, w, h }
    }

    pub fn right(&self) -> f64 { self.x + self.w }
    pub fn bottom(&self) -> f64 { self.y + self.h }

    /// Open-interval overlap: touching edges do not count.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.right() > other.x
            && self.x < other.right()
            && self.bottom() > other.y
            && self.y < other.bottom()
    }
}

/// Immutable view of everything a move can bump into.
///
/// Also the spatial query for the rest of the sim: "what is near this
/// region" is a linear scan, collections are a handful of entries per level.
pub struct CollisionView<'a> {
    pub grid: &'a TileGrid,
    pub obstacles: &'a [Obstacle],
    pub enemies: &'a [Actor],
    pub player: Option<&'a Actor>,
}

impl<'a> CollisionView<'a> {
    /// Obstacles whose bounds overlap `area`, solid or not, in collection order.
    pub fn obstacles_near(&self, area: Rect) -> impl Iterator<Item = &'a Obstacle> + '_ {
        self.obstacles.iter().filter(move |o| area.overlaps(&o.bounds()))
    }

    /// Actors whose hitbox overlaps `area`: enemies in collection order,
    /// then the player when `include_player` is set.
    pub fn actors_near(&self, area: Rect, include_player: bool) -> impl Iterator<Item = &'a Actor> + '_ {
        let player = if include_player { self.player } else { None };
        self.enemies.iter()
            .chain(player)
            .filter(move |a| area.overlaps(&a.hitbox()))
    }
}

/// Can `mover` go from its current position to `(tx, ty)`?
pub fn can_move(view: &CollisionView, mover: &Actor, tx: f64, ty: f64) -> bool {
    !(hits_tiles(view.grid, mover, tx, ty)
        || hits_obstacles(view, mover, tx, ty)
        || hits_actors(view, mover, tx, ty))
}

/// Tile check: every cell under the sprite box, right/bottom edges inclusive-minus-one.
pub fn hits_tiles(grid: &TileGrid, mover: &Actor, tx: f64, ty: f64) -> bool {
    let b = mover.sprite_box_at(tx, ty);
    let left = pixel_to_tile(b.x);
    let right = pixel_to_tile(b.right() - 1.0);
    let top = pixel_to_tile(b.y);
    let bottom = pixel_to_tile(b.bottom() - 1.0);

    for ty in top..=bottom {
        for tx in left..=right {
            if grid.blocks_movement_at(tx, ty) {
                return true;
            }
        }
    }
    false
}

pub fn hits_obstacles(view: &CollisionView, mover: &Actor, tx: f64, ty: f64) -> bool {
    view.obstacles_near(mover.sprite_box_at(tx, ty)).any(|o| o.solid)
}

pub fn hits_actors(view: &CollisionView, mover: &Actor, tx: f64, ty: f64) -> bool {
    let current = mover.hitbox();
    let (dx, dy) = (tx - mover.x, ty - mover.y);

    view.actors_near(mover.hitbox_at(tx, ty), !mover.is_player())
        .filter(|other| other.id != mover.id)
        .any(|other| !(current.overlaps(&other.hitbox()) && moving_away(dx, dy, mover, other)))
}

/// Does the delta point away from `other` (negative dot with mover→other)?
fn moving_away(dx: f64, dy: f64, mover: &Actor, other: &Actor) -> bool {
    let (ox, oy) = (other.x - mover.x, other.y - mover.y);
    dx * ox + dy * oy < 0.0
}
