/// Enemy AI: movement intents and the shared combat clock.
///
/// Two kind strategies:
///   1. **DirectPursuit**: step straight at the player on a sign vector.
///   2. **PatrolDetect**: pursue inside the detection radius, otherwise walk
///      a fixed Left → Right → Up → Down route, one phase per patrol interval.
///
/// Combat is the same for every kind and runs after movement:
/// in range + cooldown elapsed → hit the player, open the attack window.

use std::cmp::Ordering;

use crate::config::Rules;
use super::entity::{Actor, CombatClock, Direction, Intent, Life, PATROL_ROUTE};

/// Movement proposed for one tick.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Proposal {
    pub dx: f64,
    pub dy: f64,
    pub facing: Direction,
}

impl Proposal {
    pub fn is_still(&self) -> bool {
        self.dx == 0.0 && self.dy == 0.0
    }
}

/// Three-way comparison as -1 / 0 / +1.
fn compare(a: f64, b: f64) -> f64 {
    match a.partial_cmp(&b) {
        Some(Ordering::Greater) => 1.0,
        Some(Ordering::Less) => -1.0,
        _ => 0.0,
    }
}

/// Sign-vector step from `from` towards `to`, unit length, scaled by `speed`.
pub fn pursuit_step(from: (f64, f64), to: (f64, f64), speed: f64) -> (f64, f64) {
    let mut dx = compare(to.0, from.0);
    let mut dy = compare(to.1, from.1);
    if dx != 0.0 && dy != 0.0 {
        let len = dx.hypot(dy);
        dx /= len;
        dy /= len;
    }
    (dx * speed, dy * speed)
}

/// Dominant-axis facing. Diagonal ties face horizontally; no movement keeps `current`.
pub fn facing_for(dx: f64, dy: f64, current: Direction) -> Direction {
    if dx != 0.0 && dx.abs() >= dy.abs() {
        if dx > 0.0 { Direction::Right } else { Direction::Left }
    } else if dy != 0.0 {
        if dy > 0.0 { Direction::Down } else { Direction::Up }
    } else {
        current
    }
}

pub fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - b.0).hypot(a.1 - b.1)
}

/// Decide this tick's movement for an enemy. Advances patrol state.
pub fn propose(actor: &mut Actor, player: (f64, f64), rules: &Rules) -> Proposal {
    let here = (actor.x, actor.y);
    let current = actor.facing;
    let speed = actor.speed;

    let (dx, dy) = match &mut actor.intent {
        Intent::PlayerControlled => (0.0, 0.0),
        Intent::DirectPursuit => pursuit_step(here, player, speed),
        Intent::PatrolDetect(patrol) => {
            if distance(here, player) < rules.detection_range {
                pursuit_step(here, player, speed)
            } else {
                if patrol.phase_ticks >= rules.patrol_interval_ticks {
                    patrol.phase = (patrol.phase + 1) % PATROL_ROUTE.len();
                    patrol.phase_ticks = 0;
                }
                patrol.phase_ticks += 1;
                let (ux, uy) = patrol.direction().unit();
                (ux * speed, uy * speed)
            }
        }
    };

    Proposal { dx, dy, facing: facing_for(dx, dy, current) }
}

/// Attack if the player is in range and the cooldown allows it.
/// The first attack is allowed immediately.
pub fn try_attack(clock: &mut CombatClock, distance: f64, now: u64, rules: &Rules) -> bool {
    if distance >= rules.attack_range { return false; }
    if let Some(last) = clock.last_attack {
        if now.saturating_sub(last) < rules.attack_cooldown_ticks { return false; }
    }
    clock.last_attack = Some(now);
    clock.attacking_until = now + rules.attack_anim_ticks;
    true
}

/// Has a dying actor waited out its death interval?
pub fn death_complete(life: Life, now: u64, death_ticks: u64) -> bool {
    match life {
        Life::Dying { since } => now.saturating_sub(since) >= death_ticks,
        _ => false,
    }
}
