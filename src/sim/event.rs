/// Events emitted during a simulation step.
/// The presentation layer consumes these for status messages.

use crate::domain::inventory::Item;
use super::level::LevelId;

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    ChestOpened { x: f64, y: f64 },
    DoorOpened { x: f64, y: f64 },
    DoorLocked,
    FinalDoor,
    LevelChanged { level: LevelId },
    ItemUsed { item: Item },
    EnemyHit { id: u32, health: i32 },
    EnemyDied { id: u32 },
    EnemyRemoved { id: u32 },
    PlayerHit { by: u32, health: i32 },
    PlayerDefeated,
}
