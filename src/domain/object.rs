/// Static obstacles: chests, doors, trees.
///
/// Obstacles never move. Their `solid` flag is the only thing collision
/// looks at, and it can change over time (an opened door stops blocking).

use super::collision::Rect;
use super::entity::SpriteSize;
use super::inventory::ItemStack;

#[derive(Clone, Debug, PartialEq)]
pub enum ObstacleKind {
    Chest {
        opened: bool,
        contents: Vec<ItemStack>,
    },
    Door {
        opened: bool,
        /// Tick of the last accepted interaction.
        last_interaction: Option<u64>,
    },
    Tree,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Obstacle {
    pub x: f64,
    pub y: f64,
    pub size: SpriteSize,
    pub solid: bool,
    pub kind: ObstacleKind,
}

impl Obstacle {
    /// Chests stay solid even after they are opened.
    pub fn chest(x: f64, y: f64, size: SpriteSize, contents: Vec<ItemStack>) -> Self {
        Obstacle {
            x, y, size,
            solid: true,
            kind: ObstacleKind::Chest { opened: false, contents },
        }
    }

    pub fn door(x: f64, y: f64, size: SpriteSize) -> Self {
        Obstacle {
            x, y, size,
            solid: true,
            kind: ObstacleKind::Door { opened: false, last_interaction: None },
        }
    }

    pub fn tree(x: f64, y: f64, size: SpriteSize) -> Self {
        Obstacle { x, y, size, solid: true, kind: ObstacleKind::Tree }
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.size.w, self.size.h)
    }

    /// Chest reach test: within `reach` on both axes (top-left to top-left).
    pub fn within_box_reach(&self, px: f64, py: f64, reach: f64) -> bool {
        (px - self.x).abs() <= reach && (py - self.y).abs() <= reach
    }

    /// Door reach test: Euclidean distance strictly below `reach`.
    pub fn within_radius(&self, px: f64, py: f64, reach: f64) -> bool {
        (px - self.x).hypot(py - self.y) < reach
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::inventory::Item;

    #[test]
    fn constructors_start_solid_and_closed() {
        let size = SpriteSize::new(48.0, 48.0);
        let c = Obstacle::chest(0.0, 0.0, size, vec![ItemStack::new(Item::Key, 1)]);
        assert!(c.solid);
        assert!(matches!(c.kind, ObstacleKind::Chest { opened: false, .. }));
        let d = Obstacle::door(0.0, 0.0, size);
        assert!(matches!(d.kind, ObstacleKind::Door { opened: false, last_interaction: None }));
        assert!(Obstacle::tree(0.0, 0.0, size).solid);
    }

    #[test]
    fn reach_tests() {
        let o = Obstacle::door(100.0, 100.0, SpriteSize::new(64.0, 64.0));
        // Box reach is inclusive on each axis.
        assert!(o.within_box_reach(164.0, 36.0, 64.0));
        assert!(!o.within_box_reach(164.1, 100.0, 64.0));
        // Radius is strict and diagonal-aware.
        assert!(o.within_radius(140.0, 140.0, 64.0));
        assert!(!o.within_radius(164.0, 100.0, 64.0));
        assert!(!o.within_radius(150.0, 150.0, 64.0));
    }

    #[test]
    fn bounds_follow_size() {
        let o = Obstacle::chest(5.0, 6.0, SpriteSize::new(10.0, 20.0), vec![]);
        assert_eq!(o.bounds(), Rect::new(5.0, 6.0, 10.0, 20.0));
    }
}
