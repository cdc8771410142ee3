/// Tile types and the tile grid.
/// Properties are queried via methods, not stored as flags,
/// so tile semantics are centralized here.

/// Edge length of one tile in world pixels.
pub const TILE_SIZE: f64 = 64.0;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Tile {
    Grass,  // open ground
    Wall,   // blocks movement
    Stone,  // decorative path, open
}

impl Tile {
    /// Does this tile stop actors from entering it?
    pub fn blocks_movement(self) -> bool {
        matches!(self, Tile::Wall)
    }

    /// Map-file code → tile. Unknown codes are rejected by the loader.
    pub fn from_code(code: u32) -> Option<Tile> {
        match code {
            1 => Some(Tile::Grass),
            2 => Some(Tile::Wall),
            3 => Some(Tile::Stone),
            _ => None,
        }
    }
}

impl Default for Tile {
    fn default() -> Self {
        Tile::Grass
    }
}

/// Pixel coordinate → tile index (floor division, so negatives land outside the map).
pub fn pixel_to_tile(px: f64) -> i64 {
    (px / TILE_SIZE).floor() as i64
}

/// Tile index → pixel coordinate of its top-left corner.
pub fn tile_to_pixel(t: i64) -> f64 {
    t as f64 * TILE_SIZE
}

/// Fixed-size grid of tiles, row-major. Dimensions never change after
/// construction; a level transition replaces the whole grid.
#[derive(Clone, Debug)]
pub struct TileGrid {
    width: usize,
    height: usize,
    tiles: Vec<Tile>,
}

impl TileGrid {
    /// Build from rows. Callers guarantee the rows are rectangular
    /// (the map loader validates this before getting here).
    pub fn from_rows(rows: Vec<Vec<Tile>>) -> Self {
        let height = rows.len();
        let width = rows.first().map_or(0, |r| r.len());
        let tiles = rows.into_iter().flatten().collect();
        TileGrid { width, height, tiles }
    }

    /// A `width` x `height` grid filled with one tile.
    #[cfg(test)]
    pub fn filled(width: usize, height: usize, tile: Tile) -> Self {
        TileGrid { width, height, tiles: vec![tile; width * height] }
    }

    /// Width in tiles.
    pub fn width(&self) -> usize { self.width }

    /// Height in tiles.
    pub fn height(&self) -> usize { self.height }

    pub fn pixel_width(&self) -> f64 { tile_to_pixel(self.width as i64) }

    pub fn pixel_height(&self) -> f64 { tile_to_pixel(self.height as i64) }

    /// Tile at a tile coordinate. Out of bounds yields the default open tile,
    /// since box-corner and camera math routinely look one cell past the edge.
    pub fn tile_at(&self, tx: i64, ty: i64) -> Tile {
        if tx < 0 || ty < 0 || tx as usize >= self.width || ty as usize >= self.height {
            return Tile::default();
        }
        self.tiles[ty as usize * self.width + tx as usize]
    }

    pub fn blocks_movement_at(&self, tx: i64, ty: i64) -> bool {
        self.tile_at(tx, ty).blocks_movement()
    }

    #[cfg(test)]
    pub fn set(&mut self, tx: usize, ty: usize, tile: Tile) {
        if tx < self.width && ty < self.height {
            self.tiles[ty * self.width + tx] = tile;
        }
    }
}

impl Default for TileGrid {
    fn default() -> Self {
        TileGrid { width: 0, height: 0, tiles: Vec::new() }
    }
}
