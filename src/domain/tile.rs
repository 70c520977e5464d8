/// Layered tile map.
///
/// A map is an ordered stack of levels. Each level is a flat, row-major
/// string of tile codes with the same column count; `.` is empty and any
/// other code is solid. Level 0 is the ground, higher indices are drawn
/// raised by `LEVEL_OFFSET` pixels per level.
///
/// Tile semantics are queried via methods so they stay centralized here.

use thiserror::Error;

/// Map-space size of one tile.
pub const TILE_WIDTH: f64 = 101.0;
pub const TILE_HEIGHT: f64 = 83.0;

/// Empty space between the top of a tile sprite and its top face.
pub const TILE_TOP_GAP: f64 = 50.0;

/// Vertical shift applied per level when drawing.
pub const LEVEL_OFFSET: f64 = 37.0;

/// The empty code. Everything else blocks movement from the level below.
pub const EMPTY: char = '.';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    #[error("map has no levels")]
    NoLevels,
    #[error("column count must be positive")]
    ZeroColumns,
    #[error("level {level} has {len} tiles, not a multiple of {cols} columns")]
    RaggedLevel { level: usize, len: usize, cols: usize },
    #[error("level {level} has {actual} tiles, expected {expected}")]
    LevelSizeMismatch { level: usize, expected: usize, actual: usize },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileMap {
    levels: Vec<Vec<char>>,
    num_cols: usize,
    num_rows: usize,
}

impl TileMap {
    /// Build a map from raw level strings. Whitespace is insignificant and
    /// stripped, so levels may be written one row per source line.
    pub fn new<S: AsRef<str>>(levels: &[S], num_cols: usize) -> Result<Self, MapError> {
        if levels.is_empty() {
            return Err(MapError::NoLevels);
        }
        if num_cols == 0 {
            return Err(MapError::ZeroColumns);
        }

        let stripped: Vec<Vec<char>> = levels
            .iter()
            .map(|l| l.as_ref().chars().filter(|c| !c.is_whitespace()).collect())
            .collect();

        let expected = stripped[0].len();
        for (level, tiles) in stripped.iter().enumerate() {
            if tiles.len() % num_cols != 0 {
                return Err(MapError::RaggedLevel { level, len: tiles.len(), cols: num_cols });
            }
            if tiles.len() != expected {
                return Err(MapError::LevelSizeMismatch { level, expected, actual: tiles.len() });
            }
        }

        Ok(TileMap {
            num_rows: expected / num_cols,
            levels: stripped,
            num_cols,
        })
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn num_cols(&self) -> usize {
        self.num_cols
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Map size in map pixels.
    pub fn pixel_width(&self) -> f64 {
        self.num_cols as f64 * TILE_WIDTH
    }

    pub fn pixel_height(&self) -> f64 {
        self.num_rows as f64 * TILE_HEIGHT
    }

    /// Tile code at a cell, or `None` outside the map.
    #[inline]
    pub fn tile_at(&self, level: usize, row: i32, col: i32) -> Option<char> {
        if row < 0 || col < 0 {
            return None;
        }
        let (row, col) = (row as usize, col as usize);
        if row >= self.num_rows || col >= self.num_cols {
            return None;
        }
        self.levels.get(level).map(|tiles| tiles[row * self.num_cols + col])
    }

    /// Does the cell hold a tile? Out of bounds is empty.
    #[inline]
    pub fn is_solid(&self, level: usize, row: i32, col: i32) -> bool {
        matches!(self.tile_at(level, row, col), Some(c) if c != EMPTY)
    }

    /// Does the cell block an entity moving on the level below?
    /// Anything outside the map is a wall.
    #[inline]
    pub fn blocks(&self, level: usize, row: i32, col: i32) -> bool {
        self.tile_at(level, row, col).map_or(true, |c| c != EMPTY)
    }

    /// All empty cells of a level as `(row, col)`, in row-major order.
    pub fn empty_cells(&self, level: usize) -> Vec<(i32, i32)> {
        let Some(tiles) = self.levels.get(level) else {
            return vec![];
        };
        tiles
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c == EMPTY)
            .map(|(i, _)| ((i / self.num_cols) as i32, (i % self.num_cols) as i32))
            .collect()
    }

    /// Every distinct tile code used by the map.
    #[cfg(test)]
    pub fn codes(&self) -> Vec<char> {
        let mut codes: Vec<char> = self.levels.iter().flatten().copied().filter(|&c| c != EMPTY).collect();
        codes.sort_unstable();
        codes.dedup();
        codes
    }
}

/// Tile column containing a map x coordinate.
#[inline]
pub fn col_of(x: f64) -> i32 {
    (x / TILE_WIDTH).floor() as i32
}

/// Tile row containing a map y coordinate.
#[inline]
pub fn row_of(y: f64) -> i32 {
    (y / TILE_HEIGHT).floor() as i32
}
