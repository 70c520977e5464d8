/// Shadow map: which shadow sprites to overlay on each tile.
///
/// Derived once from tile topology and immutable afterwards. A tile can
/// receive shadows from:
///   - its south (and failing that, south-west) neighbour on the same level,
///     drawn as a dark side face;
///   - the level-0 tile south of it, for level-1 tiles only;
///   - any of the eight cells around it on the level above, unless the
///     tile itself is covered from above.
///
/// Diagonal shadows from the level above need at least one orthogonal
/// neighbour on that level to lean on, otherwise a lone corner shadow
/// would float over open ground.

use super::tile::TileMap;

/// Number of shadow slots per tile.
pub const SHADOW_SLOTS: usize = 10;

/// Shadow slots, in the order of the shadow asset key list.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ShadowDir {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
    SideSouth,
    SideSouthWest,
}

impl ShadowDir {
    pub const ALL: [ShadowDir; SHADOW_SLOTS] = [
        ShadowDir::North,
        ShadowDir::NorthEast,
        ShadowDir::East,
        ShadowDir::SouthEast,
        ShadowDir::South,
        ShadowDir::SouthWest,
        ShadowDir::West,
        ShadowDir::NorthWest,
        ShadowDir::SideSouth,
        ShadowDir::SideSouthWest,
    ];

    /// Row/column step toward the casting cell on the level above.
    /// Side shadows come from the same level and have no step.
    pub fn offset(self) -> Option<(i32, i32)> {
        match self {
            ShadowDir::North => Some((-1, 0)),
            ShadowDir::NorthEast => Some((-1, 1)),
            ShadowDir::East => Some((0, 1)),
            ShadowDir::SouthEast => Some((1, 1)),
            ShadowDir::South => Some((1, 0)),
            ShadowDir::SouthWest => Some((1, -1)),
            ShadowDir::West => Some((0, -1)),
            ShadowDir::NorthWest => Some((-1, -1)),
            ShadowDir::SideSouth | ShadowDir::SideSouthWest => None,
        }
    }

    pub fn slot(self) -> usize {
        self as usize
    }
}

pub type ShadowFlags = [bool; SHADOW_SLOTS];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShadowMap {
    num_cols: usize,
    num_rows: usize,
    /// `levels[level][row * num_cols + col]`; `None` means nothing to draw.
    levels: Vec<Vec<Option<ShadowFlags>>>,
}

impl ShadowMap {
    /// Shadow flags at a cell, `None` when it has none or lies outside.
    pub fn at(&self, level: usize, row: i32, col: i32) -> Option<&ShadowFlags> {
        if row < 0 || col < 0 || row as usize >= self.num_rows || col as usize >= self.num_cols {
            return None;
        }
        self.levels
            .get(level)
            .and_then(|cells| cells[row as usize * self.num_cols + col as usize].as_ref())
    }

    /// Number of cells carrying at least one shadow.
    pub fn shaded_cells(&self) -> usize {
        self.levels.iter().flatten().filter(|c| c.is_some()).count()
    }
}

/// Derive shadows for every tile whose code is at or above `threshold`.
/// Pure: the same map always yields the same shadow map.
pub fn create_shadow_map(map: &TileMap, threshold: char) -> ShadowMap {
    let (rows, cols) = (map.num_rows(), map.num_cols());
    let mut levels = Vec::with_capacity(map.num_levels());

    for level in 0..map.num_levels() {
        let mut cells = Vec::with_capacity(rows * cols);
        for row in 0..rows as i32 {
            for col in 0..cols as i32 {
                cells.push(shadow_flags(map, threshold, level, row, col));
            }
        }
        levels.push(cells);
    }

    ShadowMap { num_cols: cols, num_rows: rows, levels }
}

fn shadow_flags(map: &TileMap, threshold: char, level: usize, row: i32, col: i32) -> Option<ShadowFlags> {
    match map.tile_at(level, row, col) {
        Some(code) if map.is_solid(level, row, col) && code >= threshold => {}
        _ => return None,
    }

    let mut flags = [false; SHADOW_SLOTS];

    let south = map.is_solid(level, row + 1, col);
    flags[ShadowDir::SideSouth.slot()] = south;
    flags[ShadowDir::SideSouthWest.slot()] = !south && map.is_solid(level, row + 1, col - 1);

    if level == 1 && map.is_solid(0, row + 1, col) {
        flags[ShadowDir::SideSouth.slot()] = true;
    }

    let above = level + 1;
    if above < map.num_levels() && !map.is_solid(above, row, col) {
        for dir in ShadowDir::ALL {
            let Some((dr, dc)) = dir.offset() else { continue };
            if !map.is_solid(above, row + dr, col + dc) {
                continue;
            }
            let diagonal = dr != 0 && dc != 0;
            if diagonal && !map.is_solid(above, row + dr, col) && !map.is_solid(above, row, col + dc) {
                continue;
            }
            flags[dir.slot()] = true;
        }
    }

    if flags.iter().any(|&f| f) {
        Some(flags)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(levels: &[&str], cols: usize) -> TileMap {
        TileMap::new(levels, cols).unwrap()
    }

    fn has(shadows: &ShadowMap, level: usize, row: i32, col: i32, dir: ShadowDir) -> bool {
        shadows.at(level, row, col).map_or(false, |f| f[dir.slot()])
    }

    #[test]
    fn isolated_tile_has_no_shadow_data() {
        let m = map(&["... .G. ..."], 3);
        let s = create_shadow_map(&m, 'C');
        assert_eq!(s.at(0, 1, 1), None);
        assert_eq!(s.shaded_cells(), 0);
    }

    #[test]
    fn south_neighbour_casts_side_shadow() {
        let m = map(&["G. G."], 2);
        let s = create_shadow_map(&m, 'C');
        assert!(has(&s, 0, 0, 0, ShadowDir::SideSouth));
        assert!(!has(&s, 0, 0, 0, ShadowDir::SideSouthWest));
    }

    #[test]
    fn south_west_only_without_south() {
        let m = map(&[".G G."], 2);
        let s = create_shadow_map(&m, 'C');
        assert!(!has(&s, 0, 0, 1, ShadowDir::SideSouth));
        assert!(has(&s, 0, 0, 1, ShadowDir::SideSouthWest));
    }

    #[test]
    fn tiles_below_threshold_never_shade() {
        let m = map(&["B. B."], 2);
        let s = create_shadow_map(&m, 'C');
        assert_eq!(s.at(0, 0, 0), None);
    }

    #[test]
    fn level_one_picks_up_ground_tile_to_the_south() {
        let m = map(&[".. G.", "M. .."], 2);
        let s = create_shadow_map(&m, 'C');
        assert!(has(&s, 1, 0, 0, ShadowDir::SideSouth));
    }

    #[test]
    fn upper_level_casts_orthogonal_shadow() {
        let m = map(&["GG GG", "M. .."], 2);
        let s = create_shadow_map(&m, 'C');
        // (0,1) has M to its west on the level above
        assert!(has(&s, 0, 0, 1, ShadowDir::West));
        // (1,0) has M to its north
        assert!(has(&s, 0, 1, 0, ShadowDir::North));
        // covered tile receives nothing from above
        assert!(!has(&s, 0, 0, 0, ShadowDir::North));
    }

    #[test]
    fn lone_diagonal_is_suppressed() {
        let m = map(&["GG GG", "M. .."], 2);
        let s = create_shadow_map(&m, 'C');
        // (1,1) sees M only diagonally (north-west), with both orthogonals empty
        assert!(!has(&s, 0, 1, 1, ShadowDir::NorthWest));
    }

    #[test]
    fn supported_diagonal_is_kept() {
        let m = map(&["GG GG", "MM .."], 2);
        let s = create_shadow_map(&m, 'C');
        // (1,1): north is M, north-west is M with the north orthogonal present
        assert!(has(&s, 0, 1, 1, ShadowDir::North));
        assert!(has(&s, 0, 1, 1, ShadowDir::NorthWest));
    }

    #[test]
    fn creation_is_deterministic() {
        let m = map(&["GGGG GGGG GGGG", "M..M .MM. ...."], 4);
        assert_eq!(create_shadow_map(&m, 'C'), create_shadow_map(&m, 'C'));
    }
}
