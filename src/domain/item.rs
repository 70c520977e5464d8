/// Collectible placement, keyed by (level, row, col).
///
/// Sparse: only occupied cells are stored. Items are placed once per
/// session and removed as the player collects them.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::Rng;

use super::tile::TileMap;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ItemMap {
    cells: BTreeMap<(usize, i32, i32), char>,
}

impl ItemMap {
    pub fn new() -> Self {
        ItemMap::default()
    }

    /// Scatter `count` items over distinct empty cells of `level`.
    /// Each item's code is drawn uniformly from `codes`. Fewer items are
    /// placed when the level runs out of room.
    pub fn place_random<R: Rng>(
        map: &TileMap,
        level: usize,
        count: usize,
        codes: &[char],
        rng: &mut R,
    ) -> Self {
        let mut items = ItemMap::new();
        if codes.is_empty() {
            return items;
        }
        let mut free = map.empty_cells(level);
        free.shuffle(rng);
        for &(row, col) in free.iter().take(count) {
            let code = codes[rng.gen_range(0..codes.len())];
            items.insert(level, row, col, code);
        }
        items
    }

    pub fn insert(&mut self, level: usize, row: i32, col: i32, code: char) {
        self.cells.insert((level, row, col), code);
    }

    #[cfg(test)]
    pub fn get(&self, level: usize, row: i32, col: i32) -> Option<char> {
        self.cells.get(&(level, row, col)).copied()
    }

    pub fn contains(&self, level: usize, row: i32, col: i32) -> bool {
        self.cells.contains_key(&(level, row, col))
    }

    /// Remove and return the item at a cell.
    pub fn consume(&mut self, level: usize, row: i32, col: i32) -> Option<char> {
        self.cells.remove(&(level, row, col))
    }

    /// Items of one row, ordered by column.
    pub fn row(&self, level: usize, row: i32) -> impl Iterator<Item = (i32, char)> + '_ {
        self.cells
            .range((level, row, i32::MIN)..=(level, row, i32::MAX))
            .map(|(&(_, _, col), &code)| (col, code))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn consume_removes_the_cell() {
        let mut items = ItemMap::new();
        items.insert(1, 2, 3, '1');
        assert_eq!(items.consume(1, 2, 3), Some('1'));
        assert!(!items.contains(1, 2, 3));
        assert_eq!(items.consume(1, 2, 3), None);
    }

    #[test]
    fn row_iterates_in_column_order() {
        let mut items = ItemMap::new();
        items.insert(1, 4, 7, '2');
        items.insert(1, 4, 2, '1');
        items.insert(1, 5, 0, '3');
        items.insert(0, 4, 1, '3');
        let row: Vec<_> = items.row(1, 4).collect();
        assert_eq!(row, vec![(2, '1'), (7, '2')]);
    }

    #[test]
    fn random_placement_uses_distinct_empty_cells() {
        let map = TileMap::new(&["...... ......", "M..M.. ..M..M"], 6).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let items = ItemMap::place_random(&map, 1, 5, &['1', '2'], &mut rng);
        assert_eq!(items.len(), 5);
        for (&(level, row, col), code) in &items.cells {
            assert_eq!(level, 1);
            assert_eq!(map.tile_at(1, row, col), Some('.'));
            assert!(matches!(*code, '1' | '2'));
        }
    }

    #[test]
    fn placement_stops_when_level_is_full() {
        let map = TileMap::new(&["...", "M.M"], 3).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let items = ItemMap::place_random(&map, 1, 10, &['1'], &mut rng);
        assert_eq!(items.len(), 1);
        assert_eq!(items.get(1, 0, 1), Some('1'));
    }
}
