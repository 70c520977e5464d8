/// Render-order index: (level, row) → entity ids, in draw order.
///
/// Entities are filed under the level *above* the one they stand on and
/// under the row of their hit-rectangle bottom. Drawing each row's
/// entities right after that row's tiles on the filing level makes walls
/// further south cover them, and walls further north sit behind them.
///
/// Invariants:
///   - every live entity is in exactly one bucket;
///   - empty buckets are removed immediately, so iteration only visits
///     occupied rows.
///
/// Within a bucket the player is appended (drawn last, on top) and
/// enemies are pushed to the front.

use std::collections::{BTreeMap, VecDeque};

use super::entity::EntityId;

#[derive(Clone, Debug, Default)]
pub struct EntityIndex {
    buckets: BTreeMap<(usize, i32), VecDeque<EntityId>>,
}

impl EntityIndex {
    pub fn new() -> Self {
        EntityIndex::default()
    }

    /// File `id` under `(level, row)`.
    pub fn insert(&mut self, level: usize, row: i32, id: EntityId) {
        let bucket = self.buckets.entry((level, row)).or_default();
        if id.is_player() {
            bucket.push_back(id);
        } else {
            bucket.push_front(id);
        }
    }

    /// Remove `id` from `(level, row)`. Returns false if it was not there.
    pub fn remove(&mut self, level: usize, row: i32, id: EntityId) -> bool {
        let Some(bucket) = self.buckets.get_mut(&(level, row)) else {
            return false;
        };
        let Some(pos) = bucket.iter().position(|&e| e == id) else {
            return false;
        };
        bucket.remove(pos);
        if bucket.is_empty() {
            self.buckets.remove(&(level, row));
        }
        true
    }

    /// Move `id` from `old_row` to `new_row` on the same filing level.
    pub fn relocate(&mut self, level: usize, old_row: i32, new_row: i32, id: EntityId) {
        self.remove(level, old_row, id);
        self.insert(level, new_row, id);
    }

    /// Ids filed under `(level, row)`, in draw order.
    pub fn bucket(&self, level: usize, row: i32) -> impl Iterator<Item = EntityId> + '_ {
        self.buckets.get(&(level, row)).into_iter().flatten().copied()
    }

    /// Occupied rows of one level, ascending.
    pub fn rows(&self, level: usize) -> impl Iterator<Item = i32> + '_ {
        self.buckets
            .range((level, i32::MIN)..=(level, i32::MAX))
            .map(|(&(_, row), _)| row)
    }

    /// Every bucket holding `id`, as `(level, row)`.
    #[cfg(test)]
    pub fn locate(&self, id: EntityId) -> Vec<(usize, i32)> {
        self.buckets
            .iter()
            .filter(|(_, ids)| ids.contains(&id))
            .map(|(&key, _)| key)
            .collect()
    }

    pub fn highest_level(&self) -> Option<usize> {
        self.buckets.keys().next_back().map(|&(level, _)| level)
    }

    #[cfg(test)]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}
