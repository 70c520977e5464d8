/// GameContext: everything one play session owns.
///
/// Built fresh at the end of the menu fade-in and dropped when the session
/// returns to the menu. Nothing outlives a session.
///
/// ## Layers
///
/// Entities stand on `ENTITY_LEVEL` and collide with the layer above it,
/// which is also where spawn points and items live (`SPAWN_LEVEL`).
///
/// ## Camera / Viewport
///
/// `viewport` maps map pixels to canvas pixels. It is recomputed whenever
/// the player moves or the canvas is resized.

use rand::seq::SliceRandom;
use rand::Rng;
use std::f64::consts::PI;
use tracing::info;

use crate::config::RulesConfig;
use crate::domain::entity::{Entity, EntityId};
use crate::domain::item::ItemMap;
use crate::domain::render_index::EntityIndex;
use crate::domain::shadow::{create_shadow_map, ShadowMap};
use crate::domain::tile::{MapError, TileMap, TILE_HEIGHT, TILE_WIDTH};
use crate::domain::viewport::Viewport;
use super::level::{item_codes, LevelDef};

pub const ENTITY_LEVEL: usize = 0;
pub const SPAWN_LEVEL: usize = ENTITY_LEVEL + 1;

/// Enemy speed range, map pixels per second.
const ENEMY_MIN_SPEED: f64 = 150.0;
const ENEMY_SPEED_SPREAD: f64 = 100.0;

pub struct GameContext {
    pub map: TileMap,
    pub shadows: ShadowMap,
    pub items: ItemMap,
    pub player: Entity,
    pub enemies: Vec<Entity>,
    pub index: EntityIndex,
    pub viewport: Viewport,
    pub canvas_w: f64,
    pub canvas_h: f64,
    /// Wall-clock second play started; set when the session goes live.
    pub started_at: f64,
    /// The tense cue fires once per session.
    pub tense_started: bool,
}

impl GameContext {
    /// Build the map and shadows, scatter items, deploy the player and
    /// enemies on free spawn cells, and file everyone for rendering.
    pub fn new<R: Rng>(
        def: &LevelDef,
        rules: &RulesConfig,
        canvas: (f64, f64),
        rng: &mut R,
    ) -> Result<Self, MapError> {
        let map = def.build_map()?;
        let shadows = create_shadow_map(&map, def.shadow_threshold);
        let items = ItemMap::place_random(&map, SPAWN_LEVEL, rules.item_count, &item_codes(), rng);

        let cells = spawn_cells(&map);

        let (row, col) = cells.choose(rng).copied().unwrap_or((0, 0));
        let mut player = Entity::player(cell_center_x(col), cell_center_y(row));
        player.level = ENTITY_LEVEL;

        let count = if rules.max_enemies > rules.min_enemies {
            rng.gen_range(rules.min_enemies..rules.max_enemies)
        } else {
            rules.min_enemies
        };
        let mut enemies = Vec::with_capacity(count);
        if !cells.is_empty() {
            for id in 0..count as u32 {
                let (row, col) = cells[rng.gen_range(0..cells.len())];
                let speed = ENEMY_MIN_SPEED + ENEMY_SPEED_SPREAD * rng.gen::<f64>();
                let angle = rng.gen::<f64>() * PI * 2.0;
                let mut enemy = Entity::enemy(
                    id,
                    cell_center_x(col),
                    cell_center_y(row),
                    angle.cos() * speed,
                    angle.sin() * speed,
                );
                enemy.level = ENTITY_LEVEL;
                enemies.push(enemy);
            }
        }

        let mut index = EntityIndex::new();
        let (level, row) = player.render_key();
        index.insert(level, row, player.id);
        for enemy in &enemies {
            let (level, row) = enemy.render_key();
            index.insert(level, row, enemy.id);
        }

        info!(
            map = %def.name,
            items = items.len(),
            enemies = enemies.len(),
            shaded = shadows.shaded_cells(),
            "session reset"
        );

        let mut ctx = GameContext {
            map,
            shadows,
            items,
            player,
            enemies,
            index,
            viewport: Viewport::default(),
            canvas_w: canvas.0,
            canvas_h: canvas.1,
            started_at: 0.0,
            tense_started: false,
        };
        ctx.refresh_viewport();
        Ok(ctx)
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        if id.is_player() {
            return Some(&self.player);
        }
        // ids are assigned in spawn order
        self.enemies
            .get(id.0 as usize)
            .filter(|e| e.id == id)
            .or_else(|| self.enemies.iter().find(|e| e.id == id))
    }

    pub fn refresh_viewport(&mut self) {
        self.viewport = Viewport::compute(&self.player, &self.map, self.canvas_w, self.canvas_h);
    }

    pub fn set_canvas(&mut self, width: f64, height: f64) {
        self.canvas_w = width;
        self.canvas_h = height;
        self.refresh_viewport();
    }

    /// Session seconds left, counting earned bonus time.
    pub fn remaining(&self, now: f64, time_limit: f64) -> f64 {
        let bonus = self.player.player_state().map_or(0.0, |p| p.time_bonus);
        time_limit - (now - self.started_at - bonus)
    }
}

/// Free cells of the spawn layer; every cell when the layer is full or
/// missing, so a session can always start.
fn spawn_cells(map: &TileMap) -> Vec<(i32, i32)> {
    let free = map.empty_cells(SPAWN_LEVEL);
    if !free.is_empty() {
        return free;
    }
    (0..map.num_rows() as i32)
        .flat_map(|row| (0..map.num_cols() as i32).map(move |col| (row, col)))
        .collect()
}

fn cell_center_x(col: i32) -> f64 {
    (col as f64 + 0.5) * TILE_WIDTH
}

fn cell_center_y(row: i32) -> f64 {
    (row as f64 + 0.5) * TILE_HEIGHT
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn context(seed: u64) -> GameContext {
        let cfg = GameConfig::default();
        let mut rng = StdRng::seed_from_u64(seed);
        GameContext::new(&LevelDef::builtin(), &cfg.rules, (505.0, 606.0), &mut rng).unwrap()
    }

    #[test]
    fn player_spawns_centred_on_a_free_cell() {
        let ctx = context(3);
        let col = (ctx.player.center_x() / TILE_WIDTH).floor() as i32;
        let row = (ctx.player.center_y() / TILE_HEIGHT).floor() as i32;
        assert_eq!(ctx.map.tile_at(SPAWN_LEVEL, row, col), Some('.'));
        assert_eq!(ctx.player.center_x(), cell_center_x(col));
        assert_eq!(ctx.player.level, ENTITY_LEVEL);
    }

    #[test]
    fn enemy_count_is_in_range() {
        let rules = GameConfig::default().rules;
        for seed in 0..10 {
            let ctx = context(seed);
            assert!(ctx.enemies.len() >= rules.min_enemies);
            assert!(ctx.enemies.len() < rules.max_enemies);
            for e in &ctx.enemies {
                let speed = e.vx.hypot(e.vy);
                assert!((ENEMY_MIN_SPEED - 1e-9..ENEMY_MIN_SPEED + ENEMY_SPEED_SPREAD).contains(&speed));
            }
        }
    }

    #[test]
    fn items_sit_on_free_spawn_cells() {
        let ctx = context(11);
        assert_eq!(ctx.items.len(), GameConfig::default().rules.item_count);
        for row in 0..ctx.map.num_rows() as i32 {
            for (col, code) in ctx.items.row(SPAWN_LEVEL, row) {
                assert_eq!(ctx.map.tile_at(SPAWN_LEVEL, row, col), Some('.'));
                assert!(item_codes().contains(&code));
            }
        }
    }

    #[test]
    fn every_entity_is_filed_once() {
        let ctx = context(5);
        let all = std::iter::once(&ctx.player).chain(ctx.enemies.iter());
        for e in all {
            assert_eq!(ctx.index.locate(e.id), vec![e.render_key()]);
        }
    }

    #[test]
    fn entity_lookup_by_id() {
        let ctx = context(8);
        assert_eq!(ctx.entity(EntityId::PLAYER).map(|e| e.id), Some(EntityId::PLAYER));
        assert_eq!(ctx.entity(EntityId(2)).map(|e| e.id), Some(EntityId(2)));
        assert!(ctx.entity(EntityId(10_000)).is_none());
    }

    #[test]
    fn same_seed_same_session() {
        let a = context(42);
        let b = context(42);
        assert_eq!(a.player, b.player);
        assert_eq!(a.enemies, b.enemies);
        assert_eq!(a.items, b.items);
    }

    #[test]
    fn remaining_time_counts_bonus() {
        let mut ctx = context(1);
        ctx.started_at = 100.0;
        assert_eq!(ctx.remaining(130.0, 60.0), 30.0);
        if let Some(p) = ctx.player.player_state_mut() {
            p.time_bonus = 4.0;
        }
        assert_eq!(ctx.remaining(130.0, 60.0), 34.0);
    }
}
