/// The step function: advances a live session by one tick.
///
/// Processing order:
///   1. Damage expiry
///   2. Enemies: player contact (knock-back + damage), then movement
///   3. Player: item pickup, then movement
///   4. Viewport follow (only if the player moved)
///
/// Contact and pickup run before each entity moves, against positions
/// from the end of the previous tick.

use tracing::debug;

use crate::config::RulesConfig;
use super::event::GameEvent;
use super::world::GameContext;

/// Share of an enemy's per-tick displacement passed on to the player.
const KNOCKBACK_TRANSFER: f64 = 10.0;

#[derive(Debug, Default)]
pub struct StepResult {
    pub events: Vec<GameEvent>,
    /// Any entity was in motion this tick.
    pub moved: bool,
}

pub fn step(ctx: &mut GameContext, rules: &RulesConfig, now: f64, dt: f64) -> StepResult {
    let mut result = StepResult::default();

    ctx.player.expire_damage(now);

    resolve_enemies(ctx, rules, now, dt, &mut result);
    resolve_player(ctx, rules, dt, &mut result);

    result
}

fn resolve_enemies(ctx: &mut GameContext, rules: &RulesConfig, now: f64, dt: f64, result: &mut StepResult) {
    for enemy in ctx.enemies.iter_mut() {
        if enemy.check_collision(&ctx.player) {
            ctx.player.push(
                enemy.vx * dt * KNOCKBACK_TRANSFER,
                enemy.vy * dt * KNOCKBACK_TRANSFER,
            );
            if ctx.player.take_damage(now, rules.damage_amount, rules.damage_cooldown_secs) {
                let life = ctx.player.player_state().map_or(0, |p| p.life);
                debug!(enemy = enemy.id.0, life, "player hit");
                result.events.push(GameEvent::PlayerHit { by: enemy.id, life });
            }
        }
        if enemy.update(dt, &ctx.map, &mut ctx.index) {
            result.moved = true;
        }
    }
}

fn resolve_player(ctx: &mut GameContext, rules: &RulesConfig, dt: f64, result: &mut StepResult) {
    if let Some(code) = ctx.player.collect_item(&mut ctx.items, rules.gem_time_bonus_secs) {
        let gems = ctx.player.player_state().map_or(0, |p| p.gems);
        debug!(code = %code, gems, left = ctx.items.len(), "gem collected");
        result.events.push(GameEvent::GemCollected { code, gems });
    }
    if ctx.player.update(dt, &ctx.map, &mut ctx.index) {
        result.moved = true;
        ctx.refresh_viewport();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::domain::entity::{Entity, PlayerMode, MAX_LIFE};
    use crate::domain::item::ItemMap;
    use crate::domain::tile::{TILE_HEIGHT, TILE_WIDTH};
    use crate::sim::level::LevelDef;
    use crate::sim::world::SPAWN_LEVEL;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Session with no enemies and no items, player parked at rest.
    fn quiet_context() -> (GameContext, RulesConfig) {
        let mut rules = GameConfig::default().rules;
        rules.min_enemies = 0;
        rules.max_enemies = 0;
        rules.item_count = 0;
        let mut rng = StdRng::seed_from_u64(9);
        let ctx = GameContext::new(&LevelDef::builtin(), &rules, (505.0, 606.0), &mut rng).unwrap();
        (ctx, rules)
    }

    /// Enemy standing still with the player's centre inside its hit box.
    fn enemy_on_player(ctx: &GameContext, vx: f64) -> Entity {
        let p = &ctx.player;
        let mut e = Entity::enemy(0, 0.0, 0.0, vx, 0.0);
        e.x = p.center_x() - e.hit.cx;
        e.y = p.center_y() - e.hit.cy;
        e.refresh_tiles();
        e
    }

    fn file(ctx: &mut GameContext, e: Entity) {
        let (level, row) = e.render_key();
        ctx.index.insert(level, row, e.id);
        ctx.enemies.push(e);
    }

    #[test]
    fn contact_damages_once_within_cooldown() {
        let (mut ctx, rules) = quiet_context();
        let e = enemy_on_player(&ctx, 0.0);
        file(&mut ctx, e);

        let r = step(&mut ctx, &rules, 10.0, 0.016);
        let state = ctx.player.player_state().unwrap();
        assert_eq!(state.life, MAX_LIFE - 10);
        assert_eq!(state.mode, PlayerMode::Damage);
        assert!(matches!(r.events.as_slice(), [GameEvent::PlayerHit { life: 90, .. }]));

        // still overlapping half a second later: no further damage
        let r = step(&mut ctx, &rules, 10.5, 0.016);
        assert_eq!(ctx.player.player_state().unwrap().life, 90);
        assert!(r.events.is_empty());
    }

    #[test]
    fn damage_clears_at_expiry() {
        let (mut ctx, rules) = quiet_context();
        ctx.player.take_damage(10.0, 10, 1.0);
        step(&mut ctx, &rules, 10.9, 0.016);
        assert_eq!(ctx.player.player_state().unwrap().mode, PlayerMode::Damage);
        step(&mut ctx, &rules, 11.0, 0.016);
        assert_eq!(ctx.player.player_state().unwrap().mode, PlayerMode::Default);
    }

    #[test]
    fn contact_transfers_enemy_momentum() {
        let (mut ctx, rules) = quiet_context();
        let e = enemy_on_player(&ctx, 200.0);
        file(&mut ctx, e);
        step(&mut ctx, &rules, 0.0, 0.01);
        // 200 * 0.01 * 10 = 20, then one tick of player attenuation
        assert!((ctx.player.vx - 20.0 * 0.98).abs() < 1e-9);
    }

    #[test]
    fn pickup_emits_event_and_bonus() {
        let (mut ctx, rules) = quiet_context();
        let p = &ctx.player;
        let (row, col) = (p.tile_top, p.tile_left);
        ctx.items = ItemMap::new();
        // centre the player on the item cell so the cell centre is inside
        ctx.player.x = (col as f64 + 0.5) * TILE_WIDTH - ctx.player.hit.cx;
        ctx.player.y = (row as f64 + 0.5) * TILE_HEIGHT - ctx.player.hit.cy;
        ctx.player.refresh_tiles();
        let (row, col) = (ctx.player.tile_top, ctx.player.tile_left);
        ctx.items.insert(SPAWN_LEVEL, row, col, '3');

        let r = step(&mut ctx, &rules, 0.0, 0.016);
        assert_eq!(r.events, vec![GameEvent::GemCollected { code: '3', gems: 1 }]);
        assert_eq!(ctx.player.player_state().unwrap().time_bonus, rules.gem_time_bonus_secs);
        assert!(ctx.items.is_empty());
    }

    #[test]
    fn idle_session_reports_no_motion() {
        let (mut ctx, rules) = quiet_context();
        let before = ctx.viewport;
        let r = step(&mut ctx, &rules, 0.0, 0.016);
        assert!(!r.moved);
        assert_eq!(ctx.viewport, before);
    }

    #[test]
    fn moving_player_drags_the_viewport() {
        let (mut ctx, rules) = quiet_context();
        ctx.player.vy = 300.0;
        let before = ctx.viewport;
        let r = step(&mut ctx, &rules, 0.0, 0.05);
        assert!(r.moved);
        assert_eq!(ctx.viewport, crate::domain::viewport::Viewport::compute(
            &ctx.player, &ctx.map, ctx.canvas_w, ctx.canvas_h,
        ));
        assert!(ctx.viewport != before || ctx.player.vy < 0.0);
    }

    #[test]
    fn index_tracks_every_entity_over_time() {
        let cfg = GameConfig::default();
        let mut rng = StdRng::seed_from_u64(77);
        let mut ctx = GameContext::new(&LevelDef::builtin(), &cfg.rules, (505.0, 606.0), &mut rng).unwrap();
        for i in 0..600 {
            step(&mut ctx, &cfg.rules, i as f64 * 0.02, 0.02);
            if i % 50 == 0 {
                ctx.player.push(80.0, -60.0);
            }
        }
        for e in std::iter::once(&ctx.player).chain(ctx.enemies.iter()) {
            assert_eq!(ctx.index.locate(e.id), vec![(e.level + 1, e.tile_bottom)]);
        }
    }
}
