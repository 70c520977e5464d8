/// Scene drawing: turns the game into surface calls.
///
/// World pass, per level then per visible row:
///   1. tiles and their shadows, raised by the level offset
///   2. items lying on that row
///   3. entities filed under (level, row), in bucket order
///
/// Entities stand one level below their filing level, so a wall on the
/// next row south is drawn after them and covers their feet.

use std::f64::consts::PI;

use crate::domain::entity::{Entity, EntityId, MAX_LIFE};
use crate::domain::shadow::ShadowDir;
use crate::domain::tile::{EMPTY, LEVEL_OFFSET, TILE_HEIGHT, TILE_TOP_GAP, TILE_WIDTH};
use crate::sim::event::Outcome;
use crate::sim::game::Game;
use crate::sim::level::{item_key, shadow_key, terrain_key};
use crate::sim::state::Phase;
use crate::sim::world::GameContext;
use super::assets::AssetStore;
use super::surface::{Rgb, Surface};

const BACKDROP: Rgb = Rgb::new(22, 22, 35);
const CURTAIN: Rgb = Rgb::BLACK;
const TITLE: Rgb = Rgb::new(255, 210, 80);
const TEXT: Rgb = Rgb::WHITE;
const LIFE_BG: Rgb = Rgb::new(60, 20, 20);
const LIFE_FG: Rgb = Rgb::new(220, 50, 50);
const TIMER_FG: Rgb = Rgb::new(90, 200, 255);
const DEBUG_SPRITE: Rgb = Rgb::new(255, 0, 0);
const DEBUG_HIT: Rgb = Rgb::new(0, 0, 255);
const DEBUG_TILES: Rgb = Rgb::new(255, 255, 0);

const LIFE_BAR_W: f64 = 200.0;
const LIFE_BAR_H: f64 = 16.0;
const TIMER_RADIUS: f64 = 25.0;
const MARGIN: f64 = 10.0;

/// One step of the world pass.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Draw {
    Tile { level: usize, row: i32, col: i32, key: &'static str },
    Shadow { level: usize, row: i32, col: i32, key: &'static str },
    Item { level: usize, row: i32, col: i32, key: &'static str },
    Entity(EntityId),
}

pub fn render<S: Surface>(s: &mut S, game: &Game, assets: &AssetStore, now: f64) {
    s.clear();
    let (w, h) = s.size();
    s.set_fill(BACKDROP);
    s.fill_rect(0.0, 0.0, w, h);

    let overlay = game.overlay_alpha(now);
    match game.phase() {
        Phase::Menu => draw_menu(s, 1.0),
        Phase::MenuHide => draw_menu(s, overlay.unwrap_or(0.0)),
        Phase::MenuFadeIn => curtain(s, overlay.unwrap_or(1.0)),
        Phase::MenuFadeOut | Phase::InGame | Phase::Finished => {
            if let Some(ctx) = game.context() {
                draw_world(s, ctx, assets, game.debug(), now);
                draw_hud(s, ctx, game, now);
            }
            if let Some(alpha) = overlay {
                curtain(s, alpha);
            }
            if game.phase() == Phase::Finished {
                if let Some(outcome) = game.outcome() {
                    draw_outcome(s, outcome);
                }
            }
        }
    }
}

// ── Menu and overlays ──

fn draw_menu<S: Surface>(s: &mut S, alpha: f64) {
    let (w, h) = s.size();
    let x = w / 2.0 - 120.0;
    s.save();
    s.set_global_alpha(alpha);
    s.set_fill(TITLE);
    s.fill_text("T I L E Q U E S T", x, h / 3.0);
    s.set_fill(TEXT);
    s.fill_text("Collect the gems before time runs out", x - 60.0, h / 3.0 + 60.0);
    s.fill_text("Enter / Space / Start : play", x, h / 2.0 + 20.0);
    s.fill_text("Arrows / WASD / mouse : move", x, h / 2.0 + 50.0);
    s.fill_text("Esc / Q : quit    F3 : debug", x, h / 2.0 + 80.0);
    s.restore();
}

fn curtain<S: Surface>(s: &mut S, alpha: f64) {
    let (w, h) = s.size();
    s.save();
    s.set_global_alpha(alpha);
    s.set_fill(CURTAIN);
    s.fill_rect(0.0, 0.0, w, h);
    s.restore();
}

fn outcome_text(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Timeout => "TIME UP",
        Outcome::Defeat => "YOU WERE DEFEATED",
        Outcome::Victory => "ALL GEMS FOUND!",
    }
}

fn draw_outcome<S: Surface>(s: &mut S, outcome: Outcome) {
    let (w, h) = s.size();
    s.save();
    s.set_fill(TITLE);
    s.set_stroke(CURTAIN);
    let text = outcome_text(outcome);
    let x = w / 2.0 - text.len() as f64 * 4.0;
    s.stroke_text(text, x, h / 2.0);
    s.fill_text(text, x, h / 2.0);
    s.restore();
}

// ── World ──

/// Draw order for the visible part of the world.
pub fn world_plan(ctx: &GameContext) -> Vec<Draw> {
    let vp = &ctx.viewport;
    let mut plan = Vec::new();
    let (row_start, row_end) = (vp.row_start as i32, vp.row_end as i32);
    let (col_start, col_end) = (vp.col_start as i32, vp.col_end as i32);

    for level in 0..ctx.map.num_levels() {
        for row in row_start..row_end {
            for col in col_start..col_end {
                let Some(code) = ctx.map.tile_at(level, row, col) else { continue };
                if code == EMPTY {
                    continue;
                }
                if let Some(key) = terrain_key(code) {
                    plan.push(Draw::Tile { level, row, col, key });
                }
                if let Some(flags) = ctx.shadows.at(level, row, col) {
                    for dir in ShadowDir::ALL {
                        if flags[dir.slot()] {
                            plan.push(Draw::Shadow { level, row, col, key: shadow_key(dir) });
                        }
                    }
                }
            }
            for (col, code) in ctx.items.row(level, row) {
                if (col_start..col_end).contains(&col) {
                    if let Some(key) = item_key(code) {
                        plan.push(Draw::Item { level, row, col, key });
                    }
                }
            }
            plan.extend(ctx.index.bucket(level, row).map(Draw::Entity));
        }
    }

    // entities filed above the top map level still need drawing
    if let Some(highest) = ctx.index.highest_level() {
        for level in ctx.map.num_levels()..=highest {
            for row in ctx.index.rows(level) {
                if (row_start..row_end).contains(&row) {
                    plan.extend(ctx.index.bucket(level, row).map(Draw::Entity));
                }
            }
        }
    }
    plan
}

fn draw_world<S: Surface>(s: &mut S, ctx: &GameContext, assets: &AssetStore, debug: bool, now: f64) {
    s.save();
    s.translate(ctx.viewport.offset_x, ctx.viewport.offset_y);

    for step in world_plan(ctx) {
        match step {
            Draw::Tile { level, row, col, key }
            | Draw::Shadow { level, row, col, key }
            | Draw::Item { level, row, col, key } => {
                let Some(sprite) = assets.get(key) else { continue };
                s.save();
                s.translate(0.0, -TILE_TOP_GAP - LEVEL_OFFSET * level as f64);
                s.draw_image(sprite, col as f64 * TILE_WIDTH, row as f64 * TILE_HEIGHT);
                s.restore();
            }
            Draw::Entity(id) => {
                if let Some(entity) = ctx.entity(id) {
                    draw_entity(s, entity, assets, debug, now);
                }
            }
        }
    }

    if debug {
        let p = &ctx.player;
        s.set_stroke(DEBUG_TILES);
        s.stroke_rect(
            p.tile_left as f64 * TILE_WIDTH,
            p.tile_top as f64 * TILE_HEIGHT,
            (p.tile_right - p.tile_left + 1) as f64 * TILE_WIDTH,
            (p.tile_bottom - p.tile_top + 1) as f64 * TILE_HEIGHT,
        );
        s.stroke_rect(0.0, 0.0, ctx.map.pixel_width(), ctx.map.pixel_height());
    }
    s.restore();
}

/// Entities rotate and flip around their hit-rectangle centre.
fn draw_entity<S: Surface>(s: &mut S, e: &Entity, assets: &AssetStore, debug: bool, now: f64) {
    let Some(sprite) = assets.get(e.sprite_key()) else { return };
    s.save();
    s.translate(e.x, e.y);

    if debug {
        s.set_stroke(DEBUG_SPRITE);
        s.stroke_rect(0.0, 0.0, sprite.width, sprite.height);
        s.set_stroke(DEBUG_HIT);
        s.stroke_rect(e.hit.x, e.hit.y, e.hit.w, e.hit.h);
        s.set_fill(TEXT);
        s.fill_text(&format!("({:.0}, {:.0})", e.x, e.y), 5.0, 20.0);
    }

    s.translate(e.hit.cx, e.hit.cy);
    s.rotate(e.render_angle());
    if e.flip_vertical() {
        s.scale(1.0, -1.0);
    }
    if let Some(alpha) = e.blink_alpha(now) {
        let base = s.global_alpha();
        s.set_global_alpha(base * alpha);
    }
    s.translate(-e.hit.cx, -e.hit.cy);
    s.draw_image(sprite, 0.0, 0.0);
    s.restore();
}

// ── HUD ──

fn draw_hud<S: Surface>(s: &mut S, ctx: &GameContext, game: &Game, now: f64) {
    let Some(state) = ctx.player.player_state() else { return };
    let (w, _) = s.size();
    let rules = &game.config().rules;

    s.save();
    s.set_fill(LIFE_BG);
    s.fill_rect(MARGIN, MARGIN, LIFE_BAR_W, LIFE_BAR_H);
    s.set_fill(LIFE_FG);
    s.fill_rect(MARGIN, MARGIN, LIFE_BAR_W * state.life as f64 / MAX_LIFE as f64, LIFE_BAR_H);
    s.set_fill(TEXT);
    s.fill_text(&format!("LIFE {}", state.life), MARGIN, MARGIN + LIFE_BAR_H + 20.0);
    s.fill_text(
        &format!("GEMS {}/{}", state.gems, rules.required_items),
        MARGIN,
        MARGIN + LIFE_BAR_H + 45.0,
    );

    let remaining = game.remaining_secs(now);
    let share = if rules.time_limit_secs > 0.0 {
        (remaining / rules.time_limit_secs).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (cx, cy) = (w - MARGIN - TIMER_RADIUS, MARGIN + TIMER_RADIUS);
    let start = -PI / 2.0;
    s.set_stroke(TEXT);
    s.stroke_arc(cx, cy, TIMER_RADIUS, 0.0, 2.0 * PI);
    if share > 0.0 {
        s.set_fill(TIMER_FG);
        s.fill_arc(cx, cy, TIMER_RADIUS, start, start + 2.0 * PI * share);
    }
    s.set_fill(TEXT);
    s.fill_text(&format!("{:.0}", remaining.ceil()), cx - 8.0, cy + TIMER_RADIUS + 20.0);
    s.restore();
}
