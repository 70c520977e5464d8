/// Entities: the player and the bugs roaming the maze.
///
/// Both share one data struct (`Entity`) for position, velocity,
/// hit-rectangle and tile footprint. Variant-specific state and behaviour
/// hang off `EntityKind` and are dispatched with explicit matches.
///
/// Coordinates are map pixels. `(x, y)` is the top-left of the sprite box;
/// the hit-rectangle is an offset box inside it, with `(cx, cy)` the point
/// the sprite rotates around.

use std::f64::consts::PI;

use super::item::ItemMap;
use super::render_index::EntityIndex;
use super::tile::{col_of, row_of, TileMap, TILE_HEIGHT, TILE_WIDTH};

/// Speeds at or below this (map pixels per second) snap to rest.
pub const EPSILON: f64 = 5.0;

/// Travel distance of one crawl cycle.
const CRAWL_PERIOD: f64 = 40.0;
/// Crawl wobble amplitude is `2π / CRAWL_DAMPING` radians.
const CRAWL_DAMPING: f64 = 60.0;

/// Size of every character sprite.
pub const SPRITE_WIDTH: f64 = 101.0;
pub const SPRITE_HEIGHT: f64 = 171.0;

pub const PLAYER_SPRITE: &str = "char-princess-girl";
pub const PLAYER_DAMAGE_SPRITE: &str = "char-princess-girl-damage";
pub const ENEMY_SPRITE: &str = "enemy-bug";

pub const MAX_LIFE: u32 = 100;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct EntityId(pub u32);

impl EntityId {
    /// Reserved for the player; enemy ids count up from 0.
    pub const PLAYER: EntityId = EntityId(u32::MAX);

    pub fn is_player(self) -> bool {
        self == EntityId::PLAYER
    }
}

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct HitRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub cx: f64,
    pub cy: f64,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PlayerMode {
    Default,
    Damage,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlayerState {
    pub life: u32,
    pub gems: u32,
    pub mode: PlayerMode,
    /// Wall-clock second at which `Damage` ends.
    pub damage_until: Option<f64>,
    /// Seconds earned back on the session clock.
    pub time_bonus: f64,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Behaviour {
    Roaming,
    Chasing,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RadarShape {
    Square,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnemyState {
    pub behaviour: Behaviour,
    pub radar_range: f64,
    pub radar_shape: RadarShape,
}

#[derive(Clone, Debug, PartialEq)]
pub enum EntityKind {
    Player(PlayerState),
    Enemy(EnemyState),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    /// Absolute distance travelled per axis, drives the crawl wobble.
    pub accum_x: f64,
    pub accum_y: f64,
    /// Velocity multiplier applied every tick (friction).
    pub attenuation: f64,
    /// Share of velocity reflected when bumping into a wall.
    pub bounce_factor: f64,
    pub hit: HitRect,
    /// Map level the entity stands on.
    pub level: usize,
    pub tile_top: i32,
    pub tile_bottom: i32,
    pub tile_left: i32,
    pub tile_right: i32,
    pub kind: EntityKind,
}

// ── Construction ──

impl Entity {
    fn base(id: EntityId, x: f64, y: f64, vx: f64, vy: f64, hit: HitRect, kind: EntityKind) -> Self {
        let mut e = Entity {
            id,
            x,
            y,
            vx,
            vy,
            accum_x: 0.0,
            accum_y: 0.0,
            attenuation: 1.0,
            bounce_factor: 1.0,
            hit,
            level: 0,
            tile_top: 0,
            tile_bottom: 0,
            tile_left: 0,
            tile_right: 0,
            kind,
        };
        e.refresh_tiles();
        e
    }

    /// Player whose rotation centre sits on `(center_x, center_y)`.
    pub fn player(center_x: f64, center_y: f64) -> Self {
        let hit = HitRect { x: 15.0, y: 105.0, w: 72.0, h: 35.0, cx: 50.0, cy: 120.0 };
        let state = PlayerState {
            life: MAX_LIFE,
            gems: 0,
            mode: PlayerMode::Default,
            damage_until: None,
            time_bonus: 0.0,
        };
        let mut p = Entity::base(
            EntityId::PLAYER,
            center_x - hit.cx,
            center_y - hit.cy,
            0.0,
            0.0,
            hit,
            EntityKind::Player(state),
        );
        p.attenuation = 0.98;
        p.bounce_factor = 0.25;
        p
    }

    /// Enemy with its sprite origin at `(x, y)`.
    pub fn enemy(id: u32, x: f64, y: f64, vx: f64, vy: f64) -> Self {
        let hit = HitRect { x: 2.0, y: 68.0, w: 96.0, h: 75.0, cx: 50.0, cy: 109.0 };
        let state = EnemyState {
            behaviour: Behaviour::Roaming,
            radar_range: 100.0,
            radar_shape: RadarShape::Square,
        };
        Entity::base(EntityId(id), x, y, vx, vy, hit, EntityKind::Enemy(state))
    }

    #[cfg(test)]
    pub fn with_motion(mut self, attenuation: f64, bounce_factor: f64) -> Self {
        self.attenuation = attenuation;
        self.bounce_factor = bounce_factor;
        self
    }

    #[cfg(test)]
    pub fn with_hit_rect(mut self, hit: HitRect) -> Self {
        self.hit = hit;
        self.refresh_tiles();
        self
    }
}

// ── Geometry ──

impl Entity {
    #[inline]
    pub fn hit_left(&self) -> f64 {
        self.x + self.hit.x
    }

    #[inline]
    pub fn hit_right(&self) -> f64 {
        self.x + self.hit.x + self.hit.w
    }

    #[inline]
    pub fn hit_top(&self) -> f64 {
        self.y + self.hit.y
    }

    #[inline]
    pub fn hit_bottom(&self) -> f64 {
        self.y + self.hit.y + self.hit.h
    }

    #[inline]
    pub fn center_x(&self) -> f64 {
        self.x + self.hit.cx
    }

    #[inline]
    pub fn center_y(&self) -> f64 {
        self.y + self.hit.cy
    }

    /// Is the point inside the hit-rectangle? Edges count as inside.
    #[inline]
    pub fn contains_point(&self, px: f64, py: f64) -> bool {
        !(px < self.hit_left() || px > self.hit_right() || py < self.hit_top() || py > self.hit_bottom())
    }

    /// Does `other`'s rotation centre fall inside this hit-rectangle?
    pub fn check_collision(&self, other: &Entity) -> bool {
        self.contains_point(other.center_x(), other.center_y())
    }

    /// Recompute the tile footprint from the current position.
    pub fn refresh_tiles(&mut self) {
        self.tile_top = row_of(self.hit_top());
        self.tile_bottom = row_of(self.hit_bottom());
        self.tile_left = col_of(self.hit_left());
        self.tile_right = col_of(self.hit_right());
    }

    /// Render-order bucket `(level, row)` this entity belongs in.
    pub fn render_key(&self) -> (usize, i32) {
        (self.level + 1, self.tile_bottom)
    }
}

// ── Motion ──

impl Entity {
    /// Advance by `dt` seconds with per-axis tile collision against the
    /// level above. Returns whether either axis was in motion.
    ///
    /// Each axis probes the tile its leading edge would enter. Horizontal
    /// probes use the pre-tick top/bottom rows, vertical probes the
    /// pre-tick left/right columns, so a diagonal move cannot slip through
    /// the corner between two walls. A move longer than a tile is walked in
    /// tile-sized steps and stops at the first blocked one.
    pub fn update(&mut self, dt: f64, map: &TileMap, index: &mut EntityIndex) -> bool {
        let old_top = row_of(self.hit_top());
        let old_bottom = row_of(self.hit_bottom());
        let old_left = col_of(self.hit_left());
        let old_right = col_of(self.hit_right());

        let above = self.level + 1;
        let has_above = above < map.num_levels();
        let mut moved = false;

        if self.vx.abs() > EPSILON {
            let (steps, dx) = sub_steps(self.vx * dt, TILE_WIDTH);
            for _ in 0..steps {
                let start = if self.vx < 0.0 { self.hit_left() } else { self.hit_right() };
                let to = col_of(start + dx);
                let blocked = to != col_of(start)
                    && has_above
                    && (map.blocks(above, old_top, to) || map.blocks(above, old_bottom, to));
                if blocked {
                    self.vx *= -self.bounce_factor;
                    break;
                }
                self.x += dx;
                self.accum_x += dx.abs();
            }
            self.vx *= self.attenuation;
            moved = true;
        } else {
            self.vx = 0.0;
        }

        self.tile_left = col_of(self.hit_left());
        self.tile_right = col_of(self.hit_right());

        if self.vy.abs() > EPSILON {
            let (steps, dy) = sub_steps(self.vy * dt, TILE_HEIGHT);
            for _ in 0..steps {
                let start = if self.vy < 0.0 { self.hit_top() } else { self.hit_bottom() };
                let to = row_of(start + dy);
                let blocked = to != row_of(start)
                    && has_above
                    && (map.blocks(above, to, old_left) || map.blocks(above, to, old_right));
                if blocked {
                    self.vy *= -self.bounce_factor;
                    break;
                }
                self.y += dy;
                self.accum_y += dy.abs();
            }
            self.vy *= self.attenuation;
            moved = true;
        } else {
            self.vy = 0.0;
        }

        self.tile_top = row_of(self.hit_top());
        self.tile_bottom = row_of(self.hit_bottom());

        if old_bottom != self.tile_bottom {
            index.relocate(above, old_bottom, self.tile_bottom, self.id);
        }

        moved
    }

    /// Add a velocity impulse.
    pub fn push(&mut self, dvx: f64, dvy: f64) {
        self.vx += dvx;
        self.vy += dvy;
    }
}

// ── Presentation hooks ──

impl Entity {
    /// Crawl wobble from distance travelled.
    pub fn crawl_angle(&self) -> f64 {
        let phase = (self.accum_x.abs() + self.accum_y.abs()) % CRAWL_PERIOD / CRAWL_PERIOD * PI * 2.0;
        phase.sin() / CRAWL_DAMPING * PI * 2.0
    }

    /// Heading from velocity. The player always faces the screen.
    pub fn align_angle(&self) -> f64 {
        match self.kind {
            EntityKind::Player(_) => 0.0,
            EntityKind::Enemy(_) => heading(self.vx, self.vy),
        }
    }

    pub fn render_angle(&self) -> f64 {
        self.crawl_angle() + self.align_angle()
    }

    pub fn sprite_key(&self) -> &'static str {
        match &self.kind {
            EntityKind::Player(p) if p.mode == PlayerMode::Damage => PLAYER_DAMAGE_SPRITE,
            EntityKind::Player(_) => PLAYER_SPRITE,
            EntityKind::Enemy(_) => ENEMY_SPRITE,
        }
    }

    /// Enemies walking left are mirrored so their feet stay down after
    /// the heading rotation.
    pub fn flip_vertical(&self) -> bool {
        matches!(self.kind, EntityKind::Enemy(_)) && self.vx < 0.0
    }

    /// Blink alpha for transient states, `None` when drawn solid.
    pub fn blink_alpha(&self, now: f64) -> Option<f64> {
        match &self.kind {
            EntityKind::Player(p) if p.mode == PlayerMode::Damage => Some(blink_effect(0.6, 4.0, now)),
            EntityKind::Enemy(e) if e.behaviour == Behaviour::Chasing => Some(blink_effect(0.5, 2.0, now)),
            _ => None,
        }
    }
}

// ── Player behaviour ──

impl Entity {
    pub fn player_state(&self) -> Option<&PlayerState> {
        match &self.kind {
            EntityKind::Player(p) => Some(p),
            EntityKind::Enemy(_) => None,
        }
    }

    pub fn player_state_mut(&mut self) -> Option<&mut PlayerState> {
        match &mut self.kind {
            EntityKind::Player(p) => Some(p),
            EntityKind::Enemy(_) => None,
        }
    }

    /// Apply damage unless already hurting. Returns true if it landed.
    pub fn take_damage(&mut self, now: f64, amount: u32, cooldown: f64) -> bool {
        let Some(p) = self.player_state_mut() else { return false };
        if p.mode == PlayerMode::Damage {
            return false;
        }
        p.mode = PlayerMode::Damage;
        p.damage_until = Some(now + cooldown);
        p.life = p.life.saturating_sub(amount);
        true
    }

    /// Leave the damage state once its expiry has passed.
    pub fn expire_damage(&mut self, now: f64) {
        if let Some(p) = self.player_state_mut() {
            if matches!(p.damage_until, Some(t) if now >= t) {
                p.mode = PlayerMode::Default;
                p.damage_until = None;
            }
        }
    }

    /// Pick up the item under the player's top row, if its cell centre
    /// lies inside the hit-rectangle. The right column wins over the left.
    pub fn collect_item(&mut self, items: &mut ItemMap, time_bonus: f64) -> Option<char> {
        if self.player_state().is_none() {
            return None;
        }
        let level = self.level + 1;
        let row = self.tile_top;
        let col = if items.contains(level, row, self.tile_right) {
            self.tile_right
        } else if items.contains(level, row, self.tile_left) {
            self.tile_left
        } else {
            return None;
        };

        let gx = (col as f64 + 0.5) * TILE_WIDTH;
        let gy = (row as f64 + 0.5) * TILE_HEIGHT;
        if !self.contains_point(gx, gy) {
            return None;
        }

        let code = items.consume(level, row, col)?;
        if let Some(p) = self.player_state_mut() {
            p.gems += 1;
            p.time_bonus += time_bonus;
        }
        Some(code)
    }
}

/// Split a displacement into the fewest equal steps no longer than `tile`.
fn sub_steps(distance: f64, tile: f64) -> (u32, f64) {
    if !distance.is_finite() {
        return (0, 0.0);
    }
    let steps = (distance.abs() / tile).ceil().max(1.0);
    (steps as u32, distance / steps)
}

/// Direction of travel in radians, 0 when at rest.
pub fn heading(vx: f64, vy: f64) -> f64 {
    if vx != 0.0 {
        let flip = if vx < 0.0 { PI } else { 0.0 };
        if vy != 0.0 {
            (vy / vx).atan() + flip
        } else {
            flip
        }
    } else if vy != 0.0 {
        vy.signum() * PI / 2.0
    } else {
        0.0
    }
}

/// Alpha oscillating between `min_alpha` and 1 at `frequency` Hz.
pub fn blink_effect(min_alpha: f64, frequency: f64, now: f64) -> f64 {
    ((now * frequency * 2.0 * PI).sin() + 1.0) / 2.0 * (min_alpha - 1.0) + 1.0
}
