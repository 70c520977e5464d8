/// Viewport: where the player sits on screen and which tiles are visible.
///
/// The camera follows the player's rotation centre while it is inside
/// the map interior and stops at the map edges, so the canvas is never
/// left half empty on a map larger than the screen.
///
/// Screen and map coordinates relate by
/// `screen = map + offset`, with `offset = screen_pos - player_pos`.

use super::entity::Entity;
use super::tile::{TileMap, TILE_HEIGHT, TILE_WIDTH};

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Viewport {
    /// Screen position of the player sprite origin.
    pub screen_x: f64,
    pub screen_y: f64,
    /// Map → screen translation.
    pub offset_x: f64,
    pub offset_y: f64,
    /// Visible tile ranges, half-open.
    pub col_start: usize,
    pub col_end: usize,
    pub row_start: usize,
    pub row_end: usize,
}

impl Viewport {
    pub fn compute(player: &Entity, map: &TileMap, canvas_w: f64, canvas_h: f64) -> Self {
        let (x, y) = (player.x, player.y);
        let map_w = map.pixel_width();
        let map_h = map.pixel_height();

        let screen_x = follow_axis(x, player.hit.cx, canvas_w, map_w);
        let screen_y = follow_axis(y, player.hit.cy, canvas_h, map_h);

        let cols = map.num_cols();
        let rows = map.num_rows();
        let last_col_px = cols.saturating_sub(1) as f64 * TILE_WIDTH;
        let last_row_px = rows.saturating_sub(1) as f64 * TILE_HEIGHT;

        let col_start = tile_floor((x - screen_x).max(0.0), TILE_WIDTH).min(cols);
        let col_end = (tile_floor(last_col_px.min(x + canvas_w - screen_x), TILE_WIDTH) + 1).min(cols);
        let row_start = tile_floor((y - screen_y).max(0.0), TILE_HEIGHT).min(rows);
        // one extra row: tiles on raised levels poke into the row above
        let row_end = (tile_floor(last_row_px.min(y + canvas_h - screen_y), TILE_HEIGHT) + 2).min(rows);

        Viewport {
            screen_x,
            screen_y,
            offset_x: screen_x - x,
            offset_y: screen_y - y,
            col_start,
            col_end: col_end.max(col_start),
            row_start,
            row_end: row_end.max(row_start),
        }
    }

    /// Map point → canvas point.
    pub fn to_screen(&self, mx: f64, my: f64) -> (f64, f64) {
        (mx + self.offset_x, my + self.offset_y)
    }

    /// Canvas point → map point.
    #[cfg(test)]
    pub fn to_map(&self, sx: f64, sy: f64) -> (f64, f64) {
        (sx - self.offset_x, sy - self.offset_y)
    }
}

/// Screen coordinate of the sprite origin along one axis.
fn follow_axis(pos: f64, center: f64, canvas: f64, map: f64) -> f64 {
    let focus = pos + center;
    if focus < canvas / 2.0 {
        pos
    } else if focus > map - canvas / 2.0 {
        canvas + pos - map
    } else {
        canvas / 2.0 - center
    }
}

/// Non-negative tile index of a pixel coordinate.
fn tile_floor(px: f64, tile: f64) -> usize {
    if px <= 0.0 || !px.is_finite() {
        0
    } else {
        (px / tile).floor() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big_map() -> TileMap {
        let level = ".".repeat(20 * 30);
        TileMap::new(&[level.clone(), level], 20).unwrap()
    }

    #[test]
    fn centres_player_in_the_interior() {
        let map = big_map();
        let p = Entity::player(10.0 * TILE_WIDTH, 15.0 * TILE_HEIGHT);
        let vp = Viewport::compute(&p, &map, 505.0, 606.0);
        assert_eq!(vp.screen_x + p.hit.cx, 505.0 / 2.0);
        assert_eq!(vp.screen_y + p.hit.cy, 606.0 / 2.0);
        assert_eq!(vp.to_screen(p.center_x(), p.center_y()), (252.5, 303.0));
    }

    #[test]
    fn clamps_at_top_left_corner() {
        let map = big_map();
        let p = Entity::player(60.0, 130.0);
        let vp = Viewport::compute(&p, &map, 505.0, 606.0);
        assert_eq!((vp.offset_x, vp.offset_y), (0.0, 0.0));
        assert_eq!((vp.col_start, vp.row_start), (0, 0));
    }

    #[test]
    fn clamps_at_bottom_right_corner() {
        let map = big_map();
        let p = Entity::player(map.pixel_width() - 30.0, map.pixel_height() - 20.0);
        let vp = Viewport::compute(&p, &map, 505.0, 606.0);
        // the map's far corner lands on the canvas corner
        let (sx, sy) = vp.to_screen(map.pixel_width(), map.pixel_height());
        assert!((sx - 505.0).abs() < 1e-9);
        assert!((sy - 606.0).abs() < 1e-9);
        assert_eq!(vp.col_end, 20);
        assert_eq!(vp.row_end, 30);
    }

    #[test]
    fn ranges_stay_inside_the_map() {
        let map = big_map();
        for &(cx, cy) in &[(-500.0, -500.0), (0.0, 0.0), (1000.0, 1200.0), (5000.0, 9000.0)] {
            let p = Entity::player(cx, cy);
            let vp = Viewport::compute(&p, &map, 505.0, 606.0);
            assert!(vp.col_start <= vp.col_end && vp.col_end <= map.num_cols());
            assert!(vp.row_start <= vp.row_end && vp.row_end <= map.num_rows());
        }
    }

    #[test]
    fn row_range_has_extra_margin() {
        let map = big_map();
        let p = Entity::player(10.0 * TILE_WIDTH, 15.0 * TILE_HEIGHT);
        let vp = Viewport::compute(&p, &map, 505.0, 606.0);
        let (_, bottom) = vp.to_map(0.0, 606.0);
        assert_eq!(vp.row_end, (bottom / TILE_HEIGHT).floor() as usize + 2);
    }

    #[test]
    fn to_map_inverts_to_screen() {
        let map = big_map();
        let p = Entity::player(700.0, 900.0);
        let vp = Viewport::compute(&p, &map, 400.0, 300.0);
        let (sx, sy) = vp.to_screen(123.0, 456.0);
        assert_eq!(vp.to_map(sx, sy), (123.0, 456.0));
    }
}
