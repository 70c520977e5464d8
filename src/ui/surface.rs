/// Drawing surface abstraction: a small 2D-context API.
///
/// Coordinates are canvas pixels transformed by the current affine
/// transform. `save`/`restore` push and pop the transform, global alpha
/// and fill/stroke colours together.

use std::f64::consts::PI;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    /// `self` covered by `top` at opacity `alpha`.
    pub fn blend(self, top: Rgb, alpha: f64) -> Rgb {
        let a = alpha.clamp(0.0, 1.0);
        let mix = |lo: u8, hi: u8| (lo as f64 + (hi as f64 - lo as f64) * a).round() as u8;
        Rgb::new(mix(self.r, top.r), mix(self.g, top.g), mix(self.b, top.b))
    }
}

/// One filled rectangle of a sprite, optionally marked with a glyph.
#[derive(Clone, Debug, PartialEq)]
pub struct SpritePart {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub color: Rgb,
    pub glyph: Option<char>,
}

/// A sprite image: a stack of coloured rectangles inside a
/// `width` x `height` box, drawn back to front.
#[derive(Clone, Debug, PartialEq)]
pub struct Sprite {
    pub width: f64,
    pub height: f64,
    /// Opacity multiplier applied on top of the global alpha.
    pub alpha: f64,
    pub parts: Vec<SpritePart>,
}

/// Row-major 2x3 affine transform: `x' = a x + c y + e`, `y' = b x + d y + f`.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Affine {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Affine {
    pub const IDENTITY: Affine = Affine { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: 0.0, f: 0.0 };

    /// `self` followed by `other` in local space (canvas `ctx.transform` order).
    pub fn then(&self, o: &Affine) -> Affine {
        Affine {
            a: self.a * o.a + self.c * o.b,
            b: self.b * o.a + self.d * o.b,
            c: self.a * o.c + self.c * o.d,
            d: self.b * o.c + self.d * o.d,
            e: self.a * o.e + self.c * o.f + self.e,
            f: self.b * o.e + self.d * o.f + self.f,
        }
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Affine {
        self.then(&Affine { e: dx, f: dy, ..Affine::IDENTITY })
    }

    pub fn rotate(&self, angle: f64) -> Affine {
        let (s, c) = angle.sin_cos();
        self.then(&Affine { a: c, b: s, c: -s, d: c, e: 0.0, f: 0.0 })
    }

    pub fn scale(&self, sx: f64, sy: f64) -> Affine {
        self.then(&Affine { a: sx, d: sy, ..Affine::IDENTITY })
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (self.a * x + self.c * y + self.e, self.b * x + self.d * y + self.f)
    }

    /// `None` for a degenerate (zero-scale) transform.
    pub fn inverse(&self) -> Option<Affine> {
        let det = self.a * self.d - self.b * self.c;
        if det.abs() < 1e-12 {
            return None;
        }
        let inv = 1.0 / det;
        Some(Affine {
            a: self.d * inv,
            b: -self.b * inv,
            c: -self.c * inv,
            d: self.a * inv,
            e: (self.c * self.f - self.d * self.e) * inv,
            f: (self.b * self.e - self.a * self.f) * inv,
        })
    }
}

/// Per-save drawing state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawState {
    pub transform: Affine,
    pub alpha: f64,
    pub fill: Rgb,
    pub stroke: Rgb,
}

impl Default for DrawState {
    fn default() -> Self {
        DrawState { transform: Affine::IDENTITY, alpha: 1.0, fill: Rgb::BLACK, stroke: Rgb::BLACK }
    }
}

/// The save/restore stack shared by surface implementations.
#[derive(Clone, Debug, Default)]
pub struct StateStack {
    current: DrawState,
    saved: Vec<DrawState>,
}

impl StateStack {
    pub fn current(&self) -> &DrawState {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut DrawState {
        &mut self.current
    }

    pub fn save(&mut self) {
        self.saved.push(self.current);
    }

    /// Unbalanced restores are ignored.
    pub fn restore(&mut self) {
        if let Some(state) = self.saved.pop() {
            self.current = state;
        }
    }

    #[cfg(test)]
    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    pub fn reset(&mut self) {
        *self = StateStack::default();
    }
}

pub trait Surface {
    /// Canvas size in pixels.
    fn size(&self) -> (f64, f64);

    fn state(&self) -> &StateStack;
    fn state_mut(&mut self) -> &mut StateStack;

    /// Wipe the canvas and reset the drawing state.
    fn clear(&mut self);

    fn draw_image(&mut self, sprite: &Sprite, x: f64, y: f64);
    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64);
    fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64);
    /// Arc angles in radians, clockwise from +x, as on a canvas.
    fn fill_arc(&mut self, cx: f64, cy: f64, r: f64, start: f64, end: f64);
    fn stroke_arc(&mut self, cx: f64, cy: f64, r: f64, start: f64, end: f64);
    fn fill_text(&mut self, text: &str, x: f64, y: f64);
    fn stroke_text(&mut self, text: &str, x: f64, y: f64);

    fn save(&mut self) {
        self.state_mut().save();
    }

    fn restore(&mut self) {
        self.state_mut().restore();
    }

    fn translate(&mut self, dx: f64, dy: f64) {
        let s = self.state_mut().current_mut();
        s.transform = s.transform.translate(dx, dy);
    }

    fn rotate(&mut self, angle: f64) {
        let s = self.state_mut().current_mut();
        s.transform = s.transform.rotate(angle);
    }

    fn scale(&mut self, sx: f64, sy: f64) {
        let s = self.state_mut().current_mut();
        s.transform = s.transform.scale(sx, sy);
    }

    fn set_global_alpha(&mut self, alpha: f64) {
        self.state_mut().current_mut().alpha = alpha.clamp(0.0, 1.0);
    }

    fn global_alpha(&self) -> f64 {
        self.state().current().alpha
    }

    fn set_fill(&mut self, color: Rgb) {
        self.state_mut().current_mut().fill = color;
    }

    fn set_stroke(&mut self, color: Rgb) {
        self.state_mut().current_mut().stroke = color;
    }
}

/// Is `angle` on the clockwise sweep from `start` to `end`?
pub fn angle_in_sweep(angle: f64, start: f64, end: f64) -> bool {
    let sweep = end - start;
    if sweep.abs() >= 2.0 * PI {
        return true;
    }
    let norm = |a: f64| a.rem_euclid(2.0 * PI);
    let (a, s) = (norm(angle), norm(start));
    let span = norm(sweep);
    (a - s).rem_euclid(2.0 * PI) <= span
}

#[cfg(test)]
pub use recording::{Op, Recorder};

#[cfg(test)]
mod recording {
    use super::*;

    /// A drawing call, with the transform and alpha in effect.
    #[derive(Clone, Debug, PartialEq)]
    pub enum Op {
        Clear,
        Image { width: f64, x: f64, y: f64, at: (f64, f64), alpha: f64 },
        FillRect { x: f64, y: f64, w: f64, h: f64, color: Rgb, alpha: f64 },
        StrokeRect { x: f64, y: f64, w: f64, h: f64 },
        FillArc { start: f64, end: f64 },
        StrokeArc { start: f64, end: f64 },
        Text { text: String },
    }

    /// In-memory surface that logs every call.
    #[derive(Default)]
    pub struct Recorder {
        pub ops: Vec<Op>,
        stack: StateStack,
        pub width: f64,
        pub height: f64,
    }

    impl Recorder {
        pub fn new(width: f64, height: f64) -> Self {
            Recorder { width, height, ..Recorder::default() }
        }

        pub fn texts(&self) -> Vec<&str> {
            self.ops
                .iter()
                .filter_map(|op| match op {
                    Op::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect()
        }

        pub fn images(&self) -> Vec<&Op> {
            self.ops.iter().filter(|op| matches!(op, Op::Image { .. })).collect()
        }
    }

    impl Surface for Recorder {
        fn size(&self) -> (f64, f64) {
            (self.width, self.height)
        }

        fn state(&self) -> &StateStack {
            &self.stack
        }

        fn state_mut(&mut self) -> &mut StateStack {
            &mut self.stack
        }

        fn clear(&mut self) {
            self.stack.reset();
            self.ops.push(Op::Clear);
        }

        fn draw_image(&mut self, sprite: &Sprite, x: f64, y: f64) {
            let s = self.stack.current();
            let at = s.transform.apply(x, y);
            self.ops.push(Op::Image { width: sprite.width, x, y, at, alpha: s.alpha * sprite.alpha });
        }

        fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
            let s = *self.stack.current();
            self.ops.push(Op::FillRect { x, y, w, h, color: s.fill, alpha: s.alpha });
        }

        fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
            self.ops.push(Op::StrokeRect { x, y, w, h });
        }

        fn fill_arc(&mut self, _cx: f64, _cy: f64, _r: f64, start: f64, end: f64) {
            self.ops.push(Op::FillArc { start, end });
        }

        fn stroke_arc(&mut self, _cx: f64, _cy: f64, _r: f64, start: f64, end: f64) {
            self.ops.push(Op::StrokeArc { start, end });
        }

        fn fill_text(&mut self, text: &str, _x: f64, _y: f64) {
            self.ops.push(Op::Text { text: text.to_string() });
        }

        fn stroke_text(&mut self, text: &str, _x: f64, _y: f64) {
            self.ops.push(Op::Text { text: text.to_string() });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: (f64, f64), b: (f64, f64)) -> bool {
        (a.0 - b.0).abs() < 1e-9 && (a.1 - b.1).abs() < 1e-9
    }

    #[test]
    fn transforms_compose_in_local_order() {
        // translate then rotate: rotation happens around the translated origin
        let t = Affine::IDENTITY.translate(10.0, 20.0).rotate(PI / 2.0);
        assert!(close(t.apply(1.0, 0.0), (10.0, 21.0)));
        let s = Affine::IDENTITY.translate(5.0, 0.0).scale(1.0, -1.0);
        assert!(close(s.apply(2.0, 3.0), (7.0, -3.0)));
    }

    #[test]
    fn inverse_undoes_transform() {
        let t = Affine::IDENTITY.translate(3.0, -4.0).rotate(0.7).scale(2.0, -1.0);
        let inv = t.inverse().unwrap();
        let (x, y) = t.apply(12.5, -8.0);
        assert!(close(inv.apply(x, y), (12.5, -8.0)));
        assert!(Affine::IDENTITY.scale(0.0, 1.0).inverse().is_none());
    }

    #[test]
    fn save_restore_round_trips_state() {
        let mut r = Recorder::new(100.0, 100.0);
        r.set_global_alpha(0.5);
        r.save();
        r.translate(4.0, 4.0);
        r.set_global_alpha(0.2);
        r.restore();
        assert_eq!(r.global_alpha(), 0.5);
        assert_eq!(r.state().current().transform, Affine::IDENTITY);
        // extra restore is harmless
        r.restore();
        assert_eq!(r.state().depth(), 0);
    }

    #[test]
    fn blend_mixes_channels() {
        let c = Rgb::new(0, 100, 200).blend(Rgb::new(100, 100, 0), 0.5);
        assert_eq!(c, Rgb::new(50, 100, 100));
        assert_eq!(Rgb::BLACK.blend(Rgb::WHITE, 2.0), Rgb::WHITE);
    }

    #[test]
    fn sweep_membership() {
        assert!(angle_in_sweep(0.0, -PI / 2.0, PI / 2.0));
        assert!(!angle_in_sweep(PI, -PI / 2.0, PI / 2.0));
        assert!(angle_in_sweep(PI, 0.0, 2.0 * PI));
        assert!(angle_in_sweep(-PI / 2.0, -PI / 2.0, 0.0));
    }
}
