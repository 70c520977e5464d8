/// Terminal surface: rasterizes canvas pixels onto character cells.
///
/// How it works:
///   1. Drawing calls paint into the `front` buffer. A cell is covered by
///      a shape when the shape contains the cell's centre pixel, found by
///      pulling the centre back through the inverse transform.
///   2. Translucent fills blend into the cell background.
///   3. `present` compares `front` with `back` (previous frame) and emits
///      terminal commands only for changed cells, batched with `queue!`
///      and flushed once.
///   4. Swap front/back.
///
/// One cell stands for `cell_w` x `cell_h` canvas pixels.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{DisableMouseCapture, EnableMouseCapture},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use super::surface::{angle_in_sweep, Affine, Rgb, Sprite, StateStack, Surface};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Rgb,
    bg: Rgb,
}

impl Cell {
    /// Explicit dark background for every cell, also used for `Clear`,
    /// so the gaps between terminal rows match the cell colour.
    const BASE_BG: Rgb = Rgb::new(22, 22, 35);

    const BLANK: Cell = Cell { ch: ' ', fg: Rgb::WHITE, bg: Cell::BASE_BG };

    /// Sentinel that differs from any drawn cell, forcing a full repaint.
    const INVALID: Cell = Cell { ch: '?', fg: Rgb::new(255, 0, 255), bg: Rgb::new(255, 0, 255) };
}

fn term_color(c: Rgb) -> Color {
    Color::Rgb { r: c.r, g: c.g, b: c.b }
}

/// Black or white, whichever reads better on `bg`.
fn contrast(bg: Rgb) -> Rgb {
    let luma = 0.299 * bg.r as f64 + 0.587 * bg.g as f64 + 0.114 * bg.b as f64;
    if luma > 140.0 { Rgb::BLACK } else { Rgb::WHITE }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    fn get_mut(&mut self, x: i64, y: i64) -> Option<&mut Cell> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(&mut self.cells[y as usize * self.width + x as usize])
    }
}

/// Glyphs hide under fills at least this opaque.
const GLYPH_COVER_ALPHA: f64 = 0.5;
/// Text fainter than this is not printed.
const TEXT_MIN_ALPHA: f64 = 0.25;

// ── TermSurface ──

pub struct TermSurface {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    cell_w: f64,
    cell_h: f64,
    stack: StateStack,
}

impl TermSurface {
    pub fn new(cell_w: f64, cell_h: f64) -> Self {
        TermSurface {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            cell_w: cell_w.max(1.0),
            cell_h: cell_h.max(1.0),
            stack: StateStack::default(),
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide,
            SetBackgroundColor(term_color(Cell::BASE_BG)),
            Clear(ClearType::All)
        )?;
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.resize_cells(tw as usize, th as usize);
        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            ResetColor,
            DisableMouseCapture,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    /// Adopt a new terminal size in cells. Forces a full repaint.
    pub fn resize_cells(&mut self, cols: usize, rows: usize) {
        self.front.resize(cols, rows);
        self.back.resize(cols, rows);
        self.back.cells.fill(Cell::INVALID);
    }

    /// Pick up a terminal resize. Returns true when the size changed.
    pub fn sync_size(&mut self) -> io::Result<bool> {
        let (tw, th) = terminal::size()?;
        let (tw, th) = (tw as usize, th as usize);
        if tw == self.front.width && th == self.front.height {
            return Ok(false);
        }
        self.resize_cells(tw, th);
        queue!(self.writer, SetBackgroundColor(term_color(Cell::BASE_BG)), Clear(ClearType::All))?;
        Ok(true)
    }

    /// Canvas size in pixels for a terminal of `cols` x `rows` cells.
    pub fn canvas_for(&self, cols: u16, rows: u16) -> (f64, f64) {
        (cols as f64 * self.cell_w, rows as f64 * self.cell_h)
    }

    /// Write the frame: diff against the previous one, then swap.
    pub fn present(&mut self) -> io::Result<()> {
        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Rgb::WHITE;
        let mut last_bg = Cell::BASE_BG;
        let mut need_move = true;
        let mut last_x: usize = 0;
        let mut last_y: usize = 0;

        // explicit base colours: ResetColor would fall back to the
        // terminal default and leave line artifacts
        queue!(
            self.writer,
            SetForegroundColor(term_color(last_fg)),
            SetBackgroundColor(term_color(last_bg)),
        )?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) {
                    need_move = true;
                    continue;
                }

                if need_move || x != last_x + 1 || y != last_y {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                    need_move = false;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(term_color(cell.fg)))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(term_color(cell.bg)))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                last_x = x;
                last_y = y;
            }
        }

        self.writer.flush()
    }

    // ── Rasterization ──

    fn transform(&self) -> Affine {
        self.stack.current().transform
    }

    /// Cell range covering the canvas-space box spanned by `points`.
    fn cell_span(&self, points: &[(f64, f64)]) -> (i64, i64, i64, i64) {
        let (mut x0, mut y0) = (f64::INFINITY, f64::INFINITY);
        let (mut x1, mut y1) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for &(x, y) in points {
            x0 = x0.min(x);
            y0 = y0.min(y);
            x1 = x1.max(x);
            y1 = y1.max(y);
        }
        let clamp = |v: f64, hi: usize| (v.max(-1.0).min(hi as f64)) as i64;
        (
            clamp((x0 / self.cell_w).floor(), self.front.width),
            clamp((y0 / self.cell_h).floor(), self.front.height),
            clamp((x1 / self.cell_w).floor(), self.front.width),
            clamp((y1 / self.cell_h).floor(), self.front.height),
        )
    }

    /// Visit every cell whose centre, in local coordinates, satisfies
    /// `inside`. `bounds` are local corner points of the shape.
    fn cover<F, P>(&mut self, bounds: &[(f64, f64)], inside: F, mut paint: P)
    where
        F: Fn(f64, f64) -> bool,
        P: FnMut(&mut Cell),
    {
        let t = self.transform();
        let Some(inv) = t.inverse() else { return };
        let corners: Vec<_> = bounds.iter().map(|&(x, y)| t.apply(x, y)).collect();
        let (c0, r0, c1, r1) = self.cell_span(&corners);
        for row in r0..=r1 {
            for col in c0..=c1 {
                let px = (col as f64 + 0.5) * self.cell_w;
                let py = (row as f64 + 0.5) * self.cell_h;
                let (lx, ly) = inv.apply(px, py);
                if inside(lx, ly) {
                    if let Some(cell) = self.front.get_mut(col, row) {
                        paint(cell);
                    }
                }
            }
        }
    }

    fn paint_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: Rgb, alpha: f64) {
        if alpha <= 0.0 || w <= 0.0 || h <= 0.0 {
            return;
        }
        let corners = [(x, y), (x + w, y), (x, y + h), (x + w, y + h)];
        self.cover(
            &corners,
            |lx, ly| lx >= x && lx < x + w && ly >= y && ly < y + h,
            |cell| {
                cell.bg = cell.bg.blend(color, alpha);
                if alpha >= GLYPH_COVER_ALPHA {
                    cell.ch = ' ';
                }
            },
        );
    }

    /// Put a glyph on the cell under local point `(x, y)`.
    fn put_glyph(&mut self, ch: char, x: f64, y: f64, fg: Option<Rgb>) {
        let (px, py) = self.transform().apply(x, y);
        let col = (px / self.cell_w).floor() as i64;
        let row = (py / self.cell_h).floor() as i64;
        if let Some(cell) = self.front.get_mut(col, row) {
            cell.ch = ch;
            cell.fg = fg.unwrap_or_else(|| contrast(cell.bg));
        }
    }

    fn put_text(&mut self, text: &str, x: f64, y: f64, color: Rgb) {
        let alpha = self.stack.current().alpha;
        if alpha < TEXT_MIN_ALPHA {
            return;
        }
        // canvas text sits on its baseline
        let (px, py) = self.transform().apply(x, y - 1.0);
        let mut col = (px / self.cell_w).floor() as i64;
        let row = (py / self.cell_h).floor() as i64;
        for ch in text.chars() {
            if let Some(cell) = self.front.get_mut(col, row) {
                cell.ch = ch;
                cell.fg = cell.bg.blend(color, alpha);
            }
            col += 1;
        }
    }

    fn paint_arc(&mut self, cx: f64, cy: f64, r: f64, start: f64, end: f64, color: Rgb, ring: bool) {
        let alpha = self.stack.current().alpha;
        if alpha <= 0.0 || r <= 0.0 {
            return;
        }
        let half_cell = self.cell_w.max(self.cell_h) / 2.0;
        let reach = r + half_cell;
        let corners = [
            (cx - reach, cy - reach),
            (cx + reach, cy - reach),
            (cx - reach, cy + reach),
            (cx + reach, cy + reach),
        ];
        self.cover(
            &corners,
            |lx, ly| {
                let (dx, dy) = (lx - cx, ly - cy);
                let d = dx.hypot(dy);
                let on_shape = if ring { (d - r).abs() <= half_cell } else { d <= r };
                on_shape && angle_in_sweep(dy.atan2(dx), start, end)
            },
            |cell| {
                if ring {
                    cell.ch = '·';
                    cell.fg = cell.bg.blend(color, alpha);
                } else {
                    cell.bg = cell.bg.blend(color, alpha);
                }
            },
        );
    }
}

impl Surface for TermSurface {
    fn size(&self) -> (f64, f64) {
        (self.front.width as f64 * self.cell_w, self.front.height as f64 * self.cell_h)
    }

    fn state(&self) -> &StateStack {
        &self.stack
    }

    fn state_mut(&mut self) -> &mut StateStack {
        &mut self.stack
    }

    fn clear(&mut self) {
        self.front.clear();
        self.stack.reset();
    }

    fn draw_image(&mut self, sprite: &Sprite, x: f64, y: f64) {
        let alpha = self.stack.current().alpha * sprite.alpha;
        for part in &sprite.parts {
            self.paint_rect(x + part.x, y + part.y, part.w, part.h, part.color, alpha);
        }
        if alpha < GLYPH_COVER_ALPHA {
            return;
        }
        for part in &sprite.parts {
            if let Some(ch) = part.glyph {
                self.put_glyph(ch, x + part.x + part.w / 2.0, y + part.y + part.h / 2.0, None);
            }
        }
    }

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        let s = *self.stack.current();
        self.paint_rect(x, y, w, h, s.fill, s.alpha);
    }

    fn stroke_rect(&mut self, x: f64, y: f64, w: f64, h: f64) {
        let stroke = self.stack.current().stroke;
        let step_x = self.cell_w / 2.0;
        let step_y = self.cell_h / 2.0;
        let mut t = 0.0;
        while t <= w {
            self.put_glyph('─', x + t, y, Some(stroke));
            self.put_glyph('─', x + t, y + h, Some(stroke));
            t += step_x;
        }
        let mut t = 0.0;
        while t <= h {
            self.put_glyph('│', x, y + t, Some(stroke));
            self.put_glyph('│', x + w, y + t, Some(stroke));
            t += step_y;
        }
    }

    fn fill_arc(&mut self, cx: f64, cy: f64, r: f64, start: f64, end: f64) {
        let fill = self.stack.current().fill;
        self.paint_arc(cx, cy, r, start, end, fill, false);
    }

    fn stroke_arc(&mut self, cx: f64, cy: f64, r: f64, start: f64, end: f64) {
        let stroke = self.stack.current().stroke;
        self.paint_arc(cx, cy, r, start, end, stroke, true);
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64) {
        let fill = self.stack.current().fill;
        self.put_text(text, x, y, fill);
    }

    fn stroke_text(&mut self, text: &str, x: f64, y: f64) {
        let stroke = self.stack.current().stroke;
        self.put_text(text, x, y, stroke);
    }
}
