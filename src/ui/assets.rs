/// Asset store: built-in sprite catalog served by key.
///
/// Sprites are flat-shaded boxes in map pixels. Every block shares the
/// 101 x 171 footprint of the tile art: a top face 83 px tall starting 50 px
/// down (the tile top gap) and a side face beneath it.
///
/// `load` resolves a batch of keys all-or-nothing. A missing key is a
/// configuration error reported before the first frame is drawn.

use std::collections::HashMap;

use thiserror::Error;
use tracing::info;

use crate::domain::entity::{
    ENEMY_SPRITE, PLAYER_DAMAGE_SPRITE, PLAYER_SPRITE, SPRITE_HEIGHT, SPRITE_WIDTH,
};
use crate::domain::tile::{TILE_HEIGHT, TILE_TOP_GAP, TILE_WIDTH};
use super::surface::{Rgb, Sprite, SpritePart};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssetError {
    #[error("no sprite registered for asset key {0:?}")]
    MissingKey(String),
}

/// Side face depth below the top face.
const SIDE_DEPTH: f64 = SPRITE_HEIGHT - TILE_TOP_GAP - TILE_HEIGHT;
/// Extra height of the tall blocks.
const TALL_RISE: f64 = 40.0;
const SHADOW_ALPHA: f64 = 0.35;
const SHADOW_BAND: f64 = 25.0;

type ReadyCallback = Box<dyn FnOnce()>;

#[derive(Default)]
pub struct AssetStore {
    sprites: HashMap<String, Sprite>,
    ready: bool,
    waiting: Vec<ReadyCallback>,
}

impl AssetStore {
    pub fn new() -> Self {
        AssetStore::default()
    }

    /// Resolve every key against the catalog. Nothing is stored unless
    /// all keys resolve.
    pub fn load(&mut self, keys: &[&str]) -> Result<(), AssetError> {
        let mut batch = Vec::with_capacity(keys.len());
        for &key in keys {
            let sprite = catalog(key).ok_or_else(|| AssetError::MissingKey(key.to_string()))?;
            batch.push((key.to_string(), sprite));
        }
        self.sprites.extend(batch);
        info!(count = keys.len(), total = self.sprites.len(), "assets loaded");

        if !self.ready {
            self.ready = true;
            for callback in self.waiting.drain(..) {
                callback();
            }
        }
        Ok(())
    }

    /// Run `callback` once the first batch has loaded; immediately if it
    /// already has.
    pub fn on_ready(&mut self, callback: impl FnOnce() + 'static) {
        if self.ready {
            callback();
        } else {
            self.waiting.push(Box::new(callback));
        }
    }

    #[cfg(test)]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn get(&self, key: &str) -> Option<&Sprite> {
        self.sprites.get(key)
    }
}

// ══════════════════════════════════════════════════════════════
// Catalog
// ══════════════════════════════════════════════════════════════

fn catalog(key: &str) -> Option<Sprite> {
    let sprite = match key {
        "ramp-west" => block(Rgb::new(150, 150, 150), Some('<')),
        "water-block" => block(Rgb::new(60, 110, 200), Some('~')),
        "stone-block" => block(Rgb::new(128, 128, 128), None),
        "dirt-block" => block(Rgb::new(150, 100, 60), None),
        "brown-block" => block(Rgb::new(120, 80, 50), None),
        "plain-block" => block(Rgb::new(190, 170, 120), None),
        "grass-block" => block(Rgb::new(80, 160, 70), Some('"')),
        "stone-tall-block" => tall_block(Rgb::new(110, 110, 115), None),
        "wood-block" => block(Rgb::new(160, 120, 70), Some('=')),
        "ramp-east" => block(Rgb::new(150, 150, 150), Some('>')),
        "ramp-north" => block(Rgb::new(150, 150, 150), Some('^')),
        "ramp-south" => block(Rgb::new(150, 150, 150), Some('v')),
        "wall-block" => block(Rgb::new(170, 90, 70), Some('#')),
        "wall-block-tall" => tall_block(Rgb::new(170, 90, 70), Some('#')),

        "gem-blue" => gem(Rgb::new(70, 130, 255)),
        "gem-green" => gem(Rgb::new(60, 210, 90)),
        "gem-orange" => gem(Rgb::new(255, 150, 40)),

        "shadow-north" => shadow(0.0, 0.0, TILE_WIDTH, SHADOW_BAND),
        "shadow-north-east" => shadow(TILE_WIDTH - SHADOW_BAND, 0.0, SHADOW_BAND, SHADOW_BAND),
        "shadow-east" => shadow(TILE_WIDTH - SHADOW_BAND, 0.0, SHADOW_BAND, TILE_HEIGHT),
        "shadow-south-east" => shadow(
            TILE_WIDTH - SHADOW_BAND,
            TILE_HEIGHT - SHADOW_BAND,
            SHADOW_BAND,
            SHADOW_BAND,
        ),
        "shadow-south" => shadow(0.0, TILE_HEIGHT - SHADOW_BAND, TILE_WIDTH, SHADOW_BAND),
        "shadow-south-west" => shadow(0.0, TILE_HEIGHT - SHADOW_BAND, SHADOW_BAND, SHADOW_BAND),
        "shadow-west" => shadow(0.0, 0.0, SHADOW_BAND, TILE_HEIGHT),
        "shadow-north-west" => shadow(0.0, 0.0, SHADOW_BAND, SHADOW_BAND),
        // cast onto the side face of the block below
        "shadow-side-south" => shadow(0.0, TILE_HEIGHT, TILE_WIDTH, SIDE_DEPTH),
        "shadow-side-south-west" => shadow(0.0, TILE_HEIGHT, SHADOW_BAND, SIDE_DEPTH),

        k if k == PLAYER_SPRITE => figure(Rgb::new(240, 130, 190)),
        k if k == PLAYER_DAMAGE_SPRITE => figure(Rgb::new(230, 40, 40)),
        k if k == ENEMY_SPRITE => bug(),
        _ => return None,
    };
    Some(sprite)
}

fn darker(c: Rgb) -> Rgb {
    c.blend(Rgb::BLACK, 0.35)
}

fn sprite(parts: Vec<SpritePart>) -> Sprite {
    Sprite { width: SPRITE_WIDTH, height: SPRITE_HEIGHT, alpha: 1.0, parts }
}

fn part(x: f64, y: f64, w: f64, h: f64, color: Rgb, glyph: Option<char>) -> SpritePart {
    SpritePart { x, y, w, h, color, glyph }
}

fn block(top: Rgb, glyph: Option<char>) -> Sprite {
    sprite(vec![
        part(0.0, TILE_TOP_GAP, TILE_WIDTH, TILE_HEIGHT, top, glyph),
        part(0.0, TILE_TOP_GAP + TILE_HEIGHT, TILE_WIDTH, SIDE_DEPTH, darker(top), None),
    ])
}

fn tall_block(top: Rgb, glyph: Option<char>) -> Sprite {
    let face = TILE_TOP_GAP - TALL_RISE;
    sprite(vec![
        part(0.0, face, TILE_WIDTH, TILE_HEIGHT, top, glyph),
        part(0.0, face + TILE_HEIGHT, TILE_WIDTH, SIDE_DEPTH + TALL_RISE, darker(top), None),
    ])
}

fn gem(color: Rgb) -> Sprite {
    sprite(vec![part(30.0, 70.0, 41.0, 45.0, color, Some('*'))])
}

/// Shadows are drawn in the tile's top-face frame.
fn shadow(x: f64, y: f64, w: f64, h: f64) -> Sprite {
    let mut s = sprite(vec![part(x, TILE_TOP_GAP + y, w, h, Rgb::BLACK, None)]);
    s.alpha = SHADOW_ALPHA;
    s
}

fn figure(body: Rgb) -> Sprite {
    sprite(vec![
        part(30.0, 60.0, 41.0, 35.0, Rgb::new(250, 220, 180), None),
        part(25.0, 95.0, 51.0, 45.0, body, Some('@')),
    ])
}

fn bug() -> Sprite {
    sprite(vec![
        part(5.0, 80.0, 90.0, 55.0, Rgb::new(200, 40, 40), Some('x')),
        part(70.0, 90.0, 25.0, 35.0, Rgb::new(40, 20, 20), None),
    ])
}
