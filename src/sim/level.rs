/// Level data: layered maps, code → asset tables and shadow keys.
///
/// ## Sources (priority order):
///   1. `[general] map_file` from config.toml (TOML document)
///   2. Built-in embedded levels
///
/// ## Map file format:
///   ```toml
///   cols = 20
///   shadow_threshold = "C"     # optional
///   levels = [
///     """
///     BBBB...
///     """,
///     "....",
///   ]
///   ```
///
/// Whitespace inside a level string is ignored, so each row may sit on
/// its own line. Every level must have the same size.
///
/// ## Terrain legend:
///   'A' ramp-west   'B' water       'C' stone       'D' dirt
///   'E' brown       'F' plain       'G' grass       'H' stone-tall
///   'I' wood        'J' ramp-east   'K' ramp-north  'L' ramp-south
///   'M' wall        'O' wall-tall   '.' empty

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::entity::{ENEMY_SPRITE, PLAYER_DAMAGE_SPRITE, PLAYER_SPRITE};
use crate::domain::shadow::{ShadowDir, SHADOW_SLOTS};
use crate::domain::tile::{MapError, TileMap, EMPTY};

/// Codes at or above this one are structural and receive shadows.
pub const DEFAULT_SHADOW_THRESHOLD: char = 'C';

const TERRAIN: &[(char, &str)] = &[
    ('A', "ramp-west"),
    ('B', "water-block"),
    ('C', "stone-block"),
    ('D', "dirt-block"),
    ('E', "brown-block"),
    ('F', "plain-block"),
    ('G', "grass-block"),
    ('H', "stone-tall-block"),
    ('I', "wood-block"),
    ('J', "ramp-east"),
    ('K', "ramp-north"),
    ('L', "ramp-south"),
    ('M', "wall-block"),
    ('O', "wall-block-tall"),
];

const ITEMS: &[(char, &str)] = &[
    ('1', "gem-blue"),
    ('2', "gem-green"),
    ('3', "gem-orange"),
];

/// Indexed by `ShadowDir::slot()`.
const SHADOWS: [&str; SHADOW_SLOTS] = [
    "shadow-north",
    "shadow-north-east",
    "shadow-east",
    "shadow-south-east",
    "shadow-south",
    "shadow-south-west",
    "shadow-west",
    "shadow-north-west",
    "shadow-side-south",
    "shadow-side-south-west",
];

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("map file parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Map(#[from] MapError),
    #[error("unknown tile code {code:?} on level {level}")]
    UnknownCode { level: usize, code: char },
    #[error("shadow threshold must be a single character, got {0:?}")]
    BadThreshold(String),
}

/// Runtime level data (owned strings, loaded from file or embedded).
#[derive(Clone, Debug, PartialEq)]
pub struct LevelDef {
    pub name: String,
    pub cols: usize,
    pub levels: Vec<String>,
    pub shadow_threshold: char,
}

#[derive(Deserialize)]
struct MapFile {
    #[serde(default)]
    name: Option<String>,
    cols: usize,
    #[serde(default)]
    shadow_threshold: Option<String>,
    levels: Vec<String>,
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

impl LevelDef {
    /// Configured map file if it loads cleanly, otherwise the built-in set.
    pub fn load(map_file: Option<&Path>) -> LevelDef {
        let Some(path) = map_file else {
            return LevelDef::builtin();
        };
        match LevelDef::from_file(path) {
            Ok(def) => {
                info!(path = %path.display(), name = %def.name, "loaded map file");
                def
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "map file rejected, using built-in levels");
                LevelDef::builtin()
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<LevelDef, LevelError> {
        let text = std::fs::read_to_string(path).map_err(|source| LevelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let fallback_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        LevelDef::from_toml_str(&text, &fallback_name)
    }

    pub fn from_toml_str(text: &str, fallback_name: &str) -> Result<LevelDef, LevelError> {
        let file: MapFile = toml::from_str(text)?;
        let shadow_threshold = match file.shadow_threshold {
            None => DEFAULT_SHADOW_THRESHOLD,
            Some(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => c,
                    _ => return Err(LevelError::BadThreshold(s)),
                }
            }
        };
        let def = LevelDef {
            name: file.name.unwrap_or_else(|| fallback_name.to_string()),
            cols: file.cols,
            levels: file.levels,
            shadow_threshold,
        };
        def.validate()?;
        Ok(def)
    }

    /// The two-layer garden maze shipped with the game.
    pub fn builtin() -> LevelDef {
        LevelDef {
            name: "Walled Garden".to_string(),
            cols: 20,
            levels: vec![GROUND.concat(), WALLS.concat()],
            shadow_threshold: DEFAULT_SHADOW_THRESHOLD,
        }
    }

    pub fn build_map(&self) -> Result<TileMap, MapError> {
        TileMap::new(&self.levels, self.cols)
    }

    /// The map must build and every code must have a terrain sprite.
    pub fn validate(&self) -> Result<(), LevelError> {
        self.build_map()?;
        for (level, tiles) in self.levels.iter().enumerate() {
            if let Some(code) = tiles
                .chars()
                .filter(|c| !c.is_whitespace() && *c != EMPTY)
                .find(|&c| terrain_key(c).is_none())
            {
                return Err(LevelError::UnknownCode { level, code });
            }
        }
        Ok(())
    }
}

pub fn terrain_key(code: char) -> Option<&'static str> {
    lookup(TERRAIN, code)
}

pub fn item_key(code: char) -> Option<&'static str> {
    lookup(ITEMS, code)
}

pub fn item_codes() -> Vec<char> {
    ITEMS.iter().map(|&(c, _)| c).collect()
}

pub fn shadow_key(dir: ShadowDir) -> &'static str {
    SHADOWS[dir.slot()]
}

/// Every sprite the game can ask for, to be loaded before the first frame.
pub fn all_asset_keys() -> Vec<&'static str> {
    let mut keys: Vec<&'static str> = TERRAIN.iter().map(|&(_, k)| k).collect();
    keys.extend(ITEMS.iter().map(|&(_, k)| k));
    keys.extend(SHADOWS);
    keys.extend([PLAYER_SPRITE, PLAYER_DAMAGE_SPRITE, ENEMY_SPRITE]);
    keys
}

fn lookup(table: &[(char, &'static str)], code: char) -> Option<&'static str> {
    table.iter().find(|&&(c, _)| c == code).map(|&(_, k)| k)
}

// ══════════════════════════════════════════════════════════════
// Embedded levels
// ══════════════════════════════════════════════════════════════

const GROUND: [&str; 34] = [
    "BBBBBBBBBBBBBBBBBBBB",
    ".GGGGGGGGGGGGGGGGGGG",
    ".CCCCCCCCCCCCCCCCCC.",
    ".CCCCCCCCCCCCCCCCCC.",
    ".CCCCCCCCCCCCCCCCCC.",
    ".CCCGGGGGGGGGGGGCCC.",
    ".CCCGGGGGGGGGGGGCCC.",
    ".CCCGGGGGGGGGGGGCCC.",
    ".CCCGGGGGGGGGGGGCCC.",
    ".CCCGGG..GG..GGGCCC.",
    ".CCCGGGCCGGCCGGGCCC.",
    ".CCCGCCGG..GGCCGCCC.",
    ".CCCGCCGGCCGGCCGCCC.",
    ".CCCGGGCCGGCCGGGCCC.",
    ".CCCGGGCCGGCCGGGCCC.",
    ".CCCGGGGGCCGGGGGCCC.",
    ".CCCGGGGGCCGGGGGCCC.",
    ".CCCGGGGGGGGGGGGCCC.",
    ".CCCGGGGGGGGGGGGCCC.",
    ".CCCGGGGGGCGGGGGCCC.",
    ".CCCGGGGGCCCGGGGCCC.",
    ".CCCGGGGGGCGGGGGCCC.",
    ".CCCGGCCCCCCCCCGCCC.",
    ".CCCGGGGCCCCCGGGCCC.",
    ".CCCGGGGGCCCGGGGCCC.",
    ".CCCGGGGGCCCGGGGCCC.",
    ".CCCGGGGGCGCGGGGCCC.",
    ".CCCGGGGGCGCGGGGCCC.",
    ".CCCGGGGGCGCGGGGCCC.",
    ".CCCGGGGGGGGGGGGCCC.",
    ".CCCCCCCCCCCCCCCCCC.",
    ".CCCCCCCCCCCCCCCCCC.",
    ".CCCCCCCCCCCCCCCCCC.",
    "....................",
];

const WALLS: [&str; 34] = [
    "....................",
    "MMMMMMMMMMMMMMMMMMMM",
    "M..................M",
    "M..................M",
    "M..................M",
    "M..................M",
    "M........KK........M",
    "M........CC........M",
    "M........CC........M",
    "M.....ACCCCCCJ.....M",
    "M.....ACCCCCCJ.....M",
    "M........CC........M",
    "M........CC........M",
    "M........LL........M",
    "M..................M",
    "M..................M",
    "M..................M",
    "M..................M",
    "M..................M",
    "M..................M",
    "M..................M",
    "M..................M",
    "M..................M",
    "M..................M",
    "M..................M",
    "M..................M",
    "M..................M",
    "M..................M",
    "M..................M",
    "M..................M",
    "M..................M",
    "M..................M",
    "M..................M",
    "MMMMMMMMMMMMMMMMMMMM",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_levels_are_valid() {
        let def = LevelDef::builtin();
        def.validate().unwrap();
        let map = def.build_map().unwrap();
        assert_eq!(map.num_levels(), 2);
        assert_eq!(map.num_cols(), 20);
        assert_eq!(map.num_rows(), 34);
        assert_eq!(map.tile_at(1, 9, 6), Some('A'));
    }

    #[test]
    fn every_code_in_use_has_a_sprite() {
        let map = LevelDef::builtin().build_map().unwrap();
        for code in map.codes() {
            assert!(terrain_key(code).is_some(), "no sprite for {code:?}");
        }
    }

    #[test]
    fn asset_keys_are_distinct() {
        let mut keys = all_asset_keys();
        let total = keys.len();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), total);
        assert_eq!(total, TERRAIN.len() + ITEMS.len() + SHADOW_SLOTS + 3);
    }

    #[test]
    fn shadow_keys_follow_slot_order() {
        assert_eq!(shadow_key(ShadowDir::North), "shadow-north");
        assert_eq!(shadow_key(ShadowDir::SideSouthWest), "shadow-side-south-west");
    }

    #[test]
    fn parses_map_file() {
        let text = r#"
            name = "Tiny"
            cols = 3
            shadow_threshold = "M"
            levels = ["GGG GGG", """
                M.M
                ...
            """]
        "#;
        let def = LevelDef::from_toml_str(text, "tiny").unwrap();
        assert_eq!(def.name, "Tiny");
        assert_eq!(def.shadow_threshold, 'M');
        let map = def.build_map().unwrap();
        assert_eq!(map.num_rows(), 2);
        assert_eq!(map.tile_at(1, 0, 2), Some('M'));
    }

    #[test]
    fn rejects_unknown_codes() {
        let text = r#"cols = 2
levels = ["GZ"]"#;
        let err = LevelDef::from_toml_str(text, "x").unwrap_err();
        assert!(matches!(err, LevelError::UnknownCode { level: 0, code: 'Z' }));
    }

    #[test]
    fn rejects_bad_geometry() {
        let text = r#"cols = 3
levels = ["GGGG"]"#;
        let err = LevelDef::from_toml_str(text, "x").unwrap_err();
        assert!(matches!(err, LevelError::Map(MapError::RaggedLevel { .. })));
    }

    #[test]
    fn rejects_long_threshold() {
        let text = r#"cols = 1
shadow_threshold = "CC"
levels = ["G"]"#;
        assert!(matches!(
            LevelDef::from_toml_str(text, "x").unwrap_err(),
            LevelError::BadThreshold(_)
        ));
    }

    #[test]
    fn missing_map_file_falls_back() {
        let def = LevelDef::load(Some(Path::new("/nonexistent/tilequest-map.toml")));
        assert_eq!(def, LevelDef::builtin());
    }
}
