/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::path::PathBuf;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub rules: RulesConfig,
    pub timing: TimingConfig,
    pub display: DisplayConfig,
    pub gamepad: GamepadConfig,
    pub general: GeneralConfig,
}

#[derive(Clone, Debug)]
pub struct RulesConfig {
    pub time_limit_secs: f64,
    pub item_count: usize,
    pub required_items: u32,
    pub min_enemies: usize,
    pub max_enemies: usize,
    pub impulse: f64,            // velocity added per directional intent
    pub damage_amount: u32,
    pub damage_cooldown_secs: f64,
    pub gem_time_bonus_secs: f64,
}

#[derive(Clone, Debug)]
pub struct TimingConfig {
    pub tick_rate_ms: u64,
    pub max_dt_secs: f64,        // physics dt clamp after stalls
    pub menu_hide_secs: f64,
    pub fade_in_secs: f64,
    pub fade_out_secs: f64,
    pub finished_secs: f64,
    pub tense_secs: f64,         // remaining time that starts the tense loop
}

#[derive(Clone, Debug)]
pub struct DisplayConfig {
    pub cell_width_px: f64,
    pub cell_height_px: f64,
    pub debug: bool,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct GeneralConfig {
    pub log_file: PathBuf,
    /// External level file; `None` uses the built-in levels.
    pub map_file: Option<PathBuf>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    rules: TomlRules,
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    display: TomlDisplay,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlRules {
    #[serde(default = "default_time_limit")]
    time_limit_secs: f64,
    #[serde(default = "default_item_count")]
    item_count: usize,
    #[serde(default = "default_required_items")]
    required_items: u32,
    #[serde(default = "default_min_enemies")]
    min_enemies: usize,
    #[serde(default = "default_max_enemies")]
    max_enemies: usize,
    #[serde(default = "default_impulse")]
    impulse: f64,
    #[serde(default = "default_damage_amount")]
    damage_amount: u32,
    #[serde(default = "default_damage_cooldown")]
    damage_cooldown_secs: f64,
    #[serde(default = "default_gem_bonus")]
    gem_time_bonus_secs: f64,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_max_dt")]
    max_dt_secs: f64,
    #[serde(default = "default_menu_hide")]
    menu_hide_secs: f64,
    #[serde(default = "default_fade_in")]
    fade_in_secs: f64,
    #[serde(default = "default_fade_out")]
    fade_out_secs: f64,
    #[serde(default = "default_finished")]
    finished_secs: f64,
    #[serde(default = "default_tense")]
    tense_secs: f64,
}

#[derive(Deserialize, Debug)]
struct TomlDisplay {
    #[serde(default = "default_cell_width")]
    cell_width_px: f64,
    #[serde(default = "default_cell_height")]
    cell_height_px: f64,
    #[serde(default)]
    debug: bool,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_confirm")]
    confirm: Vec<String>,
    #[serde(default = "default_cancel")]
    cancel: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_log_file")]
    log_file: String,
    #[serde(default)]
    map_file: String,
}

// ── Defaults ──

fn default_time_limit() -> f64 { 60.0 }
fn default_item_count() -> usize { 10 }
fn default_required_items() -> u32 { 10 }
fn default_min_enemies() -> usize { 15 }
fn default_max_enemies() -> usize { 30 }
fn default_impulse() -> f64 { 100.0 }
fn default_damage_amount() -> u32 { 10 }
fn default_damage_cooldown() -> f64 { 1.0 }
fn default_gem_bonus() -> f64 { 2.0 }

fn default_tick_rate() -> u64 { 16 }
fn default_max_dt() -> f64 { 0.1 }
fn default_menu_hide() -> f64 { 0.5 }
fn default_fade_in() -> f64 { 1.0 }
fn default_fade_out() -> f64 { 1.0 }
fn default_finished() -> f64 { 3.0 }
fn default_tense() -> f64 { 10.0 }

fn default_cell_width() -> f64 { 17.0 }   // ~6 columns per tile
fn default_cell_height() -> f64 { 21.0 }  // ~4 rows per tile

fn default_confirm() -> Vec<String> { vec!["Start".into(), "A".into()] }
fn default_cancel() -> Vec<String> { vec!["Select".into()] }
fn default_log_file() -> String { "tilequest.log".into() }

impl Default for TomlRules {
    fn default() -> Self {
        TomlRules {
            time_limit_secs: default_time_limit(),
            item_count: default_item_count(),
            required_items: default_required_items(),
            min_enemies: default_min_enemies(),
            max_enemies: default_max_enemies(),
            impulse: default_impulse(),
            damage_amount: default_damage_amount(),
            damage_cooldown_secs: default_damage_cooldown(),
            gem_time_bonus_secs: default_gem_bonus(),
        }
    }
}

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming {
            tick_rate_ms: default_tick_rate(),
            max_dt_secs: default_max_dt(),
            menu_hide_secs: default_menu_hide(),
            fade_in_secs: default_fade_in(),
            fade_out_secs: default_fade_out(),
            finished_secs: default_finished(),
            tense_secs: default_tense(),
        }
    }
}

impl Default for TomlDisplay {
    fn default() -> Self {
        TomlDisplay {
            cell_width_px: default_cell_width(),
            cell_height_px: default_cell_height(),
            debug: false,
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            confirm: default_confirm(),
            cancel: default_cancel(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            log_file: default_log_file(),
            map_file: String::new(),
        }
    }
}

// ── Loading ──

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::from_toml(TomlConfig::default(), &[])
    }
}

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        GameConfig::from_toml(toml_cfg, &search_dirs)
    }

    /// Parse a config document. Relative map paths stay relative to CWD.
    #[allow(dead_code)]
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        let toml_cfg = toml::from_str::<TomlConfig>(text)?;
        Ok(GameConfig::from_toml(toml_cfg, &[]))
    }

    fn from_toml(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        let rules = toml_cfg.rules;
        let timing = toml_cfg.timing;
        let display = toml_cfg.display;

        // Unresolved names stay CWD-relative.
        let map_file = match toml_cfg.general.map_file.trim() {
            "" => None,
            name => Some(resolve_path(name, search_dirs)),
        };

        GameConfig {
            rules: RulesConfig {
                time_limit_secs: rules.time_limit_secs,
                item_count: rules.item_count,
                required_items: rules.required_items,
                min_enemies: rules.min_enemies,
                // an inverted range collapses to the minimum
                max_enemies: rules.max_enemies.max(rules.min_enemies),
                impulse: rules.impulse,
                damage_amount: rules.damage_amount,
                damage_cooldown_secs: rules.damage_cooldown_secs,
                gem_time_bonus_secs: rules.gem_time_bonus_secs,
            },
            timing: TimingConfig {
                tick_rate_ms: timing.tick_rate_ms.max(1),
                max_dt_secs: timing.max_dt_secs,
                menu_hide_secs: timing.menu_hide_secs,
                fade_in_secs: timing.fade_in_secs,
                fade_out_secs: timing.fade_out_secs,
                finished_secs: timing.finished_secs,
                tense_secs: timing.tense_secs,
            },
            display: DisplayConfig {
                cell_width_px: display.cell_width_px.max(1.0),
                cell_height_px: display.cell_height_px.max(1.0),
                debug: display.debug,
            },
            gamepad: GamepadConfig {
                confirm: toml_cfg.gamepad.confirm,
                cancel: toml_cfg.gamepad.cancel,
            },
            general: GeneralConfig {
                log_file: PathBuf::from(toml_cfg.general.log_file),
                map_file,
            },
        }
    }
}

/// Absolute paths are kept; relative ones are looked up in the search dirs.
fn resolve_path(name: &str, search_dirs: &[PathBuf]) -> PathBuf {
    let path = PathBuf::from(name);
    if path.is_absolute() {
        return path;
    }
    search_dirs.iter()
        .map(|d| d.join(name))
        .find(|p| p.is_file())
        .unwrap_or(path)
}

/// Candidate directories to search: exe dir + CWD + system paths (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home (~/.local/share/tilequest)
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/tilequest");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    // 4. System data directory (/usr/share/tilequest)
    let sys = PathBuf::from("/usr/share/tilequest");
    if sys.is_dir() && !dirs.iter().any(|d| d == &sys) {
        dirs.push(sys);
    }

    // 5. Fallback
    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
/// Runs before logging is up, so problems go to stderr.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        eprintln!("Warning: config.toml parse error: {e}");
                        eprintln!("Using default settings.");
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    eprintln!("Warning: could not read {}: {e}", path.display());
                }
            }
        }
    }
    TomlConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let cfg = GameConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.rules.time_limit_secs, 60.0);
        assert_eq!(cfg.rules.item_count, 10);
        assert_eq!(cfg.rules.min_enemies, 15);
        assert_eq!(cfg.rules.max_enemies, 30);
        assert_eq!(cfg.timing.tick_rate_ms, 16);
        assert_eq!(cfg.timing.tense_secs, 10.0);
        assert_eq!(cfg.gamepad.confirm, vec!["Start".to_string(), "A".to_string()]);
        assert_eq!(cfg.general.log_file, PathBuf::from("tilequest.log"));
        assert!(cfg.general.map_file.is_none());
        assert!(!cfg.display.debug);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = GameConfig::from_toml_str(
            "[rules]\ntime_limit_secs = 30\nimpulse = 80.0\n[display]\ndebug = true\n",
        )
        .unwrap();
        assert_eq!(cfg.rules.time_limit_secs, 30.0);
        assert_eq!(cfg.rules.impulse, 80.0);
        assert_eq!(cfg.rules.damage_amount, 10);
        assert!(cfg.display.debug);
        assert_eq!(cfg.display.cell_width_px, 17.0);
    }

    #[test]
    fn inverted_enemy_range_collapses() {
        let cfg = GameConfig::from_toml_str("[rules]\nmin_enemies = 8\nmax_enemies = 3\n").unwrap();
        assert_eq!((cfg.rules.min_enemies, cfg.rules.max_enemies), (8, 8));
    }

    #[test]
    fn map_file_is_optional() {
        let cfg = GameConfig::from_toml_str("[general]\nmap_file = \"/tmp/maze.toml\"\n").unwrap();
        assert_eq!(cfg.general.map_file, Some(PathBuf::from("/tmp/maze.toml")));
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(GameConfig::from_toml_str("[rules\n").is_err());
    }
}
