/// Entry point and game loop.

mod config;
mod domain;
mod sim;
mod ui;

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use config::GameConfig;
use sim::event::{GameEvent, InputEvent, Outcome};
use sim::frame::FrameClock;
use sim::game::Game;
use sim::level::{all_asset_keys, LevelDef};
use ui::assets::AssetStore;
use ui::gamepad::GamepadState;
use ui::input::InputState;
use ui::renderer::TermSurface;
use ui::sound::{self, AudioProvider};

const FRAME_SLEEP: Duration = Duration::from_millis(5);

fn main() {
    let config = GameConfig::load();
    init_tracing(&config.general.log_file);
    info!(version = env!("CARGO_PKG_VERSION"), "starting tilequest");

    let level = LevelDef::load(config.general.map_file.as_deref());

    let mut assets = AssetStore::new();
    assets.on_ready(|| debug!("sprite catalog ready"));
    if let Err(e) = assets.load(&all_asset_keys()) {
        error!(%e, "asset load failed");
        eprintln!("Asset load failed: {e}");
        return;
    }

    let mut surface = TermSurface::new(config.display.cell_width_px, config.display.cell_height_px);
    if let Err(e) = surface.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let mut audio = sound::open();

    let result = game_loop(&mut surface, audio.as_mut(), &assets, &config, level);

    if let Err(e) = surface.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        error!(%e, "game loop failed");
        eprintln!("Game error: {e}");
    }
    info!("bye");
}

/// Log to `path`; the terminal belongs to the renderer. Without a
/// writable log file, logging goes nowhere.
fn init_tracing(path: &Path) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .compact();
    let installed = match File::create(path) {
        Ok(file) => builder.with_writer(Mutex::new(file)).try_init(),
        Err(e) => {
            eprintln!("Cannot open log file {}: {e}", path.display());
            builder.with_writer(std::io::sink).try_init()
        }
    };
    if let Err(e) = installed {
        eprintln!("Logging disabled: {e}");
    }
}

fn game_loop(
    surface: &mut TermSurface,
    audio: &mut dyn AudioProvider,
    assets: &AssetStore,
    config: &GameConfig,
    level: LevelDef,
) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();
    let clock_now = || start.elapsed().as_secs_f64();

    surface.sync_size()?;
    let (cols, rows) = crossterm::terminal::size()?;
    let canvas = surface.canvas_for(cols, rows);
    let mut game = Game::new(config.clone(), level, StdRng::from_entropy(), canvas, clock_now());

    let mut kb = InputState::new(config.display.cell_width_px, config.display.cell_height_px);
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    if gp.connected {
        info!("gamepad connected");
    }

    let mut clock = FrameClock::new(config.timing.max_dt_secs);
    let mut last_tick = Instant::now();
    let tick_rate = Duration::from_millis(config.timing.tick_rate_ms);
    let mut dirty = true;

    loop {
        let now = clock_now();
        let mut events = kb.drain_events();
        events.extend(gp.events(now));

        if kb.ctrl_c_pressed() {
            break;
        }

        if surface.sync_size()? {
            let (cols, rows) = crossterm::terminal::size()?;
            let (width, height) = surface.canvas_for(cols, rows);
            events.push(InputEvent::Resize { width, height });
            dirty = true;
        }

        for ev in events {
            game.handle_input(ev, now);
        }

        if last_tick.elapsed() >= tick_rate {
            let frame = clock.advance(clock_now());
            let outcome = game.tick(frame.now, frame.dt);
            process_sound_events(audio, &outcome.events);
            audio.tick(frame.raw_dt);
            dirty |= outcome.dirty;

            if dirty {
                ui::draw::render(surface, &game, assets, frame.now);
                surface.present()?;
                dirty = false;
            }
            if outcome.quit {
                break;
            }
            last_tick = Instant::now();
        }

        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

fn process_sound_events(audio: &mut dyn AudioProvider, events: &[GameEvent]) {
    for event in events {
        match event {
            GameEvent::SessionStarted => audio.fade_in(sound::MUSIC),
            GameEvent::TimeRunningOut => audio.play(sound::TENSE),
            GameEvent::GemCollected { .. } => audio.play(sound::GEM),
            GameEvent::PlayerHit { .. } => audio.play(sound::HIT),
            GameEvent::SessionFinished(outcome) => {
                audio.stop(sound::TENSE);
                audio.fade_out(sound::MUSIC);
                audio.play(match outcome {
                    Outcome::Timeout => sound::TIMEOUT,
                    Outcome::Defeat => sound::DEFEAT,
                    Outcome::Victory => sound::VICTORY,
                });
            }
            GameEvent::SessionAborted => {
                audio.stop(sound::TENSE);
                audio.stop(sound::MUSIC);
            }
        }
    }
}
