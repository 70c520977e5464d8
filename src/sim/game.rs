/// Game: the phase machine wrapped around an optional live session.
///
/// Owns configuration, level data and the random source. Input is applied
/// immediately; everything time-driven happens in `tick`, which performs
/// at most one phase transition per call. Transition guards compare
/// wall-clock time since phase entry, so a long stall still walks through
/// every intermediate phase.

use rand::rngs::StdRng;
use rand::Rng;
use tracing::{info, warn};

use crate::config::GameConfig;
use crate::domain::entity::Entity;
use super::event::{Direction, GameEvent, InputEvent, Outcome};
use super::level::LevelDef;
use super::state::{Phase, StateMachine};
use super::step;
use super::world::GameContext;

#[derive(Debug, Default)]
pub struct TickOutcome {
    /// Something visible changed; the frame should be redrawn.
    pub dirty: bool,
    pub quit: bool,
    pub events: Vec<GameEvent>,
}

pub struct Game<R: Rng = StdRng> {
    config: GameConfig,
    level: LevelDef,
    rng: R,
    state: StateMachine,
    ctx: Option<GameContext>,
    outcome: Option<Outcome>,
    canvas: (f64, f64),
    debug: bool,
    quit: bool,
    /// Set by input handling, cleared by the next tick.
    dirty: bool,
    pending: Vec<GameEvent>,
}

impl<R: Rng> Game<R> {
    pub fn new(config: GameConfig, level: LevelDef, rng: R, canvas: (f64, f64), now: f64) -> Self {
        let debug = config.display.debug;
        Game {
            config,
            level,
            rng,
            state: StateMachine::new(now),
            ctx: None,
            outcome: None,
            canvas,
            debug,
            quit: false,
            dirty: true,
            pending: Vec::new(),
        }
    }

    // ── Accessors ──

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn context(&self) -> Option<&GameContext> {
        self.ctx.as_ref()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    #[cfg(test)]
    pub fn canvas(&self) -> (f64, f64) {
        self.canvas
    }

    /// Opacity of the current phase's overlay, if it has one.
    pub fn overlay_alpha(&self, now: f64) -> Option<f64> {
        self.state.overlay_alpha(&self.config.timing, now)
    }

    /// Session seconds left; the full limit before play starts.
    pub fn remaining_secs(&self, now: f64) -> f64 {
        let limit = self.config.rules.time_limit_secs;
        match (&self.ctx, self.state.phase()) {
            (Some(ctx), Phase::InGame) => ctx.remaining(now, limit).max(0.0),
            (Some(ctx), Phase::Finished) => ctx.remaining(self.finished_at(now), limit).max(0.0),
            _ => limit,
        }
    }

    // ── Input ──

    pub fn handle_input(&mut self, event: InputEvent, now: f64) {
        match event {
            InputEvent::Direction(dir) => self.impulse(dir),
            InputEvent::Pointer { x, y } => self.pointer(x, y),
            InputEvent::Start => {
                if self.state.phase() == Phase::Menu {
                    self.transition(Phase::MenuHide, now);
                }
            }
            InputEvent::Quit => {
                if self.state.phase() == Phase::Menu {
                    info!("quit requested");
                    self.quit = true;
                } else {
                    self.abort(now);
                }
            }
            InputEvent::ToggleDebug => {
                self.debug = !self.debug;
                self.dirty = true;
            }
            InputEvent::Resize { width, height } => {
                self.canvas = (width, height);
                if let Some(ctx) = self.ctx.as_mut() {
                    ctx.set_canvas(width, height);
                }
                self.dirty = true;
            }
        }
    }

    fn live_player(&mut self) -> Option<&mut Entity> {
        if self.state.phase() != Phase::InGame {
            return None;
        }
        self.ctx.as_mut().map(|ctx| &mut ctx.player)
    }

    fn impulse(&mut self, dir: Direction) {
        let impulse = self.config.rules.impulse;
        if let Some(player) = self.live_player() {
            let (ux, uy) = dir.unit();
            player.push(ux * impulse, uy * impulse);
        }
    }

    /// Push the player toward a canvas point, scaled to one impulse.
    fn pointer(&mut self, x: f64, y: f64) {
        let impulse = self.config.rules.impulse;
        let Some(ctx) = self.ctx.as_ref() else { return };
        let (px, py) = ctx.viewport.to_screen(ctx.player.center_x(), ctx.player.center_y());
        let (dx, dy) = (x - px, y - py);
        let len = dx.hypot(dy);
        if len <= f64::EPSILON || !len.is_finite() {
            return;
        }
        if let Some(player) = self.live_player() {
            player.push(dx / len * impulse, dy / len * impulse);
        }
    }

    // ── Tick ──

    pub fn tick(&mut self, now: f64, dt: f64) -> TickOutcome {
        let mut out = TickOutcome {
            dirty: std::mem::take(&mut self.dirty),
            quit: self.quit,
            events: std::mem::take(&mut self.pending),
        };
        if self.quit {
            return out;
        }

        let phase = self.state.phase();
        match phase {
            Phase::Menu => {}
            Phase::InGame => self.tick_in_game(now, dt, &mut out),
            _ => {
                out.dirty = true;
                if let Some(next) = self.state.due(&self.config.timing, now) {
                    self.advance(next, now, &mut out);
                }
            }
        }
        if self.state.phase() != phase {
            out.dirty = true;
        }
        out
    }

    fn tick_in_game(&mut self, now: f64, dt: f64, out: &mut TickOutcome) {
        let rules = &self.config.rules;
        let tense_secs = self.config.timing.tense_secs;
        let Some(ctx) = self.ctx.as_mut() else {
            warn!("in game without a session, back to menu");
            self.transition(Phase::Menu, now);
            return;
        };

        let result = step::step(ctx, rules, now, dt);
        // the HUD timer changes every tick even when nothing moves
        out.dirty = true;
        out.events.extend(result.events);

        let remaining = ctx.remaining(now, rules.time_limit_secs);
        if !ctx.tense_started && remaining <= tense_secs {
            ctx.tense_started = true;
            out.events.push(GameEvent::TimeRunningOut);
        }

        if let Some(outcome) = finish_check(ctx, rules.required_items, remaining) {
            let gems = ctx.player.player_state().map_or(0, |p| p.gems);
            info!(?outcome, gems, "session finished");
            self.outcome = Some(outcome);
            out.events.push(GameEvent::SessionFinished(outcome));
            self.transition(Phase::Finished, now);
        }
    }

    /// Leave a fade phase for `next`, running its entry work.
    fn advance(&mut self, next: Phase, now: f64, out: &mut TickOutcome) {
        match next {
            Phase::MenuFadeOut => {
                // screen is fully dark: swap in a fresh session
                match GameContext::new(&self.level, &self.config.rules, self.canvas, &mut self.rng) {
                    Ok(ctx) => {
                        self.ctx = Some(ctx);
                        self.outcome = None;
                    }
                    Err(e) => {
                        warn!(error = %e, "session reset failed");
                        self.transition(Phase::Menu, now);
                        return;
                    }
                }
            }
            Phase::InGame => {
                if let Some(ctx) = self.ctx.as_mut() {
                    ctx.started_at = now;
                }
                out.events.push(GameEvent::SessionStarted);
            }
            Phase::Menu => {
                self.ctx = None;
            }
            _ => {}
        }
        self.transition(next, now);
    }

    /// Quit outside the menu drops the session and returns to the menu.
    fn abort(&mut self, now: f64) {
        if self.state.phase() == Phase::InGame {
            self.pending.push(GameEvent::SessionAborted);
        }
        self.ctx = None;
        self.transition(Phase::Menu, now);
    }

    fn transition(&mut self, next: Phase, now: f64) {
        let from = self.state.phase();
        self.state.enter(next, now);
        self.dirty = true;
        info!(?from, to = ?next, "phase change");
    }

    /// Wall-clock second the session ended, for a frozen HUD timer.
    fn finished_at(&self, now: f64) -> f64 {
        now - self.state.elapsed(now)
    }
}

/// Defeat beats victory beats timeout when several hold on the same tick.
fn finish_check(ctx: &GameContext, required_items: u32, remaining: f64) -> Option<Outcome> {
    let state = ctx.player.player_state()?;
    if state.life == 0 {
        Some(Outcome::Defeat)
    } else if state.gems >= required_items {
        Some(Outcome::Victory)
    } else if remaining <= 0.0 {
        Some(Outcome::Timeout)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn game() -> Game {
        let mut config = GameConfig::default();
        config.rules.min_enemies = 0;
        config.rules.max_enemies = 0;
        config.rules.item_count = 0;
        Game::new(config, LevelDef::builtin(), StdRng::seed_from_u64(1), (505.0, 606.0), 0.0)
    }

    /// Drive a game from the menu into play, one tick per phase.
    fn in_game(start: f64) -> Game {
        let mut g = game();
        g.handle_input(InputEvent::Start, start);
        g.tick(start + 1.0, 0.016);
        g.tick(start + 3.0, 0.016);
        g.tick(start + 5.0, 0.016);
        assert_eq!(g.phase(), Phase::InGame);
        g
    }

    #[test]
    fn start_walks_every_phase_even_with_huge_spikes() {
        let mut g = game();
        assert_eq!(g.phase(), Phase::Menu);
        g.handle_input(InputEvent::Start, 0.0);
        assert_eq!(g.phase(), Phase::MenuHide);

        let mut seen = vec![g.phase()];
        let mut now = 0.0;
        for _ in 0..3 {
            now += 1000.0;
            g.tick(now, 0.1);
            seen.push(g.phase());
        }
        assert_eq!(
            seen,
            vec![Phase::MenuHide, Phase::MenuFadeIn, Phase::MenuFadeOut, Phase::InGame]
        );
    }

    #[test]
    fn fades_hold_until_their_duration() {
        let mut g = game();
        g.handle_input(InputEvent::Start, 0.0);
        g.tick(0.4, 0.016);
        assert_eq!(g.phase(), Phase::MenuHide);
        g.tick(0.5, 0.016);
        assert_eq!(g.phase(), Phase::MenuFadeIn);
        assert!(g.context().is_none());
        g.tick(1.4, 0.016);
        assert_eq!(g.phase(), Phase::MenuFadeIn);
        g.tick(1.5, 0.016);
        assert_eq!(g.phase(), Phase::MenuFadeOut);
        assert!(g.context().is_some());
    }

    #[test]
    fn entering_play_starts_the_clock_and_music() {
        let mut g = game();
        g.handle_input(InputEvent::Start, 0.0);
        g.tick(1.0, 0.016);
        g.tick(3.0, 0.016);
        let out = g.tick(5.0, 0.016);
        assert_eq!(out.events, vec![GameEvent::SessionStarted]);
        assert_eq!(g.remaining_secs(5.0), 60.0);
        assert_eq!(g.remaining_secs(15.0), 50.0);
    }

    #[test]
    fn directions_only_push_in_game() {
        let mut g = game();
        g.handle_input(InputEvent::Start, 0.0);
        g.tick(1.0, 0.016);
        g.tick(3.0, 0.016);
        g.handle_input(InputEvent::Direction(Direction::Left), 3.5);
        assert_eq!(g.context().map(|c| c.player.vx), Some(0.0));

        let mut g = in_game(0.0);
        g.handle_input(InputEvent::Direction(Direction::Left), 6.0);
        g.handle_input(InputEvent::Direction(Direction::Down), 6.0);
        let p = &g.context().unwrap().player;
        assert_eq!((p.vx, p.vy), (-100.0, 100.0));
    }

    #[test]
    fn pointer_push_is_normalized() {
        let mut g = in_game(0.0);
        let (px, py) = {
            let ctx = g.context().unwrap();
            ctx.viewport.to_screen(ctx.player.center_x(), ctx.player.center_y())
        };
        g.handle_input(InputEvent::Pointer { x: px + 30.0, y: py + 40.0 }, 6.0);
        let p = &g.context().unwrap().player;
        assert!((p.vx - 60.0).abs() < 1e-9);
        assert!((p.vy - 80.0).abs() < 1e-9);
    }

    #[test]
    fn pointer_on_the_player_is_ignored() {
        let mut g = in_game(0.0);
        let (px, py) = {
            let ctx = g.context().unwrap();
            ctx.viewport.to_screen(ctx.player.center_x(), ctx.player.center_y())
        };
        g.handle_input(InputEvent::Pointer { x: px, y: py }, 6.0);
        let p = &g.context().unwrap().player;
        assert_eq!((p.vx, p.vy), (0.0, 0.0));
        assert!(p.vx.is_finite());
    }

    #[test]
    fn timeout_finishes_once_then_returns_to_menu() {
        let mut g = in_game(0.0);
        let out = g.tick(66.0, 0.016);
        assert!(out.events.contains(&GameEvent::TimeRunningOut));
        assert!(out.events.contains(&GameEvent::SessionFinished(Outcome::Timeout)));
        assert_eq!(g.phase(), Phase::Finished);
        assert_eq!(g.outcome(), Some(Outcome::Timeout));

        let out = g.tick(67.0, 0.016);
        assert!(out.events.is_empty());
        g.tick(69.0, 0.016);
        assert_eq!(g.phase(), Phase::Menu);
        assert!(g.context().is_none());
    }

    #[test]
    fn tense_cue_fires_once() {
        let mut g = in_game(0.0);
        let out = g.tick(56.0, 0.016);
        assert_eq!(out.events, vec![GameEvent::TimeRunningOut]);
        let out = g.tick(57.0, 0.016);
        assert!(out.events.is_empty());
    }

    #[test]
    fn zero_life_is_defeat() {
        let mut g = in_game(0.0);
        if let Some(ctx) = g.ctx.as_mut() {
            ctx.player.player_state_mut().unwrap().life = 0;
        }
        let out = g.tick(6.0, 0.016);
        assert!(out.events.contains(&GameEvent::SessionFinished(Outcome::Defeat)));
    }

    #[test]
    fn required_gems_is_victory() {
        let mut g = in_game(0.0);
        if let Some(ctx) = g.ctx.as_mut() {
            ctx.player.player_state_mut().unwrap().gems = 10;
        }
        g.tick(6.0, 0.016);
        assert_eq!(g.outcome(), Some(Outcome::Victory));
    }

    #[test]
    fn quit_in_game_returns_to_menu() {
        let mut g = in_game(0.0);
        g.handle_input(InputEvent::Quit, 6.0);
        assert_eq!(g.phase(), Phase::Menu);
        let out = g.tick(6.1, 0.016);
        assert_eq!(out.events, vec![GameEvent::SessionAborted]);
        assert!(!out.quit);
    }

    #[test]
    fn quit_from_menu_exits() {
        let mut g = game();
        g.handle_input(InputEvent::Quit, 0.0);
        assert!(g.tick(0.1, 0.016).quit);
    }

    #[test]
    fn idle_menu_is_not_redrawn() {
        let mut g = game();
        assert!(g.tick(0.0, 0.0).dirty);
        assert!(!g.tick(0.1, 0.016).dirty);
        g.handle_input(InputEvent::ToggleDebug, 0.2);
        assert!(g.tick(0.2, 0.016).dirty);
        assert!(g.debug());
    }

    #[test]
    fn resize_reaches_the_viewport() {
        let mut g = in_game(0.0);
        g.handle_input(InputEvent::Resize { width: 800.0, height: 400.0 }, 6.0);
        let ctx = g.context().unwrap();
        assert_eq!((ctx.canvas_w, ctx.canvas_h), (800.0, 400.0));
        assert_eq!(g.canvas(), (800.0, 400.0));
    }
}
