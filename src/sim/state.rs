/// Game phases and their timed fades.
///
/// Cycle:
///   Menu → MenuHide → MenuFadeIn → (session reset) → MenuFadeOut
///        → InGame → Finished → Menu
///
/// Every phase except `Menu` and `InGame` is time-boxed: it lasts a fixed
/// number of wall-clock seconds after entry, during which a full-screen
/// overlay interpolates linearly between two opacities.

use crate::config::TimingConfig;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Menu,
    MenuHide,
    MenuFadeIn,
    MenuFadeOut,
    InGame,
    Finished,
}

/// A linear opacity ramp.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Fade {
    pub duration: f64,
    pub from: f64,
    pub to: f64,
}

impl Fade {
    pub fn alpha(&self, elapsed: f64) -> f64 {
        if self.duration <= 0.0 {
            return self.to;
        }
        let t = (elapsed / self.duration).clamp(0.0, 1.0);
        self.from + (self.to - self.from) * t
    }

    pub fn done(&self, elapsed: f64) -> bool {
        elapsed >= self.duration
    }
}

impl Phase {
    /// Overlay ramp of a time-boxed phase. `MenuHide` fades the menu
    /// itself, the others fade a dark curtain.
    pub fn fade(self, timing: &TimingConfig) -> Option<Fade> {
        match self {
            Phase::MenuHide => Some(Fade { duration: timing.menu_hide_secs, from: 1.0, to: 0.0 }),
            Phase::MenuFadeIn => Some(Fade { duration: timing.fade_in_secs, from: 0.0, to: 1.0 }),
            Phase::MenuFadeOut => Some(Fade { duration: timing.fade_out_secs, from: 1.0, to: 0.0 }),
            Phase::Finished => Some(Fade { duration: timing.finished_secs, from: 0.0, to: 0.7 }),
            Phase::Menu | Phase::InGame => None,
        }
    }

    /// Phase that follows once this one's fade is done.
    pub fn after_fade(self) -> Option<Phase> {
        match self {
            Phase::MenuHide => Some(Phase::MenuFadeIn),
            Phase::MenuFadeIn => Some(Phase::MenuFadeOut),
            Phase::MenuFadeOut => Some(Phase::InGame),
            Phase::Finished => Some(Phase::Menu),
            Phase::Menu | Phase::InGame => None,
        }
    }
}

/// Current phase plus the wall-clock second it was entered.
#[derive(Clone, Debug)]
pub struct StateMachine {
    phase: Phase,
    entered_at: f64,
}

impl StateMachine {
    pub fn new(now: f64) -> Self {
        StateMachine { phase: Phase::Menu, entered_at: now }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn elapsed(&self, now: f64) -> f64 {
        (now - self.entered_at).max(0.0)
    }

    pub fn enter(&mut self, phase: Phase, now: f64) {
        self.phase = phase;
        self.entered_at = now;
    }

    /// The next phase if the current fade has run its course.
    pub fn due(&self, timing: &TimingConfig, now: f64) -> Option<Phase> {
        let fade = self.phase.fade(timing)?;
        if fade.done(self.elapsed(now)) {
            self.phase.after_fade()
        } else {
            None
        }
    }

    /// Overlay opacity right now, `None` outside time-boxed phases.
    pub fn overlay_alpha(&self, timing: &TimingConfig, now: f64) -> Option<f64> {
        self.phase.fade(timing).map(|f| f.alpha(self.elapsed(now)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;

    fn timing() -> TimingConfig {
        GameConfig::default().timing
    }

    #[test]
    fn fade_interpolates_linearly() {
        let f = Fade { duration: 2.0, from: 0.0, to: 1.0 };
        assert_eq!(f.alpha(-1.0), 0.0);
        assert_eq!(f.alpha(1.0), 0.5);
        assert_eq!(f.alpha(5.0), 1.0);
        assert!(!f.done(1.99));
        assert!(f.done(2.0));
    }

    #[test]
    fn zero_duration_fade_is_immediate() {
        let f = Fade { duration: 0.0, from: 1.0, to: 0.0 };
        assert_eq!(f.alpha(0.0), 0.0);
        assert!(f.done(0.0));
    }

    #[test]
    fn cycle_order() {
        let mut phase = Phase::MenuHide;
        let mut seen = vec![phase];
        while let Some(next) = phase.after_fade() {
            phase = next;
            seen.push(phase);
        }
        assert_eq!(seen, vec![Phase::MenuHide, Phase::MenuFadeIn, Phase::MenuFadeOut, Phase::InGame]);
        assert_eq!(Phase::Finished.after_fade(), Some(Phase::Menu));
    }

    #[test]
    fn due_waits_for_the_fade() {
        let t = timing();
        let mut sm = StateMachine::new(0.0);
        assert_eq!(sm.due(&t, 100.0), None);
        sm.enter(Phase::MenuHide, 10.0);
        assert_eq!(sm.due(&t, 10.25), None);
        assert_eq!(sm.overlay_alpha(&t, 10.25), Some(0.5));
        assert_eq!(sm.due(&t, 10.5), Some(Phase::MenuFadeIn));
    }
}
