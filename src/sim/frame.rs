/// Frame clock: turns wall-clock instants into tick deltas.
///
/// `advance` reports the raw delta since the previous tick and a copy
/// clamped to `max_dt` for physics, so a stall (terminal resize, suspend)
/// cannot teleport entities through walls.

#[derive(Clone, Debug)]
pub struct FrameClock {
    last: Option<f64>,
    max_dt: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameTime {
    pub now: f64,
    pub raw_dt: f64,
    pub dt: f64,
}

impl FrameClock {
    pub fn new(max_dt: f64) -> Self {
        FrameClock { last: None, max_dt: max_dt.max(0.0) }
    }

    /// Record a tick at `now` seconds. The first tick has a zero delta;
    /// a clock running backwards is treated as zero too.
    pub fn advance(&mut self, now: f64) -> FrameTime {
        let raw_dt = match self.last {
            Some(last) => (now - last).max(0.0),
            None => 0.0,
        };
        self.last = Some(now);
        FrameTime { now, raw_dt, dt: raw_dt.min(self.max_dt) }
    }
}
