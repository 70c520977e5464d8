/// Sound engine: procedural 8-bit style music and effects via rodio.
///
/// All sounds are generated as in-memory WAV buffers at init time.
/// One-shot effects are fire-and-forget; `music` and `tense` loop on their
/// own sink until stopped. Fades are linear volume ramps advanced by
/// `tick`.
///
/// Compile without the "sound" feature to disable audio entirely; without
/// an output device the silent `NullAudio` is used.

use tracing::warn;

/// Looping background tune.
pub const MUSIC: &str = "music";
/// Looping pulse under the last seconds of a session.
pub const TENSE: &str = "tense";
pub const GEM: &str = "gem";
pub const HIT: &str = "hit";
pub const TIMEOUT: &str = "timeout";
pub const DEFEAT: &str = "defeat";
pub const VICTORY: &str = "victory";

/// Seconds for a fade to run its course.
#[cfg(any(feature = "sound", test))]
pub const FADE_SECS: f64 = 1.5;

/// Fire-and-forget audio sink. Unknown keys are ignored.
pub trait AudioProvider {
    fn play(&mut self, key: &str);
    fn stop(&mut self, key: &str);
    fn fade_in(&mut self, key: &str);
    fn fade_out(&mut self, key: &str);
    /// Advance running fades by `dt` seconds.
    fn tick(&mut self, dt: f64);
}

/// Silent provider.
pub struct NullAudio;

impl AudioProvider for NullAudio {
    fn play(&mut self, _key: &str) {}
    fn stop(&mut self, _key: &str) {}
    fn fade_in(&mut self, _key: &str) {}
    fn fade_out(&mut self, _key: &str) {}
    fn tick(&mut self, _dt: f64) {}
}

/// A linear volume ramp.
#[cfg(any(feature = "sound", test))]
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Ramp {
    from: f32,
    to: f32,
    elapsed: f64,
    duration: f64,
}

#[cfg(any(feature = "sound", test))]
impl Ramp {
    pub fn new(from: f32, to: f32, duration: f64) -> Self {
        Ramp { from, to, elapsed: 0.0, duration }
    }

    /// Step forward; returns the volume to apply.
    pub fn advance(&mut self, dt: f64) -> f32 {
        self.elapsed += dt.max(0.0);
        self.volume()
    }

    pub fn volume(&self) -> f32 {
        if self.duration <= 0.0 {
            return self.to;
        }
        let t = (self.elapsed / self.duration).clamp(0.0, 1.0) as f32;
        self.from + (self.to - self.from) * t
    }

    pub fn done(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Ends in silence.
    pub fn is_fade_out(&self) -> bool {
        self.to <= 0.0
    }
}

/// Open the output device, falling back to silence.
pub fn open() -> Box<dyn AudioProvider> {
    #[cfg(feature = "sound")]
    {
        if let Some(engine) = inner::SoundEngine::new() {
            return Box::new(engine);
        }
    }
    warn!("no audio output, running silent");
    Box::new(NullAudio)
}

#[cfg(feature = "sound")]
mod inner {
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink, Source};
    use tracing::{debug, info};

    use super::*;

    const SAMPLE_RATE: u32 = 22050;

    struct Loop {
        sink: Sink,
        ramp: Option<Ramp>,
    }

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        buffers: HashMap<&'static str, Arc<Vec<u8>>>,
        loops: HashMap<&'static str, Loop>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = OutputStream::try_default().ok()?;

            // ── Generate all sound buffers ──
            let buffers: HashMap<_, _> = [
                (MUSIC, gen_music()),
                (TENSE, gen_tense()),
                (GEM, gen_gem()),
                (HIT, gen_hit()),
                (TIMEOUT, gen_timeout()),
                (DEFEAT, gen_defeat()),
                (VICTORY, gen_victory()),
            ]
            .into_iter()
            .map(|(key, samples)| (key, Arc::new(make_wav(&samples))))
            .collect();
            info!(sounds = buffers.len(), "audio ready");

            Some(SoundEngine { _stream: stream, handle, buffers, loops: HashMap::new() })
        }

        fn is_loop(key: &str) -> bool {
            key == MUSIC || key == TENSE
        }

        fn decode(&self, key: &str) -> Option<(&'static str, rodio::Decoder<Cursor<Vec<u8>>>)> {
            let (&name, buf) = self.buffers.get_key_value(key)?;
            let src = rodio::Decoder::new(Cursor::new(buf.as_ref().clone())).ok()?;
            Some((name, src))
        }

        fn play_once(&self, key: &str) {
            let Some((_, src)) = self.decode(key) else { return };
            if let Ok(sink) = Sink::try_new(&self.handle) {
                sink.append(src);
                sink.detach(); // fire-and-forget
            }
        }

        /// Start a loop at `volume` unless it is already running.
        fn start_loop(&mut self, key: &str, volume: f32) -> bool {
            if self.loops.contains_key(key) {
                return false;
            }
            let Some((name, src)) = self.decode(key) else { return false };
            let Ok(sink) = Sink::try_new(&self.handle) else { return false };
            sink.set_volume(volume);
            sink.append(src.repeat_infinite());
            self.loops.insert(name, Loop { sink, ramp: None });
            true
        }
    }

    impl AudioProvider for SoundEngine {
        fn play(&mut self, key: &str) {
            if Self::is_loop(key) {
                self.start_loop(key, 1.0);
            } else {
                self.play_once(key);
            }
        }

        fn stop(&mut self, key: &str) {
            if let Some(l) = self.loops.remove(key) {
                l.sink.stop();
            }
        }

        fn fade_in(&mut self, key: &str) {
            if !Self::is_loop(key) {
                self.play_once(key);
                return;
            }
            self.start_loop(key, 0.0);
            if let Some(l) = self.loops.get_mut(key) {
                l.ramp = Some(Ramp::new(l.sink.volume(), 1.0, FADE_SECS));
            }
        }

        fn fade_out(&mut self, key: &str) {
            if let Some(l) = self.loops.get_mut(key) {
                l.ramp = Some(Ramp::new(l.sink.volume(), 0.0, FADE_SECS));
            }
        }

        fn tick(&mut self, dt: f64) {
            let mut finished = Vec::new();
            for (&key, l) in self.loops.iter_mut() {
                let Some(ramp) = l.ramp.as_mut() else { continue };
                l.sink.set_volume(ramp.advance(dt));
                if ramp.done() {
                    if ramp.is_fade_out() {
                        finished.push(key);
                    }
                    l.ramp = None;
                }
            }
            for key in finished {
                debug!(key, "fade out complete");
                self.stop(key);
            }
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators: all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    const TAU: f32 = std::f32::consts::PI * 2.0;

    /// One note: sine plus a touch of third harmonic, linear decay to `sustain`.
    fn note(samples: &mut Vec<f32>, freq: f32, dur: f32, volume: f32, sustain: f32) {
        let n = (SAMPLE_RATE as f32 * dur) as usize;
        for i in 0..n {
            let t = i as f32 / SAMPLE_RATE as f32;
            let env = 1.0 - (i as f32 / n as f32) * (1.0 - sustain);
            let wave = (t * freq * TAU).sin() * 0.75 + (t * freq * 3.0 * TAU).sin() * 0.25;
            samples.push(wave * env * volume);
        }
    }

    fn rest(samples: &mut Vec<f32>, dur: f32) {
        let n = (SAMPLE_RATE as f32 * dur) as usize;
        samples.extend(std::iter::repeat(0.0).take(n));
    }

    /// Background loop: a lazy eight-bar arpeggio in C.
    fn gen_music() -> Vec<f32> {
        let bars: [[f32; 4]; 4] = [
            [262.0, 330.0, 392.0, 330.0], // C
            [220.0, 262.0, 330.0, 262.0], // Am
            [175.0, 220.0, 262.0, 220.0], // F
            [196.0, 247.0, 294.0, 247.0], // G
        ];
        let mut samples = Vec::new();
        for _ in 0..2 {
            for bar in &bars {
                for &freq in bar {
                    note(&mut samples, freq, 0.22, 0.12, 0.4);
                    rest(&mut samples, 0.03);
                }
            }
        }
        samples
    }

    /// Tense loop: ticking low pulse, two beats a second.
    fn gen_tense() -> Vec<f32> {
        let mut samples = Vec::new();
        for &freq in &[110.0_f32, 104.0] {
            note(&mut samples, freq, 0.12, 0.3, 0.0);
            rest(&mut samples, 0.38);
        }
        samples
    }

    /// Gem pickup: quick ascending arpeggio C6→E6→G6
    fn gen_gem() -> Vec<f32> {
        let mut samples = Vec::new();
        for &freq in &[1047.0_f32, 1319.0, 1568.0] {
            note(&mut samples, freq, 0.045, 0.25, 0.0);
        }
        samples
    }

    /// Hit: short noise burst with descending pitch
    fn gen_hit() -> Vec<f32> {
        let duration = 0.12;
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut rng: u32 = 12345;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = 200.0 + (1.0 - t) * 300.0;
                let ti = i as f32 / SAMPLE_RATE as f32;
                let tone = (ti * freq * TAU).sin();
                // Simple LCG noise
                rng = rng.wrapping_mul(1103515245).wrapping_add(12345);
                let noise = (rng as f32 / u32::MAX as f32) * 2.0 - 1.0;
                let env = (1.0 - t).powf(0.8);
                (tone * 0.4 + noise * 0.6) * env * 0.3
            })
            .collect()
    }

    /// Timeout: three flat buzzer beeps
    fn gen_timeout() -> Vec<f32> {
        let mut samples = Vec::new();
        for _ in 0..3 {
            note(&mut samples, 220.0, 0.15, 0.3, 0.8);
            rest(&mut samples, 0.08);
        }
        samples
    }

    /// Defeat: sad descending tone A4→F#4→Eb4→C4
    fn gen_defeat() -> Vec<f32> {
        let mut samples = Vec::new();
        for &freq in &[440.0_f32, 370.0, 311.0, 261.0] {
            note(&mut samples, freq, 0.12, 0.3, 0.7);
        }
        let fade_len = samples.len() / 4;
        let total = samples.len();
        for (i, s) in samples.iter_mut().enumerate().skip(total - fade_len) {
            *s *= (total - i) as f32 / fade_len as f32;
        }
        samples
    }

    /// Victory: ascending fanfare C5→E5→G5→C6, last note held
    fn gen_victory() -> Vec<f32> {
        let mut samples = Vec::new();
        for &freq in &[523.0_f32, 659.0, 784.0] {
            note(&mut samples, freq, 0.1, 0.3, 0.7);
        }
        note(&mut samples, 1047.0, 0.35, 0.3, 0.0);
        samples
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: wraps f32 samples into a valid WAV buffer
    // ════════════════════════════════════════════════════════════

    pub(super) fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2;
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        // RIFF header
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        // fmt chunk
        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM format
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        // data chunk
        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());

        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }

        buf
    }

}

#[cfg(test)]
pub use recording::Recording;

#[cfg(test)]
mod recording {
    use super::AudioProvider;

    /// Provider that records every call as `"verb:key"`.
    #[derive(Default)]
    pub struct Recording {
        pub calls: Vec<String>,
    }

    impl AudioProvider for Recording {
        fn play(&mut self, key: &str) {
            self.calls.push(format!("play:{key}"));
        }
        fn stop(&mut self, key: &str) {
            self.calls.push(format!("stop:{key}"));
        }
        fn fade_in(&mut self, key: &str) {
            self.calls.push(format!("fade_in:{key}"));
        }
        fn fade_out(&mut self, key: &str) {
            self.calls.push(format!("fade_out:{key}"));
        }
        fn tick(&mut self, _dt: f64) {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramp_reaches_target_and_holds() {
        let mut r = Ramp::new(0.0, 1.0, 1.0);
        assert_eq!(r.advance(0.5), 0.5);
        assert!(!r.done());
        assert_eq!(r.advance(2.0), 1.0);
        assert!(r.done());
        assert!(!r.is_fade_out());
    }

    #[test]
    fn fade_out_ramp_starts_from_current_volume() {
        let mut r = Ramp::new(0.4, 0.0, 2.0);
        assert!(r.is_fade_out());
        assert!((r.advance(1.0) - 0.2).abs() < 1e-6);
        // time never runs backwards
        assert!((r.advance(-5.0) - 0.2).abs() < 1e-6);
    }

    #[test]
    fn zero_length_ramp_jumps() {
        let r = Ramp::new(1.0, 0.0, 0.0);
        assert_eq!(r.volume(), 0.0);
        assert!(r.done());
    }
}
