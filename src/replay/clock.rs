/// Sampling rate of the recorded frames
pub const FPS: f64 = 25.;
pub const MIN_SPEED: f64 = 0.1;
pub const MAX_SPEED: f64 = 128.;
pub const DEFAULT_SPEED: f64 = 1.;
/// Frames skipped by a single rewind / fast forward
pub const SEEK_STEP_FRAMES: f64 = 10.;
pub const SPEED_PRESETS: [f64; 4] = [0.5, 1., 2., 4.];

/// Continuous playback position over a discrete set of frames.
///
/// `frame_index` is fractional so that slow speeds still make progress
/// between redraws; the renderer uses its floor.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackClock {
    frame_index: f64,
    paused: bool,
    speed: f64,
    total_frames: usize,
    fps: f64,
}

impl PlaybackClock {
    pub fn new(total_frames: usize) -> Self {
        Self {
            frame_index: 0.,
            paused: false,
            speed: DEFAULT_SPEED,
            total_frames,
            fps: FPS,
        }
    }

    pub fn frame_index(&self) -> f64 {
        self.frame_index
    }

    /// Frame the renderer should draw.
    pub fn current_frame(&self) -> usize {
        self.frame_index.floor() as usize
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    fn last_frame(&self) -> f64 {
        self.total_frames.saturating_sub(1) as f64
    }

    /// Advances by the wall-clock time elapsed since the last tick.
    pub fn tick(&mut self, delta_seconds: f64) {
        if self.paused || !delta_seconds.is_finite() {
            return;
        }
        self.frame_index =
            (self.frame_index + delta_seconds * self.fps * self.speed).clamp(0., self.last_frame());
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    pub fn seek_relative(&mut self, frames: f64) {
        self.seek_to(self.frame_index + frames);
    }

    pub fn seek_to(&mut self, frame_index: f64) {
        if frame_index.is_nan() {
            return;
        }
        self.frame_index = frame_index.clamp(0., self.last_frame());
    }

    pub fn rewind(&mut self) {
        self.seek_relative(-SEEK_STEP_FRAMES);
    }

    pub fn fast_forward(&mut self) {
        self.seek_relative(SEEK_STEP_FRAMES);
    }

    /// Direct assignment, deliberately not clamped to
    /// `[MIN_SPEED, MAX_SPEED]` unlike the doubling/halving controls.
    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed;
    }

    pub fn increase_speed(&mut self) {
        self.speed = (self.speed * 2.).min(MAX_SPEED);
    }

    pub fn decrease_speed(&mut self) {
        self.speed = (self.speed / 2.).max(MIN_SPEED);
    }

    /// Moves to the preset after the current speed, or the first preset if
    /// the current speed is not one of them.
    pub fn cycle_speed_preset(&mut self) {
        let next = SPEED_PRESETS
            .iter()
            .position(|preset| *preset == self.speed)
            .map(|i| (i + 1) % SPEED_PRESETS.len())
            .unwrap_or(0);
        self.set_speed(SPEED_PRESETS[next]);
    }

    /// Back to the first frame at normal speed. The pause state is kept.
    pub fn restart(&mut self) {
        self.frame_index = 0.;
        self.speed = DEFAULT_SPEED;
    }
}
