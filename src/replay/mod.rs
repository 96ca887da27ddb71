pub mod clock;
pub mod frame_store;
pub mod geometry;
pub mod render;
pub mod selection;
pub mod track_status;

use std::{ops::Range, sync::Arc, time::Duration};

use log::{debug, info};

use crate::{
    backend::FrameSource,
    errors::ReplayError,
    session::{Frame, Session},
};

use clock::PlaybackClock;
use frame_store::{BATCH_SIZE, FetchKind, FrameStore};
use geometry::{Point, TrackGeometry};
use render::{DriverInfo, LeaderboardEntry, RenderPlan};
use selection::{HIT_RADIUS, Selection, hit_test};

/// Operations of the keyboard, toolbar and timeline on the playback clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackCommand {
    TogglePause,
    Rewind,
    FastForward,
    IncreaseSpeed,
    DecreaseSpeed,
    SetSpeed(f64),
    CycleSpeedPreset,
    Restart,
    SeekTo(f64),
}

impl PlaybackCommand {
    pub fn apply(self, clock: &mut PlaybackClock) {
        match self {
            PlaybackCommand::TogglePause => clock.toggle_pause(),
            PlaybackCommand::Rewind => clock.rewind(),
            PlaybackCommand::FastForward => clock.fast_forward(),
            PlaybackCommand::IncreaseSpeed => clock.increase_speed(),
            PlaybackCommand::DecreaseSpeed => clock.decrease_speed(),
            PlaybackCommand::SetSpeed(speed) => clock.set_speed(speed),
            PlaybackCommand::CycleSpeedPreset => clock.cycle_speed_preset(),
            PlaybackCommand::Restart => clock.restart(),
            PlaybackCommand::SeekTo(frame_index) => clock.seek_to(frame_index),
        }
    }
}

/// Owns one replay: the session metadata, the derived track geometry, the
/// frame cache, the clock and the selection.
///
/// Everything is driven from a single thread. The host calls
/// [`ReplayController::advance`] once per redraw with the elapsed wall-clock
/// time, then [`ReplayController::render_plan`] to know what to paint.
/// Frame batches are fetched in the background and merged during `advance`.
pub struct ReplayController {
    session: Session,
    geometry: TrackGeometry,
    store: FrameStore,
    clock: PlaybackClock,
    selection: Selection,
    // playback holds still until the first batch has landed
    primed: bool,
    // last batch that failed, until its frames have arrived some other way
    failed_batch: Option<Range<usize>>,
    surface_size: (f64, f64),
}

impl ReplayController {
    /// Prepares the replay and starts fetching the first batch.
    pub fn new(
        session: Session,
        source: Arc<dyn FrameSource>,
        surface_width: f64,
        surface_height: f64,
    ) -> Self {
        let geometry = TrackGeometry::new(
            session.track_layout.points(),
            session.rotation_degrees(),
            surface_width,
            surface_height,
        );
        let store = FrameStore::new(source, &session.session_id, session.total_frames);
        let clock = PlaybackClock::new(session.total_frames);
        let mut controller = Self {
            session,
            geometry,
            store,
            clock,
            selection: Selection::default(),
            primed: false,
            failed_batch: None,
            surface_size: (surface_width, surface_height),
        };
        controller.load_initial_batch();
        controller
    }

    /// Switches to another session, dropping every cached frame, the
    /// selection and the playback position.
    pub fn reload(&mut self, session: Session, source: Arc<dyn FrameSource>) {
        info!("Reloading replay with session {}", session.session_id);
        let (width, height) = self.surface_size;
        self.geometry = TrackGeometry::new(
            session.track_layout.points(),
            session.rotation_degrees(),
            width,
            height,
        );
        self.store
            .reset(source, &session.session_id, session.total_frames);
        self.clock = PlaybackClock::new(session.total_frames);
        self.selection.clear();
        self.session = session;
        self.primed = false;
        self.failed_batch = None;
        self.load_initial_batch();
    }

    fn load_initial_batch(&mut self) {
        let count = BATCH_SIZE.min(self.session.total_frames);
        info!(
            "Loading initial frames 0 to {} of {}",
            count, self.session.total_frames
        );
        self.store.request(0, count, FetchKind::Foreground);
        self.update_primed();
    }

    fn update_primed(&mut self) {
        if !self.primed && !self.store.is_pending(0) {
            debug!("Initial batch done, starting playback");
            self.primed = true;
        }
    }

    /// Merges finished fetches and moves the clock forward by
    /// `delta_seconds`. Returns the fetch failures the operator should see.
    pub fn advance(&mut self, delta_seconds: f64) -> Vec<ReplayError> {
        let errors = self.store.poll(self.clock.frame_index());
        self.track_failures(&errors);
        self.update_primed();
        if self.primed {
            self.clock.tick(delta_seconds);
        }
        errors
    }

    /// Blocks until no fetch is running, or `timeout` has passed.
    pub fn wait_for_frames(&mut self, timeout: Duration) -> Vec<ReplayError> {
        let errors = self.store.wait_idle(timeout, self.clock.frame_index());
        self.track_failures(&errors);
        self.update_primed();
        errors
    }

    fn track_failures(&mut self, errors: &[ReplayError]) {
        if let Some(ReplayError::FrameBatchError {
            start_index,
            end_index,
            ..
        }) = errors.last()
        {
            self.failed_batch = Some(*start_index..*end_index);
            return;
        }
        let recovered = self
            .failed_batch
            .as_ref()
            .is_some_and(|range| self.store.is_range_loaded(range.clone()));
        if recovered {
            info!("Frames {:?} recovered", self.failed_batch);
            self.failed_batch = None;
        }
    }

    /// Whether a batch failed and its frames are still missing.
    pub fn has_fetch_failure(&self) -> bool {
        self.failed_batch.is_some()
    }

    pub fn resize(&mut self, surface_width: f64, surface_height: f64) {
        if self.surface_size == (surface_width, surface_height) {
            return;
        }
        debug!("Drawing surface resized to {surface_width}x{surface_height}");
        self.surface_size = (surface_width, surface_height);
        self.geometry.resize(surface_width, surface_height);
    }

    /// What to draw for the current position. A missing frame schedules a
    /// recovery fetch and yields a track-only plan.
    pub fn render_plan(&mut self) -> RenderPlan {
        let index = self.clock.current_frame();
        if self.primed && !self.store.is_loaded(index) {
            self.store.ensure_loaded(index);
        }
        render::build_render_plan(
            &self.session,
            &self.geometry,
            index,
            self.store.get(index),
            &self.selection,
            self.clock.speed(),
        )
    }

    pub fn apply(&mut self, command: PlaybackCommand) {
        command.apply(&mut self.clock);
    }

    /// Toggles the car under `pointer`, if any. Returns whether a car was hit.
    pub fn handle_click(&mut self, pointer: Point) -> bool {
        let Some(frame) = self.current_frame() else {
            return false;
        };
        let transform = self.geometry.transform();
        let hit = hit_test(
            pointer,
            frame
                .drivers
                .iter()
                .map(|(code, driver)| (code.as_str(), transform.world_to_screen(driver.position()))),
            HIT_RADIUS,
        )
        .map(str::to_string);

        match hit {
            Some(code) => {
                self.selection.toggle(&code);
                debug!("Selection is now {:?}", self.selection.selected());
                true
            }
            None => false,
        }
    }

    /// Leaderboard clicks share the pointer's toggle semantics.
    pub fn toggle_selection(&mut self, code: &str) {
        self.selection.toggle(code);
    }

    /// World coordinate under a screen point, ignoring circuit rotation.
    pub fn pointer_world(&self, pointer: Point) -> Point {
        self.geometry.transform().screen_to_world(pointer)
    }

    pub fn current_frame(&self) -> Option<&Frame> {
        self.store.get(self.clock.current_frame())
    }

    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        self.current_frame()
            .map(|frame| render::leaderboard(&self.session, frame, &self.selection))
            .unwrap_or_default()
    }

    pub fn driver_info(&self) -> Option<DriverInfo> {
        render::driver_info(&self.session, self.current_frame()?, &self.selection)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn clock(&self) -> &PlaybackClock {
        &self.clock
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn geometry(&self) -> &TrackGeometry {
        &self.geometry
    }

    pub fn frames(&self) -> &FrameStore {
        &self.store
    }

    pub fn is_primed(&self) -> bool {
        self.primed
    }
}
