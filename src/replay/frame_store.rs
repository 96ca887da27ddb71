use std::{
    ops::Range,
    sync::{
        Arc,
        mpsc::{self, Receiver, RecvTimeoutError, Sender},
    },
    thread,
    time::{Duration, Instant},
};

use log::{debug, info, warn};

use crate::{
    backend::FrameSource,
    errors::ReplayError,
    session::{Frame, FrameBatch, FrameBatchRequest},
};

/// Largest batch requested in one call
pub const BATCH_SIZE: usize = 5000;
/// Share of a batch that must have been played before the next one is prefetched
pub const PREFETCH_THRESHOLD: f64 = 0.7;
/// A recovery fetch starts this many frames before the missing one
pub const RECOVERY_LEAD: usize = 100;
pub const RECOVERY_WINDOW: usize = 500;
/// How long a failed recovery window is left alone before it is retried
pub const RETRY_BACKOFF: Duration = Duration::from_secs(2);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchKind {
    /// Requested by the controller, failures are reported
    Foreground,
    /// Speculative next batch, failures are only logged
    Prefetch,
    /// Window around a frame the renderer found missing
    Recovery,
}

struct FetchOutcome {
    session_id: String,
    generation: u64,
    range: Range<usize>,
    kind: FetchKind,
    result: Result<FrameBatch, ReplayError>,
}

/// Sparse cache of the frames of one session, addressed by frame index.
///
/// Slots are allocated once for the whole session; a slot is filled the
/// first time a batch covering it arrives and never rewritten afterwards.
/// Fetches run on background threads and their results are merged when the
/// owner calls [`FrameStore::poll`], so the cache itself is only touched
/// from the owner's thread.
pub struct FrameStore {
    source: Arc<dyn FrameSource>,
    session_id: String,
    // bumped on every reset so that late answers for an older session with
    // the same id are not merged
    generation: u64,
    slots: Vec<Option<Frame>>,
    loaded: usize,
    // first index the source could not serve; nothing at or past it is
    // requested again
    available_end: usize,
    in_flight: Vec<Range<usize>>,
    failed: Vec<(Range<usize>, Instant)>,
    retry_backoff: Duration,
    outcome_tx: Sender<FetchOutcome>,
    outcome_rx: Receiver<FetchOutcome>,
}

impl FrameStore {
    pub fn new(source: Arc<dyn FrameSource>, session_id: &str, total_frames: usize) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::channel();
        Self {
            source,
            session_id: session_id.to_string(),
            generation: 0,
            slots: vec![None; total_frames],
            loaded: 0,
            available_end: total_frames,
            in_flight: Vec::new(),
            failed: Vec::new(),
            retry_backoff: RETRY_BACKOFF,
            outcome_tx,
            outcome_rx,
        }
    }

    /// Drops every cached frame and switches to another session. Fetches
    /// still running for the previous session are ignored when they land.
    pub fn reset(&mut self, source: Arc<dyn FrameSource>, session_id: &str, total_frames: usize) {
        self.source = source;
        self.session_id = session_id.to_string();
        self.generation += 1;
        self.slots = vec![None; total_frames];
        self.loaded = 0;
        self.available_end = total_frames;
        self.in_flight.clear();
        self.failed.clear();
    }

    pub fn set_retry_backoff(&mut self, retry_backoff: Duration) {
        self.retry_backoff = retry_backoff;
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn total_frames(&self) -> usize {
        self.slots.len()
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded
    }

    pub fn get(&self, index: usize) -> Option<&Frame> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub fn is_loaded(&self, index: usize) -> bool {
        self.get(index).is_some()
    }

    /// Whether a fetch covering `index` is still running.
    pub fn is_pending(&self, index: usize) -> bool {
        self.in_flight.iter().any(|range| range.contains(&index))
    }

    /// Whether every frame of `range` the source can serve is cached.
    pub fn is_range_loaded(&self, range: Range<usize>) -> bool {
        let end = range.end.min(self.available_end);
        (range.start..end).all(|index| self.is_loaded(index))
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty()
    }

    /// Requests frames `[start_index, start_index + count)`.
    ///
    /// The range is clamped to the session and trimmed of any leading or
    /// trailing part that is already cached or being fetched; if nothing is
    /// left no call is made. Returns the range actually requested.
    pub fn request(
        &mut self,
        start_index: usize,
        count: usize,
        kind: FetchKind,
    ) -> Option<Range<usize>> {
        let limit = self.available_end;
        let mut start = start_index.min(limit);
        let mut end = start_index.saturating_add(count).min(limit);

        while start < end && (self.is_loaded(start) || self.is_pending(start)) {
            start += 1;
        }
        while end > start && (self.is_loaded(end - 1) || self.is_pending(end - 1)) {
            end -= 1;
        }
        if start >= end {
            debug!(
                "Skipping {:?} request for frames {}..{}, nothing left to fetch",
                kind,
                start_index,
                start_index.saturating_add(count)
            );
            return None;
        }

        let range = start..end;
        self.in_flight.push(range.clone());
        self.dispatch(range.clone(), kind);
        Some(range)
    }

    /// Fetches a window around `index` if that frame is missing. A window
    /// that failed less than the retry backoff ago is not asked for again.
    pub fn ensure_loaded(&mut self, index: usize) -> Option<Range<usize>> {
        if index >= self.available_end || self.is_loaded(index) || self.is_pending(index) {
            return None;
        }
        let retry_backoff = self.retry_backoff;
        self.failed.retain(|(_, failed_at)| failed_at.elapsed() < retry_backoff);
        if self.failed.iter().any(|(range, _)| range.contains(&index)) {
            return None;
        }
        self.request(
            index.saturating_sub(RECOVERY_LEAD),
            RECOVERY_WINDOW,
            FetchKind::Recovery,
        )
    }

    fn dispatch(&self, range: Range<usize>, kind: FetchKind) {
        let source = self.source.clone();
        let outcome_tx = self.outcome_tx.clone();
        let session_id = self.session_id.clone();
        let generation = self.generation;
        debug!("Loading frames batch: {} to {}", range.start, range.end - 1);

        thread::spawn(move || {
            let request = FrameBatchRequest {
                session_id: session_id.clone(),
                start_index: range.start,
                count: range.len(),
            };
            let result = source.fetch_frames(&request);
            // the store may be gone already, nothing to report to then
            let _ = outcome_tx.send(FetchOutcome {
                session_id,
                generation,
                range,
                kind,
                result,
            });
        });
    }

    /// Merges every finished fetch. `position` is the current playback
    /// position and drives prefetching. Returns the failures of foreground
    /// and recovery fetches; prefetch failures are only logged.
    pub fn poll(&mut self, position: f64) -> Vec<ReplayError> {
        let mut errors = Vec::new();
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            if let Some(error) = self.complete(outcome, position) {
                errors.push(error);
            }
        }
        errors
    }

    /// Blocks until no fetch is in flight or `timeout` elapses, merging
    /// results as they arrive. Prefetches triggered meanwhile are waited
    /// for as well.
    pub fn wait_idle(&mut self, timeout: Duration, position: f64) -> Vec<ReplayError> {
        let deadline = Instant::now() + timeout;
        let mut errors = Vec::new();
        while !self.in_flight.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.outcome_rx.recv_timeout(remaining) {
                Ok(outcome) => {
                    if let Some(error) = self.complete(outcome, position) {
                        errors.push(error);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    warn!(
                        "Timed out waiting for {} frame batches",
                        self.in_flight.len()
                    );
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        errors
    }

    fn complete(&mut self, outcome: FetchOutcome, position: f64) -> Option<ReplayError> {
        if outcome.session_id != self.session_id || outcome.generation != self.generation {
            debug!(
                "Discarding frames {}..{} of stale session {}",
                outcome.range.start, outcome.range.end, outcome.session_id
            );
            return None;
        }
        if let Some(i) = self.in_flight.iter().position(|r| *r == outcome.range) {
            self.in_flight.swap_remove(i);
        }

        let range = outcome.range;
        let batch = match outcome.result {
            Ok(batch) => batch,
            Err(e) => {
                let error = ReplayError::FrameBatchError {
                    start_index: range.start,
                    end_index: range.end,
                    source: Box::new(e),
                };
                if outcome.kind == FetchKind::Prefetch {
                    warn!("Failed to preload next batch: {}", error.root_cause());
                    return None;
                }
                warn!("Error loading frames batch: {}", error.root_cause());
                if outcome.kind == FetchKind::Recovery {
                    self.failed.push((range, Instant::now()));
                }
                return Some(error);
            }
        };

        let received = batch.frames.len();
        if received < range.len() && range.start + received < self.available_end {
            warn!(
                "Source ran out of frames at {} of {}",
                range.start + received,
                self.total_frames()
            );
            self.available_end = range.start + received;
        }
        if received == 0 {
            return None;
        }

        for (offset, frame) in batch.frames.into_iter().enumerate() {
            let Some(slot) = self.slots.get_mut(range.start + offset) else {
                break;
            };
            if slot.is_none() {
                *slot = Some(frame);
                self.loaded += 1;
            }
        }
        info!(
            "Loaded frames {} to {} ({} frames)",
            range.start,
            batch.end_index.saturating_sub(1),
            received
        );

        if batch.end_index < self.available_end
            && position >= range.start as f64 + range.len() as f64 * PREFETCH_THRESHOLD
        {
            debug!("Prefetching frames from {}", batch.end_index);
            self.request(batch.end_index, BATCH_SIZE, FetchKind::Prefetch);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    const WAIT: Duration = Duration::from_secs(5);

    fn frames(count: usize) -> Vec<Frame> {
        (0..count)
            .map(|i| Frame {
                t: i as f64 / 25.,
                lap: 1,
                ..Frame::default()
            })
            .collect()
    }

    /// Serves `frames` like the server does and records every request.
    struct ScriptedSource {
        frames: Vec<Frame>,
        fail: bool,
        // shifts `t` by 1000 s per call so that each answer is recognisable
        stamp_calls: bool,
        requests: Mutex<Vec<FrameBatchRequest>>,
    }

    impl ScriptedSource {
        fn new(frame_count: usize) -> Self {
            Self {
                frames: frames(frame_count),
                fail: false,
                stamp_calls: false,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn stamping(frame_count: usize) -> Self {
            Self {
                stamp_calls: true,
                ..Self::new(frame_count)
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(0)
            }
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    impl FrameSource for ScriptedSource {
        fn fetch_frames(&self, request: &FrameBatchRequest) -> Result<FrameBatch, ReplayError> {
            let call = {
                let mut requests = self.requests.lock().unwrap();
                requests.push(request.clone());
                requests.len()
            };
            if self.fail {
                return Err(ReplayError::HttpStatusError {
                    status: 500,
                    message: "boom".to_string(),
                });
            }
            let start = request.start_index.min(self.frames.len());
            let end = (request.start_index + request.count).min(self.frames.len());
            let mut frames = self.frames[start..end].to_vec();
            if self.stamp_calls {
                frames.iter_mut().for_each(|f| f.t += 1000. * call as f64);
            }
            Ok(FrameBatch {
                frames,
                start_index: start,
                end_index: end,
                total_frames: Some(self.frames.len()),
            })
        }
    }

    #[test]
    fn test_request_is_clamped_to_session() {
        let source = Arc::new(ScriptedSource::new(120));
        let mut store = FrameStore::new(source.clone(), "s", 120);
        assert_eq!(store.request(100, 5000, FetchKind::Foreground), Some(100..120));
        assert!(store.wait_idle(WAIT, 0.).is_empty());
        assert_eq!(store.loaded_count(), 20);
        assert!(store.is_loaded(119));
        assert!(!store.is_loaded(99));
        assert_eq!(store.request(500, 10, FetchKind::Foreground), None);
    }

    #[test]
    fn test_short_batch_from_source() {
        // the source only knows 50 frames although the session claims 80
        let source = Arc::new(ScriptedSource::new(50));
        let mut store = FrameStore::new(source, "s", 80);
        store.request(0, 80, FetchKind::Foreground);
        assert!(store.wait_idle(WAIT, 0.).is_empty());
        assert_eq!(store.loaded_count(), 50);
        assert!(store.get(50).is_none());
        assert!(store.is_idle());
        // the missing tail is not asked for again
        assert_eq!(store.ensure_loaded(60), None);
        assert_eq!(store.request(40, 40, FetchKind::Foreground), None);
    }

    #[test]
    fn test_overlapping_batches_stay_consistent() {
        let source = Arc::new(ScriptedSource::new(300));
        let mut store = FrameStore::new(source.clone(), "s", 300);
        store.request(0, 200, FetchKind::Foreground);
        store.wait_idle(WAIT, 0.);
        // overlaps the cached prefix, only 200..250 is fetched
        assert_eq!(store.request(150, 100, FetchKind::Foreground), Some(200..250));
        store.wait_idle(WAIT, 0.);
        assert_eq!(store.loaded_count(), 250);
        assert!((0..250).all(|i| store.get(i).map(|f| f.t) == Some(i as f64 / 25.)));
    }

    #[test]
    fn test_cached_frames_inside_a_batch_are_kept() {
        let source = Arc::new(ScriptedSource::stamping(300));
        let mut store = FrameStore::new(source.clone(), "s", 300);
        assert_eq!(store.request(100, 100, FetchKind::Foreground), Some(100..200));
        assert!(store.wait_idle(WAIT, 0.).is_empty());

        // cached frames in the middle do not trim the request
        assert_eq!(store.request(0, 300, FetchKind::Foreground), Some(0..300));
        assert!(store.wait_idle(WAIT, 0.).is_empty());
        assert_eq!(source.request_count(), 2);
        assert_eq!(store.loaded_count(), 300);
        for i in 0..300 {
            let first_call = (100..200).contains(&i);
            let expected = i as f64 / 25. + if first_call { 1000. } else { 2000. };
            assert_eq!(store.get(i).map(|f| f.t), Some(expected), "frame {i}");
        }
    }

    #[test]
    fn test_in_flight_requests_are_coalesced() {
        let source = Arc::new(ScriptedSource::new(1000));
        let mut store = FrameStore::new(source.clone(), "s", 1000);
        assert_eq!(store.request(0, 500, FetchKind::Foreground), Some(0..500));
        assert_eq!(store.request(100, 200, FetchKind::Recovery), None);
        assert_eq!(store.request(400, 200, FetchKind::Recovery), Some(500..600));
        store.wait_idle(WAIT, 0.);
        assert_eq!(source.request_count(), 2);
        assert_eq!(store.loaded_count(), 600);
    }

    #[test]
    fn test_foreground_failure_is_reported() {
        let mut store = FrameStore::new(Arc::new(ScriptedSource::failing()), "s", 100);
        store.request(0, 100, FetchKind::Foreground);
        let errors = store.wait_idle(WAIT, 0.);
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0],
            ReplayError::FrameBatchError {
                start_index: 0,
                end_index: 100,
                ..
            }
        ));
        assert!(matches!(
            errors[0].root_cause(),
            ReplayError::HttpStatusError { status: 500, .. }
        ));
        assert!(store.is_idle());
    }

    #[test]
    fn test_prefetch_failure_is_silent() {
        let mut store = FrameStore::new(Arc::new(ScriptedSource::failing()), "s", 100);
        store.request(0, 100, FetchKind::Prefetch);
        assert!(store.wait_idle(WAIT, 0.).is_empty());
    }

    #[test]
    fn test_prefetch_once_most_of_batch_was_played() {
        let source = Arc::new(ScriptedSource::new(12_000));
        let mut store = FrameStore::new(source.clone(), "s", 12_000);
        store.request(0, BATCH_SIZE, FetchKind::Foreground);
        // playback is still early in the batch: no prefetch
        store.wait_idle(WAIT, 100.);
        assert_eq!(source.request_count(), 1);
        assert_eq!(store.loaded_count(), BATCH_SIZE);

        // the recovery window is trimmed to 5000..5400, and playback is
        // already past 70% of it when it lands
        assert_eq!(store.ensure_loaded(5000), Some(5000..5400));
        store.wait_idle(WAIT, 5300.);
        assert_eq!(source.request_count(), 3);
        assert!(store.is_loaded(5400));
        assert!(store.is_loaded(10_399));
        assert!(!store.is_loaded(10_400));
    }

    #[test]
    fn test_prefetch_at_exactly_seventy_percent() {
        let source = Arc::new(ScriptedSource::new(2000));
        let mut store = FrameStore::new(source.clone(), "s", 2000);
        store.request(0, 1000, FetchKind::Foreground);
        store.wait_idle(WAIT, 700.);
        assert_eq!(source.request_count(), 2);
        assert_eq!(store.loaded_count(), 2000);
    }

    #[test]
    fn test_failed_recovery_window_backs_off() {
        let source = Arc::new(ScriptedSource::failing());
        let mut store = FrameStore::new(source.clone(), "s", 2000);
        assert_eq!(store.ensure_loaded(1000), Some(900..1400));
        assert_eq!(store.wait_idle(WAIT, 1000.).len(), 1);

        // the same window is not hammered while the source is down
        assert_eq!(store.ensure_loaded(1000), None);
        assert_eq!(store.ensure_loaded(1399), None);
        assert_eq!(source.request_count(), 1);
        // frames outside the failed window are still fetched
        assert_eq!(store.ensure_loaded(1500), Some(1400..1900));
        store.wait_idle(WAIT, 1500.);

        store.set_retry_backoff(Duration::ZERO);
        assert_eq!(store.ensure_loaded(1000), Some(900..1400));
        store.wait_idle(WAIT, 1000.);
        assert_eq!(source.request_count(), 3);
    }

    #[test]
    fn test_range_loaded_ignores_frames_the_source_lacks() {
        let mut store = FrameStore::new(Arc::new(ScriptedSource::new(50)), "s", 80);
        assert!(!store.is_range_loaded(0..80));
        store.request(0, 80, FetchKind::Foreground);
        store.wait_idle(WAIT, 0.);
        assert!(store.is_range_loaded(0..80));
        assert!(store.is_range_loaded(10..20));
    }

    #[test]
    fn test_recovery_window_around_missing_frame() {
        let source = Arc::new(ScriptedSource::new(2000));
        let mut store = FrameStore::new(source.clone(), "s", 2000);
        assert_eq!(store.ensure_loaded(1000), Some(900..1400));
        assert_eq!(store.ensure_loaded(1200), None);
        store.wait_idle(WAIT, 0.);
        assert_eq!(store.ensure_loaded(1000), None);
        assert_eq!(store.ensure_loaded(50), Some(0..500));
        assert_eq!(store.ensure_loaded(5000), None);
    }

    #[test]
    fn test_stale_results_are_discarded_after_reset() {
        let old_source = Arc::new(ScriptedSource::new(100));
        let mut store = FrameStore::new(old_source, "old", 100);
        store.request(0, 100, FetchKind::Foreground);
        // switch sessions before the old answer has been merged
        store.reset(Arc::new(ScriptedSource::new(10)), "old", 10);
        thread::sleep(Duration::from_millis(200));
        assert!(store.poll(0.).is_empty());
        assert_eq!(store.loaded_count(), 0);
        assert_eq!(store.total_frames(), 10);

        store.request(0, 10, FetchKind::Foreground);
        store.wait_idle(WAIT, 0.);
        assert_eq!(store.loaded_count(), 10);
    }
}
