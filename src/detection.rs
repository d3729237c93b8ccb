//! The landmark detection feedback loop.
//!
//! The landmark detector is an external capability that runs on its own [`Worker`] thread. The
//! render thread submits frames to it, at most one at a time, and later picks up the result
//! without blocking.

use std::{
    any::Any,
    fmt, io,
    panic::{self, AssertUnwindSafe},
    time::{Duration, Instant},
};

use crossbeam::channel::TrySendError;

use crate::{
    config::DetectorConfig,
    error::DetectorError,
    image::Image,
    landmark::Landmarks,
    worker::{promise, Promise, PromiseHandle, Worker},
};

/// Result of a detection request: the landmarks of the primary face, if one was found.
pub type DetectionResult = Result<Option<Landmarks>, DetectorError>;

/// A face landmark detector.
///
/// Implementations are configured for a single face. Any detection thresholds are internal to
/// the implementation.
pub trait LandmarkDetector: Send + 'static {
    /// Prepares the detector for use, for example by loading model weights.
    ///
    /// Called once on the detector thread before the first call to
    /// [`LandmarkDetector::detect`]. May take a while.
    fn load(&mut self) -> Result<(), DetectorError> {
        Ok(())
    }

    /// Detects the primary face in `frame`.
    fn detect(&mut self, frame: &Image) -> DetectionResult;
}

impl<D: LandmarkDetector + ?Sized> LandmarkDetector for Box<D> {
    fn load(&mut self) -> Result<(), DetectorError> {
        (**self).load()
    }

    fn detect(&mut self, frame: &Image) -> DetectionResult {
        (**self).detect(frame)
    }
}

/// Whether the detector can accept frames.
#[derive(Debug, Clone, PartialEq)]
pub enum Readiness {
    Loading,
    Ready,
    Failed(DetectorError),
}

enum Message {
    Load(Promise<Result<(), DetectorError>>),
    Detect(Image, Promise<DetectionResult>),
}

/// Drives a [`LandmarkDetector`] on a background thread.
///
/// A panicking detector is caught on its thread and reported as [`DetectorError::Panicked`]; the
/// loop then switches to [`Readiness::Failed`] and stops submitting frames.
pub struct DetectionLoop {
    worker: Option<Worker<Message>>,
    load: Option<PromiseHandle<Result<(), DetectorError>>>,
    readiness: Readiness,
    in_flight: Option<PromiseHandle<DetectionResult>>,
    /// A cancelled request the detector is still working on.
    abandoned: Option<PromiseHandle<DetectionResult>>,
    poll_interval: Duration,
    last_poll: Option<Instant>,
}

impl DetectionLoop {
    /// Spawns the detector thread and starts loading `detector`.
    pub fn spawn<D: LandmarkDetector>(mut detector: D, config: &DetectorConfig) -> io::Result<Self> {
        let mut panicked = false;
        let mut worker = Worker::builder()
            .name("landmark detector")
            .capacity(1)
            .spawn(move |message| {
                if panicked {
                    match message {
                        Message::Load(promise) => promise.fulfill(Err(DetectorError::WorkerGone)),
                        Message::Detect(_, promise) => {
                            promise.fulfill(Err(DetectorError::WorkerGone))
                        }
                    }
                    return;
                }
                match message {
                    Message::Load(promise) => {
                        let t = Instant::now();
                        let result = guarded(|| detector.load());
                        log::debug!("detector load finished in {:.1?}: {:?}", t.elapsed(), result);
                        panicked = matches!(result, Err(DetectorError::Panicked(_)));
                        promise.fulfill(result);
                    }
                    Message::Detect(frame, promise) => {
                        let result = guarded(|| detector.detect(&frame));
                        panicked = matches!(result, Err(DetectorError::Panicked(_)));
                        promise.fulfill(result);
                    }
                }
            })?;

        let (load, load_handle) = promise();
        worker.send(Message::Load(load));

        Ok(Self {
            worker: Some(worker),
            load: Some(load_handle),
            readiness: Readiness::Loading,
            in_flight: None,
            abandoned: None,
            poll_interval: config.poll_interval(),
            last_poll: None,
        })
    }

    /// Re-checks whether the detector has finished loading, at most once per poll interval.
    pub fn poll_ready(&mut self, now: Instant) -> &Readiness {
        if self.readiness != Readiness::Loading {
            return &self.readiness;
        }
        if let Some(last) = self.last_poll {
            if now.saturating_duration_since(last) < self.poll_interval {
                return &self.readiness;
            }
        }
        self.last_poll = Some(now);

        if let Some(result) = self.load.as_ref().and_then(|handle| handle.poll()) {
            self.load = None;
            self.set_loaded(result.unwrap_or(Err(DetectorError::WorkerGone)));
        } else {
            log::trace!("landmark detector not ready yet");
        }
        &self.readiness
    }

    /// Blocks until the detector has finished loading.
    pub fn wait_ready(&mut self) -> &Readiness {
        if let Some(handle) = self.load.take() {
            self.set_loaded(handle.block().unwrap_or(Err(DetectorError::WorkerGone)));
        }
        &self.readiness
    }

    fn set_loaded(&mut self, result: Result<(), DetectorError>) {
        match result {
            Ok(()) => {
                log::info!("landmark detector ready");
                self.readiness = Readiness::Ready;
            }
            Err(e) => self.fail(e),
        }
    }

    fn fail(&mut self, error: DetectorError) {
        log::error!("{error}");
        self.readiness = Readiness::Failed(error);
    }

    pub fn readiness(&self) -> &Readiness {
        &self.readiness
    }

    pub fn is_ready(&self) -> bool {
        self.readiness == Readiness::Ready
    }

    /// Returns whether the detector is still working on a submitted frame, including one whose
    /// request was cancelled.
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some() || self.abandoned.is_some()
    }

    /// Submits `frame` for detection. Never blocks.
    ///
    /// Returns `false` without submitting if the detector is not ready or busy. If the detector
    /// thread is gone, the loop switches to [`Readiness::Failed`].
    pub fn submit(&mut self, frame: Image) -> bool {
        self.reap_abandoned();
        if !self.is_ready() || self.is_busy() {
            return false;
        }
        let Some(worker) = &self.worker else {
            return false;
        };
        let (promise, handle) = promise();
        match worker.try_send(Message::Detect(frame, promise)) {
            Ok(()) => {
                self.in_flight = Some(handle);
                true
            }
            Err(TrySendError::Full(_)) => {
                log::trace!("detector queue full, dropping frame");
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                self.fail(DetectorError::WorkerGone);
                false
            }
        }
    }

    /// Returns the result of the in-flight request if it has completed.
    pub fn poll_result(&mut self) -> Option<DetectionResult> {
        self.reap_abandoned();
        let result = self.in_flight.as_ref()?.poll()?;
        self.in_flight = None;
        Some(self.checked(result))
    }

    /// Blocks until the in-flight request completes.
    ///
    /// Returns [`None`] if nothing is in flight.
    pub fn wait_result(&mut self) -> Option<DetectionResult> {
        let handle = self.in_flight.take()?;
        let result = handle.block();
        Some(self.checked(result))
    }

    /// Forgets the in-flight request. Its result will be discarded when it arrives, and no new
    /// frame is accepted until then.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            log::debug!("discarding in-flight detection");
            self.abandoned = Some(handle);
        }
    }

    fn reap_abandoned(&mut self) {
        let Some(result) = self.abandoned.as_ref().and_then(|handle| handle.poll()) else {
            return;
        };
        self.abandoned = None;
        log::trace!("dropped result of cancelled detection");
        self.checked(result).ok();
    }

    fn checked<E>(&mut self, result: Result<DetectionResult, E>) -> DetectionResult {
        let result = result.unwrap_or(Err(DetectorError::WorkerGone));
        match &result {
            Ok(Some(landmarks)) if !landmarks.is_complete() => log::warn!(
                "detector returned {} landmarks, expected at least {}",
                landmarks.len(),
                Landmarks::NUM_LANDMARKS
            ),
            Err(e @ (DetectorError::Panicked(_) | DetectorError::WorkerGone)) => {
                self.fail(e.clone())
            }
            _ => {}
        }
        result
    }
}

impl Drop for DetectionLoop {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("landmark detector thread panicked");
            }
        }
    }
}

/// Runs a detector call, turning a panic into [`DetectorError::Panicked`].
fn guarded<T>(call: impl FnOnce() -> Result<T, DetectorError>) -> Result<T, DetectorError> {
    panic::catch_unwind(AssertUnwindSafe(call))
        .unwrap_or_else(|payload| Err(DetectorError::Panicked(panic_message(&*payload))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

impl fmt::Debug for DetectionLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectionLoop")
            .field("readiness", &self.readiness)
            .field("busy", &self.is_busy())
            .finish()
    }
}
