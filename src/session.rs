//! The try-on session: frame composition and the camera/still state machine.
//!
//! A [`Session`] owns all state that persists across frames (orientation, calibration, lighting,
//! the selected overlay) and is driven from a single thread. Per-frame failures are logged and
//! confined to the frame; none of the per-frame methods return errors.

pub mod scheduler;

use std::{path::Path, time::Instant};

use crate::{
    calibration::Calibration,
    camera::Camera,
    config::Config,
    detection::{DetectionLoop, Readiness},
    error::CaptureError,
    fit::{AssetSize, Fitter, Placement},
    image::{Color, Image},
    landmark::{face_bounding_box, Landmarks},
    lighting::{LightingCompositor, LightingEstimator, LightingState},
    orientation::{Orientation, OrientationEstimator},
    overlay::OverlayAsset,
    resolution::Resolution,
    surface::Surface,
    timer::{FpsCounter, Timer},
};

use self::scheduler::{LoopToken, Scheduler};

/// Where the background of the composed frame comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Frames are read from a live camera and redrawn on every display refresh.
    CameraLive,
    /// A captured or uploaded photo is redrawn by a self-pacing loop.
    StillImage,
}

/// User-visible status of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// Nothing to show yet.
    Idle,
    /// The landmark detector is still loading.
    LoadingDetector,
    /// Tracking a face in the live camera feed.
    Live,
    /// Showing a still image with a face.
    Still,
    /// The camera could not be started. Persists until the camera is started again.
    CameraDenied(String),
    /// The landmark detector failed to load or crashed. No face is tracked from then on.
    DetectorFailed(String),
    /// No face was found in the most recent frame.
    NoFace,
}

pub struct Session {
    config: Config,
    canvas: Image,
    mode: Mode,
    status: Status,
    scheduler: Scheduler,
    camera: Option<Box<dyn Camera>>,
    detection: Option<DetectionLoop>,
    still_needs_detection: bool,
    background: Option<Image>,
    mirrored: bool,
    landmarks: Option<Landmarks>,
    orientation: OrientationEstimator,
    calibration: Calibration,
    lighting: LightingEstimator,
    compositor: LightingCompositor,
    overlay: Option<OverlayAsset>,
    last_placement: Option<Placement>,
    t_fit: Timer,
    t_lighting: Timer,
    fps: FpsCounter,
}

impl Session {
    /// Creates a session drawing into a canvas of resolution `res`.
    pub fn new(res: Resolution, config: Config) -> Self {
        let config = config.sanitized();
        let mut canvas = Image::new(res.width(), res.height());
        canvas.clear(Color::BLACK);
        let lighting = LightingEstimator::new(&config.lighting);
        let compositor = LightingCompositor::new(config.lighting.tint);
        let orientation = OrientationEstimator::new(config.orientation.smoothing);
        Self {
            canvas,
            mode: Mode::CameraLive,
            status: Status::Idle,
            scheduler: Scheduler::new(),
            camera: None,
            detection: None,
            still_needs_detection: false,
            background: None,
            mirrored: false,
            landmarks: None,
            orientation,
            calibration: Calibration::new(),
            lighting,
            compositor,
            overlay: None,
            last_placement: None,
            t_fit: Timer::new("fit"),
            t_lighting: Timer::new("lighting"),
            fps: FpsCounter::new("compositor"),
            config,
        }
    }

    pub fn resolution(&self) -> Resolution {
        self.canvas.resolution()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Returns the user-visible status.
    pub fn status(&self) -> Status {
        match (&self.status, self.detection.as_ref().map(|d| d.readiness())) {
            (Status::CameraDenied(_), _) => self.status.clone(),
            (_, Some(Readiness::Loading)) => Status::LoadingDetector,
            (_, Some(Readiness::Failed(e))) => Status::DetectorFailed(e.to_string()),
            _ => self.status.clone(),
        }
    }

    /// Attaches the landmark detector whose results drive this session.
    pub fn attach_detector(&mut self, detection: DetectionLoop) {
        self.detection = Some(detection);
    }

    pub fn detector(&self) -> Option<&DetectionLoop> {
        self.detection.as_ref()
    }

    /// Flips live camera frames horizontally before they are drawn and detected.
    pub fn set_mirrored(&mut self, mirrored: bool) {
        self.mirrored = mirrored;
    }

    pub fn is_mirrored(&self) -> bool {
        self.mirrored
    }

    /// Selects the overlay to try on, replacing the previous one.
    pub fn set_overlay(&mut self, overlay: Option<OverlayAsset>) {
        if let Some(overlay) = &overlay {
            log::info!("trying on '{}' ({})", overlay.source(), overlay.category());
        }
        self.overlay = overlay;
        self.last_placement = None;
    }

    pub fn overlay(&self) -> Option<&OverlayAsset> {
        self.overlay.as_ref()
    }

    /// Gives access to the overlay, for example to change the user adjustments or finish loading.
    pub fn overlay_mut(&mut self) -> Option<&mut OverlayAsset> {
        self.overlay.as_mut()
    }

    pub fn set_lighting_enabled(&mut self, enabled: bool) {
        self.lighting.set_enabled(enabled);
    }

    pub fn lighting_state(&self) -> LightingState {
        self.lighting.state()
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation.current()
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn landmarks(&self) -> Option<&Landmarks> {
        self.landmarks.as_ref()
    }

    /// The placement of the overlay in the most recently drawn frame.
    pub fn last_placement(&self) -> Option<Placement> {
        self.last_placement
    }

    /// The token of the currently running frame loop, if any.
    pub fn loop_token(&self) -> Option<LoopToken> {
        self.scheduler.current()
    }

    /// Starts the live camera feed and a new frame loop.
    ///
    /// On failure the session shows [`Status::CameraDenied`] until the camera is started again.
    pub fn start_camera(&mut self, mut camera: Box<dyn Camera>) -> Result<LoopToken, CaptureError> {
        self.stop_camera();
        if let Err(e) = camera.start() {
            log::warn!("failed to start camera: {e}");
            self.scheduler.cancel();
            self.status = Status::CameraDenied(e.to_string());
            return Err(e);
        }

        self.camera = Some(camera);
        self.background = None;
        self.still_needs_detection = false;
        self.calibration.clear();
        Ok(self.enter(Mode::CameraLive, Status::Live))
    }

    /// Freezes the current camera frame and switches to still-image mode.
    ///
    /// Returns [`None`] if there is no live frame to capture.
    pub fn capture_still(&mut self) -> Option<LoopToken> {
        if self.mode != Mode::CameraLive {
            return None;
        }
        let frame = self.background.clone()?;
        log::info!("captured still frame");
        Some(self.show_still(frame))
    }

    /// Shows an uploaded photo, switching to still-image mode.
    ///
    /// The calibration is reset, since the photo shows a different pose (or person).
    pub fn upload_still(&mut self, image: Image) -> LoopToken {
        log::info!("showing uploaded {}x{} image", image.width(), image.height());
        self.calibration.clear();
        self.landmarks = None;
        self.show_still(image)
    }

    fn show_still(&mut self, image: Image) -> LoopToken {
        self.stop_camera();
        self.background = Some(image);
        self.still_needs_detection = true;
        self.enter(Mode::StillImage, Status::Still)
    }

    /// Leaves still-image mode and restarts the live camera.
    ///
    /// The calibration is cleared; the selected overlay is kept.
    pub fn reset_to_camera(&mut self, camera: Box<dyn Camera>) -> Result<LoopToken, CaptureError> {
        log::info!("returning to camera");
        self.landmarks = None;
        self.start_camera(camera)
    }

    fn stop_camera(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            camera.stop();
        }
        if let Some(detection) = &mut self.detection {
            detection.cancel();
        }
    }

    fn enter(&mut self, mode: Mode, status: Status) -> LoopToken {
        log::debug!("{:?} -> {:?}", self.mode, mode);
        self.mode = mode;
        self.status = status;
        self.lighting.set_interval(match mode {
            Mode::CameraLive => self.config.lighting.live_interval,
            Mode::StillImage => self.config.lighting.still_interval,
        });
        self.scheduler.begin(mode)
    }

    /// Runs one cycle of the frame loop identified by `token`.
    ///
    /// Reads a camera frame (in live mode), exchanges frames and results with the detector, and
    /// draws. Returns `false` without doing anything if `token` belongs to a loop that has been
    /// superseded by a mode switch, in which case the caller must stop its loop.
    pub fn run_cycle(&mut self, token: &LoopToken, now: Instant) -> bool {
        if !self.scheduler.is_current(token) {
            log::debug!("stopping stale {:?} loop", token.mode());
            return false;
        }

        if self.mode == Mode::CameraLive {
            self.read_camera();
        }
        self.exchange_with_detector(now);
        self.draw_frame();
        true
    }

    fn read_camera(&mut self) {
        let Some(camera) = &mut self.camera else {
            return;
        };
        match camera.read() {
            Ok(mut frame) => {
                if self.mirrored {
                    frame.flip_horizontal_in_place();
                }
                self.background = Some(frame);
            }
            Err(e) => log::warn!("failed to read camera frame: {e}"),
        }
    }

    fn exchange_with_detector(&mut self, now: Instant) {
        let Some(detection) = &mut self.detection else {
            return;
        };
        if detection.poll_ready(now) != &Readiness::Ready {
            return;
        }

        match detection.poll_result() {
            Some(Ok(landmarks)) => self.apply_results(landmarks),
            Some(Err(e)) => log::warn!("landmark detection failed: {e}"),
            None => {}
        }

        let Some(detection) = &mut self.detection else {
            return;
        };
        let submit = match self.mode {
            Mode::CameraLive => true,
            Mode::StillImage => self.still_needs_detection,
        };
        if submit && !detection.is_busy() {
            if let Some(frame) = &self.background {
                if detection.submit(frame.clone()) {
                    self.still_needs_detection = false;
                }
            }
        }
    }

    /// Handles the result of a landmark detection and redraws.
    ///
    /// Without a face, the calibration is cleared so that it is captured afresh once a face is
    /// found again, and the overlay is not drawn.
    pub fn on_results(&mut self, landmarks: Option<Landmarks>) {
        self.apply_results(landmarks);
        self.draw_frame();
    }

    fn apply_results(&mut self, landmarks: Option<Landmarks>) {
        let res = self.resolution();
        match &landmarks {
            Some(lm) => {
                self.orientation.update(lm, res);
                self.calibration.capture(lm, res);
                self.status = match self.mode {
                    Mode::CameraLive => Status::Live,
                    Mode::StillImage => Status::Still,
                };
            }
            None => {
                if self.landmarks.is_some() {
                    log::debug!("face lost");
                }
                self.calibration.clear();
                self.status = Status::NoFace;
            }
        }
        self.landmarks = landmarks;
    }

    /// Composes the current frame into the canvas.
    ///
    /// Draws the background, samples the lighting (throttled), and draws the fitted overlay
    /// rotated with the head roll.
    pub fn draw_frame(&mut self) {
        let res = self.resolution();
        self.canvas.clear(Color::BLACK);
        self.last_placement = None;

        if let Some(background) = &self.background {
            self.canvas.draw_image(background, res.rect());
        }

        let Some(landmarks) = &self.landmarks else {
            self.tick_fps();
            return;
        };

        if let Some(background) = &self.background {
            if self.lighting.is_enabled() {
                let face_box = face_bounding_box(landmarks, background.resolution());
                let lighting = &mut self.lighting;
                self.t_lighting.time(|| lighting.on_frame(background, face_box));
            }
        }

        if let Some(overlay) = &self.overlay {
            if let (Some(image), Some(size)) = (overlay.image(), AssetSize::of(overlay)) {
                let fitter = Fitter::new(&self.calibration, res);
                let category = overlay.category();
                let placement = self
                    .t_fit
                    .time(|| fitter.fit(category, Some(landmarks), size));
                if let Some(placement) = placement {
                    let state = self.lighting.state();
                    let roll = self.orientation.current().roll;
                    self.compositor
                        .draw(&mut self.canvas, image, &placement, roll, &state);
                    self.last_placement = Some(placement);
                }
            } else {
                log::trace!("overlay '{}' not loaded, skipping", overlay.source());
            }
        }

        self.tick_fps();
    }

    fn tick_fps(&mut self) {
        self.scheduler.count_frame();
        self.fps.tick_with([&self.t_fit, &self.t_lighting]);
    }

    /// The composed frame.
    pub fn canvas(&self) -> &Image {
        &self.canvas
    }

    /// Returns a copy of the composed frame.
    pub fn snapshot(&self) -> Image {
        self.canvas.snapshot()
    }

    /// Writes the composed frame to an image file (`png`, `jpg` or `jpeg`).
    pub fn export<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        let path = path.as_ref();
        self.canvas.save(path)?;
        log::info!("exported {} frame to '{}'", self.resolution(), path.display());
        Ok(())
    }
}
