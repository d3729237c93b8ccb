#![allow(dead_code)]

use std::{
    cell::Cell,
    collections::VecDeque,
    rc::Rc,
    thread,
    time::Duration,
};

use drape::{
    camera::{Camera, PlaybackCamera},
    detection::{DetectionResult, LandmarkDetector},
    error::{CaptureError, DetectorError},
    image::{Color, Image},
    landmark::{LandmarkIdx, Landmarks},
    resolution::Resolution,
};

pub const RES: Resolution = Resolution::new(640, 480);

pub const GRAY: Color = Color::from_rgb8(128, 128, 128);

/// A frontal face centered at `(cx, cy)` (pixels in a canvas of `res`), eyes `100 * scale` pixels
/// apart.
pub fn face(res: Resolution, cx: f32, cy: f32, scale: f32) -> Landmarks {
    let (w, h) = (res.width() as f32, res.height() as f32);
    let mut positions = vec![[cx / w, cy / h]; Landmarks::NUM_LANDMARKS];
    let mut set = |idx: LandmarkIdx, dx: f32, dy: f32| {
        positions[usize::from(idx)] = [(cx + dx * scale) / w, (cy + dy * scale) / h];
    };
    set(LandmarkIdx::Forehead, 0.0, -130.0);
    set(LandmarkIdx::Chin, 0.0, 130.0);
    set(LandmarkIdx::LeftCheek, -90.0, 0.0);
    set(LandmarkIdx::RightCheek, 90.0, 0.0);
    set(LandmarkIdx::LeftEyeOuterCorner, -50.0, -40.0);
    set(LandmarkIdx::RightEyeOuterCorner, 50.0, -40.0);
    set(LandmarkIdx::LeftEyeInnerCorner, -15.0, -40.0);
    set(LandmarkIdx::RightEyeInnerCorner, 15.0, -40.0);
    set(LandmarkIdx::NoseTip, 0.0, 10.0);
    Landmarks::from_normalized(positions)
}

pub fn centered_face(scale: f32) -> Landmarks {
    face(RES, 320.0, 240.0, scale)
}

pub fn gray_frame() -> Image {
    Image::filled(RES.width(), RES.height(), GRAY)
}

/// Detector returning scripted results, then repeating the last one.
pub struct ScriptedDetector {
    results: VecDeque<Option<Landmarks>>,
    last: Option<Landmarks>,
}

impl ScriptedDetector {
    pub fn new<I: IntoIterator<Item = Option<Landmarks>>>(results: I) -> Self {
        Self {
            results: results.into_iter().collect(),
            last: None,
        }
    }
}

impl LandmarkDetector for ScriptedDetector {
    fn detect(&mut self, _frame: &Image) -> DetectionResult {
        if let Some(next) = self.results.pop_front() {
            self.last = next;
        }
        Ok(self.last.clone())
    }
}

/// Detector whose every detection panics.
pub struct CrashingDetector;

impl LandmarkDetector for CrashingDetector {
    fn detect(&mut self, _frame: &Image) -> DetectionResult {
        panic!("detector crashed");
    }
}

/// Detector that fails to load.
pub struct BrokenDetector;

impl LandmarkDetector for BrokenDetector {
    fn load(&mut self) -> Result<(), DetectorError> {
        Err(DetectorError::Load("model not found".into()))
    }

    fn detect(&mut self, _frame: &Image) -> DetectionResult {
        Ok(None)
    }
}

/// Detector that takes `delay` per frame and always finds the centered face.
pub struct SlowDetector {
    pub delay: Duration,
}

impl LandmarkDetector for SlowDetector {
    fn detect(&mut self, _frame: &Image) -> DetectionResult {
        thread::sleep(self.delay);
        Ok(Some(centered_face(1.0)))
    }
}

/// Camera that reports whether it is running through a shared flag.
pub struct TrackedCamera {
    inner: PlaybackCamera,
    running: Rc<Cell<bool>>,
}

impl TrackedCamera {
    pub fn new(inner: PlaybackCamera) -> (Self, Rc<Cell<bool>>) {
        let running = Rc::new(Cell::new(false));
        (
            Self {
                inner,
                running: running.clone(),
            },
            running,
        )
    }
}

impl Camera for TrackedCamera {
    fn start(&mut self) -> Result<(), CaptureError> {
        self.inner.start()?;
        self.running.set(true);
        Ok(())
    }

    fn stop(&mut self) {
        self.inner.stop();
        self.running.set(false);
    }

    fn is_running(&self) -> bool {
        self.inner.is_running()
    }

    fn read(&mut self) -> Result<Image, CaptureError> {
        self.inner.read()
    }
}
