//! Head orientation estimation from a single frame of 2D landmarks.
//!
//! There is no depth information available, so all three angles are heuristic proxies:
//!
//! - **Roll** is the angle of the line through the outer eye corners.
//! - **Pitch** is derived in two stages. The first relates the horizontal nose offset from the
//!   face center to the forehead-to-chin span; the second, which replaces the first whenever its
//!   inputs are available, relates the nose tip's distance below eye level to the same span.
//! - **Yaw** is the normalized asymmetry of the nose tip's distance to both cheeks.
//!
//! Each angle is smoothed with an exponential moving average across frames.

use std::f32::consts::PI;

use crate::filter::{Ema, Filter};
use crate::landmark::{distance, face_bounding_box, LandmarkIdx, Landmarks};
use crate::resolution::Resolution;

/// Damping applied to the first-stage pitch estimate.
const PITCH_OFFSET_DAMPING: f32 = 0.3;
/// Scale of the second-stage pitch estimate.
const PITCH_RATIO_SCALE: f32 = PI * 0.2;
/// Scale of the yaw asymmetry. Bounds yaw to ±0.3π.
const YAW_SCALE: f32 = PI * 0.3;

/// Head rotation in radians.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Orientation {
    /// Rotation about the viewing axis (head tilt in the image plane).
    pub roll: f32,
    /// Rotation about the horizontal axis (nodding).
    pub pitch: f32,
    /// Rotation about the vertical axis (turning left and right).
    pub yaw: f32,
}

/// Estimates and smooths the [`Orientation`] of the tracked face.
#[derive(Debug, Clone)]
pub struct OrientationEstimator {
    roll: Ema,
    pitch: Ema,
    yaw: Ema,
}

impl Default for OrientationEstimator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SMOOTHING)
    }
}

impl OrientationEstimator {
    /// Weight given to the previous smoothed value on every update.
    pub const DEFAULT_SMOOTHING: f32 = 0.7;

    /// Creates an estimator whose smoothed state starts at zero on all axes.
    ///
    /// `smoothing` is the weight of the previous smoothed value: every update computes
    /// `previous * smoothing + raw * (1 - smoothing)`.
    ///
    /// A `smoothing` outside of `0.0..=1.0` is replaced by [`Self::DEFAULT_SMOOTHING`].
    pub fn new(smoothing: f32) -> Self {
        let smoothing = if (0.0..=1.0).contains(&smoothing) {
            smoothing
        } else {
            log::warn!("invalid orientation smoothing {smoothing}, using default");
            Self::DEFAULT_SMOOTHING
        };
        Self {
            roll: Ema::retaining(smoothing, 0.0),
            pitch: Ema::retaining(smoothing, 0.0),
            yaw: Ema::retaining(smoothing, 0.0),
        }
    }

    /// Feeds the landmarks of a new frame into the estimator and returns the smoothed orientation.
    ///
    /// Axes whose landmarks are missing contribute a raw value of `0.0` for this update, so they
    /// decay towards zero instead of holding their last value.
    pub fn update(&mut self, landmarks: &Landmarks, res: Resolution) -> Orientation {
        let raw = raw_orientation(landmarks, res);
        log::trace!("raw orientation: {:?}", raw);
        Orientation {
            roll: self.roll.push(raw.roll),
            pitch: self.pitch.push(raw.pitch),
            yaw: self.yaw.push(raw.yaw),
        }
    }

    /// Returns the current smoothed orientation.
    pub fn current(&self) -> Orientation {
        Orientation {
            roll: self.roll.value().unwrap_or(0.0),
            pitch: self.pitch.value().unwrap_or(0.0),
            yaw: self.yaw.value().unwrap_or(0.0),
        }
    }

    /// Returns the smoothed state to zero on all axes.
    pub fn reset(&mut self) {
        self.roll.reset();
        self.pitch.reset();
        self.yaw.reset();
    }
}

/// Computes the unsmoothed orientation of a single frame.
pub fn raw_orientation(landmarks: &Landmarks, res: Resolution) -> Orientation {
    Orientation {
        roll: raw_roll(landmarks, res),
        pitch: raw_pitch(landmarks, res),
        yaw: raw_yaw(landmarks, res),
    }
}

fn raw_roll(landmarks: &Landmarks, res: Resolution) -> f32 {
    let left = landmarks.point_at(LandmarkIdx::LeftEyeOuterCorner, res);
    let right = landmarks.point_at(LandmarkIdx::RightEyeOuterCorner, res);
    match (left, right) {
        (Some(l), Some(r)) => (r.y - l.y).atan2(r.x - l.x),
        _ => 0.0,
    }
}

fn raw_pitch(landmarks: &Landmarks, res: Resolution) -> f32 {
    let nose = landmarks.point_at(LandmarkIdx::NoseTip, res);
    let forehead = landmarks.point_at(LandmarkIdx::Forehead, res);
    let chin = landmarks.point_at(LandmarkIdx::Chin, res);
    let left_eye = landmarks.point_at(LandmarkIdx::LeftEyeOuterCorner, res);
    let right_eye = landmarks.point_at(LandmarkIdx::RightEyeOuterCorner, res);

    let mut pitch = 0.0;

    if let (Some(nose), Some(forehead), Some(chin), Some(face)) =
        (nose, forehead, chin, face_bounding_box(landmarks, res))
    {
        let span = chin.y - forehead.y;
        pitch = (nose.x - face.x_center()).atan2(span) * PITCH_OFFSET_DAMPING;
    }

    // The second stage overwrites the first.
    if let (Some(nose), Some(forehead), Some(chin), Some(l), Some(r)) =
        (nose, forehead, chin, left_eye, right_eye)
    {
        let span = chin.y - forehead.y;
        if span != 0.0 {
            let eye_level = (l.y + r.y) / 2.0;
            pitch = (nose.y - eye_level) / span * PITCH_RATIO_SCALE;
        }
    }

    pitch
}

fn raw_yaw(landmarks: &Landmarks, res: Resolution) -> f32 {
    let nose = landmarks.point_at(LandmarkIdx::NoseTip, res);
    let left = landmarks.point_at(LandmarkIdx::LeftCheek, res);
    let right = landmarks.point_at(LandmarkIdx::RightCheek, res);
    if nose.is_none() || left.is_none() || right.is_none() {
        return 0.0;
    }

    let left_dist = distance(nose, left);
    let right_dist = distance(nose, right);
    let total = left_dist + right_dist;
    if total == 0.0 {
        return 0.0;
    }

    (right_dist - left_dist) / total * YAW_SCALE
}
