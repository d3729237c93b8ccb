//! Reference measurements that make overlay scale independent of the user's distance and build.
//!
//! The first frame in which a face is detected after the references were cleared defines the
//! "1.0 scale" pose. All later scale factors are ratios against that pose.

use crate::landmark::{distance, face_bounding_box, LandmarkIdx, Landmarks};
use crate::resolution::Resolution;

/// Clamp range of [`Calibration::eye_scale`] and [`Calibration::face_width_scale`].
pub const RATIO_SCALE_RANGE: (f32, f32) = (0.4, 2.5);
/// Clamp range of [`Calibration::distance_scale`].
pub const DISTANCE_SCALE_RANGE: (f32, f32) = (0.5, 2.0);

/// Calibration references, in pixels.
///
/// Each reference is captured at most once and then stays fixed until [`Calibration::clear`] is
/// called.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Calibration {
    reference_eye_distance: Option<f32>,
    reference_face_width: Option<f32>,
    reference_face_size: Option<f32>,
}

impl Calibration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures every reference that has not been captured yet from the current frame.
    ///
    /// References that are already set are left untouched. A reference whose landmarks are
    /// missing from `landmarks` stays unset and will be captured from a later frame.
    pub fn capture(&mut self, landmarks: &Landmarks, res: Resolution) {
        if self.reference_eye_distance.is_none() {
            if let Some(d) = eye_distance(landmarks, res) {
                log::debug!("calibrated eye distance: {d:.1}px");
                self.reference_eye_distance = Some(d);
            }
        }

        if self.reference_face_width.is_none() {
            if let Some(w) = face_width(landmarks, res) {
                log::debug!("calibrated face width: {w:.1}px");
                self.reference_face_width = Some(w);
            }
        }

        if self.reference_face_size.is_none() {
            if let Some(s) = face_size(landmarks, res) {
                log::debug!("calibrated face size: {s:.1}px");
                self.reference_face_size = Some(s);
            }
        }
    }

    /// Forgets all references, forcing recalibration on the next detected face.
    pub fn clear(&mut self) {
        if self.is_calibrated() {
            log::debug!("calibration cleared");
        }
        *self = Self::default();
    }

    /// Returns `true` if at least one reference has been captured.
    pub fn is_calibrated(&self) -> bool {
        self.reference_eye_distance.is_some()
            || self.reference_face_width.is_some()
            || self.reference_face_size.is_some()
    }

    #[inline]
    pub fn reference_eye_distance(&self) -> Option<f32> {
        self.reference_eye_distance
    }

    #[inline]
    pub fn reference_face_width(&self) -> Option<f32> {
        self.reference_face_width
    }

    #[inline]
    pub fn reference_face_size(&self) -> Option<f32> {
        self.reference_face_size
    }

    /// Scale of the current outer-eye-corner distance relative to the reference.
    pub fn eye_scale(&self, current: f32) -> f32 {
        ratio_scale(current, self.reference_eye_distance)
    }

    /// Scale of the current cheek-to-cheek distance relative to the reference.
    pub fn face_width_scale(&self, current: f32) -> f32 {
        ratio_scale(current, self.reference_face_width)
    }

    /// Inverse scale of the current face box diagonal relative to the reference.
    ///
    /// Unlike the other scales this is `reference / current`: a face closer to the camera has a
    /// larger box, which yields a smaller value.
    pub fn distance_scale(&self, current: f32) -> f32 {
        match self.reference_face_size {
            Some(reference) if current > 0.0 => (reference / current)
                .clamp(DISTANCE_SCALE_RANGE.0, DISTANCE_SCALE_RANGE.1),
            _ => 1.0,
        }
    }
}

fn ratio_scale(current: f32, reference: Option<f32>) -> f32 {
    match reference {
        Some(reference) if reference > 0.0 => {
            (current / reference).clamp(RATIO_SCALE_RANGE.0, RATIO_SCALE_RANGE.1)
        }
        _ => 1.0,
    }
}

/// Pixel distance between the outer eye corners.
pub fn eye_distance(landmarks: &Landmarks, res: Resolution) -> Option<f32> {
    pair_distance(
        landmarks,
        LandmarkIdx::LeftEyeOuterCorner,
        LandmarkIdx::RightEyeOuterCorner,
        res,
    )
}

/// Pixel distance between the left and right cheek (temple) landmarks.
pub fn face_width(landmarks: &Landmarks, res: Resolution) -> Option<f32> {
    pair_distance(
        landmarks,
        LandmarkIdx::LeftCheek,
        LandmarkIdx::RightCheek,
        res,
    )
}

/// Diagonal of the face box.
pub fn face_size(landmarks: &Landmarks, res: Resolution) -> Option<f32> {
    face_bounding_box(landmarks, res).map(|rect| rect.diagonal())
}

fn pair_distance(
    landmarks: &Landmarks,
    a: LandmarkIdx,
    b: LandmarkIdx,
    res: Resolution,
) -> Option<f32> {
    let a = landmarks.point_at(a, res)?;
    let b = landmarks.point_at(b, res)?;
    Some(distance(Some(a), Some(b)))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::test::FaceBuilder;

    const RES: Resolution = Resolution::new(640, 480);

    #[test]
    fn captures_once_until_cleared() {
        let mut cal = Calibration::new();
        assert!(!cal.is_calibrated());

        cal.capture(&FaceBuilder::new(RES).build(), RES);
        assert_relative_eq!(cal.reference_eye_distance().unwrap(), 100.0, epsilon = 1e-3);
        assert_relative_eq!(cal.reference_face_width().unwrap(), 180.0, epsilon = 1e-3);
        let size = cal.reference_face_size().unwrap();
        assert_relative_eq!(size, 180.0f32.hypot(260.0), epsilon = 1e-2);

        // The face moves closer: references stay put, scales change.
        let closer = FaceBuilder::new(RES).scale(1.5).build();
        let snapshot = cal.clone();
        for _ in 0..5 {
            cal.capture(&closer, RES);
        }
        assert_eq!(cal, snapshot);
        let current = eye_distance(&closer, RES).unwrap();
        assert_relative_eq!(cal.eye_scale(current), 1.5, epsilon = 1e-4);
        assert_relative_eq!(
            cal.distance_scale(face_size(&closer, RES).unwrap()),
            1.0 / 1.5,
            epsilon = 1e-4
        );

        cal.clear();
        assert!(!cal.is_calibrated());
        cal.capture(&closer, RES);
        assert_relative_eq!(cal.reference_eye_distance().unwrap(), 150.0, epsilon = 1e-3);
    }

    #[test]
    fn partial_landmarks_capture_partially() {
        let mut cal = Calibration::new();
        let mut face = FaceBuilder::new(RES);
        face.truncate(usize::from(LandmarkIdx::RightEyeOuterCorner));
        cal.capture(&face.build(), RES);
        assert_eq!(cal.reference_eye_distance(), None);
        assert_eq!(cal.reference_face_width(), None);
        assert!(cal.reference_face_size().is_some());
    }

    #[test]
    fn uncalibrated_scales_are_neutral() {
        let cal = Calibration::new();
        assert_eq!(cal.eye_scale(123.0), 1.0);
        assert_eq!(cal.face_width_scale(0.0), 1.0);
        assert_eq!(cal.distance_scale(50.0), 1.0);
    }

    #[test]
    fn scales_are_clamped() {
        let mut cal = Calibration::new();
        cal.capture(&FaceBuilder::new(RES).build(), RES);
        let eye = cal.reference_eye_distance().unwrap();
        let size = cal.reference_face_size().unwrap();

        assert_eq!(cal.eye_scale(eye * 100.0), 2.5);
        assert_eq!(cal.eye_scale(eye * 0.01), 0.4);
        assert_eq!(cal.face_width_scale(1e9), 2.5);
        assert_eq!(cal.face_width_scale(0.0), 0.4);
        assert_eq!(cal.distance_scale(size * 100.0), 0.5);
        assert_eq!(cal.distance_scale(size * 0.01), 2.0);
    }
}
