//! Facial landmark sets and the pixel-space geometry derived from them.
//!
//! A [`Landmarks`] set is produced by an external detector once per processed frame and holds
//! normalized coordinates (`x` and `y` in range 0.0 to 1.0, Y pointing down). Everything downstream
//! works in the pixel space of the canvas, so positions are scaled with the canvas [`Resolution`]
//! whenever they are read.
//!
//! A landmark is *missing* if its index is past the end of the set or if either of its
//! coordinates is not finite (detectors report unobserved points as NaN).

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::{rect::Rect, resolution::Resolution};

/// Normalized 2D landmark position.
pub type Position = [f32; 2];

/// The landmarks of a single detected face.
///
/// Serializes as a plain list of `[x, y]` pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Landmarks {
    positions: Vec<Position>,
}

impl Landmarks {
    /// Number of landmarks in a full face mesh.
    pub const NUM_LANDMARKS: usize = 468;

    /// Number of landmarks in a face mesh that also includes the 5+5 iris landmarks.
    pub const NUM_LANDMARKS_WITH_IRISES: usize = 478;

    /// Creates a landmark set from normalized positions.
    ///
    /// Any number of landmarks is accepted. Calculations that need a landmark beyond the end of the
    /// set fall back to coarser estimates.
    pub fn from_normalized<I: IntoIterator<Item = Position>>(positions: I) -> Self {
        Self {
            positions: positions.into_iter().collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Returns `true` if this set has at least as many landmarks as a full face mesh.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.len() >= Self::NUM_LANDMARKS
    }

    /// Returns the normalized position of the landmark at `index`.
    ///
    /// Returns [`None`] if the landmark is missing.
    #[inline]
    pub fn get(&self, index: impl Into<usize>) -> Option<Position> {
        self.positions
            .get(index.into())
            .copied()
            .filter(|pos| is_present(*pos))
    }

    #[inline]
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    /// Scales the landmark at `index` into the pixel space of a canvas of resolution `res`.
    ///
    /// Returns [`None`] if the landmark is missing.
    pub fn point_at(&self, index: impl Into<usize>, res: Resolution) -> Option<Point2<f32>> {
        self.get(index).map(|pos| to_pixels(pos, res))
    }

    /// Returns an iterator over all landmarks that are not missing, scaled into the pixel space of
    /// `res`.
    pub fn points(&self, res: Resolution) -> impl Iterator<Item = Point2<f32>> + '_ {
        self.positions
            .iter()
            .filter(|pos| is_present(**pos))
            .map(move |&pos| to_pixels(pos, res))
    }
}

fn is_present([x, y]: Position) -> bool {
    x.is_finite() && y.is_finite()
}

fn to_pixels([x, y]: Position, res: Resolution) -> Point2<f32> {
    Point2::new(x * res.width() as f32, y * res.height() as f32)
}

/// Scales landmark `index` of `landmarks` into pixel space.
///
/// Returns [`None`] if no landmarks are available or if the landmark is missing.
pub fn point_at(
    landmarks: Option<&Landmarks>,
    index: impl Into<usize>,
    res: Resolution,
) -> Option<Point2<f32>> {
    landmarks?.point_at(index, res)
}

/// Euclidean distance between two points.
///
/// If either point is missing, the distance is `0.0`.
pub fn distance(a: Option<Point2<f32>>, b: Option<Point2<f32>>) -> f32 {
    match (a, b) {
        (Some(a), Some(b)) => nalgebra::distance(&a, &b),
        _ => 0.0,
    }
}

/// Computes the axis-aligned pixel-space bounding box of all landmarks.
///
/// The box is recomputed from scratch on every call. Missing landmarks are skipped. Returns
/// [`None`] if no landmark is present.
pub fn face_bounding_box(landmarks: &Landmarks, res: Resolution) -> Option<Rect> {
    Rect::bounding(landmarks.points(res))
}

/// Assigns a name to the landmark indices the fitting and orientation code relies on.
///
/// Indices follow the MediaPipe Face Mesh topology. "Left" and "Right" are relative to the input
/// image, not from the PoV of the depicted person.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandmarkIdx {
    NoseTip = 1,
    Forehead = 10,
    LeftEyeOuterCorner = 33,
    LeftEyeInnerCorner = 133,
    Chin = 152,
    LeftCheek = 234,
    RightEyeOuterCorner = 263,
    RightEyeInnerCorner = 362,
    RightCheek = 454,
}

impl From<LandmarkIdx> for usize {
    #[inline]
    fn from(idx: LandmarkIdx) -> usize {
        idx as usize
    }
}
