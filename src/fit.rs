//! Overlay fitting: where, how large and around which pivot an overlay is drawn for one frame.
//!
//! Every category has a primary path that sizes the overlay from a pair of landmarks, scaled
//! relative to the calibrated reference measurement, and a fallback path that sizes it from the
//! face box using the inverse distance scale. The two paths deliberately use different scale
//! relations: a ratio-to-reference for the primary path, and "closer face, bigger overlay" for the
//! fallback.

use nalgebra::Point2;

use crate::{
    calibration::Calibration,
    landmark::{distance, face_bounding_box, LandmarkIdx, Landmarks},
    overlay::{Category, OverlayAsset},
    rect::Rect,
    resolution::Resolution,
};

/// Glasses width as a multiple of the outer eye corner distance.
const GLASSES_WIDTH: f32 = 2.2;
/// Hat width as a multiple of the temple-to-temple distance.
const HAT_WIDTH: f32 = 1.6;
/// Shirt width as a multiple of the jaw width.
const SHIRT_WIDTH: f32 = 2.4;

/// Fallback widths, as multiples of the face box width.
const GLASSES_FALLBACK_WIDTH: f32 = 0.6;
const HAT_FALLBACK_WIDTH: f32 = 1.3;
const SHIRT_FALLBACK_WIDTH: f32 = 2.0;

/// Upward shift of the glasses, relative to their height, so they straddle the eye line.
const GLASSES_LIFT: f32 = 0.45;
/// Fraction of the face box height below the top at which the fallback eye line is assumed.
const GLASSES_FALLBACK_EYE_LINE: f32 = 0.25;

/// How far the hat sits above its anchor, relative to its height.
const HAT_LIFT: f32 = 0.75;
const HAT_FALLBACK_LIFT: f32 = 0.7;
/// Forehead estimate above the eye line, relative to the face box height.
const FOREHEAD_ABOVE_EYES: f32 = 0.15;

/// How far the shirt starts above its anchor, relative to its height.
const SHIRT_LIFT: f32 = 0.25;
/// Chin estimate below the nose tip, relative to the face box height.
const CHIN_BELOW_NOSE: f32 = 0.3;
/// Chin estimate below the face box top, relative to the face box height.
const CHIN_FALLBACK: f32 = 0.6;

/// Where to draw an overlay in the current frame.
///
/// `center_x`/`center_y` is the rotation pivot. All values are in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub center_x: f32,
    pub center_y: f32,
}

impl Placement {
    fn new(rect: Rect, center: Option<Point2<f32>>) -> Self {
        let center = center.unwrap_or_else(|| Point2::new(rect.x_center(), rect.y_center()));
        Self {
            x: rect.x(),
            y: rect.y(),
            width: rect.width(),
            height: rect.height(),
            center_x: center.x,
            center_y: center.y,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::from_top_left(self.x, self.y, self.width, self.height)
    }

    pub fn pivot(&self) -> Point2<f32> {
        Point2::new(self.center_x, self.center_y)
    }
}

/// Native asset dimensions plus the user's adjustments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssetSize {
    pub width: f32,
    pub height: f32,
    pub user_scale: f32,
    /// Fraction of the canvas height.
    pub user_vertical_offset: f32,
}

impl AssetSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            user_scale: 1.0,
            user_vertical_offset: 0.0,
        }
    }

    /// Returns the size of `asset`, or [`None`] if its image is not available.
    pub fn of(asset: &OverlayAsset) -> Option<Self> {
        asset.image()?;
        Some(Self {
            width: asset.width() as f32,
            height: asset.height() as f32,
            user_scale: asset.user_scale(),
            user_vertical_offset: asset.user_vertical_offset(),
        })
    }

    fn aspect(&self) -> Option<f32> {
        (self.width > 0.0 && self.height > 0.0).then(|| self.height / self.width)
    }
}

/// Computes [`Placement`]s for a canvas of a fixed resolution.
pub struct Fitter<'a> {
    calibration: &'a Calibration,
    res: Resolution,
}

impl<'a> Fitter<'a> {
    pub fn new(calibration: &'a Calibration, res: Resolution) -> Self {
        Self { calibration, res }
    }

    /// Fits an overlay given its category name.
    ///
    /// Returns [`None`] for names other than `glasses`, `hat` and `shirt`.
    pub fn fit_named(
        &self,
        category: &str,
        landmarks: Option<&Landmarks>,
        asset: AssetSize,
    ) -> Option<Placement> {
        match category.parse::<Category>() {
            Ok(category) => self.fit(category, landmarks, asset),
            Err(e) => {
                log::debug!("not fitting overlay: {e}");
                None
            }
        }
    }

    /// Fits an overlay of the given category onto the face described by `landmarks`.
    ///
    /// Returns [`None`] if there is no face or the asset has no pixels.
    pub fn fit(
        &self,
        category: Category,
        landmarks: Option<&Landmarks>,
        asset: AssetSize,
    ) -> Option<Placement> {
        let landmarks = landmarks?;
        let aspect = asset.aspect()?;
        let face = Face {
            landmarks,
            res: self.res,
            face_box: face_bounding_box(landmarks, self.res)?,
        };

        let placement = match category {
            Category::Glasses => self.glasses(&face, asset, aspect),
            Category::Hat => self.hat(&face, asset, aspect),
            Category::Shirt => self.shirt(&face, asset, aspect),
        };
        log::trace!("{category} placement: {placement:?}");
        Some(placement)
    }

    fn glasses(&self, face: &Face<'_>, asset: AssetSize, aspect: f32) -> Placement {
        let offset = self.offset(asset);
        let outer = face.pair(LandmarkIdx::LeftEyeOuterCorner, LandmarkIdx::RightEyeOuterCorner);
        let Some((left, right)) = outer else {
            let bx = face.face_box;
            let width = self.fallback_width(face, asset, GLASSES_FALLBACK_WIDTH);
            let height = width * aspect;
            let eye_line = bx.y() + bx.height() * GLASSES_FALLBACK_EYE_LINE;
            let rect = Rect::from_center(bx.x_center(), eye_line + offset, width, height);
            return Placement::new(rect, None);
        };

        let eye_distance = distance(Some(left), Some(right));
        let width = eye_distance
            * GLASSES_WIDTH
            * asset.user_scale
            * self.calibration.eye_scale(eye_distance);
        let height = width * aspect;

        let center_x = (left.x + right.x) / 2.0;
        let eye_level = |outer: Point2<f32>, inner: LandmarkIdx| match face.point(inner) {
            Some(inner) => (outer.y + inner.y) / 2.0,
            None => outer.y,
        };
        let center_y = (eye_level(left, LandmarkIdx::LeftEyeInnerCorner)
            + eye_level(right, LandmarkIdx::RightEyeInnerCorner))
            / 2.0;

        let rect = Rect::from_top_left(
            center_x - width / 2.0,
            center_y - height / 2.0 - height * GLASSES_LIFT + offset,
            width,
            height,
        );
        Placement::new(rect, Some(Point2::new(center_x, center_y)))
    }

    fn hat(&self, face: &Face<'_>, asset: AssetSize, aspect: f32) -> Placement {
        let offset = self.offset(asset);
        let anchor_y = face.forehead_y();

        match face.pair(LandmarkIdx::LeftCheek, LandmarkIdx::RightCheek) {
            Some((left, right)) => {
                let temple_width = distance(Some(left), Some(right));
                let width = temple_width
                    * HAT_WIDTH
                    * asset.user_scale
                    * self.calibration.face_width_scale(temple_width);
                let height = width * aspect;
                let center_x = (left.x + right.x) / 2.0;
                let rect = Rect::from_top_left(
                    center_x - width / 2.0,
                    anchor_y - height * HAT_LIFT + offset,
                    width,
                    height,
                );
                Placement::new(rect, Some(Point2::new(center_x, anchor_y)))
            }
            None => {
                let width = self.fallback_width(face, asset, HAT_FALLBACK_WIDTH);
                let height = width * aspect;
                let rect = Rect::from_top_left(
                    face.face_box.x_center() - width / 2.0,
                    anchor_y - height * HAT_FALLBACK_LIFT + offset,
                    width,
                    height,
                );
                Placement::new(rect, None)
            }
        }
    }

    fn shirt(&self, face: &Face<'_>, asset: AssetSize, aspect: f32) -> Placement {
        let offset = self.offset(asset);
        let anchor_y = face.chin_y();

        let (width, center) = match face.pair(LandmarkIdx::LeftCheek, LandmarkIdx::RightCheek) {
            Some((left, right)) => {
                let jaw_width = distance(Some(left), Some(right));
                let width = jaw_width
                    * SHIRT_WIDTH
                    * asset.user_scale
                    * self.calibration.face_width_scale(jaw_width);
                (width, Some(Point2::new((left.x + right.x) / 2.0, anchor_y)))
            }
            None => (self.fallback_width(face, asset, SHIRT_FALLBACK_WIDTH), None),
        };
        let height = width * aspect;
        let center_x = center.map_or(face.face_box.x_center(), |c| c.x);
        let rect = Rect::from_top_left(
            center_x - width / 2.0,
            anchor_y - height * SHIRT_LIFT + offset,
            width,
            height,
        );
        Placement::new(rect, center)
    }

    fn fallback_width(&self, face: &Face<'_>, asset: AssetSize, factor: f32) -> f32 {
        face.face_box.width()
            * factor
            * asset.user_scale
            * self.calibration.distance_scale(face.face_box.diagonal())
    }

    fn offset(&self, asset: AssetSize) -> f32 {
        asset.user_vertical_offset * self.res.height() as f32
    }
}

struct Face<'a> {
    landmarks: &'a Landmarks,
    res: Resolution,
    face_box: Rect,
}

impl Face<'_> {
    fn point(&self, idx: LandmarkIdx) -> Option<Point2<f32>> {
        self.landmarks.point_at(idx, self.res)
    }

    fn pair(&self, a: LandmarkIdx, b: LandmarkIdx) -> Option<(Point2<f32>, Point2<f32>)> {
        Some((self.point(a)?, self.point(b)?))
    }

    /// Forehead landmark, else an estimate above the eye line, else the face box top.
    fn forehead_y(&self) -> f32 {
        if let Some(forehead) = self.point(LandmarkIdx::Forehead) {
            return forehead.y;
        }
        match self.pair(LandmarkIdx::LeftEyeOuterCorner, LandmarkIdx::RightEyeOuterCorner) {
            Some((l, r)) => (l.y + r.y) / 2.0 - self.face_box.height() * FOREHEAD_ABOVE_EYES,
            None => self.face_box.y(),
        }
    }

    /// Chin landmark, else an estimate below the nose tip, else a fixed point in the face box.
    fn chin_y(&self) -> f32 {
        if let Some(chin) = self.point(LandmarkIdx::Chin) {
            return chin.y;
        }
        match self.point(LandmarkIdx::NoseTip) {
            Some(nose) => nose.y + self.face_box.height() * CHIN_BELOW_NOSE,
            None => self.face_box.y() + self.face_box.height() * CHIN_FALLBACK,
        }
    }
}
