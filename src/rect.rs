//! Axis-aligned rectangles in pixel space.
//!
//! Face boxes, sample regions and overlay placements are all expressed with [`Rect`].

use std::fmt;

use nalgebra::Point2;

/// An axis-aligned rectangle with floating-point coordinates.
///
/// Rectangles are allowed to have zero height and/or width. Negative dimensions are not allowed.
#[derive(Clone, Copy, PartialEq)]
pub struct Rect {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

impl Rect {
    /// Creates a rectangle extending outwards from a center point.
    #[inline]
    pub fn from_center(x_center: f32, y_center: f32, width: f32, height: f32) -> Self {
        Self::from_top_left(
            x_center - width * 0.5,
            y_center - height * 0.5,
            width,
            height,
        )
    }

    /// Creates a rectangle extending downwards and right from a point.
    #[inline]
    pub fn from_top_left(top_left_x: f32, top_left_y: f32, width: f32, height: f32) -> Self {
        Self {
            x: top_left_x,
            y: top_left_y,
            width,
            height,
        }
    }

    /// Computes the (axis-aligned) bounding rectangle that encompasses `points`.
    ///
    /// This is a single pass over `points` that tracks the running minimum and maximum of both
    /// coordinates.
    ///
    /// Returns [`None`] if `points` is an empty iterator.
    pub fn bounding<I: IntoIterator<Item = Point2<f32>>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();

        let first = iter.next()?;
        let (mut x_min, mut x_max, mut y_min, mut y_max) = (first.x, first.x, first.y, first.y);

        for pt in iter {
            x_min = x_min.min(pt.x);
            x_max = x_max.max(pt.x);
            y_min = y_min.min(pt.y);
            y_max = y_max.max(pt.y);
        }

        Some(Self::from_top_left(
            x_min,
            y_min,
            x_max - x_min,
            y_max - y_min,
        ))
    }

    /// Returns the X coordinate of the left side of the rectangle.
    #[inline]
    pub fn x(&self) -> f32 {
        self.x
    }

    /// Returns the Y coordinate of the top side of the rectangle.
    #[inline]
    pub fn y(&self) -> f32 {
        self.y
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.height
    }

    #[inline]
    pub fn x_center(&self) -> f32 {
        self.x + self.width * 0.5
    }

    #[inline]
    pub fn y_center(&self) -> f32 {
        self.y + self.height * 0.5
    }

    /// Returns the X coordinate of the right side of the rectangle.
    #[inline]
    pub fn x_max(&self) -> f32 {
        self.x + self.width
    }

    /// Returns the Y coordinate of the bottom side of the rectangle.
    #[inline]
    pub fn y_max(&self) -> f32 {
        self.y + self.height
    }

    /// Length of the rectangle's diagonal, `sqrt(width² + height²)`.
    #[inline]
    pub fn diagonal(&self) -> f32 {
        self.width.hypot(self.height)
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Returns whether `pt` lies inside `self` or on its border.
    pub fn contains_point(&self, pt: Point2<f32>) -> bool {
        pt.x >= self.x && pt.x <= self.x_max() && pt.y >= self.y && pt.y <= self.y_max()
    }

    #[must_use]
    pub fn move_by(&self, dx: f32, dy: f32) -> Rect {
        Rect::from_top_left(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Computes the intersection of `self` and `other`.
    ///
    /// Returns [`None`] when the intersection is empty (ie. the rectangles do not overlap).
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x_min = self.x.max(other.x);
        let y_min = self.y.max(other.y);
        let x_max = self.x_max().min(other.x_max());
        let y_max = self.y_max().min(other.y_max());
        if x_min >= x_max || y_min >= y_max {
            return None;
        }

        Some(Rect::from_top_left(
            x_min,
            y_min,
            x_max - x_min,
            y_max - y_min,
        ))
    }
}

impl fmt::Debug for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rect @ ({:.1},{:.1})-({:.1},{:.1})/{:.1}x{:.1}",
            self.x,
            self.y,
            self.x_max(),
            self.y_max(),
            self.width,
            self.height,
        )
    }
}
