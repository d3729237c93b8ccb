//! Types for representing image and canvas resolutions.

use std::fmt;

use crate::rect::Rect;

/// Resolution (`width x height`) of an image, canvas, or camera frame.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    width: u32,
    height: u32,
}

impl Resolution {
    /// 720p resolution: `1280x720`
    pub const RES_720P: Self = Self {
        width: 1280,
        height: 720,
    };

    /// Creates a new [`Resolution`] of `width x height`.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns the width of this [`Resolution`].
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height of this [`Resolution`].
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn num_pixels(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Returns the shorter of the two dimensions.
    #[inline]
    pub fn min_dimension(&self) -> u32 {
        self.width.min(self.height)
    }

    /// Returns a [`Rect`] positioned at `(0, 0)` covering the whole resolution.
    #[inline]
    pub fn rect(&self) -> Rect {
        Rect::from_top_left(0.0, 0.0, self.width as f32, self.height as f32)
    }

    /// Returns `true` if either dimension is zero.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl From<(u32, u32)> for Resolution {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(width, height)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution() {
        let res = Resolution::new(640, 480);
        assert_eq!(res.to_string(), "640x480");
        assert_eq!(res.num_pixels(), 307_200);
        assert_eq!(res.min_dimension(), 480);
        assert!(!res.is_empty());
        assert!(Resolution::new(0, 10).is_empty());
        assert_eq!(res.rect(), Rect::from_top_left(0.0, 0.0, 640.0, 480.0));
    }
}
