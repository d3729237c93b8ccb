//! The drawing surface the frame compositor renders into.

use nalgebra::Point2;

use crate::error::ReadbackError;
use crate::image::{BlendMode, Color, Image};
use crate::rect::Rect;
use crate::resolution::Resolution;

/// A 2D raster surface supporting image composition, rotation and pixel readback.
///
/// [`Image`] is the in-memory implementation. Other implementations may refuse readback (for
/// example when the surface holds content it is not allowed to expose), which callers have to
/// tolerate.
pub trait Surface {
    fn resolution(&self) -> Resolution;

    /// Fills the whole surface with `color`.
    fn clear(&mut self, color: Color);

    /// Draws `image` stretched onto `dest`, replacing the covered pixels.
    fn draw_image(&mut self, image: &Image, dest: Rect);

    /// Alpha-blends `image` onto `dest` after rotating `dest` clockwise by `radians` around
    /// `pivot`.
    fn draw_rotated(&mut self, image: &Image, dest: Rect, radians: f32, pivot: Point2<f32>);

    /// Reads back the pixels inside `region`.
    fn read_pixels(&self, region: Rect) -> Result<Image, ReadbackError>;

    /// Returns a copy of everything drawn so far.
    fn snapshot(&self) -> Image;
}

impl Surface for Image {
    fn resolution(&self) -> Resolution {
        Image::resolution(self)
    }

    fn clear(&mut self, color: Color) {
        Image::clear(self, color)
    }

    fn draw_image(&mut self, image: &Image, dest: Rect) {
        self.blend_from(image)
            .target(dest)
            .mode(BlendMode::Overwrite);
    }

    fn draw_rotated(&mut self, image: &Image, dest: Rect, radians: f32, pivot: Point2<f32>) {
        self.blend_from(image)
            .target(dest)
            .rotate(radians, Some(pivot))
            .mode(BlendMode::Alpha);
    }

    fn read_pixels(&self, region: Rect) -> Result<Image, ReadbackError> {
        self.crop(region).ok_or(ReadbackError::OutOfBounds {
            region,
            res: Image::resolution(self),
        })
    }

    fn snapshot(&self) -> Image {
        self.clone()
    }
}
