//! CPU raster images.
//!
//! This module provides:
//!
//! - The [`Image`] type, an owned RGBA image that also serves as the default drawing surface.
//! - [`Color`], an 8-bit sRGB color with straight alpha.
//! - [`Blend`], a builder for compositing one image onto a (rotated) rectangle of another.

mod blend;

#[cfg(test)]
mod tests;

use std::{fmt, ops::Index, path::Path};

use image::{ImageBuffer, Rgba, RgbaImage};

use crate::{error::AssetError, rect::Rect, resolution::Resolution};

pub use blend::*;

#[derive(Debug, Clone, Copy)]
#[non_exhaustive]
enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    fn from_path(path: &Path) -> Result<Self, AssetError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("jpg" | "jpeg") => Ok(Self::Jpeg),
            Some("png") => Ok(Self::Png),
            _ => Err(AssetError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    fn to_image_format(self) -> image::ImageFormat {
        match self {
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::Png => image::ImageFormat::Png,
        }
    }
}

/// An 8-bit sRGB image with alpha channel.
#[derive(Clone, PartialEq)]
pub struct Image {
    pub(crate) buf: RgbaImage,
}

impl Image {
    /// Loads an image from the filesystem.
    ///
    /// The path must have a supported file extension (`jpeg`, `jpg` or `png`).
    pub fn load<A: AsRef<Path>>(path: A) -> Result<Self, AssetError> {
        Self::load_impl(path.as_ref())
    }

    fn load_impl(path: &Path) -> Result<Self, AssetError> {
        let format = ImageFormat::from_path(path)?;
        let data = std::fs::read(path).map_err(|source| AssetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let buf = image::load_from_memory_with_format(&data, format.to_image_format())?.to_rgba8();
        log::debug!("loaded {}x{} image from '{}'", buf.width(), buf.height(), path.display());
        Ok(Self { buf })
    }

    /// Decodes a PNG or JPEG image from a byte slice, guessing the format from its contents.
    pub fn decode(data: &[u8]) -> Result<Self, AssetError> {
        let buf = image::load_from_memory(data)?.to_rgba8();
        Ok(Self { buf })
    }

    /// Saves an image to the file system.
    ///
    /// The path must have a supported file extension (`jpeg`, `jpg` or `png`). JPEG output drops
    /// the alpha channel.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), crate::Error> {
        self.save_impl(path.as_ref())
    }

    fn save_impl(&self, path: &Path) -> Result<(), crate::Error> {
        match ImageFormat::from_path(path)? {
            ImageFormat::Jpeg => {
                let rgb = image::DynamicImage::ImageRgba8(self.buf.clone()).to_rgb8();
                Ok(rgb.save_with_format(path, image::ImageFormat::Jpeg)?)
            }
            ImageFormat::Png => Ok(self.buf.save_with_format(path, image::ImageFormat::Png)?),
        }
    }

    /// Creates an empty image of a specified size.
    ///
    /// The image will start out black and fully transparent.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            buf: ImageBuffer::new(width, height),
        }
    }

    /// Creates an image of a specified size where every pixel is `color`.
    pub fn filled(width: u32, height: u32, color: Color) -> Self {
        Self {
            buf: ImageBuffer::from_pixel(width, height, Rgba(color.0)),
        }
    }

    /// Returns the width of this image, in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.buf.width()
    }

    /// Returns the height of this image, in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.buf.height()
    }

    /// Returns the size of this image.
    #[inline]
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width(), self.height())
    }

    /// Returns a [`Rect`] covering this image.
    #[inline]
    pub fn rect(&self) -> Rect {
        self.resolution().rect()
    }

    /// Gets the image color at the given pixel coordinates.
    ///
    /// # Panics
    ///
    /// This will panic if `(x, y)` is outside the bounds of this image.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Color {
        Color(self.buf[(x, y)].0)
    }

    /// Sets the image color at the given pixel coordinates.
    ///
    /// # Panics
    ///
    /// This will panic if `(x, y)` is outside the bounds of this image.
    #[inline]
    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        self.buf[(x, y)] = Rgba(color.0);
    }

    /// Returns an iterator over all pixel colors, row by row.
    pub fn pixels(&self) -> impl Iterator<Item = Color> + '_ {
        self.buf.pixels().map(|pix| Color(pix.0))
    }

    /// Replaces every pixel with the result of `f`.
    pub fn map_in_place(&mut self, mut f: impl FnMut(Color) -> Color) {
        self.buf.pixels_mut().for_each(|pix| pix.0 = f(Color(pix.0)).0);
    }

    /// Clears the image, setting every pixel value to `color`.
    pub fn clear(&mut self, color: Color) {
        self.buf.pixels_mut().for_each(|pix| pix.0 = color.0);
    }

    pub fn flip_horizontal_in_place(&mut self) {
        image::imageops::flip_horizontal_in_place(&mut self.buf);
    }

    /// Returns a copy of this image stretched or shrunk to `res`.
    ///
    /// This uses nearest neighbor interpolation and does not preserve the aspect ratio.
    pub fn resized(&self, res: Resolution) -> Image {
        let mut out = Image::new(res.width(), res.height());
        out.blend_from(self).mode(BlendMode::Overwrite);
        out
    }

    /// Copies the pixels of `self` that lie in `region` into a new image.
    ///
    /// `region` is clipped to the image. Returns [`None`] if the clipped region contains no pixel.
    pub fn crop(&self, region: Rect) -> Option<Image> {
        let clipped = region.intersection(&self.rect())?;
        let x0 = clipped.x().floor() as u32;
        let y0 = clipped.y().floor() as u32;
        let x1 = (clipped.x_max().ceil() as u32).min(self.width());
        let y1 = (clipped.y_max().ceil() as u32).min(self.height());
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        let view = image::imageops::crop_imm(&self.buf, x0, y0, x1 - x0, y1 - y0);
        Some(Image {
            buf: view.to_image(),
        })
    }

    /// Composites a `src` image onto `self`, stretching or shrinking `src` as necessary.
    ///
    /// By default, this alpha-blends the *entire* `src` onto the *entire* destination. The
    /// returned [`Blend`] can narrow the destination to a (rotated) rectangle and change the blend
    /// mode. The operation is performed when the [`Blend`] is dropped.
    pub fn blend_from<'b>(&'b mut self, src: &'b Image) -> Blend<'b> {
        Blend::new(self, src)
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} Image", self.width(), self.height())
    }
}

/// An 8-bit RGBA color.
///
/// Colors are always in the sRGB color space and use non-premultiplied alpha.
#[derive(PartialEq, Eq, Clone, Copy)]
pub struct Color(pub(crate) [u8; 4]);

impl Color {
    /// Fully transparent black (all components are 0).
    pub const NULL: Self = Self([0, 0, 0, 0]);
    pub const BLACK: Self = Self([0, 0, 0, 255]);
    pub const WHITE: Self = Self([255, 255, 255, 255]);
    pub const RED: Self = Self([255, 0, 0, 255]);
    pub const GREEN: Self = Self([0, 255, 0, 255]);
    pub const BLUE: Self = Self([0, 0, 255, 255]);

    #[inline]
    pub const fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b, 255])
    }

    #[inline]
    pub const fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self([r, g, b, a])
    }

    #[inline]
    pub fn r(&self) -> u8 {
        self.0[0]
    }

    #[inline]
    pub fn g(&self) -> u8 {
        self.0[1]
    }

    #[inline]
    pub fn b(&self) -> u8 {
        self.0[2]
    }

    #[inline]
    pub fn a(&self) -> u8 {
        self.0[3]
    }

    pub fn with_alpha(mut self, a: u8) -> Color {
        self.0[3] = a;
        self
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:02x}{:02x}{:02x}{:02x}",
            self.r(),
            self.g(),
            self.b(),
            self.a(),
        )
    }
}

impl Index<usize> for Color {
    type Output = u8;

    #[inline]
    fn index(&self, index: usize) -> &u8 {
        &self.0[index]
    }
}
