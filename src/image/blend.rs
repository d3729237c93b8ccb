use itertools::Itertools;
use nalgebra::Point2;

use super::{Color, Image};
use crate::rect::Rect;

/// Describes how to blend pixels together in a [`Blend`] operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    /// All destination pixels will be overwritten with the corresponding source pixel.
    Overwrite,

    /// Performs alpha blending between source and destination pixels to make the source image
    /// appear in front of the destination image.
    Alpha,

    /// Multiplies destination colors with the source color, weighted by the source alpha.
    ///
    /// The destination alpha is kept, so transparent destination pixels stay transparent (the
    /// effect only lands "atop" existing content).
    Multiply,
}

/// A blending operation between two images.
///
/// Returned by [`Image::blend_from`][super::Image::blend_from]. The blend is performed when this
/// value is dropped.
pub struct Blend<'a> {
    dest: &'a mut Image,
    src: &'a Image,
    mode: BlendMode,
    target: Rect,
    rotation: f32,
    pivot: Option<Point2<f32>>,
}

impl<'a> Blend<'a> {
    pub(super) fn new(dest: &'a mut Image, src: &'a Image) -> Self {
        let target = dest.rect();
        Self {
            dest,
            src,
            mode: BlendMode::Alpha,
            target,
            rotation: 0.0,
            pivot: None,
        }
    }

    /// Sets the blend mode to use.
    pub fn mode(&mut self, mode: BlendMode) -> &mut Self {
        self.mode = mode;
        self
    }

    /// Sets the destination rectangle that the source image is stretched onto.
    ///
    /// The rectangle may lie partially or completely outside of the destination image.
    pub fn target(&mut self, rect: Rect) -> &mut Self {
        self.target = rect;
        self
    }

    /// Rotates the destination rectangle clockwise by `radians` around `pivot`.
    ///
    /// Without a pivot, the rectangle rotates around its center.
    pub fn rotate(&mut self, radians: f32, pivot: Option<Point2<f32>>) -> &mut Self {
        self.rotation = radians;
        self.pivot = pivot;
        self
    }

    fn transform(&self) -> (Point2<f32>, f32, f32) {
        let pivot = self
            .pivot
            .unwrap_or_else(|| Point2::new(self.target.x_center(), self.target.y_center()));
        let (sin, cos) = self.rotation.sin_cos();
        (pivot, sin, cos)
    }

    /// Destination-space bounding box of the rotated target rectangle.
    fn covered(&self) -> Option<Rect> {
        let (pivot, sin, cos) = self.transform();
        let t = &self.target;
        let corners = [
            (t.x(), t.y()),
            (t.x_max(), t.y()),
            (t.x(), t.y_max()),
            (t.x_max(), t.y_max()),
        ]
        .map(|(x, y)| {
            let (dx, dy) = (x - pivot.x, y - pivot.y);
            Point2::new(
                pivot.x + cos * dx - sin * dy,
                pivot.y + sin * dx + cos * dy,
            )
        });
        Rect::bounding(corners)?.intersection(&self.dest.rect())
    }
}

impl Drop for Blend<'_> {
    fn drop(&mut self) {
        if self.target.width() <= 0.0
            || self.target.height() <= 0.0
            || self.src.width() == 0
            || self.src.height() == 0
        {
            return;
        }
        let Some(covered) = self.covered() else {
            return;
        };

        let (pivot, sin, cos) = self.transform();
        let x_range = covered.x().floor() as u32..(covered.x_max().ceil() as u32).min(self.dest.width());
        let y_range = covered.y().floor() as u32..(covered.y_max().ceil() as u32).min(self.dest.height());

        for (dest_y, dest_x) in y_range.cartesian_product(x_range) {
            // Map the destination pixel center back into the unrotated target rectangle.
            let (dx, dy) = (dest_x as f32 + 0.5 - pivot.x, dest_y as f32 + 0.5 - pivot.y);
            let u = pivot.x + cos * dx + sin * dy - self.target.x();
            let v = pivot.y - sin * dx + cos * dy - self.target.y();
            if u < 0.0 || v < 0.0 || u >= self.target.width() || v >= self.target.height() {
                continue;
            }

            let src_x = ((u / self.target.width() * self.src.width() as f32) as u32)
                .min(self.src.width() - 1);
            let src_y = ((v / self.target.height() * self.src.height() as f32) as u32)
                .min(self.src.height() - 1);

            let src_pix = self.src.get(src_x, src_y);
            let dest_pix = self.dest.get(dest_x, dest_y);
            let result = match self.mode {
                BlendMode::Overwrite => blend_overwrite(dest_pix, src_pix),
                BlendMode::Alpha => blend_alpha(dest_pix, src_pix),
                BlendMode::Multiply => blend_multiply(dest_pix, src_pix),
            };
            self.dest.set(dest_x, dest_y, result);
        }
    }
}

fn blend_overwrite(_dest: Color, src: Color) -> Color {
    src
}

fn blend_alpha(dest: Color, src: Color) -> Color {
    fn blend_color(dest: f32, src: f32, dest_alpha: f32, src_alpha: f32, result_alpha: f32) -> f32 {
        (src * src_alpha + dest * dest_alpha * (1.0 - src_alpha)) / result_alpha
    }

    match src.a() {
        255 => return src,
        0 => return dest,
        _ => {}
    }

    let dest = LinearColor::new(dest);
    let src = LinearColor::new(src);

    let result_alpha = src.a() + dest.a() * (1.0 - src.a());
    let r = blend_color(dest.r(), src.r(), dest.a(), src.a(), result_alpha);
    let g = blend_color(dest.g(), src.g(), dest.a(), src.a(), result_alpha);
    let b = blend_color(dest.b(), src.b(), dest.a(), src.a(), result_alpha);

    LinearColor([r, g, b, result_alpha]).to_color()
}

fn blend_multiply(dest: Color, src: Color) -> Color {
    let alpha = f32::from(src.a()) / 255.0;
    let channel = |d: u8, s: u8| {
        let d = f32::from(d);
        let multiplied = d * f32::from(s) / 255.0;
        (d + (multiplied - d) * alpha).round() as u8
    };
    Color([
        channel(dest.r(), src.r()),
        channel(dest.g(), src.g()),
        channel(dest.b(), src.b()),
        dest.a(),
    ])
}

struct LinearColor([f32; 4]);

impl LinearColor {
    fn new(color: Color) -> Self {
        fn to_linear(srgb: f32) -> f32 {
            if srgb <= 0.04045 {
                srgb / 12.92
            } else {
                ((srgb + 0.055) / 1.055).powf(2.4)
            }
        }

        let [r, g, b, a] = color.0.map(|c| f32::from(c) / 255.0);
        Self([to_linear(r), to_linear(g), to_linear(b), a])
    }

    fn to_color(&self) -> Color {
        fn to_srgb(rgb: f32) -> f32 {
            if rgb <= 0.0031308 {
                rgb * 12.92
            } else {
                1.055 * rgb.powf(1.0 / 2.4) - 0.055
            }
        }

        let [r, g, b, a] = self.0;
        let [r, g, b] = [r, g, b].map(to_srgb);
        Color([r, g, b, a].map(|c| (c * 255.0).round() as u8))
    }

    fn r(&self) -> f32 {
        self.0[0]
    }

    fn g(&self) -> f32 {
        self.0[1]
    }

    fn b(&self) -> f32 {
        self.0[2]
    }

    fn a(&self) -> f32 {
        self.0[3]
    }
}
