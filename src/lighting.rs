//! Ambient lighting adaptation.
//!
//! The [`estimator`] samples the scene around the face and smooths the measured statistics into a
//! [`LightingState`]. The [`compositor`] applies that state to an overlay before it is drawn, so
//! the product appears lit like the rest of the scene.

pub mod compositor;
pub mod estimator;

use serde::Serialize;

use crate::image::Color;

pub use compositor::LightingCompositor;
pub use estimator::{LightingEstimator, LightingTargets};

/// The color temperature that is considered neutral (no tint), in Kelvin.
pub const NEUTRAL_TEMPERATURE: f32 = 6500.0;

/// Smoothed estimate of the scene lighting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LightingState {
    /// Brightness multiplier, 1.0 is neutral.
    pub brightness: f32,
    /// Contrast multiplier, 1.0 is neutral.
    pub contrast: f32,
    /// Saturation multiplier, 1.0 is neutral.
    pub saturation: f32,
    /// Estimated color temperature in Kelvin.
    pub temperature: f32,
    pub enabled: bool,
}

impl Default for LightingState {
    fn default() -> Self {
        Self {
            brightness: 1.0,
            contrast: 1.0,
            saturation: 1.0,
            temperature: NEUTRAL_TEMPERATURE,
            enabled: true,
        }
    }
}

impl LightingState {
    /// The per-pixel color adjustment described by this state.
    pub fn color_adjust(&self) -> ColorAdjust {
        ColorAdjust {
            brightness: self.brightness,
            contrast: self.contrast,
            saturation: self.saturation,
        }
    }
}

/// Relative luminance of an sRGB color, in range 0 to 255.
#[inline]
pub fn luminance(r: f32, g: f32, b: f32) -> f32 {
    0.299 * r + 0.587 * g + 0.114 * b
}

/// Multiplicative brightness, contrast and saturation adjustment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorAdjust {
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
}

impl ColorAdjust {
    pub const IDENTITY: Self = Self {
        brightness: 1.0,
        contrast: 1.0,
        saturation: 1.0,
    };

    /// Photographic contrast factor for a contrast multiplier of `contrast`.
    ///
    /// Multiplier 1.0 maps to factor 1.0 (no change).
    pub fn contrast_factor(&self) -> f32 {
        let c = self.contrast - 1.0;
        259.0 * (255.0 * c + 255.0) / (255.0 * (259.0 - 255.0 * c))
    }

    /// Applies the adjustment to `color`. Alpha is left unchanged.
    ///
    /// Brightness scales every channel, contrast stretches channels around the midpoint 128, and
    /// saturation moves channels towards or away from the luminance.
    pub fn apply(&self, color: Color) -> Color {
        let factor = self.contrast_factor();
        let [r, g, b] = [color.r(), color.g(), color.b()].map(|c| {
            let c = (f32::from(c) * self.brightness).clamp(0.0, 255.0);
            (factor * (c - 128.0) + 128.0).clamp(0.0, 255.0)
        });

        let lum = luminance(r, g, b);
        let [r, g, b] = [r, g, b].map(|c| {
            (lum + (c - lum) * self.saturation)
                .clamp(0.0, 255.0)
                .round() as u8
        });
        Color::from_rgba8(r, g, b, color.a())
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn identity_adjust() {
        let adjust = LightingState::default().color_adjust();
        assert!(adjust.is_identity());
        assert_relative_eq!(adjust.contrast_factor(), 1.0);
        for color in [
            Color::from_rgba8(12, 200, 99, 17),
            Color::WHITE,
            Color::NULL,
            Color::from_rgb8(128, 128, 128),
        ] {
            assert_eq!(adjust.apply(color), color);
        }
    }

    #[test]
    fn brightness() {
        let adjust = ColorAdjust {
            brightness: 0.5,
            ..ColorAdjust::IDENTITY
        };
        assert_eq!(
            adjust.apply(Color::from_rgba8(200, 100, 50, 40)),
            Color::from_rgba8(100, 50, 25, 40)
        );
    }

    #[test]
    fn contrast_curve() {
        let adjust = ColorAdjust {
            contrast: 1.2,
            ..ColorAdjust::IDENTITY
        };
        let factor = adjust.contrast_factor();
        // c = 0.2: 259 * 306 / (255 * 208)
        assert_relative_eq!(factor, 259.0 * 306.0 / (255.0 * 208.0), epsilon = 1e-4);

        let gray = Color::from_rgb8(128, 128, 128);
        assert_eq!(adjust.apply(gray), gray);
        let out = adjust.apply(Color::from_rgb8(160, 160, 160));
        assert_eq!(out.r(), (128.0 + 32.0 * factor).round() as u8);

        let low = ColorAdjust {
            contrast: 0.8,
            ..ColorAdjust::IDENTITY
        };
        assert!(low.contrast_factor() < 1.0);
        assert!(low.apply(Color::from_rgb8(250, 250, 250)).r() < 250);
    }

    #[test]
    fn saturation() {
        let gray = ColorAdjust {
            saturation: 0.0,
            ..ColorAdjust::IDENTITY
        };
        let out = gray.apply(Color::from_rgb8(255, 0, 0));
        let lum = luminance(255.0, 0.0, 0.0).round() as u8;
        assert_eq!(out, Color::from_rgb8(lum, lum, lum));

        let vivid = ColorAdjust {
            saturation: 1.3,
            ..ColorAdjust::IDENTITY
        };
        let out = vivid.apply(Color::from_rgb8(150, 100, 100));
        assert!(out.r() > 150);
        assert!(out.g() < 100);
    }
}
