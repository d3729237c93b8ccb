//! Draws overlays adjusted to the estimated scene lighting.

use std::borrow::Cow;

use crate::{
    fit::Placement,
    image::{BlendMode, Color, Image},
    surface::Surface,
};

use super::{LightingState, NEUTRAL_TEMPERATURE};

/// Relative temperature deviation below which no tint is applied.
const TINT_DEADBAND: f32 = 0.05;
/// Tint opacity per unit of relative deviation.
const TINT_STRENGTH: f32 = 0.3;
const MAX_TINT_ALPHA: f32 = 0.3;

const COOL_TINT: Color = Color::from_rgb8(100, 150, 255);
const WARM_TINT: Color = Color::from_rgb8(255, 170, 90);

#[derive(Debug, Clone, Copy)]
pub struct LightingCompositor {
    tint: bool,
}

impl Default for LightingCompositor {
    fn default() -> Self {
        Self::new(true)
    }
}

impl LightingCompositor {
    /// Creates a compositor. `tint` controls whether the color temperature tint is applied.
    pub fn new(tint: bool) -> Self {
        Self { tint }
    }

    /// Returns the translucent tint color for a color temperature, or [`None`] inside the
    /// deadband around the neutral temperature.
    ///
    /// Temperatures above neutral get a cool (blue) tint, temperatures below a warm (orange) one.
    pub fn tint_for(temperature: f32) -> Option<Color> {
        let deviation = (temperature - NEUTRAL_TEMPERATURE) / NEUTRAL_TEMPERATURE;
        if deviation.abs() <= TINT_DEADBAND {
            return None;
        }
        let alpha = (deviation.abs() * TINT_STRENGTH).min(MAX_TINT_ALPHA);
        let base = if deviation > 0.0 { COOL_TINT } else { WARM_TINT };
        Some(base.with_alpha((alpha * 255.0).round() as u8))
    }

    /// Applies the lighting state to a copy of `overlay`.
    ///
    /// Returns `overlay` itself if the state would not change it.
    pub fn adjust<'a>(&self, overlay: &'a Image, state: &LightingState) -> Cow<'a, Image> {
        if !state.enabled {
            return Cow::Borrowed(overlay);
        }

        let adjust = state.color_adjust();
        let tint = if self.tint {
            Self::tint_for(state.temperature)
        } else {
            None
        };
        if adjust.is_identity() && tint.is_none() {
            return Cow::Borrowed(overlay);
        }

        let mut adjusted = overlay.clone();
        if !adjust.is_identity() {
            adjusted.map_in_place(|color| adjust.apply(color));
        }
        if let Some(tint) = tint {
            // Multiply keeps the overlay's alpha, so the tint only lands on the overlay itself.
            let tint = Image::filled(1, 1, tint);
            adjusted.blend_from(&tint).mode(BlendMode::Multiply);
        }
        Cow::Owned(adjusted)
    }

    /// Draws `overlay` at `placement`, rotated by `rotation` radians around the placement's pivot
    /// and adjusted to `state`.
    pub fn draw<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        overlay: &Image,
        placement: &Placement,
        rotation: f32,
        state: &LightingState,
    ) {
        let adjusted = self.adjust(overlay, state);
        surface.draw_rotated(&adjusted, placement.rect(), rotation, placement.pivot());
    }
}
