//! Coarse statistical estimate of the scene lighting around the face.

use crate::{
    config::LightingConfig,
    error::ReadbackError,
    filter::{Ema, Filter},
    image::Image,
    rect::Rect,
    resolution::Resolution,
    surface::Surface,
};

use super::{luminance, LightingState, NEUTRAL_TEMPERATURE};

/// Half the side of the square sample region, relative to the shorter sample surface dimension.
const REGION_RADIUS: f32 = 0.3;

const BRIGHTNESS_RANGE: (f32, f32) = (0.5, 1.5);
const CONTRAST_RANGE: (f32, f32) = (0.8, 1.3);
const SATURATION_RANGE: (f32, f32) = (0.7, 1.3);

/// Lighting values measured from a single sample, before smoothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightingTargets {
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
    pub temperature: f32,
}

impl LightingTargets {
    /// Computes lighting targets from the pixels of a sample region.
    ///
    /// Returns [`None`] if `pixels` is empty.
    pub fn from_pixels(pixels: &Image) -> Option<Self> {
        let mut count = 0usize;
        let (mut r_sum, mut g_sum, mut b_sum, mut lum_sum) = (0.0f64, 0.0f64, 0.0f64, 0.0f64);
        let (mut min_lum, mut max_lum) = (f32::INFINITY, f32::NEG_INFINITY);

        for pix in pixels.pixels() {
            let (r, g, b) = (f32::from(pix.r()), f32::from(pix.g()), f32::from(pix.b()));
            let lum = luminance(r, g, b);
            r_sum += f64::from(r);
            g_sum += f64::from(g);
            b_sum += f64::from(b);
            lum_sum += f64::from(lum);
            min_lum = min_lum.min(lum);
            max_lum = max_lum.max(lum);
            count += 1;
        }
        if count == 0 {
            return None;
        }

        let n = count as f64;
        let (avg_r, avg_g, avg_b) = ((r_sum / n) as f32, (g_sum / n) as f32, (b_sum / n) as f32);
        let avg_lum = (lum_sum / n) as f32;

        let brightness =
            ((max_lum + min_lum) / 2.0 / 128.0).clamp(BRIGHTNESS_RANGE.0, BRIGHTNESS_RANGE.1);
        let contrast =
            (0.9 + (max_lum - min_lum) / 128.0 * 0.4).clamp(CONTRAST_RANGE.0, CONTRAST_RANGE.1);

        let color_variance = ((avg_r - avg_lum).abs()
            + (avg_g - avg_lum).abs()
            + (avg_b - avg_lum).abs())
            / 3.0;
        let saturation =
            (0.9 + color_variance / 128.0 * 0.4).clamp(SATURATION_RANGE.0, SATURATION_RANGE.1);

        let color_balance = if avg_r + avg_b > 0.0 {
            avg_r.max(avg_b) / (avg_r + avg_b)
        } else {
            0.5
        };
        let temperature = 4000.0 + color_balance * 4000.0;

        Some(Self {
            brightness,
            contrast,
            saturation,
            temperature,
        })
    }
}

/// Samples lighting from frames and smooths it into a [`LightingState`].
///
/// Frames are first shrunk into a small sampling surface of type `S`, so the cost of a sample is
/// independent of the frame size. Sampling is throttled to every n-th frame (see
/// [`LightingEstimator::set_interval`]).
pub struct LightingEstimator<S: Surface = Image> {
    surface: S,
    brightness: Ema,
    contrast: Ema,
    saturation: Ema,
    temperature: Ema,
    enabled: bool,
    interval: u32,
    frame_counter: u32,
}

impl LightingEstimator<Image> {
    pub fn new(config: &LightingConfig) -> Self {
        let size = config.sample_size.max(1);
        Self::with_surface(Image::new(size, size), config)
    }
}

impl<S: Surface> LightingEstimator<S> {
    /// Creates an estimator that samples through `surface`.
    pub fn with_surface(surface: S, config: &LightingConfig) -> Self {
        let initial = LightingState::default();
        let smoothing = if (0.0..=1.0).contains(&config.smoothing) {
            config.smoothing
        } else {
            let default = LightingConfig::default().smoothing;
            log::warn!("invalid lighting smoothing {}, using {default}", config.smoothing);
            default
        };
        Self {
            surface,
            brightness: Ema::retaining(smoothing, initial.brightness),
            contrast: Ema::retaining(smoothing, initial.contrast),
            saturation: Ema::retaining(smoothing, initial.saturation),
            temperature: Ema::retaining(smoothing, initial.temperature),
            enabled: config.enabled,
            interval: config.live_interval.max(1),
            frame_counter: 0,
        }
    }

    /// Returns the current smoothed lighting state.
    pub fn state(&self) -> LightingState {
        let neutral = LightingState::default();
        LightingState {
            brightness: self.brightness.value().unwrap_or(neutral.brightness),
            contrast: self.contrast.value().unwrap_or(neutral.contrast),
            saturation: self.saturation.value().unwrap_or(neutral.saturation),
            temperature: self.temperature.value().unwrap_or(NEUTRAL_TEMPERATURE),
            enabled: self.enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Samples on every `interval`-th call to [`LightingEstimator::on_frame`].
    pub fn set_interval(&mut self, interval: u32) {
        self.interval = interval.max(1);
        self.frame_counter = 0;
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    /// Returns the lighting state to neutral.
    pub fn reset(&mut self) {
        self.brightness.reset();
        self.contrast.reset();
        self.saturation.reset();
        self.temperature.reset();
        self.frame_counter = 0;
    }

    /// Counts a drawn frame and samples `frame` if this frame is due.
    ///
    /// Sampling failures are logged and skipped; the previous state is kept. Returns whether the
    /// state was updated.
    pub fn on_frame(&mut self, frame: &Image, face_box: Option<Rect>) -> bool {
        if !self.enabled {
            return false;
        }

        let due = self.frame_counter == 0;
        self.frame_counter = (self.frame_counter + 1) % self.interval;
        if !due {
            return false;
        }

        match self.sample(frame, face_box) {
            Ok(targets) => {
                log::trace!("lighting targets: {targets:?}");
                true
            }
            Err(e) => {
                log::debug!("skipping lighting sample: {e}");
                false
            }
        }
    }

    /// Samples `frame` right away and blends the result into the lighting state.
    pub fn sample(
        &mut self,
        frame: &Image,
        face_box: Option<Rect>,
    ) -> Result<LightingTargets, ReadbackError> {
        let sample_res = self.surface.resolution();
        self.surface.draw_image(frame, sample_res.rect());

        let region = sample_region(sample_res, frame.resolution(), face_box);
        let pixels = self.surface.read_pixels(region)?;
        let targets = LightingTargets::from_pixels(&pixels).ok_or(ReadbackError::OutOfBounds {
            region,
            res: sample_res,
        })?;

        self.brightness.push(targets.brightness);
        self.contrast.push(targets.contrast);
        self.saturation.push(targets.saturation);
        self.temperature.push(targets.temperature);
        Ok(targets)
    }
}

/// Computes the sample region in sampling surface coordinates.
///
/// The region is centered on the top-left corner of the face box, mapped from `frame_res` into
/// `sample_res`, or on the center of the surface when there is no face.
pub fn sample_region(
    sample_res: Resolution,
    frame_res: Resolution,
    face_box: Option<Rect>,
) -> Rect {
    let (sw, sh) = (sample_res.width() as f32, sample_res.height() as f32);
    let center = match face_box {
        Some(face_box) if !frame_res.is_empty() => (
            face_box.x() * sw / frame_res.width() as f32,
            face_box.y() * sh / frame_res.height() as f32,
        ),
        _ => (sw / 2.0, sh / 2.0),
    };
    let radius = sample_res.min_dimension() as f32 * REGION_RADIUS;
    Rect::from_center(center.0, center.1, radius * 2.0, radius * 2.0)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use nalgebra::Point2;

    use super::*;
    use crate::image::Color;

    struct TaintedSurface(Image);

    impl Surface for TaintedSurface {
        fn resolution(&self) -> Resolution {
            self.0.resolution()
        }

        fn clear(&mut self, color: Color) {
            self.0.clear(color)
        }

        fn draw_image(&mut self, image: &Image, dest: Rect) {
            self.0.draw_image(image, dest)
        }

        fn draw_rotated(&mut self, image: &Image, dest: Rect, radians: f32, pivot: Point2<f32>) {
            self.0.draw_rotated(image, dest, radians, pivot)
        }

        fn read_pixels(&self, _region: Rect) -> Result<Image, ReadbackError> {
            Err(ReadbackError::Refused("cross-origin content".into()))
        }

        fn snapshot(&self) -> Image {
            self.0.clone()
        }
    }

    #[test]
    fn mid_gray_targets() {
        let gray = Image::filled(8, 8, Color::from_rgb8(128, 128, 128));
        let targets = LightingTargets::from_pixels(&gray).unwrap();
        assert_relative_eq!(targets.brightness, 1.0, epsilon = 1e-4);
        assert_relative_eq!(targets.contrast, 0.9, epsilon = 1e-4);
        assert_relative_eq!(targets.saturation, 0.9, epsilon = 1e-4);
        assert_relative_eq!(targets.temperature, 6000.0, epsilon = 1e-2);

        assert_eq!(LightingTargets::from_pixels(&Image::new(0, 0)), None);
    }

    #[test]
    fn targets_are_clamped() {
        let mut image = Image::filled(2, 1, Color::BLACK);
        image.set(1, 0, Color::WHITE);
        let targets = LightingTargets::from_pixels(&image).unwrap();
        assert_relative_eq!(targets.brightness, 255.0 / 2.0 / 128.0, epsilon = 1e-3);
        assert_relative_eq!(targets.contrast, 1.3);

        let dark = LightingTargets::from_pixels(&Image::filled(1, 1, Color::BLACK)).unwrap();
        assert_relative_eq!(dark.brightness, 0.5);
        assert_relative_eq!(dark.temperature, 6000.0);

        let blue = LightingTargets::from_pixels(&Image::filled(1, 1, Color::BLUE)).unwrap();
        assert_relative_eq!(blue.temperature, 8000.0);
        // Luminance 0.114 * 255; R and G sit below it, B far above.
        let variance = (2.0 * 0.114 * 255.0 + 0.886 * 255.0) / 3.0;
        assert_relative_eq!(blue.saturation, 0.9 + variance / 128.0 * 0.4, epsilon = 1e-3);
    }

    #[test]
    fn region_follows_face_box() {
        let sample = Resolution::new(64, 64);
        let frame = Resolution::new(640, 480);

        let centered = sample_region(sample, frame, None);
        assert_relative_eq!(centered.x_center(), 32.0);
        assert_relative_eq!(centered.y_center(), 32.0);
        assert_relative_eq!(centered.width(), 64.0 * 0.6, epsilon = 1e-4);

        let face = Rect::from_top_left(320.0, 120.0, 100.0, 100.0);
        let region = sample_region(sample, frame, Some(face));
        assert_relative_eq!(region.x_center(), 32.0);
        assert_relative_eq!(region.y_center(), 16.0);
    }

    #[test]
    fn smoothing_towards_targets() {
        let config = LightingConfig::default();
        let mut estimator = LightingEstimator::new(&config);
        let gray = Image::filled(100, 100, Color::from_rgb8(128, 128, 128));

        let targets = estimator.sample(&gray, None).unwrap();
        let state = estimator.state();
        assert_relative_eq!(state.contrast, 1.0 * 0.85 + targets.contrast * 0.15, epsilon = 1e-5);
        assert_relative_eq!(state.temperature, 6500.0 * 0.85 + 6000.0 * 0.15, epsilon = 1e-2);

        for _ in 0..200 {
            estimator.sample(&gray, None).unwrap();
        }
        let state = estimator.state();
        assert_relative_eq!(state.brightness, 1.0, epsilon = 1e-3);
        assert_relative_eq!(state.contrast, 0.9, epsilon = 1e-3);
        assert_relative_eq!(state.temperature, 6000.0, epsilon = 0.5);

        estimator.reset();
        assert_eq!(estimator.state(), LightingState::default());
    }

    #[test]
    fn out_of_range_smoothing_uses_default() {
        let config = LightingConfig {
            smoothing: 1.5,
            ..LightingConfig::default()
        };
        let mut estimator = LightingEstimator::new(&config);
        let gray = Image::filled(10, 10, Color::from_rgb8(128, 128, 128));
        estimator.sample(&gray, None).unwrap();
        assert_relative_eq!(estimator.state().contrast, 0.85 + 0.9 * 0.15, epsilon = 1e-5);
    }

    #[test]
    fn throttled_sampling() {
        let config = LightingConfig::default();
        let mut estimator = LightingEstimator::new(&config);
        let gray = Image::filled(10, 10, Color::from_rgb8(128, 128, 128));

        let sampled: Vec<bool> = (0..7).map(|_| estimator.on_frame(&gray, None)).collect();
        assert_eq!(sampled, [true, false, false, true, false, false, true]);

        estimator.set_interval(5);
        let count = (0..10).filter(|_| estimator.on_frame(&gray, None)).count();
        assert_eq!(count, 2);

        estimator.set_enabled(false);
        assert!(!estimator.on_frame(&gray, None));
    }

    #[test]
    fn readback_failure_keeps_state() {
        let config = LightingConfig::default();
        let surface = TaintedSurface(Image::new(64, 64));
        let mut estimator = LightingEstimator::with_surface(surface, &config);
        let frame = Image::filled(10, 10, Color::WHITE);

        assert!(matches!(
            estimator.sample(&frame, None),
            Err(ReadbackError::Refused(_))
        ));
        assert!(!estimator.on_frame(&frame, None));
        assert_eq!(estimator.state(), LightingState::default());
    }
}
