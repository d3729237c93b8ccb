//! Product overlay assets.

use std::{fmt, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{error::AssetError, image::Image};

/// Range of [`OverlayAsset::user_scale`].
pub const USER_SCALE_RANGE: (f32, f32) = (0.5, 2.0);
/// Range of [`OverlayAsset::user_vertical_offset`], as a fraction of the canvas height.
pub const USER_OFFSET_RANGE: (f32, f32) = (-0.5, 0.5);

/// The kind of product an overlay depicts, which determines where on the face it is fitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Glasses,
    Hat,
    Shirt,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Glasses, Category::Hat, Category::Shirt];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Glasses => "glasses",
            Category::Hat => "hat",
            Category::Shirt => "shirt",
        }
    }
}

impl FromStr for Category {
    type Err = AssetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|cat| cat.as_str() == s)
            .ok_or_else(|| AssetError::UnknownCategory(s.to_string()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

enum State {
    Pending,
    Ready(Image),
    Failed(String),
}

/// A product image together with its category and the user's size/position adjustments.
///
/// An asset may still be loading or may have failed to load. Either way it is treated as absent
/// when composing a frame.
pub struct OverlayAsset {
    source: String,
    category: Category,
    state: State,
    user_scale: f32,
    user_vertical_offset: f32,
}

impl OverlayAsset {
    /// Loads an overlay image from the filesystem.
    pub fn load<P: AsRef<Path>>(path: P, category: Category) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let image = Image::load(path)?;
        Ok(Self::from_image(path.display().to_string(), category, image))
    }

    /// Creates a ready-to-draw asset from an already decoded image.
    pub fn from_image(source: impl Into<String>, category: Category, image: Image) -> Self {
        let mut this = Self::pending(source, category);
        this.finish_loading(image);
        this
    }

    /// Creates an asset whose image has not finished loading yet.
    pub fn pending(source: impl Into<String>, category: Category) -> Self {
        Self {
            source: source.into(),
            category,
            state: State::Pending,
            user_scale: 1.0,
            user_vertical_offset: 0.0,
        }
    }

    /// Completes loading of this asset with the decoded `image`.
    pub fn finish_loading(&mut self, image: Image) {
        log::debug!(
            "overlay '{}' ({}) loaded: {}x{}",
            self.source,
            self.category,
            image.width(),
            image.height()
        );
        self.state = State::Ready(image);
    }

    /// Marks this asset as failed. It will never be drawn.
    pub fn fail_loading(&mut self, reason: impl fmt::Display) {
        log::warn!("overlay '{}' failed to load: {reason}", self.source);
        self.state = State::Failed(reason.to_string());
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// Returns the loaded image, or [`None`] while pending, after a failure, or if the image has
    /// no pixels.
    pub fn image(&self) -> Option<&Image> {
        match &self.state {
            State::Ready(image) if image.width() > 0 && image.height() > 0 => Some(image),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.image().is_some()
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, State::Pending)
    }

    /// Returns the reason loading failed, if it did.
    pub fn failure(&self) -> Option<&str> {
        match &self.state {
            State::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    /// Native pixel width of the image (0 until loaded).
    pub fn width(&self) -> u32 {
        self.image().map_or(0, |image| image.width())
    }

    /// Native pixel height of the image (0 until loaded).
    pub fn height(&self) -> u32 {
        self.image().map_or(0, |image| image.height())
    }

    pub fn user_scale(&self) -> f32 {
        self.user_scale
    }

    /// Sets the user's size multiplier, clamped to [`USER_SCALE_RANGE`].
    pub fn set_user_scale(&mut self, scale: f32) {
        self.user_scale = clamp_or(scale, USER_SCALE_RANGE, 1.0);
    }

    pub fn user_vertical_offset(&self) -> f32 {
        self.user_vertical_offset
    }

    /// Sets the user's vertical offset (fraction of canvas height, positive moves down), clamped
    /// to [`USER_OFFSET_RANGE`].
    pub fn set_user_vertical_offset(&mut self, offset: f32) {
        self.user_vertical_offset = clamp_or(offset, USER_OFFSET_RANGE, 0.0);
    }
}

fn clamp_or(value: f32, (lo, hi): (f32, f32), default: f32) -> f32 {
    if value.is_nan() {
        default
    } else {
        value.clamp(lo, hi)
    }
}

impl fmt::Debug for OverlayAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            State::Pending => "pending".to_string(),
            State::Ready(image) => format!("{image:?}"),
            State::Failed(reason) => format!("failed: {reason}"),
        };
        f.debug_struct("OverlayAsset")
            .field("source", &self.source)
            .field("category", &self.category)
            .field("state", &state)
            .field("user_scale", &self.user_scale)
            .field("user_vertical_offset", &self.user_vertical_offset)
            .finish()
    }
}
