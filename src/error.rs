//! Error types.
//!
//! Per-frame work (drawing, detection callbacks) never returns these: failures there are logged
//! and isolated to the frame. They surface from setup operations such as loading assets, starting
//! a camera or exporting the composed canvas.

use std::path::PathBuf;

use thiserror::Error;

use crate::{rect::Rect, resolution::Resolution};

/// Failure to start or read from a capture device.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaptureError {
    #[error("camera access denied: {0}")]
    Denied(String),

    #[error("no camera available")]
    Unavailable,

    #[error("camera stream ended")]
    Ended,
}

/// Failure to read back pixels from a [`Surface`][crate::surface::Surface].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReadbackError {
    #[error("pixel readback refused: {0}")]
    Refused(String),

    #[error("readback region {region:?} lies outside the {res} surface")]
    OutOfBounds { region: Rect, res: Resolution },
}

/// Failure to load an overlay asset or background image.
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("invalid image path '{0}' (must have one of the supported extensions)")]
    UnsupportedFormat(PathBuf),

    #[error("unknown overlay category '{0}' (expected glasses, hat or shirt)")]
    UnknownCategory(String),
}

/// Failure of the external landmark detector.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectorError {
    #[error("landmark detector failed to load: {0}")]
    Load(String),

    #[error("landmark detector failed: {0}")]
    Detect(String),

    #[error("landmark detector panicked: {0}")]
    Panicked(String),

    #[error("detector worker has shut down")]
    WorkerGone,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Readback(#[from] ReadbackError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Detector(#[from] DetectorError),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
