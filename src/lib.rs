//! Virtual try-on overlay rendering.
//!
//! Tracks a face in a live camera feed or a still photo and composites a product image (glasses,
//! a hat or a shirt) onto it, following the head's position, size and roll, and adapting the
//! product's colors to the scene lighting.
//!
//! The pipeline, leaves first:
//!
//! - [`landmark`]: normalized face landmarks and the pixel-space geometry derived from them.
//! - [`orientation`]: smoothed roll/pitch/yaw estimate.
//! - [`calibration`]: reference measurements that make overlay size relative to the first pose.
//! - [`fit`]: per-category overlay placement.
//! - [`lighting`]: scene lighting estimate and the overlay color adjustment.
//! - [`session`]: frame composition and the camera/still-image state machine.
//!
//! The landmark detector and the capture device are external; they plug in through the
//! [`detection::LandmarkDetector`] and [`camera::Camera`] traits.
//!
//! # Environment Variables
//!
//! * `DRAPE_CONFIG`: path of a JSON config file read by [`config::Config::from_env`].
//! * `RUST_LOG`: overrides the log levels set by [`init_logger!`].

use log::LevelFilter;

pub mod calibration;
pub mod camera;
pub mod config;
pub mod detection;
pub mod error;
pub mod filter;
pub mod fit;
pub mod image;
pub mod landmark;
pub mod lighting;
pub mod orientation;
pub mod overlay;
pub mod rect;
pub mod resolution;
pub mod session;
pub mod surface;
pub mod timer;
pub mod worker;


pub use error::{Error, Result};

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = LevelFilter::Debug;
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_PKG_NAME")), log_level)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// The calling crate and `drape` log at *debug* level; `RUST_LOG` can override this.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
