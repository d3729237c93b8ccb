//! Capture devices.

use std::collections::VecDeque;

use crate::{error::CaptureError, image::Image};

/// A device yielding a stream of [`Image`]s.
///
/// `start` and `stop` only manage the device lifecycle; frames are pulled with
/// [`Camera::read`].
pub trait Camera {
    /// Starts capturing. Starting a running camera does nothing.
    fn start(&mut self) -> Result<(), CaptureError>;

    /// Stops capturing and releases the device.
    fn stop(&mut self);

    fn is_running(&self) -> bool;

    /// Reads the next frame.
    fn read(&mut self) -> Result<Image, CaptureError>;

    /// Returns a borrowing iterator over the frames produced by this camera.
    ///
    /// The iterator ends at the first read error.
    fn frames(&mut self) -> Frames<'_, Self>
    where
        Self: Sized,
    {
        Frames { camera: self }
    }
}

impl<C: Camera + ?Sized> Camera for Box<C> {
    fn start(&mut self) -> Result<(), CaptureError> {
        (**self).start()
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn is_running(&self) -> bool {
        (**self).is_running()
    }

    fn read(&mut self) -> Result<Image, CaptureError> {
        (**self).read()
    }
}

/// A borrowing iterator over the frames captured by a [`Camera`].
pub struct Frames<'a, C: Camera> {
    camera: &'a mut C,
}

impl<C: Camera> Iterator for Frames<'_, C> {
    type Item = Image;

    fn next(&mut self) -> Option<Image> {
        match self.camera.read() {
            Ok(frame) => Some(frame),
            Err(e) => {
                log::debug!("camera stream stopped: {e}");
                None
            }
        }
    }
}

/// A [`Camera`] that plays back a fixed list of frames.
///
/// Stands in for a real device when processing recorded frames or photos.
#[derive(Debug)]
pub struct PlaybackCamera {
    frames: VecDeque<Image>,
    looping: bool,
    running: bool,
    denied: Option<String>,
}

impl PlaybackCamera {
    /// Creates a camera that yields `frames` once, then reports [`CaptureError::Ended`].
    pub fn new<I: IntoIterator<Item = Image>>(frames: I) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            looping: false,
            running: false,
            denied: None,
        }
    }

    /// Creates a camera that yields the same frame forever.
    pub fn still(frame: Image) -> Self {
        Self {
            looping: true,
            ..Self::new([frame])
        }
    }

    /// Creates a camera whose access is denied, as if the user refused permission.
    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            denied: Some(reason.into()),
            ..Self::new([])
        }
    }

    /// Makes the camera start over from the first frame after the last one.
    pub fn looping(mut self) -> Self {
        self.looping = true;
        self
    }
}

impl Camera for PlaybackCamera {
    fn start(&mut self) -> Result<(), CaptureError> {
        if let Some(reason) = &self.denied {
            return Err(CaptureError::Denied(reason.clone()));
        }
        if self.frames.is_empty() {
            return Err(CaptureError::Unavailable);
        }
        if !self.running {
            log::debug!("playback camera started ({} frames)", self.frames.len());
        }
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) {
        if self.running {
            log::debug!("playback camera stopped");
        }
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn read(&mut self) -> Result<Image, CaptureError> {
        if !self.running {
            return Err(CaptureError::Unavailable);
        }
        let frame = self.frames.pop_front().ok_or(CaptureError::Ended)?;
        if self.looping {
            self.frames.push_back(frame.clone());
        }
        Ok(frame)
    }
}
