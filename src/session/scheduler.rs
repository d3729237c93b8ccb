//! Ownership of the frame loop.
//!
//! Every mode switch starts a new loop generation. A driver holds the [`LoopToken`] it was handed
//! when its loop started and must stop as soon as the token is no longer current, so a loop from
//! a previous mode can never keep drawing.

use std::fmt;

use super::Mode;

/// Identifies one run of the frame loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopToken {
    generation: u64,
    mode: Mode,
}

impl LoopToken {
    pub fn mode(&self) -> Mode {
        self.mode
    }
}

#[derive(Default)]
pub struct Scheduler {
    generation: u64,
    current: Option<LoopToken>,
    frames: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new loop for `mode`, invalidating any previous token.
    pub fn begin(&mut self, mode: Mode) -> LoopToken {
        self.generation += 1;
        let token = LoopToken {
            generation: self.generation,
            mode,
        };
        if let Some(old) = self.current.replace(token) {
            log::debug!("loop {} ({:?}) superseded after {} frames", old.generation, old.mode, self.frames);
        }
        self.frames = 0;
        token
    }

    /// Invalidates the current token without starting a new loop.
    pub fn cancel(&mut self) {
        if let Some(old) = self.current.take() {
            log::debug!("loop {} ({:?}) cancelled", old.generation, old.mode);
        }
    }

    pub fn is_current(&self, token: &LoopToken) -> bool {
        self.current.as_ref() == Some(token)
    }

    pub fn current(&self) -> Option<LoopToken> {
        self.current
    }

    /// Counts a frame drawn by the current loop and returns its index within the loop.
    pub fn count_frame(&mut self) -> u64 {
        let index = self.frames;
        self.frames += 1;
        index
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("current", &self.current)
            .field("frames", &self.frames)
            .finish()
    }
}
