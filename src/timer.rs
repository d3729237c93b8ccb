//! Performance measurement tools.

use std::{
    cell::Cell,
    fmt,
    time::{Duration, Instant},
};

/// A timer that measures and averages the time an operation takes.
///
/// All methods take `&self`, so a timer can be shared by the stages it measures.
///
/// Collected timings are averaged and reset when the timer is displayed using `{}`
/// ([`std::fmt::Display`]).
pub struct Timer {
    name: &'static str,
    total: Cell<Duration>,
    count: Cell<u32>,
}

impl Timer {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            total: Cell::new(Duration::ZERO),
            count: Cell::new(0),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Invokes a closure, measuring and recording the time it takes.
    pub fn time<T>(&self, timee: impl FnOnce() -> T) -> T {
        let _guard = self.start();
        timee()
    }

    /// Starts timing an operation using a drop guard.
    ///
    /// When the returned [`TimerGuard`] is dropped, the time between the call to `start` and the
    /// drop is recorded.
    pub fn start(&self) -> TimerGuard<'_> {
        TimerGuard {
            start: Instant::now(),
            timer: self,
        }
    }

    fn record(&self, duration: Duration) {
        self.total.set(self.total.get().saturating_add(duration));
        self.count.set(self.count.get().saturating_add(1));
    }

    /// Number of measurements since the last reset.
    pub fn count(&self) -> u32 {
        self.count.get()
    }

    /// Average of the measurements since the last reset.
    pub fn average(&self) -> Option<Duration> {
        match self.count.get() {
            0 => None,
            n => Some(self.total.get() / n),
        }
    }

    pub fn reset(&self) {
        self.total.set(Duration::ZERO);
        self.count.set(0);
    }
}

/// Displays the average recorded time and resets it.
impl fmt::Display for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.count();
        let avg_ms = self.average().unwrap_or_default().as_secs_f32() * 1000.0;
        self.reset();
        write!(f, "{}: {count}x{avg_ms:.01}ms", self.name)
    }
}

/// Guard returned by [`Timer::start`]. Stops timing the operation when dropped.
pub struct TimerGuard<'a> {
    start: Instant,
    timer: &'a Timer,
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        self.timer.record(self.start.elapsed());
    }
}

/// Logs frames per second, optionally together with [`Timer`] readings.
pub struct FpsCounter {
    name: String,
    frames: u32,
    start: Instant,
    last_fps: Option<u32>,
}

impl FpsCounter {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            frames: 0,
            start: Instant::now(),
            last_fps: None,
        }
    }

    /// Advances the frame counter by 1 and logs FPS if one second has passed.
    pub fn tick(&mut self) {
        self.tick_with(std::iter::empty::<&Timer>());
    }

    /// Advances the frame counter by 1 and logs FPS and `extra` data if one second has passed.
    pub fn tick_with<D: fmt::Display, I: IntoIterator<Item = D>>(&mut self, extra: I) {
        self.frames += 1;
        if self.start.elapsed() < Duration::from_secs(1) {
            return;
        }

        let extra = extra
            .into_iter()
            .map(|item| item.to_string())
            .collect::<Vec<_>>();
        if extra.is_empty() {
            log::debug!("{}: {} FPS", self.name, self.frames);
        } else {
            log::debug!("{}: {} FPS ({})", self.name, self.frames, extra.join(", "));
        }

        self.last_fps = Some(self.frames);
        self.frames = 0;
        self.start = Instant::now();
    }

    /// The frame count of the last completed one-second window.
    pub fn fps(&self) -> Option<u32> {
        self.last_fps
    }
}
