//! Exponential Moving Average.

use super::Filter;

/// Exponential Moving Average – a weighted moving average whose weight decreases exponentially.
///
/// Every call to [`Filter::push`] computes `alpha * value + (1 - alpha) * previous`.
#[derive(Debug, Clone)]
pub struct Ema {
    alpha: f32,
    seed: Option<f32>,
    last: Option<f32>,
}

impl Ema {
    /// Creates a new Exponential Moving Average filter.
    ///
    /// The `alpha` parameter must be between 0.0 and 1.0 and is the weight of each new value.
    /// Values close to 1.0 very strongly favor recent values over older values, while values
    /// closer to 0.0 favor more recent values less strongly.
    ///
    /// The first value pushed into an unseeded filter is returned unchanged.
    ///
    /// # Panics
    ///
    /// This method will panic if `alpha` is not in between 0.0 and 1.0.
    pub fn new(alpha: f32) -> Self {
        assert!((0.0..=1.0).contains(&alpha), "invalid EMA alpha {alpha}");
        Self {
            alpha,
            seed: None,
            last: None,
        }
    }

    /// Creates a filter whose history starts out at `initial`, so that even the first pushed value
    /// is blended with it.
    ///
    /// Resetting the filter returns it to `initial`.
    pub fn seeded(alpha: f32, initial: f32) -> Self {
        Self {
            seed: Some(initial),
            last: Some(initial),
            ..Self::new(alpha)
        }
    }

    /// Creates a filter from a *retention* factor: the weight given to the previous smoothed value.
    ///
    /// `Ema::retaining(0.7, x)` computes `previous * 0.7 + value * 0.3`.
    pub fn retaining(retention: f32, initial: f32) -> Self {
        Self::seeded(1.0 - retention, initial)
    }

    /// Returns the current smoothed value, if any value has been pushed (or the filter is seeded).
    #[inline]
    pub fn value(&self) -> Option<f32> {
        self.last
    }

    #[inline]
    pub fn alpha(&self) -> f32 {
        self.alpha
    }
}

impl Filter<f32> for Ema {
    fn push(&mut self, value: f32) -> f32 {
        match self.last {
            Some(last) => {
                let avg = self.alpha * value + (1.0 - self.alpha) * last;
                self.last = Some(avg);
                avg
            }
            None => {
                self.last = Some(value);
                value
            }
        }
    }

    fn reset(&mut self) {
        self.last = self.seed;
    }
}
