//! Injected delays

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::randoms::Randoms;

/// A delay leg: fixed, or computed afresh every time it is taken
#[derive(Clone)]
pub enum Delay {
    Fixed(Duration),
    Computed(Arc<dyn Fn() -> Duration + Send + Sync>),
}

impl Delay {
    pub fn none() -> Self {
        Delay::Fixed(Duration::ZERO)
    }

    pub fn fixed_ms(ms: u64) -> Self {
        Delay::Fixed(Duration::from_millis(ms))
    }

    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn() -> Duration + Send + Sync + 'static,
    {
        Delay::Computed(Arc::new(f))
    }

    /// Uniform whole milliseconds in `[min_ms, max_ms]`, drawn per leg
    pub fn between_ms(randoms: Randoms, min_ms: u64, max_ms: u64) -> Self {
        let low = i64::try_from(min_ms).unwrap_or(i64::MAX);
        let high = i64::try_from(max_ms).unwrap_or(i64::MAX);
        Self::from_fn(move || {
            let ms = randoms.random_int(Some(low), Some(high));
            Duration::from_millis(u64::try_from(ms).unwrap_or(0))
        })
    }

    /// Duration of the next leg
    pub fn sample(&self) -> Duration {
        match self {
            Delay::Fixed(d) => *d,
            Delay::Computed(f) => f(),
        }
    }
}

impl Default for Delay {
    fn default() -> Self {
        Self::none()
    }
}

impl From<Duration> for Delay {
    fn from(d: Duration) -> Self {
        Delay::Fixed(d)
    }
}

impl fmt::Debug for Delay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delay::Fixed(d) => f.debug_tuple("Fixed").field(d).finish(),
            Delay::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}
