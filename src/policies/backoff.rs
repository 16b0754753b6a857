//! # Backoff between restarts.
//!
//! A [`Backoff`] maps the current consecutive-failure count (1-based) to the delay
//! before the next restart. Built-in shapes:
//! - [`Backoff::constant`]: same delay every time (`0` = restart immediately);
//! - [`Backoff::linear`]: `count × step`;
//! - [`Backoff::exponential`]: `first × factor^(count-1)`, capped, with jitter;
//! - [`Backoff::from_fn`]: any `Fn(u64) -> Duration`.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use runvisor::{Backoff, ExponentialBackoff, JitterPolicy};
//!
//! let linear = Backoff::linear(Duration::from_millis(100));
//! assert_eq!(linear.delay(3), Duration::from_millis(300));
//!
//! let exp = Backoff::exponential(ExponentialBackoff {
//!     first: Duration::from_millis(100),
//!     max: Duration::from_secs(10),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! });
//! assert_eq!(exp.delay(1), Duration::from_millis(100));
//! assert_eq!(exp.delay(2), Duration::from_millis(200));
//! assert_eq!(exp.delay(20), Duration::from_secs(10));
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Failure count → restart delay.
#[derive(Clone)]
pub struct Backoff {
    f: Arc<dyn Fn(u64) -> Duration + Send + Sync>,
}

impl Backoff {
    /// Wraps an arbitrary backoff function.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(u64) -> Duration + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }

    /// Ignores the count and always waits `delay`.
    pub fn constant(delay: Duration) -> Self {
        Self::from_fn(move |_| delay)
    }

    /// Waits `count × step` (saturating).
    pub fn linear(step: Duration) -> Self {
        Self::from_fn(move |count| {
            let n = u32::try_from(count).unwrap_or(u32::MAX);
            step.checked_mul(n).unwrap_or(Duration::MAX)
        })
    }

    /// Exponential growth per [`ExponentialBackoff`].
    pub fn exponential(policy: ExponentialBackoff) -> Self {
        Self::from_fn(move |count| policy.next(count))
    }

    /// Delay before the restart following the `count`-th consecutive failure.
    #[inline]
    pub fn delay(&self, count: u64) -> Duration {
        (self.f)(count)
    }
}

impl Default for Backoff {
    /// Constant zero delay.
    fn default() -> Self {
        Self::constant(Duration::ZERO)
    }
}

impl fmt::Debug for Backoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backoff").finish_non_exhaustive()
    }
}

/// Exponential restart curve.
///
/// - [`ExponentialBackoff::first`]: delay after the first failure;
/// - [`ExponentialBackoff::factor`]: multiplicative growth per further failure;
/// - [`ExponentialBackoff::max`]: cap applied before jitter;
/// - [`ExponentialBackoff::jitter`]: randomization of the capped delay.
///
/// The base delay depends only on the failure count, so jitter output never feeds
/// back into later delays.
#[derive(Clone, Copy, Debug)]
pub struct ExponentialBackoff {
    /// Delay after the first failure.
    pub first: Duration,
    /// Upper bound for the base delay.
    pub max: Duration,
    /// Growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Randomization strategy.
    pub jitter: JitterPolicy,
}

impl Default for ExponentialBackoff {
    /// `first = 100ms`, `max = 30s`, `factor = 2.0`, no jitter.
    fn default() -> Self {
        Self {
            first: Duration::from_millis(100),
            max: Duration::from_secs(30),
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }
}

impl ExponentialBackoff {
    /// Computes the delay for the `failures`-th consecutive failure (1-based).
    ///
    /// A count of `0` is treated like `1`.
    pub fn next(&self, failures: u64) -> Duration {
        let exp = failures.saturating_sub(1).min(i32::MAX as u64) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        let base = if !secs.is_finite() || secs < 0.0 || secs > self.max.as_secs_f64() {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        };

        self.jitter.apply(base, self.first.min(self.max), self.max)
    }
}
