//! # Jitter for restart delays.
//!
//! [`JitterPolicy`] randomizes a computed delay so that many instances restarting
//! at once do not hit a dependency in lockstep.
//!
//! ```text
//! None          delay
//! Full          random[0, delay]
//! Equal         delay/2 + random[0, delay/2]
//! Decorrelated  random[floor, min(delay × 3, cap)]
//! ```

use std::time::Duration;

use rand::Rng;

/// Randomization applied to a restart delay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterPolicy {
    /// Exact delay; predictable, best for tests and single instances.
    #[default]
    None,
    /// Uniform in `[0, delay]`.
    Full,
    /// Uniform in `[delay/2, delay]`.
    Equal,
    /// Uniform in `[floor, min(delay × 3, cap)]`.
    Decorrelated,
}

impl JitterPolicy {
    /// Applies this policy to `delay`.
    ///
    /// `floor` and `cap` bound the [`JitterPolicy::Decorrelated`] range and are
    /// ignored by the other variants.
    pub fn apply(&self, delay: Duration, floor: Duration, cap: Duration) -> Duration {
        let ms = delay.as_millis().min(u128::from(u64::MAX)) as u64;
        match self {
            JitterPolicy::None => delay,
            JitterPolicy::Full => Duration::from_millis(random_between(0, ms)),
            JitterPolicy::Equal => {
                let half = ms / 2;
                Duration::from_millis(half + random_between(0, ms - half))
            }
            JitterPolicy::Decorrelated => {
                let lo = floor.as_millis().min(u128::from(u64::MAX)) as u64;
                let cap = cap.as_millis().min(u128::from(u64::MAX)) as u64;
                let hi = ms.saturating_mul(3).min(cap).max(lo);
                Duration::from_millis(random_between(lo, hi))
            }
        }
    }
}

/// Uniform in `[lo, hi]`; returns `lo` for an empty range.
fn random_between(lo: u64, hi: u64) -> u64 {
    if lo >= hi {
        return lo;
    }
    rand::rng().random_range(lo..=hi)
}
