//! # Restart-on-failure options.
//!
//! [`RestartOptions`] decides whether a failed execution is retried:
//! - `restart_on_failure = false` → the first failure terminates the instance;
//! - `restart_limit = 0` → unlimited restarts;
//! - `restart_limit = n` → the instance stops once `n` consecutive failures accumulate;
//! - `backoff` → wait before each restart (absent = restart immediately).
//!
//! ## Reset on success
//! ```text
//! ResetMode::OnAnySuccess   (default)
//!     any success clears the failure count, `reset_on_success` is ignored
//!
//! ResetMode::WhenConfigured
//!     a success clears the failure count only if `reset_on_success == true`,
//!     otherwise failures accumulate towards `restart_limit` across successes
//! ```

use std::time::Duration;

use crate::policies::backoff::Backoff;

/// When a successful execution clears the consecutive-failure count.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResetMode {
    /// Every success resets the count while restart is enabled.
    #[default]
    OnAnySuccess,
    /// Successes reset the count only when `reset_on_success` is set.
    WhenConfigured,
}

/// Restart policy for failed executions.
#[derive(Clone, Debug, Default)]
pub struct RestartOptions {
    /// Whether a failed execution is retried at all.
    pub restart_on_failure: bool,
    /// Maximum consecutive failures before giving up (`0` = unlimited).
    pub restart_limit: u64,
    /// Whether a success clears the failure count (see [`ResetMode`]).
    pub reset_on_success: bool,
    /// How `reset_on_success` is interpreted.
    pub reset_mode: ResetMode,
    /// Delay before the n-th consecutive restart (`None` = immediate).
    pub backoff: Option<Backoff>,
}

impl RestartOptions {
    /// Returns the restart limit as an `Option` (`None` = unlimited).
    #[inline]
    pub fn limit(&self) -> Option<u64> {
        if self.restart_limit == 0 {
            None
        } else {
            Some(self.restart_limit)
        }
    }

    /// True if a success should clear the failure count.
    #[inline]
    pub fn resets_on_success(&self) -> bool {
        match self.reset_mode {
            ResetMode::OnAnySuccess => true,
            ResetMode::WhenConfigured => self.reset_on_success,
        }
    }

    /// Delay before the restart following the `failures`-th consecutive failure.
    #[inline]
    pub fn delay(&self, failures: u64) -> Duration {
        self.backoff
            .as_ref()
            .map_or(Duration::ZERO, |b| b.delay(failures))
    }
}
