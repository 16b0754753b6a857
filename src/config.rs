//! # Execution configuration.
//!
//! [`Options`] bundles every policy knob an [`Instance`](crate::Instance) consumes.
//! It is a plain value object: build it, hand it to the instance, and it is never
//! mutated again.
//!
//! Options can be assembled three ways, all with "later wins" semantics:
//! 1. **Ordered option values**: `Options::from_iter([RunOption::Recur(true), ...])`
//! 2. **Fluent builder**: `Options::builder().with_recur(true)...build()`
//! 3. **Field access**: all fields are public.
//!
//! ## Sentinel values
//! - `result_buffer = 0` → rendezvous outcome stream (each error waits for the consumer)
//! - `constraints.timeout = 0s` → no per-execution deadline
//! - `constraints.run_limit = 0` → unlimited successful executions
//! - `restart.restart_limit = 0` → unlimited restarts
//!
//! ## Default
//! All zero/false: run exactly once, no recurrence, no restart, no timeout, panics
//! propagate uncontained.

use std::time::Duration;

use crate::policies::{Backoff, ResetMode, RestartOptions};

/// Rerun policy after a **successful** execution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Recurrence {
    /// Run again after a success.
    pub recur: bool,
    /// Delay between a success and the next execution.
    pub period: Duration,
}

/// Execution constraints.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Constraints {
    /// Per-execution deadline (`0` = none).
    pub timeout: Duration,
    /// Cap on total successful executions (`0` = unlimited).
    pub run_limit: u64,
}

/// Panic handling during execution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PanicOptions {
    /// Catch panics and report them as [`RunnablePanic`](crate::RunnablePanic).
    ///
    /// A contained panic always terminates the instance, whatever the
    /// recurrence/restart options say.
    pub contain: bool,
}

/// Execution configuration consumed by an [`Instance`](crate::Instance).
#[derive(Clone, Debug, Default)]
pub struct Options {
    /// Capacity of the outcome stream (`0` = rendezvous).
    pub result_buffer: usize,
    /// Rerun after success.
    pub recurrence: Recurrence,
    /// Timeout and run limit.
    pub constraints: Constraints,
    /// Rerun after failure.
    pub restart: RestartOptions,
    /// Panic containment.
    pub panics: PanicOptions,
}

impl Options {
    /// Starts a fluent builder from the default configuration.
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::default()
    }

    /// Applies one option value on top of the current configuration.
    pub fn apply(&mut self, opt: RunOption) -> &mut Self {
        match opt {
            RunOption::ChanBuffer(size) => self.result_buffer = size,
            RunOption::Recur(recur) => self.recurrence.recur = recur,
            RunOption::Period(period) => self.recurrence.period = period,
            RunOption::Timeout(timeout) => self.constraints.timeout = timeout,
            RunOption::RunLimit(limit) => self.constraints.run_limit = limit,
            RunOption::Restart(restart) => self.restart.restart_on_failure = restart,
            RunOption::RestartLimit(limit, backoff) => {
                self.restart.restart_limit = limit;
                self.restart.backoff = Some(backoff.unwrap_or_default());
            }
            RunOption::ResetOnSuccess(reset) => self.restart.reset_on_success = reset,
            RunOption::ResetMode(mode) => self.restart.reset_mode = mode,
            RunOption::Recover(contain) => self.panics.contain = contain,
        }
        self
    }

    /// Returns the per-execution timeout as an `Option`.
    ///
    /// - `None` → executions inherit the parent's deadline only
    /// - `Some(d)` → each execution ends `d` after it starts at the latest
    #[inline]
    pub fn timeout(&self) -> Option<Duration> {
        if self.constraints.timeout == Duration::ZERO {
            None
        } else {
            Some(self.constraints.timeout)
        }
    }

    /// Returns the successful-run cap as an `Option` (`None` = unlimited).
    #[inline]
    pub fn run_limit(&self) -> Option<u64> {
        if self.constraints.run_limit == 0 {
            None
        } else {
            Some(self.constraints.run_limit)
        }
    }

    /// True if panics are converted into outcome-stream errors.
    #[inline]
    pub fn contains_panics(&self) -> bool {
        self.panics.contain
    }
}

impl FromIterator<RunOption> for Options {
    fn from_iter<I: IntoIterator<Item = RunOption>>(iter: I) -> Self {
        let mut opts = Options::default();
        for opt in iter {
            opts.apply(opt);
        }
        opts
    }
}

/// One configuration change, applied in order by [`Options::apply`].
///
/// When several values target the same field, the last one wins.
#[derive(Clone, Debug)]
pub enum RunOption {
    /// Outcome stream capacity (default `0`: rendezvous).
    ChanBuffer(usize),
    /// Rerun after successful executions.
    Recur(bool),
    /// Delay between a success and the next execution.
    Period(Duration),
    /// Per-execution timeout (`0` = none).
    Timeout(Duration),
    /// Cap on successful executions (`0` = unlimited).
    ///
    /// Failed executions do not count towards the limit.
    RunLimit(u64),
    /// Restart after failed executions.
    Restart(bool),
    /// Restart limit (`0` = unlimited) and backoff (`None` = restart immediately).
    RestartLimit(u64, Option<Backoff>),
    /// Clear the failure count on success (see [`ResetMode`]).
    ResetOnSuccess(bool),
    /// How [`RunOption::ResetOnSuccess`] is interpreted.
    ResetMode(ResetMode),
    /// Contain panics and report them as errors.
    Recover(bool),
}

/// Fluent builder for [`Options`].
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use runvisor::{Backoff, Options};
///
/// let opts = Options::builder()
///     .with_recur(true)
///     .with_period(Duration::from_secs(1))
///     .with_run_limit(10)
///     .with_restart(true)
///     .with_restart_limit(3, Some(Backoff::linear(Duration::from_millis(200))))
///     .build();
///
/// assert_eq!(opts.run_limit(), Some(10));
/// assert!(opts.timeout().is_none());
/// ```
#[derive(Clone, Debug, Default)]
pub struct OptionsBuilder {
    opts: Options,
}

impl OptionsBuilder {
    fn with(mut self, opt: RunOption) -> Self {
        self.opts.apply(opt);
        self
    }

    pub fn with_chan_buffer(self, size: usize) -> Self {
        self.with(RunOption::ChanBuffer(size))
    }

    pub fn with_recur(self, recur: bool) -> Self {
        self.with(RunOption::Recur(recur))
    }

    pub fn with_period(self, period: Duration) -> Self {
        self.with(RunOption::Period(period))
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with(RunOption::Timeout(timeout))
    }

    pub fn with_run_limit(self, limit: u64) -> Self {
        self.with(RunOption::RunLimit(limit))
    }

    pub fn with_restart(self, restart: bool) -> Self {
        self.with(RunOption::Restart(restart))
    }

    pub fn with_restart_limit(self, limit: u64, backoff: Option<Backoff>) -> Self {
        self.with(RunOption::RestartLimit(limit, backoff))
    }

    pub fn with_reset_on_success(self, reset: bool) -> Self {
        self.with(RunOption::ResetOnSuccess(reset))
    }

    pub fn with_reset_mode(self, mode: ResetMode) -> Self {
        self.with(RunOption::ResetMode(mode))
    }

    pub fn with_recover(self, contain: bool) -> Self {
        self.with(RunOption::Recover(contain))
    }

    /// Finishes the configuration.
    pub fn build(self) -> Options {
        self.opts
    }
}
