//! # Rerun decision.
//!
//! [`Schedule`] owns the success/failure counters of one instance and decides,
//! after each execution, whether to run again and after how long.
//!
//! ```text
//! success:  runs += 1
//!           if restart enabled and reset applies → failures = 0
//!           recur?            → Rerun(period, Success) else Stop(Completed)
//!           runs >= run_limit → Stop(RunLimitReached)   (overrides recurrence)
//!
//! failure:  failures += 1
//!           restart disabled              → Stop(RestartDisabled)
//!           limit == 0 || failures < limit → Rerun(backoff(failures), Failure)
//!           otherwise                      → Stop(RestartLimitReached)
//! ```
//!
//! A contained panic never reaches the schedule: the loop stops before asking.

use std::time::Duration;

use crate::{config::Options, events::BackoffSource};

/// Why an instance stops running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StopReason {
    /// Success without recurrence.
    Completed,
    /// Success count reached the run limit.
    RunLimitReached,
    /// Failure with restart disabled.
    RestartDisabled,
    /// Consecutive failures reached the restart limit.
    RestartLimitReached,
}

impl StopReason {
    pub(crate) fn as_label(&self) -> &'static str {
        match self {
            StopReason::Completed => "completed",
            StopReason::RunLimitReached => "run_limit_reached",
            StopReason::RestartDisabled => "restart_disabled",
            StopReason::RestartLimitReached => "restart_limit_reached",
        }
    }
}

/// Outcome of a rerun decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Decision {
    Rerun {
        after: Duration,
        source: BackoffSource,
    },
    Stop(StopReason),
}

/// Success/failure counters plus the decision logic.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Schedule {
    /// Successful executions so far.
    pub(crate) runs: u64,
    /// Consecutive failures since the last reset.
    pub(crate) failures: u64,
}

impl Schedule {
    /// Accounts for one execution and decides what happens next.
    pub(crate) fn next(&mut self, opts: &Options, succeeded: bool) -> Decision {
        if succeeded {
            self.on_success(opts)
        } else {
            self.on_failure(opts)
        }
    }

    fn on_success(&mut self, opts: &Options) -> Decision {
        self.runs += 1;
        if opts.restart.restart_on_failure && opts.restart.resets_on_success() {
            self.failures = 0;
        }

        if opts.run_limit().is_some_and(|limit| self.runs >= limit) {
            return Decision::Stop(StopReason::RunLimitReached);
        }
        if opts.recurrence.recur {
            Decision::Rerun {
                after: opts.recurrence.period,
                source: BackoffSource::Success,
            }
        } else {
            Decision::Stop(StopReason::Completed)
        }
    }

    fn on_failure(&mut self, opts: &Options) -> Decision {
        self.failures += 1;

        let restart = &opts.restart;
        if !restart.restart_on_failure {
            return Decision::Stop(StopReason::RestartDisabled);
        }
        match restart.limit() {
            Some(limit) if self.failures >= limit => Decision::Stop(StopReason::RestartLimitReached),
            _ => Decision::Rerun {
                after: restart.delay(self.failures),
                source: BackoffSource::Failure,
            },
        }
    }
}
