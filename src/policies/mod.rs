//! Rerun policies.
//!
//! This module groups the knobs that control **whether** an instance runs its
//! runnable again after a failure and **how long** it waits first.
//!
//! ## Contents
//! - [`RestartOptions`] restart-on-failure switch, limit and backoff
//! - [`ResetMode`]      when a success clears the consecutive-failure count
//! - [`Backoff`]        failure count → delay before the next restart
//! - [`ExponentialBackoff`] first / factor / max + jitter curve for [`Backoff::exponential`]
//! - [`JitterPolicy`]   randomization applied by [`ExponentialBackoff`]
//!
//! ## Quick wiring
//! ```text
//! Options { restart: RestartOptions { backoff: Option<Backoff>, .. }, .. }
//!      └─► core::schedule uses:
//!           - restart_on_failure / restart_limit to decide continue/exit
//!           - backoff.delay(failures) to schedule the next execution
//! ```
//!
//! ## Defaults
//! - restart disabled, no limit, constant zero backoff.
//! - `ResetMode::OnAnySuccess`.
//! - `JitterPolicy::None`.

mod backoff;
mod jitter;
mod restart;

pub use backoff::{Backoff, ExponentialBackoff};
pub use jitter::JitterPolicy;
pub use restart::{ResetMode, RestartOptions};
