//! # Lifecycle events emitted by an instance.
//!
//! [`EventKind`] classifies what happened; [`Event`] carries the metadata
//! (runnable name, attempt, delays, reason) set through chained `with_*` calls.
//!
//! ## Per-instance sequence
//! ```text
//! InstanceStarted
//!   └─► RunStarting → RunSucceeded                → NextRunScheduled(Success) ─┐
//!                   → RunFailed [+ TimeoutHit]    → NextRunScheduled(Failure) ─┤
//!                   → PanicContained                                           │
//!       ◄──────────────────────────────────────────────────────────────────────┘
//! terminal: ParentCanceled | PanicContained | InstanceExhausted
//!   └─► InstanceStopped (always last)
//! ```
//!
//! ## Ordering guarantees
//! Each event has a process-wide sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use runvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::RunFailed)
//!     .with_task("poller")
//!     .with_reason("boom")
//!     .with_attempt(3)
//!     .with_timeout(Duration::from_secs(5));
//!
//! assert_eq!(ev.kind, EventKind::RunFailed);
//! assert_eq!(ev.task.as_deref(), Some("poller"));
//! assert_eq!(ev.timeout_ms, Some(5000));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked while handling an event (`task` = subscriber, `reason` = panic text).
    SubscriberPanicked,
    /// Subscriber dropped an event (`task` = subscriber, `reason` = "full" / "closed").
    SubscriberOverflow,

    // === Instance lifecycle ===
    /// The background loop was launched.
    InstanceStarted,
    /// An execution is starting (`attempt` = 1-based execution number).
    RunStarting,
    /// The execution returned `Ok(())`.
    RunSucceeded,
    /// The execution returned an error (`reason` = error text).
    RunFailed,
    /// The execution's own deadline passed (`timeout_ms` = configured timeout).
    TimeoutHit,
    /// A panic was captured (`reason` = panic text); terminal.
    PanicContained,
    /// Next execution scheduled (`delay_ms`, `backoff_source`).
    NextRunScheduled,
    /// The parent context ended during a wait (`reason` = context error); terminal.
    ParentCanceled,
    /// Policy forbids another execution (`reason` = why); terminal.
    InstanceExhausted,
    /// The loop exited and the outcome stream is closed. Always the last event.
    InstanceStopped,
}

/// What triggered a scheduled rerun.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffSource {
    /// Recurrence after a success.
    Success,
    /// Restart after a failure.
    Failure,
}

/// Lifecycle event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Process-wide, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Runnable (or subscriber) name.
    pub task: Option<Arc<str>>,
    /// Execution number (starting from 1).
    pub attempt: Option<u64>,
    /// Delay before the next execution in milliseconds.
    pub delay_ms: Option<u32>,
    /// Per-execution timeout in milliseconds.
    pub timeout_ms: Option<u32>,
    /// Human-readable reason (error text, exhaustion cause, ...).
    pub reason: Option<Arc<str>>,
    /// Whether a scheduled rerun follows a success or a failure.
    pub backoff_source: Option<BackoffSource>,
}

impl Event {
    /// Creates an event of the given kind with the current time and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            attempt: None,
            delay_ms: None,
            timeout_ms: None,
            reason: None,
            backoff_source: None,
        }
    }

    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    #[inline]
    pub fn with_attempt(mut self, n: u64) -> Self {
        self.attempt = Some(n);
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a delay (stored as milliseconds, saturating).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(millis_u32(d));
        self
    }

    /// Attaches a timeout (stored as milliseconds, saturating).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(millis_u32(d));
        self
    }

    #[inline]
    pub fn with_source(mut self, source: BackoffSource) -> Self {
        self.backoff_source = Some(source);
        self
    }

    /// Creates a subscriber overflow event.
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }

    /// Delay as a `Duration`, if set.
    pub fn delay(&self) -> Option<Duration> {
        self.delay_ms.map(|ms| Duration::from_millis(u64::from(ms)))
    }

    /// Timeout as a `Duration`, if set.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(|ms| Duration::from_millis(u64::from(ms)))
    }
}

fn millis_u32(d: Duration) -> u32 {
    d.as_millis().min(u128::from(u32::MAX)) as u32
}
