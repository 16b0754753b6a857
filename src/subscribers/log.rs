//! # LogWriter: simple event printer
//!
//! A minimal subscriber that prints incoming [`Event`]s to stdout.
//! Use it for tests or demos.
//!
//! ## Example output
//! ```text
//! [instance-started] task="fetch"
//! [starting] task="fetch" attempt=1
//! [failed] task="fetch" err="connection refused" attempt=1
//! [next-run] task="fetch" delay_ms=200 after=Failure attempt=1
//! [timeout] task="fetch" timeout_ms=5000 attempt=2
//! [exhausted] task="fetch" reason="restart_limit_reached"
//! [stopped] task="fetch"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let task = e.task.as_deref().unwrap_or("unknown");
        let reason = e.reason.as_deref().unwrap_or("unknown");

        match e.kind {
            EventKind::InstanceStarted => println!("[instance-started] task={task:?}"),
            EventKind::RunStarting => {
                println!("[starting] task={task:?} attempt={:?}", e.attempt);
            }
            EventKind::RunSucceeded => {
                println!("[succeeded] task={task:?} attempt={:?}", e.attempt);
            }
            EventKind::RunFailed => {
                println!(
                    "[failed] task={task:?} err={reason:?} attempt={:?}",
                    e.attempt
                );
            }
            EventKind::TimeoutHit => {
                println!(
                    "[timeout] task={task:?} timeout_ms={:?} attempt={:?}",
                    e.timeout_ms, e.attempt
                );
            }
            EventKind::PanicContained => {
                println!("[panic] task={task:?} info={reason:?}");
            }
            EventKind::NextRunScheduled => {
                println!(
                    "[next-run] task={task:?} delay_ms={:?} after={:?} attempt={:?}",
                    e.delay_ms, e.backoff_source, e.attempt
                );
            }
            EventKind::ParentCanceled => {
                println!("[parent-canceled] task={task:?} err={reason:?}");
            }
            EventKind::InstanceExhausted => {
                println!("[exhausted] task={task:?} reason={reason:?}");
            }
            EventKind::InstanceStopped => println!("[stopped] task={task:?}"),
            EventKind::SubscriberOverflow => {
                println!("[subscriber-overflow] subscriber={task} reason={reason}");
            }
            EventKind::SubscriberPanicked => {
                println!("[subscriber-panicked] subscriber={task} info={reason}");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
