//! # InstanceActor: the supervised loop of one instance.
//!
//! Drives one [`Runnable`](crate::Runnable) according to its [`Options`] until a
//! terminal condition, reporting errors on the outcome stream.
//!
//! ## Per-iteration protocol
//! ```text
//! after = 0
//! loop {
//!   ├─► wait `after` or parent cancellation (cancellation wins ties)
//!   │       └─ cancelled ─► send parent error ─► exit
//!   ├─► run_once(child ctx [+ timeout], panic boundary if contained)
//!   │       ├─ Ok        ─► (nothing sent)
//!   │       ├─ Err(e)    ─► send e (waits while the stream is full)
//!   │       └─ Panicked  ─► send RunnablePanic ─► exit
//!   └─► Schedule::next(ok?)
//!           ├─ Rerun(d)  ─► after = d, continue
//!           └─ Stop      ─► exit
//! }
//! exit: state = Terminated, InstanceStopped, outcome stream closed
//! ```
//!
//! ## Rules
//! - Executions run **strictly sequentially**; counters are touched only here.
//! - Cancellation is observed at the wait step; inside an execution it is up to
//!   the runnable to honour its context.
//! - Sending an error is a suspension point: a consumer that does not drain the
//!   stream stalls the loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::{task, time};

use crate::{
    config::Options,
    context::Context,
    core::{
        instance::{InstanceState, Shared},
        outcomes::OutcomeSender,
        runner::{Execution, RunParams, publish, run_once},
        schedule::{Decision, Schedule},
    },
    error::RunError,
    events::{Bus, Event, EventKind},
    tasks::RunnableRef,
};

/// Supervises the executions of a single runnable.
pub(crate) struct InstanceActor {
    pub(crate) runnable: RunnableRef,
    pub(crate) options: Arc<Options>,
    pub(crate) bus: Option<Bus>,
    pub(crate) shared: Arc<Shared>,
}

impl InstanceActor {
    /// Runs until the parent is cancelled, a contained panic occurs, or policy stops it.
    ///
    /// `out` is dropped last, so the stream closes only after the instance is
    /// marked terminated.
    pub(crate) async fn run(self, parent: Context, out: OutcomeSender) {
        let _exit = ExitGuard {
            shared: Arc::clone(&self.shared),
            bus: self.bus.clone(),
            name: self.runnable.name().to_owned(),
        };
        let bus = self.bus.as_ref();
        let name = self.runnable.name();
        let params = RunParams {
            timeout: self.options.timeout(),
            contain_panics: self.options.contains_panics(),
        };

        let mut schedule = Schedule::default();
        let mut after = Duration::ZERO;
        let mut attempt: u64 = 0;

        loop {
            if pause(&parent, after).await {
                if let Some(err) = parent.err() {
                    publish(bus, || {
                        Event::new(EventKind::ParentCanceled)
                            .with_task(name)
                            .with_reason(err.to_string())
                    });
                    out.send(RunError::Context(err)).await;
                }
                return;
            }

            attempt += 1;
            publish(bus, || {
                Event::new(EventKind::RunStarting)
                    .with_task(name)
                    .with_attempt(attempt)
            });

            let succeeded = match run_once(&self.runnable, &parent, params, attempt, bus).await {
                Execution::Succeeded => true,
                Execution::Failed(err) => {
                    out.send(RunError::Task(err)).await;
                    false
                }
                Execution::Panicked(p) => {
                    out.send(RunError::Panic(p)).await;
                    return;
                }
            };

            let decision = schedule.next(&self.options, succeeded);
            self.shared.record(&schedule);

            match decision {
                Decision::Rerun { after: next, source } => {
                    publish(bus, || {
                        Event::new(EventKind::NextRunScheduled)
                            .with_task(name)
                            .with_attempt(attempt)
                            .with_delay(next)
                            .with_source(source)
                    });
                    after = next;
                }
                Decision::Stop(reason) => {
                    publish(bus, || {
                        Event::new(EventKind::InstanceExhausted)
                            .with_task(name)
                            .with_attempt(attempt)
                            .with_reason(reason.as_label())
                    });
                    return;
                }
            }
        }
    }
}

/// Waits `after` unless the parent ends first; returns `true` if it ended.
///
/// A zero delay still yields once so back-to-back executions cannot starve the runtime.
async fn pause(parent: &Context, after: Duration) -> bool {
    if after.is_zero() {
        // Checked after the yield, so cancellation wins here too.
        task::yield_now().await;
        return parent.is_cancelled();
    }
    tokio::select! {
        biased;
        _ = parent.cancelled() => true,
        _ = time::sleep(after) => false,
    }
}

/// Marks the instance terminated on every exit path, unwinding included.
struct ExitGuard {
    shared: Arc<Shared>,
    bus: Option<Bus>,
    name: String,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.shared.set_state(InstanceState::Terminated);
        publish(self.bus.as_ref(), || {
            Event::new(EventKind::InstanceStopped).with_task(self.name.as_str())
        });
    }
}
