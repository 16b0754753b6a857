//! # Run a single execution of a runnable.
//!
//! - Derive the **execution context**: child of the parent, bounded by the
//!   per-execution timeout when one is configured
//! - Invoke the runnable, optionally behind a **panic boundary**
//! - Release the execution context **unconditionally** once the call returns
//! - Publish `RunSucceeded` / `RunFailed` / `TimeoutHit` / `PanicContained`
//!
//! ## Panic boundary
//! ```text
//! contain = true:   AssertUnwindSafe(call).catch_unwind() → Err(payload) → Panicked(RunnablePanic)
//! contain = false:  call.await  → a panic unwinds through the instance loop
//! ```
//! The boundary sits around the whole invocation, so a panic while *building*
//! the future (e.g. [`NilRunnable`](crate::NilRunnable)) is captured as well.
//!
//! ## Timeout
//! The engine never interrupts a runnable: the deadline only cancels the context
//! it was given. `TimeoutHit` is published when the execution context ended
//! through its own deadline while the parent was still live.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;

use crate::{
    context::Context,
    error::{ContextError, TaskError},
    events::{Bus, Event, EventKind},
    tasks::{RunnablePanic, RunnableRef},
};

/// Result of one execution.
#[derive(Debug)]
pub(crate) enum Execution {
    Succeeded,
    Failed(TaskError),
    Panicked(RunnablePanic),
}

/// Per-execution settings extracted from [`Options`](crate::Options).
#[derive(Clone, Copy, Debug)]
pub(crate) struct RunParams {
    pub(crate) timeout: Option<Duration>,
    pub(crate) contain_panics: bool,
}

/// Executes `runnable` once under `parent`, publishing the outcome to `bus`.
pub(crate) async fn run_once(
    runnable: &RunnableRef,
    parent: &Context,
    params: RunParams,
    attempt: u64,
    bus: Option<&Bus>,
) -> Execution {
    let (ctx, release) = match params.timeout {
        Some(timeout) => parent.with_timeout(timeout),
        None => parent.with_cancel(),
    };

    let call = {
        let runnable = RunnableRef::clone(runnable);
        let ctx = ctx.clone();
        async move { runnable.spawn(ctx).await }
    };

    let res = if params.contain_panics {
        AssertUnwindSafe(call)
            .catch_unwind()
            .await
            .map_err(RunnablePanic::from_payload)
    } else {
        Ok(call.await)
    };

    let timed_out = params
        .timeout
        .filter(|_| ctx.err() == Some(ContextError::DeadlineExceeded) && parent.err().is_none());
    drop(release);

    let name = runnable.name();
    if let Some(timeout) = timed_out {
        publish(bus, || {
            Event::new(EventKind::TimeoutHit)
                .with_task(name)
                .with_attempt(attempt)
                .with_timeout(timeout)
        });
    }

    match res {
        Ok(Ok(())) => {
            publish(bus, || {
                Event::new(EventKind::RunSucceeded)
                    .with_task(name)
                    .with_attempt(attempt)
            });
            Execution::Succeeded
        }
        Ok(Err(err)) => {
            publish(bus, || {
                Event::new(EventKind::RunFailed)
                    .with_task(name)
                    .with_attempt(attempt)
                    .with_reason(err.to_string())
            });
            Execution::Failed(err)
        }
        Err(p) => {
            publish(bus, || {
                Event::new(EventKind::PanicContained)
                    .with_task(name)
                    .with_attempt(attempt)
                    .with_reason(p.value.as_str())
            });
            Execution::Panicked(p)
        }
    }
}

/// Publishes lazily: events are only built when a bus is attached.
pub(crate) fn publish(bus: Option<&Bus>, ev: impl FnOnce() -> Event) {
    if let Some(bus) = bus {
        bus.publish(ev());
    }
}
