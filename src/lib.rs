//! # runvisor
//!
//! **Runvisor** supervises the repeated execution of a single runnable.
//!
//! An [`Instance`] binds one [`Runnable`] to an immutable [`Options`] value and,
//! once started, drives it in a background loop: rerun after success
//! (recurrence), rerun after failure (restart with backoff), per-execution
//! timeouts, run limits and optional panic containment. Every error is reported
//! on the [`Outcomes`] stream, which closes when the instance terminates.
//!
//! ## Architecture
//! ```text
//!   Runnable ──┐        Options ──┐
//!              ▼                  ▼
//! ┌───────────────────────────────────────────────┐
//! │ Instance (start at most once)                 │
//! │  - InstanceActor (background loop)            │
//! │  - Schedule (runs / failures, rerun decision) │
//! └──────┬─────────────────────────────┬──────────┘
//!        │ RunError                    │ Event (optional Bus)
//!        ▼                             ▼
//!   Outcomes stream           SubscriberSet ──► Subscribe workers
//!   (closes once)             (per-subscriber queues)
//! ```
//!
//! ### Lifecycle
//! ```text
//! start(ctx) ──► spawn InstanceActor::run()
//!
//! loop {
//!   ├─► wait(after) or ctx cancelled ─► send ctx error, exit
//!   ├─► run_once(child ctx + timeout, panic boundary if Recover)
//!   │       ├─ Ok       ─► runs += 1 (failures reset when restart is on)
//!   │       │              recur? run_limit? ─► after = period | exit
//!   │       ├─ Err(e)   ─► send e, failures += 1
//!   │       │              restart? restart_limit? ─► after = backoff(failures) | exit
//!   │       └─ Panic(p) ─► send RunnablePanic, exit
//! }
//! exit: state = Terminated, stream closed
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types                                |
//! |-------------------|----------------------------------------------------------|------------------------------------------|
//! | **Engine**        | Supervised loop with a single-start guard                | [`Instance`], [`Outcomes`]               |
//! | **Configuration** | Ordered option values or a fluent builder                | [`Options`], [`RunOption`]               |
//! | **Policies**      | Backoff functions, jitter, failure reset semantics       | [`Backoff`], [`JitterPolicy`], [`ResetMode`] |
//! | **Runnables**     | Trait objects or closures receiving a [`Context`]        | [`Runnable`], [`RunnableFn`]             |
//! | **Errors**        | Typed errors, panic capture                              | [`RunError`], [`TaskError`], [`RunnablePanic`] |
//! | **Events**        | Lifecycle events and non-blocking subscriber fan-out     | [`Bus`], [`Event`], [`Subscribe`]        |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use runvisor::{Backoff, Context, Instance, Options, RunnableFn, RunnableRef, TaskError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let attempts = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
//!     let counter = attempts.clone();
//!
//!     let flaky: RunnableRef = RunnableFn::arc("flaky", move |_ctx: Context| {
//!         let n = counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
//!         async move {
//!             if n < 2 {
//!                 Err(TaskError::fail(format!("attempt {n} failed")))
//!             } else {
//!                 Ok(())
//!             }
//!         }
//!     });
//!
//!     let opts = Options::builder()
//!         .with_chan_buffer(4)
//!         .with_restart(true)
//!         .with_restart_limit(5, Some(Backoff::linear(Duration::from_millis(10))))
//!         .build();
//!
//!     let inst = Instance::new(flaky, opts);
//!     let errors = inst.start(&Context::background()).unwrap().collect_all().await;
//!
//!     let texts: Vec<String> = errors.iter().map(ToString::to_string).collect();
//!     assert_eq!(texts, ["attempt 0 failed", "attempt 1 failed"]);
//!     assert_eq!(inst.runs(), 1);
//! }
//! ```
mod config;
mod context;
mod core;
mod error;
mod events;
mod policies;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use config::{Constraints, Options, OptionsBuilder, PanicOptions, Recurrence, RunOption};
pub use context::{CancelGuard, Context};
pub use core::{Instance, InstanceState, Outcomes};
pub use error::{ContextError, RunError, TaskError};
pub use events::{BackoffSource, Bus, Event, EventKind};
pub use policies::{Backoff, ExponentialBackoff, JitterPolicy, ResetMode, RestartOptions};
pub use subscribers::{Subscribe, SubscriberSet};
pub use tasks::{
    BoxRunFuture, NIL_RUNNABLE, NilRunnable, Runnable, RunnableFn, RunnablePanic, RunnableRef,
};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
