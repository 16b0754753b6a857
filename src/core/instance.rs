//! # Instance: one runnable bound to one configuration.
//!
//! An [`Instance`] is created up front and started at most once. Starting it
//! launches the supervised loop ([`InstanceActor`]) on the Tokio runtime and hands
//! back the [`Outcomes`] stream immediately.
//!
//! ## Lifecycle
//! ```text
//! NotStarted ──start()──► Running ──(parent cancelled | contained panic | policy stop)──► Terminated
//!                │
//!                └─ start() again ─► None (no second loop, no second stream)
//! ```
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use runvisor::{Context, Instance, RunOption, RunnableFn, RunnableRef, TaskError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let tick: RunnableRef = RunnableFn::arc("tick", |_ctx: Context| async {
//!         Ok::<(), TaskError>(())
//!     });
//!
//!     let inst = Instance::with_options(tick, [
//!         RunOption::Recur(true),
//!         RunOption::Period(Duration::from_millis(10)),
//!         RunOption::RunLimit(3),
//!     ]);
//!
//!     let outcomes = inst.start(&Context::background()).expect("first start");
//!     assert!(inst.start(&Context::background()).is_none());
//!
//!     assert!(outcomes.collect_all().await.is_empty());
//!     assert_eq!(inst.runs(), 3);
//! }
//! ```

use std::fmt;
use std::panic;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::{runtime::Handle, task::JoinHandle};

use crate::{
    config::{Options, RunOption},
    context::Context,
    core::{
        actor::InstanceActor,
        outcomes::{self, Outcomes},
        runner::publish,
        schedule::Schedule,
    },
    events::{Bus, Event, EventKind},
    tasks::{NilRunnable, RunnableRef},
};

/// Lifecycle state of an [`Instance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    /// `start` has not been called yet.
    NotStarted,
    /// The supervised loop is running.
    Running,
    /// The loop has exited; the outcome stream is closed (or closing).
    Terminated,
}

impl InstanceState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => InstanceState::NotStarted,
            1 => InstanceState::Running,
            _ => InstanceState::Terminated,
        }
    }
}

/// State written by the loop and readable through the instance handle.
#[derive(Debug, Default)]
pub(crate) struct Shared {
    state: AtomicU8,
    runs: AtomicU64,
    failures: AtomicU64,
}

impl Shared {
    pub(crate) fn set_state(&self, state: InstanceState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub(crate) fn record(&self, schedule: &Schedule) {
        self.runs.store(schedule.runs, Ordering::Relaxed);
        self.failures.store(schedule.failures, Ordering::Relaxed);
    }
}

/// Supervisor for exactly one runnable.
///
/// ### Rules
/// - [`start`](Self::start) launches the loop **at most once**, even under concurrent calls.
/// - Executions never overlap; errors appear on the stream in generation order.
/// - The stream closes exactly once, after the loop's last emission.
/// - An uncontained panic closes the stream without an error item;
///   [`join`](Self::join) re-raises it in the caller.
pub struct Instance {
    runnable: RunnableRef,
    options: Arc<Options>,
    bus: Option<Bus>,
    started: AtomicBool,
    shared: Arc<Shared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Instance {
    /// Binds `runnable` to `options`.
    ///
    /// `None` binds [`NilRunnable`]: starting such an instance panics inside the
    /// loop with [`NIL_RUNNABLE`](crate::NIL_RUNNABLE) (captured if panics are contained).
    pub fn new(runnable: impl Into<Option<RunnableRef>>, options: Options) -> Self {
        let runnable = runnable
            .into()
            .unwrap_or_else(|| Arc::new(NilRunnable) as RunnableRef);
        Self {
            runnable,
            options: Arc::new(options),
            bus: None,
            started: AtomicBool::new(false),
            shared: Arc::new(Shared::default()),
            task: Mutex::new(None),
        }
    }

    /// Binds `runnable` to the options obtained by applying `opts` in order.
    pub fn with_options<I>(runnable: impl Into<Option<RunnableRef>>, opts: I) -> Self
    where
        I: IntoIterator<Item = RunOption>,
    {
        Self::new(runnable, opts.into_iter().collect())
    }

    /// Publishes lifecycle events to `bus`.
    pub fn with_bus(mut self, bus: Bus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Launches the supervised loop under `ctx` and returns its outcome stream.
    ///
    /// Returns `None` on every call after the first. Never blocks.
    ///
    /// Outside a Tokio runtime nothing is launched, `None` is returned and the
    /// instance stays `NotStarted`.
    pub fn start(&self, ctx: &Context) -> Option<Outcomes> {
        let runtime = Handle::try_current().ok()?;
        if self.started.swap(true, Ordering::AcqRel) {
            return None;
        }

        let (tx, rx) = outcomes::channel(self.options.result_buffer);
        self.shared.set_state(InstanceState::Running);
        publish(self.bus.as_ref(), || {
            Event::new(EventKind::InstanceStarted).with_task(self.runnable.name())
        });

        let actor = InstanceActor {
            runnable: RunnableRef::clone(&self.runnable),
            options: Arc::clone(&self.options),
            bus: self.bus.clone(),
            shared: Arc::clone(&self.shared),
        };
        let handle = runtime.spawn(actor.run(ctx.clone(), tx));
        *self.task.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);

        Some(rx)
    }

    /// Waits for the loop to exit.
    ///
    /// If the runnable panicked without containment, the panic is resumed here.
    /// Returns immediately if the instance was never started or was already joined.
    pub async fn join(&self) {
        let handle = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(handle) = handle else {
            return;
        };
        if let Err(err) = handle.await {
            if err.is_panic() {
                panic::resume_unwind(err.into_panic());
            }
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> InstanceState {
        InstanceState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    /// Successful executions so far (final total once terminated).
    pub fn runs(&self) -> u64 {
        self.shared.runs.load(Ordering::Relaxed)
    }

    /// Consecutive failures counted towards the restart limit.
    pub fn failures(&self) -> u64 {
        self.shared.failures.load(Ordering::Relaxed)
    }

    /// Configuration this instance runs with.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Name of the bound runnable.
    pub fn name(&self) -> &str {
        self.runnable.name()
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("runnable", &self.runnable.name())
            .field("state", &self.state())
            .field("runs", &self.runs())
            .field("failures", &self.failures())
            .finish_non_exhaustive()
    }
}
