//! # Runnable contract.
//!
//! A [`Runnable`] is one operation: it receives a [`Context`] and returns
//! `Ok(())` on success or any [`TaskError`] on failure. The engine calls
//! [`Runnable::spawn`] once per execution and awaits the returned future.
//!
//! Runnables are expected to respect their context: the engine never interrupts an
//! execution forcibly, it only cancels the context (parent cancellation or timeout).

use std::{future::Future, pin::Pin, sync::Arc};

use crate::{context::Context, error::TaskError};

/// Panic message raised when a missing runnable is invoked.
pub const NIL_RUNNABLE: &str = "attempted to run a nil Runnable";

/// Boxed future returned by [`Runnable::spawn`].
pub type BoxRunFuture = Pin<Box<dyn Future<Output = Result<(), TaskError>> + Send + 'static>>;

/// Shared handle to a runnable.
pub type RunnableRef = Arc<dyn Runnable>;

/// # Single-shot, cancellable unit of work.
///
/// # Example
/// ```
/// use runvisor::{BoxRunFuture, Context, Runnable, TaskError};
///
/// struct Ping;
///
/// impl Runnable for Ping {
///     fn name(&self) -> &str { "ping" }
///
///     fn spawn(&self, ctx: Context) -> BoxRunFuture {
///         Box::pin(async move {
///             if let Some(err) = ctx.err() {
///                 return Err(err.into());
///             }
///             Ok::<(), TaskError>(())
///         })
///     }
/// }
/// ```
pub trait Runnable: Send + Sync + 'static {
    /// Returns a stable, human-readable name (used in events).
    fn name(&self) -> &str;

    /// Creates the future for one execution.
    ///
    /// Every call must produce a fresh future; state shared across executions
    /// belongs in the implementor behind explicit synchronization.
    fn spawn(&self, ctx: Context) -> BoxRunFuture;
}

/// Placeholder bound by an instance created without a runnable.
///
/// Invoking it is a programming error and panics with [`NIL_RUNNABLE`].
#[derive(Debug, Default, Clone, Copy)]
pub struct NilRunnable;

impl Runnable for NilRunnable {
    fn name(&self) -> &str {
        "nil"
    }

    fn spawn(&self, _ctx: Context) -> BoxRunFuture {
        panic!("{}", NIL_RUNNABLE)
    }
}
