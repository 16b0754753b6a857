//! # Runnables and panic capture.
//!
//! This module provides the unit of work supervised by an [`Instance`](crate::Instance):
//! - [`Runnable`] - trait for a single-shot, cancellable operation
//! - [`RunnableFn`] - closure-backed implementation
//! - [`RunnableRef`] - shared handle (`Arc<dyn Runnable>`)
//! - [`NilRunnable`] - stand-in for a missing runnable (panics with [`NIL_RUNNABLE`])
//! - [`RunnablePanic`] - typed error wrapping a contained panic

mod panic;
mod runnable;
mod runnable_fn;

pub use panic::RunnablePanic;
pub use runnable::{BoxRunFuture, NIL_RUNNABLE, NilRunnable, Runnable, RunnableRef};
pub use runnable_fn::RunnableFn;
