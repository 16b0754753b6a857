//! # Function-backed runnable (`RunnableFn`)
//!
//! [`RunnableFn`] wraps a closure `F: Fn(Context) -> Fut`, producing a fresh
//! future per execution. No hidden mutation between executions; shared state goes
//! into the closure explicitly (`Arc<...>`).
//!
//! ## Example
//! ```rust
//! use runvisor::{Context, RunnableFn, RunnableRef, TaskError};
//!
//! let r: RunnableRef = RunnableFn::arc("worker", |ctx: Context| async move {
//!     if ctx.is_cancelled() {
//!         return Ok(());
//!     }
//!     // do work...
//!     Ok::<_, TaskError>(())
//! });
//!
//! assert_eq!(r.name(), "worker");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use crate::context::Context;
use crate::error::TaskError;
use crate::tasks::runnable::{BoxRunFuture, Runnable};

/// Closure-backed runnable.
#[derive(Debug)]
pub struct RunnableFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> RunnableFn<F> {
    /// Creates a new closure-backed runnable.
    ///
    /// Prefer [`RunnableFn::arc`] when you immediately need a [`RunnableRef`](crate::RunnableRef).
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the runnable behind an `Arc`.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<F, Fut> Runnable for RunnableFn<F>
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn spawn(&self, ctx: Context) -> BoxRunFuture {
        Box::pin((self.f)(ctx))
    }
}
