//! Error types used by runnables and the execution engine.
//!
//! This module defines three error enums:
//!
//! - [`TaskError`]: errors returned by a runnable's execution.
//! - [`ContextError`]: why a [`Context`](crate::Context) stopped being live.
//! - [`RunError`]: everything the engine reports on its outcome stream.
//!
//! Each provides `as_label` for logs/metrics. [`RunError`] is transparent over its
//! sources, so the text seen on the outcome stream equals the underlying error's text.

use std::error::Error as StdError;

use thiserror::Error;

use crate::tasks::RunnablePanic;

/// # Why a context is no longer live.
///
/// Returned by [`Context::err`](crate::Context::err) once the context has been cancelled.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
    /// The context (or one of its ancestors) was cancelled explicitly.
    #[error("context canceled")]
    Canceled,

    /// The context's deadline passed before it was cancelled otherwise.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

impl ContextError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ContextError::Canceled => "context_canceled",
            ContextError::DeadlineExceeded => "context_deadline_exceeded",
        }
    }
}

/// # Errors produced by a runnable execution.
///
/// Any `Err` returned by a runnable counts as a failed execution, whatever the variant.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TaskError {
    /// Execution failed with a plain message.
    #[error("{error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The runnable observed its context ending and gave up.
    #[error(transparent)]
    Context(#[from] ContextError),

    /// Execution failed with an arbitrary error value.
    #[error(transparent)]
    Source(Box<dyn StdError + Send + Sync + 'static>),
}

impl TaskError {
    /// Builds a [`TaskError::Fail`] from anything printable.
    ///
    /// # Example
    /// ```
    /// use runvisor::TaskError;
    ///
    /// let err = TaskError::fail("connection refused");
    /// assert_eq!(err.to_string(), "connection refused");
    /// ```
    pub fn fail(error: impl std::fmt::Display) -> Self {
        TaskError::Fail {
            error: error.to_string(),
        }
    }

    /// Wraps an arbitrary error as [`TaskError::Source`].
    pub fn source<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        TaskError::Source(Box::new(err))
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use runvisor::TaskError;
    ///
    /// assert_eq!(TaskError::fail("boom").as_label(), "task_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Context(_) => "task_context_ended",
            TaskError::Source(_) => "task_error",
        }
    }
}

/// # Errors reported on an instance's outcome stream.
///
/// In order of priority when several apply at once:
/// - [`RunError::Context`]: the parent context ended while the engine was waiting;
/// - [`RunError::Task`]: a runnable returned an error (forwarded verbatim);
/// - [`RunError::Panic`]: a contained panic (always the last item on the stream).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RunError {
    /// Error returned by the runnable.
    #[error(transparent)]
    Task(#[from] TaskError),

    /// Panic captured while panic containment was enabled.
    #[error(transparent)]
    Panic(#[from] RunnablePanic),

    /// The parent context ended.
    #[error(transparent)]
    Context(#[from] ContextError),
}

impl RunError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RunError::Task(e) => e.as_label(),
            RunError::Panic(_) => "runnable_panic",
            RunError::Context(e) => e.as_label(),
        }
    }

    /// True for a captured panic.
    pub fn is_panic(&self) -> bool {
        matches!(self, RunError::Panic(_))
    }

    /// Returns the parent context error, if this item reports one.
    pub fn as_context(&self) -> Option<ContextError> {
        match self {
            RunError::Context(e) => Some(*e),
            _ => None,
        }
    }
}
