//! # Execution context: cancellation, deadline and scoped values.
//!
//! A [`Context`] is what the engine hands to a runnable. It bundles:
//! - a [`CancellationToken`] (cooperative cancellation, propagated parent → child);
//! - an optional deadline (the earliest deadline along the ancestor chain);
//! - an immutable chain of key/value bindings visible to every descendant.
//!
//! ## Derivation
//! ```text
//! Context::background()
//!    └─► with_value("tenant", 42)          (same token, one more binding)
//!          └─► with_timeout(3s) ──► (child, CancelGuard)
//!                 child is cancelled when:
//!                   - the parent is cancelled,
//!                   - the guard is cancelled or dropped,
//!                   - its deadline passes (timer on the Tokio runtime).
//! ```
//!
//! ## Rules
//! - Cancellation flows **down** only; a child never cancels its parent.
//! - [`Context::err`] reports the **first** cause that ended the context
//!   (its own or an ancestor's).
//! - Deriving a deadline-bound context spawns a timer, so it must happen inside a
//!   Tokio runtime.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::time::{self, Instant};
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::error::ContextError;

/// First cancellation cause recorded for one context level.
struct Cause {
    first: OnceLock<ContextError>,
    parent: Option<Arc<Cause>>,
}

impl Cause {
    fn root() -> Arc<Self> {
        Arc::new(Self {
            first: OnceLock::new(),
            parent: None,
        })
    }

    fn child(parent: &Arc<Cause>) -> Arc<Self> {
        Arc::new(Self {
            first: OnceLock::new(),
            parent: Some(Arc::clone(parent)),
        })
    }

    /// Records `err` unless the token already ended, then cancels it.
    fn settle(&self, token: &CancellationToken, err: ContextError) {
        if !token.is_cancelled() {
            let _ = self.first.set(err);
        }
        token.cancel();
    }

    fn resolve(&self) -> Option<ContextError> {
        let mut node = Some(self);
        while let Some(n) = node {
            if let Some(err) = n.first.get() {
                return Some(*err);
            }
            node = n.parent.as_deref();
        }
        None
    }
}

/// One key/value binding; bindings form a parent-linked chain.
struct ValueNode {
    key: &'static str,
    value: Arc<dyn Any + Send + Sync>,
    parent: Option<Arc<ValueNode>>,
}

/// Cancellation signal, optional deadline and scoped values passed to a runnable.
///
/// Cheap to clone; clones share the same token and bindings.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use runvisor::Context;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let root = Context::background().with_value("tenant", 42u32);
///     let (ctx, guard) = root.with_timeout(Duration::from_secs(3));
///
///     assert_eq!(ctx.value::<u32>("tenant"), Some(&42));
///     assert!(ctx.deadline().is_some());
///     assert!(ctx.err().is_none());
///
///     drop(guard);
///     assert!(ctx.is_cancelled());
///     assert!(!root.is_cancelled());
/// }
/// ```
#[derive(Clone)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
    cause: Arc<Cause>,
    values: Option<Arc<ValueNode>>,
}

impl Context {
    /// Root context: never cancelled by itself, no deadline, no values.
    pub fn background() -> Self {
        Self::from_token(CancellationToken::new())
    }

    /// Root context driven by an external token.
    ///
    /// Cancelling `token` ends this context with [`ContextError::Canceled`].
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
            cause: Cause::root(),
            values: None,
        }
    }

    /// Derives a cancellable child.
    ///
    /// The child inherits this context's deadline and values. The returned guard
    /// cancels the child when cancelled explicitly or dropped.
    pub fn with_cancel(&self) -> (Context, CancelGuard) {
        let child = Context {
            token: self.token.child_token(),
            deadline: self.deadline,
            cause: Cause::child(&self.cause),
            values: self.values.clone(),
        };
        let guard = CancelGuard {
            token: child.token.clone(),
            cause: Arc::clone(&child.cause),
            armed: true,
        };
        (child, guard)
    }

    /// Derives a child that ends at `deadline` at the latest.
    ///
    /// If this context already has an earlier deadline, that one is kept.
    pub fn with_deadline(&self, deadline: Instant) -> (Context, CancelGuard) {
        let (mut child, guard) = self.with_cancel();

        if self.deadline.is_some_and(|inherited| inherited <= deadline) {
            // An ancestor's timer already covers the earlier deadline.
            return (child, guard);
        }
        child.deadline = Some(deadline);

        if deadline <= Instant::now() {
            child
                .cause
                .settle(&child.token, ContextError::DeadlineExceeded);
            return (child, guard);
        }

        let token = child.token.clone();
        let cause = Arc::clone(&child.cause);
        tokio::spawn(async move {
            tokio::select! {
                _ = time::sleep_until(deadline) => {
                    cause.settle(&token, ContextError::DeadlineExceeded);
                }
                _ = token.cancelled() => {}
            }
        });

        (child, guard)
    }

    /// Derives a child that ends `timeout` from now at the latest.
    pub fn with_timeout(&self, timeout: Duration) -> (Context, CancelGuard) {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Returns a context sharing this one's cancellation, with one more binding.
    ///
    /// A later binding of the same key shadows earlier ones.
    pub fn with_value<T>(&self, key: &'static str, value: T) -> Context
    where
        T: Any + Send + Sync,
    {
        Context {
            token: self.token.clone(),
            deadline: self.deadline,
            cause: Arc::clone(&self.cause),
            values: Some(Arc::new(ValueNode {
                key,
                value: Arc::new(value),
                parent: self.values.clone(),
            })),
        }
    }

    /// Looks up the innermost binding of `key`.
    ///
    /// Returns `None` if the key is unbound or bound to a value of another type.
    pub fn value<T: Any>(&self, key: &str) -> Option<&T> {
        let mut node = self.values.as_deref();
        while let Some(n) = node {
            if n.key == key {
                return n.value.downcast_ref::<T>();
            }
            node = n.parent.as_deref();
        }
        None
    }

    /// Deadline after which this context ends, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// True once this context (or an ancestor) has ended.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes when this context ends.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    /// `None` while live, otherwise the first cause that ended this context.
    pub fn err(&self) -> Option<ContextError> {
        if !self.token.is_cancelled() {
            return None;
        }
        Some(self.cause.resolve().unwrap_or(ContextError::Canceled))
    }

    /// Underlying token, for interop with token-based APIs.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("deadline", &self.deadline)
            .field("err", &self.err())
            .finish_non_exhaustive()
    }
}

/// Release handle for a derived [`Context`].
///
/// Dropping the guard cancels the context it was returned with; call
/// [`disarm`](CancelGuard::disarm) to let the context live until its parent ends.
#[must_use = "dropping the guard cancels the derived context"]
pub struct CancelGuard {
    token: CancellationToken,
    cause: Arc<Cause>,
    armed: bool,
}

impl CancelGuard {
    /// Cancels the derived context with [`ContextError::Canceled`].
    pub fn cancel(&self) {
        self.cause.settle(&self.token, ContextError::Canceled);
    }

    /// Consumes the guard without cancelling.
    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        if self.armed {
            self.cancel();
        }
    }
}

impl fmt::Debug for CancelGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelGuard")
            .field("armed", &self.armed)
            .field("cancelled", &self.token.is_cancelled())
            .finish()
    }
}
