//! # Event subscribers.
//!
//! Lifecycle events published on a [`Bus`](crate::Bus) can be consumed directly
//! through [`Bus::subscribe`](crate::Bus::subscribe), or fanned out to
//! [`Subscribe`] implementations through a [`SubscriberSet`].
//!
//! ```text
//! Instance ── publish(Event) ──► Bus ──► SubscriberSet::listen
//!                                              │
//!                                              ├──► [queue] ──► LogWriter
//!                                              ├──► [queue] ──► Metrics
//!                                              └──► [queue] ──► Custom ...
//! ```
//!
//! ## Implementing a subscriber
//! ```no_run
//! use async_trait::async_trait;
//! use runvisor::{Event, EventKind, Subscribe};
//!
//! struct FailureCounter;
//!
//! #[async_trait]
//! impl Subscribe for FailureCounter {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::RunFailed {
//!             // increment a counter
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "failure-counter" }
//! }
//! ```

#[cfg(feature = "logging")]
mod log;
mod subscriber;
mod subscriber_set;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use subscriber::Subscribe;
pub use subscriber_set::SubscriberSet;
