//! Lifecycle events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** an
//! [`Instance`](crate::Instance) publishes to while it supervises its runnable.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: the instance loop (`core::actor`), `core::runner`,
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: [`SubscriberSet::listen`](crate::SubscriberSet::listen) or any
//!   receiver from [`Bus::subscribe`].

mod bus;
mod event;

pub use bus::Bus;
pub use event::{BackoffSource, Event, EventKind};
