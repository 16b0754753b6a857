//! Execution engine: one instance, one runnable, one loop.
//!
//! The public API from this module is [`Instance`] (plus [`InstanceState`] and the
//! [`Outcomes`] stream it returns).
//!
//! Internal modules:
//! - [`instance`]: handle, one-shot start guard, shared counters;
//! - [`actor`]: the supervised loop (wait → execute → report → decide);
//! - [`runner`]: one execution with child context and panic boundary;
//! - [`schedule`]: rerun decision from counters and options;
//! - [`outcomes`]: bounded / rendezvous outcome stream.

mod actor;
mod instance;
mod outcomes;
mod runner;
mod schedule;

#[cfg(test)]
mod tests;

pub use instance::{Instance, InstanceState};
pub use outcomes::Outcomes;
