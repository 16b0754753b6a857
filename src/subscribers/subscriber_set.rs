//! # Non-blocking event fan-out to multiple subscribers.
//!
//! [`SubscriberSet`] distributes events to its subscribers without ever waiting
//! for them to be processed.
//!
//! ```text
//! Bus ──► listener ──► emit_arc(event)
//!                          │
//!                          ├──► [queue 1] ──► worker 1 ──► subscriber1.on_event()
//!                          │    (bounded)         └──────► panic → SubscriberPanicked
//!                          └──► [queue N] ──► worker N ──► subscriberN.on_event()
//! ```
//!
//! ## Rules
//! - **Non-blocking**: `emit()` uses `try_send` and returns immediately.
//! - **Overflow**: the event is dropped for that subscriber only and
//!   `SubscriberOverflow` is published (never for an overflow event itself).
//! - **Per-subscriber FIFO**; no ordering across subscribers.
//! - **Isolation**: a panicking subscriber is reported and keeps receiving events.
//!
//! `AssertUnwindSafe` is used around `on_event`: a subscriber that panics while
//! holding a lock may leave its own state inconsistent.

use std::sync::Arc;

use futures::FutureExt;
use tokio::{
    sync::{broadcast::error::RecvError, mpsc},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::{
    events::{Bus, Event, EventKind},
    subscribers::Subscribe,
    tasks::RunnablePanic,
};

struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Queues shared between the set and its bus listener.
struct Fanout {
    channels: Vec<SubscriberChannel>,
    bus: Bus,
}

impl Fanout {
    fn emit_arc(&self, event: Arc<Event>) {
        let is_overflow_evt = matches!(event.kind, EventKind::SubscriberOverflow);

        for channel in &self.channels {
            let reason = match channel.sender.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            if !is_overflow_evt {
                self.bus
                    .publish(Event::subscriber_overflow(channel.name, reason));
            }
        }
    }
}

/// Fan-out coordinator for event subscribers.
///
/// Each subscriber gets a bounded queue and a dedicated worker task.
pub struct SubscriberSet {
    fanout: Arc<Fanout>,
    workers: Vec<JoinHandle<()>>,
    listener: Option<(CancellationToken, JoinHandle<()>)>,
}

impl SubscriberSet {
    /// Creates a set and spawns one worker per subscriber.
    ///
    /// Overflow and panic reports are published to `bus`. Must be called inside
    /// a Tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(sub.queue_capacity().max(1));
            let bus_for_worker = bus.clone();

            workers.push(tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = sub.on_event(ev.as_ref());
                    if let Err(payload) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                        let info = RunnablePanic::from_payload(payload).value;
                        bus_for_worker.publish(Event::subscriber_panicked(name, info));
                    }
                }
            }));
            channels.push(SubscriberChannel { name, sender: tx });
        }

        Self {
            fanout: Arc::new(Fanout { channels, bus }),
            workers,
            listener: None,
        }
    }

    /// Forwards every event published on the bus from now on.
    ///
    /// Calling it again has no effect. A lagging listener skips the events it missed.
    pub fn listen(&mut self) {
        if self.listener.is_some() {
            return;
        }
        let mut rx = self.fanout.bus.subscribe();
        let fanout = Arc::clone(&self.fanout);
        let stop = CancellationToken::new();
        let stopped = stop.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = stopped.cancelled() => break,
                    msg = rx.recv() => match msg {
                        Ok(ev) => fanout.emit_arc(Arc::new(ev)),
                        Err(RecvError::Lagged(_)) => continue,
                        Err(RecvError::Closed) => break,
                    }
                }
            }
        });
        self.listener = Some((stop, handle));
    }

    /// Emits a copy of `event` to all subscribers.
    pub fn emit(&self, event: &Event) {
        self.emit_arc(Arc::new(event.clone()));
    }

    /// Emits a shared event to all subscribers without cloning it.
    pub fn emit_arc(&self, event: Arc<Event>) {
        self.fanout.emit_arc(event);
    }

    /// Number of subscribers in the set.
    pub fn len(&self) -> usize {
        self.fanout.channels.len()
    }

    /// True if the set has no subscribers.
    pub fn is_empty(&self) -> bool {
        self.fanout.channels.is_empty()
    }

    /// Stops the listener, then lets every worker drain its queue and exit.
    pub async fn shutdown(self) {
        if let Some((stop, handle)) = self.listener {
            stop.cancel();
            let _ = handle.await;
        }
        drop(self.fanout);

        for h in self.workers {
            let _ = h.await;
        }
    }
}
