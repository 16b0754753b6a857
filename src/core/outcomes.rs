//! # Outcome stream.
//!
//! [`Outcomes`] is the receive side handed out by [`Instance::start`](crate::Instance::start).
//! Exactly one producer (the instance loop) writes into it; it closes once, when the
//! loop exits.
//!
//! ## Capacity
//! ```text
//! buffer = B > 0   up to B errors queue without blocking the loop;
//!                  the (B+1)-th send waits until the consumer receives one
//! buffer = 0       rendezvous: every send waits until the consumer receives it
//! ```
//! Back-pressure is intentional: a consumer that stops draining stalls the loop.
//!
//! If the consumer drops [`Outcomes`], later sends are discarded.

use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};

use futures::Stream;
use tokio::sync::{mpsc, oneshot};

use crate::error::RunError;

/// One queued error plus, in rendezvous mode, the receipt the producer waits for.
struct Delivery {
    err: RunError,
    ack: Option<oneshot::Sender<()>>,
}

impl Delivery {
    fn open(self) -> RunError {
        if let Some(ack) = self.ack {
            let _ = ack.send(());
        }
        self.err
    }
}

/// Creates a connected sender/stream pair for the given buffer size.
pub(crate) fn channel(buffer: usize) -> (OutcomeSender, Outcomes) {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    (
        OutcomeSender {
            tx,
            rendezvous: buffer == 0,
        },
        Outcomes { rx, buffer },
    )
}

/// Producer side, owned by the instance loop.
pub(crate) struct OutcomeSender {
    tx: mpsc::Sender<Delivery>,
    rendezvous: bool,
}

impl OutcomeSender {
    /// Delivers `err`, waiting for capacity (or for receipt in rendezvous mode).
    ///
    /// Returns `false` if the consumer is gone.
    pub(crate) async fn send(&self, err: RunError) -> bool {
        if !self.rendezvous {
            return self.tx.send(Delivery { err, ack: None }).await.is_ok();
        }

        let (ack, receipt) = oneshot::channel();
        if self.tx.send(Delivery { err, ack: Some(ack) }).await.is_err() {
            return false;
        }
        // A dropped consumer drops the pending delivery and its ack with it.
        receipt.await.is_ok()
    }
}

/// Receive-only stream of errors reported by an instance.
///
/// Yields errors in generation order and ends (`None`) once the instance has
/// terminated. Also usable as a [`futures::Stream`].
pub struct Outcomes {
    rx: mpsc::Receiver<Delivery>,
    buffer: usize,
}

impl Outcomes {
    /// Receives the next error, or `None` once the instance has terminated.
    pub async fn recv(&mut self) -> Option<RunError> {
        self.rx.recv().await.map(Delivery::open)
    }

    /// Receives an already queued error without waiting.
    ///
    /// Returns `None` both when nothing is queued and when the stream is closed;
    /// use [`is_closed`](Self::is_closed) to tell them apart.
    pub fn try_recv(&mut self) -> Option<RunError> {
        self.rx.try_recv().ok().map(Delivery::open)
    }

    /// True once the producer has finished and every queued error was received.
    pub fn is_closed(&self) -> bool {
        self.rx.is_closed() && self.rx.is_empty()
    }

    /// Configured buffer size (`0` = rendezvous).
    pub fn buffer(&self) -> usize {
        self.buffer
    }

    /// Drains the stream until it closes.
    pub async fn collect_all(mut self) -> Vec<RunError> {
        let mut errs = Vec::new();
        while let Some(err) = self.recv().await {
            errs.push(err);
        }
        errs
    }
}

impl Stream for Outcomes {
    type Item = RunError;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<RunError>> {
        self.rx.poll_recv(cx).map(|d| d.map(Delivery::open))
    }
}

impl std::fmt::Debug for Outcomes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Outcomes")
            .field("buffer", &self.buffer)
            .field("queued", &self.rx.len())
            .finish()
    }
}
