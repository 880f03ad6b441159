//! Bounded queue between the capture thread and the dispatcher.
//!
//! The sending half is used from the blocking capture thread; a full queue
//! blocks it, which stalls packet processing rather than losing names.

use tokio::sync::mpsc;

/// Default number of names the queue holds before capture blocks.
pub const DEFAULT_CAPACITY: usize = 100;

/// Create a queue holding at most `capacity` names.
///
/// # Panics
///
/// Panics if `capacity` is zero; configuration validation rejects that.
pub fn bounded(capacity: usize) -> (AnswerSender, AnswerReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (AnswerSender { tx }, AnswerReceiver { rx })
}

/// Returned when the receiving side has gone away.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("delivery queue is closed")]
pub struct QueueClosed(pub String);

/// Producing half. Dropping it closes the queue.
#[derive(Debug)]
pub struct AnswerSender {
    tx: mpsc::Sender<String>,
}

impl AnswerSender {
    /// Enqueue `name`, blocking the current thread while the queue is full.
    ///
    /// Must not be called from within an async context.
    pub fn enqueue_blocking(&self, name: String) -> Result<(), QueueClosed> {
        self.tx
            .blocking_send(name)
            .map_err(|mpsc::error::SendError(name)| QueueClosed(name))
    }

    /// Enqueue `name`, waiting asynchronously while the queue is full.
    #[cfg(test)]
    pub(crate) async fn enqueue(&self, name: String) -> Result<(), QueueClosed> {
        self.tx
            .send(name)
            .await
            .map_err(|mpsc::error::SendError(name)| QueueClosed(name))
    }
}

/// Consuming half.
#[derive(Debug)]
pub struct AnswerReceiver {
    rx: mpsc::Receiver<String>,
}

impl AnswerReceiver {
    /// Next name in FIFO order, or None once the queue is closed and empty.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Blocking variant of [`recv`](Self::recv) for use outside the runtime.
    pub fn blocking_recv(&mut self) -> Option<String> {
        self.rx.blocking_recv()
    }

    /// Refuse further names while keeping buffered ones receivable.
    pub fn close(&mut self) {
        self.rx.close();
    }

    /// Number of names currently buffered.
    pub(crate) fn len(&self) -> usize {
        self.rx.len()
    }
}
