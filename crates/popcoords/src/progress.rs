//! Progress reporting for pipeline runs.
//!
//! A run reports through a [`Progress`] sink. [`channel`] gives a per-run FIFO
//! hand-off: the run holds the [`ProgressSender`], a single reader holds the
//! [`ProgressReceiver`]. The receiver yields messages in enqueue order and ends
//! once every sender has been dropped, so a reader stops when its run is over.

use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::types::StatusMessage;

pub trait Progress: Send + Sync {
    fn report(&self, message: StatusMessage);
}

/// Discards everything.
pub struct NullProgress;

impl Progress for NullProgress {
    fn report(&self, _message: StatusMessage) {}
}

/// Forwards status lines to the `log` facade.
pub struct LogProgress;

impl Progress for LogProgress {
    fn report(&self, message: StatusMessage) {
        log::info!("{}", message);
    }
}

pub fn channel() -> (ProgressSender, ProgressReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ProgressSender { tx }, ProgressReceiver { rx })
}

#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: mpsc::UnboundedSender<StatusMessage>,
}

impl ProgressSender {
    /// True once the receiving side has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl Progress for ProgressSender {
    fn report(&self, message: StatusMessage) {
        if let Err(e) = self.tx.send(message) {
            log::trace!("Progress listener gone, dropping: {}", e.0);
        }
    }
}

#[derive(Debug)]
pub struct ProgressReceiver {
    rx: mpsc::UnboundedReceiver<StatusMessage>,
}

impl ProgressReceiver {
    /// Waits for the next message; `None` once the run has finished and the
    /// queue is drained.
    pub async fn recv(&mut self) -> Option<StatusMessage> {
        self.rx.recv().await
    }

    pub fn into_stream(self) -> UnboundedReceiverStream<StatusMessage> {
        UnboundedReceiverStream::new(self.rx)
    }
}
