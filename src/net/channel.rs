//! Peer channels
//!
//! The host only ever talks to a connection through [`PeerChannel`]. Sends
//! never block: each peer has a bounded outbound queue drained by a transport
//! task, and a full or closed queue drops the frame.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Shared, already-encoded text frame
pub type Frame = Arc<str>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("outbound queue full")]
    Full,
    #[error("channel closed")]
    Closed,
}

/// Duplex message channel to one remote peer (send half)
pub trait PeerChannel: Send + Sync {
    /// Queue a frame without blocking
    fn send(&self, frame: Frame) -> Result<(), ChannelError>;

    fn is_open(&self) -> bool;

    /// Stop accepting frames; already queued frames are still delivered
    fn close(&self);
}

/// Bounded in-process channel backed by a tokio mpsc queue
pub struct QueueChannel {
    sender: Mutex<Option<mpsc::Sender<Frame>>>,
}

impl QueueChannel {
    /// Create a channel and the receiver the transport drains
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                sender: Mutex::new(Some(tx)),
            },
            rx,
        )
    }
}

impl PeerChannel for QueueChannel {
    fn send(&self, frame: Frame) -> Result<(), ChannelError> {
        let guard = self.sender.lock();
        let sender = guard.as_ref().ok_or(ChannelError::Closed)?;
        sender.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => ChannelError::Full,
            TrySendError::Closed(_) => ChannelError::Closed,
        })
    }

    fn is_open(&self) -> bool {
        self.sender
            .lock()
            .as_ref()
            .map(|tx| !tx.is_closed())
            .unwrap_or(false)
    }

    fn close(&self) {
        self.sender.lock().take();
    }
}
