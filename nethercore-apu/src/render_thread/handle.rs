//! Render thread handle
//!
//! Stages updates for the render thread and owns its lifecycle.

use std::sync::mpsc::{SyncSender, TrySendError};
use std::thread::JoinHandle;

use tracing::{debug, warn};

/// What happened to a staged update
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Applied before the next frame
    Queued,
    /// The queue already held `UPDATE_QUEUE_DEPTH` updates; this one was dropped
    QueueFull,
    /// The render thread has exited
    Disconnected,
}

impl SendOutcome {
    pub fn is_queued(self) -> bool {
        self == SendOutcome::Queued
    }
}

/// Handle to a running render thread
///
/// Returned from `RenderThread::spawn()`. Dropping it stops the thread and
/// waits for the frame in flight to finish.
pub struct RenderThreadHandle<U> {
    /// Update sender (Option so it can be dropped before joining)
    pub(super) tx: Option<SyncSender<U>>,

    pub(super) handle: Option<JoinHandle<()>>,
}

impl<U> RenderThreadHandle<U> {
    /// Stage an update for the start of the next frame
    ///
    /// Never blocks. A full queue drops the update; the caller decides
    /// whether to retry next frame or coalesce.
    pub fn send_update(&self, update: U) -> SendOutcome {
        let Some(tx) = self.tx.as_ref() else {
            return SendOutcome::Disconnected;
        };
        match tx.try_send(update) {
            Ok(()) => SendOutcome::Queued,
            Err(TrySendError::Full(_)) => {
                debug!("Render update queue full, dropping update");
                SendOutcome::QueueFull
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!("Render thread gone, update discarded");
                SendOutcome::Disconnected
            }
        }
    }

    /// Check if the render thread is still running
    pub fn is_alive(&self) -> bool {
        self.handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

impl<U> Drop for RenderThreadHandle<U> {
    fn drop(&mut self) {
        // The sender must go first: the thread exits when it sees the
        // channel disconnect, so joining while holding it would deadlock.
        drop(self.tx.take());

        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            warn!("Render thread panicked");
        }
    }
}
