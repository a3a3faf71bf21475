//! Progress reporting for batch runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc::UnboundedSender;

/// Events emitted while a batch runs
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// One more image is done (including skipped ones).
    Advanced {
        processed: usize,
        total: usize,
        /// `processed / total`, in 0.0..=1.0
        fraction: f32,
    },
    /// An image was skipped because it could not be decoded.
    Skipped { file_name: String, reason: String },
    /// The batch is over; always the last event.
    Finished {
        processed: usize,
        vehicles: usize,
        cancelled: bool,
    },
}

/// Receives progress events. Implementations must not block for long.
pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: ProgressEvent);
}

/// Discards everything
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_event(&self, _event: ProgressEvent) {}
}

/// Forwards events over a channel, e.g. to a UI task
pub struct ChannelProgress {
    sender: UnboundedSender<ProgressEvent>,
}

impl ChannelProgress {
    pub fn new(sender: UnboundedSender<ProgressEvent>) -> Self {
        Self { sender }
    }
}

impl ProgressSink for ChannelProgress {
    fn on_event(&self, event: ProgressEvent) {
        // A dropped receiver only means nobody is watching any more
        let _ = self.sender.send(event);
    }
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn on_event(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Cooperative stop flag, checked between images.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
