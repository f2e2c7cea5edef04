use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use shmframe_codec::FrameSnapshot;
use tracing::trace;

use crate::detect::{DetectionResult, Roi};

/// One detected frame as delivered to the host.
///
/// Every reference borrows poller-owned memory that is released when the
/// dispatch call returns; the host must copy anything it wants to keep.
#[derive(Debug)]
pub struct FrameEvent<'a> {
    pub channel_id: u32,
    pub width: u32,
    pub height: u32,
    pub timestamp: u64,
    /// The frame bytes, `size` long.
    pub payload: &'a [u8],
    /// Detected regions grouped into ordered node sequences.
    pub nodes: &'a [Vec<Roi>],
}

impl FrameEvent<'_> {
    /// Payload length in bytes.
    pub fn size(&self) -> usize {
        self.payload.len()
    }

    /// Number of node groups.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Total region count across all nodes.
    pub fn total_rois(&self) -> usize {
        self.nodes.iter().map(Vec::len).sum()
    }

    /// All regions in node order as one flat sequence.
    pub fn flatten_rois(&self) -> Vec<Roi> {
        self.nodes.iter().flatten().copied().collect()
    }
}

/// The host callback capability.
///
/// Invoked synchronously on the poll thread; implementations are shared
/// across threads via `Arc` and must therefore be `Send + Sync`.
pub trait FrameSink: Send + Sync {
    fn on_frame(&self, event: &FrameEvent<'_>);
}

impl<F> FrameSink for F
where
    F: Fn(&FrameEvent<'_>) + Send + Sync,
{
    fn on_frame(&self, event: &FrameEvent<'_>) {
        self(event)
    }
}

/// Holds the registered host callback and the detection-enabled flag.
///
/// Mutators run on arbitrary host threads while the poller reads on its
/// own; the callback slot is an `Arc` swapped under a mutex so an in-flight
/// dispatch always completes against the sink that was registered when the
/// tick read it, and a replacement or unregister can never tear it.
pub struct CallbackDispatcher {
    sink: Mutex<Option<Arc<dyn FrameSink>>>,
    detection_enabled: AtomicBool,
}

impl CallbackDispatcher {
    pub fn new() -> Self {
        Self {
            sink: Mutex::new(None),
            detection_enabled: AtomicBool::new(false),
        }
    }

    /// Replace the registered callback.
    pub fn register(&self, sink: Arc<dyn FrameSink>) {
        *self.lock_sink() = Some(sink);
    }

    /// Clear the registered callback.
    ///
    /// Dispatches already holding the old sink complete against it; no
    /// later tick observes it.
    pub fn unregister(&self) {
        *self.lock_sink() = None;
    }

    /// Mark analytics parameters as received; detection runs from now on.
    pub fn enable_detection(&self) {
        self.detection_enabled.store(true, Ordering::SeqCst);
    }

    /// Whether detection has been configured.
    pub fn detection_enabled(&self) -> bool {
        self.detection_enabled.load(Ordering::SeqCst)
    }

    /// Snapshot the current callback. Read once per tick.
    pub fn current_sink(&self) -> Option<Arc<dyn FrameSink>> {
        self.lock_sink().clone()
    }

    /// Deliver a detected frame to the registered callback.
    ///
    /// Returns `false` (a silent skip, not an error) when no callback is
    /// registered.
    pub fn dispatch(
        &self,
        channel_id: u32,
        frame: &FrameSnapshot,
        result: &DetectionResult,
    ) -> bool {
        let Some(sink) = self.current_sink() else {
            trace!(channel_id, "no callback registered, skipping dispatch");
            return false;
        };

        let event = FrameEvent {
            channel_id,
            width: frame.width,
            height: frame.height,
            timestamp: frame.timestamp,
            payload: frame.payload.as_ref(),
            nodes: result.nodes(),
        };
        sink.on_frame(&event);
        true
    }

    fn lock_sink(&self) -> MutexGuard<'_, Option<Arc<dyn FrameSink>>> {
        match self.sink.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for CallbackDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
