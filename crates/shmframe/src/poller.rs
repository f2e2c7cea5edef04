use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use shmframe_channel::{ChannelError, FrameChannel};
use tracing::{debug, trace, warn};

use crate::detect::DetectionStage;
use crate::dispatch::CallbackDispatcher;
use crate::settings::AnalyticsSettings;

/// Poll cadence between channel reads.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// State shared between the engine and its poll thread.
///
/// One context object, built by the engine and handed to the thread at
/// start — the poller has no ambient globals.
pub struct PollerContext {
    pub channel_id: u32,
    pub interval: Duration,
    pub running: Arc<AtomicBool>,
    pub dispatcher: Arc<CallbackDispatcher>,
    /// Settings that arrived since the last tick, if any.
    pub pending_settings: Arc<Mutex<Option<AnalyticsSettings>>>,
}

/// The poll loop body. Runs on a dedicated thread until the running flag
/// clears; the flag is checked only at iteration boundaries, so shutdown
/// waits for the in-flight tick.
pub fn run(ctx: PollerContext, mut stage: Box<dyn DetectionStage>) {
    debug!(channel_id = ctx.channel_id, "frame poller started");

    let mut channel: Option<FrameChannel> = None;
    while ctx.running.load(Ordering::SeqCst) {
        let tick_start = Instant::now();

        if let Some(settings) = take_pending(&ctx.pending_settings) {
            stage.configure(&settings);
        }

        tick(&ctx, &mut channel, stage.as_mut());

        if let Some(remaining) = ctx.interval.checked_sub(tick_start.elapsed()) {
            std::thread::sleep(remaining);
        }
    }

    debug!(channel_id = ctx.channel_id, "frame poller stopped");
}

/// One tick: attach if needed, take, detect, dispatch.
///
/// Never fatal — every failure is logged and the next tick proceeds. The
/// frame snapshot taken here is dropped when the tick returns, on every
/// path.
fn tick(ctx: &PollerContext, channel: &mut Option<FrameChannel>, stage: &mut dyn DetectionStage) {
    let channel_id = ctx.channel_id;

    if channel.is_none() {
        match FrameChannel::open_or_attach(channel_id) {
            Ok(chan) => *channel = Some(chan),
            Err(ChannelError::NotYetAvailable { .. }) => {
                trace!(channel_id, "segment not yet available");
                return;
            }
            Err(err) => {
                warn!(channel_id, error = %err, "failed to attach frame segment");
                return;
            }
        }
    }
    let Some(chan) = channel.as_mut() else {
        return;
    };

    let frame = match chan.try_take_frame() {
        Ok(Some(frame)) => frame,
        Ok(None) => return,
        Err(err) => {
            warn!(channel_id, error = %err, "discarding malformed frame slot");
            return;
        }
    };

    if !ctx.dispatcher.detection_enabled() {
        trace!(channel_id, "detection not configured, dropping frame");
        return;
    }

    let result = match stage.detect(&frame) {
        Ok(result) => result,
        Err(err) => {
            warn!(channel_id, error = %err, "detection stage failed, skipping frame");
            return;
        }
    };

    if result.is_empty() {
        return;
    }
    ctx.dispatcher.dispatch(channel_id, &frame, &result);
}

fn take_pending(pending: &Mutex<Option<AnalyticsSettings>>) -> Option<AnalyticsSettings> {
    match pending.lock() {
        Ok(mut guard) => guard.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    }
}
