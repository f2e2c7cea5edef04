use std::sync::atomic::{fence, Ordering};

use shmframe_codec::{slot, FrameSnapshot, SlotStatus};
use tracing::{debug, warn};

use crate::error::Result;
use crate::segment::{segment_name, Segment};

/// Consumer side of a frame channel.
///
/// Owns the mapping of `ChannelFrame_<id>` for its lifetime and exposes the
/// single non-blocking take operation that performs the producer-to-consumer
/// ownership handoff. This is the only reader-side mutation path of the
/// slot.
pub struct FrameChannel {
    channel_id: u32,
    segment: Segment,
}

impl FrameChannel {
    /// Map the existing segment for `channel_id`.
    ///
    /// Returns [`ChannelError::NotYetAvailable`](crate::ChannelError::NotYetAvailable)
    /// while the producer has not created the segment yet; callers retry on
    /// their next tick.
    pub fn open_or_attach(channel_id: u32) -> Result<Self> {
        let segment = Segment::attach(&segment_name(channel_id))?;
        debug!(channel_id, name = segment.name(), "frame channel attached");
        Ok(Self {
            channel_id,
            segment,
        })
    }

    /// The channel id this channel is bound to.
    pub fn channel_id(&self) -> u32 {
        self.channel_id
    }

    /// Take the pending frame, if the producer has published one.
    ///
    /// Non-blocking. Sentinel mismatch or an unknown status value marks the
    /// slot as never-initialized: it is zero-reset and `None` is returned.
    /// `PRODUCED` yields an owned snapshot of `payload[0..size]` and leaves
    /// the slot `CONSUMED`; `EMPTY` and `CONSUMED` return `None` without
    /// mutation. A `PRODUCED` slot with a malformed size or dimensions is
    /// zero-reset and the error surfaced, never read past bounds.
    pub fn try_take_frame(&mut self) -> Result<Option<FrameSnapshot>> {
        let channel_id = self.channel_id;
        let buf = self.segment.as_mut_slice();

        if !slot::sentinels_valid(buf) {
            slot::reset_slot(buf);
            debug!(channel_id, "slot sentinels invalid, reset to empty");
            return Ok(None);
        }

        let raw = slot::read_status(buf);
        match SlotStatus::from_raw(raw) {
            Some(SlotStatus::Produced) => {}
            Some(_) => return Ok(None),
            None => {
                slot::reset_slot(buf);
                warn!(channel_id, status = raw, "unknown slot status, reset to empty");
                return Ok(None);
            }
        }

        // The producer's PRODUCED store publishes the fields it guards;
        // order our reads after observing it.
        fence(Ordering::Acquire);

        let snapshot = match slot::decode_frame(buf) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                slot::reset_slot(buf);
                return Err(err.into());
            }
        };

        // The payload copy must complete before the producer sees CONSUMED
        // and starts overwriting the slot.
        fence(Ordering::Release);
        slot::write_status(buf, SlotStatus::Consumed);

        Ok(Some(snapshot))
    }
}

impl std::fmt::Debug for FrameChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameChannel")
            .field("channel_id", &self.channel_id)
            .field("segment", &self.segment.name())
            .finish()
    }
}
