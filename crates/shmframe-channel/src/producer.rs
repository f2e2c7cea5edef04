use std::sync::atomic::{fence, Ordering};

use shmframe_codec::{slot, SlotStatus};
use tracing::{debug, info};

use crate::error::Result;
use crate::segment::{segment_name, Segment};

/// Producer side of a frame channel.
///
/// Creates and initializes the segment, then publishes one frame at a time
/// through the status handoff. The real capture pipeline lives in another
/// process; this handle exists for tools and tests exercising the consumer
/// path against a live segment.
pub struct FrameProducer {
    channel_id: u32,
    segment: Segment,
    /// Whether the backing object is unlinked on drop.
    cleanup_on_drop: bool,
}

impl FrameProducer {
    /// Create the segment for `channel_id` and initialize the slot.
    pub fn create(channel_id: u32) -> Result<Self> {
        let mut segment = Segment::create(&segment_name(channel_id))?;

        let buf = segment.as_mut_slice();
        if !slot::sentinels_valid(buf) {
            slot::reset_slot(buf);
        }
        info!(channel_id, name = segment.name(), "frame producer ready");

        Ok(Self {
            channel_id,
            segment,
            cleanup_on_drop: true,
        })
    }

    /// Keep the backing object alive after this producer is dropped.
    pub fn keep_segment(&mut self) {
        self.cleanup_on_drop = false;
    }

    /// The channel id this producer publishes on.
    pub fn channel_id(&self) -> u32 {
        self.channel_id
    }

    /// Publish one frame.
    ///
    /// Returns `Ok(false)` without touching the slot when the previous frame
    /// is still unconsumed — the consumer owns the payload until it stores
    /// `CONSUMED`. Payloads larger than the slot capacity are refused.
    pub fn publish(&mut self, width: u32, height: u32, timestamp: u64, payload: &[u8]) -> Result<bool> {
        let buf = self.segment.as_mut_slice();
        if !slot::sentinels_valid(buf) {
            slot::reset_slot(buf);
        }

        if slot::read_status(buf) == SlotStatus::Produced.as_raw() {
            return Ok(false);
        }

        slot::encode_frame(buf, width, height, timestamp, payload)?;

        // Field writes must be visible before the PRODUCED store that
        // publishes them.
        fence(Ordering::Release);
        slot::write_status(buf, SlotStatus::Produced);
        Ok(true)
    }
}

impl Drop for FrameProducer {
    fn drop(&mut self) {
        if self.cleanup_on_drop {
            debug!(channel_id = self.channel_id, "unlinking frame segment");
            let _ = Segment::unlink(&segment_name(self.channel_id));
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::sync::atomic::AtomicU32;

    use shmframe_codec::{SlotError, PAYLOAD_CAPACITY};

    use super::*;
    use crate::channel::FrameChannel;
    use crate::error::ChannelError;

    fn unique_channel_id() -> u32 {
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        910_000_000u32
            .wrapping_add((std::process::id() % 100_000) * 1_000)
            .wrapping_add(n)
    }

    #[test]
    fn publish_reports_backpressure_until_consumed() {
        let channel_id = unique_channel_id();
        let mut producer = FrameProducer::create(channel_id).expect("producer should create");

        assert!(producer.publish(4, 4, 1, &[1u8; 48]).unwrap());
        assert!(!producer.publish(4, 4, 2, &[2u8; 48]).unwrap());

        let mut channel = FrameChannel::open_or_attach(channel_id).expect("channel should attach");
        assert!(channel.try_take_frame().unwrap().is_some());

        assert!(producer.publish(4, 4, 2, &[2u8; 48]).unwrap());
    }

    #[test]
    fn publish_refuses_oversized_payload() {
        let channel_id = unique_channel_id();
        let mut producer = FrameProducer::create(channel_id).expect("producer should create");

        let payload = vec![0u8; PAYLOAD_CAPACITY + 1];
        let err = producer.publish(1920, 1080, 1, &payload).unwrap_err();
        assert!(matches!(
            err,
            ChannelError::Slot(SlotError::FrameTooLarge { .. })
        ));
    }

    #[test]
    fn drop_unlinks_segment_by_default() {
        let channel_id = unique_channel_id();
        {
            let _producer = FrameProducer::create(channel_id).expect("producer should create");
        }
        let err = FrameChannel::open_or_attach(channel_id).unwrap_err();
        assert!(matches!(err, ChannelError::NotYetAvailable { .. }));
    }

    #[test]
    fn keep_segment_survives_drop() {
        let channel_id = unique_channel_id();
        {
            let mut producer = FrameProducer::create(channel_id).expect("producer should create");
            producer.keep_segment();
        }
        assert!(FrameChannel::open_or_attach(channel_id).is_ok());
        Segment::unlink(&segment_name(channel_id)).expect("unlink should succeed");
    }
}
