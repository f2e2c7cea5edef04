use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use shmframe::channel::FrameProducer;
use tracing::info;

use crate::cmd::ProduceArgs;
use crate::exit::{channel_error, io_error, CliError, CliResult, SUCCESS, TIMEOUT};

const PUBLISH_RETRY_GAP: Duration = Duration::from_millis(2);
const PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);

pub fn run(args: ProduceArgs) -> CliResult<i32> {
    let payload = match &args.payload_file {
        Some(path) => std::fs::read(path).map_err(|err| io_error("read payload", err))?,
        None => vec![args.fill; args.width as usize * args.height as usize * 3],
    };

    let mut producer =
        FrameProducer::create(args.channel_id).map_err(|err| channel_error("create segment", err))?;
    if args.keep {
        producer.keep_segment();
    }

    let base_timestamp = args.timestamp.unwrap_or_else(now_nanos);
    for n in 0..args.count {
        publish_with_retry(
            &mut producer,
            args.width,
            args.height,
            base_timestamp.wrapping_add(n),
            &payload,
        )?;
        if n + 1 < args.count {
            std::thread::sleep(Duration::from_millis(args.gap_ms));
        }
    }

    info!(
        channel_id = args.channel_id,
        frames = args.count,
        bytes = payload.len(),
        "frames published"
    );
    Ok(SUCCESS)
}

fn publish_with_retry(
    producer: &mut FrameProducer,
    width: u32,
    height: u32,
    timestamp: u64,
    payload: &[u8],
) -> CliResult<()> {
    let deadline = Instant::now() + PUBLISH_TIMEOUT;
    loop {
        let published = producer
            .publish(width, height, timestamp, payload)
            .map_err(|err| channel_error("publish frame", err))?;
        if published {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(CliError::new(
                TIMEOUT,
                "previous frame still unconsumed; is a consumer attached?",
            ));
        }
        std::thread::sleep(PUBLISH_RETRY_GAP);
    }
}

fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
