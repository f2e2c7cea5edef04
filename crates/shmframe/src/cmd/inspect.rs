use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use shmframe::channel::{segment_name, Segment};
use shmframe::codec::{self, SlotStatus};

use crate::cmd::InspectArgs;
use crate::exit::{channel_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct SlotInfo {
    channel_id: u32,
    segment: String,
    sentinels_ok: bool,
    status: i32,
    status_name: &'static str,
    width: i32,
    height: i32,
    size: i32,
    timestamp: u64,
}

pub fn run(args: InspectArgs, format: OutputFormat) -> CliResult<i32> {
    let name = segment_name(args.channel_id);
    let segment = Segment::attach(&name).map_err(|err| channel_error("attach segment", err))?;
    let info = read_info(args.channel_id, &name, segment.as_slice());

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&info).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"])
                .add_row(vec!["segment".to_string(), info.segment.clone()])
                .add_row(vec!["sentinels".to_string(), ok_text(info.sentinels_ok)])
                .add_row(vec![
                    "status".to_string(),
                    format!("{} ({})", info.status, info.status_name),
                ])
                .add_row(vec![
                    "dims".to_string(),
                    format!("{}x{}", info.width, info.height),
                ])
                .add_row(vec!["size".to_string(), info.size.to_string()])
                .add_row(vec!["timestamp".to_string(), info.timestamp.to_string()]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "segment {} sentinels={} status={}({}) dims={}x{} size={} ts={}",
                info.segment,
                ok_text(info.sentinels_ok),
                info.status,
                info.status_name,
                info.width,
                info.height,
                info.size,
                info.timestamp,
            );
        }
    }

    Ok(SUCCESS)
}

fn read_info(channel_id: u32, name: &str, slot: &[u8]) -> SlotInfo {
    let status = codec::read_status(slot);
    SlotInfo {
        channel_id,
        segment: name.to_string(),
        sentinels_ok: codec::sentinels_valid(slot),
        status,
        status_name: status_name(status),
        width: read_i32(slot, codec::WIDTH_OFFSET),
        height: read_i32(slot, codec::HEIGHT_OFFSET),
        size: read_i32(slot, codec::SIZE_OFFSET),
        timestamp: u64::from_le_bytes(
            slot[codec::TIMESTAMP_OFFSET..codec::TIMESTAMP_OFFSET + 8]
                .try_into()
                .unwrap_or_default(),
        ),
    }
}

fn read_i32(slot: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes(slot[offset..offset + 4].try_into().unwrap_or_default())
}

fn status_name(raw: i32) -> &'static str {
    match SlotStatus::from_raw(raw) {
        Some(SlotStatus::Empty) => "EMPTY",
        Some(SlotStatus::Produced) => "PRODUCED",
        Some(SlotStatus::Consumed) => "CONSUMED",
        None => "UNKNOWN",
    }
}

fn ok_text(ok: bool) -> String {
    if ok { "ok" } else { "INVALID" }.to_string()
}
