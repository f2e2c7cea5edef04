use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use shmframe::{FrameEvent, Roi};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct EventOutput {
    channel_id: u32,
    width: u32,
    height: u32,
    size: usize,
    timestamp: u64,
    node_count: usize,
    roi_count: usize,
    rois: Vec<Roi>,
    payload_head: String,
    received_at: String,
}

pub fn print_event(event: &FrameEvent<'_>, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = EventOutput {
                channel_id: event.channel_id,
                width: event.width,
                height: event.height,
                size: event.size(),
                timestamp: event.timestamp,
                node_count: event.node_count(),
                roi_count: event.total_rois(),
                rois: event.flatten_rois(),
                payload_head: hex_head(event.payload),
                received_at: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CHANNEL", "DIMS", "SIZE", "TIMESTAMP", "ROIS", "NODES"])
                .add_row(vec![
                    event.channel_id.to_string(),
                    format!("{}x{}", event.width, event.height),
                    event.size().to_string(),
                    event.timestamp.to_string(),
                    event.total_rois().to_string(),
                    event.node_count().to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "frame channel={} {}x{} size={} ts={} head={}",
                event.channel_id,
                event.width,
                event.height,
                event.size(),
                event.timestamp,
                hex_head(event.payload),
            );
            for (node, rois) in event.nodes.iter().enumerate() {
                let coords: Vec<String> =
                    rois.iter().map(|roi| format!("({},{})", roi.x, roi.y)).collect();
                println!("  node {node}: {}", coords.join(" "));
            }
        }
    }
}

pub fn hex_head(payload: &[u8]) -> String {
    payload
        .iter()
        .take(8)
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join("")
}

pub fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
