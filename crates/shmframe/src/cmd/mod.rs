use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod inspect;
pub mod produce;
pub mod version;
pub mod watch;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Poll a frame channel and print dispatched detection events.
    Watch(WatchArgs),
    /// Publish synthetic frames into a channel segment.
    Produce(ProduceArgs),
    /// Print the current slot state of a channel segment.
    Inspect(InspectArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Watch(args) => watch::run(args, format),
        Command::Produce(args) => produce::run(args),
        Command::Inspect(args) => inspect::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Channel id to poll.
    pub channel_id: u32,
    /// Analytics settings JSON file; defaults apply when omitted.
    #[arg(long, value_name = "FILE")]
    pub settings: Option<PathBuf>,
    /// Poll interval in milliseconds.
    #[arg(long, default_value_t = 5)]
    pub interval_ms: u64,
    /// Report the stand-in detection on every Nth frame.
    #[arg(long, default_value_t = 60)]
    pub trigger_every: u32,
    /// Stop after this many dispatched events.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct ProduceArgs {
    /// Channel id to publish on.
    pub channel_id: u32,
    /// Frame width in pixels.
    #[arg(long, default_value_t = 640)]
    pub width: u32,
    /// Frame height in pixels.
    #[arg(long, default_value_t = 480)]
    pub height: u32,
    /// Fill byte for the synthetic payload.
    #[arg(long, default_value_t = 0xAB)]
    pub fill: u8,
    /// Read the payload from a file instead of synthesizing it.
    #[arg(long, value_name = "FILE", conflicts_with = "fill")]
    pub payload_file: Option<PathBuf>,
    /// Number of frames to publish.
    #[arg(long, default_value_t = 1)]
    pub count: u64,
    /// Gap between frames in milliseconds.
    #[arg(long, default_value_t = 33)]
    pub gap_ms: u64,
    /// Timestamp of the first frame; later frames increment it. Defaults to
    /// wall-clock nanoseconds.
    #[arg(long)]
    pub timestamp: Option<u64>,
    /// Leave the segment in place on exit.
    #[arg(long)]
    pub keep: bool,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Channel id to inspect.
    pub channel_id: u32,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Include build and feature details.
    #[arg(long)]
    pub extended: bool,
}
