use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use shmframe::{AnalyticsSettings, Engine, FrameEvent, IntervalStage};

use crate::cmd::WatchArgs;
use crate::exit::{engine_error, io_error, CliError, CliResult, DATA_INVALID, INTERNAL, SUCCESS};
use crate::output::{print_event, OutputFormat};

pub fn run(args: WatchArgs, format: OutputFormat) -> CliResult<i32> {
    let settings = load_settings(&args)?;

    let mut engine = Engine::new(IntervalStage::new(args.trigger_every))
        .with_interval(Duration::from_millis(args.interval_ms));

    let printed = Arc::new(AtomicUsize::new(0));
    {
        let printed = printed.clone();
        engine.register_callback(Arc::new(move |event: &FrameEvent<'_>| {
            print_event(event, format);
            printed.fetch_add(1, Ordering::SeqCst);
        }));
    }

    engine
        .apply_settings(settings)
        .map_err(|err| engine_error("apply settings", err))?;
    engine
        .initialize(args.channel_id)
        .map_err(|err| engine_error("initialize", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    while running.load(Ordering::SeqCst) {
        if let Some(count) = args.count {
            if printed.load(Ordering::SeqCst) >= count {
                break;
            }
        }
        std::thread::sleep(Duration::from_millis(25));
    }

    engine
        .shutdown()
        .map_err(|err| engine_error("shutdown", err))?;
    Ok(SUCCESS)
}

fn load_settings(args: &WatchArgs) -> CliResult<AnalyticsSettings> {
    match &args.settings {
        Some(path) => {
            let text =
                std::fs::read_to_string(path).map_err(|err| io_error("read settings", err))?;
            serde_json::from_str(&text)
                .map_err(|err| CliError::new(DATA_INVALID, format!("parse settings: {err}")))
        }
        None => Ok(AnalyticsSettings {
            version: env!("CARGO_PKG_VERSION").to_string(),
            ..AnalyticsSettings::default()
        }),
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
