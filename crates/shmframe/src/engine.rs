use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, info};

use crate::detect::DetectionStage;
use crate::dispatch::{CallbackDispatcher, FrameSink};
use crate::error::{EngineError, Result};
use crate::poller::{self, PollerContext, DEFAULT_POLL_INTERVAL};
use crate::settings::AnalyticsSettings;

/// Lifecycle owner: the poll thread and all state shared with it.
///
/// Configuration calls (`apply_settings`, `register_callback`,
/// `unregister_callback`) are safe from any thread while the poller runs.
/// Dropping the engine performs a best-effort shutdown.
pub struct Engine {
    dispatcher: Arc<CallbackDispatcher>,
    pending_settings: Arc<Mutex<Option<AnalyticsSettings>>>,
    running: Arc<AtomicBool>,
    interval: Duration,
    stage: Option<Box<dyn DetectionStage>>,
    worker: Option<JoinHandle<()>>,
    channel_id: Option<u32>,
}

impl Engine {
    /// Build an engine around a detection stage.
    pub fn new(stage: impl DetectionStage + 'static) -> Self {
        Self {
            dispatcher: Arc::new(CallbackDispatcher::new()),
            pending_settings: Arc::new(Mutex::new(None)),
            running: Arc::new(AtomicBool::new(false)),
            interval: DEFAULT_POLL_INTERVAL,
            stage: Some(Box::new(stage)),
            worker: None,
            channel_id: None,
        }
    }

    /// Override the poll cadence.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Bind to a frame channel and start the poller.
    ///
    /// An absent segment is not an error here — the poller attaches lazily
    /// and retries every tick until the producer creates it. One start per
    /// engine lifetime; a second call returns
    /// [`EngineError::AlreadyStarted`].
    pub fn initialize(&mut self, channel_id: u32) -> Result<()> {
        if self.worker.is_some() {
            return Err(EngineError::AlreadyStarted);
        }
        let stage = self.stage.take().ok_or(EngineError::AlreadyStarted)?;

        self.running.store(true, Ordering::SeqCst);
        let ctx = PollerContext {
            channel_id,
            interval: self.interval,
            running: self.running.clone(),
            dispatcher: self.dispatcher.clone(),
            pending_settings: self.pending_settings.clone(),
        };

        let handle = std::thread::Builder::new()
            .name(format!("shmframe-poll-{channel_id}"))
            .spawn(move || poller::run(ctx, stage))
            .map_err(|err| {
                self.running.store(false, Ordering::SeqCst);
                EngineError::Spawn(err)
            })?;

        self.worker = Some(handle);
        self.channel_id = Some(channel_id);
        info!(channel_id, "engine initialized");
        Ok(())
    }

    /// Accept analytics parameters and enable detection.
    ///
    /// Valid before `initialize` as well: the settings are queued and the
    /// poller applies them on its first tick, with detection enabled from
    /// the start.
    pub fn apply_settings(&self, settings: AnalyticsSettings) -> Result<()> {
        settings.validate()?;
        info!(
            version = %settings.version,
            image_width = settings.image_width,
            image_height = settings.image_height,
            jpg_quality = settings.jpg_quality,
            tuning_pairs = settings.tuning.len(),
            roi_nodes = settings.roi_grid.len(),
            "analytics settings applied"
        );

        match self.pending_settings.lock() {
            Ok(mut guard) => *guard = Some(settings),
            Err(poisoned) => *poisoned.into_inner() = Some(settings),
        }
        self.dispatcher.enable_detection();
        Ok(())
    }

    /// Replace the registered host callback.
    pub fn register_callback(&self, sink: Arc<dyn FrameSink>) {
        self.dispatcher.register(sink);
    }

    /// Clear the registered host callback.
    pub fn unregister_callback(&self) {
        self.dispatcher.unregister();
    }

    /// The channel id passed to `initialize`, if any.
    pub fn channel_id(&self) -> Option<u32> {
        self.channel_id
    }

    /// Whether the poll thread is live.
    pub fn is_running(&self) -> bool {
        self.worker.is_some() && self.running.load(Ordering::SeqCst)
    }

    /// Stop the poller and wait for it.
    ///
    /// Clears the running flag and blocks until the in-flight iteration
    /// completes and the thread terminates. Idempotent; a panicked poll
    /// thread surfaces as [`EngineError::ShutdownFailed`].
    pub fn shutdown(&mut self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        let Some(handle) = self.worker.take() else {
            return Ok(());
        };

        handle.join().map_err(|_| EngineError::ShutdownFailed)?;
        debug!(channel_id = self.channel_id, "engine shut down");
        Ok(())
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("channel_id", &self.channel_id)
            .field("running", &self.running.load(Ordering::SeqCst))
            .field("interval", &self.interval)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::detect::{DetectionResult, IntervalStage};
    use crate::settings::TuningPair;

    use super::*;

    #[test]
    fn double_initialize_is_rejected() {
        let mut engine = Engine::new(IntervalStage::new(1));
        engine.initialize(u32::MAX).expect("first start should succeed");
        assert!(matches!(
            engine.initialize(u32::MAX),
            Err(EngineError::AlreadyStarted)
        ));
        engine.shutdown().expect("shutdown should succeed");
    }

    #[test]
    fn shutdown_without_initialize_is_ok() {
        let mut engine = Engine::new(IntervalStage::new(1));
        engine.shutdown().expect("shutdown should be idempotent");
        engine.shutdown().expect("shutdown should be idempotent");
    }

    #[test]
    fn shutdown_joins_the_poller() {
        let mut engine = Engine::new(IntervalStage::new(1));
        engine.initialize(u32::MAX - 1).expect("start should succeed");
        assert!(engine.is_running());

        engine.shutdown().expect("shutdown should succeed");
        assert!(!engine.is_running());
    }

    #[test]
    fn apply_settings_validates_and_enables_detection() {
        let engine = Engine::new(IntervalStage::new(1));
        assert!(!engine.dispatcher.detection_enabled());

        engine
            .apply_settings(AnalyticsSettings {
                version: "1.2".to_string(),
                tuning: vec![TuningPair {
                    sensitivity: 5,
                    threshold: 70,
                }],
                ..AnalyticsSettings::default()
            })
            .expect("settings should apply");
        assert!(engine.dispatcher.detection_enabled());

        let oversized = AnalyticsSettings {
            tuning: vec![
                TuningPair {
                    sensitivity: 1,
                    threshold: 1
                };
                20
            ],
            ..AnalyticsSettings::default()
        };
        assert!(matches!(
            engine.apply_settings(oversized),
            Err(EngineError::Settings(_))
        ));
    }

    #[test]
    fn settings_are_forwarded_to_the_stage() {
        struct Probe {
            configured: Arc<AtomicBool>,
        }
        impl DetectionStage for Probe {
            fn detect(
                &mut self,
                _frame: &shmframe_codec::FrameSnapshot,
            ) -> std::result::Result<DetectionResult, crate::detect::DetectionError> {
                Ok(DetectionResult::empty())
            }
            fn configure(&mut self, settings: &AnalyticsSettings) {
                assert_eq!(settings.version, "9.9");
                self.configured.store(true, Ordering::SeqCst);
            }
        }

        let configured = Arc::new(AtomicBool::new(false));
        let mut engine = Engine::new(Probe {
            configured: configured.clone(),
        });
        engine
            .apply_settings(AnalyticsSettings {
                version: "9.9".to_string(),
                ..AnalyticsSettings::default()
            })
            .expect("settings should apply");
        engine.initialize(u32::MAX - 2).expect("start should succeed");

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while !configured.load(Ordering::SeqCst) && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        engine.shutdown().expect("shutdown should succeed");
        assert!(configured.load(Ordering::SeqCst));
    }
}
