use serde::{Deserialize, Serialize};
use shmframe_codec::FrameSnapshot;

use crate::settings::AnalyticsSettings;

/// A region of interest in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roi {
    pub x: i32,
    pub y: i32,
}

/// Regions reported for one frame, grouped into ordered node sequences.
///
/// Produced from exactly one frame snapshot and ephemeral — it lives for
/// the duration of one dispatch call. Node sequences are dynamically sized;
/// there is no fixed grid capacity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectionResult {
    nodes: Vec<Vec<Roi>>,
}

impl DetectionResult {
    /// A result with no regions.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a result from node sequences.
    pub fn from_nodes(nodes: Vec<Vec<Roi>>) -> Self {
        Self { nodes }
    }

    /// True when no node carries any region.
    pub fn is_empty(&self) -> bool {
        self.nodes.iter().all(|node| node.is_empty())
    }

    /// Number of node groups.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Total region count across all nodes.
    pub fn total_rois(&self) -> usize {
        self.nodes.iter().map(Vec::len).sum()
    }

    /// The node sequences, in order.
    pub fn nodes(&self) -> &[Vec<Roi>] {
        &self.nodes
    }

    /// All regions in node order as one flat sequence.
    pub fn flatten(&self) -> Vec<Roi> {
        self.nodes.iter().flatten().copied().collect()
    }
}

/// Error type a detection stage may fail with.
pub type DetectionError = Box<dyn std::error::Error + Send + Sync>;

/// The pluggable image-analysis boundary.
///
/// Called once per consumed frame on the poll thread. Implementations may
/// be stateful and must not block for unbounded time — the poller has no
/// timeout around this call.
pub trait DetectionStage: Send {
    /// Analyze one frame.
    fn detect(&mut self, frame: &FrameSnapshot) -> Result<DetectionResult, DetectionError>;

    /// Analytics parameters forwarded from `apply_settings`. Default: ignored.
    fn configure(&mut self, settings: &AnalyticsSettings) {
        let _ = settings;
    }
}

impl<F> DetectionStage for F
where
    F: FnMut(&FrameSnapshot) -> Result<DetectionResult, DetectionError> + Send,
{
    fn detect(&mut self, frame: &FrameSnapshot) -> Result<DetectionResult, DetectionError> {
        self(frame)
    }
}

/// Stand-in stage that reports fixed regions every `interval`-th frame.
///
/// Mirrors the debug trigger the original pipeline shipped with. Useful for
/// tools and tests; not a detection policy.
pub struct IntervalStage {
    interval: u32,
    seen: u32,
    nodes: Vec<Vec<Roi>>,
}

impl IntervalStage {
    pub fn new(interval: u32) -> Self {
        Self::with_nodes(
            interval,
            vec![
                vec![
                    Roi { x: 0, y: 0 },
                    Roi { x: 10, y: 10 },
                    Roi { x: 30, y: 30 },
                    Roi { x: 40, y: 40 },
                ],
                vec![
                    Roi { x: 50, y: 50 },
                    Roi { x: 60, y: 60 },
                    Roi { x: 70, y: 70 },
                    Roi { x: 80, y: 80 },
                ],
            ],
        )
    }

    pub fn with_nodes(interval: u32, nodes: Vec<Vec<Roi>>) -> Self {
        Self {
            interval: interval.max(1),
            seen: 0,
            nodes,
        }
    }
}

impl DetectionStage for IntervalStage {
    fn detect(&mut self, _frame: &FrameSnapshot) -> Result<DetectionResult, DetectionError> {
        let hit = self.seen % self.interval == 0;
        self.seen = self.seen.wrapping_add(1);
        if hit {
            Ok(DetectionResult::from_nodes(self.nodes.clone()))
        } else {
            Ok(DetectionResult::empty())
        }
    }
}
