use std::ffi::c_void;
use std::os::raw::c_char;

use shmframe::{AnalyticsSettings, Roi, TuningPair};

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShmResult {
    Ok = 0,
    InvalidArgument = 1,
    AlreadyStarted = 2,
    SettingsInvalid = 3,
    ShutdownFailed = 4,
    Internal = 99,
}

#[allow(dead_code)]
pub const SHM_OK: ShmResult = ShmResult::Ok;
#[allow(dead_code)]
pub const SHM_ERR_INVALID_ARGUMENT: ShmResult = ShmResult::InvalidArgument;
#[allow(dead_code)]
pub const SHM_ERR_ALREADY_STARTED: ShmResult = ShmResult::AlreadyStarted;
#[allow(dead_code)]
pub const SHM_ERR_SETTINGS_INVALID: ShmResult = ShmResult::SettingsInvalid;
#[allow(dead_code)]
pub const SHM_ERR_SHUTDOWN_FAILED: ShmResult = ShmResult::ShutdownFailed;
#[allow(dead_code)]
pub const SHM_ERR_INTERNAL: ShmResult = ShmResult::Internal;

/// A region of interest as passed across the C boundary.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShmRoi {
    pub x: i32,
    pub y: i32,
}

/// Host callback invoked synchronously on the poll thread for each detected
/// frame.
///
/// `data` points at `size` frame bytes and `rois` at `roi_count` entries
/// flattened in node order across `node_count` nodes. All pointers are only
/// valid for the duration of the call.
pub type FrameCallback = unsafe extern "C" fn(
    channel_id: u32,
    width: i32,
    height: i32,
    data: *const u8,
    size: i32,
    timestamp: u64,
    rois: *const ShmRoi,
    roi_count: i32,
    node_count: i32,
);

/// Analytics parameters in the legacy wire shape.
///
/// Strings are NUL-terminated within their fixed buffers. Tuning entries
/// with `sensitivity > 0` and grid entries with non-negative coordinates
/// are live; everything else is padding.
#[repr(C)]
pub struct ShmSettingParameters {
    pub version: [c_char; 32],
    pub event_endpoint: [c_char; 256],
    pub image_width: i32,
    pub image_height: i32,
    pub jpg_quality: i32,
    pub sensitivity: [i32; 10],
    pub threshold: [i32; 10],
    /// 10 nodes of 10 entries each, row-major.
    pub rois: [ShmRoi; 100],
}

impl ShmSettingParameters {
    pub(crate) fn to_settings(&self) -> AnalyticsSettings {
        let tuning = self
            .sensitivity
            .iter()
            .zip(self.threshold.iter())
            .filter(|(sensitivity, _)| **sensitivity > 0)
            .map(|(sensitivity, threshold)| TuningPair {
                sensitivity: *sensitivity,
                threshold: *threshold,
            })
            .collect();

        let mut roi_grid = Vec::new();
        for node in self.rois.chunks(10) {
            let rois: Vec<Roi> = node
                .iter()
                .filter(|roi| roi.x >= 0 && roi.y >= 0)
                .map(|roi| Roi { x: roi.x, y: roi.y })
                .collect();
            if !rois.is_empty() {
                roi_grid.push(rois);
            }
        }

        AnalyticsSettings {
            version: fixed_str(&self.version),
            event_endpoint: fixed_str(&self.event_endpoint),
            image_width: self.image_width.max(0) as u32,
            image_height: self.image_height.max(0) as u32,
            jpg_quality: self.jpg_quality.max(0) as u32,
            tuning,
            roi_grid,
        }
    }
}

fn fixed_str(buf: &[c_char]) -> String {
    let bytes: Vec<u8> = buf
        .iter()
        .take_while(|c| **c != 0)
        .map(|c| *c as u8)
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

pub type ShmEngineHandle = *mut c_void;

pub(crate) struct EngineHandle {
    pub engine: shmframe::Engine,
}
