use std::sync::Arc;

use shmframe::{Engine, FrameEvent, FrameSink, IntervalStage};

use crate::error;
use crate::types::{
    EngineHandle, FrameCallback, ShmEngineHandle, ShmResult, ShmRoi, ShmSettingParameters,
};

/// Stand-in trigger cadence for the legacy surface, matching the original
/// debug detector.
const LEGACY_TRIGGER_INTERVAL: u32 = 60;

fn with_engine<T>(
    handle: ShmEngineHandle,
    on_error: T,
    f: impl FnOnce(&mut EngineHandle) -> T,
) -> T {
    if handle.is_null() {
        let _ = error::set_invalid_argument("engine handle cannot be null");
        return on_error;
    }

    let engine_handle = {
        // SAFETY: Pointer validity is guaranteed by the caller.
        unsafe { &mut *(handle as *mut EngineHandle) }
    };

    f(engine_handle)
}

/// Adapter that forwards dispatched frames to the registered C callback.
struct CallbackSink {
    callback: FrameCallback,
}

impl FrameSink for CallbackSink {
    fn on_frame(&self, event: &FrameEvent<'_>) {
        let rois: Vec<ShmRoi> = event
            .nodes
            .iter()
            .flatten()
            .map(|roi| ShmRoi { x: roi.x, y: roi.y })
            .collect();

        // SAFETY: Every pointer refers to poller-owned memory that outlives
        // this synchronous call; the contract forbids the host retaining
        // them past return.
        unsafe {
            (self.callback)(
                event.channel_id,
                event.width as i32,
                event.height as i32,
                event.payload.as_ptr(),
                event.size() as i32,
                event.timestamp,
                rois.as_ptr(),
                rois.len() as i32,
                event.node_count() as i32,
            );
        }
    }
}

/// Create an engine with the built-in stand-in detection stage.
///
/// Returns null only if the allocation itself panics.
#[no_mangle]
pub extern "C" fn shmframe_engine_new() -> ShmEngineHandle {
    crate::ffi_boundary(std::ptr::null_mut(), || {
        error::clear_error_state();
        let handle = EngineHandle {
            engine: Engine::new(IntervalStage::new(LEGACY_TRIGGER_INTERVAL)),
        };
        Box::into_raw(Box::new(handle)) as ShmEngineHandle
    })
}

/// Bind the engine to a frame channel and start polling.
///
/// # Safety
/// `handle` must be a valid handle returned by `shmframe_engine_new`.
#[no_mangle]
pub unsafe extern "C" fn shmframe_engine_initialize(
    handle: ShmEngineHandle,
    channel_id: u32,
) -> ShmResult {
    crate::ffi_boundary(ShmResult::Internal, || {
        error::clear_error_state();
        with_engine(handle, ShmResult::InvalidArgument, |engine_handle| {
            match engine_handle.engine.initialize(channel_id) {
                Ok(()) => ShmResult::Ok,
                Err(err) => error::map_engine_error(&err),
            }
        })
    })
}

/// Apply analytics parameters and enable detection.
///
/// # Safety
/// `handle` must be a valid engine handle; `parameters` must be null or
/// point to a valid `ShmSettingParameters`.
#[no_mangle]
pub unsafe extern "C" fn shmframe_engine_apply_settings(
    handle: ShmEngineHandle,
    parameters: *const ShmSettingParameters,
) -> ShmResult {
    crate::ffi_boundary(ShmResult::Internal, || {
        error::clear_error_state();
        if parameters.is_null() {
            return error::set_invalid_argument("parameters cannot be null");
        }

        let settings = {
            // SAFETY: Non-null checked above; validity guaranteed by caller.
            unsafe { &*parameters }.to_settings()
        };

        with_engine(handle, ShmResult::InvalidArgument, |engine_handle| {
            match engine_handle.engine.apply_settings(settings) {
                Ok(()) => ShmResult::Ok,
                Err(err) => error::map_engine_error(&err),
            }
        })
    })
}

/// Replace the registered host callback. Passing null clears it, matching
/// `shmframe_engine_unregister_callback`.
///
/// # Safety
/// `handle` must be a valid engine handle; `callback`, when non-null, must
/// stay callable until unregistered or the engine is freed.
#[no_mangle]
pub unsafe extern "C" fn shmframe_engine_register_callback(
    handle: ShmEngineHandle,
    callback: Option<FrameCallback>,
) -> ShmResult {
    crate::ffi_boundary(ShmResult::Internal, || {
        error::clear_error_state();
        with_engine(handle, ShmResult::InvalidArgument, |engine_handle| {
            match callback {
                Some(callback) => engine_handle
                    .engine
                    .register_callback(Arc::new(CallbackSink { callback })),
                None => engine_handle.engine.unregister_callback(),
            }
            ShmResult::Ok
        })
    })
}

/// Clear the registered host callback.
///
/// # Safety
/// `handle` must be a valid engine handle.
#[no_mangle]
pub unsafe extern "C" fn shmframe_engine_unregister_callback(handle: ShmEngineHandle) -> ShmResult {
    crate::ffi_boundary(ShmResult::Internal, || {
        error::clear_error_state();
        with_engine(handle, ShmResult::InvalidArgument, |engine_handle| {
            engine_handle.engine.unregister_callback();
            ShmResult::Ok
        })
    })
}

/// Stop the poll thread and wait for its current iteration.
///
/// # Safety
/// `handle` must be a valid engine handle.
#[no_mangle]
pub unsafe extern "C" fn shmframe_engine_shutdown(handle: ShmEngineHandle) -> ShmResult {
    crate::ffi_boundary(ShmResult::Internal, || {
        error::clear_error_state();
        with_engine(handle, ShmResult::InvalidArgument, |engine_handle| {
            match engine_handle.engine.shutdown() {
                Ok(()) => ShmResult::Ok,
                Err(err) => error::map_engine_error(&err),
            }
        })
    })
}

/// Destroy the engine, shutting the poller down first if needed.
///
/// # Safety
/// `handle` must be null or a valid handle returned by
/// `shmframe_engine_new`; it must not be used after this call.
#[no_mangle]
pub unsafe extern "C" fn shmframe_engine_free(handle: ShmEngineHandle) {
    crate::ffi_boundary((), || {
        if handle.is_null() {
            return;
        }
        // SAFETY: The handle was created by Box::into_raw in
        // `shmframe_engine_new` and ownership returns here exactly once.
        let handle = unsafe { Box::from_raw(handle as *mut EngineHandle) };
        drop(handle);
    });
}
