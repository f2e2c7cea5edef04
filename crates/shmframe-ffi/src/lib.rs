//! shmframe-ffi: C-ABI exports for the shmframe engine.
//!
//! The legacy surface this replaces was a DLL with global state; here every
//! export operates on an opaque engine handle and panics never cross the
//! boundary.

mod engine;
mod error;
mod types;

use std::panic::AssertUnwindSafe;

pub use engine::{
    shmframe_engine_apply_settings, shmframe_engine_free, shmframe_engine_initialize,
    shmframe_engine_new, shmframe_engine_register_callback, shmframe_engine_shutdown,
    shmframe_engine_unregister_callback,
};
pub use types::{
    FrameCallback, ShmEngineHandle, ShmResult, ShmRoi, ShmSettingParameters,
    SHM_ERR_ALREADY_STARTED, SHM_ERR_INTERNAL, SHM_ERR_INVALID_ARGUMENT,
    SHM_ERR_SETTINGS_INVALID, SHM_ERR_SHUTDOWN_FAILED, SHM_OK,
};

fn ffi_boundary<T>(on_panic: T, f: impl FnOnce() -> T) -> T {
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            error::set_panic_error();
            on_panic
        }
    }
}

#[no_mangle]
pub extern "C" fn shmframe_last_error() -> *const std::os::raw::c_char {
    ffi_boundary(std::ptr::null(), error::last_error_ptr)
}

#[cfg(test)]
mod tests {
    use std::ffi::CStr;

    use super::*;

    #[test]
    fn last_error_returns_non_null_pointer() {
        let ptr = shmframe_last_error();
        assert!(!ptr.is_null());

        // SAFETY: shmframe_last_error returns a pointer to a thread-local
        // CString.
        let text = unsafe { CStr::from_ptr(ptr).to_str().unwrap() };
        assert!(text.is_empty());
    }

    #[test]
    fn null_handle_is_invalid_argument() {
        let null = std::ptr::null_mut();
        // SAFETY: Null handles are explicitly supported and rejected.
        unsafe {
            assert_eq!(
                shmframe_engine_initialize(null, 1),
                ShmResult::InvalidArgument
            );
            assert_eq!(
                shmframe_engine_unregister_callback(null),
                ShmResult::InvalidArgument
            );
            assert_eq!(shmframe_engine_shutdown(null), ShmResult::InvalidArgument);
            shmframe_engine_free(null);
        }

        // SAFETY: Pointer comes from shmframe_last_error.
        let text = unsafe { CStr::from_ptr(shmframe_last_error()).to_str().unwrap() };
        assert!(text.contains("handle"));
    }

    #[test]
    fn null_parameters_are_invalid_argument() {
        let handle = shmframe_engine_new();
        assert!(!handle.is_null());

        // SAFETY: `handle` is valid and `parameters` null is rejected.
        unsafe {
            assert_eq!(
                shmframe_engine_apply_settings(handle, std::ptr::null()),
                ShmResult::InvalidArgument
            );
            shmframe_engine_free(handle);
        }
    }

    #[test]
    fn engine_lifecycle_through_the_boundary() {
        let handle = shmframe_engine_new();
        assert!(!handle.is_null());

        // SAFETY: `handle` is valid for all calls until freed.
        unsafe {
            assert_eq!(
                shmframe_engine_initialize(handle, u32::MAX - 7),
                ShmResult::Ok
            );
            assert_eq!(
                shmframe_engine_initialize(handle, u32::MAX - 7),
                ShmResult::AlreadyStarted
            );
            assert_eq!(shmframe_engine_shutdown(handle), ShmResult::Ok);
            assert_eq!(shmframe_engine_shutdown(handle), ShmResult::Ok);
            shmframe_engine_free(handle);
        }
    }

    #[test]
    fn register_accepts_null_as_unregister() {
        unsafe extern "C" fn noop(
            _channel_id: u32,
            _width: i32,
            _height: i32,
            _data: *const u8,
            _size: i32,
            _timestamp: u64,
            _rois: *const ShmRoi,
            _roi_count: i32,
            _node_count: i32,
        ) {
        }

        let handle = shmframe_engine_new();
        // SAFETY: `handle` is valid; `noop` stays callable for the test.
        unsafe {
            assert_eq!(
                shmframe_engine_register_callback(handle, Some(noop)),
                ShmResult::Ok
            );
            assert_eq!(
                shmframe_engine_register_callback(handle, None),
                ShmResult::Ok
            );
            shmframe_engine_free(handle);
        }
    }
}
