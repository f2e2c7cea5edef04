use shmframe_codec::SLOT_SIZE;
use tracing::debug;

use crate::error::{ChannelError, Result};

/// Derive the deterministic segment name for a channel id.
///
/// The name must match what the producer uses; on Linux the object shows up
/// as `/dev/shm/ChannelFrame_<id>`.
pub fn segment_name(channel_id: u32) -> String {
    format!("ChannelFrame_{channel_id}")
}

/// A mapped shared-memory segment sized exactly to the frame slot layout.
///
/// The segment exclusively owns its mapping; the view is released when the
/// segment is dropped, regardless of producer activity. Unlinking the
/// backing object is a separate, explicit step ([`Segment::unlink`]) because
/// attached peers keep their mappings alive after an unlink.
pub struct Segment {
    name: String,
    inner: SegmentInner,
}

enum SegmentInner {
    #[cfg(unix)]
    Unix(memmap2::MmapMut),
    #[cfg(windows)]
    Windows(windows_map::MappedView),
}

impl Segment {
    /// Map an existing segment.
    ///
    /// Returns [`ChannelError::NotYetAvailable`] if no object with this name
    /// exists, and [`ChannelError::SizeMismatch`] if one exists with the
    /// wrong size.
    pub fn attach(name: &str) -> Result<Self> {
        let inner = platform_attach(name)?;
        debug!(name, "attached shared memory segment");
        Ok(Self {
            name: name.to_string(),
            inner,
        })
    }

    /// Create (or open) a segment and size it to the slot layout.
    ///
    /// Producer-side counterpart of [`Segment::attach`].
    pub fn create(name: &str) -> Result<Self> {
        let inner = platform_create(name)?;
        debug!(name, "created shared memory segment");
        Ok(Self {
            name: name.to_string(),
            inner,
        })
    }

    /// Remove the named backing object.
    ///
    /// Existing mappings stay valid; the name becomes free for re-creation.
    /// On Windows named mappings vanish with their last handle, so this is a
    /// no-op there.
    pub fn unlink(name: &str) -> std::io::Result<()> {
        platform_unlink(name)
    }

    /// The segment name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The mapped slot bytes.
    pub fn as_slice(&self) -> &[u8] {
        match &self.inner {
            #[cfg(unix)]
            SegmentInner::Unix(map) => &map[..],
            #[cfg(windows)]
            SegmentInner::Windows(view) => view.as_slice(),
        }
    }

    /// The mapped slot bytes, writable.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        match &mut self.inner {
            #[cfg(unix)]
            SegmentInner::Unix(map) => &mut map[..],
            #[cfg(windows)]
            SegmentInner::Windows(view) => view.as_mut_slice(),
        }
    }
}

impl std::fmt::Debug for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Segment")
            .field("name", &self.name)
            .field("len", &self.as_slice().len())
            .finish()
    }
}

#[cfg(unix)]
fn platform_attach(name: &str) -> Result<SegmentInner> {
    let file = unix_shm::open(name, false)?;

    let len = file
        .metadata()
        .map_err(|source| ChannelError::Map {
            name: name.to_string(),
            source,
        })?
        .len() as usize;
    if len != SLOT_SIZE {
        return Err(ChannelError::SizeMismatch {
            name: name.to_string(),
            actual: len,
            expected: SLOT_SIZE,
        });
    }

    // SAFETY: The object is sized above and stays alive for the lifetime of
    // the mapping; concurrent producer writes are mediated by the status
    // handoff, not by the mapping itself.
    let map = unsafe { memmap2::MmapMut::map_mut(&file) }.map_err(|source| ChannelError::Map {
        name: name.to_string(),
        source,
    })?;
    Ok(SegmentInner::Unix(map))
}

#[cfg(unix)]
fn platform_create(name: &str) -> Result<SegmentInner> {
    let file = unix_shm::open(name, true)?;
    file.set_len(SLOT_SIZE as u64)
        .map_err(|source| ChannelError::Create {
            name: name.to_string(),
            source,
        })?;

    // SAFETY: Sized above; see `platform_attach`.
    let map = unsafe { memmap2::MmapMut::map_mut(&file) }.map_err(|source| ChannelError::Map {
        name: name.to_string(),
        source,
    })?;
    Ok(SegmentInner::Unix(map))
}

#[cfg(unix)]
fn platform_unlink(name: &str) -> std::io::Result<()> {
    unix_shm::unlink(name)
}

#[cfg(unix)]
mod unix_shm {
    use std::ffi::CString;
    use std::fs::File;
    use std::io;
    use std::os::fd::FromRawFd;

    use crate::error::{ChannelError, Result};

    fn object_path(name: &str) -> io::Result<CString> {
        // POSIX shm object names carry a single leading slash.
        CString::new(format!("/{name}"))
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "name contains NUL"))
    }

    pub fn open(name: &str, create: bool) -> Result<File> {
        let path = object_path(name).map_err(|source| ChannelError::Map {
            name: name.to_string(),
            source,
        })?;

        let mut flags = libc::O_RDWR;
        if create {
            flags |= libc::O_CREAT;
        }
        // SAFETY: `path` is a valid NUL-terminated string for the duration
        // of the call.
        let fd = unsafe { libc::shm_open(path.as_ptr(), flags, 0o600 as libc::c_uint) };
        if fd < 0 {
            let source = io::Error::last_os_error();
            if !create && source.kind() == io::ErrorKind::NotFound {
                return Err(ChannelError::NotYetAvailable {
                    name: name.to_string(),
                });
            }
            let name = name.to_string();
            return Err(if create {
                ChannelError::Create { name, source }
            } else {
                ChannelError::Map { name, source }
            });
        }

        // SAFETY: `fd` is a freshly opened descriptor we own.
        Ok(unsafe { File::from_raw_fd(fd) })
    }

    pub fn unlink(name: &str) -> io::Result<()> {
        let path = object_path(name)?;
        // SAFETY: `path` is a valid NUL-terminated string.
        let rc = unsafe { libc::shm_unlink(path.as_ptr()) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

#[cfg(windows)]
fn platform_attach(name: &str) -> Result<SegmentInner> {
    windows_map::MappedView::open(name, false).map(SegmentInner::Windows)
}

#[cfg(windows)]
fn platform_create(name: &str) -> Result<SegmentInner> {
    windows_map::MappedView::open(name, true).map(SegmentInner::Windows)
}

#[cfg(windows)]
fn platform_unlink(_name: &str) -> std::io::Result<()> {
    Ok(())
}

#[cfg(windows)]
mod windows_map {
    use std::ffi::CString;
    use std::io;

    use shmframe_codec::SLOT_SIZE;
    use windows_sys::Win32::Foundation::{
        CloseHandle, ERROR_FILE_NOT_FOUND, HANDLE, INVALID_HANDLE_VALUE,
    };
    use windows_sys::Win32::System::Memory::{
        CreateFileMappingA, MapViewOfFile, OpenFileMappingA, UnmapViewOfFile,
        FILE_MAP_ALL_ACCESS, MEMORY_MAPPED_VIEW_ADDRESS, PAGE_READWRITE,
    };

    use crate::error::{ChannelError, Result};

    pub struct MappedView {
        handle: HANDLE,
        view: MEMORY_MAPPED_VIEW_ADDRESS,
    }

    // SAFETY: The view is an owned process-wide mapping; the raw pointers
    // are not tied to the creating thread.
    unsafe impl Send for MappedView {}

    impl MappedView {
        pub fn open(name: &str, create: bool) -> Result<Self> {
            let cname = CString::new(name).map_err(|_| ChannelError::Map {
                name: name.to_string(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "name contains NUL"),
            })?;

            // SAFETY: `cname` outlives the calls; a null mapping handle is
            // checked before use.
            let handle = unsafe {
                if create {
                    CreateFileMappingA(
                        INVALID_HANDLE_VALUE,
                        std::ptr::null(),
                        PAGE_READWRITE,
                        0,
                        SLOT_SIZE as u32,
                        cname.as_ptr().cast(),
                    )
                } else {
                    OpenFileMappingA(FILE_MAP_ALL_ACCESS, 0, cname.as_ptr().cast())
                }
            };
            if handle.is_null() {
                let source = io::Error::last_os_error();
                if !create && source.raw_os_error() == Some(ERROR_FILE_NOT_FOUND as i32) {
                    return Err(ChannelError::NotYetAvailable {
                        name: name.to_string(),
                    });
                }
                let name = name.to_string();
                return Err(if create {
                    ChannelError::Create { name, source }
                } else {
                    ChannelError::Map { name, source }
                });
            }

            // SAFETY: `handle` is a valid mapping handle; the requested view
            // length equals the mapping size.
            let view = unsafe { MapViewOfFile(handle, FILE_MAP_ALL_ACCESS, 0, 0, SLOT_SIZE) };
            if view.Value.is_null() {
                let source = io::Error::last_os_error();
                // SAFETY: `handle` is the mapping handle opened above.
                unsafe { CloseHandle(handle) };
                return Err(ChannelError::Map {
                    name: name.to_string(),
                    source,
                });
            }

            Ok(Self { handle, view })
        }

        pub fn as_slice(&self) -> &[u8] {
            // SAFETY: The view spans SLOT_SIZE readable bytes while `self`
            // is alive.
            unsafe { std::slice::from_raw_parts(self.view.Value.cast(), SLOT_SIZE) }
        }

        pub fn as_mut_slice(&mut self) -> &mut [u8] {
            // SAFETY: The view spans SLOT_SIZE writable bytes while `self`
            // is alive, and `&mut self` guarantees local exclusivity.
            unsafe { std::slice::from_raw_parts_mut(self.view.Value.cast(), SLOT_SIZE) }
        }
    }

    impl Drop for MappedView {
        fn drop(&mut self) {
            // SAFETY: `view` and `handle` were obtained from the mapping
            // calls above and are released exactly once.
            unsafe {
                UnmapViewOfFile(self.view);
                CloseHandle(self.handle);
            }
        }
    }
}
