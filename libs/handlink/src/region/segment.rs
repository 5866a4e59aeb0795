// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! POSIX named shared-memory segments.

use std::ffi::{CString, c_void};
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::ptr::{self, NonNull};

use crate::core::{HandlinkError, Result};

/// Mapping mode of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    ReadWrite,
}

impl Access {
    fn open_flags(self) -> libc::c_int {
        match self {
            Access::ReadOnly => libc::O_RDONLY,
            Access::ReadWrite => libc::O_RDWR,
        }
    }

    fn protection(self) -> libc::c_int {
        match self {
            Access::ReadOnly => libc::PROT_READ,
            Access::ReadWrite => libc::PROT_READ | libc::PROT_WRITE,
        }
    }
}

/// Object name as `shm_open` wants it: one leading slash, no others.
fn shm_name(name: &str) -> Result<CString> {
    let bare = name.strip_prefix('/').unwrap_or(name);
    if bare.is_empty() || bare.contains('/') {
        return Err(HandlinkError::RegionAccess(format!(
            "invalid segment name '{}'",
            name
        )));
    }
    CString::new(format!("/{}", bare))
        .map_err(|_| HandlinkError::RegionAccess(format!("segment name '{}' contains NUL", name)))
}

fn map(fd: &OwnedFd, len: usize, access: Access) -> Result<NonNull<u8>> {
    unsafe {
        let addr = libc::mmap(
            ptr::null_mut(),
            len,
            access.protection(),
            libc::MAP_SHARED,
            fd.as_raw_fd(),
            0,
        );
        if addr == libc::MAP_FAILED {
            return Err(HandlinkError::Io(io::Error::last_os_error()));
        }
        NonNull::new(addr as *mut u8)
            .ok_or_else(|| HandlinkError::RegionAccess("mmap returned null".to_string()))
    }
}

/// A mapped named segment.
///
/// The creating side owns the name and unlinks it on drop; the opening side
/// only unmaps.
pub struct SharedSegment {
    name: String,
    ptr: NonNull<u8>,
    len: usize,
    access: Access,
    owner: bool,
}

// The mapping is plain memory; mutable access goes through `&mut self`.
unsafe impl Send for SharedSegment {}
unsafe impl Sync for SharedSegment {}

impl SharedSegment {
    /// Create, size, map and zero-fill a new segment.
    ///
    /// Fails with [`HandlinkError::SegmentAlreadyExists`] if the name is
    /// taken. A failure after the name was created unlinks it again.
    pub fn create(name: &str, len: usize) -> Result<Self> {
        if len == 0 {
            return Err(HandlinkError::RegionAccess(format!(
                "segment '{}' cannot have zero length",
                name
            )));
        }
        let c_name = shm_name(name)?;
        let size = libc::off_t::try_from(len).map_err(|_| {
            HandlinkError::RegionAccess(format!("segment length {} too large", len))
        })?;

        let raw = unsafe {
            libc::shm_open(
                c_name.as_ptr(),
                libc::O_CREAT | libc::O_EXCL | libc::O_RDWR,
                0o600 as libc::mode_t,
            )
        };
        if raw < 0 {
            let err = io::Error::last_os_error();
            return Err(match err.raw_os_error() {
                Some(libc::EEXIST) => HandlinkError::SegmentAlreadyExists(name.to_string()),
                _ => HandlinkError::Io(err),
            });
        }
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };

        let mapped = if unsafe { libc::ftruncate(fd.as_raw_fd(), size) } != 0 {
            Err(HandlinkError::Io(io::Error::last_os_error()))
        } else {
            map(&fd, len, Access::ReadWrite)
        };
        let ptr = match mapped {
            Ok(ptr) => ptr,
            Err(e) => {
                unsafe { libc::shm_unlink(c_name.as_ptr()) };
                return Err(e);
            }
        };

        unsafe { ptr::write_bytes(ptr.as_ptr(), 0, len) };
        tracing::info!("Created shared segment '{}' ({} bytes)", name, len);

        Ok(Self {
            name: name.to_string(),
            ptr,
            len,
            access: Access::ReadWrite,
            owner: true,
        })
    }

    /// Map an existing segment at its full size.
    pub fn open(name: &str, access: Access) -> Result<Self> {
        let c_name = shm_name(name)?;
        let raw = unsafe { libc::shm_open(c_name.as_ptr(), access.open_flags(), 0) };
        if raw < 0 {
            let err = io::Error::last_os_error();
            return Err(match err.raw_os_error() {
                Some(libc::ENOENT) => HandlinkError::SegmentNotFound(name.to_string()),
                _ => HandlinkError::Io(err),
            });
        }
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };

        let mut stat: libc::stat = unsafe { std::mem::zeroed() };
        if unsafe { libc::fstat(fd.as_raw_fd(), &mut stat) } != 0 {
            return Err(HandlinkError::Io(io::Error::last_os_error()));
        }
        let len = usize::try_from(stat.st_size).unwrap_or(0);
        if len == 0 {
            return Err(HandlinkError::RegionAccess(format!(
                "segment '{}' is empty",
                name
            )));
        }

        let ptr = map(&fd, len, access)?;
        tracing::info!("Opened shared segment '{}' ({} bytes, {:?})", name, len, access);

        Ok(Self {
            name: name.to_string(),
            ptr,
            len,
            access,
            owner: false,
        })
    }

    /// Unlink `name`. Returns whether a segment was removed; a missing
    /// segment is not an error.
    pub fn remove(name: &str) -> Result<bool> {
        let c_name = shm_name(name)?;
        if unsafe { libc::shm_unlink(c_name.as_ptr()) } == 0 {
            tracing::debug!("Removed shared segment '{}'", name);
            return Ok(true);
        }
        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(libc::ENOENT) => Ok(false),
            _ => Err(HandlinkError::Io(err)),
        }
    }

    /// Whether a segment named `name` currently exists.
    pub fn exists(name: &str) -> bool {
        let Ok(c_name) = shm_name(name) else {
            return false;
        };
        let raw = unsafe { libc::shm_open(c_name.as_ptr(), libc::O_RDONLY, 0) };
        if raw < 0 {
            return false;
        }
        drop(unsafe { OwnedFd::from_raw_fd(raw) });
        true
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn is_owner(&self) -> bool {
        self.owner
    }

    pub fn as_slice(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// Fails with [`HandlinkError::RegionAccess`] on a read-only mapping.
    pub fn as_mut_slice(&mut self) -> Result<&mut [u8]> {
        if self.access != Access::ReadWrite {
            return Err(HandlinkError::RegionAccess(format!(
                "segment '{}' is mapped read-only",
                self.name
            )));
        }
        Ok(unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) })
    }
}

impl Drop for SharedSegment {
    fn drop(&mut self) {
        let result = unsafe { libc::munmap(self.ptr.as_ptr() as *mut c_void, self.len) };
        if result != 0 {
            tracing::warn!(
                "Failed to unmap shared segment '{}': {}",
                self.name,
                io::Error::last_os_error()
            );
        }
        if self.owner {
            if let Err(e) = Self::remove(&self.name) {
                tracing::warn!("Failed to remove shared segment '{}': {}", self.name, e);
            }
        }
    }
}

impl std::fmt::Debug for SharedSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSegment")
            .field("name", &self.name)
            .field("len", &self.len)
            .field("access", &self.access)
            .field("owner", &self.owner)
            .finish()
    }
}

/// Removes a segment name when constructed and again when dropped.
///
/// Construction clears a stale segment left by a crashed run; the drop
/// covers every exit path of the producer, error returns included.
#[derive(Debug)]
pub struct SegmentRemover {
    name: String,
}

impl SegmentRemover {
    pub fn new(name: &str) -> Self {
        match SharedSegment::remove(name) {
            Ok(true) => tracing::warn!("Removed stale shared segment '{}'", name),
            Ok(false) => {}
            Err(e) => tracing::warn!("Could not clear shared segment '{}': {}", name, e),
        }
        Self {
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for SegmentRemover {
    fn drop(&mut self) {
        if let Err(e) = SharedSegment::remove(&self.name) {
            tracing::warn!("Could not remove shared segment '{}': {}", self.name, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique(tag: &str) -> String {
        format!("handlink-seg-{}-{}", tag, std::process::id())
    }

    #[test]
    fn test_name_normalization() {
        assert_eq!(shm_name("abc").unwrap().to_str().unwrap(), "/abc");
        assert_eq!(shm_name("/abc").unwrap().to_str().unwrap(), "/abc");
        assert!(shm_name("").is_err());
        assert!(shm_name("a/b").is_err());
    }

    #[test]
    fn test_create_is_zeroed_and_exclusive() {
        let name = unique("excl");
        let segment = SharedSegment::create(&name, 4096 + 7).unwrap();
        assert!(segment.as_slice().iter().all(|&b| b == 0));
        assert!(matches!(
            SharedSegment::create(&name, 16),
            Err(HandlinkError::SegmentAlreadyExists(_))
        ));
        drop(segment);
        assert!(!SharedSegment::exists(&name));
    }

    #[test]
    fn test_open_sees_writes() {
        let name = unique("share");
        let mut owner = SharedSegment::create(&name, 64).unwrap();
        owner.as_mut_slice().unwrap()[10] = 42;

        let reader = SharedSegment::open(&name, Access::ReadOnly).unwrap();
        assert_eq!(reader.len(), 64);
        assert_eq!(reader.as_slice()[10], 42);
        assert!(!reader.is_owner());
        drop(reader);
        assert!(SharedSegment::exists(&name));
    }

    #[test]
    fn test_read_only_rejects_writes() {
        let name = unique("ro");
        let _owner = SharedSegment::create(&name, 8).unwrap();
        let mut reader = SharedSegment::open(&name, Access::ReadOnly).unwrap();
        assert!(matches!(
            reader.as_mut_slice(),
            Err(HandlinkError::RegionAccess(_))
        ));
    }

    #[test]
    fn test_open_missing() {
        assert!(matches!(
            SharedSegment::open(&unique("missing"), Access::ReadWrite),
            Err(HandlinkError::SegmentNotFound(_))
        ));
    }

    #[test]
    fn test_zero_length_rejected() {
        assert!(SharedSegment::create(&unique("zero"), 0).is_err());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let name = unique("idem");
        let segment = SharedSegment::create(&name, 8).unwrap();
        std::mem::forget(segment);
        assert!(SharedSegment::remove(&name).unwrap());
        assert!(!SharedSegment::remove(&name).unwrap());
    }

    #[test]
    fn test_remover_clears_stale_segment() {
        let name = unique("stale");
        std::mem::forget(SharedSegment::create(&name, 8).unwrap());
        {
            let _remover = SegmentRemover::new(&name);
            assert!(!SharedSegment::exists(&name));
            std::mem::forget(SharedSegment::create(&name, 8).unwrap());
        }
        assert!(!SharedSegment::exists(&name));
    }
}
