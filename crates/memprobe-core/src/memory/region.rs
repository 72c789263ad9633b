use std::fs::{File, OpenOptions};
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::ptr::null_mut;

use libc::{MAP_FAILED, MAP_SHARED, PROT_READ, PROT_WRITE};
use log::{debug, trace, warn};
use serde::Serialize;
use thiserror::Error;

use super::{PhysAddr, WordPointer};
use crate::util::{WORD_SIZE, page_size};

/// Errors that can occur while acquiring a mapped region.
#[derive(Debug, Error)]
pub enum RegionError {
    /// The backing file or device could not be opened
    #[error("open {path:?} failed: {source}")]
    Open {
        /// Path of the backing store
        path: PathBuf,
        /// Underlying OS error
        source: std::io::Error,
    },
    /// The backing file could not be resized
    #[error("ftruncate {path:?} to {size} bytes failed: {source}")]
    Resize {
        /// Path of the backing file
        path: PathBuf,
        /// Requested file size
        size: u64,
        /// Underlying OS error
        source: std::io::Error,
    },
    /// The mmap call failed
    #[error("mmap of {len} bytes at {addr:?} failed: {source}")]
    Map {
        /// Target address or file offset
        addr: PhysAddr,
        /// Length of the attempted mapping
        len: usize,
        /// Underlying OS error
        source: std::io::Error,
    },
    /// A zero-length mapping was requested
    #[error("cannot map an empty region")]
    EmptyRegion,
    /// The target address cannot hold 64-bit words
    #[error("target address {0:?} is not 8-byte aligned")]
    Misaligned(PhysAddr),
    /// The range ends beyond the largest representable file offset
    #[error("{len} bytes at {addr:?} exceed the file offset range")]
    OutOfRange {
        /// Target address or file offset
        addr: PhysAddr,
        /// Requested length
        len: usize,
    },
}

/// Returns the end of `len` bytes at `target` as a file offset.
fn checked_end(target: PhysAddr, len: usize) -> Result<libc::off_t, RegionError> {
    target
        .as_usize()
        .checked_add(len)
        .and_then(|end| libc::off_t::try_from(end).ok())
        .ok_or(RegionError::OutOfRange { addr: target, len })
}

/// The store that provides the pages of a [`MappedRegion`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Backing {
    /// A privileged physical-memory device such as `/dev/mem`
    Device {
        /// Device node path
        path: PathBuf,
    },
    /// A regular file simulating shared or physical memory
    File {
        /// Backing file path
        path: PathBuf,
    },
}

impl Backing {
    /// Returns the path of the backing store.
    pub fn path(&self) -> &Path {
        match self {
            Backing::Device { path } | Backing::File { path } => path,
        }
    }

    /// Returns true if the region is backed by a device.
    pub fn is_device(&self) -> bool {
        matches!(self, Backing::Device { .. })
    }
}

/// Removes a file when dropped.
struct TempFile(PathBuf);

impl Drop for TempFile {
    fn drop(&mut self) {
        trace!("remove {:?}", self.0);
        if let Err(e) = std::fs::remove_file(&self.0) {
            warn!("Failed to remove {:?}: {}", self.0, e);
        }
    }
}

/// A shared read/write mapping of a file or device.
///
/// The mapping is page aligned internally. The usable part starts at the
/// requested target, which may lie anywhere inside the first page. Dropping the
/// region unmaps it, closes the descriptor and, for file-backed regions,
/// deletes the backing file.
pub struct MappedRegion {
    base: *mut u8,
    map_len: usize,
    offset: usize,
    len: usize,
    target: PhysAddr,
    backing: Backing,
    // field order: the descriptor is closed before the file is removed
    _file: File,
    _temp: Option<TempFile>,
}

impl MappedRegion {
    /// Maps `len` bytes of a physical-memory device starting at `phys_addr`.
    ///
    /// The device is opened with `O_RDWR | O_SYNC`.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError::Open`] if the device cannot be opened and
    /// [`RegionError::Map`] if the range cannot be mapped. The descriptor is
    /// closed in both cases.
    pub fn open_device(
        path: impl AsRef<Path>,
        phys_addr: PhysAddr,
        len: usize,
    ) -> Result<Self, RegionError> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open(path)
            .map_err(|source| RegionError::Open {
                path: path.to_owned(),
                source,
            })?;
        debug!("opened device {:?}", path);
        Self::map(
            file,
            phys_addr,
            len,
            Backing::Device {
                path: path.to_owned(),
            },
            None,
        )
    }

    /// Creates (or reuses) a temporary file and maps `len` bytes at `offset`.
    ///
    /// The file is grown to `offset + len` bytes so that the mapped range lies
    /// inside it. The file is removed when the region is dropped, or right away
    /// if any step fails.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError::OutOfRange`] before touching the file if
    /// `offset + len` is not a valid file size, otherwise
    /// [`RegionError::Open`], [`RegionError::Resize`] or
    /// [`RegionError::Map`] for the step that failed.
    pub fn temp_file(
        path: impl AsRef<Path>,
        offset: PhysAddr,
        len: usize,
    ) -> Result<Self, RegionError> {
        let path = path.as_ref();
        if len == 0 {
            return Err(RegionError::EmptyRegion);
        }
        // off_t is non-negative here, so the cast is lossless
        let size = checked_end(offset, len)? as u64;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .mode(0o666)
            .open(path)
            .map_err(|source| RegionError::Open {
                path: path.to_owned(),
                source,
            })?;
        let temp = TempFile(path.to_owned());

        file.set_len(size).map_err(|source| RegionError::Resize {
            path: path.to_owned(),
            size,
            source,
        })?;
        debug!("backing file {:?} sized to {} bytes", path, size);

        Self::map(
            file,
            offset,
            len,
            Backing::File {
                path: path.to_owned(),
            },
            Some(temp),
        )
    }

    fn map(
        file: File,
        target: PhysAddr,
        len: usize,
        backing: Backing,
        temp: Option<TempFile>,
    ) -> Result<Self, RegionError> {
        if len == 0 {
            return Err(RegionError::EmptyRegion);
        }
        if !target.as_usize().is_multiple_of(WORD_SIZE) {
            return Err(RegionError::Misaligned(target));
        }
        // the aligned start and the mapped length both lie below the checked end
        checked_end(target, len)?;
        let page = page_size();
        let aligned = target.align_down(page);
        let offset = target.page_offset(page);
        let map_len = len + offset;
        let file_offset = libc::off_t::try_from(aligned.as_usize())
            .map_err(|_| RegionError::OutOfRange { addr: target, len })?;

        let base = unsafe {
            libc::mmap(
                null_mut(),
                map_len,
                PROT_READ | PROT_WRITE,
                MAP_SHARED,
                file.as_raw_fd(),
                file_offset,
            )
        };
        if base == MAP_FAILED {
            return Err(RegionError::Map {
                addr: aligned,
                len: map_len,
                source: std::io::Error::last_os_error(),
            });
        }
        debug!(
            "mapped {} bytes of {:?} at aligned address {:p} to {:p}",
            map_len,
            backing.path(),
            aligned,
            base
        );

        Ok(MappedRegion {
            base: base as *mut u8,
            map_len,
            offset,
            len,
            target,
            backing,
            _file: file,
            _temp: temp,
        })
    }

    /// Returns the store backing this region.
    pub fn backing(&self) -> &Backing {
        &self.backing
    }

    /// Returns the physical address (or file offset) of the first usable byte.
    pub fn target(&self) -> PhysAddr {
        self.target
    }

    /// Returns the distance between the page-aligned mapping and the target.
    pub fn page_offset(&self) -> usize {
        self.offset
    }

    /// Sets every byte of the usable range to zero.
    pub fn zero(&self) {
        unsafe { std::ptr::write_bytes(self.ptr() as *mut u8, 0, self.len) };
    }
}

impl WordPointer for MappedRegion {
    fn ptr(&self) -> *mut u64 {
        unsafe { self.base.byte_add(self.offset) as *mut u64 }
    }

    fn len(&self) -> usize {
        self.len
    }
}

impl Drop for MappedRegion {
    fn drop(&mut self) {
        // unmap from the aligned base, not from the adjusted target pointer
        let r = unsafe { libc::munmap(self.base as *mut libc::c_void, self.map_len) };
        if r != 0 {
            warn!(
                "munmap({:p}, {}) failed: {}",
                self.base,
                self.map_len,
                std::io::Error::last_os_error()
            );
        } else {
            trace!("unmapped {} bytes at {:p}", self.map_len, self.base);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Backing, MappedRegion, RegionError};
    use crate::memory::{PhysAddr, WordPointer};
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("memprobe-region-{}-{}", name, std::process::id()))
    }

    #[test]
    fn test_temp_file_removed_on_drop() -> anyhow::Result<()> {
        let path = temp_path("drop");
        let region = MappedRegion::temp_file(&path, PhysAddr::new(0), 1024)?;
        assert!(path.exists());
        assert_eq!(region.len(), 1024);
        assert_eq!(region.words(), 128);
        assert_eq!(region.backing(), &Backing::File { path: path.clone() });
        drop(region);
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn test_temp_file_sized_past_offset() -> anyhow::Result<()> {
        let path = temp_path("offset");
        let region = MappedRegion::temp_file(&path, PhysAddr::new(0x10000), 4096)?;
        assert_eq!(std::fs::metadata(&path)?.len(), 0x10000 + 4096);
        assert_eq!(region.page_offset(), 0);
        Ok(())
    }

    #[test]
    fn test_unaligned_target_is_adjusted() -> anyhow::Result<()> {
        let path = temp_path("unaligned");
        let region = MappedRegion::temp_file(&path, PhysAddr::new(0x10010), 64)?;
        assert_eq!(region.page_offset(), 0x10);
        assert_eq!(region.target(), PhysAddr::new(0x10010));
        region.write_word(0, 0x1122_3344_5566_7788);
        assert_eq!(region.read_word(0), 0x1122_3344_5566_7788);
        Ok(())
    }

    #[test]
    fn test_writes_reach_backing_file() -> anyhow::Result<()> {
        let path = temp_path("backing");
        let region = MappedRegion::temp_file(&path, PhysAddr::new(0), 4096)?;
        region.write_word(1, u64::from_ne_bytes(*b"memprobe"));
        let contents = std::fs::read(&path)?;
        assert_eq!(&contents[8..16], b"memprobe");
        Ok(())
    }

    #[test]
    fn test_zero() -> anyhow::Result<()> {
        let path = temp_path("zero");
        let region = MappedRegion::temp_file(&path, PhysAddr::new(0), 256)?;
        for slot in 0..region.words() {
            region.write_word(slot, u64::MAX);
        }
        region.zero();
        assert!((0..region.words()).all(|slot| region.read_word(slot) == 0));
        Ok(())
    }

    #[test]
    fn test_empty_region_rejected() {
        let path = temp_path("empty");
        let err = MappedRegion::temp_file(&path, PhysAddr::new(0), 0).err();
        assert!(matches!(err, Some(RegionError::EmptyRegion)));
        assert!(!path.exists());
    }

    #[test]
    fn test_misaligned_target_rejected() {
        let path = temp_path("misaligned");
        let err = MappedRegion::temp_file(&path, PhysAddr::new(0x1003), 64).err();
        assert!(matches!(err, Some(RegionError::Misaligned(_))));
        assert!(!path.exists(), "backing file must be removed on failure");
    }

    #[test]
    fn test_range_past_address_space_rejected() {
        let path = temp_path("overflow");
        let err = MappedRegion::temp_file(&path, PhysAddr::new(0xFFFF_FFFF_FFFF_F000), 4096).err();
        assert!(matches!(err, Some(RegionError::OutOfRange { .. })));
        assert!(!path.exists());
    }

    #[test]
    fn test_range_past_file_offsets_rejected() {
        let path = temp_path("offset-range");
        let err = MappedRegion::temp_file(&path, PhysAddr::new(0x8000_0000_0000_0000), 4096).err();
        assert!(matches!(err, Some(RegionError::OutOfRange { .. })));
        assert!(!path.exists());

        let err =
            MappedRegion::open_device("/dev/null", PhysAddr::new(0xFFFF_FFFF_FFFF_F000), 4096).err();
        assert!(matches!(err, Some(RegionError::OutOfRange { .. })));
    }

    #[test]
    fn test_resize_failure_removes_file() -> anyhow::Result<()> {
        use std::os::unix::ffi::OsStrExt;

        // a FIFO opens read/write but cannot be truncated
        let path = temp_path("fifo");
        let c_path = std::ffi::CString::new(path.as_os_str().as_bytes())?;
        assert_eq!(unsafe { libc::mkfifo(c_path.as_ptr(), 0o600) }, 0);
        let err = MappedRegion::temp_file(&path, PhysAddr::new(0), 4096).err();
        assert!(matches!(err, Some(RegionError::Resize { size: 4096, .. })));
        assert!(!path.exists(), "backing file must be removed on failure");
        Ok(())
    }

    #[test]
    fn test_missing_device() {
        let err = MappedRegion::open_device("/nonexistent/mem", PhysAddr::new(0), 4096).err();
        assert!(matches!(err, Some(RegionError::Open { .. })));
    }

    #[test]
    fn test_unmappable_device() {
        // /dev/null opens fine but refuses mmap
        let err = MappedRegion::open_device("/dev/null", PhysAddr::new(0), 4096).err();
        assert!(matches!(err, Some(RegionError::Map { .. })));
    }
}
