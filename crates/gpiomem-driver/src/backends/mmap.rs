//! Memory-mapped register window
//!
//! Maps a device node (`/dev/gpiomem`, `/dev/mem`) or any regular file into
//! the process and hands out bounds-checked volatile register access. The
//! mapping lives exactly as long as the [`MmapBank`] and is released in
//! `Drop` on every exit path.

use crate::bank::{check_access, fenced, RegisterBank};
use crate::error::{GpioError, Result};
use rustix::fs::OFlags;
use rustix::mm::{mmap, msync, munmap, MapFlags, MsyncFlags, ProtFlags};
use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsFd;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

/// Memory-mapped register window
#[derive(Debug)]
pub struct MmapBank {
    ptr: NonNull<u8>,
    size: usize,
    _file: File,
    path: PathBuf,
    map_offset: u64,
}

impl MmapBank {
    /// Map `len` bytes of `path` starting at `map_offset`
    ///
    /// `sync` opens the node with `O_SYNC`, which `/dev/mem` needs for an
    /// uncached mapping.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The device node doesn't exist
    /// - The node cannot be opened read/write
    /// - `len` is zero or mmap fails
    pub fn open(path: impl AsRef<Path>, len: usize, map_offset: u64, sync: bool) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(GpioError::device_not_found(path));
        }
        if len == 0 {
            return Err(GpioError::map_failed(format!(
                "refusing zero-length mapping of {}",
                path.display()
            )));
        }

        tracing::debug!(
            "Mapping {} ({len:#x} bytes at {map_offset:#x}, sync={sync})",
            path.display()
        );

        let mut options = OpenOptions::new();
        options.read(true).write(true);
        if sync {
            // OFlags::SYNC.bits() is a small positive flag value
            #[allow(clippy::cast_possible_wrap)]
            options.custom_flags(OFlags::SYNC.bits() as i32);
        }
        let file = options.open(path)?;

        // SAFETY: mmap with a null hint never aliases an existing Rust object.
        // - fd was just opened read/write and is kept alive in `_file`
        // - len is non-zero (checked above)
        // - MAP_SHARED so register writes reach the device
        // - rustix reports failure as Err, which we propagate
        // - Drop unmaps with the same len
        let ptr = unsafe {
            mmap(
                std::ptr::null_mut(),
                len,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
                file.as_fd(),
                map_offset,
            )
        }
        .map_err(|e| GpioError::map_failed(format!("mmap {} failed: {e}", path.display())))?;

        let ptr = NonNull::new(ptr.cast::<u8>())
            .ok_or_else(|| GpioError::map_failed("mmap returned a null pointer"))?;

        tracing::info!("Mapped {} at {ptr:p} ({len:#x} bytes)", path.display());

        Ok(Self {
            ptr,
            size: len,
            _file: file,
            path: path.to_path_buf(),
            map_offset,
        })
    }

    /// Flush the mapping back to its file and drop cached pages
    ///
    /// Not needed for real I/O registers; file-backed windows use it to make
    /// writes visible to ordinary reads of the file.
    ///
    /// # Errors
    ///
    /// Returns error if msync fails.
    pub fn flush(&self) -> Result<()> {
        // SAFETY: ptr and size describe exactly the live mapping created in open()
        unsafe {
            msync(
                self.ptr.as_ptr().cast(),
                self.size,
                MsyncFlags::SYNC | MsyncFlags::INVALIDATE,
            )
        }
        .map_err(|e| GpioError::map_failed(format!("msync failed: {e}")))
    }

    /// Path of the mapped node
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Offset of the mapping within the node
    #[must_use]
    pub const fn map_offset(&self) -> u64 {
        self.map_offset
    }

    #[allow(clippy::cast_ptr_alignment)]
    fn register<T>(&self, offset: usize) -> *mut T {
        // SAFETY: callers run check_access first, so offset + size_of::<T>() <= size
        unsafe { self.ptr.as_ptr().add(offset).cast::<T>() }
    }
}

impl RegisterBank for MmapBank {
    fn len(&self) -> usize {
        self.size
    }

    fn read_u8(&self, offset: usize) -> Result<u8> {
        check_access(offset, 1, self.size)?;
        let reg = self.register::<u8>(offset);
        // SAFETY: in bounds (checked), byte aligned, mapping alive for &self
        let value = fenced(|| unsafe { reg.read_volatile() });
        tracing::trace!("read8 @ {offset:#x} = {value:#x}");
        Ok(value)
    }

    fn read_u16(&self, offset: usize) -> Result<u16> {
        check_access(offset, 2, self.size)?;
        let reg = self.register::<u16>(offset);
        // SAFETY: in bounds and 2-byte aligned (checked), mapping page aligned
        let value = fenced(|| unsafe { reg.read_volatile() });
        tracing::trace!("read16 @ {offset:#x} = {value:#x}");
        Ok(value)
    }

    fn read_u32(&self, offset: usize) -> Result<u32> {
        check_access(offset, 4, self.size)?;
        let reg = self.register::<u32>(offset);
        // SAFETY: in bounds and 4-byte aligned (checked), mapping page aligned
        let value = fenced(|| unsafe { reg.read_volatile() });
        tracing::trace!("read32 @ {offset:#x} = {value:#x}");
        Ok(value)
    }

    fn write_u8(&mut self, offset: usize, value: u8) -> Result<()> {
        check_access(offset, 1, self.size)?;
        tracing::trace!("write8 @ {offset:#x} = {value:#x}");
        let reg = self.register::<u8>(offset);
        // SAFETY: in bounds (checked), exclusive via &mut self
        fenced(|| unsafe { reg.write_volatile(value) });
        Ok(())
    }

    fn write_u16(&mut self, offset: usize, value: u16) -> Result<()> {
        check_access(offset, 2, self.size)?;
        tracing::trace!("write16 @ {offset:#x} = {value:#x}");
        let reg = self.register::<u16>(offset);
        // SAFETY: in bounds and aligned (checked), exclusive via &mut self
        fenced(|| unsafe { reg.write_volatile(value) });
        Ok(())
    }

    fn write_u32(&mut self, offset: usize, value: u32) -> Result<()> {
        check_access(offset, 4, self.size)?;
        tracing::trace!("write32 @ {offset:#x} = {value:#x}");
        let reg = self.register::<u32>(offset);
        // SAFETY: in bounds and aligned (checked), exclusive via &mut self
        fenced(|| unsafe { reg.write_volatile(value) });
        Ok(())
    }
}

impl Drop for MmapBank {
    fn drop(&mut self) {
        tracing::info!("Unmapping {} ({:#x} bytes)", self.path.display(), self.size);

        // SAFETY: ptr and size are exactly what mmap returned in open(); Drop
        // runs once and no borrow of the mapping can outlive self.
        unsafe {
            if let Err(e) = munmap(self.ptr.as_ptr().cast(), self.size) {
                tracing::error!("munmap failed during drop: {e}");
            }
        }
    }
}

// SAFETY: MmapBank owns its mapping exclusively. Moving it to another thread
// does not invalidate the mapping, which is process-wide.
unsafe impl Send for MmapBank {}

// SAFETY: shared access only performs bounds-checked volatile reads; every
// write needs &mut self, so the borrow checker serializes writers.
unsafe impl Sync for MmapBank {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn scratch(words: &[u32]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for w in words {
            file.write_all(&w.to_ne_bytes()).unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn missing_node_is_reported() {
        let err = MmapBank::open("/nonexistent/gpiomem", 0x100, 0, false).unwrap_err();
        assert!(matches!(err, GpioError::DeviceNotFound { .. }));
    }

    #[test]
    fn zero_length_is_rejected() {
        let file = scratch(&[0; 4]);
        let err = MmapBank::open(file.path(), 0, 0, false).unwrap_err();
        assert!(matches!(err, GpioError::MapFailed { .. }));
    }

    #[test]
    fn read_and_write_through_file() {
        let file = scratch(&[0x1234_5678, 0xDEAD_BEEF, 0, 0]);
        let mut bank = MmapBank::open(file.path(), 16, 0, false).unwrap();

        assert_eq!(bank.len(), 16);
        assert_eq!(bank.read_u32(0).unwrap(), 0x1234_5678);
        assert_eq!(bank.read_u32(4).unwrap(), 0xDEAD_BEEF);

        bank.write_u32(8, 0x0ABC_0DEF).unwrap();
        bank.write_u16(12, 0xABCD).unwrap();
        bank.write_u8(15, 0xCF).unwrap();
        bank.flush().unwrap();

        assert_eq!(bank.read_u32(8).unwrap(), 0x0ABC_0DEF);
        assert_eq!(bank.read_u16(12).unwrap(), 0xABCD);
        assert_eq!(bank.read_u8(15).unwrap(), 0xCF);

        let bytes = std::fs::read(file.path()).unwrap();
        assert_eq!(bytes[8..12], 0x0ABC_0DEF_u32.to_ne_bytes());
    }

    #[test]
    fn maps_window_at_offset() {
        // 64 KiB is page aligned for 4K and 16K pages alike
        let mut words = vec![0u32; 0x4000];
        words.extend([0x7E7E_0001, 0x7E7E_0002]);
        let file = scratch(&words);

        let bank = MmapBank::open(file.path(), 8, 0x1_0000, false).unwrap();
        assert_eq!(bank.map_offset(), 0x1_0000);
        assert_eq!(bank.path(), file.path());
        assert_eq!(bank.read_u32(0).unwrap(), 0x7E7E_0001);
        assert_eq!(bank.read_u32(4).unwrap(), 0x7E7E_0002);
    }

    /// Log sink shared between the subscriber and the test
    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for Captured {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn map_and_unmap_logged_at_info() {
        let file = scratch(&[0; 4]);
        let sink = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(sink.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let bank = MmapBank::open(file.path(), 16, 0, false).unwrap();
            drop(bank);
        });

        let log = String::from_utf8(sink.0.lock().unwrap().clone()).unwrap();
        assert!(log.contains("Mapped"), "{log}");
        assert!(log.contains("Unmapping"), "{log}");
    }

    #[test]
    fn out_of_range_access_is_rejected() {
        let file = scratch(&[0; 4]);
        let mut bank = MmapBank::open(file.path(), 16, 0, false).unwrap();
        assert!(matches!(bank.read_u32(16), Err(GpioError::OutOfRange { .. })));
        assert!(matches!(bank.write_u16(15, 0), Err(GpioError::OutOfRange { .. })));
    }
}
