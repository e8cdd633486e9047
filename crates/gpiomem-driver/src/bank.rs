//! Register bank abstraction
//!
//! A register bank is a fixed-size, byte-addressable window onto hardware
//! registers. The bank is owned by whoever opened it; the GPIO, raw accessor
//! and SPI layers only dereference into it.
//!
//! Every access is bounds-checked and bracketed by a compiler fence on both
//! sides so no ordinary load or store is reordered across a register access,
//! even when the kernel maps the window as normal memory.

use crate::error::{GpioError, Result};
use std::fmt::Debug;
use std::sync::atomic::{compiler_fence, Ordering};

/// Byte-addressable register window with 8/16/32-bit volatile access
///
/// Implementations must reject accesses that fall outside `[0, len())` with
/// [`GpioError::OutOfRange`] before touching memory.
pub trait RegisterBank: Debug {
    /// Size of the window in bytes
    fn len(&self) -> usize;

    /// Whether the window is zero-sized
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read an 8-bit register
    ///
    /// # Errors
    ///
    /// Returns error if the access is out of range.
    fn read_u8(&self, offset: usize) -> Result<u8>;

    /// Read a 16-bit register in native byte order
    ///
    /// # Errors
    ///
    /// Returns error if the access is out of range or unaligned.
    fn read_u16(&self, offset: usize) -> Result<u16>;

    /// Read a 32-bit register in native byte order
    ///
    /// # Errors
    ///
    /// Returns error if the access is out of range or unaligned.
    fn read_u32(&self, offset: usize) -> Result<u32>;

    /// Write an 8-bit register
    ///
    /// # Errors
    ///
    /// Returns error if the access is out of range.
    fn write_u8(&mut self, offset: usize, value: u8) -> Result<()>;

    /// Write a 16-bit register in native byte order
    ///
    /// # Errors
    ///
    /// Returns error if the access is out of range or unaligned.
    fn write_u16(&mut self, offset: usize, value: u16) -> Result<()>;

    /// Write a 32-bit register in native byte order
    ///
    /// # Errors
    ///
    /// Returns error if the access is out of range or unaligned.
    fn write_u32(&mut self, offset: usize, value: u32) -> Result<()>;
}

/// Check that `size` bytes at `offset` fit in a window of `limit` bytes and
/// that the access is naturally aligned.
pub(crate) fn check_access(offset: usize, size: usize, limit: usize) -> Result<()> {
    if offset >= limit || size > limit - offset {
        return Err(GpioError::out_of_range(offset, size, limit));
    }
    if offset % size != 0 {
        return Err(GpioError::invalid_argument(format!(
            "unaligned {}-bit access at {offset:#x}",
            size * 8
        )));
    }
    Ok(())
}

/// Run one register access with a compiler fence on either side.
#[inline]
pub(crate) fn fenced<T>(access: impl FnOnce() -> T) -> T {
    compiler_fence(Ordering::SeqCst);
    let value = access();
    compiler_fence(Ordering::SeqCst);
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_bounds() {
        assert!(check_access(0, 4, 0x100).is_ok());
        assert!(check_access(0xFC, 4, 0x100).is_ok());
        assert!(matches!(
            check_access(0x100, 1, 0x100),
            Err(GpioError::OutOfRange { .. })
        ));
        assert!(matches!(
            check_access(0xFE, 4, 0x100),
            Err(GpioError::OutOfRange { .. })
        ));
    }

    #[test]
    fn access_alignment() {
        assert!(check_access(0x03, 1, 0x100).is_ok());
        assert!(matches!(
            check_access(0x02, 4, 0x100),
            Err(GpioError::InvalidArgument { .. })
        ));
    }
}
