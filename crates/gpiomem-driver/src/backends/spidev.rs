//! spidev transfer dispatcher
//!
//! Issues planned SPI segments through the Linux spidev character device:
//! `SPI_IOC_WR_MODE32` to program the mode, then one `SPI_IOC_MESSAGE(n)`
//! carrying every segment so chip select stays asserted across them.
//!
//! spidev ioctls use libc directly: rustix has no typed wrapper for them and
//! `SPI_IOC_MESSAGE` takes a variable-length array argument.

// FFI casts are intentional - the spidev ABI fixes the field types
#![allow(clippy::cast_possible_truncation)]

use crate::error::{GpioError, Result};
use crate::spi::{Transfer, TransferDispatch};
use gpiomem_chip::spidev::{spi_ioc_message, SPI_IOC_WR_MODE32};
use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

/// Largest segment count a single message ioctl can describe
const MAX_SEGMENTS: usize = 511;

/// `struct spi_ioc_transfer` from `<linux/spi/spidev.h>`
#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
struct SpiIocTransfer {
    tx_buf: u64,
    rx_buf: u64,
    len: u32,
    speed_hz: u32,
    delay_usecs: u16,
    bits_per_word: u8,
    cs_change: u8,
    tx_nbits: u8,
    rx_nbits: u8,
    word_delay_usecs: u8,
    pad: u8,
}

/// Dispatcher over an open `/dev/spidevB.D` node
#[derive(Debug)]
pub struct SpidevDispatch {
    file: File,
    path: PathBuf,
}

impl SpidevDispatch {
    /// Open a spidev node by path
    ///
    /// # Errors
    ///
    /// Returns error if the node doesn't exist or cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(GpioError::device_not_found(path));
        }

        let file = OpenOptions::new().read(true).write(true).open(path)?;
        tracing::info!("Opened SPI device {}", path.display());

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Open `/dev/spidev{bus}.{device}`
    ///
    /// # Errors
    ///
    /// Returns error if the node doesn't exist or cannot be opened.
    pub fn open_bus(bus: u32, device: u32) -> Result<Self> {
        Self::open(format!("/dev/spidev{bus}.{device}"))
    }

    /// Path of the open node
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TransferDispatch for SpidevDispatch {
    fn set_mode(&mut self, mode: u32) -> Result<()> {
        // SAFETY: SPI_IOC_WR_MODE32 reads one u32 through the pointer.
        // - fd is open for the lifetime of self
        // - &mode is a valid, aligned u32 for the duration of the call
        let ret = unsafe {
            libc::ioctl(
                self.file.as_raw_fd(),
                SPI_IOC_WR_MODE32 as libc::c_ulong,
                std::ptr::addr_of!(mode),
            )
        };
        if ret < 0 {
            return Err(GpioError::transfer_failed(format!(
                "set mode {mode} on {}: {}",
                self.path.display(),
                std::io::Error::last_os_error()
            )));
        }
        Ok(())
    }

    fn dispatch(&mut self, tx: &[u8], rx: &mut [u8], transfers: &[Transfer]) -> Result<()> {
        if tx.len() != rx.len() {
            return Err(GpioError::invalid_argument(format!(
                "tx/rx length mismatch: {} vs {}",
                tx.len(),
                rx.len()
            )));
        }
        if transfers.is_empty() {
            return Ok(());
        }
        if transfers.len() > MAX_SEGMENTS {
            return Err(GpioError::invalid_argument(format!(
                "{} segments exceed one SPI message",
                transfers.len()
            )));
        }

        let mut segments = Vec::with_capacity(transfers.len());
        for t in transfers {
            if t.range().end > tx.len() {
                return Err(GpioError::out_of_range(t.offset, t.len, tx.len()));
            }
            let len = u32::try_from(t.len).map_err(|_| {
                GpioError::invalid_argument(format!("segment of {} bytes too long", t.len))
            })?;
            segments.push(SpiIocTransfer {
                tx_buf: tx[t.offset..].as_ptr() as u64,
                rx_buf: rx[t.offset..].as_mut_ptr() as u64,
                len,
                speed_hz: t.speed_hz,
                delay_usecs: t.delay_usecs,
                bits_per_word: t.bits_per_word,
                ..SpiIocTransfer::default()
            });
        }

        tracing::trace!("SPI message on {}: {segments:?}", self.path.display());

        let request = spi_ioc_message(segments.len() as u32);
        // SAFETY: SPI_IOC_MESSAGE(n) reads n spi_ioc_transfer structs.
        // - segments holds exactly n entries, repr(C) matching the kernel ABI
        // - every tx_buf/rx_buf points inside tx/rx with len bytes available
        //   (range checked above), and both slices outlive the call
        // - rx is borrowed mutably, so the kernel's writes alias nothing
        let ret = unsafe {
            libc::ioctl(
                self.file.as_raw_fd(),
                request as libc::c_ulong,
                segments.as_ptr(),
            )
        };
        if ret < 0 {
            return Err(GpioError::transfer_failed(format!(
                "SPI message on {}: {}",
                self.path.display(),
                std::io::Error::last_os_error()
            )));
        }
        Ok(())
    }
}
