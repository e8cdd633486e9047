//! SPI transfers with a trailing partial word
//!
//! Some protocols end a message with a field shorter than a byte. spidev can
//! clock such a field only as a separate transfer segment with a smaller
//! `bits_per_word`, so [`build_transfers`] splits a buffer into at most two
//! segments: the whole bytes at 8 bits per word, then the last byte at
//! `extra_bits`. Planning is pure; [`Spi`] hands the plan to a
//! [`TransferDispatch`] which issues it as one bus transaction.

use crate::backends::SpidevDispatch;
use crate::config::SpiConfig;
use crate::error::{GpioError, Result};
use gpiomem_chip::spidev::{mode, MAX_EXTRA_BITS};
use std::fmt::Debug;
use std::ops::Range;
use std::path::Path;

/// One contiguous segment of a bus transaction
///
/// Offsets index both the transmit and the receive buffer, which always have
/// the same length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    /// First byte of the segment
    pub offset: usize,
    /// Bytes in the segment
    pub len: usize,
    /// Bits clocked per word, 1-8
    pub bits_per_word: u8,
    /// Bus clock in Hz, passed through from the caller
    pub speed_hz: u32,
    /// Delay after the segment in microseconds, passed through from the caller
    pub delay_usecs: u16,
}

impl Transfer {
    /// Byte range covered in the transmit / receive buffers
    #[must_use]
    pub const fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }

    /// Slice of `buffer` covered by this segment
    ///
    /// # Panics
    ///
    /// Panics if `buffer` is shorter than the planned range.
    #[must_use]
    pub fn slice<'a>(&self, buffer: &'a [u8]) -> &'a [u8] {
        &buffer[self.range()]
    }
}

/// Split `tx` into transfer segments so that the last byte is clocked with
/// only `extra_bits` bits when `extra_bits` is non-zero
///
/// - empty buffer: no segments (a successful no-op)
/// - one byte: one segment at `extra_bits`, or 8 when `extra_bits` is 0
/// - several bytes, `extra_bits == 0`: one full-width segment
/// - several bytes, `extra_bits > 0`: all but the last byte at 8 bits, then
///   the last byte alone at `extra_bits`
///
/// # Errors
///
/// Returns `InvalidArgument` if `extra_bits > 7`.
pub fn build_transfers(tx: &[u8], extra_bits: u8, config: &SpiConfig) -> Result<Vec<Transfer>> {
    if extra_bits > MAX_EXTRA_BITS {
        return Err(GpioError::invalid_argument(format!(
            "extra bits must be <= {MAX_EXTRA_BITS} (not {extra_bits})"
        )));
    }

    let segment = |offset, len, bits_per_word| Transfer {
        offset,
        len,
        bits_per_word,
        speed_hz: config.speed_hz,
        delay_usecs: config.delay_usecs,
    };
    let trailing_bits = if extra_bits == 0 { 8 } else { extra_bits };

    let plan = match tx.len() {
        0 => Vec::new(),
        1 => vec![segment(0, 1, trailing_bits)],
        n if extra_bits == 0 => vec![segment(0, n, 8)],
        n => vec![segment(0, n - 1, 8), segment(n - 1, 1, trailing_bits)],
    };

    tracing::debug!("planned {} byte(s) + {extra_bits} bit(s) as {plan:?}", tx.len());
    Ok(plan)
}

/// Issues a planned set of segments as a single bus transaction
pub trait TransferDispatch: Debug {
    /// Program the clock polarity / phase mode (0-3)
    ///
    /// # Errors
    ///
    /// Returns error if the bus rejects the mode.
    fn set_mode(&mut self, mode: u32) -> Result<()>;

    /// Clock out `tx` and capture into `rx` following `transfers`
    ///
    /// # Errors
    ///
    /// Returns error if the buffers don't cover the plan or the bus fails.
    fn dispatch(&mut self, tx: &[u8], rx: &mut [u8], transfers: &[Transfer]) -> Result<()>;
}

/// SPI master over a transfer dispatcher
#[derive(Debug)]
pub struct Spi<D: TransferDispatch> {
    dispatch: D,
    config: SpiConfig,
}

impl Spi<SpidevDispatch> {
    /// Open `/dev/spidev{bus}.{device}`
    ///
    /// # Errors
    ///
    /// Returns error if the node cannot be opened or the mode is invalid.
    pub fn open(bus: u32, device: u32, config: SpiConfig) -> Result<Self> {
        Self::new(SpidevDispatch::open_bus(bus, device)?, config)
    }

    /// Open an explicit spidev node
    ///
    /// # Errors
    ///
    /// Returns error if the node cannot be opened or the mode is invalid.
    pub fn open_path(path: impl AsRef<Path>, config: SpiConfig) -> Result<Self> {
        Self::new(SpidevDispatch::open(path)?, config)
    }
}

impl<D: TransferDispatch> Spi<D> {
    /// Wrap a dispatcher
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `config.mode` is not 0-3.
    pub fn new(dispatch: D, config: SpiConfig) -> Result<Self> {
        check_mode(config.mode)?;
        Ok(Self { dispatch, config })
    }

    /// Current bus settings
    #[must_use]
    pub const fn config(&self) -> &SpiConfig {
        &self.config
    }

    /// Change the clock polarity / phase mode used by later transfers
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `mode` is not 0-3.
    pub fn set_mode(&mut self, mode: u32) -> Result<()> {
        check_mode(mode)?;
        self.config.mode = mode;
        Ok(())
    }

    /// Change the bus clock used by later transfers
    pub fn set_speed(&mut self, speed_hz: u32) {
        self.config.speed_hz = speed_hz;
    }

    /// Underlying dispatcher
    #[must_use]
    pub const fn dispatcher(&self) -> &D {
        &self.dispatch
    }

    /// Full-duplex transfer, returning the bytes received
    ///
    /// The last byte of `data` is clocked with `extra_bits` bits when
    /// `extra_bits` is non-zero. An empty `data` succeeds without touching
    /// the bus.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `extra_bits > 7`, or the dispatcher's
    /// error if the mode or transfer ioctl fails.
    pub fn xfer(&mut self, data: &[u8], extra_bits: u8) -> Result<Vec<u8>> {
        let plan = build_transfers(data, extra_bits, &self.config)?;
        let mut rx = vec![0u8; data.len()];
        if plan.is_empty() {
            return Ok(rx);
        }

        self.dispatch.set_mode(self.config.mode & mode::MASK)?;
        self.dispatch.dispatch(data, &mut rx, &plan)?;
        Ok(rx)
    }
}

fn check_mode(mode: u32) -> Result<()> {
    if mode > mode::MASK {
        return Err(GpioError::invalid_argument(format!(
            "SPI mode must be 0-3 (not {mode})"
        )));
    }
    Ok(())
}
