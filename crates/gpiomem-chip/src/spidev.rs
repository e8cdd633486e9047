//! Linux spidev user-space ABI.
//!
//! Mirrors `<linux/spi/spidev.h>`: the 32-byte `struct spi_ioc_transfer` and
//! the ioctl numbers built with `_IOW('k', nr, size)`.

/// spidev ioctl magic.
pub const SPI_IOC_MAGIC: u8 = b'k';

/// Size of one `struct spi_ioc_transfer`.
pub const SPI_IOC_TRANSFER_SIZE: u32 = 32;

/// Largest `bits_per_word` remainder accepted for a trailing partial byte.
pub const MAX_EXTRA_BITS: u8 = 7;

/// Inter-transfer delay used unless the caller overrides it.
pub const DEFAULT_DELAY_USECS: u16 = 10;

const IOC_NRBITS: u32 = 8;
const IOC_TYPEBITS: u32 = 8;
const IOC_SIZEBITS: u32 = 14;
const IOC_NRSHIFT: u32 = 0;
const IOC_TYPESHIFT: u32 = IOC_NRSHIFT + IOC_NRBITS;
const IOC_SIZESHIFT: u32 = IOC_TYPESHIFT + IOC_TYPEBITS;
const IOC_DIRSHIFT: u32 = IOC_SIZESHIFT + IOC_SIZEBITS;
const IOC_WRITE: u32 = 1;

/// `_IOW(ty, nr, size)` for the asm-generic ioctl encoding (ARM, x86).
#[must_use]
pub const fn iow(ty: u8, nr: u8, size: u32) -> u32 {
    (IOC_WRITE << IOC_DIRSHIFT)
        | (size << IOC_SIZESHIFT)
        | ((ty as u32) << IOC_TYPESHIFT)
        | ((nr as u32) << IOC_NRSHIFT)
}

/// `SPI_IOC_WR_MODE32`: write the 32-bit SPI mode word.
pub const SPI_IOC_WR_MODE32: u32 = iow(SPI_IOC_MAGIC, 5, 4);

/// `SPI_IOC_MESSAGE(n)`: submit `n` chained transfers.
///
/// The kernel rejects messages whose total size does not fit the 14-bit
/// size field, so `n` is capped at 511 by callers.
#[must_use]
pub const fn spi_ioc_message(n: u32) -> u32 {
    let size = n * SPI_IOC_TRANSFER_SIZE;
    let size = if size < (1 << IOC_SIZEBITS) { size } else { 0 };
    iow(SPI_IOC_MAGIC, 0, size)
}

/// SPI clock polarity / phase modes.
pub mod mode {
    /// CPOL=0, CPHA=0.
    pub const MODE_0: u32 = 0;
    /// CPOL=0, CPHA=1.
    pub const MODE_1: u32 = 1;
    /// CPOL=1, CPHA=0.
    pub const MODE_2: u32 = 2;
    /// CPOL=1, CPHA=1.
    pub const MODE_3: u32 = 3;
    /// Bits of the mode word selecting CPOL/CPHA.
    pub const MASK: u32 = 0b11;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ioctl_numbers_match_kernel_headers() {
        assert_eq!(SPI_IOC_WR_MODE32, 0x4004_6B05);
        assert_eq!(spi_ioc_message(1), 0x4020_6B00);
        assert_eq!(spi_ioc_message(2), 0x4040_6B00);
    }
}
