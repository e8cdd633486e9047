//! Error types for GPIO, raw register and SPI operations

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for gpiomem operations
pub type Result<T> = std::result::Result<T, GpioError>;

/// Errors that can occur while touching hardware registers
#[derive(Debug, Error)]
pub enum GpioError {
    /// Pin index outside `[0, npins)`
    #[error("Invalid pin {pin} (have {npins} pins)")]
    InvalidPin {
        /// Requested pin
        pin: u32,
        /// Number of pins on this block
        npins: u32,
    },

    /// Function-select code outside `[0, 7]`
    #[error("Invalid function code {code} (must be 0-7)")]
    InvalidFunctionCode {
        /// Rejected code
        code: u32,
    },

    /// Paired sequences of different length
    #[error("Arity mismatch: {reason}")]
    ArityMismatch {
        /// Which sequence ran out or had leftovers
        reason: String,
    },

    /// Offset, width or count exceeds the mapped window
    #[error("Out of range: offset={offset:#x}, size={size}, limit={limit:#x}")]
    OutOfRange {
        /// First byte of the rejected access
        offset: usize,
        /// Bytes the access would touch
        size: usize,
        /// Size of the mapped window
        limit: usize,
    },

    /// Malformed width, byte-order tag, extra-bit count or value
    #[error("Invalid argument: {reason}")]
    InvalidArgument {
        /// Reason for rejection
        reason: String,
    },

    /// Device node does not exist
    #[error("Device not found: {}", path.display())]
    DeviceNotFound {
        /// Path that was checked
        path: PathBuf,
    },

    /// mmap / munmap / msync failed
    #[error("Mapping failed: {reason}")]
    MapFailed {
        /// Reason for failure
        reason: String,
    },

    /// SPI mode or message ioctl failed
    #[error("Transfer failed: {reason}")]
    TransferFailed {
        /// Reason for failure
        reason: String,
    },

    /// I/O error opening or driving a device node
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error
        #[from]
        source: std::io::Error,
    },
}

impl GpioError {
    /// Create an arity mismatch error
    pub fn arity_mismatch(reason: impl Into<String>) -> Self {
        Self::ArityMismatch {
            reason: reason.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Create a device not found error
    pub fn device_not_found(path: impl Into<PathBuf>) -> Self {
        Self::DeviceNotFound { path: path.into() }
    }

    /// Create a mapping failed error
    pub fn map_failed(reason: impl Into<String>) -> Self {
        Self::MapFailed {
            reason: reason.into(),
        }
    }

    /// Create a transfer failed error
    pub fn transfer_failed(reason: impl Into<String>) -> Self {
        Self::TransferFailed {
            reason: reason.into(),
        }
    }

    /// Create an out of range error
    pub const fn out_of_range(offset: usize, size: usize, limit: usize) -> Self {
        Self::OutOfRange {
            offset,
            size,
            limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let e = GpioError::InvalidPin { pin: 54, npins: 54 };
        assert_eq!(e.to_string(), "Invalid pin 54 (have 54 pins)");

        let e = GpioError::out_of_range(0xfe, 4, 0x100);
        assert_eq!(e.to_string(), "Out of range: offset=0xfe, size=4, limit=0x100");
    }
}
