//! User-space register access for BCM2835/7 GPIO and SPI.
//!
//! Bit-exact control over memory-mapped I/O blocks from user space: pin
//! function multiplexing, batched digital I/O through the set/clear
//! registers, raw width- and byte-order-aware register access, and SPI
//! transfers that end in a partial byte.
//!
//! # Layers
//!
//! ```text
//! Caller
//!   │
//!   ├──▶ GpioMem ── get/set_function, read, write_and_read_back
//!   │       │
//!   ├──▶ mmio ───── read, write, run_program
//!   │       │
//!   │       ▼
//!   │   RegisterBank ── MmapBank (/dev/gpiomem, /dev/mem)
//!   │                   MemoryBank (in-process, logs accesses)
//!   │
//!   └──▶ Spi ── build_transfers ──▶ TransferDispatch ── SpidevDispatch
//! ```
//!
//! # Quick start
//!
//! ```no_run
//! use gpiomem_driver::{Function, GpioConfig, GpioMem};
//!
//! # fn main() -> gpiomem_driver::Result<()> {
//! let mut io = GpioMem::open(&GpioConfig::from_env())?;
//! io.set_function([17, 27], [Function::Out, Function::In])?;
//! let before = io.output([17], [true])?;
//! let levels = io.read([17, 27])?;
//! println!("GPIO17 was {}, now {:?}", before[0], levels);
//! # Ok(())
//! # }
//! ```
//!
//! # Concurrency
//!
//! Every call runs to completion on the calling thread. No locking is done:
//! callers sharing a bank must serialize function-select updates themselves.
//! Output changes go through the hardware's set/clear registers and need no
//! lock.

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

pub mod backends;
mod bank;
mod config;
mod error;
pub mod gpio;
pub mod mmio;
pub mod spi;

/// Register layout constants (re-exported from gpiomem-chip).
pub mod chip {
    pub use gpiomem_chip::block::{Soc, GPIO_MAP_LEN};
    pub use gpiomem_chip::function::{ALT0, ALT1, ALT2, ALT3, ALT4, ALT5, IN, OUT};
    pub use gpiomem_chip::regs;
    pub use gpiomem_chip::NPINS;
}

pub use backends::{Access, MemoryBank, MmapBank, SpidevDispatch};
pub use bank::RegisterBank;
pub use config::{GpioConfig, SpiConfig, DEVICE_ENV};
pub use error::{GpioError, Result};
pub use gpio::{GpioMem, OutputLatch};
pub use gpiomem_chip::function::Function;
pub use mmio::{ByteOrder, MaskedOp, Width};
pub use spi::{build_transfers, Spi, Transfer, TransferDispatch};

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        ByteOrder, Function, GpioConfig, GpioError, GpioMem, MaskedOp, MemoryBank, MmapBank,
        RegisterBank, Result, Spi, SpiConfig, Width,
    };
}
