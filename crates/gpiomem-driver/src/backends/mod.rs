//! Register bank backends
//!
//! Two backends available:
//! - **Mmap**: a real mapping of `/dev/gpiomem`, `/dev/mem` or a file
//! - **Memory**: an in-process register file that logs every access
//!
//! Plus the spidev dispatcher that issues planned SPI transfers.

pub mod memory;
pub mod mmap;
pub mod spidev;

pub use memory::{Access, MemoryBank};
pub use mmap::MmapBank;
pub use spidev::SpidevDispatch;
