//! Silicon model for the BCM2835 / BCM2837 GPIO block and the Linux spidev ABI.
//!
//! This crate has **no dependencies** and **no hardware access**: it is a
//! pure model of the register layout that the driver crate pokes at. Every
//! offset and bit position here is fixed by the SoC datasheet and must be
//! reproduced bit-exactly.
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`block`] | Peripheral base addresses and the size of the GPIO window |
//! | [`regs`] | GPIO register map: GPFSEL, GPSET, GPCLR, GPLEV offsets |
//! | [`function`] | 3-bit function-select codes and their field arithmetic |
//! | [`level`] | 1-bit level / set / clear field arithmetic |
//! | [`spidev`] | `spi_ioc_transfer` layout and spidev ioctl numbers |

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod block;
pub mod function;
pub mod level;
pub mod regs;
pub mod spidev;

/// Number of GPIO pins on the BCM2835 family.
pub const NPINS: u32 = 54;
