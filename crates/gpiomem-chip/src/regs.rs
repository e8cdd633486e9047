//! GPIO register map for BCM2835 / BCM2837.
//!
//! All offsets are relative to the start of the GPIO block, which is offset 0
//! of `/dev/gpiomem`.
//!
//! ```text
//! 0x00-0x14  GPFSEL0..5   function select, 3 bits x 10 pins per register
//! 0x1C-0x20  GPSET0..1    output set, write-only, 1 bit per pin
//! 0x28-0x2C  GPCLR0..1    output clear, write-only, 1 bit per pin
//! 0x34-0x38  GPLEV0..1    pin level, read-only, 1 bit per pin
//! ```
//!
//! Writing a 0 bit to GPSET or GPCLR is a no-op for that pin, so disjoint
//! masks written by independent callers never interfere.

// ── Function select ──────────────────────────────────────────────────────────

/// GPFSEL0, pins 0-9.
pub const GPFSEL0: usize = 0x00;
/// Number of function-select registers.
pub const GPFSEL_COUNT: usize = 6;
/// Byte stride between function-select registers.
pub const GPFSEL_STRIDE: usize = 4;

/// Byte offset of function-select register `index` (0..6).
#[must_use]
pub const fn gpfsel(index: usize) -> usize {
    GPFSEL0 + GPFSEL_STRIDE * index
}

// ── Output set / clear (write-only) ──────────────────────────────────────────

/// GPSET0, pins 0-31.
pub const GPSET0: usize = 0x1C;
/// GPSET1, pins 32-53.
pub const GPSET1: usize = 0x20;
/// GPCLR0, pins 0-31.
pub const GPCLR0: usize = 0x28;
/// GPCLR1, pins 32-53.
pub const GPCLR1: usize = 0x2C;

// ── Level (read-only) ────────────────────────────────────────────────────────

/// GPLEV0, pins 0-31.
pub const GPLEV0: usize = 0x34;
/// GPLEV1, pins 32-53.
pub const GPLEV1: usize = 0x38;

/// Number of 32-bit registers in each set / clear / level bank.
pub const PORT_COUNT: usize = 2;

/// Set registers indexed by port.
pub const GPSET: [usize; PORT_COUNT] = [GPSET0, GPSET1];
/// Clear registers indexed by port.
pub const GPCLR: [usize; PORT_COUNT] = [GPCLR0, GPCLR1];
/// Level registers indexed by port.
pub const GPLEV: [usize; PORT_COUNT] = [GPLEV0, GPLEV1];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_select_offsets() {
        let offsets: Vec<usize> = (0..GPFSEL_COUNT).map(gpfsel).collect();
        assert_eq!(offsets, [0x00, 0x04, 0x08, 0x0C, 0x10, 0x14]);
    }

    #[test]
    fn port_registers_do_not_overlap() {
        for set in GPSET {
            assert!(!GPCLR.contains(&set));
            assert!(!GPLEV.contains(&set));
        }
        assert!(gpfsel(GPFSEL_COUNT - 1) < GPSET0);
    }
}
