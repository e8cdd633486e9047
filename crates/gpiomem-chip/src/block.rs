//! Peripheral block layout.
//!
//! `/dev/gpiomem` exposes only the GPIO block, starting at offset 0. When the
//! registers are reached through `/dev/mem` instead, the mapping offset is the
//! physical peripheral base plus [`GPIO_OFFSET`].
//!
//! ```text
//! SoC       Peripheral base   GPIO block
//! ───────── ───────────────── ───────────
//! BCM2835   0x2000_0000       0x2020_0000
//! BCM2836/7 0x3F00_0000       0x3F20_0000
//! BCM2711   0xFE00_0000       0xFE20_0000
//! ```

/// Offset of the GPIO block from the peripheral base.
pub const GPIO_OFFSET: u64 = 0x0020_0000;

/// Bytes mapped for the GPIO block. Covers every register up to GPPUDCLK1.
pub const GPIO_MAP_LEN: usize = 0x100;

/// Default device node exposing the GPIO block without root.
pub const GPIOMEM_DEVICE: &str = "/dev/gpiomem";

/// Whole physical memory device, requires root.
pub const DEVMEM_DEVICE: &str = "/dev/mem";

/// SoC variant, used to locate the GPIO block inside `/dev/mem`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Soc {
    /// Raspberry Pi 1 / Zero.
    Bcm2835,
    /// Raspberry Pi 2 / 3.
    Bcm2837,
    /// Raspberry Pi 4.
    Bcm2711,
}

impl Soc {
    /// Physical base address of the peripheral bus as seen by the ARM cores.
    #[must_use]
    pub const fn peripheral_base(&self) -> u64 {
        match self {
            Self::Bcm2835 => 0x2000_0000,
            Self::Bcm2837 => 0x3F00_0000,
            Self::Bcm2711 => 0xFE00_0000,
        }
    }

    /// Physical address of the GPIO block, the `/dev/mem` mapping offset.
    #[must_use]
    pub const fn gpio_base(&self) -> u64 {
        self.peripheral_base() + GPIO_OFFSET
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpio_block_addresses() {
        assert_eq!(Soc::Bcm2835.gpio_base(), 0x2020_0000);
        assert_eq!(Soc::Bcm2837.gpio_base(), 0x3F20_0000);
        assert_eq!(Soc::Bcm2711.gpio_base(), 0xFE20_0000);
    }

    #[test]
    fn map_covers_level_registers() {
        assert!(crate::regs::GPLEV1 + 4 <= GPIO_MAP_LEN);
    }
}
