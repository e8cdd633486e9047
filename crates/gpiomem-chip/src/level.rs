//! Single-bit field arithmetic shared by GPSET, GPCLR and GPLEV.
//!
//! Pin `n` lives in port register `n / 32` at bit `n % 32`.

/// Pins per 32-bit port register.
pub const PINS_PER_PORT: u32 = 32;

/// Location of a pin's bit in a set / clear / level register pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortBit {
    /// Port index, 0 or 1.
    pub port: usize,
    /// Bit index within the port register.
    pub bit: u32,
}

impl PortBit {
    /// Bit location for `pin`. The pin is not range checked here.
    #[must_use]
    pub const fn of(pin: u32) -> Self {
        Self {
            port: (pin / PINS_PER_PORT) as usize,
            bit: pin % PINS_PER_PORT,
        }
    }

    /// Single-bit mask in register position.
    #[must_use]
    pub const fn mask(&self) -> u32 {
        1 << self.bit
    }

    /// Test this bit in a register value.
    #[must_use]
    pub const fn is_set(&self, register_value: u32) -> bool {
        register_value & self.mask() != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_location() {
        assert_eq!(PortBit::of(3), PortBit { port: 0, bit: 3 });
        assert_eq!(PortBit::of(31), PortBit { port: 0, bit: 31 });
        assert_eq!(PortBit::of(35), PortBit { port: 1, bit: 3 });
        assert_eq!(PortBit::of(53).mask(), 1 << 21);
    }

    #[test]
    fn level_decode() {
        assert!(PortBit::of(0).is_set(0x5));
        assert!(!PortBit::of(1).is_set(0x5));
        assert!(PortBit::of(2).is_set(0x5));
    }
}
