//! Function-select codes.
//!
//! Each pin owns a 3-bit field in one of the six GPFSEL registers: register
//! `pin / 10`, bit offset `3 * (pin % 10)`. Only the low 30 bits of a GPFSEL
//! register carry fields.
//!
//! The alternate-function codes are **not** monotonic in the ALT index:
//!
//! ```text
//! IN=0 OUT=1 ALT5=2 ALT4=3 ALT0=4 ALT1=5 ALT2=6 ALT3=7
//! ```

use core::fmt;

/// Width of a function-select field in bits.
pub const FIELD_BITS: u32 = 3;
/// Mask of one unshifted function-select field.
pub const FIELD_MASK: u32 = 0b111;
/// Pins per function-select register.
pub const PINS_PER_REGISTER: u32 = 10;

/// Input.
pub const IN: u32 = 0;
/// Output.
pub const OUT: u32 = 1;
/// Alternate function 0.
pub const ALT0: u32 = 4;
/// Alternate function 1.
pub const ALT1: u32 = 5;
/// Alternate function 2.
pub const ALT2: u32 = 6;
/// Alternate function 3.
pub const ALT3: u32 = 7;
/// Alternate function 4.
pub const ALT4: u32 = 3;
/// Alternate function 5.
pub const ALT5: u32 = 2;

/// Location of a pin's function-select field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FselField {
    /// GPFSEL register index, 0..6.
    pub register: usize,
    /// Bit offset of the low bit of the field.
    pub shift: u32,
}

impl FselField {
    /// Field location for `pin`. The pin is not range checked here.
    #[must_use]
    pub const fn of(pin: u32) -> Self {
        Self {
            register: (pin / PINS_PER_REGISTER) as usize,
            shift: FIELD_BITS * (pin % PINS_PER_REGISTER),
        }
    }

    /// Field mask in register position.
    #[must_use]
    pub const fn mask(&self) -> u32 {
        FIELD_MASK << self.shift
    }

    /// Extract this field from a register value.
    #[must_use]
    pub const fn extract(&self, register_value: u32) -> u32 {
        (register_value >> self.shift) & FIELD_MASK
    }
}

/// A pin function as encoded in GPFSEL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Function {
    /// Digital input.
    In = 0,
    /// Digital output.
    Out = 1,
    /// Alternate function 5.
    Alt5 = 2,
    /// Alternate function 4.
    Alt4 = 3,
    /// Alternate function 0.
    Alt0 = 4,
    /// Alternate function 1.
    Alt1 = 5,
    /// Alternate function 2.
    Alt2 = 6,
    /// Alternate function 3.
    Alt3 = 7,
}

impl Function {
    /// Every function, ordered by code.
    pub const ALL: [Self; 8] = [
        Self::In,
        Self::Out,
        Self::Alt5,
        Self::Alt4,
        Self::Alt0,
        Self::Alt1,
        Self::Alt2,
        Self::Alt3,
    ];

    /// Decode a 3-bit code. Returns `None` above 7.
    #[must_use]
    pub const fn from_code(code: u32) -> Option<Self> {
        if code > FIELD_MASK {
            return None;
        }
        Some(Self::ALL[code as usize])
    }

    /// Raw 3-bit code.
    #[must_use]
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Name as written in the datasheet.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::In => "IN",
            Self::Out => "OUT",
            Self::Alt0 => "ALT0",
            Self::Alt1 => "ALT1",
            Self::Alt2 => "ALT2",
            Self::Alt3 => "ALT3",
            Self::Alt4 => "ALT4",
            Self::Alt5 => "ALT5",
        }
    }

    /// Parse a datasheet name, case-insensitive.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(name))
    }
}

impl From<Function> for u32 {
    fn from(f: Function) -> Self {
        f.code()
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}
