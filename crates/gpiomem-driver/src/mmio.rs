//! Raw register access over a mapped window
//!
//! Width- and byte-order-aware reads and writes for ad-hoc register poking
//! outside the GPIO and SPI abstractions, plus masked read-modify-write
//! programs.
//!
//! Byte-order conversion is applied to the raw bits after a read and before
//! a write; 8-bit accesses ignore the order.

use crate::bank::{check_access, RegisterBank};
use crate::error::{GpioError, Result};

/// Register access width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    /// 8-bit
    U8 = 1,
    /// 16-bit
    U16 = 2,
    /// 32-bit
    U32 = 4,
}

impl Width {
    /// Width from a byte count (1, 2 or 4)
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for any other count.
    pub fn from_bytes(bytes: usize) -> Result<Self> {
        match bytes {
            1 => Ok(Self::U8),
            2 => Ok(Self::U16),
            4 => Ok(Self::U32),
            _ => Err(GpioError::invalid_argument(format!(
                "width must be 1/2/4 bytes (not {bytes})"
            ))),
        }
    }

    /// Width from a bit count (8, 16 or 32)
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for any other count.
    pub fn from_bits(bits: u32) -> Result<Self> {
        match bits {
            8 => Ok(Self::U8),
            16 => Ok(Self::U16),
            32 => Ok(Self::U32),
            _ => Err(GpioError::invalid_argument(format!(
                "width must be 8/16/32 bits (not {bits})"
            ))),
        }
    }

    /// Size in bytes
    #[must_use]
    pub const fn bytes(self) -> usize {
        self as usize
    }

    /// Largest value representable at this width
    #[must_use]
    pub const fn max_value(self) -> u32 {
        match self {
            Self::U8 => 0xFF,
            Self::U16 => 0xFFFF,
            Self::U32 => u32::MAX,
        }
    }
}

/// Byte order of register contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    /// Host order, no conversion
    #[default]
    Native,
    /// Least significant byte first
    Little,
    /// Most significant byte first
    Big,
}

impl ByteOrder {
    /// Tag for [`ByteOrder::Native`]
    pub const NATIVE: i32 = 0;
    /// Tag for [`ByteOrder::Big`]
    pub const BIG: i32 = 1;
    /// Tag for [`ByteOrder::Little`]
    pub const LITTLE: i32 = -1;

    /// Decode an integer order tag
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for an unknown tag.
    pub fn from_tag(tag: i32) -> Result<Self> {
        match tag {
            Self::NATIVE => Ok(Self::Native),
            Self::BIG => Ok(Self::Big),
            Self::LITTLE => Ok(Self::Little),
            _ => Err(GpioError::invalid_argument(format!(
                "byte order tag must be 0, 1 or -1 (not {tag})"
            ))),
        }
    }

    /// Integer tag for this order
    #[must_use]
    pub const fn tag(self) -> i32 {
        match self {
            Self::Native => Self::NATIVE,
            Self::Big => Self::BIG,
            Self::Little => Self::LITTLE,
        }
    }

    /// Convert raw register bits to a host value
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn decode(self, width: Width, raw: u32) -> u32 {
        match (self, width) {
            (Self::Native, _) | (_, Width::U8) => raw,
            (Self::Big, Width::U16) => u32::from(u16::from_be(raw as u16)),
            (Self::Little, Width::U16) => u32::from(u16::from_le(raw as u16)),
            (Self::Big, Width::U32) => u32::from_be(raw),
            (Self::Little, Width::U32) => u32::from_le(raw),
        }
    }

    /// Convert a host value to raw register bits
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn encode(self, width: Width, value: u32) -> u32 {
        match (self, width) {
            (Self::Native, _) | (_, Width::U8) => value,
            (Self::Big, Width::U16) => u32::from((value as u16).to_be()),
            (Self::Little, Width::U16) => u32::from((value as u16).to_le()),
            (Self::Big, Width::U32) => value.to_be(),
            (Self::Little, Width::U32) => value.to_le(),
        }
    }
}

/// Read one register of the given width, zero-extended
///
/// # Errors
///
/// Returns error if the access is out of range or unaligned.
pub fn read_register<B: RegisterBank + ?Sized>(bank: &B, offset: usize, width: Width) -> Result<u32> {
    match width {
        Width::U8 => bank.read_u8(offset).map(u32::from),
        Width::U16 => bank.read_u16(offset).map(u32::from),
        Width::U32 => bank.read_u32(offset),
    }
}

/// Write one register of the given width
///
/// # Errors
///
/// Returns error if the access is out of range, unaligned, or `value` does
/// not fit in `width`.
#[allow(clippy::cast_possible_truncation)]
pub fn write_register<B: RegisterBank + ?Sized>(
    bank: &mut B,
    offset: usize,
    width: Width,
    value: u32,
) -> Result<()> {
    if value > width.max_value() {
        return Err(GpioError::invalid_argument(format!(
            "value {value:#x} does not fit in {} bits",
            width.bytes() * 8
        )));
    }
    match width {
        Width::U8 => bank.write_u8(offset, value as u8),
        Width::U16 => bank.write_u16(offset, value as u16),
        Width::U32 => bank.write_u32(offset, value),
    }
}

/// Read `count` consecutive registers starting at `offset`
///
/// The whole span is checked against the window before the first access.
///
/// # Errors
///
/// Returns `OutOfRange` if `offset >= len` or `width * count` does not fit
/// in the remainder of the window.
pub fn read<B: RegisterBank + ?Sized>(
    bank: &B,
    offset: usize,
    count: usize,
    width: Width,
    order: ByteOrder,
) -> Result<Vec<u32>> {
    let limit = bank.len();
    let span = width.bytes().saturating_mul(count);
    if offset >= limit || span > limit - offset {
        return Err(GpioError::out_of_range(offset, span, limit));
    }

    let values = (0..count)
        .map(|i| {
            let raw = read_register(bank, offset + i * width.bytes(), width)?;
            Ok(order.decode(width, raw))
        })
        .collect::<Result<Vec<u32>>>()?;

    tracing::debug!("read {count} x {}-bit @ {offset:#x}: {values:x?}", width.bytes() * 8);
    Ok(values)
}

/// Write values to consecutive registers starting at `offset`
///
/// Values are consumed lazily. Each element is committed before the next is
/// pulled, so when the sequence holds more values than fit in the window the
/// prefix that fit stays written and `OutOfRange` is returned. A value too
/// wide for `width` stops the loop the same way with `InvalidArgument`.
///
/// Returns the number of registers written.
///
/// # Errors
///
/// Returns `OutOfRange` if the first element does not fit or the window is
/// exhausted before the values are.
pub fn write<B, I>(bank: &mut B, offset: usize, values: I, width: Width, order: ByteOrder) -> Result<usize>
where
    B: RegisterBank + ?Sized,
    I: IntoIterator<Item = u32>,
{
    let limit = bank.len();
    if offset >= limit || width.bytes() > limit - offset {
        return Err(GpioError::out_of_range(offset, width.bytes(), limit));
    }

    let mut addr = offset;
    let mut written = 0;
    for value in values {
        if width.bytes() > limit - addr {
            tracing::debug!("write @ {offset:#x} ran past the window after {written} values");
            return Err(GpioError::out_of_range(addr, width.bytes(), limit));
        }
        if value > width.max_value() {
            return Err(GpioError::invalid_argument(format!(
                "value {value:#x} does not fit in {} bits",
                width.bytes() * 8
            )));
        }
        write_register(bank, addr, width, order.encode(width, value))?;
        addr += width.bytes();
        written += 1;
    }

    tracing::debug!("wrote {written} x {}-bit @ {offset:#x}", width.bytes() * 8);
    Ok(written)
}

/// One step of a masked I/O program
///
/// Reads the register; when `mask` is non-zero, writes back
/// `(old & !mask) | (value & mask)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskedOp {
    /// Byte offset of the register
    pub offset: usize,
    /// Register width
    pub width: Width,
    /// Bits to replace, zero for a plain read
    pub mask: u32,
    /// Replacement bits
    pub value: u32,
}

impl MaskedOp {
    /// Plain read of one register
    #[must_use]
    pub const fn read(offset: usize, width: Width) -> Self {
        Self {
            offset,
            width,
            mask: 0,
            value: 0,
        }
    }

    /// Read-modify-write of the bits in `mask`
    #[must_use]
    pub const fn modify(offset: usize, width: Width, mask: u32, value: u32) -> Self {
        Self {
            offset,
            width,
            mask,
            value,
        }
    }
}

/// Run a masked I/O program, returning the value each op read
///
/// Every op is validated before the first register access, so a malformed
/// program performs no I/O at all.
///
/// # Errors
///
/// Returns `OutOfRange` / `InvalidArgument` if any op falls outside the
/// window, is unaligned, or carries a mask wider than its register.
pub fn run_program<B: RegisterBank + ?Sized>(bank: &mut B, ops: &[MaskedOp]) -> Result<Vec<u32>> {
    for op in ops {
        check_access(op.offset, op.width.bytes(), bank.len())?;
        if op.mask > op.width.max_value() {
            return Err(GpioError::invalid_argument(format!(
                "mask {:#x} wider than {}-bit register at {:#x}",
                op.mask,
                op.width.bytes() * 8,
                op.offset
            )));
        }
    }

    let mut out = Vec::with_capacity(ops.len());
    for op in ops {
        let old = read_register(bank, op.offset, op.width)?;
        if op.mask != 0 {
            let new = (old & !op.mask) | (op.value & op.mask);
            write_register(bank, op.offset, op.width, new)?;
        }
        out.push(old);
    }
    Ok(out)
}
