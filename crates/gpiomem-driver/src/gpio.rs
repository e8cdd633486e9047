//! GPIO function select and digital I/O
//!
//! Batch operations over the BCM2835 GPIO block:
//!
//! - [`GpioMem::get_function`] / [`GpioMem::set_function`] pack and unpack
//!   3-bit GPFSEL fields, combining every pin that shares a register into a
//!   single read-modify-write.
//! - [`GpioMem::read`] / [`GpioMem::write_and_read_back`] drive outputs through
//!   the write-only GPSET / GPCLR registers and report levels from GPLEV.
//!
//! Every pin index is validated before the first register access; an invalid
//! pin aborts the whole batch with no I/O.
//!
//! No locking is done here. GPFSEL updates are read-modify-write and race
//! with a concurrent caller touching the same register; output changes go
//! through set/clear registers and never race.

use crate::backends::MmapBank;
use crate::bank::RegisterBank;
use crate::config::GpioConfig;
use crate::error::{GpioError, Result};
use gpiomem_chip::block::GPIO_MAP_LEN;
use gpiomem_chip::function::{Function, FselField, FIELD_MASK};
use gpiomem_chip::level::PortBit;
use gpiomem_chip::regs::{self, GPFSEL_COUNT, PORT_COUNT};
use gpiomem_chip::NPINS;

/// GPIO block controller over any register bank
#[derive(Debug)]
pub struct GpioMem<B: RegisterBank> {
    bank: B,
    npins: u32,
}

impl GpioMem<MmapBank> {
    /// Map the GPIO block described by `config`
    ///
    /// # Errors
    ///
    /// Returns error if the device node cannot be opened or mapped.
    pub fn open(config: &GpioConfig) -> Result<Self> {
        let bank = MmapBank::open(
            &config.device_path,
            config.map_len,
            config.map_offset,
            config.sync,
        )?;
        Self::new(bank)
    }
}

impl<B: RegisterBank> GpioMem<B> {
    /// Wrap an already mapped bank
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` if the bank is smaller than the GPIO block.
    pub fn new(bank: B) -> Result<Self> {
        if bank.len() < GPIO_MAP_LEN {
            return Err(GpioError::out_of_range(0, GPIO_MAP_LEN, bank.len()));
        }
        Ok(Self { bank, npins: NPINS })
    }

    /// Number of I/O pins
    #[must_use]
    pub const fn npins(&self) -> u32 {
        self.npins
    }

    /// Underlying register bank
    #[must_use]
    pub const fn bank(&self) -> &B {
        &self.bank
    }

    /// Mutable access to the underlying register bank
    pub fn bank_mut(&mut self) -> &mut B {
        &mut self.bank
    }

    /// Release the register bank
    pub fn into_bank(self) -> B {
        self.bank
    }

    fn check_pin(&self, pin: u32) -> Result<u32> {
        if pin >= self.npins {
            return Err(GpioError::InvalidPin {
                pin,
                npins: self.npins,
            });
        }
        Ok(pin)
    }

    fn check_pins(&self, pins: impl IntoIterator<Item = u32>) -> Result<Vec<u32>> {
        pins.into_iter().map(|p| self.check_pin(p)).collect()
    }

    /// Current function of each pin, in request order
    ///
    /// All six GPFSEL registers are read once, so the batch reflects a single
    /// snapshot.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPin` (with no register access) if any pin is out of range.
    pub fn get_function(&self, pins: impl IntoIterator<Item = u32>) -> Result<Vec<Function>> {
        let pins = self.check_pins(pins)?;

        let mut snapshot = [0u32; GPFSEL_COUNT];
        for (index, slot) in snapshot.iter_mut().enumerate() {
            *slot = self.bank.read_u32(regs::gpfsel(index))?;
        }

        Ok(pins
            .into_iter()
            .map(|pin| {
                let field = FselField::of(pin);
                let code = field.extract(snapshot[field.register]);
                Function::ALL[code as usize]
            })
            .collect())
    }

    /// Assign functions to pins
    ///
    /// `codes` pairs positionally with `pins` and accepts either [`Function`]
    /// values or raw 3-bit codes. Masks for the whole batch are built first;
    /// each affected GPFSEL register then gets exactly one read-modify-write,
    /// and registers no pin maps to are not touched.
    ///
    /// # Errors
    ///
    /// Returns, before any register access:
    /// - `InvalidPin` if a pin is out of range
    /// - `InvalidFunctionCode` if a code is above 7
    /// - `ArityMismatch` if `codes` is shorter or longer than `pins`
    pub fn set_function<P, C>(&mut self, pins: P, codes: C) -> Result<()>
    where
        P: IntoIterator<Item = u32>,
        C: IntoIterator,
        C::Item: Into<u32>,
    {
        let mut write_mask = [0u32; GPFSEL_COUNT];
        let mut value_mask = [0u32; GPFSEL_COUNT];
        let mut codes = codes.into_iter();

        for (position, pin) in pins.into_iter().enumerate() {
            let pin = self.check_pin(pin)?;
            let code: u32 = codes
                .next()
                .ok_or_else(|| {
                    GpioError::arity_mismatch(format!(
                        "ran out of function codes at pin #{position} (GPIO{pin})"
                    ))
                })?
                .into();
            if code > FIELD_MASK {
                return Err(GpioError::InvalidFunctionCode { code });
            }

            let field = FselField::of(pin);
            write_mask[field.register] |= field.mask();
            value_mask[field.register] |= code << field.shift;
        }
        if codes.next().is_some() {
            return Err(GpioError::arity_mismatch("more function codes than pins"));
        }

        for (index, (&mask, &value)) in write_mask.iter().zip(&value_mask).enumerate() {
            if mask == 0 {
                continue;
            }
            let offset = regs::gpfsel(index);
            let old = self.bank.read_u32(offset)?;
            let new = (old & !mask) | (value & mask);
            tracing::debug!("GPFSEL{index}: {old:#010x} -> {new:#010x}");
            self.bank.write_u32(offset, new)?;
        }
        Ok(())
    }

    fn level_snapshot(&self) -> Result<[u32; PORT_COUNT]> {
        let mut levels = [0u32; PORT_COUNT];
        for (slot, &offset) in levels.iter_mut().zip(&regs::GPLEV) {
            *slot = self.bank.read_u32(offset)?;
        }
        Ok(levels)
    }

    /// Current level of each pin, in request order
    ///
    /// Both GPLEV registers are read once.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPin` (with no register access) if any pin is out of range.
    pub fn read(&self, pins: impl IntoIterator<Item = u32>) -> Result<Vec<bool>> {
        let pins = self.check_pins(pins)?;
        let levels = self.level_snapshot()?;
        Ok(pins
            .into_iter()
            .map(|pin| {
                let bit = PortBit::of(pin);
                bit.is_set(levels[bit.port])
            })
            .collect())
    }

    /// Drive outputs and return each pin's level from before this call
    ///
    /// `values` pairs positionally with `pins`: `Some(true)` drives high,
    /// `Some(false)` drives low, `None` leaves the pin alone. The returned
    /// level for every pin comes from a GPLEV snapshot taken before any
    /// output change, so it never reflects the change just requested.
    ///
    /// At most four registers are written, in order GPSET0, GPSET1, GPCLR0,
    /// GPCLR1, and only those with a non-empty mask. A batch where every value
    /// is `None` is a pure read.
    ///
    /// # Errors
    ///
    /// Returns, before any register access:
    /// - `InvalidPin` if a pin is out of range
    /// - `ArityMismatch` if `values` is shorter or longer than `pins`
    pub fn write_and_read_back<P, V>(&mut self, pins: P, values: V) -> Result<Vec<bool>>
    where
        P: IntoIterator<Item = u32>,
        V: IntoIterator<Item = Option<bool>>,
    {
        let mut set_mask = [0u32; PORT_COUNT];
        let mut clear_mask = [0u32; PORT_COUNT];
        let mut values = values.into_iter();
        let mut bits = Vec::new();

        for (position, pin) in pins.into_iter().enumerate() {
            let pin = self.check_pin(pin)?;
            let value = values.next().ok_or_else(|| {
                GpioError::arity_mismatch(format!(
                    "ran out of output values at pin #{position} (GPIO{pin})"
                ))
            })?;

            let bit = PortBit::of(pin);
            match value {
                Some(true) => set_mask[bit.port] |= bit.mask(),
                Some(false) => clear_mask[bit.port] |= bit.mask(),
                None => {}
            }
            bits.push(bit);
        }
        if values.next().is_some() {
            return Err(GpioError::arity_mismatch("more output values than pins"));
        }

        let levels = self.level_snapshot()?;
        let prior = bits.iter().map(|bit| bit.is_set(levels[bit.port])).collect();

        let mut latch = OutputLatch::new(&mut self.bank);
        for (port, &mask) in set_mask.iter().enumerate() {
            latch.assert_bits(port, mask)?;
        }
        for (port, &mask) in clear_mask.iter().enumerate() {
            latch.deassert_bits(port, mask)?;
        }

        Ok(prior)
    }

    /// Drive every pin in `pins` to the paired level
    ///
    /// Returns the levels from before the change, like
    /// [`write_and_read_back`](Self::write_and_read_back).
    ///
    /// # Errors
    ///
    /// Same as [`write_and_read_back`](Self::write_and_read_back).
    pub fn output<P, V>(&mut self, pins: P, levels: V) -> Result<Vec<bool>>
    where
        P: IntoIterator<Item = u32>,
        V: IntoIterator<Item = bool>,
    {
        self.write_and_read_back(pins, levels.into_iter().map(Some))
    }
}

/// Write-only view of the GPSET / GPCLR register pairs
///
/// Set and clear are two disjoint channels: a 1 bit drives the pin, a 0 bit
/// leaves it alone. There is no read or read-modify-write here.
#[derive(Debug)]
pub struct OutputLatch<'a, B: RegisterBank> {
    bank: &'a mut B,
}

impl<'a, B: RegisterBank> OutputLatch<'a, B> {
    /// Borrow a bank's set / clear registers
    pub fn new(bank: &'a mut B) -> Self {
        Self { bank }
    }

    /// Drive the pins in `mask` high on `port` (0 or 1)
    ///
    /// An empty mask issues no write.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a port other than 0 or 1, or the bank's
    /// error if the write fails.
    pub fn assert_bits(&mut self, port: usize, mask: u32) -> Result<()> {
        self.drive(&regs::GPSET, port, mask)
    }

    /// Drive the pins in `mask` low on `port` (0 or 1)
    ///
    /// An empty mask issues no write.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for a port other than 0 or 1, or the bank's
    /// error if the write fails.
    pub fn deassert_bits(&mut self, port: usize, mask: u32) -> Result<()> {
        self.drive(&regs::GPCLR, port, mask)
    }

    fn drive(&mut self, registers: &[usize; PORT_COUNT], port: usize, mask: u32) -> Result<()> {
        let offset = *registers
            .get(port)
            .ok_or_else(|| GpioError::invalid_argument(format!("no output port {port}")))?;
        if mask == 0 {
            return Ok(());
        }
        tracing::trace!("drive {offset:#04x} <- {mask:#010x}");
        self.bank.write_u32(offset, mask)
    }
}
