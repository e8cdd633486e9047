//! iCE40 FPGA configuration over GPIO + SPI
//!
//! The FPGA is configured as an SPI slave: hold CRESET_B low, release it with
//! SS asserted, then clock the bitstream in mode 2. CDONE reads low while the
//! device waits for a bitstream and goes high once it has accepted one.

use anyhow::{bail, Result};
use gpiomem_driver::{Function, GpioMem, RegisterBank, Spi, TransferDispatch};
use std::thread::sleep;
use std::time::Duration;
use tracing::{debug, info};

/// Main SPI (SPI0, CE0)
pub const SPI0_PINS: [u32; 4] = [SPI0_SCLK, SPI0_MOSI, SPI0_MISO, SPI0_SS];
pub const SPI0_SCLK: u32 = 11;
pub const SPI0_MOSI: u32 = 10;
pub const SPI0_MISO: u32 = 9;
pub const SPI0_SS: u32 = 8;

/// Load / debug SPI (SPI1, CE2)
pub const SPI1_PINS: [u32; 4] = [SPI1_SCLK, SPI1_MOSI, SPI1_MISO, SPI1_SS];
pub const SPI1_SCLK: u32 = 21;
pub const SPI1_MOSI: u32 = 20;
pub const SPI1_MISO: u32 = 19;
pub const SPI1_SS: u32 = 16;

/// 0 while configuring, 1 when the bitstream was accepted
pub const CDONE: u32 = 24;
/// 0 holds the FPGA in reset
pub const CRST: u32 = 25;

/// Clock outputs, left as inputs
pub const GCLK: [u32; 2] = [6, 5];

/// SPI bus and chip select the configuration port is wired to
pub const LOAD_BUS: (u32, u32) = (1, 2);

/// CPOL=1 CPHA=0
pub const LOAD_MODE: u32 = 2;

/// The FPGA needs 49 clocks after the bitstream; send whole bytes
pub const PADDING: usize = 7;

const SETTLE: Duration = Duration::from_millis(1);

/// Owner of the GPIO block and the configuration SPI port
#[derive(Debug)]
pub struct Ice40<B: RegisterBank, D: TransferDispatch> {
    gpio: GpioMem<B>,
    spi: Spi<D>,
}

impl<B: RegisterBank, D: TransferDispatch> Ice40<B, D> {
    /// Take both handles, switching the SPI port to mode 2
    pub fn new(gpio: GpioMem<B>, mut spi: Spi<D>) -> Result<Self> {
        spi.set_mode(LOAD_MODE)?;
        Ok(Self { gpio, spi })
    }

    pub fn gpio(&self) -> &GpioMem<B> {
        &self.gpio
    }

    pub fn spi(&self) -> &Spi<D> {
        &self.spi
    }

    /// Route both SPI ports to their pins, CDONE in, CRST out
    pub fn pins_std(&mut self) -> Result<()> {
        self.gpio.set_function(SPI0_PINS, [Function::Alt0; 4])?;
        self.gpio.set_function(SPI1_PINS, [Function::Alt4; 4])?;
        self.gpio.set_function([CDONE, CRST], [Function::In, Function::Out])?;
        self.gpio.set_function(GCLK, [Function::In; 2])?;
        Ok(())
    }

    /// Every SPI pin and CRST as plain outputs, for bit-banged debugging
    pub fn pins_manual(&mut self) -> Result<()> {
        let pins: Vec<u32> = SPI0_PINS
            .into_iter()
            .chain(SPI1_PINS)
            .chain([CRST, CDONE])
            .chain(GCLK)
            .collect();
        let functions = vec![Function::Out; pins.len()];
        self.gpio.set_function(pins, functions)?;
        Ok(())
    }

    /// Release every pin the FPGA uses back to input
    pub fn pins_off(&mut self) -> Result<()> {
        let pins: Vec<u32> = SPI0_PINS
            .into_iter()
            .chain(SPI1_PINS)
            .chain([CDONE, CRST])
            .chain(GCLK)
            .collect();
        let functions = vec![Function::In; pins.len()];
        self.gpio.set_function(pins, functions)?;
        Ok(())
    }

    /// Out of reset with configuration done
    pub fn ready(&self) -> Result<bool> {
        let levels = self.gpio.read([CDONE, CRST])?;
        let (done, reset) = (levels[0], levels[1]);
        info!("ready: done={done} reset={reset}");
        Ok(done && reset)
    }

    /// Route the pins, reset the FPGA and clock in `bitstream`
    ///
    /// SS and CRST are always left deasserted, and SS gets its previous
    /// function back, whether or not the load succeeded.
    pub fn load(&mut self, bitstream: &[u8]) -> Result<()> {
        let mut padded = Vec::with_capacity(bitstream.len() + PADDING);
        padded.extend_from_slice(bitstream);
        padded.resize(bitstream.len() + PADDING, 0);
        info!("loading {} byte bitstream", padded.len());

        self.pins_std()?;
        let saved = self.gpio.get_function([SPI1_SS])?[0];
        debug!("SPI1_SS function was {saved}");

        let outcome = self.configure(&padded);

        let restored = self
            .gpio
            .output([CRST, SPI1_SS], [true, true])
            .and_then(|_| self.gpio.set_function([SPI1_SS], [saved]));

        outcome?;
        restored?;
        Ok(())
    }

    fn configure(&mut self, padded: &[u8]) -> Result<()> {
        // Drive SS by hand for the whole load
        self.gpio.set_function([SPI1_SS], [Function::Out])?;

        self.gpio.output([CRST, SPI1_SS], [true, false])?;
        sleep(SETTLE);

        self.gpio.output([CRST], [false])?;
        sleep(SETTLE); // >= 200 ns

        self.gpio.output([CRST], [true])?;
        sleep(SETTLE); // >= 800 us

        if self.ready()? {
            bail!("iCE40 did not enter configuration (CDONE still high after reset)");
        }

        self.spi.xfer(padded, 0)?;

        if !self.ready()? {
            bail!("iCE40 rejected the bitstream (CDONE low after load)");
        }
        info!("iCE40 configured");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpiomem_driver::chip::{regs, GPIO_MAP_LEN};
    use gpiomem_driver::{MemoryBank, SpiConfig, Transfer};
    use std::cell::Cell;
    use std::rc::Rc;

    /// GPIO block whose CDONE level follows a shared flag
    #[derive(Debug)]
    struct Board {
        bank: MemoryBank,
        cdone: Rc<Cell<bool>>,
    }

    impl RegisterBank for Board {
        fn len(&self) -> usize {
            self.bank.len()
        }
        fn read_u8(&self, offset: usize) -> gpiomem_driver::Result<u8> {
            self.bank.read_u8(offset)
        }
        fn read_u16(&self, offset: usize) -> gpiomem_driver::Result<u16> {
            self.bank.read_u16(offset)
        }
        fn read_u32(&self, offset: usize) -> gpiomem_driver::Result<u32> {
            let value = self.bank.read_u32(offset)?;
            if offset != regs::GPLEV0 {
                return Ok(value);
            }
            // CRST reads back as driven
            let crst = 1 << CRST;
            let driven = self.bank.word(regs::GPSET0) & crst != 0
                && self.bank.word(regs::GPCLR0) & crst == 0;
            let mut level = value & !(1 << CDONE | crst);
            if self.cdone.get() {
                level |= 1 << CDONE;
            }
            if driven {
                level |= crst;
            }
            Ok(level)
        }
        fn write_u8(&mut self, offset: usize, value: u8) -> gpiomem_driver::Result<()> {
            self.bank.write_u8(offset, value)
        }
        fn write_u16(&mut self, offset: usize, value: u16) -> gpiomem_driver::Result<()> {
            self.bank.write_u16(offset, value)
        }
        fn write_u32(&mut self, offset: usize, value: u32) -> gpiomem_driver::Result<()> {
            // Set and clear latch the last request per pin
            match offset {
                o if o == regs::GPSET0 => {
                    let clr = self.bank.word(regs::GPCLR0) & !value;
                    self.bank.poke(regs::GPCLR0, clr);
                    self.bank.write_u32(offset, self.bank.word(offset) | value)
                }
                o if o == regs::GPCLR0 => {
                    let set = self.bank.word(regs::GPSET0) & !value;
                    self.bank.poke(regs::GPSET0, set);
                    self.bank.write_u32(offset, self.bank.word(offset) | value)
                }
                _ => self.bank.write_u32(offset, value),
            }
        }
    }

    /// Configuration port that raises CDONE when it sees the expected image
    #[derive(Debug)]
    struct Port {
        cdone: Rc<Cell<bool>>,
        accept: bool,
        modes: Vec<u32>,
        sent: Vec<u8>,
    }

    impl TransferDispatch for Port {
        fn set_mode(&mut self, mode: u32) -> gpiomem_driver::Result<()> {
            self.modes.push(mode);
            Ok(())
        }
        fn dispatch(
            &mut self,
            tx: &[u8],
            _rx: &mut [u8],
            transfers: &[Transfer],
        ) -> gpiomem_driver::Result<()> {
            assert_eq!(transfers.len(), 1);
            self.sent = tx.to_vec();
            self.cdone.set(self.accept);
            Ok(())
        }
    }

    fn loader(cdone_at_start: bool, accept: bool) -> Ice40<Board, Port> {
        let cdone = Rc::new(Cell::new(cdone_at_start));
        let mut bank = MemoryBank::new(GPIO_MAP_LEN);
        // SPI1_SS on ALT4
        bank.poke(regs::gpfsel(1), 0o3 << (3 * 6));
        let board = Board {
            bank,
            cdone: Rc::clone(&cdone),
        };
        let port = Port {
            cdone,
            accept,
            modes: Vec::new(),
            sent: Vec::new(),
        };
        let gpio = GpioMem::new(board).unwrap();
        let spi = Spi::new(port, SpiConfig::new(0, 1_000_000)).unwrap();
        Ice40::new(gpio, spi).unwrap()
    }

    fn ss_and_crst_released(fpga: &Ice40<Board, Port>) {
        let gpio = fpga.gpio();
        assert_eq!(gpio.get_function([SPI1_SS]).unwrap(), [Function::Alt4]);
        let set = gpio.bank().bank.word(regs::GPSET0);
        assert_ne!(set & (1 << SPI1_SS), 0);
        assert_ne!(set & (1 << CRST), 0);
    }

    #[test]
    fn load_sends_padded_bitstream_in_mode_2() {
        let mut fpga = loader(false, true);
        fpga.load(&[0x7E, 0xAA, 0x99, 0x7E]).unwrap();

        let port = fpga.spi().dispatcher();
        assert_eq!(port.modes, [LOAD_MODE]);
        assert_eq!(port.sent, [0x7E, 0xAA, 0x99, 0x7E, 0, 0, 0, 0, 0, 0, 0]);
        assert!(fpga.ready().unwrap());
        ss_and_crst_released(&fpga);
    }

    #[test]
    fn load_fails_if_reset_is_not_seen() {
        let mut fpga = loader(true, true);
        let err = fpga.load(&[1, 2, 3]).unwrap_err();
        assert!(err.to_string().contains("did not enter configuration"));
        assert!(fpga.spi().dispatcher().sent.is_empty());
        ss_and_crst_released(&fpga);
    }

    #[test]
    fn load_fails_if_bitstream_is_rejected() {
        let mut fpga = loader(false, false);
        let err = fpga.load(&[1, 2, 3]).unwrap_err();
        assert!(err.to_string().contains("rejected"));
        assert_eq!(fpga.spi().dispatcher().sent.len(), 3 + PADDING);
        ss_and_crst_released(&fpga);
    }

    #[test]
    fn load_routes_pins_from_power_on_state() {
        let mut fpga = loader(false, true);
        for index in 0..regs::GPFSEL_COUNT {
            fpga.gpio.bank_mut().bank.poke(regs::gpfsel(index), 0);
        }

        fpga.load(&[0xFF]).unwrap();

        let gpio = fpga.gpio();
        assert_eq!(
            gpio.get_function([CRST, CDONE]).unwrap(),
            [Function::Out, Function::In]
        );
        assert_eq!(gpio.get_function(SPI1_PINS).unwrap(), [Function::Alt4; 4]);
        assert_eq!(gpio.get_function(SPI0_PINS).unwrap(), [Function::Alt0; 4]);
    }

    #[test]
    fn manual_pins_are_all_outputs() {
        let mut fpga = loader(false, true);
        fpga.pins_manual().unwrap();
        let gpio = fpga.gpio();
        assert_eq!(gpio.get_function(SPI0_PINS).unwrap(), [Function::Out; 4]);
        assert_eq!(gpio.get_function(SPI1_PINS).unwrap(), [Function::Out; 4]);
        assert_eq!(gpio.get_function([CRST, CDONE]).unwrap(), [Function::Out; 2]);
        assert_eq!(gpio.get_function(GCLK).unwrap(), [Function::Out; 2]);
    }

    #[test]
    fn standard_pin_routing() {
        let mut fpga = loader(false, true);
        fpga.pins_std().unwrap();
        let gpio = fpga.gpio();
        assert_eq!(gpio.get_function(SPI0_PINS).unwrap(), [Function::Alt0; 4]);
        assert_eq!(gpio.get_function(SPI1_PINS).unwrap(), [Function::Alt4; 4]);
        assert_eq!(
            gpio.get_function([CDONE, CRST]).unwrap(),
            [Function::In, Function::Out]
        );

        fpga.pins_off().unwrap();
        assert_eq!(fpga.gpio().get_function(SPI1_PINS).unwrap(), [Function::In; 4]);
    }
}
