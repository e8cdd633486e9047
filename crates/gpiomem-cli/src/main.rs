//! `gpiomem`: command-line access to the BCM283x GPIO block and spidev.
//!
//! ```text
//! USAGE:
//!   gpiomem pins                         Function and level of every pin
//!   gpiomem getalt <pin>...              Read pin functions
//!   gpiomem setalt <pin=func>...         Change pin functions (IN, OUT, ALT0-5 or 0-7)
//!   gpiomem input <pin>...               Read pin levels
//!   gpiomem output <pin=0|1|->...        Drive pins, print prior levels
//!   gpiomem peek <offset> [count]        Raw register read
//!   gpiomem poke <offset> <value>...     Raw register write
//!   gpiomem xfer <hex>                   SPI transfer on /dev/spidevB.D
//!   gpiomem ice40 load <bitfile>         Configure an iCE40 FPGA
//! ```
//!
//! `--dry-run` runs the GPIO commands against an in-memory register file and
//! prints every register access instead of touching hardware.

mod ice40;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use gpiomem_driver::chip::{Soc, GPIO_MAP_LEN};
use gpiomem_driver::{
    build_transfers, mmio, Access, ByteOrder, Function, GpioConfig, GpioMem, MemoryBank,
    RegisterBank, Spi, SpiConfig, Width,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gpiomem", about = "BCM283x GPIO and SPI access", version)]
struct Cli {
    #[command(flatten)]
    target: Target,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Args)]
struct Target {
    /// GPIO device node (default: $GPIOMEM_DEVICE or /dev/gpiomem).
    #[arg(long, global = true)]
    device: Option<PathBuf>,

    /// Map through /dev/mem at this SoC's physical GPIO address.
    #[arg(long, global = true, value_enum, conflicts_with = "device")]
    devmem: Option<SocArg>,

    /// Use an in-memory register file and log every access.
    #[arg(long, global = true)]
    dry_run: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum SocArg {
    Bcm2835,
    Bcm2837,
    Bcm2711,
}

impl From<SocArg> for Soc {
    fn from(soc: SocArg) -> Self {
        match soc {
            SocArg::Bcm2835 => Self::Bcm2835,
            SocArg::Bcm2837 => Self::Bcm2837,
            SocArg::Bcm2711 => Self::Bcm2711,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OrderArg {
    Native,
    Little,
    Big,
}

impl From<OrderArg> for ByteOrder {
    fn from(order: OrderArg) -> Self {
        match order {
            OrderArg::Native => Self::Native,
            OrderArg::Little => Self::Little,
            OrderArg::Big => Self::Big,
        }
    }
}

#[derive(Subcommand)]
enum Cmd {
    /// Print function and level of every pin.
    Pins,
    /// Read the function of each pin.
    Getalt {
        #[arg(required = true, value_parser = parse_u32)]
        pins: Vec<u32>,
    },
    /// Change pin functions in one batch.
    Setalt {
        /// PIN=FUNC pairs, e.g. 17=out 18=alt5 4=0.
        #[arg(required = true)]
        assignments: Vec<String>,
    },
    /// Read the level of each pin.
    Input {
        #[arg(required = true, value_parser = parse_u32)]
        pins: Vec<u32>,
    },
    /// Drive pins high or low; `-` leaves a pin unchanged.
    Output {
        /// PIN=LEVEL pairs, e.g. 17=1 27=0 22=-.
        #[arg(required = true)]
        assignments: Vec<String>,
    },
    /// Read registers from the GPIO window.
    Peek {
        #[arg(value_parser = parse_usize)]
        offset: usize,
        #[arg(default_value_t = 1)]
        count: usize,
        #[command(flatten)]
        format: Format,
    },
    /// Write consecutive registers into the GPIO window.
    Poke {
        #[arg(value_parser = parse_usize)]
        offset: usize,
        #[arg(required = true, value_parser = parse_u32)]
        values: Vec<u32>,
        #[command(flatten)]
        format: Format,
    },
    /// Full-duplex SPI transfer.
    Xfer {
        /// Bytes to send, as hex (e.g. aabbcc).
        data: String,
        #[command(flatten)]
        bus: Bus,
        /// Clock only this many bits of the last byte (0 = all 8).
        #[arg(long, default_value_t = 0)]
        extra_bits: u8,
    },
    /// iCE40 FPGA configuration.
    Ice40 {
        #[command(subcommand)]
        command: Ice40Cmd,
    },
}

#[derive(Args)]
struct Format {
    /// Register width in bits.
    #[arg(long, default_value_t = 32)]
    width: u32,
    #[arg(long, value_enum, default_value = "native")]
    order: OrderArg,
}

#[derive(Args)]
struct Bus {
    #[arg(long, default_value_t = 0)]
    bus: u32,
    #[arg(long = "cs", default_value_t = 0)]
    device: u32,
    #[arg(long, default_value_t = 0)]
    mode: u32,
    /// Clock in Hz (0 = driver default).
    #[arg(long, default_value_t = 0)]
    speed: u32,
}

#[derive(Subcommand)]
enum Ice40Cmd {
    /// Reset the FPGA and load a bitstream.
    Load {
        bitfile: PathBuf,
        /// SPI clock in Hz (0 = driver default).
        #[arg(long, default_value_t = 0)]
        speed: u32,
    },
    /// Report CDONE / CRST.
    Status,
    /// Route the SPI, CDONE and CRST pins for normal operation.
    PinsStd,
    /// Switch the SPI and CRST pins to plain outputs for bit-banging.
    PinsManual,
    /// Return every FPGA pin to input.
    PinsOff,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Cmd::Xfer {
            data,
            bus,
            extra_bits,
        } => cmd_xfer(&data, &bus, extra_bits, cli.target.dry_run),
        Cmd::Ice40 { command } => {
            if cli.target.dry_run {
                bail!("ice40 commands need hardware");
            }
            cmd_ice40(command, &cli.target)
        }
        command if cli.target.dry_run => {
            let mut gpio = GpioMem::new(MemoryBank::new(GPIO_MAP_LEN))?;
            run_gpio(&mut gpio, command)?;
            for access in gpio.bank().accesses() {
                print_access(access);
            }
            Ok(())
        }
        command => {
            let mut gpio = GpioMem::open(&gpio_config(&cli.target))?;
            run_gpio(&mut gpio, command)
        }
    }
}

fn gpio_config(target: &Target) -> GpioConfig {
    let mut config = match target.devmem {
        Some(soc) => GpioConfig::devmem(soc.into()),
        None => GpioConfig::from_env(),
    };
    if let Some(device) = &target.device {
        config.device_path.clone_from(device);
    }
    config
}

fn run_gpio<B: RegisterBank>(gpio: &mut GpioMem<B>, command: Cmd) -> Result<()> {
    match command {
        Cmd::Pins => cmd_pins(gpio),
        Cmd::Getalt { pins } => cmd_getalt(gpio, &pins),
        Cmd::Setalt { assignments } => cmd_setalt(gpio, &assignments),
        Cmd::Input { pins } => cmd_input(gpio, &pins),
        Cmd::Output { assignments } => cmd_output(gpio, &assignments),
        Cmd::Peek {
            offset,
            count,
            format,
        } => cmd_peek(gpio.bank(), offset, count, &format),
        Cmd::Poke {
            offset,
            values,
            format,
        } => cmd_poke(gpio.bank_mut(), offset, &values, &format),
        Cmd::Xfer { .. } | Cmd::Ice40 { .. } => bail!("not a GPIO register command"),
    }
}

fn cmd_pins<B: RegisterBank>(gpio: &GpioMem<B>) -> Result<()> {
    let pins = 0..gpio.npins();
    let functions = gpio.get_function(pins.clone())?;
    let levels = gpio.read(pins.clone())?;

    for ((pin, function), level) in pins.zip(functions).zip(levels) {
        println!("GPIO{pin:<2}  {function:<4}  {}", u8::from(level));
    }
    Ok(())
}

fn cmd_getalt<B: RegisterBank>(gpio: &GpioMem<B>, pins: &[u32]) -> Result<()> {
    let functions = gpio.get_function(pins.iter().copied())?;
    for (pin, function) in pins.iter().zip(functions) {
        println!("GPIO{pin:<2}  {function}");
    }
    Ok(())
}

fn cmd_setalt<B: RegisterBank>(gpio: &mut GpioMem<B>, assignments: &[String]) -> Result<()> {
    let (pins, codes): (Vec<u32>, Vec<u32>) = assignments
        .iter()
        .map(|a| -> Result<(u32, u32)> {
            let (pin, func) = split_assignment(a)?;
            Ok((pin, parse_function(func)?))
        })
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .unzip();

    gpio.set_function(pins, codes)?;
    Ok(())
}

fn cmd_input<B: RegisterBank>(gpio: &GpioMem<B>, pins: &[u32]) -> Result<()> {
    let levels = gpio.read(pins.iter().copied())?;
    for (pin, level) in pins.iter().zip(levels) {
        println!("GPIO{pin:<2}  {}", u8::from(level));
    }
    Ok(())
}

fn cmd_output<B: RegisterBank>(gpio: &mut GpioMem<B>, assignments: &[String]) -> Result<()> {
    let (pins, values): (Vec<u32>, Vec<Option<bool>>) = assignments
        .iter()
        .map(|a| -> Result<(u32, Option<bool>)> {
            let (pin, level) = split_assignment(a)?;
            let value = match level {
                "1" | "high" => Some(true),
                "0" | "low" => Some(false),
                "-" => None,
                other => bail!("bad level {other:?} for GPIO{pin} (expected 0, 1 or -)"),
            };
            Ok((pin, value))
        })
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .unzip();

    let prior = gpio.write_and_read_back(pins.iter().copied(), values)?;
    for (pin, level) in pins.iter().zip(prior) {
        println!("GPIO{pin:<2}  was {}", u8::from(level));
    }
    Ok(())
}

fn cmd_peek<B: RegisterBank>(bank: &B, offset: usize, count: usize, format: &Format) -> Result<()> {
    let width = Width::from_bits(format.width)?;
    let values = mmio::read(bank, offset, count, width, format.order.into())?;
    let digits = width.bytes() * 2;
    for (i, value) in values.iter().enumerate() {
        println!("{:#06x}: {value:#0w$x}", offset + i * width.bytes(), w = digits + 2);
    }
    Ok(())
}

fn cmd_poke<B: RegisterBank>(
    bank: &mut B,
    offset: usize,
    values: &[u32],
    format: &Format,
) -> Result<()> {
    let width = Width::from_bits(format.width)?;
    let written = mmio::write(bank, offset, values.iter().copied(), width, format.order.into())?;
    tracing::info!("wrote {written} register(s) at {offset:#x}");
    Ok(())
}

fn cmd_xfer(data: &str, bus: &Bus, extra_bits: u8, dry_run: bool) -> Result<()> {
    let tx = parse_hex(data)?;
    let config = SpiConfig::new(bus.mode, bus.speed);

    if dry_run {
        for t in build_transfers(&tx, extra_bits, &config)? {
            println!(
                "{:3} byte(s) at {:3}  {} bit(s)/word  {} Hz  {} us",
                t.len, t.offset, t.bits_per_word, t.speed_hz, t.delay_usecs
            );
        }
        return Ok(());
    }

    let mut spi = Spi::open(bus.bus, bus.device, config)?;
    let rx = spi.xfer(&tx, extra_bits)?;
    println!("{}", to_hex(&rx));
    Ok(())
}

fn cmd_ice40(command: Ice40Cmd, target: &Target) -> Result<()> {
    let gpio = GpioMem::open(&gpio_config(target))?;
    let (bus, device) = ice40::LOAD_BUS;
    let speed = match command {
        Ice40Cmd::Load { speed, .. } => speed,
        _ => 0,
    };
    let spi = Spi::open(bus, device, SpiConfig::new(ice40::LOAD_MODE, speed))?;
    let mut fpga = ice40::Ice40::new(gpio, spi)?;

    match command {
        Ice40Cmd::Load { bitfile, .. } => {
            let bitstream = std::fs::read(&bitfile)
                .with_context(|| format!("reading {}", bitfile.display()))?;
            fpga.load(&bitstream)?;
            println!(
                "loaded {} bytes from {} over {}",
                bitstream.len(),
                bitfile.display(),
                fpga.spi().dispatcher().path().display()
            );
        }
        Ice40Cmd::Status => {
            let levels = fpga.gpio().read([ice40::CDONE, ice40::CRST])?;
            println!("CDONE={}  CRST={}", u8::from(levels[0]), u8::from(levels[1]));
            println!("{}", if fpga.ready()? { "ready" } else { "not ready" });
        }
        Ice40Cmd::PinsStd => fpga.pins_std()?,
        Ice40Cmd::PinsManual => fpga.pins_manual()?,
        Ice40Cmd::PinsOff => fpga.pins_off()?,
    }
    Ok(())
}

fn print_access(access: Access) {
    match access {
        Access::Read { offset, width } => println!("read  {offset:#06x} ({width})"),
        Access::Write {
            offset,
            width,
            value,
        } => println!("write {offset:#06x} ({width}) = {value:#010x}"),
    }
}

fn split_assignment(assignment: &str) -> Result<(u32, &str)> {
    let (pin, rhs) = assignment
        .split_once('=')
        .ok_or_else(|| anyhow!("expected PIN=VALUE, got {assignment:?}"))?;
    Ok((parse_u32(pin)?, rhs))
}

fn parse_function(s: &str) -> Result<u32> {
    if let Some(f) = Function::from_name(s) {
        return Ok(f.code());
    }
    // Numeric codes are passed through; the driver rejects anything above 7
    parse_u32(s).map_err(|_| anyhow!("unknown function {s:?}"))
}

fn parse_u32(s: &str) -> Result<u32> {
    let value = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    value.with_context(|| format!("invalid number {s:?}"))
}

fn parse_usize(s: &str) -> Result<usize> {
    Ok(usize::try_from(parse_u32(s)?)?)
}

fn parse_hex(s: &str) -> Result<Vec<u8>> {
    let s = s.trim_start_matches("0x");
    if !s.is_ascii() || s.len() % 2 != 0 {
        bail!("hex data must be an even number of hex digits");
    }
    (0..s.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&s[i..i + 2], 16).with_context(|| format!("invalid hex {s:?}"))
        })
        .collect()
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
