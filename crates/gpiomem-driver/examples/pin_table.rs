//! Print function and level of every pin
//!
//! Runs against the real GPIO block, or with `--dry-run` against an
//! in-memory register file seeded with a few functions.

use gpiomem_driver::chip::{regs, GPIO_MAP_LEN};
use gpiomem_driver::{GpioConfig, GpioMem, MemoryBank, RegisterBank, Result};

fn print_table<B: RegisterBank>(gpio: &GpioMem<B>) -> Result<()> {
    let pins = 0..gpio.npins();
    let functions = gpio.get_function(pins.clone())?;
    let levels = gpio.read(pins.clone())?;

    println!("PIN     FUNC  LEVEL");
    for ((pin, function), level) in pins.zip(functions).zip(levels) {
        println!("GPIO{pin:<2}  {function:<4}  {}", u8::from(level));
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("gpiomem_driver=info")
        .init();

    if std::env::args().any(|a| a == "--dry-run") {
        let mut bank = MemoryBank::new(GPIO_MAP_LEN);
        // UART0 on ALT0, GPIO17 output
        bank.poke(regs::gpfsel(1), 0o44 << 12 | 0o1 << 21);
        bank.poke(regs::GPLEV0, 1 << 15 | 1 << 17);
        print_table(&GpioMem::new(bank)?)
    } else {
        print_table(&GpioMem::open(&GpioConfig::from_env())?)
    }
}
