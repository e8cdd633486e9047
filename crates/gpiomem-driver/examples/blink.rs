//! Toggle one pin a few times
//!
//! Usage: `cargo run --example blink -- [pin] [count]` (default GPIO17, 5 times)

use gpiomem_driver::{Function, GpioConfig, GpioMem, Result};
use std::thread::sleep;
use std::time::Duration;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("gpiomem_driver=info")
        .init();

    let mut args = std::env::args().skip(1);
    let pin = args.next().and_then(|a| a.parse().ok()).unwrap_or(17);
    let count: u32 = args.next().and_then(|a| a.parse().ok()).unwrap_or(5);

    let mut gpio = GpioMem::open(&GpioConfig::from_env())?;
    let saved = gpio.get_function([pin])?[0];
    println!("GPIO{pin} was {saved}");

    gpio.set_function([pin], [Function::Out])?;
    for _ in 0..count {
        gpio.output([pin], [true])?;
        sleep(Duration::from_millis(250));
        let prior = gpio.output([pin], [false])?;
        println!("GPIO{pin} read {} while driven high", u8::from(prior[0]));
        sleep(Duration::from_millis(250));
    }

    gpio.set_function([pin], [saved])?;
    println!("GPIO{pin} restored to {saved}");
    Ok(())
}
