//! Dump the GPIO window as raw registers
//!
//! Usage: `cargo run --example raw_peek -- [offset] [count]`

use gpiomem_driver::{mmio, ByteOrder, GpioConfig, MmapBank, Result, Width};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("gpiomem_driver=debug")
        .init();

    let mut args = std::env::args().skip(1);
    let offset = args.next().and_then(|a| a.parse().ok()).unwrap_or(0);
    let count = args.next().and_then(|a| a.parse().ok()).unwrap_or(16);

    let config = GpioConfig::from_env();
    let bank = MmapBank::open(&config.device_path, config.map_len, config.map_offset, config.sync)?;

    let words = mmio::read(&bank, offset, count, Width::U32, ByteOrder::Native)?;
    for (i, word) in words.iter().enumerate() {
        println!("{:#05x}: {word:#010x}", offset + i * 4);
    }
    Ok(())
}
