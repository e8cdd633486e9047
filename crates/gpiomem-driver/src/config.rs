//! Device configuration
//!
//! Plain structs with sensible defaults. The only environment input is
//! `GPIOMEM_DEVICE`, which overrides the GPIO device node.

use gpiomem_chip::block::{Soc, DEVMEM_DEVICE, GPIOMEM_DEVICE, GPIO_MAP_LEN};
use gpiomem_chip::spidev::DEFAULT_DELAY_USECS;
use std::path::PathBuf;
use tracing::debug;

/// Environment variable overriding [`GpioConfig::device_path`]
pub const DEVICE_ENV: &str = "GPIOMEM_DEVICE";

/// Where and how to map the GPIO block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpioConfig {
    /// Device node or file to map
    pub device_path: PathBuf,

    /// Bytes to map
    pub map_len: usize,

    /// Offset of the GPIO block within the node
    pub map_offset: u64,

    /// Open with `O_SYNC` (uncached `/dev/mem` mappings)
    pub sync: bool,
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            device_path: PathBuf::from(GPIOMEM_DEVICE),
            map_len: GPIO_MAP_LEN,
            map_offset: 0,
            sync: false,
        }
    }
}

impl GpioConfig {
    /// Default configuration, with the device node taken from
    /// `GPIOMEM_DEVICE` when set
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(path) = std::env::var_os(DEVICE_ENV) {
            debug!("{DEVICE_ENV} overrides GPIO device: {}", path.to_string_lossy());
            config.device_path = PathBuf::from(path);
        }
        config
    }

    /// Map the GPIO block through `/dev/mem` at the SoC's physical address
    #[must_use]
    pub fn devmem(soc: Soc) -> Self {
        Self {
            device_path: PathBuf::from(DEVMEM_DEVICE),
            map_len: GPIO_MAP_LEN,
            map_offset: soc.gpio_base(),
            sync: true,
        }
    }
}

/// SPI bus settings, applied on every transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiConfig {
    /// Clock polarity / phase mode, 0-3
    pub mode: u32,

    /// Bus clock in Hz, 0 keeps the driver default
    pub speed_hz: u32,

    /// Delay after each transfer segment in microseconds
    pub delay_usecs: u16,
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self {
            mode: 0,
            speed_hz: 0,
            delay_usecs: DEFAULT_DELAY_USECS,
        }
    }
}

impl SpiConfig {
    /// Configuration with the given mode and clock
    #[must_use]
    pub fn new(mode: u32, speed_hz: u32) -> Self {
        Self {
            mode,
            speed_hz,
            ..Self::default()
        }
    }
}
