//! GPIO and raw register access through a real mapping
//!
//! A temporary file stands in for `/dev/gpiomem`: the register file is mapped
//! exactly as the device node would be, and results are checked by reading
//! the file back.

use gpiomem_driver::chip::{regs, GPIO_MAP_LEN};
use gpiomem_driver::{mmio, ByteOrder, Function, GpioConfig, GpioMem, MaskedOp, MmapBank, Width};
use std::io::{Read, Seek, SeekFrom, Write};
use tempfile::NamedTempFile;

/// 0x200 bytes of `0x2bad0000 + n` words, as a stand-in register file
fn register_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for n in 0..0x200u32 / 4 {
        file.write_all(&(0x2BAD_0000 + n).to_le_bytes()).unwrap();
    }
    file.flush().unwrap();
    file
}

fn put_words(file: &mut NamedTempFile, offset: u64, words: &[u32]) {
    file.seek(SeekFrom::Start(offset)).unwrap();
    for w in words {
        file.write_all(&w.to_le_bytes()).unwrap();
    }
    file.flush().unwrap();
}

fn get_words(file: &mut NamedTempFile, offset: u64, count: usize) -> Vec<u32> {
    file.seek(SeekFrom::Start(offset)).unwrap();
    (0..count)
        .map(|_| {
            let mut raw = [0u8; 4];
            file.read_exact(&mut raw).unwrap();
            u32::from_le_bytes(raw)
        })
        .collect()
}

fn open_gpio(file: &NamedTempFile) -> GpioMem<MmapBank> {
    let config = GpioConfig {
        device_path: file.path().to_path_buf(),
        ..GpioConfig::default()
    };
    GpioMem::open(&config).unwrap()
}

#[test]
#[cfg(target_endian = "little")]
fn getalt_through_mapping() {
    let mut file = register_file();
    let io = open_gpio(&file);

    put_words(&mut file, 0, &[0x001F_803F]);
    assert_eq!(io.get_function([0, 1, 6, 5]).unwrap(), [Function::Alt3; 4]);

    put_words(&mut file, 0, &[0x1234_5678]);
    assert_eq!(
        io.get_function([0, 1, 6, 5]).unwrap(),
        [Function::In, Function::Alt3, Function::Alt1, Function::In]
    );
}

#[test]
#[cfg(target_endian = "little")]
fn setalt_through_mapping() {
    let mut file = register_file();
    let words = [
        0x1234_5678,
        0xABCD_EF01,
        0x0203_0405,
        0x0607_0809,
        0x0A0B_0C0D,
        0x0E0F_1122,
    ];
    put_words(&mut file, 0, &words);

    let mut io = open_gpio(&file);
    io.set_function([0, 11, 14], [7u32, 6, 0]).unwrap();
    io.bank().flush().unwrap();

    assert_eq!(
        get_words(&mut file, 0, 6),
        [
            0x1234_567F,
            0xABCD_8F31,
            0x0203_0405,
            0x0607_0809,
            0x0A0B_0C0D,
            0x0E0F_1122,
        ]
    );
    assert_eq!(
        io.get_function([0, 11, 14]).unwrap(),
        [Function::Alt3, Function::Alt2, Function::In]
    );
}

#[test]
#[cfg(target_endian = "little")]
fn output_through_mapping() {
    let mut file = register_file();
    put_words(&mut file, regs::GPSET0 as u64, &[0, 0]);
    put_words(&mut file, regs::GPCLR0 as u64, &[0, 0]);

    let mut io = open_gpio(&file);
    io.output([0, 4, 30, 31, 32, 40], [true, true, false, true, true, true])
        .unwrap();
    io.bank().flush().unwrap();

    assert_eq!(get_words(&mut file, regs::GPSET0 as u64, 2), [0x8000_0011, 0x0000_0101]);
    assert_eq!(get_words(&mut file, regs::GPCLR0 as u64, 2), [0x4000_0000, 0x0000_0000]);
}

#[test]
fn raw_access_of_mixed_widths() {
    let mut file = register_file();
    file.seek(SeekFrom::Start(0)).unwrap();
    file.write_all(&0x1234_5678_u32.to_ne_bytes()).unwrap();
    file.write_all(&0x0102_u16.to_ne_bytes()).unwrap();
    file.write_all(&0x0304_u16.to_ne_bytes()).unwrap();
    file.write_all(&[0x50, 0x60, 0x70, 0x80]).unwrap();
    file.flush().unwrap();

    let mut bank = MmapBank::open(file.path(), 12, 0, false).unwrap();

    let out = mmio::run_program(
        &mut bank,
        &[
            MaskedOp::read(0, Width::U32),
            MaskedOp::read(4, Width::U16),
            MaskedOp::read(6, Width::U16),
            MaskedOp::read(8, Width::U8),
            MaskedOp::read(9, Width::U8),
            MaskedOp::read(10, Width::U8),
            MaskedOp::read(11, Width::U8),
        ],
    )
    .unwrap();
    assert_eq!(out, [0x1234_5678, 0x0102, 0x0304, 0x50, 0x60, 0x70, 0x80]);

    mmio::write(&mut bank, 0, [0x0ABC_0DEF], Width::U32, ByteOrder::Native).unwrap();
    assert_eq!(mmio::read(&bank, 0, 1, Width::U32, ByteOrder::Native).unwrap(), [0x0ABC_0DEF]);

    mmio::write(&mut bank, 0, [0xABCD], Width::U16, ByteOrder::Native).unwrap();
    assert_eq!(mmio::read(&bank, 0, 1, Width::U16, ByteOrder::Native).unwrap(), [0xABCD]);

    mmio::write(&mut bank, 0, [0xCF], Width::U8, ByteOrder::Native).unwrap();
    assert_eq!(mmio::read(&bank, 0, 1, Width::U8, ByteOrder::Native).unwrap(), [0xCF]);
}

#[test]
fn small_mapping_is_not_a_gpio_block() {
    let file = register_file();
    let bank = MmapBank::open(file.path(), GPIO_MAP_LEN / 2, 0, false).unwrap();
    assert!(GpioMem::new(bank).is_err());
}

#[test]
#[ignore] // Requires /dev/gpiomem on a Raspberry Pi
fn test_gpiomem_device() {
    let io = GpioMem::open(&GpioConfig::from_env()).expect("map /dev/gpiomem");
    let functions = io.get_function(0..io.npins()).expect("read GPFSEL");
    let levels = io.read(0..io.npins()).expect("read GPLEV");
    for (pin, (f, l)) in functions.iter().zip(&levels).enumerate() {
        println!("GPIO{pin:<2} {f:<4} {}", u8::from(*l));
    }
}
