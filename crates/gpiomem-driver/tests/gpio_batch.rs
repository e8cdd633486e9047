//! Batch semantics of the GPIO controller
//!
//! Run against the in-process register file so every register access can be
//! checked exactly.

use gpiomem_driver::chip::{regs, GPIO_MAP_LEN, NPINS};
use gpiomem_driver::{mmio, ByteOrder, Function, GpioError, GpioMem, MemoryBank, Width};

fn gpio() -> GpioMem<MemoryBank> {
    GpioMem::new(MemoryBank::new(GPIO_MAP_LEN)).expect("GPIO over memory bank")
}

/// Fill every function-select register with a recognisable pattern
fn patterned() -> GpioMem<MemoryBank> {
    let mut io = gpio();
    for (i, pattern) in (0x2BAD_0000u32..).take(regs::GPFSEL_COUNT).enumerate() {
        io.bank_mut().poke(regs::gpfsel(i), pattern);
    }
    io
}

#[test]
fn set_then_get_round_trips_every_pin_and_code() {
    for pin in 0..NPINS {
        for function in Function::ALL {
            let mut io = patterned();
            let before: Vec<Function> = io.get_function(0..NPINS).unwrap();

            io.set_function([pin], [function]).unwrap();

            let after = io.get_function(0..NPINS).unwrap();
            for (other, (b, a)) in before.iter().zip(&after).enumerate() {
                if other as u32 == pin {
                    assert_eq!(*a, function, "GPIO{pin}");
                } else {
                    assert_eq!(a, b, "GPIO{other} clobbered by GPIO{pin}");
                }
            }
        }
    }
}

#[test]
fn batch_equals_sequential_application() {
    // GPIO20..29 all live in GPFSEL2
    let a = [20u32, 23, 27];
    let b = [21u32, 22, 29];
    let codes_a = [Function::Alt0, Function::Out, Function::Alt5];
    let codes_b = [Function::Alt4, Function::Alt3, Function::In];

    let mut batched = patterned();
    batched
        .set_function(a.iter().chain(&b).copied(), codes_a.iter().chain(&codes_b).copied())
        .unwrap();

    let mut sequential = patterned();
    sequential.set_function(a, codes_a).unwrap();
    sequential.set_function(b, codes_b).unwrap();

    assert_eq!(
        batched.bank().word(regs::gpfsel(2)),
        sequential.bank().word(regs::gpfsel(2))
    );
    assert_eq!(batched.bank().writes().len(), 1);
}

#[test]
fn unchanged_values_are_a_pure_read() {
    let mut io = gpio();
    io.bank_mut().poke(regs::GPLEV0, 0x8000_0005);
    io.bank_mut().poke(regs::GPLEV1, 0x0000_0010);

    let pins = [0, 1, 2, 31, 36, 53];
    let expected = io.read(pins).unwrap();
    io.bank_mut().clear_log();

    let levels = io.write_and_read_back(pins, [None; 6]).unwrap();

    assert_eq!(levels, expected);
    assert_eq!(levels, [true, false, true, true, true, false]);
    assert!(io.bank().writes().is_empty());
}

#[test]
fn set_and_clear_masks_are_exact() {
    let mut io = gpio();
    io.write_and_read_back([3, 35], [Some(true), Some(false)])
        .unwrap();

    assert_eq!(
        io.bank().writes(),
        [(regs::GPSET0, 0x0000_0008), (regs::GPCLR1, 0x0000_0008)]
    );
}

#[test]
fn read_back_reports_level_before_the_write() {
    let mut io = gpio();
    io.bank_mut().poke(regs::GPLEV0, 0x0000_0002);

    let prior = io
        .write_and_read_back([1, 2, 4], [Some(false), Some(true), None])
        .unwrap();

    assert_eq!(prior, [true, false, false]);
    assert_eq!(
        io.bank().writes(),
        [(regs::GPSET0, 0x0000_0004), (regs::GPCLR0, 0x0000_0002)]
    );
}

#[test]
fn invalid_pin_touches_nothing() {
    let mut io = gpio();

    assert!(matches!(
        io.get_function([0, NPINS]),
        Err(GpioError::InvalidPin { pin: 54, npins: 54 })
    ));
    assert!(matches!(io.read([NPINS + 10]), Err(GpioError::InvalidPin { .. })));
    assert!(matches!(
        io.set_function([4, 60], [Function::Out, Function::Out]),
        Err(GpioError::InvalidPin { pin: 60, .. })
    ));
    assert!(matches!(
        io.write_and_read_back([2, 54], [Some(true), Some(true)]),
        Err(GpioError::InvalidPin { .. })
    ));

    assert!(io.bank().accesses().is_empty());
}

#[test]
fn output_arity_is_checked_before_io() {
    let mut io = gpio();
    assert!(matches!(
        io.write_and_read_back([1, 2, 3], [Some(true)]),
        Err(GpioError::ArityMismatch { .. })
    ));
    assert!(matches!(
        io.write_and_read_back([1], [Some(true), None]),
        Err(GpioError::ArityMismatch { .. })
    ));
    assert!(io.bank().accesses().is_empty());
}

#[test]
fn raw_level_write_decodes_through_read() {
    let mut io = gpio();
    mmio::write(
        io.bank_mut(),
        regs::GPLEV0,
        [0x0000_0005],
        Width::U32,
        ByteOrder::Native,
    )
    .unwrap();

    assert_eq!(io.read([0, 1, 2]).unwrap(), [true, false, true]);
}
