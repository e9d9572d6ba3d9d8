#![no_main]

use libfuzzer_sys::fuzz_target;
use pio_core::{decode, AddressSpace, Emulator, Program, PIO0_BASE};

const SHIFTCTRL: u32 = PIO0_BASE + 0x0d0;
const PINCTRL: u32 = PIO0_BASE + 0x0dc;
const EXECCTRL: u32 = PIO0_BASE + 0x0cc;

fuzz_target!(|data: &[u8]| {
    if data.len() < 8 {
        return;
    }

    let config = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
    let code: Vec<u16> = data[4..]
        .chunks_exact(2)
        .take(32)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();

    for &opcode in &code {
        for side_set_count in 0..=5 {
            let _ = decode(opcode, side_set_count, config & 1 != 0).to_string();
        }
    }

    let mut emulator = Emulator::default();
    let _ = emulator.load_program(0, &Program::new(None, None, code), None);
    let _ = emulator.write(PINCTRL, config & 0xe000_0000);
    let _ = emulator.write(EXECCTRL, config & 0x7ffe_0000 | 0x1f << 12);
    let _ = emulator.write(SHIFTCTRL, config & 0x03ff_0000);
    let _ = emulator.write(PIO0_BASE + 0x010, config);
    let _ = emulator.write(PIO0_BASE, 0xf);
    emulator.step(64);
    for address in (PIO0_BASE..PIO0_BASE + 0x144).step_by(4) {
        let _ = emulator.read(address);
    }
});
