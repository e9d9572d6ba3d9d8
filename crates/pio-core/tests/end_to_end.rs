//! Programs running through the public register interface.

use pio_core::{
    AddressSpace, Emulator, Program, FUNCSEL_PIO0, IO_BANK0_BASE, PICO_EMU_BASE, PIO0_BASE,
    PIO1_BASE, PIO_EMU_OFFSET,
};
use log as _;
use proptest as _;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

const CTRL: u32 = 0x000;
const FLEVEL: u32 = 0x00c;
const TXF0: u32 = 0x010;
const RXF0: u32 = 0x020;
const DBG_PADOUT: u32 = 0x03c;
const SM0_CLKDIV: u32 = 0x0c8;
const SM0_SHIFTCTRL: u32 = 0x0d0;
const SM0_ADDR: u32 = 0x0d4;
const SM0_PINCTRL: u32 = 0x0dc;
const EMU_REGX: u32 = PIO_EMU_OFFSET;
const EMU_DELAY_CYCLE: u32 = PIO_EMU_OFFSET + 0x44;

const SQUAREWAVE: &str = "\
# .program squarewave
e081
e101
e000
0001
";

fn load(emulator: &mut Emulator, pio: usize, text: &str) {
    let program = Program::parse(text).expect("valid program");
    emulator.load_program(pio, &program, None).expect("program fits");
}

#[test]
fn pull_then_out_moves_fifo_bit_into_x() {
    let mut emulator = Emulator::default();
    load(&mut emulator, 0, "80a0\n6021\n");
    emulator.write(PIO0_BASE + TXF0, 0b1).expect("push");
    emulator.write(PIO0_BASE + CTRL, 1).expect("enable");

    emulator.step(1);
    assert_eq!(emulator.peek(PIO0_BASE + FLEVEL), Ok(0));
    emulator.step(1);
    assert_eq!(emulator.peek(PIO0_BASE + EMU_REGX), Ok(1));
    assert_eq!(emulator.peek(PIO0_BASE + SM0_ADDR), Ok(2));
}

#[test]
fn squarewave_toggles_with_delay() {
    let mut emulator = Emulator::default();
    load(&mut emulator, 0, SQUAREWAVE);
    emulator.write(PIO0_BASE + SM0_PINCTRL, 1 << 26).expect("pinctrl");
    emulator.write(PIO0_BASE + CTRL, 1).expect("enable");

    let mut levels = Vec::new();
    let mut delay_cycles = Vec::new();
    for _ in 0..9 {
        emulator.step(1);
        levels.push(emulator.peek(PIO0_BASE + DBG_PADOUT).expect("padout") & 1);
        delay_cycles.push(emulator.peek(PIO0_BASE + EMU_DELAY_CYCLE).expect("delay"));
    }
    assert_eq!(levels, [0, 1, 1, 0, 0, 1, 1, 0, 0]);
    assert_eq!(delay_cycles, [0, 0, 1, 0, 0, 0, 1, 0, 0]);
}

#[test]
fn squarewave_reaches_gpio_when_selected() {
    let mut emulator = Emulator::default();
    load(&mut emulator, 1, SQUAREWAVE);
    emulator.write(PIO1_BASE + SM0_PINCTRL, 1 << 26 | 7 << 5).expect("pinctrl");
    emulator
        .write(IO_BANK0_BASE + 8 * 7 + 4, u32::from(FUNCSEL_PIO0) + 1)
        .expect("funcsel pio1");
    emulator.write(PIO1_BASE + CTRL, 1).expect("enable");
    emulator.step(2);
    let status = emulator.peek(IO_BANK0_BASE + 8 * 7).expect("status");
    assert_eq!(status & 1 << 17, 1 << 17);
}

#[rstest]
#[case(1, [1, 2, 3, 4])]
#[case(2, [0, 1, 1, 2])]
#[case(3, [0, 0, 1, 1])]
fn clock_divider_paces_execution(#[case] divider: u32, #[case] expected: [u32; 4]) {
    let mut emulator = Emulator::default();
    load(&mut emulator, 0, "e021\ne022\ne023\ne024\ne025\n");
    emulator.write(PIO0_BASE + SM0_CLKDIV, divider << 16).expect("clkdiv");
    emulator.write(PIO0_BASE + CTRL, 1).expect("enable");
    let mut pcs = [0; 4];
    for pc in &mut pcs {
        emulator.step(1);
        *pc = emulator.peek(PIO0_BASE + SM0_ADDR).expect("addr");
    }
    assert_eq!(pcs, expected);
}

#[test]
fn autopush_counter_streams_to_host() {
    // set x, 5 ; loop: in x, 8 ; jmp x-- loop ; wrap to top
    let mut emulator = Emulator::default();
    load(&mut emulator, 0, "e025\n4028\n0041\n");
    // autopush at 8 bits, shift left
    emulator
        .write(PIO0_BASE + SM0_SHIFTCTRL, 1 << 16 | 8 << 20)
        .expect("shiftctrl");
    emulator.write(PIO0_BASE + CTRL, 1).expect("enable");
    emulator.step(1 + 2 * 3);
    let mut words = Vec::new();
    for _ in 0..3 {
        words.push(emulator.read(PIO0_BASE + RXF0).expect("rx"));
    }
    assert_eq!(words, [5, 4, 3]);
}

#[test]
fn wallclock_counts_completed_cycles() {
    let mut emulator = Emulator::default();
    emulator.step(7);
    emulator.trigger_cycle_phase0();
    assert_eq!(emulator.peek(PICO_EMU_BASE), Ok(7));
    assert_eq!(emulator.peek(PICO_EMU_BASE + 0x04), Ok(0));
    emulator.trigger_cycle_phase1();
    assert_eq!(emulator.peek(PICO_EMU_BASE), Ok(8));
}
