//! Blocking wait against a concurrently stepped emulator.

use std::thread;
use std::time::{Duration, Instant};

use pio_core::{
    CancelToken, EmulatorConfig, FifoDirection, Program, RegisterService, Request, Response,
    SharedEmulator, WaitStatus, PIO0_BASE,
};
use log as _;
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

const CTRL: u32 = PIO0_BASE;
const FLEVEL: u32 = PIO0_BASE + 0x00c;
const RXF0: u32 = PIO0_BASE + 0x020;
const EMU_REGX: u32 = PIO0_BASE + 0x4000;

fn counting_emulator() -> SharedEmulator {
    let shared = SharedEmulator::with_config(EmulatorConfig {
        wait_poll_interval_us: 200,
        ..EmulatorConfig::default()
    });
    // loop: jmp x-- loop ; done: jmp done
    let program = Program::parse("0040\n0001\n").expect("valid program");
    shared
        .with(|emulator| emulator.load_program(0, &program, None))
        .expect("program fits");
    shared.write(EMU_REGX, 1000).expect("x");
    shared.write(CTRL, 1).expect("enable");
    shared
}

#[test]
fn matching_value_with_one_cycle_bound_returns_immediately() {
    let shared = counting_emulator();
    let value = shared.wait(EMU_REGX, 1000, u32::MAX, 1, 0).expect("wait");
    assert_eq!(value, 1000);
}

#[test]
fn mismatch_times_out_with_last_value() {
    let shared = counting_emulator();
    let started = Instant::now();
    let outcome = shared
        .wait_with_cancel(EMU_REGX, 0, u32::MAX, 0, 50, &CancelToken::new())
        .expect("wait");
    assert_eq!(outcome.status, WaitStatus::TimedOut);
    assert_eq!(outcome.value, 1000);
    assert!(started.elapsed() >= Duration::from_millis(50));
}

#[test]
fn wait_observes_driver_progress() {
    let shared = counting_emulator();
    let driver = {
        let shared = shared.clone();
        thread::spawn(move || {
            for _ in 0..2000 {
                shared.step(1);
            }
        })
    };
    let value = shared.wait(EMU_REGX, u32::MAX, u32::MAX, 0, 10_000).expect("wait");
    driver.join().expect("driver thread");
    assert_eq!(value, u32::MAX);
}

#[test]
fn waiting_on_rx_port_does_not_pop() {
    let shared = counting_emulator();
    let pushed = shared.with(|emulator| {
        emulator
            .pio_mut(0)
            .and_then(|block| block.sm_mut(0))
            .map(|sm| sm.fifo_mut().push(FifoDirection::Rx, 0x55))
    });
    assert_eq!(pushed, Ok(true));
    let value = shared.wait(RXF0, 0x55, 0xff, 0, 100).expect("wait");
    assert_eq!(value, 0x55);
    assert_eq!(shared.read(FLEVEL), Ok(1 << 4));
}

#[test]
fn remote_wait_can_be_cancelled() {
    let shared = counting_emulator();
    let token = CancelToken::new();
    let canceller = {
        let shared = shared.clone();
        let token = token.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            shared.cancel(&token);
        })
    };
    let response = shared.handle_with_cancel(
        Request::Wait {
            address: EMU_REGX,
            value: 7,
            mask: u32::MAX,
            cycles_timeout: 0,
            millis_timeout: 0,
        },
        &token,
    );
    canceller.join().expect("canceller thread");
    assert!(matches!(response, Response::Error(message) if message.contains("cancelled")));
}
