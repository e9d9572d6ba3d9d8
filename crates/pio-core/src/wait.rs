//! Thread-safe emulator handle and the blocking register wait.
//!
//! One mutex guards the whole emulator, so a register access and a cycle
//! step never interleave. Every mutation notifies the condition variable;
//! waiters re-check on notification or after at most one poll interval.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::config::EmulatorConfig;
use crate::emulator::Emulator;
use crate::error::{PioError, PioResult};
use crate::registers::AddressSpace;

/// Cooperative cancellation flag for [`SharedEmulator::wait_with_cancel`].
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation of every wait holding this token.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once [`CancelToken::cancel`] was called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How a wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum WaitStatus {
    /// The masked value matched.
    Matched,
    /// A timeout expired first.
    TimedOut,
}

/// Result of a wait: the last value read and why the wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct WaitOutcome {
    /// Last value observed at the address.
    pub value: u32,
    /// Whether the value matched.
    pub status: WaitStatus,
}

impl WaitOutcome {
    /// Returns `true` when the wait matched.
    #[must_use]
    pub const fn is_matched(&self) -> bool {
        matches!(self.status, WaitStatus::Matched)
    }
}

/// Cloneable handle to an emulator shared between a cycle driver and any
/// number of register clients.
#[derive(Debug, Clone)]
pub struct SharedEmulator {
    inner: Arc<(Mutex<Emulator>, Condvar)>,
}

impl Default for SharedEmulator {
    fn default() -> Self {
        Self::new(Emulator::default())
    }
}

impl SharedEmulator {
    /// Wraps `emulator`.
    #[must_use]
    pub fn new(emulator: Emulator) -> Self {
        Self {
            inner: Arc::new((Mutex::new(emulator), Condvar::new())),
        }
    }

    /// Creates a fresh emulator with `config`.
    #[must_use]
    pub fn with_config(config: EmulatorConfig) -> Self {
        Self::new(Emulator::new(config))
    }

    fn lock(&self) -> MutexGuard<'_, Emulator> {
        self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self) {
        self.inner.1.notify_all();
    }

    /// Runs `f` with exclusive access, then wakes waiters.
    pub fn with<R>(&self, f: impl FnOnce(&mut Emulator) -> R) -> R {
        let result = f(&mut self.lock());
        self.notify();
        result
    }

    /// Reads one register.
    ///
    /// # Errors
    ///
    /// See [`AddressSpace::read`].
    pub fn read(&self, address: u32) -> PioResult<u32> {
        self.with(|emulator| emulator.read(address))
    }

    /// Writes one register.
    ///
    /// # Errors
    ///
    /// See [`AddressSpace::write`].
    pub fn write(&self, address: u32, value: u32) -> PioResult<()> {
        self.with(|emulator| emulator.write(address, value))
    }

    /// Writes the `mask` bits of one register.
    ///
    /// # Errors
    ///
    /// See [`AddressSpace::write_masked`].
    pub fn write_masked(&self, address: u32, value: u32, mask: u32) -> PioResult<()> {
        self.with(|emulator| emulator.write_masked(address, value, mask))
    }

    /// See [`AddressSpace::provides_address`].
    #[must_use]
    pub fn provides_address(&self, address: u32) -> bool {
        self.lock().provides_address(address)
    }

    /// See [`AddressSpace::label_for_address`].
    #[must_use]
    pub fn label_for_address(&self, address: u32) -> String {
        self.lock().label_for_address(address)
    }

    /// Runs `cycles` complete cycles as one atomic step.
    pub fn step(&self, cycles: u64) {
        self.with(|emulator| emulator.step(cycles));
    }

    /// Full emulator reset.
    pub fn reset(&self) {
        self.with(Emulator::reset);
    }

    /// Cancels `token` and wakes waiters so they observe it promptly.
    pub fn cancel(&self, token: &CancelToken) {
        token.cancel();
        self.notify();
    }

    /// Blocks until `(value_at(address) & mask) == (value & mask)` or a
    /// timeout expires, returning the last value read either way.
    ///
    /// `cycles_timeout` counts emulated cycles completed since the call and
    /// `millis_timeout` wall-clock milliseconds; 0 disables that bound, so
    /// with both at 0 the wait only ends on a match.
    ///
    /// # Errors
    ///
    /// Returns [`PioError::InvalidAddress`] for unknown addresses.
    pub fn wait(
        &self,
        address: u32,
        value: u32,
        mask: u32,
        cycles_timeout: u64,
        millis_timeout: u64,
    ) -> PioResult<u32> {
        self.wait_with_cancel(
            address,
            value,
            mask,
            cycles_timeout,
            millis_timeout,
            &CancelToken::new(),
        )
        .map(|outcome| outcome.value)
    }

    /// [`SharedEmulator::wait`] that also ends when `cancel` is triggered.
    ///
    /// The address is sampled without read side effects, so waiting on an
    /// RX FIFO port does not drain it.
    ///
    /// # Errors
    ///
    /// Returns [`PioError::InvalidAddress`] for unknown addresses and
    /// [`PioError::WaitCancelled`] when `cancel` fires before a match.
    pub fn wait_with_cancel(
        &self,
        address: u32,
        value: u32,
        mask: u32,
        cycles_timeout: u64,
        millis_timeout: u64,
        cancel: &CancelToken,
    ) -> PioResult<WaitOutcome> {
        let started = Instant::now();
        let deadline = (millis_timeout != 0).then(|| Duration::from_millis(millis_timeout));
        let mut emulator = self.lock();
        let start_cycle = emulator.cycle_count();
        let poll = emulator.config().wait_poll_interval();
        loop {
            let current = emulator.peek(address)?;
            if current & mask == value & mask {
                return Ok(WaitOutcome {
                    value: current,
                    status: WaitStatus::Matched,
                });
            }
            let cycles = emulator.cycle_count().saturating_sub(start_cycle);
            let elapsed = started.elapsed();
            let cycles_expired = cycles_timeout != 0 && cycles >= cycles_timeout;
            let time_expired = deadline.is_some_and(|limit| elapsed >= limit);
            if cycles_expired || time_expired {
                log::debug!(
                    "wait on {address:#010x} timed out after {cycles} cycles, {elapsed:?}"
                );
                return Ok(WaitOutcome {
                    value: current,
                    status: WaitStatus::TimedOut,
                });
            }
            if cancel.is_cancelled() {
                return Err(PioError::WaitCancelled { address });
            }
            let slice = deadline.map_or(poll, |limit| poll.min(limit.saturating_sub(elapsed)));
            emulator = self
                .inner
                .1
                .wait_timeout(emulator, slice)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::PIO0_BASE;
    use std::thread;

    const IRQ: u32 = PIO0_BASE + 0x030;
    const IRQ_FORCE: u32 = PIO0_BASE + 0x034;

    #[test]
    fn matching_value_returns_immediately() {
        let shared = SharedEmulator::default();
        let outcome = shared
            .wait_with_cancel(IRQ, 0, 0xff, 1, 0, &CancelToken::new())
            .expect("valid address");
        assert!(outcome.is_matched());
    }

    #[test]
    fn millisecond_timeout_returns_last_value() {
        let shared = SharedEmulator::default();
        shared.write(IRQ_FORCE, 0x4).expect("force");
        let outcome = shared
            .wait_with_cancel(IRQ, 0x1, 0x1, 0, 20, &CancelToken::new())
            .expect("valid address");
        assert_eq!(outcome.status, WaitStatus::TimedOut);
        assert_eq!(outcome.value, 0x4);
    }

    #[test]
    fn invalid_address_is_an_error() {
        let shared = SharedEmulator::default();
        assert_eq!(
            shared.wait(0x5020_0ffc, 0, 0, 0, 10),
            Err(PioError::InvalidAddress { address: 0x5020_0ffc })
        );
    }

    #[test]
    fn write_from_another_thread_wakes_waiter() {
        let shared = SharedEmulator::default();
        let writer = {
            let shared = shared.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(10));
                shared.write(IRQ_FORCE, 0x80).expect("force");
            })
        };
        let value = shared.wait(IRQ, 0x80, 0x80, 0, 5_000).expect("valid address");
        writer.join().expect("writer thread");
        assert_eq!(value, 0x80);
    }

    #[test]
    fn cycle_timeout_counts_emulated_cycles() {
        let shared = SharedEmulator::default();
        let stop = CancelToken::new();
        let stepper = {
            let shared = shared.clone();
            let stop = stop.clone();
            thread::spawn(move || {
                while !stop.is_cancelled() {
                    shared.step(1);
                    thread::yield_now();
                }
            })
        };
        let outcome = shared
            .wait_with_cancel(IRQ, 1, 1, 10, 10_000, &CancelToken::new())
            .expect("valid address");
        stop.cancel();
        stepper.join().expect("stepper thread");
        assert_eq!(outcome.status, WaitStatus::TimedOut);
        assert!(shared.with(|emulator| emulator.cycle_count()) >= 10);
    }

    #[test]
    fn cancel_ends_unbounded_wait() {
        let shared = SharedEmulator::default();
        let token = CancelToken::new();
        let canceller = {
            let shared = shared.clone();
            let token = token.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(10));
                shared.cancel(&token);
            })
        };
        let result = shared.wait_with_cancel(IRQ, 1, 1, 0, 0, &token);
        canceller.join().expect("canceller thread");
        assert_eq!(result, Err(PioError::WaitCancelled { address: IRQ }));
    }
}
