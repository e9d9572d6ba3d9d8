//! TX/RX FIFO pair of one state machine, with join modes.
//!
//! Both directions share eight 32-bit storage slots. Unjoined, TX owns slots
//! 0..4 and RX owns slots 4..8. Joining a direction hands it all eight slots
//! and leaves the other direction inert.

/// Depth of one unjoined FIFO.
pub const FIFO_DEPTH: usize = 4;

/// Total storage slots shared by the TX/RX pair.
pub const FIFO_SLOTS: usize = 2 * FIFO_DEPTH;

/// FIFO direction as seen from the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FifoDirection {
    /// Host to state machine.
    Tx,
    /// State machine to host.
    Rx,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
struct Ring {
    head: usize,
    len: usize,
}

/// Storage window of one direction: first slot and capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Window {
    base: usize,
    capacity: usize,
}

/// FIFO pair owned by one state machine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct FifoPair {
    slots: [u32; FIFO_SLOTS],
    tx: Ring,
    rx: Ring,
    join_tx: bool,
    join_rx: bool,
}

impl FifoPair {
    const fn window(&self, direction: FifoDirection) -> Window {
        match (direction, self.join_tx, self.join_rx) {
            (FifoDirection::Tx, true, _) | (FifoDirection::Rx, false, true) => Window {
                base: 0,
                capacity: FIFO_SLOTS,
            },
            (FifoDirection::Tx, false, _) => Window {
                base: 0,
                capacity: FIFO_DEPTH,
            },
            (FifoDirection::Rx, true, _) => Window {
                base: 0,
                capacity: 0,
            },
            (FifoDirection::Rx, false, false) => Window {
                base: FIFO_DEPTH,
                capacity: FIFO_DEPTH,
            },
        }
    }

    const fn ring(&self, direction: FifoDirection) -> &Ring {
        match direction {
            FifoDirection::Tx => &self.tx,
            FifoDirection::Rx => &self.rx,
        }
    }

    fn ring_mut(&mut self, direction: FifoDirection) -> &mut Ring {
        match direction {
            FifoDirection::Tx => &mut self.tx,
            FifoDirection::Rx => &mut self.rx,
        }
    }

    /// Current join flags as `(join_tx, join_rx)`.
    #[must_use]
    pub const fn join(&self) -> (bool, bool) {
        (self.join_tx, self.join_rx)
    }

    /// Updates the join flags.
    ///
    /// Any change discards the contents of both directions and zeroes the
    /// storage, so no word can migrate between directions.
    pub fn set_join(&mut self, join_tx: bool, join_rx: bool) {
        if (join_tx, join_rx) == (self.join_tx, self.join_rx) {
            return;
        }
        log::debug!("fifo join changed to tx={join_tx} rx={join_rx}, flushing");
        self.join_tx = join_tx;
        self.join_rx = join_rx;
        self.clear();
    }

    /// Empties both directions and zeroes storage, keeping join flags.
    pub fn clear(&mut self) {
        self.slots = [0; FIFO_SLOTS];
        self.tx = Ring::default();
        self.rx = Ring::default();
    }

    /// Effective depth of `direction` under the current join mode.
    #[must_use]
    pub const fn capacity(&self, direction: FifoDirection) -> usize {
        self.window(direction).capacity
    }

    /// Number of queued words.
    #[must_use]
    pub const fn level(&self, direction: FifoDirection) -> usize {
        self.ring(direction).len
    }

    /// Returns `true` when no word is queued.
    #[must_use]
    pub const fn is_empty(&self, direction: FifoDirection) -> bool {
        self.level(direction) == 0
    }

    /// Returns `true` when no further word can be queued.
    #[must_use]
    pub const fn is_full(&self, direction: FifoDirection) -> bool {
        self.level(direction) >= self.capacity(direction)
    }

    /// Appends a word; returns `false` (and drops the word) when full or
    /// inert.
    pub fn push(&mut self, direction: FifoDirection, value: u32) -> bool {
        let window = self.window(direction);
        let ring = *self.ring(direction);
        if ring.len >= window.capacity {
            return false;
        }
        let slot = window.base + (ring.head + ring.len) % window.capacity;
        self.slots[slot] = value;
        self.ring_mut(direction).len += 1;
        true
    }

    /// Removes the oldest word.
    pub fn pop(&mut self, direction: FifoDirection) -> Option<u32> {
        let window = self.window(direction);
        let ring = *self.ring(direction);
        if ring.len == 0 {
            return None;
        }
        let value = self.slots[window.base + ring.head];
        let ring = self.ring_mut(direction);
        ring.head = (ring.head + 1) % window.capacity;
        ring.len -= 1;
        Some(value)
    }

    /// Oldest word without removing it.
    #[must_use]
    pub fn peek(&self, direction: FifoDirection) -> Option<u32> {
        let window = self.window(direction);
        let ring = self.ring(direction);
        (ring.len > 0).then(|| self.slots[window.base + ring.head])
    }

    /// Raw storage slot, independent of queue state.
    #[must_use]
    pub fn slot(&self, index: usize) -> Option<u32> {
        self.slots.get(index).copied()
    }

    /// Overwrites a raw storage slot without changing levels.
    pub fn set_slot(&mut self, index: usize, value: u32) -> bool {
        self.slots.get_mut(index).map_or(false, |slot| {
            *slot = value;
            true
        })
    }
}
