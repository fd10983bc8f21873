//! In-memory test doubles for the device register file and the settle delay.
//!
//! [`MockRegisterFile`] models the register semantics the controller relies
//! on: the FIFO read port pops, occupancy is reported live in the
//! schedule-control word, interrupt clear-pending bits are write-1-to-clear,
//! and the FIFO-clear pulse self-clears. Every write is logged in order so
//! tests can assert the exact commit sequence.

use embedded_hal::delay::DelayNs;
use heapless::{Deque, Vec};

use crate::regs::{
    bitmap_mask, DigCtrl, PowerCtrl, RegisterFile, FIFO_ENTRY_INDEX_SHIFT, INT_ALL_MASK,
    INT_CLEAR_SHIFT, INT_STATUS_SHIFT, REG_DIG_CTRL, REG_FIFO_READ, REG_INT_CTRL,
    REG_POWER_CTRL, REG_SCHED_CTRL, SAMPLE_MASK,
};
use crate::schedule::occupies_high_half;

/// Hardware FIFO depth.
pub const FIFO_DEPTH: usize = 32;

const WORD_COUNT: usize = 0x60 >> 2;
const LOG_CAPACITY: usize = 256;

/// Simulated register file with FIFO and interrupt-lane behavior.
#[derive(Debug, Default)]
pub struct MockRegisterFile {
    words: [u32; WORD_COUNT],
    fifo: Deque<u32, FIFO_DEPTH>,
    log: Vec<(u32, u32), LOG_CAPACITY>,
    slots: u8,
}

impl MockRegisterFile {
    /// A zeroed register file for a target with `slots` schedule entries.
    #[must_use]
    pub fn new(slots: u8) -> Self {
        Self {
            slots,
            ..Self::default()
        }
    }

    fn word(&self, offset: u32) -> u32 {
        self.words
            .get((offset >> 2) as usize)
            .copied()
            .unwrap_or(0)
    }

    fn set_word(&mut self, offset: u32, value: u32) {
        if let Some(slot) = self.words.get_mut((offset >> 2) as usize) {
            *slot = value;
        }
    }

    /// Raw word currently stored at `offset`, without read side effects.
    #[must_use]
    pub fn peek(&self, offset: u32) -> u32 {
        self.word(offset)
    }

    /// Every write issued so far, in order, as `(offset, value)`.
    #[must_use]
    pub fn writes(&self) -> &[(u32, u32)] {
        &self.log
    }

    /// The values written to `offset`, in order.
    pub fn writes_to(&self, offset: u32) -> impl Iterator<Item = u32> + '_ {
        self.log
            .iter()
            .filter(move |(o, _)| *o == offset)
            .map(|(_, v)| *v)
    }

    /// Forget the write log (typically called after setup).
    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// Latch pending status bits, as the conversion engine would.
    pub fn raise_status(&mut self, bits: u8) {
        let word = self.word(REG_INT_CTRL);
        self.set_word(
            REG_INT_CTRL,
            word | (u32::from(bits) & INT_ALL_MASK) << INT_STATUS_SHIFT,
        );
    }

    fn status_bits(&self) -> u32 {
        self.word(REG_INT_CTRL) >> INT_STATUS_SHIFT & INT_ALL_MASK
    }

    /// Deliver one conversion result to the FIFO, honoring the configured
    /// overwrite policy, the stop-write latch, threshold, and watermark.
    pub fn push_sample(&mut self, slot: u8, sample: u16) {
        let dig = DigCtrl::decode(self.word(REG_DIG_CTRL));
        let power = PowerCtrl::decode(self.word(REG_POWER_CTRL));
        if power.fifo_stop_write {
            return;
        }
        let entry =
            u32::from(slot) << FIFO_ENTRY_INDEX_SHIFT | u32::from(sample) & SAMPLE_MASK;
        if self.fifo.is_full() {
            if dig.overwrite_on_full {
                let _ = self.fifo.pop_front();
                let _ = self.fifo.push_back(entry);
            } else {
                // Overflow: latch stop-write and report it; the entry is lost.
                let power = PowerCtrl {
                    fifo_stop_write: true,
                    ..power
                };
                self.set_word(REG_POWER_CTRL, power.encode());
                self.raise_status(1 << 3);
            }
        } else {
            let _ = self.fifo.push_back(entry);
        }
        let len = self.fifo.len() as u8;
        if len >= dig.fifo_threshold {
            self.raise_status(1 << 2);
        }
        if len >= dig.fifo_watermark {
            self.raise_status(1 << 0);
        }
    }

    /// Place a live 12-bit result in `slot`'s schedule word, leaving the
    /// descriptor half untouched where the two share a word.
    pub fn set_slot_result(&mut self, slot: u8, value: u16) {
        let offset = if slot >= crate::regs::EXT_BANK_FIRST_SLOT {
            crate::regs::ext_word_offset(slot)
        } else {
            crate::regs::pair_word_offset(slot)
        };
        let word = self.word(offset);
        // Extended-bank results live in the low half below the descriptor.
        let updated = if slot < crate::regs::EXT_BANK_FIRST_SLOT && occupies_high_half(slot) {
            word & 0x0000_FFFF | u32::from(value) << 16
        } else {
            word & 0xFFFF_0000 | u32::from(value)
        };
        self.set_word(offset, updated);
    }

    /// Current number of FIFO entries.
    #[must_use]
    pub fn fifo_len(&self) -> usize {
        self.fifo.len()
    }
}

impl RegisterFile for MockRegisterFile {
    fn read_word(&mut self, offset: u32) -> u32 {
        match offset {
            REG_SCHED_CTRL => {
                let bitmap = self.word(REG_SCHED_CTRL) & bitmap_mask(self.slots);
                bitmap | (self.fifo.len() as u32) << self.slots
            }
            REG_FIFO_READ => match self.fifo.pop_front() {
                Some(entry) => entry,
                None => {
                    self.raise_status(1 << 1);
                    0
                }
            },
            _ => self.word(offset),
        }
    }

    fn write_word(&mut self, offset: u32, value: u32) {
        // The log sees the value as written, before self-clearing bits drop.
        let _ = self.log.push((offset, value));
        match offset {
            REG_INT_CTRL => {
                let clear = value >> INT_CLEAR_SHIFT & INT_ALL_MASK;
                let status = self.status_bits() & !clear;
                self.set_word(
                    REG_INT_CTRL,
                    value & INT_ALL_MASK | status << INT_STATUS_SHIFT,
                );
            }
            REG_DIG_CTRL => {
                let dig = DigCtrl::decode(value);
                if dig.fifo_clear {
                    while self.fifo.pop_front().is_some() {}
                }
                let stored = DigCtrl {
                    fifo_clear: false,
                    ..dig
                };
                self.set_word(REG_DIG_CTRL, stored.encode());
            }
            _ => self.set_word(offset, value),
        }
    }
}

/// Delay provider that records every requested wait instead of sleeping.
#[derive(Debug, Default)]
pub struct MockDelay {
    /// Requested delays, in nanoseconds, in call order.
    pub delays_ns: Vec<u32, 8>,
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        let _ = self.delays_ns.push(ns);
    }
}
