//! FIFO and watermark management.
//!
//! The result FIFO is owned by the conversion engine; this module is a
//! borrowed view over the register file obtained from
//! [`AcquisitionController::fifo`](crate::controller::AcquisitionController::fifo).
//! Two independent levels shape its behavior: the *threshold* raises a
//! firmware interrupt, the *watermark* raises the transfer-request (DMA
//! burst) signal. Reading the port while empty never fails a call; the
//! engine latches the read-error flag instead.

use crate::regs::{
    occupancy_from_sched_ctrl, DigCtrl, PowerCtrl, RegisterFile, FIFO_ENTRY_INDEX_SHIFT,
    INT_ALL_MASK, INT_CLEAR_SHIFT, REG_DIG_CTRL, REG_FIFO_READ, REG_INT_CTRL, REG_POWER_CTRL,
    REG_SCHED_CTRL, SAMPLE_MASK,
};
use crate::InterruptFlag;

/// Borrowed FIFO view over a controller's register file.
#[derive(Debug)]
pub struct Fifo<'a, R: RegisterFile> {
    regs: &'a mut R,
    slots: u8,
}

impl<'a, R: RegisterFile> Fifo<'a, R> {
    pub(crate) fn new(regs: &'a mut R, slots: u8) -> Self {
        Self { regs, slots }
    }

    /// Number of entries currently buffered (0..=63).
    ///
    /// The occupancy counter sits above the active bitmap in the
    /// schedule-control word, so its position depends on the slot count.
    pub fn occupancy(&mut self) -> u8 {
        occupancy_from_sched_ctrl(self.regs.read_word(REG_SCHED_CTRL), self.slots)
    }

    /// Pop one entry and return its 12-bit sample.
    ///
    /// Reading while empty yields 0 and latches
    /// [`InterruptFlag::FifoReadError`]; check [`Self::occupancy`] first.
    pub fn read_one(&mut self) -> u16 {
        (self.regs.read_word(REG_FIFO_READ) & SAMPLE_MASK) as u16
    }

    /// Pop one entry and return `(source_slot, sample)`.
    ///
    /// The engine tags each entry with the schedule slot that produced it,
    /// which is how interleaved multi-source captures are demultiplexed.
    pub fn read_entry(&mut self) -> (u8, u16) {
        let entry = self.regs.read_word(REG_FIFO_READ);
        (
            (entry >> FIFO_ENTRY_INDEX_SHIFT) as u8,
            (entry & SAMPLE_MASK) as u16,
        )
    }

    /// Lazily pop up to `count` entries, one register read per element.
    ///
    /// The iterator is not restartable: every consumed element is gone from
    /// the hardware FIFO even if the iterator is dropped early.
    pub fn read_many(&mut self, count: u8) -> ReadMany<'_, 'a, R> {
        ReadMany {
            fifo: self,
            remaining: count,
        }
    }

    /// Drain everything currently buffered into `buf`, stopping early if
    /// `buf` fills up. Returns the number of samples moved.
    pub fn drain_into<const N: usize>(&mut self, buf: &mut heapless::Vec<u16, N>) -> usize {
        let available = self.occupancy();
        let mut moved: usize = 0;
        for _ in 0..available {
            if buf.push(self.read_one()).is_err() {
                break;
            }
            moved = moved.saturating_add(1);
        }
        moved
    }

    /// Discard all buffered entries via the self-clearing clear pulse.
    pub fn clear(&mut self) {
        let dig = DigCtrl {
            fifo_clear: true,
            ..DigCtrl::decode(self.regs.read_word(REG_DIG_CTRL))
        };
        self.regs.write_word(REG_DIG_CTRL, dig.encode());
    }

    /// Stop (`true`) or resume (`false`) result delivery into the FIFO.
    pub fn stop_writes(&mut self, stopped: bool) {
        let dig = DigCtrl {
            write_to_fifo: !stopped,
            ..DigCtrl::decode(self.regs.read_word(REG_DIG_CTRL))
        };
        self.regs.write_word(REG_DIG_CTRL, dig.encode());
    }

    /// Release the sticky stop-write latch the engine asserts on overflow
    /// when overwrite is disabled.
    pub fn clear_stop_write_status(&mut self) {
        let power = PowerCtrl {
            fifo_stop_write: false,
            ..PowerCtrl::decode(self.regs.read_word(REG_POWER_CTRL))
        };
        self.regs.write_word(REG_POWER_CTRL, power.encode());
    }

    /// Overflow recovery protocol.
    ///
    /// After an overflow with overwrite disabled the engine stops accepting
    /// results until software intervenes. The steps run in a fixed order:
    /// stop writes, discard the stale contents, resume writes, acknowledge
    /// the overflow flag, release the stop-write latch.
    pub fn recover_overflow(&mut self) {
        self.stop_writes(true);
        self.clear();
        self.stop_writes(false);
        self.clear_pending(InterruptFlag::FifoOverflow);
        self.clear_stop_write_status();
    }

    fn clear_pending(&mut self, flag: InterruptFlag) {
        let enables = self.regs.read_word(REG_INT_CTRL) & INT_ALL_MASK;
        self.regs.write_word(
            REG_INT_CTRL,
            enables | 1u32 << flag.bit() << INT_CLEAR_SHIFT,
        );
    }
}

/// Iterator returned by [`Fifo::read_many`].
#[derive(Debug)]
pub struct ReadMany<'f, 'a, R: RegisterFile> {
    fifo: &'f mut Fifo<'a, R>,
    remaining: u8,
}

impl<R: RegisterFile> Iterator for ReadMany<'_, '_, R> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining = self.remaining.saturating_sub(1);
        Some(self.fifo.read_one())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = usize::from(self.remaining);
        (n, Some(n))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use crate::mocks::MockRegisterFile;

    fn fifo(regs: &mut MockRegisterFile) -> Fifo<'_, MockRegisterFile> {
        Fifo::new(regs, 16)
    }

    #[test]
    fn occupancy_matches_pushed_entries() {
        let mut regs = MockRegisterFile::new(16);
        regs.push_sample(0, 0x100);
        regs.push_sample(0, 0x200);
        assert_eq!(fifo(&mut regs).occupancy(), 2);
    }

    #[test]
    fn read_one_masks_to_twelve_bits() {
        let mut regs = MockRegisterFile::new(16);
        regs.push_sample(0xF, 0xABC);
        assert_eq!(fifo(&mut regs).read_one(), 0xABC);
    }

    #[test]
    fn read_entry_demultiplexes_the_source_slot() {
        let mut regs = MockRegisterFile::new(16);
        regs.push_sample(5, 0x321);
        assert_eq!(fifo(&mut regs).read_entry(), (5, 0x321));
    }

    #[test]
    fn read_many_is_lazy_and_bounded() {
        let mut regs = MockRegisterFile::new(16);
        for i in 1..=4u16 {
            regs.push_sample(0, i);
        }
        let mut view = fifo(&mut regs);
        let taken: heapless::Vec<u16, 8> = view.read_many(3).collect();
        assert_eq!(taken.as_slice(), &[1, 2, 3]);
        assert_eq!(view.occupancy(), 1);
    }

    #[test]
    fn drain_into_stops_at_buffer_capacity() {
        let mut regs = MockRegisterFile::new(16);
        for i in 1..=5u16 {
            regs.push_sample(0, i);
        }
        let mut buf: heapless::Vec<u16, 3> = heapless::Vec::new();
        let moved = fifo(&mut regs).drain_into(&mut buf);
        assert_eq!(moved, 3);
        assert_eq!(buf.as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn clear_empties_without_reads() {
        let mut regs = MockRegisterFile::new(16);
        regs.push_sample(0, 1);
        regs.push_sample(0, 2);
        let mut view = fifo(&mut regs);
        view.clear();
        assert_eq!(view.occupancy(), 0);
    }

    #[test]
    fn recovery_restores_a_writable_fifo() {
        let mut regs = MockRegisterFile::new(16);
        let dig = crate::regs::DigCtrl {
            overwrite_on_full: false,
            fifo_threshold: 31,
            fifo_watermark: 31,
            ..crate::regs::DigCtrl::default()
        };
        regs.write_word(crate::regs::REG_DIG_CTRL, dig.encode());
        for i in 0..crate::mocks::FIFO_DEPTH as u16 + 1 {
            regs.push_sample(0, i);
        }
        assert!(crate::regs::PowerCtrl::decode(regs.peek(crate::regs::REG_POWER_CTRL)).fifo_stop_write);

        fifo(&mut regs).recover_overflow();

        assert!(!crate::regs::PowerCtrl::decode(regs.peek(crate::regs::REG_POWER_CTRL)).fifo_stop_write);
        assert_eq!(regs.fifo_len(), 0);
        // Writes resumed: new results are accepted again.
        regs.push_sample(1, 0x42);
        assert_eq!(regs.fifo_len(), 1);
        // Overflow pending flag acknowledged.
        assert_eq!(regs.peek(crate::regs::REG_INT_CTRL) >> 16 & 1 << 3, 0);
    }

    #[test]
    fn recovery_write_order_is_fixed() {
        let mut regs = MockRegisterFile::new(16);
        fifo(&mut regs).recover_overflow();
        let offsets: heapless::Vec<u32, 8> =
            regs.writes().iter().map(|(offset, _)| *offset).collect();
        assert_eq!(
            offsets.as_slice(),
            &[
                crate::regs::REG_DIG_CTRL,   // stop writes
                crate::regs::REG_DIG_CTRL,   // clear pulse
                crate::regs::REG_DIG_CTRL,   // resume writes
                crate::regs::REG_INT_CTRL,   // acknowledge overflow
                crate::regs::REG_POWER_CTRL, // release stop-write latch
            ]
        );
    }
}
