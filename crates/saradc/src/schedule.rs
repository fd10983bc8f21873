//! Schedule-table slot descriptors and their register packing.
//!
//! Each schedule slot carries a 16-bit descriptor selecting an input source.
//! The descriptor layout is:
//!
//! ```text
//! [3:0]   channel / sentinel index
//! [5:4]   source tag: 00 single-ended, 01 differential, 10 internal
//! [15:6]  reserved, must be zero
//! ```
//!
//! Internal sources reuse the index field as a sentinel: 0 selects the
//! battery rail, 1 the auxiliary power pin (targets with
//! [`aux_pin_mode`](crate::config::TargetCapabilities::aux_pin_mode) only).

use crate::config::TargetCapabilities;
use crate::regs::EXT_BANK_FIRST_SLOT;

/// Largest schedule table any target carries.
pub const MAX_SLOTS: u8 = 20;

const TAG_SHIFT: u16 = 4;
const TAG_SINGLE_ENDED: u16 = 0b00;
const TAG_DIFFERENTIAL: u16 = 0b01;
const TAG_INTERNAL: u16 = 0b10;
const INDEX_MASK: u16 = 0x0F;
const RESERVED_MASK: u16 = !0x3F;

const INTERNAL_BATTERY_INDEX: u16 = 0;
const INTERNAL_AUX_PIN_INDEX: u16 = 1;

/// Schedule-table errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScheduleError {
    /// Slot index is at or beyond the target's slot count.
    InvalidSlotIndex,
    /// Descriptor is malformed or references a source the target lacks.
    InvalidDescriptor,
}

impl core::fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidSlotIndex => write!(f, "slot index beyond schedule table"),
            Self::InvalidDescriptor => write!(f, "invalid slot descriptor"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ScheduleError {}

/// Input source for one schedule slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SlotDescriptor {
    /// Single-ended conversion of external channel `ch`.
    ExternalSingleEnded(u8),
    /// Differential conversion: `ch` positive, `ch + 1` negative.
    ExternalDifferential(u8),
    /// Internal battery-rail measurement.
    InternalBattery,
    /// Internal auxiliary power-pin measurement (capability-gated).
    InternalAuxPin,
}

impl SlotDescriptor {
    /// Pack into the 16-bit wire form.
    #[must_use]
    pub const fn encode(self) -> u16 {
        match self {
            Self::ExternalSingleEnded(ch) => {
                TAG_SINGLE_ENDED << TAG_SHIFT | (ch as u16) & INDEX_MASK
            }
            Self::ExternalDifferential(ch) => {
                TAG_DIFFERENTIAL << TAG_SHIFT | (ch as u16) & INDEX_MASK
            }
            Self::InternalBattery => TAG_INTERNAL << TAG_SHIFT | INTERNAL_BATTERY_INDEX,
            Self::InternalAuxPin => TAG_INTERNAL << TAG_SHIFT | INTERNAL_AUX_PIN_INDEX,
        }
    }

    /// Unpack from the 16-bit wire form.
    ///
    /// Rejects the unused tag 0b11, nonzero reserved bits, and internal
    /// sentinel indices other than 0 and 1.
    pub const fn decode(raw: u16) -> Result<Self, ScheduleError> {
        if raw & RESERVED_MASK != 0 {
            return Err(ScheduleError::InvalidDescriptor);
        }
        let index = raw & INDEX_MASK;
        match raw >> TAG_SHIFT & 0b11 {
            TAG_SINGLE_ENDED => Ok(Self::ExternalSingleEnded(index as u8)),
            TAG_DIFFERENTIAL => Ok(Self::ExternalDifferential(index as u8)),
            TAG_INTERNAL => match index {
                INTERNAL_BATTERY_INDEX => Ok(Self::InternalBattery),
                INTERNAL_AUX_PIN_INDEX => Ok(Self::InternalAuxPin),
                _ => Err(ScheduleError::InvalidDescriptor),
            },
            _ => Err(ScheduleError::InvalidDescriptor),
        }
    }

    /// Check this descriptor against a target's channel count and modes.
    #[allow(clippy::arithmetic_side_effects)] // ch < 16 before the +1 comparison
    pub const fn validate(self, caps: &TargetCapabilities) -> Result<(), ScheduleError> {
        match self {
            Self::ExternalSingleEnded(ch) => {
                if ch < caps.channel_count {
                    Ok(())
                } else {
                    Err(ScheduleError::InvalidDescriptor)
                }
            }
            // The negative input is the next channel up, so the last channel
            // cannot anchor a differential pair.
            Self::ExternalDifferential(ch) => {
                if ch < caps.channel_count && ch + 1 < caps.channel_count {
                    Ok(())
                } else {
                    Err(ScheduleError::InvalidDescriptor)
                }
            }
            Self::InternalBattery => Ok(()),
            Self::InternalAuxPin => {
                if caps.aux_pin_mode {
                    Ok(())
                } else {
                    Err(ScheduleError::InvalidDescriptor)
                }
            }
        }
    }
}

impl Default for SlotDescriptor {
    fn default() -> Self {
        Self::ExternalSingleEnded(0)
    }
}

/// Pack two adjacent descriptors into one schedule-pair register word.
#[must_use]
pub const fn pack_pair(even: u16, odd: u16) -> u32 {
    (even as u32) | (odd as u32) << 16
}

/// Whether `slot` occupies the high half of its register word.
///
/// Odd slots below 16 share a word with their even neighbor; extended-bank
/// slots keep their descriptor in the high half and expose the live result
/// in the low half.
#[must_use]
pub const fn occupies_high_half(slot: u8) -> bool {
    if slot >= EXT_BANK_FIRST_SLOT {
        true
    } else {
        slot & 1 != 0
    }
}

/// The in-memory schedule table for one target.
///
/// Holds the descriptors the controller commits during
/// [`apply`](crate::controller::AcquisitionController::apply); all mutation
/// is bounds- and capability-checked here.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScheduleTable {
    slots: [SlotDescriptor; MAX_SLOTS as usize],
    count: u8,
}

impl ScheduleTable {
    /// An all-default table sized for `caps`.
    #[must_use]
    pub fn new(caps: &TargetCapabilities) -> Self {
        Self {
            slots: [SlotDescriptor::default(); MAX_SLOTS as usize],
            count: caps.schedule_slots,
        }
    }

    /// Number of slots this target exposes (16 or 20).
    #[must_use]
    pub const fn slot_count(&self) -> u8 {
        self.count
    }

    /// Store `descriptor` in `index` after validating both.
    pub fn set(
        &mut self,
        index: u8,
        descriptor: SlotDescriptor,
        caps: &TargetCapabilities,
    ) -> Result<(), ScheduleError> {
        descriptor.validate(caps)?;
        let slot = self
            .slots
            .get_mut(usize::from(index))
            .filter(|_| index < self.count)
            .ok_or(ScheduleError::InvalidSlotIndex)?;
        *slot = descriptor;
        Ok(())
    }

    /// The descriptor stored in `index`.
    pub fn get(&self, index: u8) -> Result<SlotDescriptor, ScheduleError> {
        self.slots
            .get(usize::from(index))
            .filter(|_| index < self.count)
            .copied()
            .ok_or(ScheduleError::InvalidSlotIndex)
    }

    /// Register word for schedule pair `pair_index` (slots `2n` and `2n+1`).
    #[must_use]
    #[allow(clippy::arithmetic_side_effects)] // pair_index < 8
    pub fn pair_word(&self, pair_index: u8) -> u32 {
        let even = self.encoded(pair_index * 2);
        let odd = self.encoded(pair_index * 2 + 1);
        pack_pair(even, odd)
    }

    /// Register word for an extended-bank slot (descriptor in the high half;
    /// the low half belongs to the hardware's live result).
    #[must_use]
    pub fn ext_word(&self, slot: u8) -> u32 {
        u32::from(self.encoded(slot)) << 16
    }

    fn encoded(&self, slot: u8) -> u16 {
        self.slots
            .get(usize::from(slot))
            .copied()
            .unwrap_or_default()
            .encode()
    }
}
