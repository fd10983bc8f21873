//! Device register file layout and pure pack/unpack functions.
//!
//! Every control register is modeled as a plain `u32` word plus an explicit
//! field struct with `encode`/`decode` functions, so the bit layout never
//! depends on compiler bitfield behavior and every packing rule is testable
//! on the host without touching real memory.
//!
//! # Register map (byte offsets, 32-bit words)
//!
//! | Offset | Register       | Contents                                         |
//! |--------|----------------|--------------------------------------------------|
//! | 0x00   | `INT_CTRL`     | enable [4:0], clear-pending W1C [12:8], status [20:16] |
//! | 0x04   | `DIG_CTRL`     | mode enables, FIFO policy, threshold/watermark   |
//! | 0x08   | `SCHED_CTRL`   | active bitmap [slots−1:0], FIFO occupancy [slots+5:slots] |
//! | 0x0C   | `SCHTAB[0..8]` | schedule pairs: even slot [15:0], odd slot [31:16] |
//! | 0x2C   | `SCHTAB_EXT[0..4]` | slots 16..20: descriptor [31:16], live result [15:0] |
//! | 0x3C   | `FIFO_READ`    | sample [11:0], source slot index [31:28]         |
//! | 0x40   | `BYPASS_CTRL`  | per-channel attenuation bypass, one bit per channel |
//! | 0x50   | `POWER_CTRL`   | power mode, latch delay, stop-write latch, averaging |
//! | 0x54   | `DATA_PATH`    | trigger source, alignment, offset subtraction    |
//! | 0x5C   | `TIME_PERIOD`  | convert-time class [15:14], sample period [13:0] |
//!
//! The schedule-pair words at `SCHTAB` are written with slot descriptors
//! during configuration and hold live 12-bit conversion results once a mode
//! is enabled; [`pair_word_offset`] is therefore shared by the table writer
//! and the raw-data reader.

/// Interrupt control register: enable, clear-pending, and status lanes.
pub const REG_INT_CTRL: u32 = 0x00;
/// Digital control register: mode enables and FIFO policy.
pub const REG_DIG_CTRL: u32 = 0x04;
/// Schedule control register: active bitmap and FIFO occupancy.
pub const REG_SCHED_CTRL: u32 = 0x08;
/// First schedule-pair word (slots 0 and 1).
pub const REG_SCHTAB_BASE: u32 = 0x0C;
/// First extended-bank word (slot 16), present on 20-slot targets only.
pub const REG_SCHTAB_EXT_BASE: u32 = 0x2C;
/// FIFO read port. Each read pops one entry.
pub const REG_FIFO_READ: u32 = 0x3C;
/// Per-channel attenuation bypass bits.
pub const REG_BYPASS_CTRL: u32 = 0x40;
/// Power and data-delay control register.
pub const REG_POWER_CTRL: u32 = 0x50;
/// Data-path control register.
pub const REG_DATA_PATH: u32 = 0x54;
/// Conversion timing register.
pub const REG_TIME_PERIOD: u32 = 0x5C;

/// Number of packed schedule-pair words (16 slots, two per word).
pub const SCHTAB_PAIR_WORDS: u8 = 8;
/// Number of extended-bank words (slots 16..20, one per word).
pub const SCHTAB_EXT_WORDS: u8 = 4;
/// Slot index at which the extended register bank begins.
pub const EXT_BANK_FIRST_SLOT: u8 = 16;

/// Conversion results are 12 bits wide.
pub const SAMPLE_MASK: u32 = 0x0FFF;
/// All five interrupt lanes.
pub const INT_ALL_MASK: u32 = 0x1F;
/// Bit position of the clear-pending lane in `INT_CTRL`.
pub const INT_CLEAR_SHIFT: u32 = 8;
/// Bit position of the status lane in `INT_CTRL`.
pub const INT_STATUS_SHIFT: u32 = 16;
/// FIFO occupancy field width (6 bits) in `SCHED_CTRL`.
pub const OCCUPANCY_MASK: u32 = 0x3F;
/// Bit position of the slot-index field in a `FIFO_READ` word.
pub const FIFO_ENTRY_INDEX_SHIFT: u32 = 28;

/// Addressable 32-bit device register file.
///
/// The conversion engine's registers are behind this seam so the controller
/// can run against real MMIO on hardware and against
/// [`MockRegisterFile`](crate::mocks::MockRegisterFile) in tests. Reads take
/// `&mut self` because some registers (the FIFO read port) have read side
/// effects.
pub trait RegisterFile {
    /// Read the 32-bit word at `offset`.
    fn read_word(&mut self, offset: u32) -> u32;

    /// Write the 32-bit word at `offset`.
    fn write_word(&mut self, offset: u32, value: u32);
}

/// Word offset holding the packed pair for `slot` (slots 0..16).
///
/// Even slot in the low half-word, odd slot in the high half-word; the pair
/// for slots `2n` and `2n+1` lives at `SCHTAB_BASE + 4n`.
#[must_use]
#[allow(clippy::arithmetic_side_effects)] // slot < 16, offsets stay within the register bank
pub const fn pair_word_offset(slot: u8) -> u32 {
    REG_SCHTAB_BASE + ((slot as u32) >> 1) * 4
}

/// Word offset for `slot` in the extended bank (slots 16..20).
#[must_use]
#[allow(clippy::arithmetic_side_effects)] // slot is pre-validated against the slot count
pub const fn ext_word_offset(slot: u8) -> u32 {
    REG_SCHTAB_EXT_BASE + ((slot as u32) - EXT_BANK_FIRST_SLOT as u32) * 4
}

/// Active-bitmap field mask for a target with `slots` schedule entries.
#[must_use]
#[allow(clippy::arithmetic_side_effects)] // slots < 32 keeps the shift in range
pub const fn bitmap_mask(slots: u8) -> u32 {
    if slots >= 32 {
        u32::MAX
    } else {
        (1u32 << slots) - 1
    }
}

/// Decode the FIFO occupancy field from a `SCHED_CTRL` word.
///
/// The occupancy counter sits immediately above the active bitmap, so its
/// position depends on the target's slot count.
#[must_use]
pub const fn occupancy_from_sched_ctrl(word: u32, slots: u8) -> u8 {
    ((word >> slots) & OCCUPANCY_MASK) as u8
}

/// `DIG_CTRL` register fields.
///
/// Layout:
/// ```text
/// [0]     ONE_SHOT_EN     one-shot mode enable
/// [1]     CONTINUOUS_EN   continuous mode enable (mutually exclusive with [0])
/// [2]     WRITE_TO_FIFO   route one-shot results into the FIFO
/// [3]     FIFO_CLEAR      clear pulse, self-clearing
/// [8:4]   FIFO_THRESHOLD  interrupt level, 0..=31
/// [13:9]  FIFO_WATERMARK  transfer-request (burst) level, 0..=31
/// [14]    FIFO_OVERWRITE  overwrite oldest entry when full
/// [15]    DMA_EN          assert the DMA request line at the watermark
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DigCtrl {
    /// One-shot mode enable bit.
    pub one_shot_enable: bool,
    /// Continuous mode enable bit.
    pub continuous_enable: bool,
    /// Route one-shot results into the FIFO as well as the slot registers.
    pub write_to_fifo: bool,
    /// FIFO clear pulse (self-clearing in hardware).
    pub fifo_clear: bool,
    /// FIFO occupancy level that raises the threshold interrupt.
    pub fifo_threshold: u8,
    /// FIFO occupancy level that raises the transfer-request signal.
    pub fifo_watermark: u8,
    /// Overwrite the oldest entry instead of stalling when the FIFO is full.
    pub overwrite_on_full: bool,
    /// Assert the DMA request line when the watermark is reached.
    pub dma_enable: bool,
}

impl DigCtrl {
    /// Pack the fields into a register word. Out-of-range levels are masked
    /// to their field width; validation happens before commit, not here.
    #[must_use]
    pub const fn encode(self) -> u32 {
        (self.one_shot_enable as u32)
            | (self.continuous_enable as u32) << 1
            | (self.write_to_fifo as u32) << 2
            | (self.fifo_clear as u32) << 3
            | ((self.fifo_threshold as u32) & 0x1F) << 4
            | ((self.fifo_watermark as u32) & 0x1F) << 9
            | (self.overwrite_on_full as u32) << 14
            | (self.dma_enable as u32) << 15
    }

    /// Unpack a register word.
    #[must_use]
    pub const fn decode(word: u32) -> Self {
        Self {
            one_shot_enable: word & 1 != 0,
            continuous_enable: word >> 1 & 1 != 0,
            write_to_fifo: word >> 2 & 1 != 0,
            fifo_clear: word >> 3 & 1 != 0,
            fifo_threshold: (word >> 4 & 0x1F) as u8,
            fifo_watermark: (word >> 9 & 0x1F) as u8,
            overwrite_on_full: word >> 14 & 1 != 0,
            dma_enable: word >> 15 & 1 != 0,
        }
    }
}

/// `POWER_CTRL` register fields.
///
/// Layout:
/// ```text
/// [2:0]   AVG_SELECT      hardware averaging factor, log2(N) − 1
/// [3]     AVG_EN          averaging enable
/// [7:4]   LATCH_DELAY     leading samples discarded after power-on
/// [8]     FIFO_STOP_WRITE sticky; hardware asserts it on overflow when
///                         overwrite is disabled, software clears it
/// [9]     MANUAL_POWER    1 = manual power sequencing, 0 = auto
/// [10]    POWER_ON_SELECT power-on reference select, always set on commit
/// [11]    ALWAYS_ON       keep the analog block powered between conversions
/// [12]    MANUAL_POWER_ON manual-mode power request, driven by set_mode
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PowerCtrl {
    /// Averaging factor selector (0 = 2 samples .. 7 = 256 samples).
    pub avg_select: u8,
    /// Hardware averaging enable.
    pub avg_enable: bool,
    /// Number of leading samples discarded after power-on or mode start.
    pub latch_delay: u8,
    /// Sticky stop-write latch; see [`Fifo::recover_overflow`](crate::fifo::Fifo::recover_overflow).
    pub fifo_stop_write: bool,
    /// Manual (true) vs automatic (false) power sequencing.
    pub manual_power: bool,
    /// Power-on reference select; the commit sequence always sets it.
    pub power_on_select: bool,
    /// Keep the analog block powered between conversions.
    pub always_on: bool,
    /// Manual-mode power request bit.
    pub manual_power_on: bool,
}

impl PowerCtrl {
    /// Pack the fields into a register word.
    #[must_use]
    pub const fn encode(self) -> u32 {
        ((self.avg_select as u32) & 0x7)
            | (self.avg_enable as u32) << 3
            | ((self.latch_delay as u32) & 0xF) << 4
            | (self.fifo_stop_write as u32) << 8
            | (self.manual_power as u32) << 9
            | (self.power_on_select as u32) << 10
            | (self.always_on as u32) << 11
            | (self.manual_power_on as u32) << 12
    }

    /// Unpack a register word.
    #[must_use]
    pub const fn decode(word: u32) -> Self {
        Self {
            avg_select: (word & 0x7) as u8,
            avg_enable: word >> 3 & 1 != 0,
            latch_delay: (word >> 4 & 0xF) as u8,
            fifo_stop_write: word >> 8 & 1 != 0,
            manual_power: word >> 9 & 1 != 0,
            power_on_select: word >> 10 & 1 != 0,
            always_on: word >> 11 & 1 != 0,
            manual_power_on: word >> 12 & 1 != 0,
        }
    }
}

/// `DATA_PATH` register fields.
///
/// Layout:
/// ```text
/// [0]     TIMER_TRIGGER   one-shot conversions start on the timer line
/// [1]     ALIGN_MSB       MSB-justify the 12-bit result in its half-word
/// [2]     OFFSET_EN       subtract OFFSET from each sample before storage
/// [15:4]  OFFSET          subtractive offset, 0..=4095
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DataPathCtrl {
    /// One-shot conversions are started by the external timer line.
    pub timer_trigger: bool,
    /// MSB-justify results instead of the default LSB justification.
    pub align_msb: bool,
    /// Enable subtractive offset correction.
    pub offset_enable: bool,
    /// Offset subtracted from each sample before storage.
    pub offset: u16,
}

impl DataPathCtrl {
    /// Pack the fields into a register word.
    #[must_use]
    pub const fn encode(self) -> u32 {
        (self.timer_trigger as u32)
            | (self.align_msb as u32) << 1
            | (self.offset_enable as u32) << 2
            | ((self.offset as u32) & 0xFFF) << 4
    }

    /// Unpack a register word.
    #[must_use]
    pub const fn decode(word: u32) -> Self {
        Self {
            timer_trigger: word & 1 != 0,
            align_msb: word >> 1 & 1 != 0,
            offset_enable: word >> 2 & 1 != 0,
            offset: (word >> 4 & 0xFFF) as u16,
        }
    }
}

/// `TIME_PERIOD` register fields.
///
/// Layout:
/// ```text
/// [13:0]  SAMPLE_PERIOD   cycles of the 10 MHz reference clock per sample
/// [15:14] CONVERT_TIME    conversion latency class, 0..=3
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimePeriod {
    /// Sample period in reference-clock cycles (14-bit).
    pub sample_period: u16,
    /// Conversion latency class selector.
    pub convert_time: u8,
}

impl TimePeriod {
    /// Pack the fields into a register word.
    #[must_use]
    pub const fn encode(self) -> u32 {
        ((self.sample_period as u32) & 0x3FFF) | ((self.convert_time as u32) & 0x3) << 14
    }

    /// Unpack a register word.
    #[must_use]
    pub const fn decode(word: u32) -> Self {
        Self {
            sample_period: (word & 0x3FFF) as u16,
            convert_time: (word >> 14 & 0x3) as u8,
        }
    }
}

/// One interrupt source of the conversion engine.
///
/// Bit 3 carries [`FifoFull`](InterruptFlag::FifoFull) on targets with
/// `TargetCapabilities::fifo_full_flag` and
/// [`FifoOverflow`](InterruptFlag::FifoOverflow) everywhere else; the two
/// never coexist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InterruptFlag {
    /// FIFO occupancy reached the transfer-request watermark.
    FifoReadRequest,
    /// The FIFO read port was read while empty.
    FifoReadError,
    /// FIFO occupancy reached the configured threshold.
    FifoThreshold,
    /// The FIFO overflowed (default meaning of bit 3).
    FifoOverflow,
    /// The FIFO is full (bit 3 on targets reporting full instead of overflow).
    FifoFull,
    /// A one-shot pass over the active schedule entries completed.
    OneShotDone,
}

impl InterruptFlag {
    /// Bit position of this flag in the interrupt lanes.
    #[must_use]
    pub const fn bit(self) -> u8 {
        match self {
            Self::FifoReadRequest => 0,
            Self::FifoReadError => 1,
            Self::FifoThreshold => 2,
            Self::FifoOverflow | Self::FifoFull => 3,
            Self::OneShotDone => 4,
        }
    }
}

/// A set of interrupt flags, one snapshot of the 5-bit status lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlagSet(u8);

impl FlagSet {
    /// The empty set.
    pub const EMPTY: Self = Self(0);
    /// All five flags.
    pub const ALL: Self = Self(INT_ALL_MASK as u8);

    /// Build a set from raw status-lane bits (masked to 5 bits).
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & INT_ALL_MASK as u8)
    }

    /// Raw 5-bit representation.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// The set containing only `flag`.
    #[must_use]
    pub const fn only(flag: InterruptFlag) -> Self {
        Self(1 << flag.bit())
    }

    /// Whether `flag` is in the set.
    #[must_use]
    pub const fn contains(self, flag: InterruptFlag) -> bool {
        self.0 & (1 << flag.bit()) != 0
    }

    /// Union with another set.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Whether the set is empty.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl core::ops::BitOr for FlagSet {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl From<InterruptFlag> for FlagSet {
    fn from(flag: InterruptFlag) -> Self {
        Self::only(flag)
    }
}
