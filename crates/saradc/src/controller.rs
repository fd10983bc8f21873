//! Acquisition controller: configuration commit, mode state machine,
//! result readers, interrupt flags, and the attenuation bypass channel.

use embedded_hal::delay::DelayNs;

use crate::config::{Config, DataAlign, PowerMode, TargetCapabilities};
use crate::fifo::Fifo;
use crate::regs::{
    bitmap_mask, ext_word_offset, pair_word_offset, DataPathCtrl, DigCtrl, FlagSet,
    InterruptFlag, PowerCtrl, RegisterFile, TimePeriod, EXT_BANK_FIRST_SLOT, INT_ALL_MASK,
    INT_CLEAR_SHIFT, INT_STATUS_SHIFT, REG_BYPASS_CTRL, REG_DATA_PATH, REG_DIG_CTRL,
    REG_INT_CTRL, REG_POWER_CTRL, REG_SCHED_CTRL, REG_SCHTAB_BASE, REG_TIME_PERIOD,
    SAMPLE_MASK, SCHTAB_PAIR_WORDS,
};
use crate::schedule::{ScheduleError, ScheduleTable, SlotDescriptor};

/// Largest value the sample-period field can hold; larger requests clamp.
pub const MAX_SAMPLE_TIME: u16 = 0x3FFF;

const POWER_SETTLE_MS: u32 = 8;

/// Configuration validation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// A FIFO level exceeds its 5-bit field.
    OutOfRange,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::OutOfRange => write!(f, "configuration value out of range"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

/// Controller operation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcError {
    /// The operation is not permitted in the current operating mode.
    InvalidState,
    /// A slot or channel index is beyond what the target provides.
    IndexOutOfRange,
    /// A schedule-table mutation failed.
    Schedule(ScheduleError),
}

impl core::fmt::Display for AdcError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidState => write!(f, "operation not permitted in current mode"),
            Self::IndexOutOfRange => write!(f, "slot or channel index out of range"),
            Self::Schedule(e) => write!(f, "schedule: {e}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for AdcError {}

impl From<ScheduleError> for AdcError {
    fn from(e: ScheduleError) -> Self {
        Self::Schedule(e)
    }
}

/// Acquisition state machine.
///
/// One-shot and continuous are mutually exclusive; every transition between
/// them passes through `Disabled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OperatingMode {
    /// No acquisition in progress; configuration may be mutated.
    #[default]
    Disabled,
    /// One pass over the active schedule entries, then stop.
    OneShot,
    /// Free-running passes over the active schedule entries.
    Continuous,
}

/// Normalize an averaged result whose two low bits are fractional.
///
/// With averaging enabled at a factor of 4 the hardware keeps two fractional
/// bits in the averaged slot-0 result; this drops them and returns the
/// integer 12-bit code. Do not apply it to unaveraged reads or other
/// factors.
#[must_use]
pub const fn averaged_sample_correction(raw: u16) -> u16 {
    (raw & 0x3FFC) >> 2
}

/// Driver for one SAR conversion block.
///
/// Owns the register file, the schedule table, the active bitmap, and the
/// configuration snapshot; the FIFO is exposed as a borrowed view via
/// [`Self::fifo`]. The delay provider is only used for the 8 ms analog
/// settle wait during [`Self::apply`].
#[derive(Debug)]
pub struct AcquisitionController<R: RegisterFile, D: DelayNs> {
    regs: R,
    delay: D,
    caps: TargetCapabilities,
    config: Config,
    schedule: ScheduleTable,
    bitmap: u32,
    mode: OperatingMode,
}

impl<R: RegisterFile, D: DelayNs> AcquisitionController<R, D> {
    /// Wrap a register file for the target described by `caps`.
    ///
    /// Nothing is written until [`Self::apply`]; the in-memory state starts
    /// from the default configuration, an all-default schedule table, and an
    /// empty active bitmap.
    #[must_use]
    pub fn new(regs: R, delay: D, caps: TargetCapabilities) -> Self {
        let schedule = ScheduleTable::new(&caps);
        Self {
            regs,
            delay,
            caps,
            config: Config::default(),
            schedule,
            bitmap: 0,
            mode: OperatingMode::Disabled,
        }
    }

    /// Target description this controller was built with.
    #[must_use]
    pub const fn capabilities(&self) -> &TargetCapabilities {
        &self.caps
    }

    /// The last committed (or default) configuration, with the sample-time
    /// clamp already applied.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Current operating mode.
    #[must_use]
    pub const fn mode(&self) -> OperatingMode {
        self.mode
    }

    /// Give back the register file and delay provider.
    #[must_use]
    pub fn into_parts(self) -> (R, D) {
        (self.regs, self.delay)
    }

    /// First-time bring-up of the conversion block: validates and commits
    /// `config`. Identical to [`Self::apply`]; the separate name marks
    /// init-time call sites.
    pub fn initialize(&mut self, config: Config) -> Result<(), ConfigError> {
        self.apply(config)
    }

    /// Validate `config` and commit it together with the current schedule
    /// table and active bitmap.
    ///
    /// Validation happens before the first register write, so a failed call
    /// leaves the device untouched. The commit itself runs in a fixed order
    /// the engine requires:
    ///
    /// 1. disable all interrupt sources
    /// 2. write the combined power/averaging/latch-delay word
    /// 3. wait 8 ms for the analog block to settle, when always-on power
    ///    with the settle delay is requested on a target that needs it
    /// 4. write the schedule-table words (and the extended bank on 20-slot
    ///    targets)
    /// 5. write the active bitmap
    /// 6. write the digital-control word (modes stay disabled)
    /// 7. write the data-path word
    /// 8. write the timing word
    /// 9. pulse the FIFO clear bit
    /// 10. acknowledge every pending interrupt
    ///
    /// Leaves the controller `Disabled`.
    #[allow(clippy::arithmetic_side_effects)] // offsets bounded by the register bank
    pub fn apply(&mut self, mut config: Config) -> Result<(), ConfigError> {
        if config.fifo_threshold > 31 || config.fifo_watermark > 31 {
            return Err(ConfigError::OutOfRange);
        }
        if config.sample_time_period > MAX_SAMPLE_TIME {
            config.sample_time_period = MAX_SAMPLE_TIME;
        }

        // 1: quiesce interrupts for the duration of the reconfiguration.
        self.regs.write_word(REG_INT_CTRL, 0);

        // 2: power, averaging, and latch delay share one word.
        let power = PowerCtrl {
            // A disabled averager must not carry a stale selector.
            avg_select: if config.averaging_enable {
                config.average_mode.selector()
            } else {
                0
            },
            avg_enable: config.averaging_enable,
            latch_delay: config.latch_delay,
            fifo_stop_write: false,
            manual_power: self.caps.power_mode_ctrl && config.power_mode == PowerMode::Manual,
            power_on_select: true,
            always_on: config.power_always_on,
            manual_power_on: false,
        };
        self.regs.write_word(REG_POWER_CTRL, power.encode());

        // 3: the analog block needs time after being switched always-on.
        if config.power_on_delay_enable && config.power_always_on && self.caps.power_on_delay {
            self.delay.delay_ms(POWER_SETTLE_MS);
        }

        // 4: schedule table, two descriptors per word.
        for pair in 0..SCHTAB_PAIR_WORDS {
            self.regs
                .write_word(pair_word_offset(pair * 2), self.schedule.pair_word(pair));
        }
        if self.schedule.slot_count() > EXT_BANK_FIRST_SLOT {
            for slot in EXT_BANK_FIRST_SLOT..self.schedule.slot_count() {
                self.regs
                    .write_word(ext_word_offset(slot), self.schedule.ext_word(slot));
            }
        }

        // 5: active bitmap.
        self.regs
            .write_word(REG_SCHED_CTRL, self.bitmap & bitmap_mask(self.caps.schedule_slots));

        // 6: digital control, with both mode enables held low.
        let dig = DigCtrl {
            one_shot_enable: false,
            continuous_enable: false,
            write_to_fifo: config.write_to_fifo,
            fifo_clear: false,
            fifo_threshold: config.fifo_threshold,
            fifo_watermark: config.fifo_watermark,
            overwrite_on_full: config.overwrite_on_full,
            dma_enable: self.caps.dma_request,
        };
        self.regs.write_word(REG_DIG_CTRL, dig.encode());

        // 7: data path.
        let data_path = DataPathCtrl {
            timer_trigger: config.timer_trigger,
            align_msb: config.alignment == DataAlign::Msb,
            offset_enable: config.offset_enable,
            offset: config.offset,
        };
        self.regs.write_word(REG_DATA_PATH, data_path.encode());

        // 8: timing.
        let timing = TimePeriod {
            sample_period: config.sample_time_period,
            convert_time: config.convert_time.selector(),
        };
        self.regs.write_word(REG_TIME_PERIOD, timing.encode());

        // 9: discard whatever the FIFO held before reconfiguration.
        let clear = DigCtrl {
            fifo_clear: true,
            ..DigCtrl::decode(self.regs.read_word(REG_DIG_CTRL))
        };
        self.regs.write_word(REG_DIG_CTRL, clear.encode());

        // 10: start from a clean slate of pending flags.
        self.regs
            .write_word(REG_INT_CTRL, INT_ALL_MASK << INT_CLEAR_SHIFT);

        self.config = config;
        self.mode = OperatingMode::Disabled;
        Ok(())
    }

    /// Enable (`true`) or disable (`false`) the given acquisition mode.
    ///
    /// Under manual power sequencing the analog block is powered up before
    /// a mode enable and powered down after a disable. Enabling is only
    /// permitted from `Disabled`; re-enabling the mode that is already
    /// running is rejected too, since the power-on sequence must not run
    /// twice. Disabling while already `Disabled` is a no-op; every other
    /// mismatch between `mode` and the current state is
    /// [`AdcError::InvalidState`].
    pub fn set_mode(&mut self, mode: OperatingMode, enabled: bool) -> Result<(), AdcError> {
        if mode == OperatingMode::Disabled {
            return Err(AdcError::InvalidState);
        }
        if enabled {
            if self.mode != OperatingMode::Disabled {
                return Err(AdcError::InvalidState);
            }
            if self.manual_power_active() {
                self.set_manual_power(true);
            }
            let dig = DigCtrl {
                one_shot_enable: mode == OperatingMode::OneShot,
                continuous_enable: mode == OperatingMode::Continuous,
                ..DigCtrl::decode(self.regs.read_word(REG_DIG_CTRL))
            };
            self.regs.write_word(REG_DIG_CTRL, dig.encode());
            self.mode = mode;
        } else {
            if self.mode == OperatingMode::Disabled {
                return Ok(());
            }
            if self.mode != mode {
                return Err(AdcError::InvalidState);
            }
            if self.manual_power_active() {
                self.set_manual_power(false);
            }
            let dig = DigCtrl {
                one_shot_enable: false,
                continuous_enable: false,
                ..DigCtrl::decode(self.regs.read_word(REG_DIG_CTRL))
            };
            self.regs.write_word(REG_DIG_CTRL, dig.encode());
            self.mode = OperatingMode::Disabled;
        }
        Ok(())
    }

    fn manual_power_active(&mut self) -> bool {
        self.caps.power_mode_ctrl
            && PowerCtrl::decode(self.regs.read_word(REG_POWER_CTRL)).manual_power
    }

    fn set_manual_power(&mut self, on: bool) {
        let power = PowerCtrl {
            manual_power_on: on,
            ..PowerCtrl::decode(self.regs.read_word(REG_POWER_CTRL))
        };
        self.regs.write_word(REG_POWER_CTRL, power.encode());
    }

    /// Store `descriptor` in schedule slot `index` and commit the affected
    /// table word. Only permitted while `Disabled`.
    pub fn set_slot(&mut self, index: u8, descriptor: SlotDescriptor) -> Result<(), AdcError> {
        if self.mode != OperatingMode::Disabled {
            return Err(AdcError::InvalidState);
        }
        self.schedule.set(index, descriptor, &self.caps)?;
        if index >= EXT_BANK_FIRST_SLOT {
            self.regs
                .write_word(ext_word_offset(index), self.schedule.ext_word(index));
        } else {
            let pair = index >> 1;
            self.regs
                .write_word(pair_word_offset(index), self.schedule.pair_word(pair));
        }
        Ok(())
    }

    /// The descriptor currently stored in slot `index`.
    pub fn slot(&self, index: u8) -> Result<SlotDescriptor, AdcError> {
        Ok(self.schedule.get(index)?)
    }

    /// Replace the active bitmap and commit it. Only permitted while
    /// `Disabled`. Bits at or above the target's slot count are discarded,
    /// so the register invariant holds by construction.
    pub fn set_active_bitmap(&mut self, bitmap: u32) -> Result<(), AdcError> {
        if self.mode != OperatingMode::Disabled {
            return Err(AdcError::InvalidState);
        }
        self.bitmap = bitmap & bitmap_mask(self.caps.schedule_slots);
        self.regs.write_word(REG_SCHED_CTRL, self.bitmap);
        Ok(())
    }

    /// The committed active bitmap.
    #[must_use]
    pub const fn active_bitmap(&self) -> u32 {
        self.bitmap
    }

    /// Latest 12-bit result captured for schedule slot `slot`.
    ///
    /// Slots below 16 read their half of the shared pair word; extended-bank
    /// slots read the low half of their own word.
    pub fn read_raw(&mut self, slot: u8) -> Result<u16, AdcError> {
        if slot >= self.caps.schedule_slots {
            return Err(AdcError::IndexOutOfRange);
        }
        let word = if slot >= EXT_BANK_FIRST_SLOT {
            self.regs.read_word(ext_word_offset(slot))
        } else {
            self.regs.read_word(pair_word_offset(slot))
        };
        let half = if slot < EXT_BANK_FIRST_SLOT && slot & 1 != 0 {
            word >> 16
        } else {
            word
        };
        Ok((half & SAMPLE_MASK) as u16)
    }

    /// The hardware-averaged result, which replaces the slot-0 result while
    /// averaging is enabled.
    ///
    /// Returned unmasked; with an averaging factor of 4 the low two bits are
    /// fractional and callers normalize with
    /// [`averaged_sample_correction`]. Meaningless while averaging is
    /// disabled.
    pub fn read_averaged(&mut self) -> u16 {
        (self.regs.read_word(REG_SCHTAB_BASE) & 0xFFFF) as u16
    }

    /// Snapshot of all pending interrupt flags.
    pub fn all_flags(&mut self) -> FlagSet {
        FlagSet::from_bits(
            (self.regs.read_word(REG_INT_CTRL) >> INT_STATUS_SHIFT & INT_ALL_MASK) as u8,
        )
    }

    /// Whether `flag` is pending.
    pub fn flag(&mut self, flag: InterruptFlag) -> bool {
        self.all_flags().contains(flag)
    }

    /// Acknowledge the given pending flags, leaving enables untouched.
    pub fn clear_flags(&mut self, set: FlagSet) {
        let enables = self.regs.read_word(REG_INT_CTRL) & INT_ALL_MASK;
        self.regs.write_word(
            REG_INT_CTRL,
            enables | u32::from(set.bits()) << INT_CLEAR_SHIFT,
        );
    }

    /// Enable or disable the interrupt sources in `set`.
    pub fn configure_interrupts(&mut self, set: FlagSet, enabled: bool) {
        let enables = self.regs.read_word(REG_INT_CTRL) & INT_ALL_MASK;
        let updated = if enabled {
            enables | u32::from(set.bits())
        } else {
            enables & !u32::from(set.bits())
        };
        self.regs.write_word(REG_INT_CTRL, updated);
    }

    /// Route `channel` around the input attenuator (`true`) or through it
    /// (`false`).
    ///
    /// A bypassed channel must not be driven above 0.9 V; the hardware
    /// cannot check this, so the limit is a caller obligation.
    pub fn configure_bypass(&mut self, channel: u8, enabled: bool) -> Result<(), AdcError> {
        if channel >= self.caps.channel_count {
            return Err(AdcError::IndexOutOfRange);
        }
        let word = self.regs.read_word(REG_BYPASS_CTRL);
        let bit = 1u32 << channel;
        let updated = if enabled { word | bit } else { word & !bit };
        self.regs.write_word(REG_BYPASS_CTRL, updated);
        Ok(())
    }

    /// Borrowed FIFO view over this controller's register file.
    pub fn fifo(&mut self) -> Fifo<'_, R> {
        Fifo::new(&mut self.regs, self.caps.schedule_slots)
    }

    /// Shut the block down: both modes off, interrupts disabled with all
    /// pending flags acknowledged, and the manual power request dropped on
    /// targets that have one.
    pub fn deinit(&mut self) {
        let dig = DigCtrl {
            one_shot_enable: false,
            continuous_enable: false,
            ..DigCtrl::decode(self.regs.read_word(REG_DIG_CTRL))
        };
        self.regs.write_word(REG_DIG_CTRL, dig.encode());
        self.regs
            .write_word(REG_INT_CTRL, INT_ALL_MASK << INT_CLEAR_SHIFT);
        if self.caps.power_mode_ctrl {
            self.set_manual_power(false);
        }
        self.mode = OperatingMode::Disabled;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::mocks::{MockDelay, MockRegisterFile};

    type Controller = AcquisitionController<MockRegisterFile, MockDelay>;

    fn controller(caps: TargetCapabilities) -> Controller {
        let slots = caps.schedule_slots;
        AcquisitionController::new(MockRegisterFile::new(slots), MockDelay::default(), caps)
    }

    #[test]
    fn new_writes_nothing() {
        let ctrl = controller(TargetCapabilities::baseline());
        let (regs, _) = ctrl.into_parts();
        assert!(regs.writes().is_empty());
    }

    #[test]
    fn failed_apply_touches_no_registers() {
        let mut ctrl = controller(TargetCapabilities::baseline());
        let config = Config {
            fifo_threshold: 32,
            ..Config::default()
        };
        assert_eq!(ctrl.apply(config), Err(ConfigError::OutOfRange));
        let (regs, _) = ctrl.into_parts();
        assert!(regs.writes().is_empty());
    }

    #[test]
    fn apply_clamps_the_sample_period() {
        let mut ctrl = controller(TargetCapabilities::baseline());
        let config = Config {
            sample_time_period: 0xFFFF,
            ..Config::default()
        };
        ctrl.apply(config).unwrap();
        assert_eq!(ctrl.config().sample_time_period, MAX_SAMPLE_TIME);
        let (regs, _) = ctrl.into_parts();
        let timing = TimePeriod::decode(regs.peek(REG_TIME_PERIOD));
        assert_eq!(timing.sample_period, MAX_SAMPLE_TIME);
    }

    #[test]
    fn disabled_averaging_forces_the_minimum_selector() {
        let mut ctrl = controller(TargetCapabilities::baseline());
        let config = Config {
            averaging_enable: false,
            average_mode: crate::config::AverageMode::Of256,
            ..Config::default()
        };
        ctrl.apply(config).unwrap();
        let (regs, _) = ctrl.into_parts();
        let power = PowerCtrl::decode(regs.peek(REG_POWER_CTRL));
        assert!(!power.avg_enable);
        assert_eq!(power.avg_select, 0);
    }

    #[test]
    fn settle_delay_requires_always_on_and_capability() {
        let config = Config {
            power_always_on: true,
            power_on_delay_enable: true,
            ..Config::default()
        };

        let mut ext = controller(TargetCapabilities::extended());
        ext.apply(config.clone()).unwrap();
        let (_, delay) = ext.into_parts();
        assert_eq!(delay.delays_ns.as_slice(), &[8_000_000]);

        let mut base = controller(TargetCapabilities::baseline());
        base.apply(config).unwrap();
        let (_, delay) = base.into_parts();
        assert!(delay.delays_ns.is_empty());
    }

    #[test]
    fn mode_transitions_pass_through_disabled() {
        let mut ctrl = controller(TargetCapabilities::baseline());
        ctrl.apply(Config::default()).unwrap();
        ctrl.set_mode(OperatingMode::OneShot, true).unwrap();
        assert_eq!(
            ctrl.set_mode(OperatingMode::Continuous, true),
            Err(AdcError::InvalidState)
        );
        ctrl.set_mode(OperatingMode::OneShot, false).unwrap();
        ctrl.set_mode(OperatingMode::Continuous, true).unwrap();
        assert_eq!(ctrl.mode(), OperatingMode::Continuous);
    }

    #[test]
    fn reenabling_the_active_mode_is_rejected() {
        let mut ctrl = controller(TargetCapabilities::baseline());
        ctrl.apply(Config::default()).unwrap();
        ctrl.set_mode(OperatingMode::OneShot, true).unwrap();
        assert_eq!(
            ctrl.set_mode(OperatingMode::OneShot, true),
            Err(AdcError::InvalidState)
        );
        // The running mode is untouched by the rejected request.
        assert_eq!(ctrl.mode(), OperatingMode::OneShot);
    }

    #[test]
    fn disabling_an_inactive_controller_is_a_noop() {
        let mut ctrl = controller(TargetCapabilities::baseline());
        ctrl.set_mode(OperatingMode::OneShot, false).unwrap();
        assert_eq!(ctrl.mode(), OperatingMode::Disabled);
    }

    #[test]
    fn disabling_the_wrong_mode_is_rejected() {
        let mut ctrl = controller(TargetCapabilities::baseline());
        ctrl.set_mode(OperatingMode::Continuous, true).unwrap();
        assert_eq!(
            ctrl.set_mode(OperatingMode::OneShot, false),
            Err(AdcError::InvalidState)
        );
        assert_eq!(ctrl.mode(), OperatingMode::Continuous);
    }

    #[test]
    fn enable_bits_stay_mutually_exclusive() {
        let mut ctrl = controller(TargetCapabilities::baseline());
        ctrl.set_mode(OperatingMode::OneShot, true).unwrap();
        ctrl.set_mode(OperatingMode::OneShot, false).unwrap();
        ctrl.set_mode(OperatingMode::Continuous, true).unwrap();
        let (regs, _) = ctrl.into_parts();
        let dig = DigCtrl::decode(regs.peek(REG_DIG_CTRL));
        assert!(dig.continuous_enable);
        assert!(!dig.one_shot_enable);
    }

    #[test]
    fn manual_power_brackets_the_mode_bits() {
        let mut ctrl = controller(TargetCapabilities::extended());
        let config = Config {
            power_mode: PowerMode::Manual,
            ..Config::default()
        };
        ctrl.apply(config).unwrap();
        ctrl.regs.clear_log();
        ctrl.set_mode(OperatingMode::OneShot, true).unwrap();
        {
            let writes = ctrl.regs.writes();
            assert_eq!(writes[0].0, REG_POWER_CTRL);
            assert_eq!(writes[1].0, REG_DIG_CTRL);
            assert!(PowerCtrl::decode(writes[0].1).manual_power_on);
        }
        ctrl.regs.clear_log();
        ctrl.set_mode(OperatingMode::OneShot, false).unwrap();
        let (regs, _) = ctrl.into_parts();
        let writes = regs.writes();
        assert_eq!(writes[0].0, REG_POWER_CTRL);
        assert_eq!(writes[1].0, REG_DIG_CTRL);
        assert!(!PowerCtrl::decode(writes[0].1).manual_power_on);
    }

    #[test]
    fn auto_power_never_touches_the_power_word() {
        let mut ctrl = controller(TargetCapabilities::baseline());
        ctrl.apply(Config::default()).unwrap();
        ctrl.regs.clear_log();
        ctrl.set_mode(OperatingMode::Continuous, true).unwrap();
        let (regs, _) = ctrl.into_parts();
        assert!(regs.writes_to(REG_POWER_CTRL).next().is_none());
    }

    #[test]
    fn slot_mutation_requires_disabled() {
        let mut ctrl = controller(TargetCapabilities::baseline());
        ctrl.set_mode(OperatingMode::Continuous, true).unwrap();
        assert_eq!(
            ctrl.set_slot(0, SlotDescriptor::InternalBattery),
            Err(AdcError::InvalidState)
        );
        assert_eq!(ctrl.set_active_bitmap(1), Err(AdcError::InvalidState));
    }

    #[test]
    fn set_slot_commits_the_shared_pair_word() {
        let mut ctrl = controller(TargetCapabilities::baseline());
        ctrl.set_slot(4, SlotDescriptor::ExternalSingleEnded(3)).unwrap();
        ctrl.set_slot(5, SlotDescriptor::InternalBattery).unwrap();
        let (regs, _) = ctrl.into_parts();
        let word = regs.peek(pair_word_offset(4));
        assert_eq!(word & 0xFFFF, u32::from(SlotDescriptor::ExternalSingleEnded(3).encode()));
        assert_eq!(word >> 16, u32::from(SlotDescriptor::InternalBattery.encode()));
    }

    #[test]
    fn bitmap_high_bits_are_discarded() {
        let mut ctrl = controller(TargetCapabilities::baseline());
        ctrl.set_active_bitmap(0xFFFF_FFFF).unwrap();
        assert_eq!(ctrl.active_bitmap(), 0xFFFF);
    }

    #[test]
    fn read_raw_routes_by_parity() {
        let mut ctrl = controller(TargetCapabilities::baseline());
        ctrl.regs.set_slot_result(6, 0x123);
        ctrl.regs.set_slot_result(7, 0x456);
        assert_eq!(ctrl.read_raw(6).unwrap(), 0x123);
        assert_eq!(ctrl.read_raw(7).unwrap(), 0x456);
    }

    #[test]
    fn read_raw_uses_the_extended_bank_low_half() {
        let mut ctrl = controller(TargetCapabilities::extended());
        ctrl.set_slot(18, SlotDescriptor::ExternalSingleEnded(1)).unwrap();
        ctrl.regs.set_slot_result(18, 0x7ED);
        assert_eq!(ctrl.read_raw(18).unwrap(), 0x7ED);
    }

    #[test]
    fn read_raw_rejects_out_of_range_slots() {
        let mut ctrl = controller(TargetCapabilities::baseline());
        assert_eq!(ctrl.read_raw(16), Err(AdcError::IndexOutOfRange));
        let mut ext = controller(TargetCapabilities::extended());
        assert!(ext.read_raw(19).is_ok());
        assert_eq!(ext.read_raw(20), Err(AdcError::IndexOutOfRange));
    }

    #[test]
    fn averaged_correction_drops_fractional_bits() {
        assert_eq!(averaged_sample_correction(0x3FFC), 0xFFF);
        assert_eq!(averaged_sample_correction(0x0003), 0);
        assert_eq!(averaged_sample_correction(0x1234), 0x48D);
    }

    #[test]
    fn flags_report_and_clear_independently() {
        let mut ctrl = controller(TargetCapabilities::baseline());
        ctrl.regs.raise_status(0b00101);
        assert!(ctrl.flag(InterruptFlag::FifoReadRequest));
        assert!(ctrl.flag(InterruptFlag::FifoThreshold));
        assert!(!ctrl.flag(InterruptFlag::OneShotDone));
        ctrl.clear_flags(FlagSet::only(InterruptFlag::FifoThreshold));
        assert!(ctrl.flag(InterruptFlag::FifoReadRequest));
        assert!(!ctrl.flag(InterruptFlag::FifoThreshold));
    }

    #[test]
    fn interrupt_enables_accumulate() {
        let mut ctrl = controller(TargetCapabilities::baseline());
        ctrl.configure_interrupts(FlagSet::only(InterruptFlag::FifoThreshold), true);
        ctrl.configure_interrupts(FlagSet::only(InterruptFlag::OneShotDone), true);
        assert_eq!(ctrl.regs.peek(REG_INT_CTRL) & 0x1F, 0b10100);
        ctrl.configure_interrupts(FlagSet::only(InterruptFlag::FifoThreshold), false);
        assert_eq!(ctrl.regs.peek(REG_INT_CTRL) & 0x1F, 0b10000);
    }

    #[test]
    fn bypass_is_per_channel_and_bounded() {
        let mut ctrl = controller(TargetCapabilities::baseline());
        ctrl.configure_bypass(3, true).unwrap();
        ctrl.configure_bypass(5, true).unwrap();
        ctrl.configure_bypass(3, false).unwrap();
        assert_eq!(ctrl.regs.peek(REG_BYPASS_CTRL), 1 << 5);
        assert_eq!(ctrl.configure_bypass(8, true), Err(AdcError::IndexOutOfRange));
    }

    #[test]
    fn deinit_quiesces_the_block() {
        let mut ctrl = controller(TargetCapabilities::extended());
        let config = Config {
            power_mode: PowerMode::Manual,
            ..Config::default()
        };
        ctrl.apply(config).unwrap();
        ctrl.set_mode(OperatingMode::Continuous, true).unwrap();
        ctrl.deinit();
        assert_eq!(ctrl.mode(), OperatingMode::Disabled);
        let (regs, _) = ctrl.into_parts();
        let dig = DigCtrl::decode(regs.peek(REG_DIG_CTRL));
        assert!(!dig.one_shot_enable && !dig.continuous_enable);
        assert!(!PowerCtrl::decode(regs.peek(REG_POWER_CTRL)).manual_power_on);
        assert_eq!(regs.peek(REG_INT_CTRL) & 0x1F, 0);
    }
}
