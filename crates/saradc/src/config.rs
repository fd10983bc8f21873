//! Conversion-engine configuration and per-target capability flags.

/// Conversion latency class, encoded in the timing register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConvertTime {
    /// 500 ns conversion window.
    #[default]
    Ns500,
    /// 700 ns conversion window.
    Ns700,
    /// 900 ns conversion window.
    Ns900,
    /// 1100 ns conversion window.
    Ns1100,
}

impl ConvertTime {
    /// Two-bit register selector.
    #[must_use]
    pub const fn selector(self) -> u8 {
        match self {
            Self::Ns500 => 0,
            Self::Ns700 => 1,
            Self::Ns900 => 2,
            Self::Ns1100 => 3,
        }
    }
}

/// Justification of the 12-bit result inside its 16-bit half-word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataAlign {
    /// Result in bits [11:0].
    #[default]
    Lsb,
    /// Result in bits [15:4].
    Msb,
}

/// Hardware averaging factor, powers of two from 2 to 256 samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AverageMode {
    /// Average 2 samples.
    #[default]
    Of2,
    /// Average 4 samples.
    Of4,
    /// Average 8 samples.
    Of8,
    /// Average 16 samples.
    Of16,
    /// Average 32 samples.
    Of32,
    /// Average 64 samples.
    Of64,
    /// Average 128 samples.
    Of128,
    /// Average 256 samples.
    Of256,
}

impl AverageMode {
    /// Three-bit register selector (log2(N) − 1).
    #[must_use]
    pub const fn selector(self) -> u8 {
        match self {
            Self::Of2 => 0,
            Self::Of4 => 1,
            Self::Of8 => 2,
            Self::Of16 => 3,
            Self::Of32 => 4,
            Self::Of64 => 5,
            Self::Of128 => 6,
            Self::Of256 => 7,
        }
    }
}

/// Analog power sequencing policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerMode {
    /// Hardware powers the block up and down around conversions.
    #[default]
    Auto,
    /// Software drives the power request bit explicitly; `set_mode` couples
    /// it to mode enable/disable.
    Manual,
}

/// Configuration snapshot committed by
/// [`apply`](crate::controller::AcquisitionController::apply).
///
/// `Default` carries the vendor-recommended reset values, so a default
/// config is a working polling setup.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Sample period in 10 MHz reference-clock cycles, 14-bit; values above
    /// 0x3FFF are silently clamped at commit.
    pub sample_time_period: u16,
    /// Conversion latency class.
    pub convert_time: ConvertTime,
    /// Route one-shot results into the FIFO as well as the slot registers.
    pub write_to_fifo: bool,
    /// FIFO occupancy that raises the threshold interrupt (0..=31).
    pub fifo_threshold: u8,
    /// FIFO occupancy that raises the transfer-request signal (0..=31).
    pub fifo_watermark: u8,
    /// Overwrite the oldest FIFO entry when full instead of stalling.
    pub overwrite_on_full: bool,
    /// Result justification.
    pub alignment: DataAlign,
    /// Enable subtractive offset correction.
    pub offset_enable: bool,
    /// Offset subtracted from each sample before storage (12-bit).
    pub offset: u16,
    /// Hardware averaging enable. When false the committed averaging
    /// selector is forced to [`AverageMode::Of2`] regardless of
    /// `average_mode`.
    pub averaging_enable: bool,
    /// Averaging factor, meaningful only when `averaging_enable`.
    pub average_mode: AverageMode,
    /// Leading samples discarded after power-on (0..=15).
    pub latch_delay: u8,
    /// Start one-shot conversions from the external timer line.
    pub timer_trigger: bool,
    /// Power sequencing policy.
    pub power_mode: PowerMode,
    /// Keep the analog block powered between conversions.
    pub power_always_on: bool,
    /// Wait 8 ms for the analog block to settle during commit. Only takes
    /// effect together with `power_always_on` on targets with the
    /// [`power_on_delay`](TargetCapabilities::power_on_delay) capability.
    pub power_on_delay_enable: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_time_period: 0x3E7,
            convert_time: ConvertTime::Ns500,
            write_to_fifo: false,
            fifo_threshold: 6,
            fifo_watermark: 1,
            overwrite_on_full: true,
            alignment: DataAlign::Lsb,
            offset_enable: false,
            offset: 0,
            averaging_enable: false,
            average_mode: AverageMode::Of2,
            latch_delay: 1,
            timer_trigger: false,
            power_mode: PowerMode::Auto,
            power_always_on: false,
            power_on_delay_enable: false,
        }
    }
}

/// Description of one silicon target's conversion block.
///
/// Sibling targets differ in table length, internal sources, and power
/// control; the differences are a runtime value injected at controller
/// construction so every variant is testable from one build.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TargetCapabilities {
    /// Schedule-table length: 16, or 20 with the extended register bank.
    pub schedule_slots: u8,
    /// Number of external input channels (at most 16).
    pub channel_count: u8,
    /// The internal auxiliary power-pin source exists.
    pub aux_pin_mode: bool,
    /// Interrupt bit 3 reports FIFO-full rather than FIFO-overflow.
    pub fifo_full_flag: bool,
    /// Manual power sequencing is available.
    pub power_mode_ctrl: bool,
    /// The 8 ms power-settle delay applies on this target.
    pub power_on_delay: bool,
    /// The watermark drives a DMA request line.
    pub dma_request: bool,
}

impl TargetCapabilities {
    /// The baseline 16-slot target: auto power only, overflow flag, no DMA.
    #[must_use]
    pub const fn baseline() -> Self {
        Self {
            schedule_slots: 16,
            channel_count: 8,
            aux_pin_mode: false,
            fifo_full_flag: false,
            power_mode_ctrl: false,
            power_on_delay: false,
            dma_request: false,
        }
    }

    /// The extended 20-slot target: aux-pin source, manual power control,
    /// settle delay, FIFO-full flag, DMA request line.
    #[must_use]
    pub const fn extended() -> Self {
        Self {
            schedule_slots: 20,
            channel_count: 16,
            aux_pin_mode: true,
            fifo_full_flag: true,
            power_mode_ctrl: true,
            power_on_delay: true,
            dma_request: true,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_a_working_polling_setup() {
        let config = Config::default();
        assert_eq!(config.sample_time_period, 0x3E7);
        assert_eq!(config.convert_time, ConvertTime::Ns500);
        assert_eq!(config.fifo_threshold, 6);
        assert_eq!(config.fifo_watermark, 1);
        assert!(config.overwrite_on_full);
        assert_eq!(config.latch_delay, 1);
        assert!(!config.averaging_enable);
        assert_eq!(config.power_mode, PowerMode::Auto);
    }

    #[test]
    fn average_selector_is_log2_minus_one() {
        assert_eq!(AverageMode::Of2.selector(), 0);
        assert_eq!(AverageMode::Of4.selector(), 1);
        assert_eq!(AverageMode::Of256.selector(), 7);
    }

    #[test]
    fn convert_time_selectors_are_dense() {
        assert_eq!(ConvertTime::Ns500.selector(), 0);
        assert_eq!(ConvertTime::Ns1100.selector(), 3);
    }

    #[test]
    fn target_constructors_differ_where_silicon_does() {
        let base = TargetCapabilities::baseline();
        let ext = TargetCapabilities::extended();
        assert_eq!(base.schedule_slots, 16);
        assert_eq!(ext.schedule_slots, 20);
        assert!(!base.aux_pin_mode && ext.aux_pin_mode);
        assert!(!base.fifo_full_flag && ext.fifo_full_flag);
        assert!(!base.power_mode_ctrl && ext.power_mode_ctrl);
    }
}
