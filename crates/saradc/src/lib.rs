//! Schedule-table SAR ADC acquisition controller.
//!
//! Drives a multiplexed SAR conversion block through a software-defined
//! schedule table: up to 20 slots, each selecting an external single-ended
//! or differential channel or an internal source, scanned in one-shot or
//! continuous mode with results delivered through a watermark-managed FIFO.
//! Hardware averaging, manual/automatic power sequencing, and per-channel
//! attenuation bypass are configured through one immutable [`Config`]
//! snapshot committed in the register write order the engine requires.
//!
//! The hardware is reached through the [`RegisterFile`] trait, so the whole
//! crate runs on the host against [`mocks::MockRegisterFile`]; on target the
//! trait is implemented over the block's MMIO window. The blocking 8 ms
//! power-settle wait is injected as an [`embedded_hal::delay::DelayNs`].
//!
//! ```
//! use saradc::mocks::{MockDelay, MockRegisterFile};
//! use saradc::{AcquisitionController, Config, OperatingMode, SlotDescriptor, TargetCapabilities};
//!
//! let caps = TargetCapabilities::baseline();
//! let regs = MockRegisterFile::new(caps.schedule_slots);
//! let mut adc = AcquisitionController::new(regs, MockDelay::default(), caps);
//!
//! adc.set_slot(0, SlotDescriptor::ExternalSingleEnded(2)).unwrap();
//! adc.set_active_bitmap(0b1).unwrap();
//! adc.apply(Config::default()).unwrap();
//! adc.set_mode(OperatingMode::OneShot, true).unwrap();
//! ```

#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(unused_must_use)]
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block

#[cfg(feature = "std")]
extern crate std;

pub mod calib;
pub mod config;
pub mod controller;
pub mod fifo;
pub mod mocks;
pub mod regs;
pub mod schedule;

pub use calib::{CalibError, Calibration, SampleMode};
pub use config::{AverageMode, Config, ConvertTime, DataAlign, PowerMode, TargetCapabilities};
pub use controller::{
    averaged_sample_correction, AcquisitionController, AdcError, ConfigError, OperatingMode,
    MAX_SAMPLE_TIME,
};
pub use fifo::Fifo;
pub use regs::{FlagSet, InterruptFlag, RegisterFile};
pub use schedule::{ScheduleError, ScheduleTable, SlotDescriptor};
