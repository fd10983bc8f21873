//! Boundary to the external calibration/voltage-conversion library.
//!
//! Raw-code-to-voltage math lives in a vendor-supplied library keyed to
//! per-chip fuse data; this crate only defines the seam. Implementations
//! wrap that library on hardware; tests use table-driven fakes.

/// Front-end configuration a raw code was captured under.
///
/// Divided modes sample through the internal attenuator; bypass modes sample
/// the pin directly (inputs above 0.9 V are out of range in bypass).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SampleMode {
    /// Single-ended through the attenuator.
    DivideSingle,
    /// Single-ended with the attenuator bypassed.
    BypassSingle,
    /// Differential through the attenuator.
    DivideDifferential,
    /// Differential with the attenuator bypassed.
    BypassDifferential,
}

/// Calibration-library failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibError {
    /// Mode/raw-code combination outside the calibrated range.
    Parameter,
    /// Calibration constants in RAM are corrupt.
    RamData,
    /// No calibration data was fused for this part.
    NoCalibration,
    /// Calibration data uses an unsupported layout version.
    Version,
}

impl core::fmt::Display for CalibError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Parameter => write!(f, "parameter outside calibrated range"),
            Self::RamData => write!(f, "calibration data corrupt"),
            Self::NoCalibration => write!(f, "part is not calibrated"),
            Self::Version => write!(f, "unsupported calibration data version"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CalibError {}

/// Converts raw 12-bit codes into voltages using per-part calibration data.
pub trait Calibration {
    /// Load and verify the calibration constants. Returns `false` when the
    /// part carries no usable data; conversions will then fail with
    /// [`CalibError::NoCalibration`].
    fn calibrate(&mut self) -> bool;

    /// Convert a raw code captured under `mode` to volts.
    fn raw_to_voltage(&self, mode: SampleMode, raw: i32) -> Result<f32, CalibError>;
}
