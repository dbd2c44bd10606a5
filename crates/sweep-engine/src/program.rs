//! Sweep program: the validated description of one wavelength traversal.

use sweep_core::{Result, SweepError};

/// A validated sweep description.
///
/// The wavelength sequence starts at `start_nm`, increases by
/// `resolution_nm`, and the final point is clamped to exactly `stop_nm`.
/// Clamping means the last step may be shorter than `resolution_nm`, but the
/// endpoint the operator asked for is always measured; downstream analysis
/// relies on both boundary wavelengths being present in the data.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepProgram {
    start_nm: f64,
    stop_nm: f64,
    resolution_nm: f64,
    repetitions: u32,
}

impl SweepProgram {
    /// Validate and construct a sweep program.
    ///
    /// # Errors
    /// `SweepError::Config` when `stop <= start`, the resolution is not
    /// positive, or `repetitions` is zero.
    pub fn new(start_nm: f64, stop_nm: f64, resolution_nm: f64, repetitions: u32) -> Result<Self> {
        if !start_nm.is_finite() || !stop_nm.is_finite() || stop_nm <= start_nm {
            return Err(SweepError::Config(format!(
                "sweep range [{start_nm}, {stop_nm}] nm is not an increasing interval"
            )));
        }
        if !resolution_nm.is_finite() || resolution_nm <= 0.0 {
            return Err(SweepError::Config(format!(
                "sweep resolution {resolution_nm} nm must be positive"
            )));
        }
        if repetitions == 0 {
            return Err(SweepError::Config(
                "at least one reading per wavelength is required".to_string(),
            ));
        }
        Ok(Self {
            start_nm,
            stop_nm,
            resolution_nm,
            repetitions,
        })
    }

    pub fn start_nm(&self) -> f64 {
        self.start_nm
    }

    pub fn stop_nm(&self) -> f64 {
        self.stop_nm
    }

    pub fn resolution_nm(&self) -> f64 {
        self.resolution_nm
    }

    pub fn repetitions(&self) -> u32 {
        self.repetitions
    }

    /// The wavelength sequence this program visits, in order.
    pub fn wavelengths(&self) -> Vec<f64> {
        // The epsilon keeps float accumulation from emitting a point one
        // ulp short of `stop` right before the clamped endpoint.
        let mut points = Vec::new();
        let mut w = self.start_nm;
        while w < self.stop_nm - 1e-9 {
            points.push(w);
            w += self.resolution_nm;
        }
        points.push(self.stop_nm);
        points
    }

    /// Number of wavelength steps.
    pub fn steps(&self) -> usize {
        self.wavelengths().len()
    }
}
