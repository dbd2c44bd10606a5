//! In-memory sweep data.

use sweep_core::SweepError;

/// Readings collected by one sweep.
///
/// Row `i` holds the repetitions taken at `wavelengths_nm[i]`; all rows have
/// the same width (the program's repetition count).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepResult {
    pub wavelengths_nm: Vec<f64>,
    pub readings_dbm: Vec<Vec<f64>>,
}

impl SweepResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_row(&mut self, wavelength_nm: f64, readings_dbm: Vec<f64>) {
        self.wavelengths_nm.push(wavelength_nm);
        self.readings_dbm.push(readings_dbm);
    }

    pub fn len(&self) -> usize {
        self.wavelengths_nm.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelengths_nm.is_empty()
    }

    /// Per-wavelength mean of the repeated readings.
    pub fn mean_dbm(&self) -> Vec<f64> {
        self.readings_dbm
            .iter()
            .map(|row| row.iter().sum::<f64>() / row.len() as f64)
            .collect()
    }

    /// Per-wavelength population variance of the repeated readings.
    pub fn variance_dbm(&self) -> Vec<f64> {
        self.readings_dbm
            .iter()
            .map(|row| {
                let mean = row.iter().sum::<f64>() / row.len() as f64;
                row.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / row.len() as f64
            })
            .collect()
    }
}

/// Outcome of one refinement window.
///
/// A failed window keeps its position in the batch: `result` is empty and
/// `error` holds what went wrong.
#[derive(Debug)]
pub struct WindowResult {
    /// The resonance estimate this window was centered on, nm.
    pub center_nm: f64,
    pub result: SweepResult,
    pub error: Option<SweepError>,
}

impl WindowResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_variance_per_row() {
        let mut result = SweepResult::new();
        result.push_row(1550.0, vec![-3.0, -5.0]);
        result.push_row(1550.1, vec![-7.0, -7.0]);

        assert_eq!(result.mean_dbm(), vec![-4.0, -7.0]);
        assert_eq!(result.variance_dbm(), vec![1.0, 0.0]);
    }

    #[test]
    fn test_empty_result() {
        let result = SweepResult::new();
        assert!(result.is_empty());
        assert!(result.mean_dbm().is_empty());
    }
}
