//! Error taxonomy for instrument adapters and the sweep engine.
//!
//! Every failure an adapter can surface is classified into exactly one
//! variant before it reaches a caller. Transport-level faults are translated
//! by querying the device's standard event status register (see
//! [`crate::scpi::classify_esr`]), which turns an opaque wire fault into one
//! of the `Command` / `Execution` / `DeviceDependent` classes.
//!
//! Propagation policy: adapters and the sweep engine never swallow errors;
//! resonance refinement is the sole component that catches per-window
//! failures to preserve batch progress.

use std::time::Duration;
use thiserror::Error;

use crate::transport::TransportError;

/// Convenience alias used across the workspace.
pub type Result<T> = std::result::Result<T, SweepError>;

/// Primary error type for sweep automation.
#[derive(Error, Debug)]
pub enum SweepError {
    /// A commanded value falls outside the instrument's bounds.
    ///
    /// Caller error, never retried. Bounds are queried fresh at command time
    /// because some instruments expose wavelength-dependent power ceilings.
    #[error("{name}: {quantity} {value} outside instrument range [{min}, {max}]")]
    Range {
        name: String,
        quantity: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Requested sweep step is below the laser's minimum addressable step.
    ///
    /// Raised before any hardware interaction (fail fast).
    #[error("{name}: requested resolution {requested_nm} nm is below the minimum addressable step {minimum_nm} nm")]
    Resolution {
        name: String,
        requested_nm: f64,
        minimum_nm: f64,
    },

    /// The instrument failed to reach steady state within its wait budget.
    ///
    /// Carries the offending wavelength and the time spent waiting; treated
    /// as a hard sweep failure, never silently skipped.
    #[error("{name}: failed to stabilize at {wavelength_nm} nm within {waited:?}")]
    StabilizationTimeout {
        name: String,
        wavelength_nm: f64,
        waited: Duration,
    },

    /// Device reported a command error (ESR bit 5) after a failed call.
    #[error("{name}: command error while {context}")]
    Command { name: String, context: String },

    /// Device reported an execution error (ESR bit 4) after a failed call.
    #[error("{name}: execution error while {context}")]
    Execution { name: String, context: String },

    /// Device reported a device-dependent error (ESR bit 3) after a failed call.
    #[error("{name}: device-dependent error while {context}")]
    DeviceDependent { name: String, context: String },

    /// Adapter constructed against a resource of the wrong transport class.
    ///
    /// Fails at construction, before any commands are sent.
    #[error("resource '{resource}' is not a {expected} endpoint (found {found})")]
    TypeMismatch {
        resource: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Transport fault that could not be classified via the error register.
    #[error("transport fault: {0}")]
    Transport(#[from] TransportError),

    /// Configuration values parsed but failed semantic validation.
    #[error("configuration error: {0}")]
    Config(String),

    /// Capability not supported by this device.
    #[error("{name} does not support {operation}")]
    Unsupported {
        name: String,
        operation: &'static str,
    },

    /// Sink I/O failure while streaming sweep rows.
    #[error("sink error: {0}")]
    Sink(String),

    /// Standard I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SweepError {
    /// Whether this error came from the device's own error register.
    pub fn is_device_reported(&self) -> bool {
        matches!(
            self,
            SweepError::Command { .. }
                | SweepError::Execution { .. }
                | SweepError::DeviceDependent { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_error_display() {
        let err = SweepError::Range {
            name: "quantifi".into(),
            quantity: "wavelength",
            value: 1700.0,
            min: 1527.6,
            max: 1565.5,
        };
        assert_eq!(
            err.to_string(),
            "quantifi: wavelength 1700 outside instrument range [1527.6, 1565.5]"
        );
    }

    #[test]
    fn test_stabilization_timeout_carries_context() {
        let err = SweepError::StabilizationTimeout {
            name: "quantifi".into(),
            wavelength_nm: 1550.12,
            waited: Duration::from_secs(25),
        };
        let msg = err.to_string();
        assert!(msg.contains("1550.12"));
        assert!(msg.contains("25s"));
    }

    #[test]
    fn test_device_reported_classes() {
        let cmd = SweepError::Command {
            name: "pm100d".into(),
            context: "reading power".into(),
        };
        assert!(cmd.is_device_reported());

        let range = SweepError::Range {
            name: "pm100d".into(),
            quantity: "power",
            value: 20.0,
            min: -10.0,
            max: 13.0,
        };
        assert!(!range.is_device_reported());
    }
}
