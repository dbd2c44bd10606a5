//! Instrument capability traits.
//!
//! Instead of one monolithic `Instrument` trait, devices implement the
//! specific capabilities they support:
//!
//! - A tunable laser implements `WavelengthTunable + PowerControl +
//!   EmissionControl + SteadyState + Identify`
//! - A power meter implements `Readable + Identify`
//!
//! Adapters differ in command dialect (wavelength in nm vs. frequency in
//! GHz), in whether bounds are queryable or hardcoded, and in how steady
//! state is detected; the traits keep those as strategy points inside each
//! adapter without changing the calling contract.
//!
//! # Design
//!
//! Each capability trait:
//! - is async (`#[async_trait]`) and thread-safe (`Send + Sync`)
//! - takes `&self`; adapters use interior mutability for cached state
//! - returns [`crate::error::Result`] so callers can match on the taxonomy

use async_trait::async_trait;

use crate::error::{Result, SweepError};

/// Selects which value a getter returns.
///
/// SCPI instruments expose a current value alongside `MIN`/`MAX`/`DEF`
/// forms of the same query; `SetPoint` is the last commanded target, which
/// may differ from `Current` while the device is still slewing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Query {
    /// The live value as measured/reported by the device.
    #[default]
    Current,
    /// Lower bound of the addressable range.
    Minimum,
    /// Upper bound of the addressable range.
    Maximum,
    /// Factory default value.
    Default,
    /// The last commanded target value.
    SetPoint,
}

impl Query {
    /// SCPI query suffix for this modifier (empty for `Current`).
    pub fn scpi_suffix(&self) -> &'static str {
        match self {
            Query::Current => "",
            Query::Minimum => " MIN",
            Query::Maximum => " MAX",
            Query::Default => " DEF",
            Query::SetPoint => " SET",
        }
    }
}

/// Capability: wavelength tuning.
///
/// # Contract
/// - wavelengths are in nanometers regardless of the adapter's wire dialect
/// - `set_wavelength` MUST range-check against freshly queried bounds and
///   fail with [`SweepError::Range`] before sending the tune command
/// - `min_resolution_nm` is the smallest addressable step; sweep programs
///   below it are rejected by the engine
#[async_trait]
pub trait WavelengthTunable: Send + Sync {
    /// Command a new output wavelength.
    async fn set_wavelength(&self, wavelength_nm: f64) -> Result<()>;

    /// Query a wavelength value selected by `query`.
    async fn get_wavelength(&self, query: Query) -> Result<f64>;

    /// Shift the wavelength relative to its current value.
    async fn shift_wavelength(&self, delta_nm: f64) -> Result<()> {
        let current = self.get_wavelength(Query::Current).await?;
        self.set_wavelength(current + delta_nm).await
    }

    /// Shift the output frequency relative to its current value, in THz.
    ///
    /// Convenience for callers thinking in frequency (grid hopping); the
    /// shift is converted and applied through the nm interface.
    async fn shift_frequency(&self, delta_thz: f64) -> Result<()> {
        let current_nm = self.get_wavelength(Query::Current).await?;
        let target_thz = crate::units::wavelength_nm_to_frequency_thz(current_nm) + delta_thz;
        self.set_wavelength(crate::units::frequency_thz_to_wavelength_nm(target_thz))
            .await
    }

    /// Whether the device reports its output locked onto the commanded
    /// wavelength. Not every dialect exposes this.
    async fn wavelength_locked(&self) -> Result<bool> {
        Err(SweepError::Unsupported {
            name: "device".to_string(),
            operation: "wavelength lock query",
        })
    }

    /// Smallest addressable wavelength step in nm.
    fn min_resolution_nm(&self) -> f64;
}

/// Capability: output power control.
///
/// # Contract
/// - power is in dBm
/// - `set_power` range-checks against freshly queried bounds (power ceilings
///   can depend on the current wavelength) and, on success, updates the
///   adapter's cached defined power, the single source of truth for
///   steady-state comparison
#[async_trait]
pub trait PowerControl: Send + Sync {
    /// Command a new output power.
    async fn set_power(&self, power_dbm: f64) -> Result<()>;

    /// Query a power value selected by `query`.
    async fn get_power(&self, query: Query) -> Result<f64>;

    /// Shift the power relative to its current value.
    async fn shift_power(&self, delta_dbm: f64) -> Result<()> {
        let current = self.get_power(Query::Current).await?;
        self.set_power(current + delta_dbm).await
    }
}

/// Capability: output enable.
///
/// # Contract
/// - `set_state` is idempotent: commanding an already-active state is a
///   side-effect-free no-op
#[async_trait]
pub trait EmissionControl: Send + Sync {
    /// Enable (`true`) or disable (`false`) the output.
    async fn set_state(&self, on: bool) -> Result<()>;

    /// Query whether the output is enabled.
    async fn get_state(&self) -> Result<bool>;
}

/// Capability: steady-state gate.
///
/// # Contract
/// - polls the device's steady-state predicate at a fixed interval until it
///   holds or the wait budget elapses
/// - returns `Ok(false)` on timeout rather than an error: the caller decides
///   whether a timeout is fatal
/// - the predicate's comparison precision must be coarser than the device's
///   own noise floor, or it never stabilizes
#[async_trait]
pub trait SteadyState: Send + Sync {
    /// Block until the device reports steady state or the budget elapses.
    async fn wait_steady_state(&self) -> Result<bool>;

    /// The wait budget per call.
    fn max_wait(&self) -> std::time::Duration;
}

/// Capability: identity.
#[async_trait]
pub trait Identify: Send + Sync {
    /// Adapter identity string. Adapters whose protocol has no identity
    /// query return a hardcoded constant rather than propagating an error.
    async fn identify(&self) -> Result<String>;

    /// Short instrument name used in logs, filenames and error messages.
    fn name(&self) -> &str;
}

/// Capability: scalar readout (power meters).
///
/// # Contract
/// - `read()` performs one measurement and returns dBm
#[async_trait]
pub trait Readable: Send + Sync {
    /// Take a single reading.
    async fn read(&self) -> Result<f64>;
}

/// Composite: everything the sweep engine needs from a laser.
pub trait TunableLaser:
    WavelengthTunable + PowerControl + EmissionControl + SteadyState + Identify
{
}

impl<T: WavelengthTunable + PowerControl + EmissionControl + SteadyState + Identify> TunableLaser
    for T
{
}

/// Composite: everything the sweep engine needs from a power meter.
pub trait PowerMeter: Readable + Identify {}

impl<T: Readable + Identify> PowerMeter for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FixedLaser {
        wavelength_nm: Mutex<f64>,
        power_dbm: Mutex<f64>,
    }

    #[async_trait]
    impl WavelengthTunable for FixedLaser {
        async fn set_wavelength(&self, wavelength_nm: f64) -> Result<()> {
            *self.wavelength_nm.lock().unwrap() = wavelength_nm;
            Ok(())
        }

        async fn get_wavelength(&self, _query: Query) -> Result<f64> {
            Ok(*self.wavelength_nm.lock().unwrap())
        }

        fn min_resolution_nm(&self) -> f64 {
            0.001
        }
    }

    #[async_trait]
    impl PowerControl for FixedLaser {
        async fn set_power(&self, power_dbm: f64) -> Result<()> {
            *self.power_dbm.lock().unwrap() = power_dbm;
            Ok(())
        }

        async fn get_power(&self, _query: Query) -> Result<f64> {
            Ok(*self.power_dbm.lock().unwrap())
        }
    }

    #[tokio::test]
    async fn test_shift_wavelength_default_method() {
        let laser = FixedLaser {
            wavelength_nm: Mutex::new(1550.0),
            power_dbm: Mutex::new(0.0),
        };
        laser.shift_wavelength(0.5).await.unwrap();
        assert_eq!(laser.get_wavelength(Query::Current).await.unwrap(), 1550.5);
    }

    #[tokio::test]
    async fn test_shift_frequency_default_method() {
        let laser = FixedLaser {
            wavelength_nm: Mutex::new(1550.0),
            power_dbm: Mutex::new(0.0),
        };
        // +0.1 THz from 1550.0 nm (193.414 THz) lands near 1549.199 nm.
        laser.shift_frequency(0.1).await.unwrap();
        let shifted = laser.get_wavelength(Query::Current).await.unwrap();
        assert!((shifted - 1549.199).abs() < 1e-3);
        assert!(shifted < 1550.0);
    }

    #[tokio::test]
    async fn test_shift_power_default_method() {
        let laser = FixedLaser {
            wavelength_nm: Mutex::new(1550.0),
            power_dbm: Mutex::new(6.0),
        };
        laser.shift_power(1.5).await.unwrap();
        assert_eq!(laser.get_power(Query::Current).await.unwrap(), 7.5);
    }

    #[tokio::test]
    async fn test_wavelength_lock_default_is_unsupported() {
        let laser = FixedLaser {
            wavelength_nm: Mutex::new(1550.0),
            power_dbm: Mutex::new(0.0),
        };
        assert!(matches!(
            laser.wavelength_locked().await,
            Err(SweepError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_query_scpi_suffix() {
        assert_eq!(Query::Current.scpi_suffix(), "");
        assert_eq!(Query::Minimum.scpi_suffix(), " MIN");
        assert_eq!(Query::Maximum.scpi_suffix(), " MAX");
    }
}
