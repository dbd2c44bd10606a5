//! PurePhotonics PPCL550 tunable laser driver.
//!
//! Protocol overview:
//! - Format: line-oriented ASCII over serial, LF-terminated
//! - Frequency: `FREQ:SET <GHz>` / `FREQ:SET?` / `FREQ:ACT?` (no MIN/MAX
//!   queries; the C-band tuning range is fixed in firmware)
//! - Power: `POW:SET <dBm>` / `POW:ACT?`
//! - Emission: `STAT:EMIS 1|0` / `STAT:EMIS?`
//! - Lock flag: `STAT:LOCK?` reports `1` once the cavity has locked onto the
//!   commanded frequency
//! - Set commands echo `OK`; anything else means the command was refused
//!
//! The device has no identity query and no error register. Identity is a
//! hardcoded constant; refused commands surface as execution errors from the
//! echo check.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::time::sleep;

use sweep_core::capabilities::{
    EmissionControl, Identify, PowerControl, Query, SteadyState, WavelengthTunable,
};
use sweep_core::error::{Result, SweepError};
use sweep_core::transport::{ResourceClass, Transport};
use sweep_core::units::{frequency_thz_to_wavelength_nm, wavelength_nm_to_frequency_thz};

const INSTRUMENT_NAME: &str = "purephotonics";
const IDENTITY: &str = "PurePhotonics,PPCL550,unknown,unknown";

/// Firmware tuning range, GHz (full C-band).
const FREQ_MIN_GHZ: f64 = 191_500.0;
const FREQ_MAX_GHZ: f64 = 196_250.0;

/// Output power limits, dBm (firmware enforced, not queryable).
const POWER_MIN_DBM: f64 = 6.0;
const POWER_MAX_DBM: f64 = 13.5;

/// Configuration for [`PurePhotonicsLaser`].
#[derive(Debug, Clone, Deserialize)]
pub struct PurePhotonicsConfig {
    /// Optional power to command at connection time, dBm.
    #[serde(default)]
    pub power_dbm: Option<f64>,

    /// Steady-state wait budget, seconds. Cavity locking after a large jump
    /// can take tens of seconds on this device.
    #[serde(default = "default_max_wait")]
    pub max_wait_secs: f64,

    /// Steady-state poll interval, seconds.
    #[serde(default = "default_poll")]
    pub poll_interval_secs: f64,
}

fn default_max_wait() -> f64 {
    30.0
}

fn default_poll() -> f64 {
    1.0
}

impl Default for PurePhotonicsConfig {
    fn default() -> Self {
        Self {
            power_dbm: None,
            max_wait_secs: default_max_wait(),
            poll_interval_secs: default_poll(),
        }
    }
}

fn ghz_to_nm(ghz: f64) -> f64 {
    frequency_thz_to_wavelength_nm(ghz / 1000.0)
}

fn nm_to_ghz(nm: f64) -> f64 {
    wavelength_nm_to_frequency_thz(nm) * 1000.0
}

/// Driver for PurePhotonics PPCL550 tunable lasers.
pub struct PurePhotonicsLaser {
    transport: Arc<dyn Transport>,
    max_wait: Duration,
    poll_interval: Duration,
}

impl PurePhotonicsLaser {
    /// Create a driver over an existing serial transport, with a liveness
    /// probe.
    ///
    /// # Errors
    /// Returns an error if:
    /// - the transport is not a serial endpoint
    /// - the device does not answer the initial frequency query
    pub async fn new_async(
        transport: Arc<dyn Transport>,
        config: PurePhotonicsConfig,
    ) -> Result<Self> {
        if transport.resource_class() != ResourceClass::Serial {
            return Err(SweepError::TypeMismatch {
                resource: transport.resource_name().to_string(),
                expected: ResourceClass::Serial.label(),
                found: transport.resource_class().label(),
            });
        }

        let laser = Self {
            transport,
            max_wait: Duration::from_secs_f64(config.max_wait_secs),
            poll_interval: Duration::from_secs_f64(config.poll_interval_secs),
        };

        // No identity query in this dialect; probe with a harmless read.
        let ghz = laser.query_f64("FREQ:ACT?", "probing device").await?;
        tracing::info!(frequency_ghz = ghz, "connected to PurePhotonics laser");

        if let Some(dbm) = config.power_dbm {
            laser.set_power(dbm).await?;
        }

        Ok(laser)
    }

    async fn query_f64(&self, command: &str, context: &str) -> Result<f64> {
        let response = self
            .transport
            .query(command)
            .await
            .map_err(SweepError::Transport)?;
        response.trim().parse::<f64>().map_err(|_| SweepError::Execution {
            name: INSTRUMENT_NAME.to_string(),
            context: format!("{context}: unparseable response '{response}'"),
        })
    }

    /// Send a set command and verify the `OK` echo.
    async fn command(&self, command: &str, context: &str) -> Result<()> {
        let response = self
            .transport
            .query(command)
            .await
            .map_err(SweepError::Transport)?;
        if response.trim() != "OK" {
            return Err(SweepError::Execution {
                name: INSTRUMENT_NAME.to_string(),
                context: format!("{context}: device refused command ('{response}')"),
            });
        }
        Ok(())
    }

    fn wavelength_bounds_nm() -> (f64, f64) {
        // Frequency max maps to wavelength min.
        (ghz_to_nm(FREQ_MAX_GHZ), ghz_to_nm(FREQ_MIN_GHZ))
    }
}

#[async_trait]
impl WavelengthTunable for PurePhotonicsLaser {
    async fn set_wavelength(&self, wavelength_nm: f64) -> Result<()> {
        let (min, max) = Self::wavelength_bounds_nm();
        if !(min..=max).contains(&wavelength_nm) {
            return Err(SweepError::Range {
                name: INSTRUMENT_NAME.to_string(),
                quantity: "wavelength",
                value: wavelength_nm,
                min,
                max,
            });
        }
        let ghz = nm_to_ghz(wavelength_nm);
        tracing::debug!(wavelength_nm, frequency_ghz = ghz, "tuning");
        self.command(&format!("FREQ:SET {ghz:.1}"), "setting frequency")
            .await
    }

    async fn get_wavelength(&self, query: Query) -> Result<f64> {
        let (min, max) = Self::wavelength_bounds_nm();
        let ghz = match query {
            Query::Minimum => return Ok(min),
            Query::Maximum => return Ok(max),
            Query::Default => (FREQ_MIN_GHZ + FREQ_MAX_GHZ) / 2.0,
            Query::Current => self.query_f64("FREQ:ACT?", "reading frequency").await?,
            Query::SetPoint => self.query_f64("FREQ:SET?", "reading frequency setpoint").await?,
        };
        Ok(ghz_to_nm(ghz))
    }

    async fn wavelength_locked(&self) -> Result<bool> {
        let response = self
            .transport
            .query("STAT:LOCK?")
            .await
            .map_err(SweepError::Transport)?;
        Ok(response.trim() == "1")
    }

    fn min_resolution_nm(&self) -> f64 {
        // 0.1 GHz fine-tune step, ~0.0008 nm at 1550 nm.
        0.001
    }
}

#[async_trait]
impl PowerControl for PurePhotonicsLaser {
    async fn set_power(&self, power_dbm: f64) -> Result<()> {
        if !(POWER_MIN_DBM..=POWER_MAX_DBM).contains(&power_dbm) {
            return Err(SweepError::Range {
                name: INSTRUMENT_NAME.to_string(),
                quantity: "power",
                value: power_dbm,
                min: POWER_MIN_DBM,
                max: POWER_MAX_DBM,
            });
        }
        self.command(&format!("POW:SET {power_dbm:.2}"), "setting power")
            .await
    }

    async fn get_power(&self, query: Query) -> Result<f64> {
        match query {
            Query::Minimum => Ok(POWER_MIN_DBM),
            Query::Maximum => Ok(POWER_MAX_DBM),
            Query::Default => Ok(POWER_MIN_DBM),
            Query::Current => self.query_f64("POW:ACT?", "reading power").await,
            Query::SetPoint => self.query_f64("POW:SET?", "reading power setpoint").await,
        }
    }
}

#[async_trait]
impl EmissionControl for PurePhotonicsLaser {
    async fn set_state(&self, on: bool) -> Result<()> {
        if self.get_state().await? == on {
            return Ok(());
        }
        tracing::info!(on, "switching emission");
        let flag = if on { "1" } else { "0" };
        self.command(&format!("STAT:EMIS {flag}"), "switching emission")
            .await
    }

    async fn get_state(&self) -> Result<bool> {
        let response = self
            .transport
            .query("STAT:EMIS?")
            .await
            .map_err(SweepError::Transport)?;
        Ok(response.trim() == "1")
    }
}

#[async_trait]
impl SteadyState for PurePhotonicsLaser {
    /// Poll the cavity lock flag until it reports locked.
    ///
    /// Returns `Ok(false)` if the budget elapses first.
    async fn wait_steady_state(&self) -> Result<bool> {
        let start = tokio::time::Instant::now();
        loop {
            if self.wavelength_locked().await? {
                return Ok(true);
            }
            if start.elapsed() >= self.max_wait {
                tracing::warn!("lock wait budget elapsed");
                return Ok(false);
            }
            sleep(self.poll_interval).await;
        }
    }

    fn max_wait(&self) -> Duration {
        self.max_wait
    }
}

#[async_trait]
impl Identify for PurePhotonicsLaser {
    async fn identify(&self) -> Result<String> {
        Ok(IDENTITY.to_string())
    }

    fn name(&self) -> &str {
        INSTRUMENT_NAME
    }
}
