//! Thorlabs PM100D optical power meter driver.
//!
//! Protocol overview:
//! - Format: SCPI over USB-TMC, LF-terminated
//! - Measurement: `MEAS:POW?` (unit per `SENS:POW:UNIT`)
//! - Calibration wavelength: `SENS:CORR:WAV <nm>` / `SENS:CORR:WAV?`
//! - Averaging: `SENS:AVER:COUN <n>` (~3 ms per sample at 1 kHz)
//! - Errors: standard event status register (`*ESR?`)
//!
//! The driver switches the meter to dBm (`SENS:POW:UNIT DBM`) during
//! initialization. The unit setting is sticky on the device, so pinning it
//! keeps readings comparable across sessions regardless of what the front
//! panel was left at.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use sweep_core::capabilities::{Identify, Readable};
use sweep_core::error::{Result, SweepError};
use sweep_core::scpi;
use sweep_core::transport::{ResourceClass, Transport};

const INSTRUMENT_NAME: &str = "pm100d";

/// Configuration for [`Pm100d`].
#[derive(Debug, Clone, Deserialize)]
pub struct Pm100dConfig {
    /// Calibration wavelength to apply at connection time, nm.
    #[serde(default)]
    pub calibration_wavelength_nm: Option<f64>,

    /// Averaging count to apply at connection time.
    #[serde(default)]
    pub averaging: Option<u16>,
}

impl Default for Pm100dConfig {
    fn default() -> Self {
        Self {
            calibration_wavelength_nm: None,
            averaging: None,
        }
    }
}

/// Driver for the Thorlabs PM100D power meter console.
pub struct Pm100d {
    transport: Arc<dyn Transport>,
    identity: String,
}

impl Pm100d {
    /// Create a driver over an existing transport, with device validation.
    ///
    /// # Errors
    /// Returns an error if:
    /// - the transport is not a USB-TMC endpoint
    /// - the device does not identify as a Thorlabs meter
    pub async fn new_async(transport: Arc<dyn Transport>, config: Pm100dConfig) -> Result<Self> {
        if transport.resource_class() != ResourceClass::UsbTmc {
            return Err(SweepError::TypeMismatch {
                resource: transport.resource_name().to_string(),
                expected: ResourceClass::UsbTmc.label(),
                found: transport.resource_class().label(),
            });
        }

        let identity = transport
            .query(scpi::IDN)
            .await
            .map_err(SweepError::Transport)?;
        if !identity.contains("Thorlabs") {
            return Err(SweepError::Config(format!(
                "device at '{}' identified as '{}', expected a Thorlabs power meter",
                transport.resource_name(),
                identity
            )));
        }
        tracing::info!(identity, "connected to PM100D");

        let meter = Self { transport, identity };

        // Pin the readout unit so read() always returns dBm.
        meter
            .command("SENS:POW:UNIT DBM", "pinning readout unit")
            .await?;

        if let Some(nm) = config.calibration_wavelength_nm {
            meter.set_calibration_wavelength(nm).await?;
        }
        if let Some(count) = config.averaging {
            meter.set_averaging(count).await?;
        }

        Ok(meter)
    }

    /// Set the responsivity calibration wavelength, nm.
    ///
    /// Must match the source under test or readings are systematically off;
    /// sweeps spanning many nm should re-set this per point.
    pub async fn set_calibration_wavelength(&self, wavelength_nm: f64) -> Result<()> {
        self.command(
            &format!("SENS:CORR:WAV {wavelength_nm:.1}"),
            "setting calibration wavelength",
        )
        .await
    }

    /// Query the current calibration wavelength, nm.
    pub async fn calibration_wavelength(&self) -> Result<f64> {
        self.query_f64("SENS:CORR:WAV?", "reading calibration wavelength")
            .await
    }

    /// Set the averaging count (samples per returned reading).
    pub async fn set_averaging(&self, count: u16) -> Result<()> {
        self.command(&format!("SENS:AVER:COUN {count}"), "setting averaging")
            .await
    }

    async fn query_f64(&self, command: &str, context: &str) -> Result<f64> {
        let response = match self.transport.query(command).await {
            Ok(response) => response,
            Err(fault) => {
                return Err(
                    scpi::translate_fault(self.transport.as_ref(), INSTRUMENT_NAME, context, fault)
                        .await,
                )
            }
        };
        response.trim().parse::<f64>().map_err(|_| SweepError::Execution {
            name: INSTRUMENT_NAME.to_string(),
            context: format!("{context}: unparseable response '{response}'"),
        })
    }

    /// Send a set command, then interrogate the error register.
    async fn command(&self, command: &str, context: &str) -> Result<()> {
        if let Err(fault) = self.transport.write(command).await {
            return Err(
                scpi::translate_fault(self.transport.as_ref(), INSTRUMENT_NAME, context, fault)
                    .await,
            );
        }
        scpi::check_error_register(self.transport.as_ref(), INSTRUMENT_NAME, context).await
    }
}

#[async_trait]
impl Readable for Pm100d {
    /// Take one power reading, dBm.
    async fn read(&self) -> Result<f64> {
        self.query_f64("MEAS:POW?", "reading power").await
    }
}

#[async_trait]
impl Identify for Pm100d {
    async fn identify(&self) -> Result<String> {
        Ok(self.identity.clone())
    }

    fn name(&self) -> &str {
        INSTRUMENT_NAME
    }
}
