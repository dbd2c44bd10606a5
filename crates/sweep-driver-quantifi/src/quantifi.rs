//! Quantifi Photonics tunable laser driver.
//!
//! Protocol overview:
//! - Format: SCPI over TCP (socket port 5025), LF-terminated
//! - Wavelength: `:SOURn:CHANm:WAV` in nanometers, `MIN`/`MAX` queryable
//! - Power: `:SOURn:CHANm:POW` in dBm
//! - Emission: `:OUTPn:CHANm:STAT ON|OFF`
//! - Errors: standard event status register (`*ESR?`)
//!
//! Steady state: the device has no lock flag, so stabilization is detected
//! by comparing the measured output power against the commanded power. The
//! comparison rounds both sides to two decimals; the instrument's readout
//! jitters in the third decimal even when settled.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;
use tokio::time::sleep;

use sweep_core::capabilities::{
    EmissionControl, Identify, PowerControl, Query, SteadyState, WavelengthTunable,
};
use sweep_core::error::{Result, SweepError};
use sweep_core::scpi;
use sweep_core::transport::{ResourceClass, TcpTransport, Transport};

const INSTRUMENT_NAME: &str = "quantifi";

/// Configuration for [`QuantifiLaser`].
#[derive(Debug, Clone, Deserialize)]
pub struct QuantifiConfig {
    /// Instrument address, e.g. `"192.168.101.201:5025"`.
    pub resource: String,

    /// SCPI source index.
    #[serde(default = "default_index")]
    pub source: u8,

    /// SCPI channel index within the source.
    #[serde(default = "default_index")]
    pub channel: u8,

    /// Optional power to command at connection time, dBm.
    #[serde(default)]
    pub power_dbm: Option<f64>,

    /// Steady-state wait budget, seconds.
    #[serde(default = "default_max_wait")]
    pub max_wait_secs: f64,

    /// Steady-state poll interval, seconds.
    #[serde(default = "default_poll")]
    pub poll_interval_secs: f64,

    /// Transport timeout, seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: f64,
}

fn default_index() -> u8 {
    1
}

fn default_max_wait() -> f64 {
    25.0
}

fn default_poll() -> f64 {
    1.0
}

fn default_timeout() -> f64 {
    5.0
}

/// Driver for Quantifi Photonics tunable lasers.
///
/// Tuning bounds are queried from the device at command time rather than
/// cached: firmware updates have moved them before.
pub struct QuantifiLaser {
    transport: Arc<dyn Transport>,
    identity: String,
    /// Last commanded output power, dBm. Source of truth for the
    /// steady-state comparison.
    defined_power_dbm: RwLock<f64>,
    max_wait: Duration,
    poll_interval: Duration,

    // Command roots, e.g. ":SOUR1:CHAN1:WAV".
    wav_root: String,
    pow_root: String,
    stat_root: String,
}

impl QuantifiLaser {
    /// Connect to the instrument named in `config` and validate its identity.
    pub async fn connect(config: QuantifiConfig) -> Result<Self> {
        let timeout = Duration::from_secs_f64(config.timeout_secs);
        let transport = TcpTransport::connect(&config.resource, timeout).await?;
        Self::new_async(Arc::new(transport), config).await
    }

    /// Create a driver over an existing transport, with device validation.
    ///
    /// # Errors
    /// Returns an error if:
    /// - the transport is not a TCP endpoint
    /// - the device does not identify as a Quantifi instrument
    pub async fn new_async(transport: Arc<dyn Transport>, config: QuantifiConfig) -> Result<Self> {
        if transport.resource_class() != ResourceClass::Tcp {
            return Err(SweepError::TypeMismatch {
                resource: transport.resource_name().to_string(),
                expected: ResourceClass::Tcp.label(),
                found: transport.resource_class().label(),
            });
        }

        let identity = transport
            .query(scpi::IDN)
            .await
            .map_err(SweepError::Transport)?;
        if !identity.contains("Quantifi") {
            return Err(SweepError::Config(format!(
                "device at '{}' identified as '{}', expected a Quantifi laser",
                transport.resource_name(),
                identity
            )));
        }
        tracing::info!(identity, "connected to Quantifi laser");

        let prefix = format!("SOUR{}:CHAN{}", config.source, config.channel);
        let laser = Self {
            wav_root: format!(":{prefix}:WAV"),
            pow_root: format!(":{prefix}:POW"),
            stat_root: format!(":OUTP{}:CHAN{}:STAT", config.source, config.channel),
            transport,
            identity,
            defined_power_dbm: RwLock::new(0.0),
            max_wait: Duration::from_secs_f64(config.max_wait_secs),
            poll_interval: Duration::from_secs_f64(config.poll_interval_secs),
        };

        // Seed the defined-power cache from the device so steady-state
        // comparison works before the first set_power call.
        let current = laser
            .query_f64(&format!("{}?", laser.pow_root), "reading initial power")
            .await?;
        *laser.defined_power_dbm.write().await = current;

        if let Some(dbm) = config.power_dbm {
            laser.set_power(dbm).await?;
        }

        Ok(laser)
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
        response.trim().parse::<f64>().map_err(|_| {
            SweepError::Execution {
                name: INSTRUMENT_NAME.to_string(),
                context: format!("{context}: unparseable response '{response}'"),
            }
        })
    }

    /// Send a set command, then interrogate the error register.
    ///
    /// The register query catches faults the instrument accepts on the wire
    /// but rejects during execution (a write alone cannot report those).
    async fn command(&self, command: &str, context: &str) -> Result<()> {
        if let Err(fault) = self.transport.write(command).await {
            return Err(
                scpi::translate_fault(self.transport.as_ref(), INSTRUMENT_NAME, context, fault)
                    .await,
            );
        }
        scpi::check_error_register(self.transport.as_ref(), INSTRUMENT_NAME, context).await
    }

    async fn bounds(&self, root: &str, context: &str) -> Result<(f64, f64)> {
        let min = self.query_f64(&format!("{root}? MIN"), context).await?;
        let max = self.query_f64(&format!("{root}? MAX"), context).await?;
        Ok((min, max))
    }

    fn round_centi(value: f64) -> f64 {
        (value * 100.0).round() / 100.0
    }
}

#[async_trait]
impl WavelengthTunable for QuantifiLaser {
    async fn set_wavelength(&self, wavelength_nm: f64) -> Result<()> {
        let (min, max) = self
            .bounds(&self.wav_root, "querying wavelength bounds")
            .await?;
        if !(min..=max).contains(&wavelength_nm) {
            return Err(SweepError::Range {
                name: INSTRUMENT_NAME.to_string(),
                quantity: "wavelength",
                value: wavelength_nm,
                min,
                max,
            });
        }
        tracing::debug!(wavelength_nm, "tuning");
        self.command(
            &format!("{} {:.3}", self.wav_root, wavelength_nm),
            "setting wavelength",
        )
        .await
    }

    async fn get_wavelength(&self, query: Query) -> Result<f64> {
        self.query_f64(
            &format!("{}?{}", self.wav_root, query.scpi_suffix()),
            "reading wavelength",
        )
        .await
    }

    fn min_resolution_nm(&self) -> f64 {
        0.001
    }
}

#[async_trait]
impl PowerControl for QuantifiLaser {
    async fn set_power(&self, power_dbm: f64) -> Result<()> {
        let (min, max) = self.bounds(&self.pow_root, "querying power bounds").await?;
        if !(min..=max).contains(&power_dbm) {
            return Err(SweepError::Range {
                name: INSTRUMENT_NAME.to_string(),
                quantity: "power",
                value: power_dbm,
                min,
                max,
            });
        }
        self.command(
            &format!("{} {:.2}", self.pow_root, power_dbm),
            "setting power",
        )
        .await?;
        *self.defined_power_dbm.write().await = power_dbm;
        Ok(())
    }

    async fn get_power(&self, query: Query) -> Result<f64> {
        self.query_f64(
            &format!("{}?{}", self.pow_root, query.scpi_suffix()),
            "reading power",
        )
        .await
    }
}

#[async_trait]
impl EmissionControl for QuantifiLaser {
    async fn set_state(&self, on: bool) -> Result<()> {
        // Re-commanding the active state is a no-op on the wire.
        if self.get_state().await? == on {
            return Ok(());
        }
        let verb = if on { "ON" } else { "OFF" };
        tracing::info!(state = verb, "switching emission");
        self.command(&format!("{} {}", self.stat_root, verb), "switching emission")
            .await
    }

    async fn get_state(&self) -> Result<bool> {
        let response = match self.transport.query(&format!("{}?", self.stat_root)).await {
            Ok(response) => response,
            Err(fault) => {
                return Err(scpi::translate_fault(
                    self.transport.as_ref(),
                    INSTRUMENT_NAME,
                    "reading emission state",
                    fault,
                )
                .await)
            }
        };
        let trimmed = response.trim();
        Ok(trimmed == "1" || trimmed.eq_ignore_ascii_case("on"))
    }
}

#[async_trait]
impl SteadyState for QuantifiLaser {
    /// Poll measured output power until it matches the commanded power.
    ///
    /// Returns `Ok(false)` if the budget elapses first.
    async fn wait_steady_state(&self) -> Result<bool> {
        let target = Self::round_centi(*self.defined_power_dbm.read().await);
        let start = tokio::time::Instant::now();
        loop {
            let measured = self.get_power(Query::Current).await?;
            if Self::round_centi(measured) == target {
                tracing::debug!(measured, "output settled");
                return Ok(true);
            }
            if start.elapsed() >= self.max_wait {
                tracing::warn!(measured, target, "stabilization wait budget elapsed");
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
impl Identify for QuantifiLaser {
    async fn identify(&self) -> Result<String> {
        Ok(self.identity.clone())
    }

    fn name(&self) -> &str {
        INSTRUMENT_NAME
    }
}
