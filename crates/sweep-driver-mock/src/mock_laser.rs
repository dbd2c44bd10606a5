//! Mock tunable laser implementation.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;
use tokio::time::sleep;

use sweep_core::capabilities::{
    EmissionControl, Identify, PowerControl, Query, SteadyState, WavelengthTunable,
};
use sweep_core::error::{Result, SweepError};

/// Configuration for [`MockLaser`].
#[derive(Debug, Clone, Deserialize)]
pub struct MockLaserConfig {
    /// Initial wavelength in nm.
    #[serde(default = "default_wavelength")]
    pub wavelength_nm: f64,

    /// Initial defined power in dBm.
    #[serde(default = "default_power")]
    pub power_dbm: f64,

    /// Tuning range lower bound, nm.
    #[serde(default = "default_min")]
    pub min_wavelength_nm: f64,

    /// Tuning range upper bound, nm.
    #[serde(default = "default_max")]
    pub max_wavelength_nm: f64,

    /// Smallest addressable step, nm.
    #[serde(default = "default_resolution")]
    pub min_resolution_nm: f64,

    /// Number of polls before the steady-state predicate holds.
    #[serde(default)]
    pub settle_polls: u32,

    /// If set, `wait_steady_state` always reports a timeout.
    #[serde(default)]
    pub never_stabilizes: bool,

    /// If set, stabilization fails whenever the current wavelength falls
    /// inside this band (inclusive). Lets tests fail one refinement window
    /// while the rest succeed.
    #[serde(default)]
    pub unstable_band_nm: Option<(f64, f64)>,

    /// Steady-state wait budget, seconds.
    #[serde(default = "default_max_wait")]
    pub max_wait_secs: f64,

    /// Poll interval, seconds. The reference hardware value is 1.0; tests
    /// shorten it.
    #[serde(default = "default_poll")]
    pub poll_interval_secs: f64,
}

fn default_wavelength() -> f64 {
    1550.0
}

fn default_power() -> f64 {
    7.5
}

fn default_min() -> f64 {
    1500.0
}

fn default_max() -> f64 {
    1630.0
}

fn default_resolution() -> f64 {
    0.01
}

fn default_max_wait() -> f64 {
    0.2
}

fn default_poll() -> f64 {
    0.01
}

impl Default for MockLaserConfig {
    fn default() -> Self {
        Self {
            wavelength_nm: default_wavelength(),
            power_dbm: default_power(),
            min_wavelength_nm: default_min(),
            max_wavelength_nm: default_max(),
            min_resolution_nm: default_resolution(),
            settle_polls: 0,
            never_stabilizes: false,
            unstable_band_nm: None,
            max_wait_secs: default_max_wait(),
            poll_interval_secs: default_poll(),
        }
    }
}

/// Mock tunable laser with call counters.
///
/// Counts every instrument command so tests can verify fail-fast behavior
/// (e.g. a rejected sweep program must issue zero commands).
pub struct MockLaser {
    config: MockLaserConfig,
    wavelength_nm: RwLock<f64>,
    defined_power_dbm: RwLock<f64>,
    emission_on: AtomicBool,

    /// Total instrument commands issued (sets and state changes).
    command_count: AtomicU32,
    /// `set_wavelength` calls that reached the device (passed range check).
    wavelength_commands: AtomicU32,
    /// Polls consumed by the current `wait_steady_state` call.
    polls_remaining: AtomicU32,
}

impl MockLaser {
    pub fn new() -> Self {
        Self::with_config(MockLaserConfig::default())
    }

    pub fn with_config(config: MockLaserConfig) -> Self {
        let settle_polls = config.settle_polls;
        Self {
            wavelength_nm: RwLock::new(config.wavelength_nm),
            defined_power_dbm: RwLock::new(config.power_dbm),
            emission_on: AtomicBool::new(false),
            command_count: AtomicU32::new(0),
            wavelength_commands: AtomicU32::new(0),
            polls_remaining: AtomicU32::new(settle_polls),
            config,
        }
    }

    /// Total instrument commands issued so far.
    pub fn command_count(&self) -> u32 {
        self.command_count.load(Ordering::Relaxed)
    }

    /// Number of wavelength commands that reached the device.
    pub fn wavelength_command_count(&self) -> u32 {
        self.wavelength_commands.load(Ordering::Relaxed)
    }

    fn record_command(&self) {
        self.command_count.fetch_add(1, Ordering::Relaxed);
    }
}

impl Default for MockLaser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WavelengthTunable for MockLaser {
    async fn set_wavelength(&self, wavelength_nm: f64) -> Result<()> {
        let (min, max) = (self.config.min_wavelength_nm, self.config.max_wavelength_nm);
        if !(min..=max).contains(&wavelength_nm) {
            return Err(SweepError::Range {
                name: self.name().to_string(),
                quantity: "wavelength",
                value: wavelength_nm,
                min,
                max,
            });
        }
        self.record_command();
        self.wavelength_commands.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(wavelength_nm, "mock laser tuned");
        *self.wavelength_nm.write().await = wavelength_nm;
        self.polls_remaining
            .store(self.config.settle_polls, Ordering::Relaxed);
        Ok(())
    }

    async fn get_wavelength(&self, query: Query) -> Result<f64> {
        Ok(match query {
            Query::Minimum => self.config.min_wavelength_nm,
            Query::Maximum => self.config.max_wavelength_nm,
            Query::Default => default_wavelength(),
            Query::Current | Query::SetPoint => *self.wavelength_nm.read().await,
        })
    }

    async fn wavelength_locked(&self) -> Result<bool> {
        Ok(self.polls_remaining.load(Ordering::Relaxed) == 0)
    }

    fn min_resolution_nm(&self) -> f64 {
        self.config.min_resolution_nm
    }
}

#[async_trait]
impl PowerControl for MockLaser {
    async fn set_power(&self, power_dbm: f64) -> Result<()> {
        // Arbitrary but plausible dBm limits for a bench source.
        if !(-20.0..=13.0).contains(&power_dbm) {
            return Err(SweepError::Range {
                name: self.name().to_string(),
                quantity: "power",
                value: power_dbm,
                min: -20.0,
                max: 13.0,
            });
        }
        self.record_command();
        *self.defined_power_dbm.write().await = power_dbm;
        Ok(())
    }

    async fn get_power(&self, _query: Query) -> Result<f64> {
        Ok(*self.defined_power_dbm.read().await)
    }
}

#[async_trait]
impl EmissionControl for MockLaser {
    async fn set_state(&self, on: bool) -> Result<()> {
        // Idempotent: re-commanding the active state issues nothing.
        if self.emission_on.load(Ordering::Relaxed) == on {
            return Ok(());
        }
        self.record_command();
        self.emission_on.store(on, Ordering::Relaxed);
        Ok(())
    }

    async fn get_state(&self) -> Result<bool> {
        Ok(self.emission_on.load(Ordering::Relaxed))
    }
}

#[async_trait]
impl SteadyState for MockLaser {
    async fn wait_steady_state(&self) -> Result<bool> {
        if self.config.never_stabilizes {
            return Ok(false);
        }
        if let Some((lo, hi)) = self.config.unstable_band_nm {
            let current = *self.wavelength_nm.read().await;
            if (lo..=hi).contains(&current) {
                return Ok(false);
            }
        }

        let poll = Duration::from_secs_f64(self.config.poll_interval_secs);
        let budget = self.max_wait();
        let start = tokio::time::Instant::now();
        while self.polls_remaining.load(Ordering::Relaxed) > 0 {
            if start.elapsed() >= budget {
                return Ok(false);
            }
            sleep(poll).await;
            self.polls_remaining.fetch_sub(1, Ordering::Relaxed);
        }
        Ok(true)
    }

    fn max_wait(&self) -> Duration {
        Duration::from_secs_f64(self.config.max_wait_secs)
    }
}

#[async_trait]
impl Identify for MockLaser {
    async fn identify(&self) -> Result<String> {
        Ok("Mock Instruments,Tunable Laser,0000,0.1".to_string())
    }

    fn name(&self) -> &str {
        "mock_laser"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_range_check_leaves_wavelength_unchanged() {
        let laser = MockLaser::new();
        let before = laser.get_wavelength(Query::Current).await.unwrap();

        let err = laser.set_wavelength(2000.0).await.unwrap_err();
        assert!(matches!(err, SweepError::Range { .. }));
        assert_eq!(laser.get_wavelength(Query::Current).await.unwrap(), before);
        assert_eq!(laser.wavelength_command_count(), 0);
    }

    #[tokio::test]
    async fn test_set_state_is_idempotent() {
        let laser = MockLaser::new();
        laser.set_state(true).await.unwrap();
        let after_first = laser.command_count();
        laser.set_state(true).await.unwrap();
        assert_eq!(laser.command_count(), after_first);
        assert!(laser.get_state().await.unwrap());
    }

    #[tokio::test]
    async fn test_never_stabilizes() {
        let laser = MockLaser::with_config(MockLaserConfig {
            never_stabilizes: true,
            ..Default::default()
        });
        laser.set_wavelength(1550.0).await.unwrap();
        assert!(!laser.wait_steady_state().await.unwrap());
    }

    #[tokio::test]
    async fn test_settles_after_configured_polls() {
        let laser = MockLaser::with_config(MockLaserConfig {
            settle_polls: 2,
            poll_interval_secs: 0.001,
            max_wait_secs: 1.0,
            ..Default::default()
        });
        laser.set_wavelength(1551.0).await.unwrap();
        assert!(!laser.wavelength_locked().await.unwrap());
        assert!(laser.wait_steady_state().await.unwrap());
        assert!(laser.wavelength_locked().await.unwrap());
    }

    #[tokio::test]
    async fn test_unstable_band() {
        let laser = MockLaser::with_config(MockLaserConfig {
            unstable_band_nm: Some((1554.0, 1556.0)),
            ..Default::default()
        });
        laser.set_wavelength(1550.0).await.unwrap();
        assert!(laser.wait_steady_state().await.unwrap());
        laser.set_wavelength(1555.0).await.unwrap();
        assert!(!laser.wait_steady_state().await.unwrap());
    }
}
