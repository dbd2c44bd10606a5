//! Mock instruments for testing and simulation.
//!
//! - [`MockLaser`]: in-memory tunable laser with call counters and
//!   programmable steady-state behavior
//! - [`MockPowerMeter`]: fixed or scripted dBm readings
//! - [`ScriptedTransport`]: a [`sweep_core::Transport`] that replays an
//!   expected command/response script, for adapter-level tests

mod mock_laser;
mod mock_power_meter;
mod scripted;

pub use mock_laser::{MockLaser, MockLaserConfig};
pub use mock_power_meter::MockPowerMeter;
pub use scripted::ScriptedTransport;
