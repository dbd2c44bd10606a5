//! Core types and traits for tunable-laser characterization sweeps.
//!
//! This crate defines the shared vocabulary of the workspace:
//!
//! - [`error::SweepError`]: the error taxonomy every adapter and the sweep
//!   engine report through
//! - [`transport`]: the opaque request/response channel an instrument sits
//!   behind (SCPI text over TCP, or anything else that can answer a query)
//! - [`capabilities`]: fine-grained instrument capability traits and the
//!   [`capabilities::TunableLaser`] / [`capabilities::PowerMeter`] composites
//! - [`scpi`]: IEEE-488.2 common-command helpers (`*IDN?`, `*ESR?`, `*OPC?`)
//! - [`units`]: wavelength/frequency conversions and the DWDM channel grid
//!
//! Concrete device adapters live in the `sweep-driver-*` crates; sweep
//! orchestration lives in `sweep-engine`.

pub mod capabilities;
pub mod error;
pub mod scpi;
pub mod transport;
pub mod units;

pub use capabilities::{
    EmissionControl, Identify, PowerControl, PowerMeter, Query, Readable, SteadyState,
    TunableLaser, WavelengthTunable,
};
pub use error::{Result, SweepError};
pub use transport::{ResourceClass, Transport, TransportError};
