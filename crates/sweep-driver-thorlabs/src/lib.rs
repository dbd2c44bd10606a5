//! Thorlabs PM100D optical power meter adapter.
//!
//! SCPI over USB-TMC. The driver pins the measurement unit to dBm at
//! connection time so readings match the rest of the workspace without
//! per-read conversion.

mod pm100d;

pub use pm100d::{Pm100d, Pm100dConfig};
