//! Quantifi Photonics tunable laser adapter.
//!
//! SCPI over a TCP socket (port 5025 on the instrument). Wavelengths are
//! native nanometers on the wire; tuning bounds are queried from the device
//! rather than hardcoded.

mod quantifi;

pub use quantifi::{QuantifiConfig, QuantifiLaser};
