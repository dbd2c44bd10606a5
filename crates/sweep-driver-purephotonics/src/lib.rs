//! PurePhotonics PPCL550 tunable laser adapter.
//!
//! ASCII command dialect over a serial line. The wire protocol speaks
//! frequency in GHz; this adapter converts to and from nanometers at the
//! boundary so callers see the same units as every other laser.

mod purephotonics;

pub use purephotonics::{PurePhotonicsConfig, PurePhotonicsLaser};
