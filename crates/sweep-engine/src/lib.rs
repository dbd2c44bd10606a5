//! Wavelength sweep engine.
//!
//! Drives a [`sweep_core::TunableLaser`] through a [`SweepProgram`] while
//! recording power-meter readings, with three guarantees the hardware cares
//! about:
//!
//! - a sweep program below the laser's addressable resolution is rejected
//!   before any instrument command is sent
//! - every step gates on the laser's steady-state predicate; a stabilization
//!   timeout fails the sweep rather than recording a bad point
//! - laser emission is switched off on every exit path (success, error, or
//!   task cancellation) via [`EmissionGuard`]
//!
//! [`refine`] layers batched fine sweeps around resonance estimates on top,
//! with per-window failure isolation.

pub mod engine;
pub mod guard;
pub mod program;
pub mod refine;
pub mod result;
pub mod sink;

pub use engine::SweepEngine;
pub use guard::EmissionGuard;
pub use program::SweepProgram;
pub use refine::{refine, RefinePlan};
pub use result::{SweepResult, WindowResult};
pub use sink::{parse_sweep_file_name, sweep_file_name, CsvSink, NullSink, SweepFileMeta, SweepSink};
