//! Resonance refinement: batched fine sweeps around coarse estimates.
//!
//! A coarse sweep locates candidate resonances; refinement re-sweeps a
//! narrow window around each estimate at finer resolution. One bad window
//! (a resonance near the laser's range edge, a stabilization timeout) must
//! not cost the rest of an overnight batch, so this is the single place in
//! the workspace where errors are caught instead of propagated.

use sweep_core::Result;

use crate::engine::SweepEngine;
use crate::program::SweepProgram;
use crate::result::WindowResult;
use crate::sink::SweepSink;

/// Window geometry shared by every estimate in a refinement batch.
#[derive(Debug, Clone, Copy)]
pub struct RefinePlan {
    /// Half-width of the window around each estimate, nm.
    pub half_width_nm: f64,
    /// Fine sweep resolution, nm.
    pub resolution_nm: f64,
    /// Readings per wavelength.
    pub repetitions: u32,
}

/// Sweep a fine window around each estimate, in order.
///
/// `sink_for` supplies the sink for each window (typically a
/// [`crate::sink::CsvSink`] named after the window's center). The returned
/// vector has exactly one entry per estimate, in input order; failed windows
/// carry their error in [`WindowResult::error`] and the batch continues.
pub async fn refine<F>(
    engine: &SweepEngine,
    estimates_nm: &[f64],
    plan: &RefinePlan,
    mut sink_for: F,
) -> Vec<WindowResult>
where
    F: FnMut(f64) -> Result<Box<dyn SweepSink>>,
{
    let mut windows = Vec::with_capacity(estimates_nm.len());
    for &center_nm in estimates_nm {
        let outcome = refine_window(engine, center_nm, plan, &mut sink_for).await;
        windows.push(match outcome {
            Ok(result) => WindowResult {
                center_nm,
                result,
                error: None,
            },
            Err(err) => {
                tracing::warn!(center_nm, %err, "refinement window failed, continuing batch");
                WindowResult {
                    center_nm,
                    result: Default::default(),
                    error: Some(err),
                }
            }
        });
    }
    windows
}

async fn refine_window<F>(
    engine: &SweepEngine,
    center_nm: f64,
    plan: &RefinePlan,
    sink_for: &mut F,
) -> Result<crate::result::SweepResult>
where
    F: FnMut(f64) -> Result<Box<dyn SweepSink>>,
{
    let program = SweepProgram::new(
        center_nm - plan.half_width_nm,
        center_nm + plan.half_width_nm,
        plan.resolution_nm,
        plan.repetitions,
    )?;
    let mut sink = sink_for(center_nm)?;
    engine.run_sweep(&program, sink.as_mut()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::NullSink;
    use std::sync::Arc;
    use sweep_core::{EmissionControl, SweepError};
    use sweep_driver_mock::{MockLaser, MockLaserConfig, MockPowerMeter};

    fn null_sink(_center: f64) -> Result<Box<dyn SweepSink>> {
        Ok(Box::new(NullSink))
    }

    #[tokio::test]
    async fn test_failed_window_does_not_stop_the_batch() {
        // The middle estimate sits in a band where the laser never settles.
        let laser = Arc::new(MockLaser::with_config(MockLaserConfig {
            unstable_band_nm: Some((1554.0, 1556.0)),
            ..Default::default()
        }));
        let meter = Arc::new(MockPowerMeter::fixed(7.5));
        let engine = SweepEngine::new(laser.clone(), meter);

        let plan = RefinePlan {
            half_width_nm: 0.2,
            resolution_nm: 0.1,
            repetitions: 1,
        };
        let estimates = [1550.0, 1555.0, 1560.0];
        let windows = refine(&engine, &estimates, &plan, null_sink).await;

        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0].center_nm, 1550.0);
        assert!(windows[0].is_ok());
        assert!(matches!(
            windows[1].error,
            Some(SweepError::StabilizationTimeout { .. })
        ));
        assert!(windows[1].result.is_empty());
        assert!(windows[2].is_ok());
        assert_eq!(windows[2].result.len(), 5);

        // Emission off after the batch, including after the failed window.
        assert!(!laser.get_state().await.unwrap());
    }

    #[tokio::test]
    async fn test_out_of_range_window_is_captured() {
        let laser = Arc::new(MockLaser::new()); // range 1500-1630 nm
        let meter = Arc::new(MockPowerMeter::fixed(7.5));
        let engine = SweepEngine::new(laser, meter);

        let plan = RefinePlan {
            half_width_nm: 0.2,
            resolution_nm: 0.1,
            repetitions: 1,
        };
        let windows = refine(&engine, &[1499.9, 1550.0], &plan, null_sink).await;

        assert_eq!(windows.len(), 2);
        assert!(matches!(windows[0].error, Some(SweepError::Range { .. })));
        assert!(windows[1].is_ok());
    }
}
