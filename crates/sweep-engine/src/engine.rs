//! The sweep engine proper.

use std::sync::Arc;

use sweep_core::{PowerMeter, Result, SweepError, TunableLaser};

use crate::guard::EmissionGuard;
use crate::program::SweepProgram;
use crate::result::SweepResult;
use crate::sink::SweepSink;

/// Drives one laser and one power meter through sweep programs.
///
/// Steps are strictly serial: tune, gate on steady state, read. There is no
/// pipelining; a reading taken while the laser is still slewing is worse
/// than a slow sweep.
pub struct SweepEngine {
    laser: Arc<dyn TunableLaser>,
    meter: Arc<dyn PowerMeter>,
    verbose: bool,
}

impl SweepEngine {
    pub fn new(laser: Arc<dyn TunableLaser>, meter: Arc<dyn PowerMeter>) -> Self {
        Self {
            laser,
            meter,
            verbose: false,
        }
    }

    /// Emit info-level progress per step. Logging only; control flow is
    /// identical either way.
    pub fn verbose(mut self, on: bool) -> Self {
        self.verbose = on;
        self
    }

    pub fn laser(&self) -> &Arc<dyn TunableLaser> {
        &self.laser
    }

    /// Run one sweep, streaming each row to `sink` as it is measured.
    ///
    /// Emission is enabled for the duration of the traversal and disabled on
    /// every exit path. The first failing step aborts the sweep; rows already
    /// streamed stay in the sink.
    ///
    /// # Errors
    /// - `SweepError::Resolution` before any instrument command when the
    ///   program's resolution is below the laser's minimum addressable step
    /// - `SweepError::StabilizationTimeout` when a step fails to settle
    /// - any adapter or sink error, verbatim
    pub async fn run_sweep(
        &self,
        program: &SweepProgram,
        sink: &mut dyn SweepSink,
    ) -> Result<SweepResult> {
        if program.resolution_nm() < self.laser.min_resolution_nm() {
            return Err(SweepError::Resolution {
                name: self.laser.name().to_string(),
                requested_nm: program.resolution_nm(),
                minimum_nm: self.laser.min_resolution_nm(),
            });
        }

        let wavelengths = program.wavelengths();
        tracing::info!(
            laser = self.laser.name(),
            meter = self.meter.name(),
            start_nm = program.start_nm(),
            stop_nm = program.stop_nm(),
            steps = wavelengths.len(),
            repetitions = program.repetitions(),
            "starting sweep"
        );
        sink.write_header(program.repetitions())?;

        let guard = EmissionGuard::enable(Arc::clone(&self.laser)).await?;
        let outcome = self
            .traverse(&wavelengths, program.repetitions(), sink)
            .await;
        let released = guard.release().await;

        let result = outcome?;
        released?;
        sink.flush()?;
        Ok(result)
    }

    async fn traverse(
        &self,
        wavelengths: &[f64],
        repetitions: u32,
        sink: &mut dyn SweepSink,
    ) -> Result<SweepResult> {
        let mut result = SweepResult::new();
        for (step, &wavelength_nm) in wavelengths.iter().enumerate() {
            self.laser.set_wavelength(wavelength_nm).await?;
            if !self.laser.wait_steady_state().await? {
                return Err(SweepError::StabilizationTimeout {
                    name: self.laser.name().to_string(),
                    wavelength_nm,
                    waited: self.laser.max_wait(),
                });
            }

            let mut readings = Vec::with_capacity(repetitions as usize);
            for _ in 0..repetitions {
                readings.push(self.meter.read().await?);
            }

            if self.verbose {
                tracing::info!(
                    step = step + 1,
                    of = wavelengths.len(),
                    wavelength_nm,
                    mean_dbm = readings.iter().sum::<f64>() / readings.len() as f64,
                    "step complete"
                );
            }
            sink.write_row(wavelength_nm, &readings)?;
            result.push_row(wavelength_nm, readings);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::NullSink;
    use sweep_core::EmissionControl;
    use sweep_driver_mock::{MockLaser, MockLaserConfig, MockPowerMeter};

    fn engine_with(laser: Arc<MockLaser>, meter: Arc<MockPowerMeter>) -> SweepEngine {
        SweepEngine::new(laser, meter)
    }

    #[tokio::test]
    async fn test_resolution_rejected_before_any_command() {
        let laser = Arc::new(MockLaser::new()); // min resolution 0.01 nm
        let meter = Arc::new(MockPowerMeter::fixed(7.5));
        let engine = engine_with(laser.clone(), meter.clone());

        let program = SweepProgram::new(1550.0, 1551.0, 0.001, 1).unwrap();
        let err = engine
            .run_sweep(&program, &mut NullSink)
            .await
            .unwrap_err();

        assert!(matches!(err, SweepError::Resolution { .. }));
        assert_eq!(laser.command_count(), 0);
        assert_eq!(meter.read_count(), 0);
    }

    #[tokio::test]
    async fn test_stabilization_timeout_after_one_tune_command() {
        let laser = Arc::new(MockLaser::with_config(MockLaserConfig {
            never_stabilizes: true,
            ..Default::default()
        }));
        let meter = Arc::new(MockPowerMeter::fixed(7.5));
        let engine = engine_with(laser.clone(), meter.clone());

        let program = SweepProgram::new(1546.5, 1547.5, 0.5, 2).unwrap();
        let err = engine
            .run_sweep(&program, &mut NullSink)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SweepError::StabilizationTimeout {
                wavelength_nm,
                ..
            } if wavelength_nm == 1546.5
        ));
        assert_eq!(laser.wavelength_command_count(), 1);
        assert_eq!(meter.read_count(), 0);
        // Emission off despite the failure.
        assert!(!laser.get_state().await.unwrap());
    }

    #[tokio::test]
    async fn test_emission_off_after_successful_sweep() {
        let laser = Arc::new(MockLaser::new());
        let meter = Arc::new(MockPowerMeter::fixed(7.5));
        let engine = engine_with(laser.clone(), meter);

        let program = SweepProgram::new(1546.5, 1547.5, 0.5, 1).unwrap();
        engine.run_sweep(&program, &mut NullSink).await.unwrap();
        assert!(!laser.get_state().await.unwrap());
    }

    #[tokio::test]
    async fn test_cancelled_sweep_disables_emission() {
        let laser = Arc::new(MockLaser::with_config(MockLaserConfig {
            // Long settle so the sweep is mid-gate when we cancel.
            settle_polls: 1000,
            poll_interval_secs: 0.01,
            max_wait_secs: 60.0,
            ..Default::default()
        }));
        let meter = Arc::new(MockPowerMeter::fixed(7.5));
        let engine = Arc::new(engine_with(laser.clone(), meter));

        let task = tokio::spawn({
            let engine = Arc::clone(&engine);
            async move {
                let program = SweepProgram::new(1546.5, 1547.5, 0.5, 1).unwrap();
                engine.run_sweep(&program, &mut NullSink).await
            }
        });

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(laser.get_state().await.unwrap());
        task.abort();
        let _ = task.await;

        // Guard drop spawns the disable; give it a beat.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!laser.get_state().await.unwrap());
    }
}
