//! Sweep the mock instruments and write a CSV next to the current directory.
//!
//! ```sh
//! cargo run -p sweep-engine --example mock_sweep
//! ```

use std::sync::Arc;

use anyhow::Result;
use sweep_driver_mock::{MockLaser, MockPowerMeter};
use sweep_engine::{sweep_file_name, CsvSink, SweepEngine, SweepProgram};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let laser = Arc::new(MockLaser::new());
    let meter = Arc::new(MockPowerMeter::scripted(vec![
        -3.2, -3.1, -9.8, -9.9, -3.3, -3.2,
    ]));
    let engine = SweepEngine::new(laser, meter).verbose(true);

    let program = SweepProgram::new(1546.5, 1547.5, 0.5, 2)?;
    let name = sweep_file_name(
        chrono::Local::now().naive_local(),
        program.repetitions(),
        1550.0,
        "mock_laser",
        program.start_nm(),
        program.stop_nm(),
        program.steps(),
    );
    let mut sink = CsvSink::create(&name)?;

    let result = engine.run_sweep(&program, &mut sink).await?;
    println!("wrote {} rows to {name}", result.len());
    println!("per-point mean dBm: {:?}", result.mean_dbm());
    Ok(())
}
