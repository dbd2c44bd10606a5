//! Sweep data sinks.
//!
//! Rows are streamed as they are measured, so a sweep that dies at step 40
//! still leaves 39 rows on disk.

use std::fs::File;
use std::path::Path;

use chrono::NaiveDateTime;

use sweep_core::{Result, SweepError};

/// Destination for sweep rows.
///
/// # Contract
/// - `write_header` is called once, before any row
/// - `write_row` receives exactly `repetitions` readings per call
pub trait SweepSink: Send {
    fn write_header(&mut self, repetitions: u32) -> Result<()>;
    fn write_row(&mut self, wavelength_nm: f64, readings_dbm: &[f64]) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
}

/// CSV sink: `wavelength_nm, power_reading_0_dbm, ...`.
///
/// Every row is flushed to the file as soon as it is written, so a sweep
/// killed mid-run leaves all completed rows on disk.
pub struct CsvSink {
    writer: csv::Writer<File>,
}

impl CsvSink {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        Ok(Self {
            writer: csv::Writer::from_writer(file),
        })
    }
}

fn sink_err(err: csv::Error) -> SweepError {
    SweepError::Sink(err.to_string())
}

impl SweepSink for CsvSink {
    fn write_header(&mut self, repetitions: u32) -> Result<()> {
        let mut header = vec!["wavelength_nm".to_string()];
        header.extend((0..repetitions).map(|r| format!("power_reading_{r}_dbm")));
        self.writer.write_record(&header).map_err(sink_err)
    }

    fn write_row(&mut self, wavelength_nm: f64, readings_dbm: &[f64]) -> Result<()> {
        let mut record = vec![wavelength_nm.to_string()];
        record.extend(readings_dbm.iter().map(f64::to_string));
        self.writer.write_record(&record).map_err(sink_err)?;
        self.writer.flush()?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Discards everything. For dry runs and refinement callers that only want
/// the in-memory result.
pub struct NullSink;

impl SweepSink for NullSink {
    fn write_header(&mut self, _repetitions: u32) -> Result<()> {
        Ok(())
    }

    fn write_row(&mut self, _wavelength_nm: f64, _readings_dbm: &[f64]) -> Result<()> {
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// File name for a persisted sweep.
///
/// `20260830_142501_avg3_sens1550nm_quantifi_1546.5-1547.5nm_3pt.csv`:
/// timestamp, averaging count, meter calibration wavelength, instrument name,
/// range, step count. Downstream plotting parses these fields back out of
/// the name.
pub fn sweep_file_name(
    timestamp: NaiveDateTime,
    repetitions: u32,
    sensitivity_nm: f64,
    instrument: &str,
    start_nm: f64,
    stop_nm: f64,
    steps: usize,
) -> String {
    format!(
        "{}_avg{}_sens{}nm_{}_{}-{}nm_{}pt.csv",
        timestamp.format("%Y%m%d_%H%M%S"),
        repetitions,
        sensitivity_nm,
        instrument,
        start_nm,
        stop_nm,
        steps
    )
}

/// Metadata recovered from a sweep file name.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepFileMeta {
    pub timestamp: NaiveDateTime,
    pub repetitions: u32,
    pub sensitivity_nm: f64,
    pub instrument: String,
    pub start_nm: f64,
    pub stop_nm: f64,
    pub steps: usize,
}

/// Parse a file name produced by [`sweep_file_name`] back into its fields.
///
/// Instrument names may themselves contain underscores, so the fixed fields
/// are peeled off both ends and the middle is taken as the name. Returns
/// `None` for names that do not follow the convention.
pub fn parse_sweep_file_name(name: &str) -> Option<SweepFileMeta> {
    let stem = name.strip_suffix(".csv")?;
    let parts: Vec<&str> = stem.split('_').collect();
    if parts.len() < 7 {
        return None;
    }

    let timestamp = NaiveDateTime::parse_from_str(
        &format!("{}_{}", parts[0], parts[1]),
        "%Y%m%d_%H%M%S",
    )
    .ok()?;
    let repetitions = parts[2].strip_prefix("avg")?.parse().ok()?;
    let sensitivity_nm = parts[3]
        .strip_prefix("sens")?
        .strip_suffix("nm")?
        .parse()
        .ok()?;
    let steps = parts[parts.len() - 1].strip_suffix("pt")?.parse().ok()?;
    let (start, stop) = parts[parts.len() - 2].strip_suffix("nm")?.split_once('-')?;
    let start_nm = start.parse().ok()?;
    let stop_nm = stop.parse().ok()?;

    let instrument = parts[4..parts.len() - 2].join("_");
    if instrument.is_empty() {
        return None;
    }

    Some(SweepFileMeta {
        timestamp,
        repetitions,
        sensitivity_nm,
        instrument,
        start_nm,
        stop_nm,
        steps,
    })
}
