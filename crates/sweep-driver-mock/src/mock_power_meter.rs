//! Mock optical power meter.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use sweep_core::capabilities::{Identify, Readable};
use sweep_core::error::Result;

/// Mock power meter returning a fixed value, or cycling through a scripted
/// sequence of readings.
pub struct MockPowerMeter {
    fixed_dbm: f64,
    scripted: Mutex<Vec<f64>>,
    read_count: AtomicU32,
}

impl MockPowerMeter {
    /// Meter that always reads `dbm`.
    pub fn fixed(dbm: f64) -> Self {
        Self {
            fixed_dbm: dbm,
            scripted: Mutex::new(Vec::new()),
            read_count: AtomicU32::new(0),
        }
    }

    /// Meter that returns `readings` in order, then repeats the last one.
    pub fn scripted(readings: Vec<f64>) -> Self {
        let fallback = readings.last().copied().unwrap_or(0.0);
        let mut queue = readings;
        queue.reverse(); // pop() consumes from the front of the original order
        Self {
            fixed_dbm: fallback,
            scripted: Mutex::new(queue),
            read_count: AtomicU32::new(0),
        }
    }

    /// Number of readings taken so far.
    pub fn read_count(&self) -> u32 {
        self.read_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Readable for MockPowerMeter {
    async fn read(&self) -> Result<f64> {
        self.read_count.fetch_add(1, Ordering::Relaxed);
        let mut scripted = self.scripted.lock().await;
        Ok(scripted.pop().unwrap_or(self.fixed_dbm))
    }
}

#[async_trait]
impl Identify for MockPowerMeter {
    async fn identify(&self) -> Result<String> {
        Ok("Mock Instruments,Power Meter,0000,0.1".to_string())
    }

    fn name(&self) -> &str {
        "mock_power_meter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_reading() {
        let meter = MockPowerMeter::fixed(7.5);
        assert_eq!(meter.read().await.unwrap(), 7.5);
        assert_eq!(meter.read().await.unwrap(), 7.5);
        assert_eq!(meter.read_count(), 2);
    }

    #[tokio::test]
    async fn test_scripted_readings_then_repeat() {
        let meter = MockPowerMeter::scripted(vec![-3.0, -6.0, -9.0]);
        assert_eq!(meter.read().await.unwrap(), -3.0);
        assert_eq!(meter.read().await.unwrap(), -6.0);
        assert_eq!(meter.read().await.unwrap(), -9.0);
        assert_eq!(meter.read().await.unwrap(), -9.0);
    }
}
