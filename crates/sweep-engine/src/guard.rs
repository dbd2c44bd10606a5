//! Emission lifecycle guard.
//!
//! The invariant: once a sweep has switched the laser on, it is switched off
//! again no matter how the sweep ends. The engine calls [`EmissionGuard::release`]
//! on both its success and error paths, which makes the off-switch
//! deterministic and lets the caller see a disable failure. `Drop` covers the
//! remaining exit: a cancelled or panicked task, where the guard spawns a
//! best-effort disable on the runtime it is dropped on.

use std::sync::Arc;

use sweep_core::{Result, TunableLaser};

/// Holds laser emission on; switches it off when released or dropped.
pub struct EmissionGuard {
    laser: Arc<dyn TunableLaser>,
    released: bool,
}

impl EmissionGuard {
    /// Switch emission on and arm the guard.
    pub async fn enable(laser: Arc<dyn TunableLaser>) -> Result<Self> {
        laser.set_state(true).await?;
        tracing::info!(laser = laser.name(), "emission on");
        Ok(Self {
            laser,
            released: false,
        })
    }

    /// Switch emission off, surfacing a disable failure to the caller.
    pub async fn release(mut self) -> Result<()> {
        self.released = true;
        let outcome = self.laser.set_state(false).await;
        match &outcome {
            Ok(()) => tracing::info!(laser = self.laser.name(), "emission off"),
            Err(err) => {
                tracing::error!(laser = self.laser.name(), %err, "failed to disable emission")
            }
        }
        outcome
    }
}

impl Drop for EmissionGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        // Drop cannot await; hand the disable to the runtime. If there is no
        // runtime left there is nothing async we can do but say so loudly.
        let laser = Arc::clone(&self.laser);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    match laser.set_state(false).await {
                        Ok(()) => {
                            tracing::warn!(laser = laser.name(), "emission disabled by guard drop")
                        }
                        Err(err) => tracing::error!(
                            laser = laser.name(),
                            %err,
                            "guard drop failed to disable emission"
                        ),
                    }
                });
            }
            Err(_) => tracing::error!(
                laser = laser.name(),
                "guard dropped outside a runtime; emission may still be on"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sweep_core::EmissionControl;
    use sweep_driver_mock::MockLaser;

    #[tokio::test]
    async fn test_release_switches_emission_off() {
        let laser = Arc::new(MockLaser::new());
        let guard = EmissionGuard::enable(laser.clone())
            .await
            .unwrap();
        assert!(laser.get_state().await.unwrap());

        guard.release().await.unwrap();
        assert!(!laser.get_state().await.unwrap());
    }

    #[tokio::test]
    async fn test_drop_spawns_disable() {
        let laser = Arc::new(MockLaser::new());
        let guard = EmissionGuard::enable(laser.clone())
            .await
            .unwrap();
        drop(guard);

        // The disable runs as a spawned task; give it a beat.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!laser.get_state().await.unwrap());
    }
}
