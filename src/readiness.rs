//! Bounded readiness polling for started containers.

use crate::inventory::ReadinessSettings;
use crate::process::CommandError;
use log::{debug, info};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, thiserror::Error)]
pub enum ReadinessError {
    #[error("Timed out after {timeout:?} waiting for {what}")]
    TimedOut { what: String, timeout: Duration },
}

/// Poll schedule: check every `interval` until `timeout` has elapsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Readiness {
    pub timeout: Duration,
    pub interval: Duration,
}

impl From<&ReadinessSettings> for Readiness {
    fn from(settings: &ReadinessSettings) -> Self {
        Self {
            timeout: settings.timeout,
            interval: settings.interval,
        }
    }
}

impl Readiness {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    /// Call `probe` until it reports ready or the timeout expires
    ///
    /// A probe error counts as "not ready yet": containers that are still
    /// starting make `docker exec` and `docker logs` fail.
    pub fn wait_until<F>(&self, what: &str, mut probe: F) -> Result<(), ReadinessError>
    where
        F: FnMut() -> Result<bool, CommandError>,
    {
        info!("Waiting for {} (timeout {:?})", what, self.timeout);
        let start = Instant::now();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            match probe() {
                Ok(true) => {
                    info!("{} ready after {:?} ({} checks)", what, start.elapsed(), attempts);
                    return Ok(());
                }
                Ok(false) => debug!("{} not ready yet", what),
                Err(e) => debug!("{} probe failed: {}", what, e),
            }

            let elapsed = start.elapsed();
            if elapsed >= self.timeout {
                return Err(ReadinessError::TimedOut {
                    what: what.to_string(),
                    timeout: self.timeout,
                });
            }
            thread::sleep(self.interval.min(self.timeout - elapsed));
        }
    }
}
