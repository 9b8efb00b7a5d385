//! Fixed-delay retry
//!
//! Re-invokes a fallible node operation a fixed number of times with a
//! fixed pause between attempts.

use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::error::Result;

/// Attempt budgets and pause used when retrying node operations
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Pause between two attempts
    pub delay: Duration,
    /// Attempts for `POST /api/auth`
    pub authenticate: usize,
    /// Attempts for `DELETE /api/auth`
    pub delete_session: usize,
    /// Attempts for pushing a teleporter snapshot
    pub teleporter_push: usize,
    /// Attempts for `PATCH /api/config`
    pub config_patch: usize,
    /// Attempts for the gravity run
    pub maintenance_job: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default(), Duration::from_secs(1))
    }
}

impl RetryPolicy {
    /// Build a policy from the `[retry]` table and the client retry delay
    pub fn from_config(config: &RetryConfig, delay: Duration) -> Self {
        Self {
            delay,
            authenticate: config.authenticate,
            delete_session: config.delete_session,
            teleporter_push: config.teleporter_push,
            config_patch: config.config_patch,
            maintenance_job: config.maintenance_job,
        }
    }

    /// Same budgets without any pause, for tests
    pub fn immediate(self) -> Self {
        Self {
            delay: Duration::ZERO,
            ..self
        }
    }
}

/// Run `op` up to `attempts` times, pausing `delay` between attempts.
///
/// Returns the first success or the error of the last attempt. At least
/// one attempt is always made.
pub async fn fixed<T, F, Fut>(attempts: usize, delay: Duration, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                tracing::debug!(attempt, attempts, error = %e, "Attempt failed, retrying");
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
