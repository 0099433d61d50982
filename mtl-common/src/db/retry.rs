//! Busy-database retry
//!
//! SQLite reports `database is locked` when another connection holds the
//! write lock past the busy timeout. Local store writes retry those with a
//! doubling delay until a deadline; every other error is returned as is.

use crate::{Error, Result};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Backoff schedule for lock contention
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockRetry {
    pub first_delay: Duration,
    pub max_delay: Duration,
    pub deadline: Duration,
}

impl LockRetry {
    pub fn within(deadline: Duration) -> Self {
        Self {
            first_delay: Duration::from_millis(10),
            max_delay: Duration::from_secs(1),
            deadline,
        }
    }

    /// Run `operation`, repeating it while the database is locked
    pub async fn run<F, Fut, T>(&self, label: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let started = Instant::now();
        let mut delay = self.first_delay;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let err = match operation().await {
                Ok(value) => {
                    if attempts > 1 {
                        debug!(label, attempts, "Write went through after lock contention");
                    }
                    return Ok(value);
                }
                Err(err) if is_locked(&err) => err,
                Err(err) => return Err(err),
            };

            let waited = started.elapsed();
            if waited >= self.deadline {
                error!(label, attempts, waited_ms = waited.as_millis() as u64, error = %err, "Giving up on locked database");
                return Err(Error::LockTimeout {
                    label: label.to_string(),
                    attempts,
                    waited,
                });
            }

            warn!(label, attempts, delay_ms = delay.as_millis() as u64, "Database locked, backing off");
            tokio::time::sleep(delay).await;
            delay = (delay * 2).min(self.max_delay);
        }
    }
}

/// Shorthand for [`LockRetry::within`] + [`LockRetry::run`]
pub async fn retry_on_lock<F, Fut, T>(label: &str, deadline: Duration, operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    LockRetry::within(deadline).run(label, operation).await
}

fn is_locked(err: &Error) -> bool {
    matches!(err, Error::Database(e) if e.to_string().contains("database is locked"))
}
