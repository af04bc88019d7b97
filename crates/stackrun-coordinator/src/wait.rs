//! Bounded polling with a fixed delay between checks.
//!
//! Provides a generic abstraction for waiting on a remote condition: the check
//! runs, then the deadline is tested, then the loop sleeps `poll_interval`.
//! There is no cancellation; once a remote operation has been issued the only
//! way out is the deadline.

use backon::{BackoffBuilder, ConstantBuilder};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Cadence and budget for a wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitConfig {
    /// Delay between checks
    pub poll_interval: Duration,
    /// Maximum total time to wait before timeout
    pub max_wait: Duration,
}

impl WaitConfig {
    pub fn new(poll_interval: Duration, max_wait: Duration) -> Self {
        Self {
            poll_interval,
            max_wait,
        }
    }
}

/// Result of a single check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe<T> {
    /// Condition reached, stop waiting
    Ready(T),
    /// Not there yet, check again after the delay
    Pending,
}

/// Why a wait ended without a ready value
#[derive(Debug)]
pub enum WaitError<E> {
    /// `max_wait` elapsed
    Timeout { elapsed: Duration, attempts: u32 },
    /// The check itself failed
    Check(E),
}

/// Wait for a condition with a fixed delay between checks.
///
/// Uses `backon::ConstantBuilder` for the delay sequence and
/// `tokio::time::Instant` for the deadline, so tests can drive it with paused
/// time.
///
/// # Arguments
/// * `config` - Wait configuration
/// * `resource_name` - Name for logging
/// * `check` - Returns `Ready` to stop, `Pending` to retry, `Err` to abort
///
/// # Example
/// ```ignore
/// let status = wait_for(config, "proj-dev-vpc", || async {
///     match describe().await? {
///         Some(s) if s.class() != StatusClass::InProgress => Ok(Probe::Ready(s)),
///         _ => Ok(Probe::Pending),
///     }
/// })
/// .await?;
/// ```
pub async fn wait_for<T, E, F, Fut>(
    config: WaitConfig,
    resource_name: &str,
    mut check: F,
) -> Result<T, WaitError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Probe<T>, E>>,
{
    let start = Instant::now();
    let mut attempts = 0u32;

    let backoff = ConstantBuilder::default()
        .with_delay(config.poll_interval)
        .without_max_times()
        .build();

    let mut delays = backoff.into_iter();

    loop {
        attempts += 1;

        match check().await {
            Ok(Probe::Ready(value)) => {
                debug!(resource = %resource_name, attempts, "Condition reached");
                return Ok(value);
            }
            Ok(Probe::Pending) => {}
            Err(e) => {
                warn!(resource = %resource_name, attempts, "Check failed");
                return Err(WaitError::Check(e));
            }
        }

        let elapsed = start.elapsed();
        if elapsed >= config.max_wait {
            return Err(WaitError::Timeout { elapsed, attempts });
        }

        let delay = delays.next().unwrap_or(config.poll_interval);
        debug!(
            resource = %resource_name,
            attempt = attempts,
            delay_ms = delay.as_millis(),
            "Not ready, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}
