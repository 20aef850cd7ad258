// SPDX-License-Identifier: MIT
//! Bounded retry for transient I/O.
//!
//! Provides [`retry`] — a generic async helper that keeps re-running a
//! fallible operation until it has made at least `min_attempts` tries AND
//! `max_elapsed` has passed, with a fixed pause between tries. On exhaustion
//! the FIRST error is returned (the initial failure is usually the most
//! informative one; later errors tend to be repeats).

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

/// Policy for [`retry`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Minimum number of attempts before giving up is even considered.
    ///
    /// Default: 3
    pub min_attempts: u32,
    /// Keep retrying until at least this much wall-clock time has passed.
    ///
    /// Default: 5 s
    pub max_elapsed: Duration,
    /// Fixed pause between attempts.
    ///
    /// Default: 100 ms
    pub pause: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            min_attempts: 3,
            max_elapsed: Duration::from_secs(5),
            pause: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    /// A policy suitable for quick unit tests (no real waiting).
    pub fn instant() -> Self {
        Self {
            min_attempts: 3,
            max_elapsed: Duration::ZERO,
            pause: Duration::ZERO,
        }
    }
}

/// Retry an async operation under `policy`.
///
/// The operation is re-run while `attempts < policy.min_attempts` OR
/// `elapsed < policy.max_elapsed`; both bounds must be exhausted before
/// giving up. Returns `Ok(value)` on the first success, or the first
/// recorded error once exhausted.
pub async fn retry<F, Fut, T, E>(policy: &RetryPolicy, mut f: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Debug,
{
    let started = Instant::now();
    let mut first_err: Option<E> = None;
    let mut attempt: u32 = 0;

    loop {
        if attempt > 0 {
            tokio::time::sleep(policy.pause).await;
        }
        attempt += 1;

        match f().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(attempt, "retry succeeded");
                }
                return Ok(value);
            }
            Err(e) => {
                if first_err.is_none() {
                    first_err = Some(e);
                } else {
                    debug!(attempt, err = ?e, "retry attempt failed");
                }
            }
        }

        if attempt < policy.min_attempts {
            continue;
        }
        if started.elapsed() < policy.max_elapsed {
            continue;
        }
        break;
    }

    let e = first_err.expect("retry loop ended without recording an error");
    warn!(attempt, err = ?e, "all retry attempts exhausted");
    Err(e)
}

/// Convenience wrapper: retry with the default policy.
pub async fn retry_default<F, Fut, T, E>(f: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Debug,
{
    retry(&RetryPolicy::default(), f).await
}
