//! Retrying checker
//!
//! Wraps [`BoundedCheckExecutor`] in a fixed-count retry loop and produces
//! one verdict per target per round. A single success anywhere in the
//! sequence makes the target alive; there is no partial credit and no
//! backoff between attempts.

use crate::error::Result;
use crate::executor::{BoundedCheckExecutor, CheckOutcome};
use crate::timer::TimerPolicy;
use crate::traits::HealthCheck;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Verdict for one target in one round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundVerdict {
    /// An attempt succeeded
    Alive {
        /// Attempts consumed, including the successful one
        attempts: usize,
    },
    /// Every allowed attempt failed or timed out
    Dead {
        /// Attempts consumed (always the retry limit)
        attempts: usize,
    },
}

impl RoundVerdict {
    pub fn is_alive(&self) -> bool {
        matches!(self, RoundVerdict::Alive { .. })
    }

    pub fn attempts(&self) -> usize {
        match self {
            RoundVerdict::Alive { attempts } | RoundVerdict::Dead { attempts } => *attempts,
        }
    }

    /// Alive, but only after at least one failed attempt
    pub fn is_flaky(&self) -> bool {
        matches!(self, RoundVerdict::Alive { attempts } if *attempts > 1)
    }
}

/// Produces per-round verdicts by retrying bounded checks
#[derive(Debug, Default)]
pub struct RetryingChecker {
    executor: BoundedCheckExecutor,
}

impl RetryingChecker {
    pub fn new(executor: BoundedCheckExecutor) -> Self {
        Self { executor }
    }

    /// The executor used for every attempt
    pub fn executor(&self) -> &BoundedCheckExecutor {
        &self.executor
    }

    /// Check `target` up to `timer.retry_limit()` times
    ///
    /// Each attempt gets a fresh deadline of `timer.check_timeout()`.
    ///
    /// # Returns
    ///
    /// - `Ok(RoundVerdict::Alive)` on the first success
    /// - `Ok(RoundVerdict::Dead)` after `retry_limit` consecutive non-successes
    /// - `Err(_)` only if an attempt could not be reclaimed (fatal)
    pub async fn verdict(
        &self,
        target: IpAddr,
        check: &Arc<dyn HealthCheck>,
        timer: &TimerPolicy,
    ) -> Result<RoundVerdict> {
        let limit = timer.retry_limit();

        for attempt in 1..=limit {
            let deadline = Instant::now() + timer.check_timeout();
            let outcome = self.executor.execute(target, check, deadline).await?;

            if outcome == CheckOutcome::Success {
                if attempt > 1 {
                    warn!(
                        "{} is alive after {} attempts (flaky)",
                        target, attempt
                    );
                }
                return Ok(RoundVerdict::Alive { attempts: attempt });
            }

            if attempt < limit {
                debug!(
                    "Attempt {}/{} on {} failed ({}), retrying",
                    attempt, limit, target, outcome
                );
            } else {
                warn!(
                    "Attempt {}/{} on {} failed ({}), giving up",
                    attempt, limit, target, outcome
                );
            }
        }

        Ok(RoundVerdict::Dead { attempts: limit })
    }
}
