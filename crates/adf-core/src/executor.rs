//! Bounded check execution
//!
//! [`BoundedCheckExecutor`] runs one health check against one target and
//! guarantees an answer by a deadline, whatever the check does: hang on I/O,
//! return an error, or panic.
//!
//! ## Execution Substrate
//!
//! Each attempt runs in its own tokio task. The task is the isolation
//! boundary and supports the four operations the executor needs:
//!
//! ```text
//!   start ──► wait (until deadline) ──► finished ──► classify
//!                      │
//!                      └─ deadline ──► abort ──► reap (bounded) ──► TimedOut
//! ```
//!
//! Completion is delivered through the task's join handle, so waiting never
//! polls. A panic inside the check is contained by the task and surfaces as
//! a join error, which is classified as [`CheckOutcome::Failure`].
//!
//! Aborting drops the check's future. Checks that own OS resources tie them
//! to that drop (e.g. [`CommandCheck`](crate::check::CommandCheck) spawns its
//! child with kill-on-drop), so killing the task kills the check.
//!
//! A check that blocks its worker thread never reaches a yield point and
//! cannot be aborted. The executor notices because the reap does not finish
//! within the grace period, and reports [`Error::Reclaim`], which is fatal.

use crate::error::{Error, Result};
use crate::traits::HealthCheck;
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, warn};

/// Default time allowed for an aborted check to be reaped
pub const DEFAULT_REAP_GRACE: Duration = Duration::from_secs(1);

/// Result of one bounded check attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckOutcome {
    /// The check ran and reported the target healthy
    Success,
    /// The check ran and reported unhealthy, returned an error, or panicked
    Failure,
    /// The check did not finish before the deadline and was killed
    TimedOut,
}

impl CheckOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CheckOutcome::Success)
    }
}

impl std::fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckOutcome::Success => write!(f, "success"),
            CheckOutcome::Failure => write!(f, "failure"),
            CheckOutcome::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Runs health checks in killable tasks with a hard deadline
///
/// Only one execution is outstanding per call, and `execute` does not return
/// until that execution has finished or been reclaimed.
#[derive(Debug)]
pub struct BoundedCheckExecutor {
    reap_grace: Duration,
    outstanding: Arc<AtomicUsize>,
}

impl BoundedCheckExecutor {
    /// Create an executor
    ///
    /// # Parameters
    ///
    /// - `reap_grace`: how long to wait for an aborted check to go away
    ///   before declaring reclamation failed
    pub fn new(reap_grace: Duration) -> Self {
        Self {
            reap_grace,
            outstanding: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of check executions that are still alive
    ///
    /// Zero whenever no `execute` call is in progress.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// Run `check` against `target`, answering by `deadline`
    ///
    /// A deadline that has already passed still gets a zero-length wait: a
    /// check that completes on its first poll counts, anything else times out.
    ///
    /// # Returns
    ///
    /// - `Ok(CheckOutcome)`: exactly one outcome per call
    /// - `Err(Error::Reclaim)`: a timed-out check could not be reaped (fatal)
    pub async fn execute(
        &self,
        target: IpAddr,
        check: &Arc<dyn HealthCheck>,
        deadline: Instant,
    ) -> Result<CheckOutcome> {
        debug!(
            "Starting {} on {}, timeout={:?}",
            check.describe(),
            target,
            deadline.saturating_duration_since(Instant::now())
        );

        let mut execution = Execution::start(target, Arc::clone(check), &self.outstanding);

        let waited = tokio::time::timeout_at(deadline, &mut execution.handle).await;
        match waited {
            Ok(joined) => {
                let outcome = classify(target, joined);
                debug!("Check result for {} is {}", target, outcome);
                Ok(outcome)
            }
            Err(_) => {
                warn!("Check on {} timed out, killing it", target);
                execution.kill_and_reap(self.reap_grace).await?;
                debug!("Reaped timed-out check on {}", target);
                Ok(CheckOutcome::TimedOut)
            }
        }
    }
}

impl Default for BoundedCheckExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_REAP_GRACE)
    }
}

fn classify(
    target: IpAddr,
    joined: std::result::Result<Result<bool>, tokio::task::JoinError>,
) -> CheckOutcome {
    match joined {
        Ok(Ok(true)) => CheckOutcome::Success,
        Ok(Ok(false)) => CheckOutcome::Failure,
        Ok(Err(e)) => {
            debug!("Check on {} raised an error: {}", target, e);
            CheckOutcome::Failure
        }
        Err(e) if e.is_panic() => {
            warn!("Check on {} panicked", target);
            CheckOutcome::Failure
        }
        Err(e) => {
            warn!("Check on {} was cancelled: {}", target, e);
            CheckOutcome::Failure
        }
    }
}

/// One isolated check execution
///
/// Aborts the task when dropped, so abandoning an `execute` future (e.g. on
/// shutdown) never leaves a check running.
struct Execution {
    handle: JoinHandle<Result<bool>>,
}

impl Execution {
    fn start(target: IpAddr, check: Arc<dyn HealthCheck>, outstanding: &Arc<AtomicUsize>) -> Self {
        let alive = Alive::enter(outstanding);
        let handle = tokio::spawn(async move {
            let _alive = alive;
            check.check(target).await
        });
        Self { handle }
    }

    async fn kill_and_reap(&mut self, grace: Duration) -> Result<()> {
        self.handle.abort();
        let reaped = tokio::time::timeout(grace, &mut self.handle).await;
        match reaped {
            Ok(_) => Ok(()),
            Err(_) => {
                error!("Killed check did not stop within {:?}", grace);
                Err(Error::reclaim(format!(
                    "check task still running {:?} after abort",
                    grace
                )))
            }
        }
    }
}

impl Drop for Execution {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Counts a live execution until the task's future is dropped
struct Alive(Arc<AtomicUsize>);

impl Alive {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for Alive {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
