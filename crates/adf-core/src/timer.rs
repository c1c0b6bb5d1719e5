//! Round scheduling
//!
//! [`TimerPolicy`] is pure arithmetic over wall-clock time: when the next
//! round starts, how long one check may run, and how many attempts a target
//! gets per round. The clock is injected so the schedule can be tested
//! without waiting.
//!
//! ## Drift Absorption
//!
//! The cursor advances by exactly one interval per round. When a round ran
//! long and the advanced cursor is already in the past, the cursor snaps to
//! "now": the loop never runs back-to-back rounds to catch up.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Delay before the very first round, so it is never scheduled in the past
pub const FIRST_TICK_DELAY: Duration = Duration::from_secs(1);

/// Source of wall-clock time
pub trait Clock: Send + Sync {
    /// Current wall-clock time
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to
///
/// Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Move the clock forward by `by`
    pub fn advance(&self, by: Duration) {
        let by = chrono::Duration::from_std(by).unwrap_or(chrono::Duration::zero());
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    /// Jump to an absolute time
    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Schedule cursor and fixed per-check limits
///
/// Lives for the whole process; owned by the failover loop.
pub struct TimerPolicy {
    interval: Duration,
    check_timeout: Duration,
    retry_limit: usize,
    /// Last scheduled tick, `None` before the first call
    last: Option<DateTime<Utc>>,
    /// How far behind the last computed tick was before clamping
    drift: Option<Duration>,
    clock: Arc<dyn Clock>,
}

impl TimerPolicy {
    /// Create a policy driven by the system clock
    ///
    /// A `retry_limit` of zero is treated as one attempt.
    pub fn new(interval: Duration, check_timeout: Duration, retry_limit: usize) -> Self {
        Self::with_clock(interval, check_timeout, retry_limit, Arc::new(SystemClock))
    }

    /// Create a policy driven by `clock`
    pub fn with_clock(
        interval: Duration,
        check_timeout: Duration,
        retry_limit: usize,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            interval,
            check_timeout,
            retry_limit: retry_limit.max(1),
            last: None,
            drift: None,
            clock,
        }
    }

    /// Create a policy from timing configuration
    pub fn from_config(config: &crate::config::TimingConfig, clock: Arc<dyn Clock>) -> Self {
        Self::with_clock(
            config.interval(),
            config.check_timeout(),
            config.retry_limit,
            clock,
        )
    }

    /// Compute when the next round starts and advance the cursor
    ///
    /// The first call returns `now + FIRST_TICK_DELAY`. Each later call
    /// returns the previous tick plus one interval, clamped to `now` when
    /// that instant has already passed.
    pub fn next_tick_time(&mut self) -> DateTime<Utc> {
        let now = self.clock.now();
        self.drift = None;

        let next = match self.last {
            None => add(now, FIRST_TICK_DELAY),
            Some(last) => {
                let advanced = add(last, self.interval);
                if advanced < now {
                    self.drift = (now - advanced).to_std().ok();
                    now
                } else {
                    advanced
                }
            }
        };

        self.last = Some(next);
        next
    }

    /// How far behind schedule the last computed tick was, if it had to be clamped
    pub fn drift(&self) -> Option<Duration> {
        self.drift
    }

    /// Time left until `tick`, zero if it has passed
    pub fn until(&self, tick: DateTime<Utc>) -> Duration {
        (tick - self.clock.now()).to_std().unwrap_or(Duration::ZERO)
    }

    /// Fixed deadline for one check attempt
    pub fn check_timeout(&self) -> Duration {
        self.check_timeout
    }

    /// Maximum attempts per target per round
    pub fn retry_limit(&self) -> usize {
        self.retry_limit
    }

    /// Round interval
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl std::fmt::Debug for TimerPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerPolicy")
            .field("interval", &self.interval)
            .field("check_timeout", &self.check_timeout)
            .field("retry_limit", &self.retry_limit)
            .field("last", &self.last)
            .finish()
    }
}

fn add(at: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(duration)
        .ok()
        .and_then(|d| at.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
