// # Health Check Trait
//
// Defines the check that decides whether an address serves traffic.
//
// ## Implementations
//
// - HTTP request: `adf-check-http` crate
// - External command: `adf_core::check::CommandCheck`

use async_trait::async_trait;
use std::net::IpAddr;

/// Trait for health-check predicates
///
/// # Trust Level: Untrusted
///
/// A check is never trusted to answer. It is only ever invoked inside
/// [`BoundedCheckExecutor`](crate::executor::BoundedCheckExecutor), which
/// runs it in its own task, aborts that task at the deadline and maps every
/// failure mode to a verdict:
///
/// - `Ok(true)` → healthy
/// - `Ok(false)`, `Err(_)` or a panic → unhealthy
/// - no answer before the deadline → timed out
///
/// # Implementations must stay async
///
/// Aborting only takes effect at an `.await`. Implementations must do their
/// I/O through async APIs and must not block the worker thread (no blocking
/// sockets, `std::process::Command::output` or `std::thread::sleep`). A check
/// that blocks cannot be aborted: the executor fails to reap it within the
/// grace period and returns [`Error::Reclaim`](crate::Error::Reclaim), which
/// stops the failover loop. Resources the check owns should be released on
/// drop, as [`CommandCheck`](crate::check::CommandCheck) does with its child.
///
/// Implementations should not implement their own retries or timeouts;
/// both are owned by the checker and executor.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// Check `target`
    async fn check(&self, target: IpAddr) -> Result<bool, crate::Error>;

    /// Short human-readable description used in log lines
    fn describe(&self) -> String {
        "health check".to_string()
    }
}

/// Helper trait for constructing health checks from configuration
pub trait HealthCheckFactory: Send + Sync {
    /// Create a HealthCheck instance from configuration
    fn create(
        &self,
        config: &crate::config::CheckConfig,
    ) -> Result<Box<dyn HealthCheck>, crate::Error>;
}
