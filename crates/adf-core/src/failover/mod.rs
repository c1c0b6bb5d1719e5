//! Failover loop
//!
//! The FailoverLoop is responsible for:
//! - Scheduling rounds via TimerPolicy
//! - Re-resolving the node's own address every round
//! - Gating everything on the node passing its own health check
//! - Publishing the node's address when it is missing from DNS
//! - Checking peers in a fixed order and withdrawing at most one dead peer per round
//!
//! ## Round
//!
//! ```text
//! WaitingForTick ─► ResolvingOwnAddress ─► SelfChecking ─► ReadingDns ─► ReconcilingPeers
//!       ▲                   │ error             │ dead                         │
//!       │                   ▼                   ▼                              │
//!       └────────────── skip round      cool-down, exit                        │
//!       └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Convergence Without a Coordinator
//!
//! Every node runs the same loop against the same record set:
//! - The record set is read fresh every round, never reused
//! - Peers are visited in textual order of their address, so every node
//!   reaches the same dead peer first
//! - A round stops after its first removal; the next round re-reads DNS
//! - A dead peer is not removed while fewer than [`MIN_POOL_FOR_REMOVAL`]
//!   addresses are published, so automated failover never empties the pool
//!
//! ## Failure Policy
//!
//! Resolver and directory errors abort the current round (or the current
//! record) without further mutation; the loop carries on at the next tick.
//! Only a failed self-check and a failed check reclamation stop the loop.

use crate::checker::{RetryingChecker, RoundVerdict};
use crate::config::{FailoverConfig, RecordConfig};
use crate::error::{Error, Result};
use crate::executor::BoundedCheckExecutor;
use crate::timer::{Clock, SystemClock, TimerPolicy};
use crate::traits::{AddressResolver, DnsDirectory, HealthCheck};
use std::future::Future;
use std::net::IpAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// Smallest published pool (own address included) from which a dead peer is removed
pub const MIN_POOL_FOR_REMOVAL: usize = 3;

/// Events emitted by the FailoverLoop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailoverEvent {
    /// Loop started
    Started {
        records_count: usize,
    },

    /// The round started later than scheduled
    TickLate {
        late_by: Duration,
    },

    /// The own address differs from the previous round's
    OwnAddressChanged {
        previous: Option<IpAddr>,
        current: IpAddr,
    },

    /// The round was skipped before any DNS access
    RoundAborted {
        reason: String,
    },

    /// The node passed its own health check
    SelfCheckPassed {
        address: IpAddr,
        attempts: usize,
    },

    /// The node failed its own health check; the loop is stopping
    SelfCheckFailed {
        address: IpAddr,
        attempts: usize,
    },

    /// The own address was missing from a record and has been published
    SelfRegistered {
        record_name: String,
        address: IpAddr,
    },

    /// A peer passed its check
    PeerAlive {
        record_name: String,
        address: IpAddr,
        attempts: usize,
    },

    /// A dead peer was withdrawn from DNS
    PeerRemoved {
        record_name: String,
        address: IpAddr,
    },

    /// A dead peer was kept because the pool is too small
    RemovalSuppressed {
        record_name: String,
        address: IpAddr,
        pool_size: usize,
    },

    /// Reconciling a record failed; other records are unaffected
    RecordFailed {
        record_name: String,
        error: String,
    },

    /// Loop stopped
    Stopped {
        reason: String,
    },
}

/// Self-organizing DNS failover loop
///
/// ## Lifecycle
///
/// 1. Create with [`FailoverLoop::new()`]
/// 2. Start with [`FailoverLoop::run()`]
/// 3. Runs until a shutdown signal, a failed self-check, or a failed reclamation
///
/// ## Threading
///
/// Exactly one round is in flight at a time, and inside a round targets are
/// checked strictly one after another.
pub struct FailoverLoop {
    /// Own-address lookup
    resolver: Box<dyn AddressResolver>,

    /// DNS backend holding the pool
    directory: Box<dyn DnsDirectory>,

    /// Check applied to self and peers
    check: Arc<dyn HealthCheck>,

    /// Names whose pools this node belongs to
    records: Vec<RecordConfig>,

    /// Schedule cursor and per-check limits
    timer: TimerPolicy,

    /// Retry loop around bounded checks
    checker: RetryingChecker,

    /// Delay before stopping after a failed self-check
    cooldown: Duration,

    /// Own address seen in the previous round
    own_address: Option<IpAddr>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<FailoverEvent>,
}

impl FailoverLoop {
    /// Create a new failover loop driven by the system clock
    ///
    /// # Parameters
    ///
    /// - `resolver`: Own-address resolver
    /// - `directory`: DNS directory holding the pool
    /// - `check`: Health check applied to self and peers
    /// - `config`: Records and timing (collaborator sections are not used here)
    ///
    /// # Returns
    ///
    /// A tuple of (loop, event_receiver) where event_receiver yields loop events
    pub fn new(
        resolver: Box<dyn AddressResolver>,
        directory: Box<dyn DnsDirectory>,
        check: Arc<dyn HealthCheck>,
        config: FailoverConfig,
    ) -> Result<(Self, mpsc::Receiver<FailoverEvent>)> {
        Self::with_clock(resolver, directory, check, config, Arc::new(SystemClock))
    }

    /// Create a new failover loop whose schedule follows `clock`
    pub fn with_clock(
        resolver: Box<dyn AddressResolver>,
        directory: Box<dyn DnsDirectory>,
        check: Arc<dyn HealthCheck>,
        config: FailoverConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<(Self, mpsc::Receiver<FailoverEvent>)> {
        config.validate_loop()?;

        let (tx, rx) = mpsc::channel(config.timing.event_channel_capacity);

        let failover = Self {
            resolver,
            directory,
            check,
            timer: TimerPolicy::from_config(&config.timing, clock),
            checker: RetryingChecker::new(BoundedCheckExecutor::new(
                config.timing.reap_grace(),
            )),
            cooldown: config.timing.cooldown(),
            records: config.records,
            own_address: None,
            event_tx: tx,
        };

        Ok((failover, rx))
    }

    /// Run the loop until SIGINT/SIGTERM
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Clean shutdown
    /// - `Err(Error::SelfCheckFailed)`: The node failed its own check (after the cool-down)
    /// - `Err(Error::Reclaim)`: A check could not be killed
    pub async fn run(&mut self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Run the loop with a programmatic shutdown signal
    ///
    /// With `None` this behaves like [`run()`](Self::run). Intended for
    /// tests and embedders that manage shutdown themselves.
    pub async fn run_with_shutdown(
        &mut self,
        shutdown_rx: Option<oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.run_internal(shutdown_rx).await
    }

    async fn run_internal(&mut self, shutdown_rx: Option<oneshot::Receiver<()>>) -> Result<()> {
        info!(
            "Failover loop starting: {} record(s), interval={:?}, check timeout={:?}, retries={}",
            self.records.len(),
            self.timer.interval(),
            self.timer.check_timeout(),
            self.timer.retry_limit()
        );
        self.emit_event(FailoverEvent::Started {
            records_count: self.records.len(),
        });

        let shutdown = async move {
            match shutdown_rx {
                Some(rx) => {
                    let _ = rx.await;
                }
                None => shutdown_signal().await,
            }
        };
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                result = self.tick() => {
                    if let Err(e) = result {
                        return self.stop_on_error(e, shutdown.as_mut()).await;
                    }
                }

                _ = &mut shutdown => {
                    // Dropping the round aborts any check still running
                    info!("Shutdown signal received");
                    self.emit_event(FailoverEvent::Stopped {
                        reason: "Shutdown signal".to_string(),
                    });
                    return Ok(());
                }
            }
        }
    }

    /// Wait for the next scheduled tick, then run one round
    async fn tick(&mut self) -> Result<()> {
        let next = self.timer.next_tick_time();

        if let Some(late_by) = self.timer.drift() {
            warn!("We are late by {:?}", late_by);
            self.emit_event(FailoverEvent::TickLate { late_by });
        }

        let wait = self.timer.until(next);
        if !wait.is_zero() {
            debug!("Waiting {:?} before next round of checks", wait);
            tokio::time::sleep(wait).await;
        }

        self.run_round().await
    }

    /// Run one round immediately, without waiting for the schedule
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The round completed, or was skipped after a recoverable error
    /// - `Err(_)`: A fatal condition ([`Error::is_fatal`])
    pub async fn run_round(&mut self) -> Result<()> {
        debug!("Getting own address");
        let own = match self.resolver.own_address().await {
            Ok(address) => address,
            Err(e) => {
                error!("Failed to resolve own address, skipping round: {}", e);
                self.emit_event(FailoverEvent::RoundAborted {
                    reason: e.to_string(),
                });
                return Ok(());
            }
        };
        debug!("My own address = {}", own);

        if self.own_address != Some(own) {
            info!("My IP address seems to be {}", own);
            self.emit_event(FailoverEvent::OwnAddressChanged {
                previous: self.own_address,
                current: own,
            });
            self.own_address = Some(own);
        }

        debug!("Doing self-check");
        match self.checker.verdict(own, &self.check, &self.timer).await? {
            RoundVerdict::Alive { attempts } => {
                debug!("Self-check passed");
                self.emit_event(FailoverEvent::SelfCheckPassed {
                    address: own,
                    attempts,
                });
            }
            RoundVerdict::Dead { attempts } => {
                error!("Self-check failed for {} after {} attempt(s)", own, attempts);
                self.emit_event(FailoverEvent::SelfCheckFailed {
                    address: own,
                    attempts,
                });
                return Err(Error::SelfCheckFailed {
                    address: own,
                    attempts,
                });
            }
        }

        for record in &self.records {
            if !record.enabled {
                debug!("Record {} is disabled, skipping", record.name);
                continue;
            }

            match self.reconcile_record(&record.name, own).await {
                Ok(()) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    error!("Failed to reconcile {}: {}", record.name, e);
                    self.emit_event(FailoverEvent::RecordFailed {
                        record_name: record.name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Publish the own address if needed, then check peers in order
    ///
    /// Stops after the first removal.
    async fn reconcile_record(&self, name: &str, own: IpAddr) -> Result<()> {
        debug!("Getting DNS records for {}", name);
        let mut live = self.directory.address_records(name).await?;

        if !live.contains(&own) {
            info!("Adding myself ({}) into DNS for {}", own, name);
            self.directory.add_address_record(name, own).await?;
            warn!("Added myself ({}) into DNS for {}", own, name);
            self.emit_event(FailoverEvent::SelfRegistered {
                record_name: name.to_string(),
                address: own,
            });
            live.push(own);
        }

        // Textual order, identical on every peer whatever the provider returns
        live.sort_by_cached_key(|address| address.to_string());
        live.dedup();

        debug!("Checking {} peer(s) of {}", live.len().saturating_sub(1), name);
        for &peer in &live {
            if peer == own {
                continue;
            }

            let verdict = self.checker.verdict(peer, &self.check, &self.timer).await?;
            if let RoundVerdict::Alive { attempts } = verdict {
                debug!("Peer {} seems alive", peer);
                self.emit_event(FailoverEvent::PeerAlive {
                    record_name: name.to_string(),
                    address: peer,
                    attempts,
                });
                continue;
            }

            if live.len() < MIN_POOL_FOR_REMOVAL {
                warn!(
                    "Peer {} seems dead, but only {} address(es) are published for {}; keeping it",
                    peer,
                    live.len(),
                    name
                );
                self.emit_event(FailoverEvent::RemovalSuppressed {
                    record_name: name.to_string(),
                    address: peer,
                    pool_size: live.len(),
                });
                continue;
            }

            warn!("Peer {} seems dead, removing it from DNS for {}", peer, name);
            self.directory.remove_address_record(name, peer).await?;
            self.emit_event(FailoverEvent::PeerRemoved {
                record_name: name.to_string(),
                address: peer,
            });
            return Ok(());
        }

        Ok(())
    }

    /// Report a fatal error, observing the cool-down after a failed self-check
    async fn stop_on_error(
        &self,
        error: Error,
        shutdown: Pin<&mut impl Future<Output = ()>>,
    ) -> Result<()> {
        if matches!(error, Error::SelfCheckFailed { .. }) {
            error!(
                "Self-check failed; waiting {:?} before exiting",
                self.cooldown
            );
            tokio::select! {
                _ = tokio::time::sleep(self.cooldown) => {}
                _ = shutdown => {
                    info!("Shutdown signal received during cool-down");
                }
            }
        } else {
            error!("Fatal error: {}", error);
        }

        self.emit_event(FailoverEvent::Stopped {
            reason: error.to_string(),
        });
        Err(error)
    }

    /// Own address seen in the last round
    pub fn own_address(&self) -> Option<IpAddr> {
        self.own_address
    }

    /// Check executions currently alive (zero between rounds)
    pub fn outstanding_checks(&self) -> usize {
        self.checker.executor().outstanding()
    }

    /// Emit a loop event
    fn emit_event(&self, event: FailoverEvent) {
        if self.event_tx.try_send(event).is_err() {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}

/// Wait for SIGINT or SIGTERM
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = sigterm.recv() => {}
                _ = tokio::signal::ctrl_c() => {}
            }
        }
        Err(e) => {
            warn!("Failed to set up SIGTERM handler: {}", e);
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

/// Wait for SIGINT
#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failover_event_clone() {
        let event = FailoverEvent::PeerRemoved {
            record_name: "www.example.com".to_string(),
            address: IpAddr::from([192, 0, 2, 2]),
        };

        assert_eq!(event.clone(), event);
    }

    #[test]
    fn two_member_pool_is_guarded() {
        assert!(2 < MIN_POOL_FOR_REMOVAL);
        assert!(3 >= MIN_POOL_FOR_REMOVAL);
    }
}
