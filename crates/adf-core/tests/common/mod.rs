//! Test doubles and common utilities for contract tests
//!
//! The doubles share their state through `Arc`s, so a test keeps a clone
//! for inspection after handing the original to the loop.

#![allow(dead_code)]

use adf_core::config::{CheckConfig, DirectoryConfig, FailoverConfig, RecordConfig, ResolverConfig, TimingConfig};
use adf_core::error::{Error, Result};
use adf_core::traits::{AddressResolver, DnsDirectory, HealthCheck};
use adf_core::{FailoverEvent, FailoverLoop};
use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub fn ip(s: &str) -> IpAddr {
    s.parse().expect("valid test address")
}

/// What a scripted check does for one target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Answer healthy
    Pass,
    /// Answer unhealthy
    Fail,
    /// Never answer
    Hang,
    /// Panic inside the check
    Panic,
    /// Return an error
    Error,
    /// Answer unhealthy for the first n calls, healthy afterwards
    FailTimes(usize),
}

/// A HealthCheck whose answer is scripted per target
#[derive(Clone)]
pub struct ScriptedCheck {
    default: Behavior,
    behaviors: Arc<Mutex<HashMap<IpAddr, Behavior>>>,
    calls: Arc<Mutex<Vec<IpAddr>>>,
    in_flight: Arc<AtomicUsize>,
}

/// Counts a running check until its future is dropped
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedCheck {
    /// Every target not scripted otherwise behaves as `default`
    pub fn new(default: Behavior) -> Self {
        Self {
            default,
            behaviors: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Checks whose futures are still alive
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn with(self, target: IpAddr, behavior: Behavior) -> Self {
        self.set(target, behavior);
        self
    }

    pub fn set(&self, target: IpAddr, behavior: Behavior) {
        self.behaviors.lock().unwrap().insert(target, behavior);
    }

    /// Number of attempts made against `target`
    pub fn calls(&self, target: IpAddr) -> usize {
        self.calls.lock().unwrap().iter().filter(|t| **t == target).count()
    }

    /// Targets in the order they were checked
    pub fn call_order(&self) -> Vec<IpAddr> {
        self.calls.lock().unwrap().clone()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn as_arc(&self) -> Arc<dyn HealthCheck> {
        Arc::new(self.clone())
    }
}

#[async_trait::async_trait]
impl HealthCheck for ScriptedCheck {
    async fn check(&self, target: IpAddr) -> Result<bool> {
        let _in_flight = InFlight::enter(&self.in_flight);
        let behavior = self
            .behaviors
            .lock()
            .unwrap()
            .get(&target)
            .copied()
            .unwrap_or(self.default);

        let previous = {
            let mut calls = self.calls.lock().unwrap();
            let previous = calls.iter().filter(|t| **t == target).count();
            calls.push(target);
            previous
        };

        match behavior {
            Behavior::Pass => Ok(true),
            Behavior::Fail => Ok(false),
            Behavior::Hang => {
                std::future::pending::<()>().await;
                Ok(true)
            }
            Behavior::Panic => panic!("scripted panic for {}", target),
            Behavior::Error => Err(Error::health_check(format!("scripted error for {}", target))),
            Behavior::FailTimes(n) => Ok(previous >= n),
        }
    }

    fn describe(&self) -> String {
        "scripted check".to_string()
    }
}

/// One call made against a RecordingDirectory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryCall {
    Read(String),
    Add(String, IpAddr),
    Remove(String, IpAddr),
}

impl DirectoryCall {
    pub fn is_write(&self) -> bool {
        !matches!(self, DirectoryCall::Read(_))
    }
}

/// A DnsDirectory that records every call
///
/// Records are returned in insertion order, so tests can hand the loop an
/// unsorted pool.
#[derive(Clone, Default)]
pub struct RecordingDirectory {
    records: Arc<Mutex<HashMap<String, Vec<IpAddr>>>>,
    calls: Arc<Mutex<Vec<DirectoryCall>>>,
    failing: Arc<Mutex<HashSet<String>>>,
}

impl RecordingDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(self, name: &str, addresses: &[IpAddr]) -> Self {
        self.records
            .lock()
            .unwrap()
            .insert(name.to_string(), addresses.to_vec());
        self
    }

    /// Make every call for `name` fail
    pub fn fail_for(&self, name: &str) {
        self.failing.lock().unwrap().insert(name.to_string());
    }

    pub fn published(&self, name: &str) -> Vec<IpAddr> {
        self.records
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<DirectoryCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<DirectoryCall> {
        self.calls().into_iter().filter(DirectoryCall::is_write).collect()
    }

    pub fn removals(&self) -> Vec<IpAddr> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                DirectoryCall::Remove(_, address) => Some(address),
                _ => None,
            })
            .collect()
    }

    fn log(&self, call: DirectoryCall, name: &str) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if self.failing.lock().unwrap().contains(name) {
            return Err(Error::dns_directory(format!("scripted failure for {}", name)));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl DnsDirectory for RecordingDirectory {
    async fn address_records(&self, name: &str) -> Result<Vec<IpAddr>> {
        self.log(DirectoryCall::Read(name.to_string()), name)?;
        Ok(self.published(name))
    }

    async fn add_address_record(&self, name: &str, address: IpAddr) -> Result<()> {
        self.log(DirectoryCall::Add(name.to_string(), address), name)?;
        let mut records = self.records.lock().unwrap();
        let addresses = records.entry(name.to_string()).or_default();
        if !addresses.contains(&address) {
            addresses.push(address);
        }
        Ok(())
    }

    async fn remove_address_record(&self, name: &str, address: IpAddr) -> Result<()> {
        self.log(DirectoryCall::Remove(name.to_string(), address), name)?;
        if let Some(addresses) = self.records.lock().unwrap().get_mut(name) {
            addresses.retain(|a| *a != address);
        }
        Ok(())
    }
}

/// An AddressResolver whose answer can be changed, or made to fail
#[derive(Clone)]
pub struct SwitchableResolver {
    address: Arc<Mutex<Option<IpAddr>>>,
    calls: Arc<AtomicUsize>,
}

impl SwitchableResolver {
    pub fn new(address: IpAddr) -> Self {
        Self {
            address: Arc::new(Mutex::new(Some(address))),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            address: Arc::new(Mutex::new(None)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set(&self, address: Option<IpAddr>) {
        *self.address.lock().unwrap() = address;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl AddressResolver for SwitchableResolver {
    async fn own_address(&self) -> Result<IpAddr> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.address
            .lock()
            .unwrap()
            .ok_or_else(|| Error::address_resolver("scripted resolver failure"))
    }
}

/// Timing used by the contract tests: 100ms checks, 3 attempts
pub fn fast_timing() -> TimingConfig {
    TimingConfig {
        interval_secs: 10,
        check_timeout_ms: 100,
        retry_limit: 3,
        cooldown_secs: 60,
        reap_grace_ms: 100,
        event_channel_capacity: 1000,
    }
}

/// Loop configuration for `names` with fast timing
pub fn minimal_config(names: &[&str]) -> FailoverConfig {
    FailoverConfig {
        resolver: ResolverConfig::Static {
            address: ip("192.0.2.1"),
        },
        directory: DirectoryConfig::Memory {
            records: HashMap::new(),
        },
        check: CheckConfig::Command {
            program: "true".to_string(),
            args: Vec::new(),
        },
        records: names.iter().map(|name| RecordConfig::new(*name)).collect(),
        timing: fast_timing(),
    }
}

/// Build a loop around the given doubles
pub fn build_loop(
    resolver: &SwitchableResolver,
    directory: &RecordingDirectory,
    check: &ScriptedCheck,
    config: FailoverConfig,
) -> (FailoverLoop, mpsc::Receiver<FailoverEvent>) {
    FailoverLoop::new(
        Box::new(resolver.clone()),
        Box::new(directory.clone()),
        check.as_arc(),
        config,
    )
    .expect("loop construction succeeds")
}

/// Collect every event currently queued
pub fn drain(rx: &mut mpsc::Receiver<FailoverEvent>) -> Vec<FailoverEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Upper bound for one check attempt including reaping
pub fn attempt_budget(timing: &TimingConfig) -> Duration {
    timing.check_timeout() + timing.reap_grace()
}
