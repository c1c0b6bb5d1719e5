//! Minimal embedding example for adf-core
//!
//! Runs the failover loop against an in-process directory, a fixed own
//! address and a custom health check. The application owns the lifecycle
//! and stops the loop through a oneshot channel.

use adf_core::config::{RecordConfig, TimingConfig};
use adf_core::traits::{DnsDirectory, HealthCheck};
use adf_core::{FailoverConfig, FailoverLoop, MemoryDnsDirectory, Result, StaticAddressResolver};
use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

/// Health check answering from a fixed set of dead addresses
struct EmbeddedCheck {
    dead: HashSet<IpAddr>,
}

#[async_trait::async_trait]
impl HealthCheck for EmbeddedCheck {
    async fn check(&self, target: IpAddr) -> Result<bool> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(!self.dead.contains(&target))
    }

    fn describe(&self) -> String {
        "embedded check".to_string()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    println!("=== Embedded adf-core Example ===\n");

    let own = IpAddr::from([192, 0, 2, 10]);
    let healthy_peer = IpAddr::from([192, 0, 2, 20]);
    let dead_peer = IpAddr::from([192, 0, 2, 30]);

    // Shared with the loop, so the application can inspect the pool
    let directory = MemoryDnsDirectory::with_records(HashMap::from([(
        "www.example.com".to_string(),
        vec![healthy_peer, dead_peer],
    )]));

    let check = Arc::new(EmbeddedCheck {
        dead: HashSet::from([dead_peer]),
    });

    let config = FailoverConfig {
        records: vec![RecordConfig::new("www.example.com")],
        timing: TimingConfig {
            interval_secs: 1,
            check_timeout_ms: 500,
            retry_limit: 2,
            ..TimingConfig::default()
        },
        ..FailoverConfig::default()
    };

    println!("1. Creating failover loop...");
    let (mut failover, mut event_rx) = FailoverLoop::new(
        Box::new(StaticAddressResolver::new(own)),
        Box::new(directory.clone()),
        check,
        config,
    )?;

    let event_listener = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            println!("[Event] {:?}", event);
        }
    });

    println!("2. Running for a few rounds...");
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let loop_handle = tokio::spawn(async move {
        let result = failover.run_with_shutdown(Some(shutdown_rx)).await;
        (failover, result)
    });

    tokio::time::sleep(Duration::from_millis(2500)).await;

    println!("\n3. Stopping the loop...");
    let _ = shutdown_tx.send(());
    let (failover, result) = loop_handle
        .await
        .map_err(|e| adf_core::Error::Other(format!("Loop task failed: {}", e)))?;
    result?;
    drop(failover);
    let _ = event_listener.await;

    let published = directory.address_records("www.example.com").await?;
    println!("\n4. Published pool: {:?}", published);
    println!("   own address registered: {}", published.contains(&own));
    println!("   dead peer removed:      {}", !published.contains(&dead_peer));

    Ok(())
}
