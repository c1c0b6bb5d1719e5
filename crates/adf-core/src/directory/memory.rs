// # Memory DNS Directory
//
// In-process implementation of DnsDirectory.
//
// ## Purpose
//
// Holds address records in a HashMap instead of a DNS provider. Useful for
// embedding the failover loop, rehearsing a configuration without touching
// a real zone, and tests.
//
// ## Semantics
//
// - Names are compared case-insensitively, ignoring a trailing dot
// - Adding a published address is a no-op (no duplicates)
// - Removing an absent address is a no-op
// - Clones share the same records

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use async_trait::async_trait;

use crate::config::DirectoryConfig;
use crate::traits::{DnsDirectory, DnsDirectoryFactory};
use crate::Error;

/// In-memory DNS directory
///
/// # Example
///
/// ```rust,no_run
/// use adf_core::directory::MemoryDnsDirectory;
/// use adf_core::traits::DnsDirectory;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let directory = MemoryDnsDirectory::new();
///
///     directory.add_address_record("www.example.com", "192.0.2.1".parse()?).await?;
///     let published = directory.address_records("www.example.com").await?;
///     assert_eq!(published, vec!["192.0.2.1".parse::<std::net::IpAddr>()?]);
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryDnsDirectory {
    inner: Arc<RwLock<HashMap<String, Vec<IpAddr>>>>,
}

impl MemoryDnsDirectory {
    /// Create a new empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory pre-populated with `records`
    pub fn with_records(records: HashMap<String, Vec<IpAddr>>) -> Self {
        let mut normalized: HashMap<String, Vec<IpAddr>> = HashMap::new();
        for (name, addresses) in records {
            let entry = normalized.entry(normalize(&name)).or_default();
            for address in addresses {
                if !entry.contains(&address) {
                    entry.push(address);
                }
            }
        }

        Self {
            inner: Arc::new(RwLock::new(normalized)),
        }
    }
}

fn normalize(name: &str) -> String {
    name.trim_end_matches('.').to_ascii_lowercase()
}

#[async_trait]
impl DnsDirectory for MemoryDnsDirectory {
    async fn address_records(&self, name: &str) -> Result<Vec<IpAddr>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.get(&normalize(name)).cloned().unwrap_or_default())
    }

    async fn add_address_record(&self, name: &str, address: IpAddr) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        let addresses = guard.entry(normalize(name)).or_default();
        if !addresses.contains(&address) {
            addresses.push(address);
        }
        Ok(())
    }

    async fn remove_address_record(&self, name: &str, address: IpAddr) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        if let Some(addresses) = guard.get_mut(&normalize(name)) {
            addresses.retain(|published| *published != address);
        }
        Ok(())
    }
}

/// Factory for creating memory directories
pub struct MemoryDirectoryFactory;

impl DnsDirectoryFactory for MemoryDirectoryFactory {
    fn create(&self, config: &DirectoryConfig) -> Result<Box<dyn DnsDirectory>, Error> {
        match config {
            DirectoryConfig::Memory { records } => {
                Ok(Box::new(MemoryDnsDirectory::with_records(records.clone())))
            }
            _ => Err(Error::config("Invalid config for memory directory")),
        }
    }
}
