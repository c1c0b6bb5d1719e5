// # DNS Directory Trait
//
// Defines the interface to the DNS backend that publishes the pool.
//
// ## Implementations
//
// - Cloudflare: `adf-provider-cloudflare` crate
// - In-memory: `adf_core::directory::MemoryDnsDirectory`
//
// ## Usage
//
// ```rust,ignore
// use adf_core::DnsDirectory;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let directory = /* DnsDirectory implementation */;
//
//     let published = directory.address_records("www.example.com").await?;
//     directory
//         .remove_address_record("www.example.com", "192.0.2.10".parse()?)
//         .await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::IpAddr;

/// Trait for DNS directory implementations
///
/// A directory exposes exactly three operations over the address records
/// (A for IPv4, AAAA for IPv6) published under one name.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Freshness
///
/// Every call must reflect the provider's current state. Other peers mutate
/// the same record set concurrently, so implementations must not cache
/// records across calls. Reloading the whole zone on every call is
/// acceptable.
///
/// ## Allowed
/// - ✅ Perform API calls to the provider's endpoints
/// - ✅ Keep provider quirks (zone lookup, TTL, comments) behind this boundary
///
/// ## Forbidden
/// - ❌ Retry or back off (the failover loop retries on the next tick)
/// - ❌ Cache records between calls
/// - ❌ Decide which peers are alive
#[async_trait]
pub trait DnsDirectory: Send + Sync {
    /// Read the addresses currently published under `name`
    ///
    /// Order is undefined; the failover loop sorts the result itself.
    async fn address_records(&self, name: &str) -> Result<Vec<IpAddr>, crate::Error>;

    /// Publish `address` under `name`
    ///
    /// Adding an address that is already published must not create a
    /// duplicate entry.
    async fn add_address_record(&self, name: &str, address: IpAddr) -> Result<(), crate::Error>;

    /// Withdraw `address` from `name`
    ///
    /// Only records whose value equals `address` are removed. Removing an
    /// absent address is a no-op, not an error.
    async fn remove_address_record(
        &self,
        name: &str,
        address: IpAddr,
    ) -> Result<(), crate::Error>;
}

/// Helper trait for constructing DNS directories from configuration
pub trait DnsDirectoryFactory: Send + Sync {
    /// Create a DnsDirectory instance from configuration
    fn create(
        &self,
        config: &crate::config::DirectoryConfig,
    ) -> Result<Box<dyn DnsDirectory>, crate::Error>;
}
