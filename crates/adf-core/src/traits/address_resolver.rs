// # Address Resolver Trait
//
// Defines how a node learns its own public address.
//
// ## Implementations
//
// - HTTP "what is my IP" / instance metadata: `adf-resolver-http` crate
// - Fixed address: `adf_core::resolver::StaticAddressResolver`

use async_trait::async_trait;
use std::net::IpAddr;

/// Trait for own-address lookup
///
/// The failover loop calls [`own_address`](AddressResolver::own_address)
/// once per tick. Public addresses can be reassigned while the process runs
/// (elastic addresses), so implementations must not cache the answer.
///
/// A failure here is recoverable: the loop logs it and skips the tick.
#[async_trait]
pub trait AddressResolver: Send + Sync {
    /// Look up the node's current public address
    async fn own_address(&self) -> Result<IpAddr, crate::Error>;
}

/// Helper trait for constructing address resolvers from configuration
pub trait AddressResolverFactory: Send + Sync {
    /// Create an AddressResolver instance from configuration
    fn create(
        &self,
        config: &crate::config::ResolverConfig,
    ) -> Result<Box<dyn AddressResolver>, crate::Error>;
}
