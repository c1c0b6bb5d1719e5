//! Built-in address resolvers
//!
//! Network-backed resolvers live in their own crates (e.g.
//! `adf-resolver-http`). This module only holds the fixed-address resolver.

use async_trait::async_trait;
use std::net::IpAddr;

use crate::config::ResolverConfig;
use crate::traits::{AddressResolver, AddressResolverFactory};
use crate::{Error, Result};

/// Resolver that always answers with a configured address
#[derive(Debug, Clone, Copy)]
pub struct StaticAddressResolver {
    address: IpAddr,
}

impl StaticAddressResolver {
    pub fn new(address: IpAddr) -> Self {
        Self { address }
    }
}

#[async_trait]
impl AddressResolver for StaticAddressResolver {
    async fn own_address(&self) -> Result<IpAddr> {
        Ok(self.address)
    }
}

/// Factory for creating static resolvers
pub struct StaticResolverFactory;

impl AddressResolverFactory for StaticResolverFactory {
    fn create(&self, config: &ResolverConfig) -> Result<Box<dyn AddressResolver>> {
        match config {
            ResolverConfig::Static { address } => {
                Ok(Box::new(StaticAddressResolver::new(*address)))
            }
            _ => Err(Error::config("Invalid config for static resolver")),
        }
    }
}
