//! Plugin-based collaborator registry
//!
//! The registry maps type names from configuration to factories, so the
//! daemon can build its DNS directory, address resolver and health check
//! without hardcoded if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use adf_core::registry::ProviderRegistry;
//!
//! let registry = ProviderRegistry::with_builtins();
//! adf_provider_cloudflare::register(&registry);
//!
//! let directory = registry.create_directory(&config.directory)?;
//! let resolver = registry.create_resolver(&config.resolver)?;
//! let check = registry.create_check(&config.check)?;
//! ```
//!
//! ## Registration
//!
//! Implementation crates expose a `register()` function:
//!
//! ```rust,ignore
//! pub fn register(registry: &ProviderRegistry) {
//!     registry.register_directory("cloudflare", Box::new(CloudflareFactory));
//! }
//! ```

use crate::check::CommandCheckFactory;
use crate::config::{CheckConfig, DirectoryConfig, ResolverConfig};
use crate::directory::MemoryDirectoryFactory;
use crate::error::{Error, Result};
use crate::resolver::StaticResolverFactory;
use crate::traits::{AddressResolver, DnsDirectory, HealthCheck};
use crate::traits::{AddressResolverFactory, DnsDirectoryFactory, HealthCheckFactory};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Registry of collaborator factories
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct ProviderRegistry {
    /// Registered DNS directory factories
    directories: RwLock<HashMap<String, Box<dyn DnsDirectoryFactory>>>,

    /// Registered address resolver factories
    resolvers: RwLock<HashMap<String, Box<dyn AddressResolverFactory>>>,

    /// Registered health check factories
    checks: RwLock<HashMap<String, Box<dyn HealthCheckFactory>>>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the core crate's implementations registered
    ///
    /// - directory `memory`
    /// - resolver `static`
    /// - check `command`
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register_directory("memory", Box::new(MemoryDirectoryFactory));
        registry.register_resolver("static", Box::new(StaticResolverFactory));
        registry.register_check("command", Box::new(CommandCheckFactory));
        registry
    }

    /// Register a DNS directory factory
    ///
    /// # Parameters
    ///
    /// - `name`: Directory type name (e.g., "cloudflare", "memory")
    /// - `factory`: Factory object for creating directory instances
    pub fn register_directory(
        &self,
        name: impl Into<String>,
        factory: Box<dyn DnsDirectoryFactory>,
    ) {
        write(&self.directories).insert(name.into(), factory);
    }

    /// Register an address resolver factory
    pub fn register_resolver(
        &self,
        name: impl Into<String>,
        factory: Box<dyn AddressResolverFactory>,
    ) {
        write(&self.resolvers).insert(name.into(), factory);
    }

    /// Register a health check factory
    pub fn register_check(&self, name: impl Into<String>, factory: Box<dyn HealthCheckFactory>) {
        write(&self.checks).insert(name.into(), factory);
    }

    /// Create a DNS directory from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn DnsDirectory>)`: Created directory instance
    /// - `Err(Error)`: If the type is not registered or creation fails
    pub fn create_directory(&self, config: &DirectoryConfig) -> Result<Box<dyn DnsDirectory>> {
        let directory_type = config.type_name();
        let directories = read(&self.directories);

        let factory = directories.get(directory_type).ok_or_else(|| {
            Error::config(format!("Unknown directory type: {}", directory_type))
        })?;

        factory.create(config)
    }

    /// Create an address resolver from configuration
    pub fn create_resolver(&self, config: &ResolverConfig) -> Result<Box<dyn AddressResolver>> {
        let resolver_type = config.type_name();
        let resolvers = read(&self.resolvers);

        let factory = resolvers.get(resolver_type).ok_or_else(|| {
            Error::config(format!("Unknown resolver type: {}", resolver_type))
        })?;

        factory.create(config)
    }

    /// Create a health check from configuration
    pub fn create_check(&self, config: &CheckConfig) -> Result<Box<dyn HealthCheck>> {
        let check_type = config.type_name();
        let checks = read(&self.checks);

        let factory = checks
            .get(check_type)
            .ok_or_else(|| Error::config(format!("Unknown check type: {}", check_type)))?;

        factory.create(config)
    }

    /// List all registered directory types
    pub fn list_directories(&self) -> Vec<String> {
        read(&self.directories).keys().cloned().collect()
    }

    /// List all registered resolver types
    pub fn list_resolvers(&self) -> Vec<String> {
        read(&self.resolvers).keys().cloned().collect()
    }

    /// List all registered check types
    pub fn list_checks(&self) -> Vec<String> {
        read(&self.checks).keys().cloned().collect()
    }

    /// Check if a directory type is registered
    pub fn has_directory(&self, name: &str) -> bool {
        read(&self.directories).contains_key(name)
    }

    /// Check if a resolver type is registered
    pub fn has_resolver(&self, name: &str) -> bool {
        read(&self.resolvers).contains_key(name)
    }

    /// Check if a check type is registered
    pub fn has_check(&self, name: &str) -> bool {
        read(&self.checks).contains_key(name)
    }
}
