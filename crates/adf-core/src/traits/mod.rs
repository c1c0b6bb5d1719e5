//! Core traits for the ADF system
//!
//! This module defines the interfaces to the collaborators the failover
//! loop consumes.
//!
//! - [`AddressResolver`]: Look up the node's own public address
//! - [`HealthCheck`]: Decide whether an address serves traffic
//! - [`DnsDirectory`]: Read/add/remove the address records of a name

pub mod address_resolver;
pub mod dns_directory;
pub mod health_check;

pub use address_resolver::{AddressResolver, AddressResolverFactory};
pub use dns_directory::{DnsDirectory, DnsDirectoryFactory};
pub use health_check::{HealthCheck, HealthCheckFactory};
