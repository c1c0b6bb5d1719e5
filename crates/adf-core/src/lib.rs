// # adf-core
//
// Core library for self-organizing DNS round-robin failover.
//
// A set of peer nodes share one DNS name whose address records form a
// round-robin pool. Every node runs the same loop: check itself, make sure
// its own address is published, check the other published addresses, and
// withdraw a peer that stays dead. There is no coordinator; the loop is
// deterministic enough that peers converge on the same decisions.
//
// ## Architecture Overview
//
// - **AddressResolver**: Trait for looking up the node's own public address
// - **HealthCheck**: Trait for probing whether an address serves traffic
// - **DnsDirectory**: Trait for reading and mutating the address records of a name
// - **TimerPolicy**: Round schedule with drift absorption, check timeout, retry limit
// - **BoundedCheckExecutor**: Runs one check in a killable task with a hard deadline
// - **RetryingChecker**: Turns bounded attempts into a per-round alive/dead verdict
// - **FailoverLoop**: Orchestrates rounds and reconciles DNS
// - **ProviderRegistry**: Plugin-based registry for collaborator implementations
//
// ## Design Principles
//
// 1. **Separation of Concerns**: The loop only knows the three collaborator traits
// 2. **Bounded Checks**: No check can stall a round past its deadline
// 3. **Plugin-Based**: Implementations are registered by type name, no hard-coded if-else
// 4. **Library-First**: The loop can be embedded without the daemon
// 5. **Conservative Mutation**: At most one removal per record per round

pub mod traits;
pub mod timer;
pub mod executor;
pub mod checker;
pub mod failover;
pub mod registry;
pub mod config;
pub mod error;
pub mod directory;
pub mod check;
pub mod resolver;

// Re-export core types for convenience
pub use traits::{AddressResolver, DnsDirectory, HealthCheck};
pub use timer::{Clock, ManualClock, SystemClock, TimerPolicy};
pub use executor::{BoundedCheckExecutor, CheckOutcome};
pub use checker::{RetryingChecker, RoundVerdict};
pub use failover::{FailoverEvent, FailoverLoop};
pub use registry::ProviderRegistry;
pub use config::{
    CheckConfig, DirectoryConfig, FailoverConfig, IpVersion, RecordConfig, ResolverConfig,
    TimingConfig,
};
pub use error::{Error, Result};
pub use directory::MemoryDnsDirectory;
pub use check::CommandCheck;
pub use resolver::StaticAddressResolver;
