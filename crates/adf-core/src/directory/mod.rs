// # DNS Directory Implementations
//
// Directories that live inside the core crate. Provider-backed directories
// live in their own crates (e.g. `adf-provider-cloudflare`).

pub mod memory;

pub use memory::{MemoryDnsDirectory, MemoryDirectoryFactory};
