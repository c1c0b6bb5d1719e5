// # Health Check Implementations
//
// Checks that live inside the core crate. Network checks live in their own
// crates (e.g. `adf-check-http`).

pub mod command;

pub use command::{CommandCheck, CommandCheckFactory};
