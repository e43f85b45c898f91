// # dnsmap-core
//
// Core library for editing a remote domain-to-IPv4 table.
//
// ## Architecture Overview
//
// - **Record**: One domain/address binding plus the IPv4 validation rule
// - **RecordStore**: The in-memory table backed by one local file
// - **SessionGateway**: Trait for fetching and pushing the remote record file
// - **HostKeyPrompt**: Capability for confirming unknown server keys
// - **DomainManager**: Command layer sequencing gateway and store
//
// ## Design Principles
//
// 1. **Separation of Concerns**: The store never does remote I/O, the
//    gateway never interprets the file
// 2. **Library-First**: The console binary is a thin layer over this crate
// 3. **Local First**: Every change is written locally before it is pushed

pub mod config;
pub mod error;
pub mod manager;
pub mod record;
pub mod store;
pub mod traits;

// Re-export core types for convenience
pub use config::{ConnectParams, GatewayConfig, HostKeyPolicy};
pub use error::{Error, Result};
pub use manager::{DomainManager, Mutation, SyncStatus};
pub use record::{Record, is_valid_ipv4};
pub use store::{AddOutcome, RecordStore};
pub use traits::{FixedAnswer, HostKeyPrompt, SessionGateway};
