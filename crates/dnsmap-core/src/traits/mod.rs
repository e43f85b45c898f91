//! Core traits for dnsmap
//!
//! This module defines the abstract interfaces that transport implementations follow.
//!
//! - [`SessionGateway`]: Fetch and push the remote record file
//! - [`HostKeyPrompt`]: Operator confirmation of unknown host keys

pub mod gateway;
pub mod prompt;

pub use gateway::SessionGateway;
pub use prompt::{FixedAnswer, HostKeyPrompt};
