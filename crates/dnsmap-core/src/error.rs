//! Error types for dnsmap
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for dnsmap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for dnsmap
#[derive(Error, Debug)]
pub enum Error {
    /// Address is not a dotted-quad IPv4 string
    #[error("Invalid IPv4 address: {0}")]
    InvalidAddress(String),

    /// Invalid operator input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Record file has no top-level `addresses` array
    #[error("Invalid record file format: {0}")]
    MissingAddresses(String),

    /// An entry of the `addresses` array could not be interpreted
    #[error("Malformed record #{index}: {reason}")]
    MalformedRecord {
        /// Zero-based position in the `addresses` array
        index: usize,
        /// What is wrong with the entry
        reason: String,
    },

    /// Local backing file could not be written
    #[error("Failed to save records: {0}")]
    Persistence(String),

    /// Store has not been initialized for this session
    #[error("Record store is not loaded")]
    NotLoaded,

    /// No record file found on the server
    #[error("No record file found on the server")]
    NoRecordFile,

    /// Gateway operation attempted without an active session
    #[error("Not connected to the server")]
    NotConnected,

    /// Connection could not be established
    #[error("Connection error: {0}")]
    Connection(String),

    /// Host key verification failed or was refused
    #[error("Host key verification failed: {0}")]
    HostKey(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Remote file transfer failed
    #[error("Transfer error: {0}")]
    Transfer(String),

    /// Operator input stream ended
    #[error("Input closed")]
    InputClosed,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an invalid address error
    pub fn invalid_address(addr: impl Into<String>) -> Self {
        Self::InvalidAddress(addr.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a missing `addresses` array error
    pub fn missing_addresses(msg: impl Into<String>) -> Self {
        Self::MissingAddresses(msg.into())
    }

    /// Create a malformed record error
    pub fn malformed(index: usize, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            index,
            reason: reason.into(),
        }
    }

    /// Create a persistence error
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a host key error
    pub fn host_key(msg: impl Into<String>) -> Self {
        Self::HostKey(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a transfer error
    pub fn transfer(msg: impl Into<String>) -> Self {
        Self::Transfer(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the error belongs to a single operation and the session can go on
    ///
    /// Input, rejected-lookup and save errors leave the session usable.
    /// Everything else ends the session.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidAddress(_)
                | Self::InvalidInput(_)
                | Self::Persistence(_)
                | Self::Transfer(_)
        )
    }

    /// Whether the error is a format problem that degrades to an empty store
    pub fn is_degradable_format(&self) -> bool {
        matches!(self, Self::MissingAddresses(_))
    }
}
