//! Configuration types for dnsmap
//!
//! This module defines the gateway settings and per-connection parameters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Default remote directory searched for the record file
pub const DEFAULT_REMOTE_DIR: &str = ".";

/// Default extension of the record file
pub const DEFAULT_FILE_EXTENSION: &str = ".json";

/// Remote file name used when the server has no record file yet
pub const DEFAULT_FILENAME: &str = "domains.json";

/// Gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// known_hosts file used for host key verification
    pub known_hosts_path: PathBuf,

    /// Remote directory holding the record file
    #[serde(default = "default_remote_dir")]
    pub remote_dir: PathBuf,

    /// Extension identifying the record file
    #[serde(default = "default_file_extension")]
    pub file_extension: String,

    /// Upload target when no record file was fetched
    #[serde(default = "default_filename")]
    pub default_filename: String,
}

impl GatewayConfig {
    /// Create a configuration with defaults and the given known_hosts path
    pub fn new(known_hosts_path: impl Into<PathBuf>) -> Self {
        Self {
            known_hosts_path: known_hosts_path.into(),
            remote_dir: default_remote_dir(),
            file_extension: default_file_extension(),
            default_filename: default_filename(),
        }
    }

    /// Set the remote directory
    pub fn with_remote_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.remote_dir = dir.into();
        self
    }

    /// Set the record file extension
    pub fn with_file_extension(mut self, extension: impl Into<String>) -> Self {
        self.file_extension = extension.into();
        self
    }

    /// Set the default remote file name
    pub fn with_default_filename(mut self, name: impl Into<String>) -> Self {
        self.default_filename = name.into();
        self
    }

    /// Remote path used when uploading without a fetched file
    pub fn default_remote_path(&self) -> PathBuf {
        self.remote_dir.join(&self.default_filename)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.known_hosts_path.as_os_str().is_empty() {
            return Err(crate::Error::config("known_hosts path cannot be empty"));
        }
        if self.file_extension.is_empty() {
            return Err(crate::Error::config("record file extension cannot be empty"));
        }
        if self.default_filename.is_empty() || self.default_filename.contains('/') {
            return Err(crate::Error::config(format!(
                "default file name must be a plain file name, got '{}'",
                self.default_filename
            )));
        }
        if !self.default_filename.ends_with(&self.file_extension) {
            return Err(crate::Error::config(format!(
                "default file name '{}' does not end with '{}'",
                self.default_filename, self.file_extension
            )));
        }
        Ok(())
    }
}

fn default_remote_dir() -> PathBuf {
    PathBuf::from(DEFAULT_REMOTE_DIR)
}

fn default_file_extension() -> String {
    DEFAULT_FILE_EXTENSION.to_string()
}

fn default_filename() -> String {
    DEFAULT_FILENAME.to_string()
}

/// How unknown host keys are treated
///
/// A key that contradicts a known_hosts entry is rejected under every policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostKeyPolicy {
    /// Reject unknown keys
    Strict,
    /// Ask the operator, record accepted keys
    Ask,
    /// Accept and record unknown keys without asking
    AcceptNew,
}

impl FromStr for HostKeyPolicy {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "ask" => Ok(Self::Ask),
            "accept-new" => Ok(Self::AcceptNew),
            other => Err(crate::Error::config(format!(
                "unknown host key policy '{}' (expected strict, ask or accept-new)",
                other
            ))),
        }
    }
}

impl fmt::Display for HostKeyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Strict => "strict",
            Self::Ask => "ask",
            Self::AcceptNew => "accept-new",
        })
    }
}

/// Parameters for one connection attempt
#[derive(Clone)]
pub struct ConnectParams {
    /// Server host name or address
    pub address: String,
    /// Server port (1-65535)
    pub port: u16,
    /// Login name
    pub login: String,
    /// Password
    /// ⚠️ NEVER log this value
    pub password: String,
    /// Host key policy for this session
    pub host_key_policy: HostKeyPolicy,
}

impl ConnectParams {
    /// Validate the parameters
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.address.trim().is_empty() {
            return Err(crate::Error::invalid_input("server address cannot be empty"));
        }
        if self.port == 0 {
            return Err(crate::Error::invalid_input("port must be between 1 and 65535"));
        }
        if self.login.is_empty() {
            return Err(crate::Error::invalid_input("login cannot be empty"));
        }
        if self.password.is_empty() {
            return Err(crate::Error::invalid_input("password cannot be empty"));
        }
        Ok(())
    }
}

// Custom Debug implementation that hides the password
impl fmt::Debug for ConnectParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectParams")
            .field("address", &self.address)
            .field("port", &self.port)
            .field("login", &self.login)
            .field("password", &"<REDACTED>")
            .field("host_key_policy", &self.host_key_policy)
            .finish()
    }
}
