//! Domain-to-address records
//!
//! A [`Record`] binds one domain name to one IPv4 address. Addresses are
//! plain strings; [`is_valid_ipv4`] is the single validation rule applied
//! before a record is inserted.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Dotted-quad pattern accepted for new records
///
/// Leading zeros are allowed (`01.02.03.004`), which `std::net::Ipv4Addr`
/// would reject.
const IPV4_PATTERN: &str =
    r"^((25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)$";

static IPV4_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(IPV4_PATTERN).expect("IPv4 pattern is a valid regex"));

/// Check whether `addr` is a dotted-quad IPv4 address
pub fn is_valid_ipv4(addr: &str) -> bool {
    !addr.is_empty() && IPV4_RE.is_match(addr)
}

/// One domain-to-address binding
///
/// Serialized with the field names used by the record file
/// (`domain`, `ip`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    domain: String,
    #[serde(rename = "ip")]
    address: String,
}

impl Record {
    /// Create a record without validating it
    pub fn new(domain: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            address: address.into(),
        }
    }

    /// The domain name
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// The IPv4 address
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Whether `key` names this record, by exact domain or exact address
    pub fn matches_key(&self, key: &str) -> bool {
        self.domain == key || self.address == key
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Domain: {}, IP: {}", self.domain, self.address)
    }
}
