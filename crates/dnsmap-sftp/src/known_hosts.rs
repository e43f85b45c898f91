//! known_hosts handling
//!
//! Preparing the known_hosts file and deciding what to do with a server
//! key once libssh2 has checked it against that file.

use dnsmap_core::config::HostKeyPolicy;
use std::io;
use std::path::Path;
use tokio::fs;

/// How the server key relates to the known_hosts file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownState {
    /// Key matches an entry
    Known,
    /// No entry for this host
    Unknown,
    /// An entry exists with a different key
    Changed,
    /// The check itself failed
    Unverifiable,
}

impl From<ssh2::CheckResult> for KnownState {
    fn from(result: ssh2::CheckResult) -> Self {
        match result {
            ssh2::CheckResult::Match => Self::Known,
            ssh2::CheckResult::NotFound => Self::Unknown,
            ssh2::CheckResult::Mismatch => Self::Changed,
            ssh2::CheckResult::Failure => Self::Unverifiable,
        }
    }
}

/// What to do with the server key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Already trusted
    Trusted,
    /// Trust and add to known_hosts
    Record,
    /// Ask the operator; add to known_hosts if accepted
    AskOperator,
    /// Refuse the connection
    Reject(&'static str),
}

/// Decide how to treat a server key under `policy`
pub fn verdict(policy: HostKeyPolicy, state: KnownState) -> Verdict {
    match (state, policy) {
        (KnownState::Known, _) => Verdict::Trusted,
        (KnownState::Changed, _) => Verdict::Reject(
            "host key does not match the known_hosts entry; check the known_hosts file",
        ),
        (KnownState::Unverifiable, _) => Verdict::Reject("host key could not be checked"),
        (KnownState::Unknown, HostKeyPolicy::Strict) => {
            Verdict::Reject("unknown host key; add it to known_hosts or relax host key checking")
        }
        (KnownState::Unknown, HostKeyPolicy::Ask) => Verdict::AskOperator,
        (KnownState::Unknown, HostKeyPolicy::AcceptNew) => Verdict::Record,
    }
}

/// Host name as written in known_hosts (`host` or `[host]:port`)
pub fn entry_name(host: &str, port: u16) -> String {
    if port == 22 {
        host.to_string()
    } else {
        format!("[{}]:{}", host, port)
    }
}

/// Render a key hash as `SHA256:aa:bb:...`
pub fn format_fingerprint(hash: &[u8]) -> String {
    let hex: Vec<String> = hash.iter().map(|b| format!("{:02x}", b)).collect();
    format!("SHA256:{}", hex.join(":"))
}

/// Create the known_hosts file (and its directory) if missing
///
/// On Unix the directory gets mode 0700 and the file 0600.
pub async fn ensure_file(path: &Path) -> io::Result<()> {
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
        && !fs::try_exists(dir).await?
    {
        fs::create_dir_all(dir).await?;
        restrict(dir, 0o700).await?;
        tracing::debug!("Created {}", dir.display());
    }

    if !fs::try_exists(path).await? {
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .await?;
        restrict(path, 0o600).await?;
        tracing::info!("Initialized known_hosts file {}", path.display());
    }

    Ok(())
}

#[cfg(unix)]
async fn restrict(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await
}

#[cfg(not(unix))]
async fn restrict(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}
