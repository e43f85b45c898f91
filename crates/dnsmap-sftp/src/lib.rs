// # SFTP Session Gateway
//
// This crate provides the SFTP implementation of `SessionGateway`.
//
// ## Session Lifecycle
//
// ```text
// Disconnected ──connect()──► Connected ──fetch/push──► Connected
//       ▲                          │
//       └──────disconnect()────────┘
// ```
//
// `connect()` runs in two blocking phases on the tokio blocking pool:
//
// 1. TCP connect, SSH handshake, known_hosts check
// 2. Record the key (if accepted), password authentication, SFTP channel
//
// The operator is asked about unknown keys between the two phases, from
// async code. libssh2 never calls back into the console.
//
// ## Security Requirements
//
// - The password NEVER appears in logs
// - A key that contradicts known_hosts is always rejected
// - The known_hosts file is created owner-only when missing
//
// ## Remote Layout
//
// The record file is the first regular file in the configured remote
// directory whose name ends with the configured extension. Every upload
// looks the file up again and replaces it, or creates
// `<remote_dir>/<default_filename>` when the directory holds none.

pub mod known_hosts;

use async_trait::async_trait;
use dnsmap_core::config::{ConnectParams, GatewayConfig};
use dnsmap_core::traits::{HostKeyPrompt, SessionGateway};
use dnsmap_core::{Error, Result};
use known_hosts::{KnownState, Verdict};
use ssh2::{HashType, HostKeyType, KnownHostFileKind, Session, Sftp};
use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::{debug, info, warn};

/// Comment attached to known_hosts entries this gateway writes
const KNOWN_HOSTS_COMMENT: &str = "added by dnsmapctl";

/// An authenticated SSH session with its SFTP channel
struct Connection {
    session: Session,
    sftp: Sftp,
}

impl Connection {
    /// Close the SFTP channel, then the session (blocking)
    fn close(self) {
        let Connection { session, sftp } = self;
        drop(sftp);
        if let Err(e) = session.disconnect(None, "session finished", None) {
            debug!("SSH disconnect reported: {}", e);
        }
    }
}

enum SessionState {
    Disconnected,
    Connected(Connection),
}

/// A handshaken but not yet authenticated session
struct Handshake {
    session: Session,
    state: KnownState,
    key: Vec<u8>,
    key_type: HostKeyType,
    fingerprint: String,
}

impl Handshake {
    /// Open TCP, run the SSH handshake and check the server key (blocking)
    fn perform(address: &str, port: u16, known_hosts_path: &Path) -> Result<Self> {
        let tcp = TcpStream::connect((address, port))
            .map_err(|e| Error::connection(format!("{}:{}: {}", address, port, e)))?;

        let mut session = Session::new()
            .map_err(|e| Error::connection(format!("cannot create SSH session: {}", e)))?;
        session.set_tcp_stream(tcp);
        session
            .handshake()
            .map_err(|e| Error::connection(format!("SSH handshake failed: {}", e)))?;

        let (key, key_type) = match session.host_key() {
            Some((key, key_type)) => (key.to_vec(), key_type),
            None => return Err(Error::host_key("server sent no host key")),
        };
        let fingerprint = session
            .host_key_hash(HashType::Sha256)
            .map(known_hosts::format_fingerprint)
            .unwrap_or_else(|| "unavailable".to_string());

        let state = {
            let mut known = session
                .known_hosts()
                .map_err(|e| Error::host_key(format!("known_hosts unavailable: {}", e)))?;
            known
                .read_file(known_hosts_path, KnownHostFileKind::OpenSSH)
                .map_err(|e| {
                    Error::host_key(format!(
                        "cannot read {}: {}",
                        known_hosts_path.display(),
                        e
                    ))
                })?;
            KnownState::from(known.check_port(address, port, &key))
        };

        Ok(Self {
            session,
            state,
            key,
            key_type,
            fingerprint,
        })
    }

    fn key_type_name(&self) -> String {
        format!("{:?}", self.key_type)
    }

    /// Record the key if asked, authenticate, open SFTP (blocking)
    fn finish(
        self,
        record_as: Option<String>,
        known_hosts_path: &Path,
        login: &str,
        password: &str,
    ) -> Result<Connection> {
        let Handshake {
            session,
            key,
            key_type,
            ..
        } = self;

        if let Some(entry) = record_as {
            let mut known = session
                .known_hosts()
                .map_err(|e| Error::host_key(format!("known_hosts unavailable: {}", e)))?;
            known
                .read_file(known_hosts_path, KnownHostFileKind::OpenSSH)
                .and_then(|_| known.add(&entry, &key, KNOWN_HOSTS_COMMENT, key_type.into()))
                .and_then(|_| known.write_file(known_hosts_path, KnownHostFileKind::OpenSSH))
                .map_err(|e| {
                    Error::host_key(format!(
                        "cannot record key in {}: {}",
                        known_hosts_path.display(),
                        e
                    ))
                })?;
            info!("Recorded host key for {} in {}", entry, known_hosts_path.display());
        }

        session
            .userauth_password(login, password)
            .map_err(|e| Error::auth(format!("{} rejected: {}", login, e)))?;
        if !session.authenticated() {
            return Err(Error::auth(format!("{} rejected", login)));
        }

        let sftp = session
            .sftp()
            .map_err(|e| Error::connection(format!("cannot open SFTP channel: {}", e)))?;

        Ok(Connection { session, sftp })
    }
}

/// Run blocking SSH work on the blocking pool
async fn blocking<T, F>(op: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| Error::connection(format!("SSH task failed: {}", e)))?
}

/// First regular file in `dir` whose name ends with `extension` (blocking)
fn find_record_file(sftp: &Sftp, dir: &Path, extension: &str) -> Result<Option<PathBuf>> {
    let entries = sftp
        .readdir(dir)
        .map_err(|e| Error::transfer(format!("cannot list {}: {}", dir.display(), e)))?;

    Ok(entries
        .into_iter()
        .filter(|(_, stat)| !stat.is_dir())
        .map(|(path, _)| path)
        .find(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(extension))
        }))
}

/// Remote path an upload replaces
///
/// The record file currently on the server, else the configured default.
fn upload_target(found: Option<PathBuf>, default_path: PathBuf) -> PathBuf {
    found.unwrap_or(default_path)
}

/// SFTP session gateway
///
/// Holds at most one session and, while connected, at most one local
/// working copy. The working copy is a temporary file that is deleted on
/// disconnect, on the next fetch, or when the gateway is dropped.
///
/// # Security
///
/// The Debug implementation does not expose connection credentials.
pub struct SftpGateway {
    config: GatewayConfig,
    state: SessionState,
    /// Local working copy of the remote record file
    local_copy: Option<TempPath>,
}

impl std::fmt::Debug for SftpGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SftpGateway")
            .field("config", &self.config)
            .field("connected", &self.is_connected())
            .field("local_copy", &self.local_copy.as_deref())
            .finish()
    }
}

impl SftpGateway {
    /// Create a disconnected gateway
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            state: SessionState::Disconnected,
            local_copy: None,
        }
    }

    /// The gateway configuration
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Run `op` against the live connection on the blocking pool
    ///
    /// The connection is moved into the blocking task and handed back
    /// afterwards. A panicking task loses the connection.
    async fn with_connection<T, F>(&mut self, op: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = match std::mem::replace(&mut self.state, SessionState::Disconnected) {
            SessionState::Connected(conn) => conn,
            SessionState::Disconnected => return Err(Error::NotConnected),
        };

        let joined = tokio::task::spawn_blocking(move || {
            let result = op(&conn);
            (conn, result)
        })
        .await;

        match joined {
            Ok((conn, result)) => {
                self.state = SessionState::Connected(conn);
                result
            }
            Err(e) => {
                warn!("SFTP task failed, session lost: {}", e);
                Err(Error::transfer(format!("SFTP task failed: {}", e)))
            }
        }
    }

    /// Delete the current working copy, if any
    fn discard_local_copy(&mut self) {
        if let Some(local) = self.local_copy.take() {
            let shown = local.display().to_string();
            if let Err(e) = local.close() {
                warn!("Failed to delete local copy {}: {}", shown, e);
            } else {
                debug!("Deleted local copy {}", shown);
            }
        }
    }
}

#[async_trait]
impl SessionGateway for SftpGateway {
    async fn connect(
        &mut self,
        params: &ConnectParams,
        prompt: &mut dyn HostKeyPrompt,
    ) -> Result<()> {
        if self.is_connected() {
            self.disconnect().await;
        }

        let known_hosts_path = self.config.known_hosts_path.clone();
        known_hosts::ensure_file(&known_hosts_path)
            .await
            .map_err(|e| {
                Error::host_key(format!(
                    "cannot prepare {}: {}",
                    known_hosts_path.display(),
                    e
                ))
            })?;

        let handshake = {
            let address = params.address.clone();
            let port = params.port;
            let path = known_hosts_path.clone();
            blocking(move || Handshake::perform(&address, port, &path)).await?
        };
        debug!(
            "Server key for {}: {} {} ({:?})",
            params.address,
            handshake.key_type_name(),
            handshake.fingerprint,
            handshake.state
        );

        let record = match known_hosts::verdict(params.host_key_policy, handshake.state) {
            Verdict::Trusted => false,
            Verdict::Record => {
                info!(
                    "Accepting new host key for {} ({})",
                    params.address, handshake.fingerprint
                );
                true
            }
            Verdict::AskOperator => {
                let accepted = prompt
                    .confirm_host_key(
                        &params.address,
                        &handshake.key_type_name(),
                        &handshake.fingerprint,
                    )
                    .await;
                if !accepted {
                    return Err(Error::host_key(format!(
                        "key for {} not accepted",
                        params.address
                    )));
                }
                true
            }
            Verdict::Reject(reason) => {
                return Err(Error::host_key(format!("{}: {}", params.address, reason)));
            }
        };

        let record_as = record.then(|| known_hosts::entry_name(&params.address, params.port));
        let login = params.login.clone();
        let password = params.password.clone();
        let conn = blocking(move || {
            handshake.finish(record_as, &known_hosts_path, &login, &password)
        })
        .await?;

        self.state = SessionState::Connected(conn);
        info!("SFTP session open to {}:{}", params.address, params.port);
        Ok(())
    }

    async fn fetch_record_file(&mut self) -> Result<Option<PathBuf>> {
        let dir = self.config.remote_dir.clone();
        let extension = self.config.file_extension.clone();

        let found = self
            .with_connection(move |conn| {
                let Some(remote) = find_record_file(&conn.sftp, &dir, &extension)? else {
                    return Ok(None);
                };

                let mut file = conn.sftp.open(&remote).map_err(|e| {
                    Error::transfer(format!("cannot open {}: {}", remote.display(), e))
                })?;
                let mut content = Vec::new();
                file.read_to_end(&mut content).map_err(|e| {
                    Error::transfer(format!("cannot read {}: {}", remote.display(), e))
                })?;
                Ok(Some((remote, content)))
            })
            .await?;

        let Some((remote, content)) = found else {
            info!(
                "No *{} file in remote directory {}",
                self.config.file_extension,
                self.config.remote_dir.display()
            );
            return Ok(None);
        };

        self.discard_local_copy();
        let local = tempfile::Builder::new()
            .prefix("domains")
            .suffix(&self.config.file_extension)
            .tempfile()
            .map_err(|e| Error::transfer(format!("cannot create local copy: {}", e)))?
            .into_temp_path();
        tokio::fs::write(&local, &content).await?;

        info!(
            "Fetched {} ({} bytes) to {}",
            remote.display(),
            content.len(),
            local.display()
        );

        let path = local.to_path_buf();
        self.local_copy = Some(local);
        Ok(Some(path))
    }

    async fn push_record_file(&mut self) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }

        let local = self
            .local_copy
            .as_ref()
            .ok_or_else(|| Error::transfer("no local record file; fetch it first"))?;
        let content = tokio::fs::read(local).await?;
        let dir = self.config.remote_dir.clone();
        let extension = self.config.file_extension.clone();
        let default_path = self.config.default_remote_path();

        let size = content.len();
        let target = self
            .with_connection(move |conn| {
                let found = find_record_file(&conn.sftp, &dir, &extension)?;
                if found.is_none() {
                    debug!(
                        "No record file in {}, creating {}",
                        dir.display(),
                        default_path.display()
                    );
                }
                let remote = upload_target(found, default_path);

                let mut file = conn.sftp.create(&remote).map_err(|e| {
                    Error::transfer(format!("cannot open {} for writing: {}", remote.display(), e))
                })?;
                file.write_all(&content).map_err(|e| {
                    Error::transfer(format!("cannot write {}: {}", remote.display(), e))
                })?;
                Ok(remote)
            })
            .await?;

        info!("Uploaded {} bytes to {}", size, target.display());
        Ok(())
    }

    async fn disconnect(&mut self) {
        self.discard_local_copy();

        if let SessionState::Connected(conn) =
            std::mem::replace(&mut self.state, SessionState::Disconnected)
        {
            if let Err(e) = tokio::task::spawn_blocking(move || conn.close()).await {
                warn!("SSH close task failed: {}", e);
            }
            info!("SFTP session closed");
        }
    }

    fn is_connected(&self) -> bool {
        matches!(self.state, SessionState::Connected(_))
    }

    fn gateway_name(&self) -> &'static str {
        "sftp"
    }
}
