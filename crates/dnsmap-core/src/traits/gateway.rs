// # Session Gateway Trait
//
// Defines the interface for moving the record file between the remote
// server and a local working copy.
//
// ## Implementations
//
// - SFTP: `dnsmap-sftp` crate
//
// ## Usage
//
// ```rust,ignore
// use dnsmap_core::SessionGateway;
//
// let mut gateway = /* SessionGateway implementation */;
//
// gateway.connect(&params, &mut prompt).await?;
// if let Some(local) = gateway.fetch_record_file().await? {
//     // edit `local`, then
//     gateway.push_record_file().await?;
// }
// gateway.disconnect().await;
// ```

use async_trait::async_trait;
use std::path::PathBuf;

use crate::config::ConnectParams;
use crate::traits::prompt::HostKeyPrompt;

/// Trait for session gateway implementations
///
/// A gateway owns one remote session and, while connected, at most one
/// local working copy of the remote record file.
///
/// # State
///
/// Implementations hold an explicit `Disconnected | Connected` state. Every
/// operation other than `connect`, `disconnect` and `is_connected` fails
/// with [`crate::Error::NotConnected`] while disconnected.
///
/// # Responsibilities
///
/// - Perform remote I/O and manage the local temporary file
/// - Verify host identity according to [`crate::config::HostKeyPolicy`]
/// - Never interpret the record file (owned by `RecordStore`)
/// - Never retry on its own (the operator decides)
#[async_trait]
pub trait SessionGateway: Send {
    /// Establish a session
    ///
    /// `prompt` is asked to confirm unknown host keys when the policy is
    /// [`crate::config::HostKeyPolicy::Ask`].
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Connected and ready for transfers
    /// - `Err(Error)`: Connection, host key or authentication failure with
    ///   a human-readable reason
    async fn connect(
        &mut self,
        params: &ConnectParams,
        prompt: &mut dyn HostKeyPrompt,
    ) -> Result<(), crate::Error>;

    /// Download the remote record file into a fresh local temporary file
    ///
    /// # Returns
    ///
    /// - `Ok(Some(path))`: Local path of the downloaded copy
    /// - `Ok(None)`: No record file exists on the server
    /// - `Err(Error)`: Not connected, or the transfer failed
    async fn fetch_record_file(&mut self) -> Result<Option<PathBuf>, crate::Error>;

    /// Upload the local working copy back to the server
    ///
    /// The target is the record file currently on the server, or the
    /// configured default file name when the server has none.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Remote file replaced
    /// - `Err(Error)`: Not connected, no local copy, or the transfer failed
    async fn push_record_file(&mut self) -> Result<(), crate::Error>;

    /// Delete the local copy and close the session
    ///
    /// Idempotent; does nothing harmful when not connected.
    async fn disconnect(&mut self);

    /// Whether a session is established
    fn is_connected(&self) -> bool;

    /// Get the gateway name (for logging/debugging)
    fn gateway_name(&self) -> &'static str;
}
