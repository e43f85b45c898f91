//! Domain manager
//!
//! The DomainManager is responsible for:
//! - Holding the session gateway and the per-session record store
//! - Loading the store from the fetched record file, once per session
//! - Answering queries against the store
//! - Pushing the working copy after every successful mutation
//!
//! ## Mutation Flow
//!
//! ```text
//! add/remove ──► RecordStore (scan, mutate, flush local file)
//!                     │
//!                     ▼ on success
//!              SessionGateway::push_record_file()
//!                     │
//!                     ▼
//!            SyncStatus::Pushed | SyncStatus::PushFailed
//! ```
//!
//! A failed push leaves the local file ahead of the server. Nothing is
//! retried or rolled back; the operator decides what to do next.

use crate::config::ConnectParams;
use crate::error::{Error, Result};
use crate::record::Record;
use crate::store::{AddOutcome, RecordStore};
use crate::traits::{HostKeyPrompt, SessionGateway};
use tracing::{debug, error, info, warn};

/// Whether a mutation reached the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    /// Remote file replaced
    Pushed,
    /// Local file updated, upload failed
    PushFailed(String),
}

/// Result of an add or remove request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Record added or removed, with the outcome of the upload
    Applied {
        /// The record that was added or removed
        record: Record,
        /// Upload outcome
        sync: SyncStatus,
    },
    /// Add rejected by a duplicate (never pushed)
    Rejected(AddOutcome),
    /// Remove found no matching record (never pushed)
    NotFound,
}

/// Command layer over a session gateway and its record store
///
/// ## Lifecycle
///
/// 1. Create with [`DomainManager::new()`]
/// 2. [`connect()`](DomainManager::connect) and
///    [`ensure_store()`](DomainManager::ensure_store)
/// 3. Query and mutate
/// 4. [`disconnect()`](DomainManager::disconnect)
///
/// The store is `None` until loaded; an empty store is a loaded store
/// with no records.
pub struct DomainManager<G: SessionGateway> {
    gateway: G,
    store: Option<RecordStore>,
}

impl<G: SessionGateway> DomainManager<G> {
    /// Create a manager around a gateway
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            store: None,
        }
    }

    /// Access the gateway
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Whether the gateway has a session
    pub fn is_connected(&self) -> bool {
        self.gateway.is_connected()
    }

    /// Whether the store is loaded for this session
    pub fn is_loaded(&self) -> bool {
        self.store.is_some()
    }

    /// Connect the gateway
    ///
    /// Returns `false` on any failure; the reason is logged.
    pub async fn connect(
        &mut self,
        params: &ConnectParams,
        prompt: &mut dyn HostKeyPrompt,
    ) -> bool {
        if let Err(e) = params.validate() {
            warn!("Refusing to connect: {}", e);
            return false;
        }

        info!(
            "Connecting to {}:{} as {} via {}",
            params.address,
            params.port,
            params.login,
            self.gateway.gateway_name()
        );

        match self.gateway.connect(params, prompt).await {
            Ok(()) => {
                info!("Connected to {}:{}", params.address, params.port);
                true
            }
            Err(e) => {
                error!("Connection to {}:{} failed: {}", params.address, params.port, e);
                false
            }
        }
    }

    /// Load the store from the server if it is not loaded yet
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`]: no session
    /// - [`Error::NoRecordFile`]: the server has no record file
    /// - [`Error::MalformedRecord`] / [`Error::Json`]: the fetched file is damaged
    pub async fn ensure_store(&mut self) -> Result<&RecordStore> {
        if self.store.is_none() {
            let local = self
                .gateway
                .fetch_record_file()
                .await?
                .ok_or(Error::NoRecordFile)?;

            debug!("Loading records from {}", local.display());
            let store = RecordStore::load(&local).await?;
            info!("Record store ready: {} records", store.len());
            self.store = Some(store);
        }

        self.store.as_ref().ok_or(Error::NotLoaded)
    }

    /// All records, sorted by domain
    pub fn list(&self) -> Result<Vec<Record>> {
        Ok(self.store()?.list())
    }

    /// Address bound to `domain` (exact match)
    pub fn lookup_address(&self, domain: &str) -> Result<Option<String>> {
        Ok(self.store()?.lookup_address(domain).map(str::to_string))
    }

    /// Domain bound to `address` (exact match)
    pub fn lookup_domain(&self, address: &str) -> Result<Option<String>> {
        Ok(self.store()?.lookup_domain(address).map(str::to_string))
    }

    /// Add a record and push the updated file
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidAddress`] / [`Error::InvalidInput`]: bad input, nothing changed
    /// - [`Error::Persistence`]: added in memory, local file not written, not pushed
    pub async fn add(&mut self, domain: &str, address: &str) -> Result<Mutation> {
        let outcome = self.store_mut()?.add(domain, address).await?;

        match outcome {
            AddOutcome::Added(record) => {
                let sync = self.push().await;
                Ok(Mutation::Applied { record, sync })
            }
            rejected => Ok(Mutation::Rejected(rejected)),
        }
    }

    /// Remove the record matching `key` (domain or address) and push
    pub async fn remove(&mut self, key: &str) -> Result<Mutation> {
        match self.store_mut()?.remove(key).await? {
            Some(record) => {
                let sync = self.push().await;
                Ok(Mutation::Applied { record, sync })
            }
            None => Ok(Mutation::NotFound),
        }
    }

    /// Drop the store and close the session
    pub async fn disconnect(&mut self) {
        self.store = None;
        self.gateway.disconnect().await;
        info!("Disconnected");
    }

    async fn push(&mut self) -> SyncStatus {
        match self.gateway.push_record_file().await {
            Ok(()) => {
                info!("Record file uploaded");
                SyncStatus::Pushed
            }
            Err(e) => {
                error!("Failed to upload record file: {}", e);
                SyncStatus::PushFailed(e.to_string())
            }
        }
    }

    fn store(&self) -> Result<&RecordStore> {
        self.store.as_ref().ok_or(Error::NotLoaded)
    }

    fn store_mut(&mut self) -> Result<&mut RecordStore> {
        self.store.as_mut().ok_or(Error::NotLoaded)
    }
}
