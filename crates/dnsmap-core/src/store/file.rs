// # File-Backed Record Store
//
// Holds the domain/IP table for one session. The table lives in memory and
// is backed by exactly one local file (the working copy fetched by the
// session gateway).
//
// ## Loading
//
// - Unreadable file, empty file, or no `"addresses":[` marker: start empty,
//   report a warning
// - Invalid JSON or a malformed entry: fail, so a damaged remote table is
//   never silently replaced by an empty one
//
// ## Writes
//
// Every successful add/remove rewrites the whole file: new content goes to
// a sibling `.tmp` file which is then renamed over the backing file.

use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{Error, Result};
use crate::record::{Record, is_valid_ipv4};
use crate::store::format;

/// Outcome of [`RecordStore::add`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// Record appended and flushed
    Added(Record),
    /// An existing record already uses this domain (case-insensitive)
    DuplicateDomain(Record),
    /// An existing record already uses this address
    DuplicateAddress(Record),
}

impl AddOutcome {
    /// Whether the record was added
    pub fn is_added(&self) -> bool {
        matches!(self, Self::Added(_))
    }
}

/// In-memory record table backed by one local file
///
/// # Example
///
/// ```rust,no_run
/// use dnsmap_core::store::{AddOutcome, RecordStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut store = RecordStore::load("/tmp/domains.json").await?;
///
///     if let AddOutcome::Added(record) = store.add("new.com", "172.16.0.1").await? {
///         println!("{}", record);
///     }
///
///     assert_eq!(store.lookup_address("new.com"), Some("172.16.0.1"));
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct RecordStore {
    path: PathBuf,
    records: Vec<Record>,
}

impl RecordStore {
    /// Load a store from its backing file
    ///
    /// Read failures and files without an `addresses` array produce an
    /// empty store. Files that do have the array but cannot be interpreted
    /// are an error.
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let records = match fs::read_to_string(&path).await {
            Ok(content) => match format::decode(&content) {
                Ok(records) => records,
                Err(e) if e.is_degradable_format() => {
                    tracing::warn!(
                        "Record file {} has no usable table ({}). Starting empty.",
                        path.display(),
                        e
                    );
                    Vec::new()
                }
                Err(e) => {
                    tracing::error!("Record file {} is malformed: {}", path.display(), e);
                    return Err(e);
                }
            },
            Err(e) => {
                tracing::warn!(
                    "Failed to read record file {}: {}. Starting empty.",
                    path.display(),
                    e
                );
                Vec::new()
            }
        };

        report_inconsistencies(&records);
        tracing::debug!("Loaded {} records from {}", records.len(), path.display());

        Ok(Self { path, records })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records, sorted by domain
    pub fn list(&self) -> Vec<Record> {
        let mut records = self.records.clone();
        records.sort_by(|a, b| a.domain().cmp(b.domain()));
        records
    }

    /// Address of the first record whose domain equals `domain` exactly
    pub fn lookup_address(&self, domain: &str) -> Option<&str> {
        self.records
            .iter()
            .find(|r| r.domain() == domain)
            .map(Record::address)
    }

    /// Domain of the first record whose address equals `address` exactly
    pub fn lookup_domain(&self, address: &str) -> Option<&str> {
        self.records
            .iter()
            .find(|r| r.address() == address)
            .map(Record::domain)
    }

    /// Add a record
    ///
    /// The domain check is case-insensitive while lookups and removal are
    /// exact; `Example.com` cannot be added next to `example.com`, but
    /// looking up `Example.com` finds nothing.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidAddress`]: `address` is not a dotted-quad IPv4 address
    /// - [`Error::InvalidInput`]: `domain` is empty
    /// - [`Error::Persistence`]: the record was added in memory but the
    ///   backing file could not be written
    pub async fn add(&mut self, domain: &str, address: &str) -> Result<AddOutcome> {
        if !is_valid_ipv4(address) {
            return Err(Error::invalid_address(address));
        }
        if domain.trim().is_empty() {
            return Err(Error::invalid_input("domain cannot be empty"));
        }

        for existing in &self.records {
            if same_domain(existing.domain(), domain) {
                tracing::info!("Domain already exists: {}", domain);
                return Ok(AddOutcome::DuplicateDomain(existing.clone()));
            }
            if existing.address() == address {
                tracing::info!("Address already exists: {}", address);
                return Ok(AddOutcome::DuplicateAddress(existing.clone()));
            }
        }

        let record = Record::new(domain, address);
        self.records.push(record.clone());
        self.flush().await?;

        tracing::info!("Added record {}", record);
        Ok(AddOutcome::Added(record))
    }

    /// Remove the first record whose domain or address equals `key` exactly
    ///
    /// Returns `Ok(None)` without touching the file when nothing matches.
    pub async fn remove(&mut self, key: &str) -> Result<Option<Record>> {
        let Some(position) = self.records.iter().position(|r| r.matches_key(key)) else {
            tracing::debug!("No record matches {}", key);
            return Ok(None);
        };

        let removed = self.records.remove(position);
        self.flush().await?;

        tracing::info!("Removed record {}", removed);
        Ok(Some(removed))
    }

    /// Rewrite the backing file from the in-memory records
    pub async fn flush(&self) -> Result<()> {
        let content = format::encode(&self.records);
        let temp_path = self.temp_path();

        let result = match write_file(&temp_path, content.as_bytes()).await {
            Ok(()) => fs::rename(&temp_path, &self.path).await.map_err(|e| {
                Error::persistence(format!("failed to replace {}: {}", self.path.display(), e))
            }),
            Err(e) => Err(Error::persistence(format!(
                "failed to write temp file {}: {}",
                temp_path.display(),
                e
            ))),
        };

        if let Err(e) = result {
            discard_temp(&temp_path).await;
            return Err(e);
        }

        tracing::trace!("Records written to {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }
}

async fn write_file(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(content).await?;
    file.flush().await
}

/// Remove a temp file left by a failed flush
async fn discard_temp(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => tracing::debug!("Removed {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
    }
}

/// Case-insensitive domain comparison used by the duplicate check
fn same_domain(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Warn about loaded records that break the insert-time invariants
fn report_inconsistencies(records: &[Record]) {
    for (i, record) in records.iter().enumerate() {
        if !is_valid_ipv4(record.address()) {
            tracing::warn!("Record {} has a non-IPv4 address", record);
        }
        for other in &records[i + 1..] {
            if same_domain(other.domain(), record.domain()) {
                tracing::warn!("Duplicate domain in record file: {}", record.domain());
            }
            if other.address() == record.address() {
                tracing::warn!("Duplicate address in record file: {}", record.address());
            }
        }
    }
}
