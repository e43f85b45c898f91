// # Record Store
//
// The file-backed domain/IP table and its on-disk format.

pub mod file;
pub mod format;

pub use file::{AddOutcome, RecordStore};
