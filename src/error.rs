//! Error taxonomy and lock-acquisition helpers.

use std::io;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tracing::error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, RecError>;

/// Errors surfaced by the engine and its graph store.
///
/// Data-not-found conditions with a well-defined empty-result semantics (no
/// rating history, no matching items, no peer evidence) are reported as empty
/// collections, never through this type.
#[derive(Debug, Error)]
pub enum RecError {
    /// An operation referenced a user or item identifier that does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),
    /// Malformed input: non-finite rating, duplicate context definition,
    /// mismatched argument lengths.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The graph store cannot serve the call. Propagated to the caller,
    /// never retried by the engine.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    /// I/O failure while reading a dataset file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Malformed dataset file: bad header, missing role column, unparsable cell.
    #[error("dataset error: {0}")]
    Dataset(String),
}

/// Takes the read side of a store lock, mapping poisoning to
/// [`RecError::StoreUnavailable`].
pub fn acquire_read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| {
        error!("graph store lock poisoned");
        RecError::StoreUnavailable("graph store lock poisoned".into())
    })
}

/// Write-side counterpart of [`acquire_read`].
pub fn acquire_write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| {
        error!("graph store lock poisoned");
        RecError::StoreUnavailable("graph store lock poisoned".into())
    })
}
