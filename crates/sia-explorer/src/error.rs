//! Error types for the explorer core.

use crate::store::ElementKind;
use sia_types::{DecodeError, ElementId};
use thiserror::Error;

/// Explorer-level errors.
#[derive(Error, Debug)]
pub enum ExplorerError {
    /// Missing key in the index.
    #[error("not found")]
    NotFound,

    /// A stored blob failed to decode.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] sia_storage::StorageError),

    /// File or KV I/O failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A hash-store file is torn or otherwise unusable.
    #[error("hash store corruption: {0}")]
    Corruption(String),

    /// An element was inserted twice under the same (id, kind).
    #[error("duplicate {kind} element {id}")]
    DuplicateElement { id: ElementId, kind: ElementKind },

    /// A deferred write error surfaced at commit; the transaction was
    /// rolled back.
    #[error("commit failed: {0}")]
    CommitFailed(#[source] Box<ExplorerError>),
}

/// Result type for explorer operations.
pub type ExplorerResult<T> = Result<T, ExplorerError>;
