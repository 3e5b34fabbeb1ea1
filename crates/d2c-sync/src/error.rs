//! Error types for the sync engine.
//!
//! Errors are split by blast radius:
//! - [`LoadError`] aborts the whole run before any remote call.
//! - [`ConversionError`] and [`RemoteError`] fail a single node; the engine
//!   wraps them in [`NodeError`] and blocks that node's subtree.

use std::path::PathBuf;

use crate::tree::PageId;

/// Error while loading the local document tree.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LoadError {
    /// Root directory does not exist.
    #[error("source directory not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Root path exists but is not a directory.
    #[error("source path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// File or directory could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Front matter block is not valid YAML.
    #[error("invalid front matter in {}: {message}", path.display())]
    FrontMatter {
        /// Document path.
        path: PathBuf,
        /// Parser diagnostic.
        message: String,
    },

    /// Two documents resolve to the same page title.
    #[error(
        "duplicate page title \"{title}\": {} and {}",
        first.display(),
        second.display()
    )]
    DuplicateTitle {
        /// Conflicting title.
        title: String,
        /// Path of the first document with this title.
        first: PathBuf,
        /// Path of the second document with this title.
        second: PathBuf,
    },

    /// Two documents both supply the content of one directory page.
    #[error(
        "directory {} has more than one content document: {} and {}",
        dir.display(),
        first.display(),
        second.display()
    )]
    DuplicateContent {
        /// Directory the documents belong to.
        dir: PathBuf,
        /// First claimant, in path order.
        first: PathBuf,
        /// Second claimant, in path order.
        second: PathBuf,
    },
}

/// Markdown could not be converted to storage format.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ConversionError {
    message: String,
}

impl ConversionError {
    /// Create a conversion error from the converter's diagnostic.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Converter diagnostic.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Error from a remote page operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum RemoteError {
    /// Request never produced a response (DNS, TLS, timeout, connection reset).
    #[error("transport error: {0}")]
    Transport(String),

    /// Server answered with an error status.
    #[error("HTTP error: {status} - {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body (may contain error details).
        body: String,
    },

    /// Credentials were rejected or could not be applied.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Response could not be decoded.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// Write used a version that is no longer current.
    #[error("version conflict on page {page_id}")]
    VersionConflict {
        /// Page that rejected the write.
        page_id: PageId,
    },
}

/// Why a single node failed to sync.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NodeError {
    /// Looking up the remote counterpart failed.
    #[error("lookup failed: {0}")]
    Resolve(RemoteError),

    /// Content could not be converted.
    #[error("conversion failed: {0}")]
    Convert(#[from] ConversionError),

    /// Page creation failed.
    #[error("create failed: {0}")]
    Create(RemoteError),

    /// Page update failed for a reason other than a version conflict.
    #[error("update failed: {0}")]
    Update(RemoteError),

    /// Update conflicted, and the single retry with a fresh version conflicted too.
    #[error("page {page_id} was modified concurrently; retry also conflicted")]
    VersionConflict {
        /// Contended page.
        page_id: PageId,
    },

    /// Page disappeared between the conflicting update and the re-read.
    #[error("page {page_id} disappeared while retrying a conflicting update")]
    Vanished {
        /// Page that could no longer be found.
        page_id: PageId,
    },

    /// Parent slot was read before the parent synced.
    #[error("parent of {} has no remote page", .0.display())]
    ParentUnsynced(PathBuf),
}
