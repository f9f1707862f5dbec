//! Error types for the mail deduplication tool
//!
//! This module defines the error types used throughout the library. The
//! variants follow the failure classes of a search/delete run: transient
//! store disconnects, per-attachment read failures, fatal message read
//! failures, user aborts and per-row deletion failures.

use thiserror::Error;

/// Main error type for the mail deduplication tool
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DedupError {
    /// The mail store connection dropped; retried once after a reconnect
    #[error("Mail store connection lost: {0}")]
    TransientStore(String),

    /// An attachment could not be resolved to a name
    #[error("Failed to read attachment of message '{message_id}': {reason}")]
    AttachmentRead { message_id: String, reason: String },

    /// The core fields of a message could not be read
    #[error("Failed to read message '{message_id}': {reason}")]
    MessageRead { message_id: String, reason: String },

    /// The user cancelled the running task
    #[error("Operation cancelled by user")]
    Aborted,

    /// A single message could not be deleted
    #[error("Could not delete message '{message_id}': {reason}")]
    Deletion { message_id: String, reason: String },

    /// The requested account does not exist in the store
    #[error("Mailbox account not found: {0}")]
    AccountNotFound(String),

    /// The requested folder does not exist in the store
    #[error("Folder not found: {0}")]
    FolderNotFound(String),

    /// General mail store failure
    #[error("Mail store error: {0}")]
    Store(String),

    /// An exported candidate table could not be parsed
    #[error("Invalid candidate table at line {line}: {reason}")]
    InvalidTable { line: usize, reason: String },

    /// A task is already running on the controller
    #[error("Another operation is already in progress")]
    ControllerBusy,

    /// General I/O error
    #[error("IO error: {0}")]
    Io(String),
}

impl DedupError {
    /// Whether this error means the user stopped the run
    pub fn is_aborted(&self) -> bool {
        matches!(self, DedupError::Aborted)
    }

    /// Whether a reconnect might clear this error
    pub fn is_transient(&self) -> bool {
        matches!(self, DedupError::TransientStore(_))
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, DedupError>;

impl From<std::io::Error> for DedupError {
    fn from(err: std::io::Error) -> Self {
        DedupError::Io(err.to_string())
    }
}
