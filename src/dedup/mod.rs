//! Duplicate detection pipeline
//!
//! A search runs in three stages:
//!
//! 1. `enumerator` - walk the folder tree and pick the folders to scan
//! 2. `indexer` - read every message of those folders into records, setting
//!    aside ghosts (read messages without sender)
//! 3. `comparator` - group records by conversation and find the older
//!    messages wholly contained in a newer one
//!
//! The resulting `CandidateSet` (see `candidates`) is what the user reviews
//! before `search::delete_selected` removes the selected rows. `export`
//! renders it as a delimited table.

pub mod candidates;
pub mod comparator;
pub mod enumerator;
pub mod export;
pub mod indexer;
pub mod record;
pub mod search;

pub use candidates::{
    Aggregates, CandidateCommand, CandidateReason, CandidateSet, DeletionCandidate,
    DeletionReport, FailedDeletion, SelectAllState, Supersession,
};
pub use record::MessageRecord;
pub use search::{delete_selected, search, SearchOutcome, SearchParams};

/// Step shown while the folder tree is walked
pub const COUNTING_STEP: &str = "Counting emails...";

/// Step shown while messages are read; total is the message count
pub const READ_STEP: &str = "Step 1/2 - Read all messages";

/// Step shown while conversations are compared; total is the conversation count
pub const COMPARE_STEP: &str = "Step 2/2 - Compare all messages";

/// Step shown while selected messages are deleted
pub const DELETE_STEP: &str = "Deleting...";
