//! Deletion candidates and the candidate set
//!
//! A `CandidateSet` holds the rows proposed for deletion by one search run,
//! each with an inclusion flag the user can toggle. Aggregates are always
//! recomputed from the rows, so the selected byte total cannot drift from
//! the flags.

use crate::core::error::{DedupError, Result};
use crate::dedup::record::MessageRecord;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::HashSet;

/// Why a message was proposed for deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CandidateReason {
    /// Read message without sender (undelivered or recalled)
    Ghost,
    /// Content wholly contained in a newer message of the conversation
    Superseded,
}

/// The newer message that contains a candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Supersession {
    pub message_id: String,
    pub folder_name: String,
    pub timestamp: NaiveDateTime,
}

/// A message proposed for deletion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionCandidate {
    pub folder_name: String,
    pub conversation_id: String,
    pub message_id: String,
    pub timestamp: NaiveDateTime,
    pub subject: String,
    pub topic: String,
    pub unread: bool,
    pub sender_name: Option<String>,
    pub sender_address: Option<String>,
    pub size: u64,
    pub reason: CandidateReason,
    /// Present for `Superseded`, absent for `Ghost`
    pub superseded_by: Option<Supersession>,
    /// Whether the row is selected for deletion
    pub included: bool,
}

impl DeletionCandidate {
    /// Candidate for a ghost message
    pub fn ghost(record: &MessageRecord) -> Self {
        Self::from_record(record, CandidateReason::Ghost, None)
    }

    /// Candidate for `record`, contained in `newer`
    pub fn superseded(record: &MessageRecord, newer: &MessageRecord) -> Self {
        Self::from_record(
            record,
            CandidateReason::Superseded,
            Some(Supersession {
                message_id: newer.message_id.clone(),
                folder_name: newer.folder_name.clone(),
                timestamp: newer.timestamp,
            }),
        )
    }

    fn from_record(
        record: &MessageRecord,
        reason: CandidateReason,
        superseded_by: Option<Supersession>,
    ) -> Self {
        Self {
            folder_name: record.folder_name.clone(),
            conversation_id: record.conversation_id.clone(),
            message_id: record.message_id.clone(),
            timestamp: record.timestamp,
            subject: record.subject.clone(),
            topic: record.topic.clone(),
            unread: record.unread,
            sender_name: record.sender_name.clone(),
            sender_address: record.sender_address.clone(),
            size: record.size,
            reason,
            superseded_by,
            included: true,
        }
    }
}

/// Commands that change row inclusion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateCommand {
    /// Toggle one row, addressed by message id
    SetInclusion { message_id: String, included: bool },
    /// Toggle every row
    SetAll(bool),
}

/// Derived counts of a candidate set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Aggregates {
    pub deletable_count: usize,
    pub selected_count: usize,
    pub selected_bytes: u64,
}

/// Tri-state of a "select all" toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectAllState {
    All,
    None,
    Partial,
}

/// A deletion that failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDeletion {
    pub message_id: String,
    pub error: DedupError,
}

/// Outcome of a delete task
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionReport {
    /// Message ids removed from the store
    pub succeeded: Vec<String>,
    /// Rows that could not be deleted, in attempt order
    pub failed: Vec<FailedDeletion>,
}

impl DeletionReport {
    /// Whether every requested deletion succeeded
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Number of deleted messages, or the last error when any deletion failed
    pub fn into_result(self) -> Result<usize> {
        match self.failed.into_iter().last() {
            Some(failure) => Err(failure.error),
            None => Ok(self.succeeded.len()),
        }
    }

    /// Status message shown after a delete task
    pub fn outcome_message(&self) -> String {
        if self.is_complete() {
            "All messages successfully deleted".to_string()
        } else {
            format!(
                "Could not delete some emails ({} of {} failed)",
                self.failed.len(),
                self.failed.len() + self.succeeded.len()
            )
        }
    }
}

/// Rows proposed for deletion by one search run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    candidates: Vec<DeletionCandidate>,
}

impl CandidateSet {
    /// Create a set from comparator output
    pub fn new(candidates: Vec<DeletionCandidate>) -> Self {
        Self { candidates }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Rows in display order
    pub fn candidates(&self) -> &[DeletionCandidate] {
        &self.candidates
    }

    /// Look up a row by message id
    pub fn get(&self, message_id: &str) -> Option<&DeletionCandidate> {
        self.candidates.iter().find(|c| c.message_id == message_id)
    }

    /// Apply an inclusion command; returns whether any row changed
    pub fn apply(&mut self, command: CandidateCommand) -> bool {
        match command {
            CandidateCommand::SetInclusion {
                message_id,
                included,
            } => match self
                .candidates
                .iter_mut()
                .find(|c| c.message_id == message_id)
            {
                Some(row) if row.included != included => {
                    row.included = included;
                    true
                }
                _ => false,
            },
            CandidateCommand::SetAll(included) => {
                let mut changed = false;
                for row in &mut self.candidates {
                    changed |= row.included != included;
                    row.included = included;
                }
                changed
            }
        }
    }

    /// Counts and selected size, computed from the rows
    pub fn aggregates(&self) -> Aggregates {
        self.candidates
            .iter()
            .fold(Aggregates::default(), |mut acc, row| {
                acc.deletable_count += 1;
                if row.included {
                    acc.selected_count += 1;
                    acc.selected_bytes += row.size;
                }
                acc
            })
    }

    /// State of the "select all" toggle; an empty set counts as all selected
    pub fn select_all_state(&self) -> SelectAllState {
        let aggregates = self.aggregates();
        if aggregates.selected_count == aggregates.deletable_count {
            SelectAllState::All
        } else if aggregates.selected_count == 0 {
            SelectAllState::None
        } else {
            SelectAllState::Partial
        }
    }

    /// Copy of the selected rows, handed to a delete task
    pub fn selected_snapshot(&self) -> Vec<DeletionCandidate> {
        self.candidates
            .iter()
            .filter(|c| c.included)
            .cloned()
            .collect()
    }

    /// Drop the rows a delete task removed; failed rows stay, deselected
    ///
    /// Returns the number of rows removed.
    pub fn remove_confirmed_deletions(&mut self, report: &DeletionReport) -> usize {
        let succeeded: HashSet<&str> = report.succeeded.iter().map(String::as_str).collect();
        let failed: HashSet<&str> = report
            .failed
            .iter()
            .map(|f| f.message_id.as_str())
            .collect();

        let before = self.candidates.len();
        self.candidates
            .retain(|c| !succeeded.contains(c.message_id.as_str()));
        for row in &mut self.candidates {
            if failed.contains(row.message_id.as_str()) {
                row.included = false;
            }
        }
        before - self.candidates.len()
    }

    /// Status line for the current selection
    pub fn summary_line(&self, total_messages: usize) -> String {
        let aggregates = self.aggregates();
        format!(
            "{} messages marked for deletion out of {} in mailbox, representing {:.1} MB.",
            aggregates.selected_count,
            total_messages,
            aggregates.selected_bytes as f64 / (1024.0 * 1024.0)
        )
    }
}
