//! Search and delete entry points
//!
//! `search` runs the whole pipeline for one account and returns the
//! candidate set; `delete_selected` removes a snapshot of selected rows
//! from the store, one row at a time.

use crate::core::config::SearchConfig;
use crate::core::context::RunContext;
use crate::core::error::Result;
use crate::dedup::candidates::{CandidateSet, DeletionCandidate, DeletionReport, FailedDeletion};
use crate::dedup::comparator::compare;
use crate::dedup::enumerator::{enumerate, WalkOptions};
use crate::dedup::export::DATE_FORMAT;
use crate::dedup::indexer::index_folder;
use crate::dedup::{COUNTING_STEP, DELETE_STEP, READ_STEP};
use crate::store::session::StoreSession;
use crate::store::traits::{DefaultFolderKind, MailStoreTrait};
use log::{debug, error, info, warn};
use std::collections::HashSet;

/// Parameters of one search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    /// Account to scan
    pub account: String,
    /// Folder names skipped together with their subfolders
    pub excluded_folders: Vec<String>,
    pub include_subfolders: bool,
    /// Folders with at least this many items are not scanned themselves
    pub folder_size_limit: usize,
    /// Also skip the store's sync-issues, contacts, drafts, journal and
    /// rss-feeds folders
    pub exclude_default_folders: bool,
}

impl SearchParams {
    /// Default parameters for an account
    pub fn new(account: &str) -> Self {
        Self::from_config(account, &SearchConfig::default())
    }

    /// Parameters from the `[search]` config section
    pub fn from_config(account: &str, config: &SearchConfig) -> Self {
        Self {
            account: account.to_string(),
            excluded_folders: config.excluded_folders.clone(),
            include_subfolders: config.include_subfolders,
            folder_size_limit: config.folder_size_limit,
            exclude_default_folders: config.exclude_default_folders,
        }
    }

    /// Add a folder name to skip
    pub fn exclude(mut self, folder: &str) -> Self {
        self.excluded_folders.push(folder.to_string());
        self
    }

    /// Set the folder size limit
    pub fn with_size_limit(mut self, limit: usize) -> Self {
        self.folder_size_limit = limit;
        self
    }

    /// Only scan the account's root folder
    pub fn without_subfolders(mut self) -> Self {
        self.include_subfolders = false;
        self
    }
}

/// Result of a search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOutcome {
    /// Account that was scanned
    pub account: String,
    /// Ghosts first, then superseded messages
    pub candidates: CandidateSet,
    /// Items in every non-excluded folder visited
    pub total_messages: usize,
    pub folders_scanned: usize,
    /// Store the candidates live in; needed to delete them
    pub store_id: String,
    /// Name of the account's deleted-items folder
    pub deleted_folder: Option<String>,
}

impl SearchOutcome {
    /// Status line for the current selection
    pub fn summary_line(&self) -> String {
        self.candidates.summary_line(self.total_messages)
    }
}

/// Find the messages of `params.account` that can be deleted
///
/// Returns `DedupError::Aborted` when the run is cancelled.
pub fn search<S: MailStoreTrait + ?Sized>(
    store: &S,
    params: &SearchParams,
    ctx: &RunContext,
) -> Result<SearchOutcome> {
    let session = StoreSession::new(store);
    let account = params.account.as_str();

    ctx.begin_step(COUNTING_STEP, 0);
    session.ensure_connected(account)?;

    let mut excluded: HashSet<String> = params.excluded_folders.iter().cloned().collect();
    if params.exclude_default_folders {
        for kind in DefaultFolderKind::EXCLUDED_BY_DEFAULT {
            if let Some(name) = session.call(|s| s.default_folder_name(account, kind))? {
                excluded.insert(name);
            }
        }
    }
    let deleted_folder =
        session.call(|s| s.default_folder_name(account, DefaultFolderKind::DeletedItems))?;

    let root = session.call(|s| s.root_folder(account))?;
    let plan = enumerate(
        &session,
        &root,
        WalkOptions {
            excluded: &excluded,
            include_subfolders: params.include_subfolders,
            size_limit: params.folder_size_limit,
        },
        ctx,
    )?;

    ctx.begin_step(READ_STEP, plan.total_items);
    let mut live = Vec::new();
    let mut ghosts = Vec::new();
    let mut offset = 0;
    for folder in &plan.folders {
        let indexed = index_folder(&session, folder, offset, ctx)?;
        live.extend(indexed.live);
        ghosts.extend(indexed.ghosts);
        offset += folder.item_count;
    }
    debug!("Read {} live messages, {} ghosts", live.len(), ghosts.len());

    let superseded = compare(live, deleted_folder.as_deref(), ctx)?;
    info!(
        "Search of {} complete: {} ghosts and {} superseded messages in {} folders",
        account,
        ghosts.len(),
        superseded.len(),
        plan.folders.len()
    );

    ghosts.extend(superseded);
    Ok(SearchOutcome {
        account: params.account.clone(),
        candidates: CandidateSet::new(ghosts),
        total_messages: plan.total_items,
        folders_scanned: plan.folders.len(),
        store_id: root.store_id,
        deleted_folder,
    })
}

/// Delete `rows` from the store
///
/// Every row is attempted; failures are collected in the report. A
/// cancelled run stops early, and rows not yet attempted appear in neither
/// list.
pub fn delete_selected<S: MailStoreTrait + ?Sized>(
    store: &S,
    store_id: &str,
    rows: &[DeletionCandidate],
    ctx: &RunContext,
) -> DeletionReport {
    let session = StoreSession::new(store);
    let mut report = DeletionReport::default();
    ctx.begin_step(DELETE_STEP, rows.len());

    for (i, row) in rows.iter().enumerate() {
        if ctx.cancel_token().is_cancelled() {
            warn!("Deletion cancelled after {} of {} messages", i, rows.len());
            break;
        }

        let date = row.timestamp.format(DATE_FORMAT);
        match session.call(|s| s.delete_message(store_id, &row.message_id)) {
            Ok(()) => {
                debug!("Deleted: {} {} {}", date, row.subject, row.folder_name);
                report.succeeded.push(row.message_id.clone());
            }
            Err(e) => {
                error!(
                    "Could not delete: {} {} {}: {}",
                    date, row.subject, row.folder_name, e
                );
                report.failed.push(FailedDeletion {
                    message_id: row.message_id.clone(),
                    error: e,
                });
            }
        }
        ctx.advance(i + 1);
    }

    if let Err(e) = session.call(|s| s.flush()) {
        error!("Failed to persist deletions: {}", e);
    }

    info!(
        "Deleted {} messages, {} failures",
        report.succeeded.len(),
        report.failed.len()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::tests::RecordingProgress;
    use crate::core::context::CancelToken;
    use crate::core::error::DedupError;
    use crate::dedup::candidates::CandidateReason;
    use crate::dedup::COMPARE_STEP;
    use crate::store::snapshot::{FolderSnapshot, MessageSnapshot, SnapshotStore, StoreSnapshot};
    use crate::store::traits::StoreSimulationConfig;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::sync::Arc;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 4, 8)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn mailbox() -> StoreSnapshot {
        let inbox = FolderSnapshot::mail("inbox", "Inbox").with_messages(vec![
            MessageSnapshot::new("A", "conv", at(9), "Hello").with_size(100),
            MessageSnapshot::new("C", "conv", at(11), "Ok\n> Hi\n> Hello").with_size(300),
            MessageSnapshot::new("G1", "bounce", at(8), "").ghost().with_size(40),
            MessageSnapshot::new("G2", "recall", at(8), "").ghost().unread(),
        ]);
        let sent = FolderSnapshot::mail("sent", "Sent Items").with_messages(vec![
            MessageSnapshot::new("B", "conv", at(10), "Hi\n> Hello").with_size(200),
        ]);
        let drafts = FolderSnapshot::mail("drafts", "Drafts").with_messages(vec![
            MessageSnapshot::new("D1", "conv", at(7), "Hel").with_size(10),
        ]);
        let deleted = FolderSnapshot::mail("deleted", "Deleted Items");
        StoreSnapshot::single_account("me", vec![inbox, sent, drafts, deleted])
    }

    #[test]
    fn test_search_finds_ghosts_and_reply_chain() {
        let store = SnapshotStore::new(mailbox());
        let outcome = search(&store, &SearchParams::new("me"), &RunContext::silent()).unwrap();

        let ids: Vec<_> = outcome
            .candidates
            .candidates()
            .iter()
            .map(|c| c.message_id.as_str())
            .collect();
        assert_eq!(ids, vec!["G1", "A", "B"]);
        assert_eq!(outcome.candidates.get("G1").unwrap().reason, CandidateReason::Ghost);
        assert_eq!(
            outcome.candidates.get("B").unwrap().superseded_by.as_ref().unwrap().message_id,
            "C"
        );
        assert_eq!(outcome.total_messages, 5);
        assert_eq!(outcome.folders_scanned, 4);
        assert_eq!(outcome.store_id, "store-1");
        assert_eq!(outcome.deleted_folder.as_deref(), Some("Deleted Items"));
        assert_eq!(outcome.candidates.aggregates().selected_bytes, 340);
    }

    #[test]
    fn test_default_folder_exclusion_can_be_disabled() {
        let store = SnapshotStore::new(mailbox());
        let mut params = SearchParams::new("me");
        params.exclude_default_folders = false;

        let outcome = search(&store, &params, &RunContext::silent()).unwrap();
        assert_eq!(outcome.total_messages, 6);
        let d1 = outcome.candidates.get("D1").unwrap();
        assert_eq!(d1.superseded_by.as_ref().unwrap().message_id, "A");
    }

    #[test]
    fn test_user_exclusions() {
        let store = SnapshotStore::new(mailbox());
        let params = SearchParams::new("me").exclude("Sent Items");

        let outcome = search(&store, &params, &RunContext::silent()).unwrap();
        let a = outcome.candidates.get("A").unwrap();
        assert_eq!(a.superseded_by.as_ref().unwrap().message_id, "C");
        assert!(outcome.candidates.get("B").is_none());
    }

    #[test]
    fn test_search_reports_steps_in_order() {
        let store = SnapshotStore::new(mailbox());
        let sink = Arc::new(RecordingProgress::default());
        let ctx = RunContext::new(CancelToken::new(), sink.clone());

        search(&store, &SearchParams::new("me"), &ctx).unwrap();

        let steps = sink.steps.lock().unwrap();
        let labels: Vec<_> = steps.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(labels, vec![COUNTING_STEP, READ_STEP, COMPARE_STEP]);
        assert_eq!(steps[1].1, 5);
        assert_eq!(steps[2].1, 1);
    }

    #[test]
    fn test_search_survives_dropped_connection() {
        let store =
            SnapshotStore::with_simulation(mailbox(), StoreSimulationConfig::disconnect_after(12));
        let outcome = search(&store, &SearchParams::new("me"), &RunContext::silent()).unwrap();
        assert_eq!(outcome.candidates.len(), 3);
    }

    #[test]
    fn test_search_fails_on_unreadable_message() {
        let store = SnapshotStore::with_simulation(
            mailbox(),
            StoreSimulationConfig::default().with_message_read_errors(vec!["C".to_string()]),
        );
        let result = search(&store, &SearchParams::new("me"), &RunContext::silent());
        assert!(matches!(result, Err(DedupError::MessageRead { .. })));
    }

    #[test]
    fn test_cancelled_search() {
        let store = SnapshotStore::new(mailbox());
        let token = CancelToken::new();
        token.cancel();
        let ctx = RunContext::new(token, Arc::new(RecordingProgress::default()));

        let result = search(&store, &SearchParams::new("me"), &ctx);
        assert_eq!(result, Err(DedupError::Aborted));
    }

    #[test]
    fn test_unknown_account() {
        let store = SnapshotStore::new(mailbox());
        let result = search(&store, &SearchParams::new("other"), &RunContext::silent());
        assert!(matches!(result, Err(DedupError::AccountNotFound(_))));
    }

    #[test]
    fn test_delete_then_search_again_purges_deleted_items() {
        let store = SnapshotStore::new(mailbox());
        let params = SearchParams::new("me");
        let mut outcome = search(&store, &params, &RunContext::silent()).unwrap();

        let rows = outcome.candidates.selected_snapshot();
        let report = delete_selected(&store, &outcome.store_id, &rows, &RunContext::silent());
        assert!(report.is_complete());
        assert_eq!(outcome.candidates.remove_confirmed_deletions(&report), 3);
        assert!(outcome.candidates.is_empty());
        assert_eq!(store.folder_of("A").as_deref(), Some("Deleted Items"));
        assert_eq!(store.folder_of("G1").as_deref(), Some("Deleted Items"));

        let second = search(&store, &params, &RunContext::silent()).unwrap();
        let ids: Vec<_> = second
            .candidates
            .candidates()
            .iter()
            .map(|c| c.message_id.as_str())
            .collect();
        assert_eq!(ids, vec!["G1", "A", "B"]);

        let rows = second.candidates.selected_snapshot();
        delete_selected(&store, &second.store_id, &rows, &RunContext::silent());
        assert!(!store.contains_message("A"));
        assert!(!store.contains_message("B"));
        assert!(store.contains_message("C"));
    }

    #[test]
    fn test_delete_collects_failures() {
        let store = SnapshotStore::with_simulation(
            mailbox(),
            StoreSimulationConfig::default().with_failing_deletes(vec!["A".to_string()]),
        );
        let mut outcome = search(&store, &SearchParams::new("me"), &RunContext::silent()).unwrap();
        let rows = outcome.candidates.selected_snapshot();

        let report = delete_selected(&store, &outcome.store_id, &rows, &RunContext::silent());
        assert_eq!(report.succeeded, vec!["G1".to_string(), "B".to_string()]);
        assert_eq!(report.failed.len(), 1);

        outcome.candidates.remove_confirmed_deletions(&report);
        assert_eq!(outcome.candidates.len(), 1);
        assert!(!outcome.candidates.get("A").unwrap().included);
        assert!(matches!(
            report.into_result(),
            Err(DedupError::Deletion { .. })
        ));
    }

    #[test]
    fn test_cancelled_delete_stops_early() {
        let store = SnapshotStore::new(mailbox());
        let outcome = search(&store, &SearchParams::new("me"), &RunContext::silent()).unwrap();
        let token = CancelToken::new();
        token.cancel();
        let ctx = RunContext::new(token, Arc::new(RecordingProgress::default()));

        let report = delete_selected(
            &store,
            &outcome.store_id,
            &outcome.candidates.selected_snapshot(),
            &ctx,
        );
        assert!(report.succeeded.is_empty());
        assert!(report.failed.is_empty());
        assert!(store.contains_message("A"));
    }
}
