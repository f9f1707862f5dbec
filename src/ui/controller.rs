//! Dedup Controller Module
//!
//! Provides a thread-safe controller that runs account listing, searches and
//! deletions on a background worker thread. The worker owns the mail store;
//! the frontend talks to it through a command channel and reads progress and
//! results from an event channel.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, info, warn};

use crate::core::context::{CancelToken, ProgressSink, RunContext};
use crate::core::error::{DedupError, Result};
use crate::dedup::{
    delete_selected, search, DeletionCandidate, DeletionReport, FailedDeletion, SearchParams,
};
use crate::store::session::StoreSession;
use crate::store::traits::MailStoreTrait;
use crate::ui::events::{format_duration, AppEvent, LogLevel, ProgressEvent, TaskEvent, UiEvent};

// =============================================================================
// Controller State
// =============================================================================

/// Current state of the dedup controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ControllerState {
    /// Ready for a new task
    Idle = 0,
    /// Listing the store's accounts
    ListingAccounts = 1,
    /// Running a search
    Searching = 2,
    /// Deleting selected messages
    Deleting = 3,
    /// Worker thread has stopped
    ShutDown = 4,
}

impl From<u8> for ControllerState {
    fn from(value: u8) -> Self {
        match value {
            0 => ControllerState::Idle,
            1 => ControllerState::ListingAccounts,
            2 => ControllerState::Searching,
            3 => ControllerState::Deleting,
            4 => ControllerState::ShutDown,
            _ => ControllerState::Idle,
        }
    }
}

// =============================================================================
// Commands
// =============================================================================

/// Commands sent to the worker thread
#[derive(Debug)]
pub enum ControllerCommand {
    /// List the store's accounts
    ListAccounts,
    /// Search one account
    Search(SearchParams),
    /// Delete a snapshot of selected rows
    Delete {
        /// Account probed before deleting
        account: String,
        /// Store the rows live in
        store_id: String,
        rows: Vec<DeletionCandidate>,
    },
    /// Stop the worker thread
    Shutdown,
}

// =============================================================================
// Channel Progress
// =============================================================================

/// Progress sink forwarding to the event channel
struct ChannelProgress {
    events: Sender<UiEvent>,
}

impl ProgressSink for ChannelProgress {
    fn begin_step(&self, label: &str, total: usize) {
        let _ = self.events.send(
            ProgressEvent::StepStarted {
                label: label.to_string(),
                total,
            }
            .into(),
        );
    }

    fn advance(&self, position: usize) {
        let _ = self
            .events
            .send(ProgressEvent::Advanced { position }.into());
    }
}

// =============================================================================
// Dedup Controller
// =============================================================================

/// Thread-safe dedup controller
///
/// One task runs at a time; starting another while busy fails with
/// `DedupError::ControllerBusy`. Every task ends with exactly one
/// `UiEvent::Task` event, and the controller is back in `Idle` before that
/// event is sent.
pub struct DedupController {
    /// Current state
    state: Arc<AtomicU8>,
    /// Cancellation token shared with the worker
    cancel: CancelToken,
    /// Command sender
    command_tx: Sender<ControllerCommand>,
    /// Event receiver for UI
    event_rx: Receiver<UiEvent>,
    /// Event sender (for internal use)
    event_tx: Sender<UiEvent>,
    /// Worker thread handle
    worker_handle: Mutex<Option<JoinHandle<()>>>,
}

impl DedupController {
    /// Create a controller and start its worker thread
    ///
    /// The store is moved into the worker; all store calls happen there.
    pub fn new<S>(store: S) -> Self
    where
        S: MailStoreTrait + 'static,
    {
        let (command_tx, command_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();
        let state = Arc::new(AtomicU8::new(ControllerState::Idle as u8));
        let cancel = CancelToken::new();

        let worker_state = Arc::clone(&state);
        let worker_cancel = cancel.clone();
        let worker_events = event_tx.clone();
        let handle = thread::Builder::new()
            .name("dedup-worker".to_string())
            .spawn(move || {
                Self::worker(store, command_rx, worker_events, worker_state, worker_cancel)
            })
            .ok();

        if handle.is_none() {
            warn!("Failed to spawn dedup worker thread");
            state.store(ControllerState::ShutDown as u8, Ordering::SeqCst);
        }

        Self {
            state,
            cancel,
            command_tx,
            event_rx,
            event_tx,
            worker_handle: Mutex::new(handle),
        }
    }

    /// Get current state
    pub fn state(&self) -> ControllerState {
        ControllerState::from(self.state.load(Ordering::SeqCst))
    }

    /// Check if a task is running
    pub fn is_busy(&self) -> bool {
        matches!(
            self.state(),
            ControllerState::ListingAccounts
                | ControllerState::Searching
                | ControllerState::Deleting
        )
    }

    /// Token cancelling the running task; usable from signal handlers
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Try to receive the next event (non-blocking)
    pub fn try_recv_event(&self) -> Option<UiEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Receive events with timeout
    pub fn recv_event_timeout(&self, timeout: Duration) -> Option<UiEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    /// Drain all pending events
    pub fn drain_events(&self) -> Vec<UiEvent> {
        self.event_rx.try_iter().collect()
    }

    /// List the store's accounts
    pub fn list_accounts(&self) -> Result<()> {
        self.begin(ControllerState::ListingAccounts)?;
        self.send(ControllerCommand::ListAccounts)
    }

    /// Start a search
    pub fn start_search(&self, params: SearchParams) -> Result<()> {
        self.begin(ControllerState::Searching)?;
        info!("Starting search of {}", params.account);
        self.send(ControllerCommand::Search(params))
    }

    /// Start deleting a snapshot of selected rows
    pub fn start_delete(
        &self,
        account: &str,
        store_id: &str,
        rows: Vec<DeletionCandidate>,
    ) -> Result<()> {
        self.begin(ControllerState::Deleting)?;
        info!("Deleting {} messages from {}", rows.len(), account);
        self.send(ControllerCommand::Delete {
            account: account.to_string(),
            store_id: store_id.to_string(),
            rows,
        })
    }

    /// Cancel the running task
    ///
    /// Returns false when no task was running.
    pub fn cancel(&self) -> bool {
        if !self.is_busy() {
            return false;
        }
        debug!("Cancelling {:?}", self.state());
        self.cancel.cancel();
        true
    }

    /// Wait for the worker thread to exit
    pub fn wait(&self) -> Result<()> {
        let handle = match self.worker_handle.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            handle
                .join()
                .map_err(|_| DedupError::Store("Worker thread panicked".to_string()))?;
        }
        Ok(())
    }

    /// Shutdown the controller
    pub fn shutdown(&self) {
        if self.state() == ControllerState::ShutDown {
            return;
        }

        // Cancel any running task
        self.cancel();
        let _ = self.command_tx.send(ControllerCommand::Shutdown);

        // Wait for thread to finish
        let _ = self.wait();
        self.state
            .store(ControllerState::ShutDown as u8, Ordering::SeqCst);

        let _ = self.event_tx.send(AppEvent::ShuttingDown.into());
    }

    /// Claim the controller for a task
    fn begin(&self, next: ControllerState) -> Result<()> {
        self.state
            .compare_exchange(
                ControllerState::Idle as u8,
                next as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .map_err(|_| DedupError::ControllerBusy)?;
        self.cancel.reset();
        Ok(())
    }

    fn send(&self, command: ControllerCommand) -> Result<()> {
        self.command_tx.send(command).map_err(|_| {
            self.state
                .store(ControllerState::ShutDown as u8, Ordering::SeqCst);
            DedupError::Store("Worker thread is not running".to_string())
        })
    }

    /// Worker thread function; runs commands until shutdown
    fn worker<S: MailStoreTrait>(
        store: S,
        commands: Receiver<ControllerCommand>,
        events: Sender<UiEvent>,
        state: Arc<AtomicU8>,
        cancel: CancelToken,
    ) {
        let ctx = RunContext::new(
            cancel,
            Arc::new(ChannelProgress {
                events: events.clone(),
            }),
        );

        for command in commands.iter() {
            let started = Instant::now();
            let result = match command {
                ControllerCommand::ListAccounts => {
                    match StoreSession::new(&store).call(|s| s.list_accounts()) {
                        Ok(accounts) => TaskEvent::AccountsListed { accounts },
                        Err(error) => TaskEvent::AccountsFailed { error },
                    }
                }
                ControllerCommand::Search(params) => match search(&store, &params, &ctx) {
                    Ok(outcome) => {
                        notify(
                            &events,
                            LogLevel::Info,
                            format!(
                                "Searched {} messages in {} folders in {}",
                                outcome.total_messages,
                                outcome.folders_scanned,
                                format_duration(started.elapsed())
                            ),
                        );
                        TaskEvent::SearchCompleted(Box::new(outcome))
                    }
                    Err(DedupError::Aborted) => {
                        info!("Search of {} cancelled", params.account);
                        TaskEvent::SearchAborted
                    }
                    Err(error) => {
                        warn!("Search of {} failed: {}", params.account, error);
                        TaskEvent::SearchFailed { error }
                    }
                },
                ControllerCommand::Delete {
                    account,
                    store_id,
                    rows,
                } => {
                    let report = match StoreSession::new(&store).ensure_connected(&account) {
                        Ok(()) => delete_selected(&store, &store_id, &rows, &ctx),
                        Err(error) => {
                            warn!("Mail store unavailable, nothing deleted: {}", error);
                            notify(
                                &events,
                                LogLevel::Warning,
                                format!("Mail store unavailable: {}", error),
                            );
                            unattempted(&rows, &error)
                        }
                    };
                    TaskEvent::DeleteCompleted { report }
                }
                ControllerCommand::Shutdown => break,
            };

            debug!("Task finished: {}", result.name());
            state.store(ControllerState::Idle as u8, Ordering::SeqCst);
            let _ = events.send(result.into());
        }

        debug!("Dedup worker exiting");
    }
}

fn notify(events: &Sender<UiEvent>, level: LogLevel, message: String) {
    let _ = events.send(AppEvent::Log { level, message }.into());
}

/// Report listing every row as failed with the same error
fn unattempted(rows: &[DeletionCandidate], error: &DedupError) -> DeletionReport {
    DeletionReport {
        succeeded: Vec::new(),
        failed: rows
            .iter()
            .map(|row| FailedDeletion {
                message_id: row.message_id.clone(),
                error: error.clone(),
            })
            .collect(),
    }
}

impl Drop for DedupController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::{CandidateCommand, SearchOutcome, READ_STEP};
    use crate::store::snapshot::{FolderSnapshot, MessageSnapshot, SnapshotStore, StoreSnapshot};
    use crate::store::traits::{
        AttachmentRef, DefaultFolderKind, FolderHandle, MessageHeader, StoreSimulationConfig,
    };
    use chrono::{NaiveDate, NaiveDateTime};

    const ACCOUNT: &str = "me@example.com";
    const TIMEOUT: Duration = Duration::from_secs(10);

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 3)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn mailbox() -> StoreSnapshot {
        let inbox = FolderSnapshot::mail("inbox", "Inbox").with_messages(vec![
            MessageSnapshot::new("a", "c1", at(9), "first"),
            MessageSnapshot::new("b", "c1", at(10), "second\nfirst"),
            MessageSnapshot::new("g", "c2", at(11), "").ghost(),
        ]);
        StoreSnapshot::single_account(
            ACCOUNT,
            vec![inbox, FolderSnapshot::mail("deleted", "Deleted Items")],
        )
    }

    /// Collect events until the task's terminal event
    fn until_terminal(controller: &DedupController) -> (Vec<UiEvent>, TaskEvent) {
        let mut seen = Vec::new();
        loop {
            match controller.recv_event_timeout(TIMEOUT) {
                Some(UiEvent::Task(task)) => return (seen, task),
                Some(event) => seen.push(event),
                None => panic!("no terminal event within {:?}", TIMEOUT),
            }
        }
    }

    fn completed_search(controller: &DedupController) -> SearchOutcome {
        controller.start_search(SearchParams::new(ACCOUNT)).unwrap();
        match until_terminal(controller).1 {
            TaskEvent::SearchCompleted(outcome) => *outcome,
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_controller_state_conversion() {
        assert_eq!(ControllerState::from(0), ControllerState::Idle);
        assert_eq!(ControllerState::from(1), ControllerState::ListingAccounts);
        assert_eq!(ControllerState::from(2), ControllerState::Searching);
        assert_eq!(ControllerState::from(3), ControllerState::Deleting);
        assert_eq!(ControllerState::from(4), ControllerState::ShutDown);
        assert_eq!(ControllerState::from(255), ControllerState::Idle);
    }

    #[test]
    fn test_list_accounts() {
        let controller = DedupController::new(SnapshotStore::new(mailbox()));
        controller.list_accounts().unwrap();

        match until_terminal(&controller).1 {
            TaskEvent::AccountsListed { accounts } => assert_eq!(accounts, vec![ACCOUNT]),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(controller.state(), ControllerState::Idle);
    }

    #[test]
    fn test_search_reports_steps_then_result() {
        let controller = DedupController::new(SnapshotStore::new(mailbox()));
        controller.start_search(SearchParams::new(ACCOUNT)).unwrap();

        let (events, terminal) = until_terminal(&controller);
        let labels: Vec<String> = events
            .iter()
            .filter_map(|e| match e {
                UiEvent::Progress(ProgressEvent::StepStarted { label, .. }) => Some(label.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(labels[1], READ_STEP);
        assert!(events.iter().any(|e| matches!(
            e,
            UiEvent::Progress(ProgressEvent::StepStarted { total: 3, .. })
        )));

        match terminal {
            TaskEvent::SearchCompleted(outcome) => {
                let ids: Vec<&str> = outcome
                    .candidates
                    .candidates()
                    .iter()
                    .map(|c| c.message_id.as_str())
                    .collect();
                assert_eq!(ids, vec!["g", "a"]);
                assert_eq!(outcome.account, ACCOUNT);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(!controller.is_busy());
    }

    #[test]
    fn test_busy_controller_rejects_tasks() {
        let controller = DedupController::new(SnapshotStore::new(mailbox()));
        controller
            .state
            .store(ControllerState::Searching as u8, Ordering::SeqCst);

        assert_eq!(
            controller.start_search(SearchParams::new(ACCOUNT)),
            Err(DedupError::ControllerBusy)
        );
        assert_eq!(controller.list_accounts(), Err(DedupError::ControllerBusy));

        controller
            .state
            .store(ControllerState::Idle as u8, Ordering::SeqCst);
    }

    #[test]
    fn test_cancel_without_task() {
        let controller = DedupController::new(SnapshotStore::new(mailbox()));
        assert!(!controller.cancel());
        assert!(!controller.cancel_token().is_cancelled());
    }

    #[test]
    fn test_search_failure_for_unknown_account() {
        let controller = DedupController::new(SnapshotStore::new(mailbox()));
        controller
            .start_search(SearchParams::new("nobody@example.com"))
            .unwrap();

        assert!(matches!(
            until_terminal(&controller).1,
            TaskEvent::SearchFailed {
                error: DedupError::AccountNotFound(_)
            }
        ));
        // a failed task leaves the controller usable
        assert!(controller.list_accounts().is_ok());
    }

    #[test]
    fn test_search_then_delete() {
        let store = SnapshotStore::new(mailbox());
        let controller = DedupController::new(store);
        let mut outcome = completed_search(&controller);

        outcome.candidates.apply(CandidateCommand::SetInclusion {
            message_id: "g".to_string(),
            included: false,
        });
        let rows = outcome.candidates.selected_snapshot();
        controller
            .start_delete(&outcome.account, &outcome.store_id, rows)
            .unwrap();

        let report = match until_terminal(&controller).1 {
            TaskEvent::DeleteCompleted { report } => report,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(report.succeeded, vec!["a".to_string()]);
        assert_eq!(outcome.candidates.remove_confirmed_deletions(&report), 1);
        assert_eq!(outcome.candidates.len(), 1);

        // "a" moved to Deleted Items, where it is still superseded by "b"
        let again = completed_search(&controller);
        assert_eq!(again.candidates.len(), 2);
        assert_eq!(
            again.candidates.get("a").map(|c| c.folder_name.as_str()),
            Some("Deleted Items")
        );
    }

    #[test]
    fn test_delete_when_store_unreachable() {
        let store = SnapshotStore::with_simulation(
            mailbox(),
            StoreSimulationConfig::disconnect_after(0).with_failing_reconnect(),
        );
        let controller = DedupController::new(store);
        let outcome = SearchOutcome {
            account: ACCOUNT.to_string(),
            candidates: Default::default(),
            total_messages: 0,
            folders_scanned: 0,
            store_id: "store-1".to_string(),
            deleted_folder: None,
        };
        let rows = vec![DeletionCandidate::ghost(
            &crate::dedup::candidates::tests::record("a", "Inbox", 9, 10),
        )];
        controller
            .start_delete(&outcome.account, &outcome.store_id, rows)
            .unwrap();

        let (events, terminal) = until_terminal(&controller);
        assert!(events.iter().any(|e| matches!(
            e,
            UiEvent::App(AppEvent::Log {
                level: LogLevel::Warning,
                ..
            })
        )));
        match terminal {
            TaskEvent::DeleteCompleted { report } => {
                assert!(report.succeeded.is_empty());
                assert_eq!(report.failed.len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    /// Store whose probe blocks until the test releases it
    struct GatedStore {
        inner: SnapshotStore,
        gate: Receiver<()>,
    }

    impl MailStoreTrait for GatedStore {
        fn list_accounts(&self) -> Result<Vec<String>> {
            self.inner.list_accounts()
        }

        fn root_folder(&self, account: &str) -> Result<FolderHandle> {
            self.inner.root_folder(account)
        }

        fn subfolders(&self, folder_id: &str) -> Result<Vec<FolderHandle>> {
            self.inner.subfolders(folder_id)
        }

        fn default_folder_name(
            &self,
            account: &str,
            kind: DefaultFolderKind,
        ) -> Result<Option<String>> {
            self.inner.default_folder_name(account, kind)
        }

        fn message_ids(&self, folder_id: &str) -> Result<Vec<String>> {
            self.inner.message_ids(folder_id)
        }

        fn message(&self, message_id: &str) -> Result<MessageHeader> {
            self.inner.message(message_id)
        }

        fn message_body(&self, message_id: &str) -> Result<String> {
            self.inner.message_body(message_id)
        }

        fn attachments(&self, message_id: &str) -> Result<Vec<AttachmentRef>> {
            self.inner.attachments(message_id)
        }

        fn attachment_file_name(&self, message_id: &str, index: usize) -> Result<Option<String>> {
            self.inner.attachment_file_name(message_id, index)
        }

        fn delete_message(&self, store_id: &str, message_id: &str) -> Result<()> {
            self.inner.delete_message(store_id, message_id)
        }

        fn probe(&self, account: &str) -> Result<()> {
            let _ = self.gate.recv_timeout(TIMEOUT);
            self.inner.probe(account)
        }

        fn reconnect(&self) -> Result<()> {
            self.inner.reconnect()
        }
    }

    #[test]
    fn test_cancelled_search_reports_aborted() {
        let (release, gate) = unbounded();
        let controller = DedupController::new(GatedStore {
            inner: SnapshotStore::new(mailbox()),
            gate,
        });

        controller.start_search(SearchParams::new(ACCOUNT)).unwrap();
        assert!(controller.cancel());
        release.send(()).unwrap();

        assert!(matches!(
            until_terminal(&controller).1,
            TaskEvent::SearchAborted
        ));

        // the next task starts with a fresh token
        release.send(()).unwrap();
        let outcome = completed_search(&controller);
        assert_eq!(outcome.candidates.len(), 2);
    }

    #[test]
    fn test_shutdown_emits_event() {
        let controller = DedupController::new(SnapshotStore::new(mailbox()));
        controller.shutdown();
        assert_eq!(controller.state(), ControllerState::ShutDown);
        assert!(controller
            .drain_events()
            .iter()
            .any(|e| matches!(e, UiEvent::App(AppEvent::ShuttingDown))));
        assert!(controller.list_accounts().is_err());
    }
}
