//! UI Events Module
//!
//! Defines thread-safe event types for communication between the
//! controller's worker thread and any frontend. These events are designed
//! to be sent through channels and consumed by any UI framework.

use std::time::Duration;

use crate::core::error::DedupError;
use crate::dedup::{DeletionReport, SearchOutcome};

// =============================================================================
// Progress Events
// =============================================================================

/// Step and progress notifications of the running task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A new step began
    StepStarted {
        /// Step label, e.g. "Step 1/2 - Read all messages"
        label: String,
        /// Units the step will report; 0 when unknown
        total: usize,
    },

    /// Absolute position within the current step
    Advanced { position: usize },
}

// =============================================================================
// Task Events
// =============================================================================

/// Terminal events of controller tasks; always the last event of a task
#[derive(Debug, Clone)]
pub enum TaskEvent {
    /// Account listing finished
    AccountsListed { accounts: Vec<String> },

    /// Account listing failed
    AccountsFailed { error: DedupError },

    /// A search finished
    SearchCompleted(Box<SearchOutcome>),

    /// A search was cancelled by the user
    SearchAborted,

    /// A search failed
    SearchFailed { error: DedupError },

    /// A delete task finished; failed rows are listed in the report
    DeleteCompleted { report: DeletionReport },
}

impl TaskEvent {
    /// Short name of the event, for logging
    pub fn name(&self) -> &'static str {
        match self {
            TaskEvent::AccountsListed { .. } => "accounts-listed",
            TaskEvent::AccountsFailed { .. } => "accounts-failed",
            TaskEvent::SearchCompleted(_) => "search-completed",
            TaskEvent::SearchAborted => "search-aborted",
            TaskEvent::SearchFailed { .. } => "search-failed",
            TaskEvent::DeleteCompleted { .. } => "delete-completed",
        }
    }
}

// =============================================================================
// Application Events
// =============================================================================

/// General application events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The controller is shutting down
    ShuttingDown,

    /// Log message for UI display
    Log {
        /// Log level
        level: LogLevel,
        /// Message
        message: String,
    },
}

/// Log levels for UI display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug information
    Debug,
    /// Informational message
    Info,
    /// Warning
    Warning,
    /// Error
    Error,
}

// =============================================================================
// Combined Event Type
// =============================================================================

/// All possible events that can be sent to the UI
#[derive(Debug, Clone)]
pub enum UiEvent {
    /// Progress of the running task
    Progress(ProgressEvent),
    /// Terminal task result
    Task(TaskEvent),
    /// Application-related event
    App(AppEvent),
}

impl UiEvent {
    /// Whether this event ends a task
    pub fn is_terminal(&self) -> bool {
        matches!(self, UiEvent::Task(_))
    }
}

impl From<ProgressEvent> for UiEvent {
    fn from(event: ProgressEvent) -> Self {
        UiEvent::Progress(event)
    }
}

impl From<TaskEvent> for UiEvent {
    fn from(event: TaskEvent) -> Self {
        UiEvent::Task(event)
    }
}

impl From<AppEvent> for UiEvent {
    fn from(event: AppEvent) -> Self {
        UiEvent::App(event)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format duration as human-readable string
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{}.{}s", secs, duration.subsec_millis() / 100)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

// =============================================================================
// Tests
// =============================================================================
