//! UI Support Module
//!
//! Frontend-agnostic building blocks for driving searches and deletions from
//! an interactive surface. The CLI uses them; a graphical frontend would too.
//!
//! - [`events`] - Thread-safe event types sent from the worker to the UI
//! - [`controller`] - Dedup controller owning the mail store on a worker thread
//!
//! # Threading Model
//!
//! 1. **Command Channel** - The UI sends one task at a time to the worker
//! 2. **Event Channel** - Step changes, progress and the task result come
//!    back as [`UiEvent`]s the UI can poll without blocking
//! 3. **Atomic State** - Controller state is an atomic, so status checks
//!    never wait on the worker
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use mail_dedup::dedup::SearchParams;
//! use mail_dedup::store::{SnapshotStore, StoreSnapshot};
//! use mail_dedup::ui::{DedupController, TaskEvent, UiEvent};
//! use std::time::Duration;
//!
//! let store = SnapshotStore::new(StoreSnapshot::default());
//! let controller = DedupController::new(store);
//! controller
//!     .start_search(SearchParams::new("me@example.com"))
//!     .unwrap();
//!
//! while let Some(event) = controller.recv_event_timeout(Duration::from_secs(1)) {
//!     match event {
//!         UiEvent::Progress(progress) => { /* update progress bar */ }
//!         UiEvent::Task(TaskEvent::SearchCompleted(outcome)) => {
//!             println!("{}", outcome.summary_line());
//!             break;
//!         }
//!         UiEvent::Task(_) => break,
//!         UiEvent::App(_) => {}
//!     }
//! }
//! ```

pub mod controller;
pub mod events;

pub use controller::{ControllerCommand, ControllerState, DedupController};

pub use events::{
    format_bytes, format_duration, AppEvent, LogLevel, ProgressEvent, TaskEvent, UiEvent,
};
