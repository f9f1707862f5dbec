//! Mail Dedup Library
//!
//! Finds redundant messages in a mailbox: messages whose body and
//! attachments are wholly contained in a newer message of the same
//! conversation (the reply quotes them), and read messages that have no
//! sender (undelivered or recalled mail). The user reviews the candidates
//! and deletes the ones they select.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - [`core`] - Configuration, error types, cancellation and progress context
//! - [`store`] - The mail store interface, reconnect handling and the JSON
//!   snapshot store
//! - [`dedup`] - Folder enumeration, message indexing, conversation
//!   comparison, the candidate set and table export
//! - [`ui`] - Background controller and event system for frontends
//! - [`cli`] - Command-line interface (only used by the binary)
//! - [`testdb`] - Scenario library, mailbox generator and test runner
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use mail_dedup::core::config::Config;
//! use mail_dedup::core::context::RunContext;
//! use mail_dedup::dedup::{delete_selected, search, SearchParams};
//! use mail_dedup::store::SnapshotStore;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load_default()?;
//!     let store = SnapshotStore::open(&config.store.path)?;
//!
//!     let params = SearchParams::from_config("user@example.com", &config.search);
//!     let ctx = RunContext::silent();
//!     let outcome = search(&store, &params, &ctx)?;
//!     println!("{}", outcome.summary_line());
//!
//!     let rows = outcome.candidates.selected_snapshot();
//!     let report = delete_selected(&store, &outcome.store_id, &rows, &ctx);
//!     println!("{}", report.outcome_message());
//!     Ok(())
//! }
//! ```
//!
//! # Testing Without a Mail Store
//!
//! ```rust,no_run
//! use mail_dedup::testdb::TestRunner;
//!
//! let summary = TestRunner::new().run_quick();
//! println!("Passed: {}/{}", summary.passed, summary.total);
//!
//! mail_dedup::testdb::print_available_scenarios(None);
//! ```

pub mod cli;
pub mod core;
pub mod dedup;
pub mod store;
pub mod testdb;
pub mod ui;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
