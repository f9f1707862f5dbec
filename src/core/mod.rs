//! Core functionality module
//!
//! This module contains the ambient building blocks shared by every stage
//! of the deduplication pipeline.
//!
//! # Submodules
//!
//! - `config` - Configuration loading, saving, and management
//! - `context` - Cancellation token, progress sink and run context
//! - `error` - Error types and result aliases

pub mod config;
pub mod context;
pub mod error;
