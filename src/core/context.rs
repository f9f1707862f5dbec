//! Run context shared by the enumerator, indexer and comparator
//!
//! A run context bundles the cancellation token and the progress sink of
//! a single search or delete task. It is passed explicitly into every
//! stage instead of living on some shared instance.

use crate::core::error::{DedupError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag
///
/// Clones share the same flag, so the consumer keeps one clone and the
/// background task polls another.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a new, unset token
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing flag (e.g. one set by a Ctrl+C handler)
    pub fn from_flag(flag: Arc<AtomicBool>) -> Self {
        Self { flag }
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Clear a previous request before a new task starts
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Return `Err(Aborted)` if cancellation was requested
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(DedupError::Aborted)
        } else {
            Ok(())
        }
    }

    /// Access the underlying flag
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}

/// Receiver of step and progress notifications
///
/// Implementations must be cheap: `advance` is called once per message
/// read and once per conversation compared.
pub trait ProgressSink: Send + Sync {
    /// A new step begins; `total` is the number of units it will report
    fn begin_step(&self, label: &str, total: usize);

    /// Absolute position within the current step
    fn advance(&self, position: usize);
}

/// Progress sink that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn begin_step(&self, _label: &str, _total: usize) {}

    fn advance(&self, _position: usize) {}
}

/// Explicit context for one task run
#[derive(Clone)]
pub struct RunContext {
    cancel: CancelToken,
    progress: Arc<dyn ProgressSink>,
}

impl RunContext {
    /// Create a context from a token and a sink
    pub fn new(cancel: CancelToken, progress: Arc<dyn ProgressSink>) -> Self {
        Self { cancel, progress }
    }

    /// Context with no progress reporting and a fresh token
    pub fn silent() -> Self {
        Self::new(CancelToken::new(), Arc::new(NullProgress))
    }

    /// Cancellation token of this run
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Return `Err(Aborted)` if the run was cancelled
    pub fn check_cancelled(&self) -> Result<()> {
        self.cancel.check()
    }

    /// Announce a new step
    pub fn begin_step(&self, label: &str, total: usize) {
        self.progress.begin_step(label, total);
    }

    /// Report a position in the current step
    pub fn advance(&self, position: usize) {
        self.progress.advance(position);
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Sink that records everything it receives
    #[derive(Default)]
    pub(crate) struct RecordingProgress {
        pub steps: Mutex<Vec<(String, usize)>>,
        pub positions: Mutex<Vec<usize>>,
    }

    impl ProgressSink for RecordingProgress {
        fn begin_step(&self, label: &str, total: usize) {
            self.steps.lock().unwrap().push((label.to_string(), total));
        }

        fn advance(&self, position: usize) {
            self.positions.lock().unwrap().push(position);
        }
    }

    #[test]
    fn test_cancel_token_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(token.check().is_ok());

        clone.cancel();
        assert!(token.is_cancelled());
        assert_eq!(token.check(), Err(DedupError::Aborted));

        token.reset();
        assert!(!clone.is_cancelled());
    }

    #[test]
    fn test_context_forwards_progress() {
        let sink = Arc::new(RecordingProgress::default());
        let ctx = RunContext::new(CancelToken::new(), sink.clone());

        ctx.begin_step("Reading", 3);
        ctx.advance(1);
        ctx.advance(2);

        assert_eq!(
            sink.steps.lock().unwrap().as_slice(),
            &[("Reading".to_string(), 3)]
        );
        assert_eq!(sink.positions.lock().unwrap().as_slice(), &[1, 2]);
    }
}
