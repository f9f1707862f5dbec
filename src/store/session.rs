//! Reconnect-and-retry wrapper around a mail store
//!
//! Store connections drop. Every store call made by the pipeline goes
//! through `StoreSession::call`, which reconnects and retries the call once
//! when it fails with `TransientStore`. A second failure is returned as is.

use crate::core::error::Result;
use crate::store::traits::MailStoreTrait;
use log::{info, warn};

/// Borrowed store plus the retry policy
pub struct StoreSession<'a, S: MailStoreTrait + ?Sized> {
    store: &'a S,
}

impl<'a, S: MailStoreTrait + ?Sized> StoreSession<'a, S> {
    /// Wrap a store
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// The wrapped store
    pub fn store(&self) -> &'a S {
        self.store
    }

    /// Run a store call, reconnecting and retrying once on a transient failure
    pub fn call<T, F>(&self, op: F) -> Result<T>
    where
        F: Fn(&S) -> Result<T>,
    {
        match op(self.store) {
            Err(err) if err.is_transient() => {
                warn!("{}; reconnecting and retrying", err);
                self.store.reconnect()?;
                op(self.store)
            }
            other => other,
        }
    }

    /// Probe the connection and reconnect when the probe reports a drop
    pub fn ensure_connected(&self, account: &str) -> Result<()> {
        match self.store.probe(account) {
            Err(err) if err.is_transient() => {
                info!("Mail store connection lost, reconnecting");
                self.store.reconnect()?;
                self.store.probe(account)
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::DedupError;
    use crate::store::traits::{AttachmentRef, DefaultFolderKind, FolderHandle, MessageHeader};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store whose `list_accounts` and `probe` fail a fixed number of times
    struct FlakyStore {
        failures_left: AtomicUsize,
        reconnects: AtomicUsize,
        reconnect_ok: bool,
    }

    impl FlakyStore {
        fn new(failures: usize, reconnect_ok: bool) -> Self {
            Self {
                failures_left: AtomicUsize::new(failures),
                reconnects: AtomicUsize::new(0),
                reconnect_ok,
            }
        }

        fn fail_once(&self) -> Result<()> {
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(DedupError::TransientStore("dropped".to_string()));
            }
            Ok(())
        }

        fn reconnect_count(&self) -> usize {
            self.reconnects.load(Ordering::SeqCst)
        }
    }

    impl MailStoreTrait for FlakyStore {
        fn list_accounts(&self) -> Result<Vec<String>> {
            self.fail_once()?;
            Ok(vec!["me".to_string()])
        }

        fn root_folder(&self, account: &str) -> Result<FolderHandle> {
            Err(DedupError::AccountNotFound(account.to_string()))
        }

        fn subfolders(&self, _folder_id: &str) -> Result<Vec<FolderHandle>> {
            Ok(Vec::new())
        }

        fn default_folder_name(
            &self,
            _account: &str,
            _kind: DefaultFolderKind,
        ) -> Result<Option<String>> {
            Ok(None)
        }

        fn message_ids(&self, _folder_id: &str) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        fn message(&self, message_id: &str) -> Result<MessageHeader> {
            Err(DedupError::Store(message_id.to_string()))
        }

        fn message_body(&self, _message_id: &str) -> Result<String> {
            Ok(String::new())
        }

        fn attachments(&self, _message_id: &str) -> Result<Vec<AttachmentRef>> {
            Ok(Vec::new())
        }

        fn attachment_file_name(&self, _message_id: &str, _index: usize) -> Result<Option<String>> {
            Ok(None)
        }

        fn delete_message(&self, _store_id: &str, _message_id: &str) -> Result<()> {
            Ok(())
        }

        fn probe(&self, _account: &str) -> Result<()> {
            self.fail_once()
        }

        fn reconnect(&self) -> Result<()> {
            self.reconnects.fetch_add(1, Ordering::SeqCst);
            if self.reconnect_ok {
                Ok(())
            } else {
                Err(DedupError::Store("server unreachable".to_string()))
            }
        }
    }

    #[test]
    fn test_call_retries_once_after_reconnect() {
        let store = FlakyStore::new(1, true);
        let session = StoreSession::new(&store);

        let accounts = session.call(|s| s.list_accounts()).unwrap();
        assert_eq!(accounts, vec!["me".to_string()]);
        assert_eq!(store.reconnect_count(), 1);
    }

    #[test]
    fn test_call_surfaces_second_transient_failure() {
        let store = FlakyStore::new(2, true);
        let session = StoreSession::new(&store);

        let result = session.call(|s| s.list_accounts());
        assert!(matches!(result, Err(DedupError::TransientStore(_))));
        assert_eq!(store.reconnect_count(), 1);
    }

    #[test]
    fn test_call_surfaces_reconnect_failure() {
        let store = FlakyStore::new(1, false);
        let session = StoreSession::new(&store);

        let result = session.call(|s| s.list_accounts());
        assert!(matches!(result, Err(DedupError::Store(_))));
    }

    #[test]
    fn test_non_transient_errors_are_not_retried() {
        let store = FlakyStore::new(0, true);
        let session = StoreSession::new(&store);

        let result = session.call(|s| s.message("m1"));
        assert!(matches!(result, Err(DedupError::Store(_))));
        assert_eq!(store.reconnect_count(), 0);
    }

    #[test]
    fn test_ensure_connected_reconnects_on_dropped_probe() {
        let store = FlakyStore::new(1, true);
        let session = StoreSession::new(&store);

        session.ensure_connected("me").unwrap();
        assert_eq!(store.reconnect_count(), 1);
    }
}
