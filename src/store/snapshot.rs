//! Mailbox snapshot store
//!
//! `SnapshotStore` implements `MailStoreTrait` over a JSON mailbox snapshot.
//! The CLI scans snapshot files with it, and the tests and scenario runner
//! build snapshots in memory. Failures (dropped connections, unreadable
//! messages and attachments, failing deletions) are injected through
//! `StoreSimulationConfig`.
//!
//! Internally the folder tree is flattened into maps keyed by folder and
//! message id, with a children index per folder.

use crate::core::error::{DedupError, Result};
use crate::store::traits::{
    AttachmentKind, AttachmentRef, DefaultFolderKind, FolderHandle, MailStoreTrait,
    MessageClass, MessageHeader, StoreSimulationConfig,
};
use chrono::NaiveDateTime;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

// ============================================================================
// Snapshot file format
// ============================================================================

/// A whole mailbox: one entry per account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub accounts: Vec<AccountSnapshot>,
}

/// One account and its folder tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub name: String,
    pub store_id: String,
    pub root: FolderSnapshot,
    /// Display names of the well-known folders
    #[serde(default)]
    pub default_folders: BTreeMap<DefaultFolderKind, String>,
}

/// A folder with its messages and subfolders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderSnapshot {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub message_class: MessageClass,
    #[serde(default)]
    pub folders: Vec<FolderSnapshot>,
    #[serde(default)]
    pub messages: Vec<MessageSnapshot>,
}

/// A message with its body and attachments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSnapshot {
    pub id: String,
    pub conversation_id: String,
    pub created: NaiveDateTime,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub conversation_topic: String,
    #[serde(default)]
    pub unread: bool,
    #[serde(default)]
    pub sender_name: Option<String>,
    #[serde(default)]
    pub sender_address: Option<String>,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub attachments: Vec<AttachmentSnapshot>,
}

/// An attachment entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentSnapshot {
    #[serde(default)]
    pub kind: AttachmentKind,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub display_name: String,
    /// Reading this attachment fails
    #[serde(default)]
    pub unreadable: bool,
}

impl StoreSnapshot {
    /// Snapshot with one account whose root holds `folders`
    ///
    /// The account gets the usual default folder names ("Deleted Items",
    /// "Drafts", ...); folders with those names are not created.
    pub fn single_account(account: &str, folders: Vec<FolderSnapshot>) -> Self {
        let root = FolderSnapshot::mail("root", account).with_folders(folders);
        Self {
            accounts: vec![AccountSnapshot::new(account, "store-1", root).with_standard_folders()],
        }
    }

    /// Load a snapshot from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            DedupError::Io(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            DedupError::Store(format!("Invalid mailbox snapshot '{}': {}", path.display(), e))
        })
    }

    /// Write the snapshot to a JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| DedupError::Store(format!("Failed to serialize snapshot: {}", e)))?;
        fs::write(path, content).map_err(|e| {
            DedupError::Io(format!("Failed to write '{}': {}", path.display(), e))
        })
    }

    /// Total number of messages over all accounts
    pub fn message_count(&self) -> usize {
        self.accounts.iter().map(|a| a.root.message_count()).sum()
    }
}

impl AccountSnapshot {
    /// Create an account without default folder names
    pub fn new(name: &str, store_id: &str, root: FolderSnapshot) -> Self {
        Self {
            name: name.to_string(),
            store_id: store_id.to_string(),
            root,
            default_folders: BTreeMap::new(),
        }
    }

    /// Name a well-known folder
    pub fn with_default_folder(mut self, kind: DefaultFolderKind, name: &str) -> Self {
        self.default_folders.insert(kind, name.to_string());
        self
    }

    /// Name every well-known folder with its usual English name
    pub fn with_standard_folders(self) -> Self {
        self.with_default_folder(DefaultFolderKind::SyncIssues, "Sync Issues")
            .with_default_folder(DefaultFolderKind::Contacts, "Contacts")
            .with_default_folder(DefaultFolderKind::Drafts, "Drafts")
            .with_default_folder(DefaultFolderKind::Journal, "Journal")
            .with_default_folder(DefaultFolderKind::RssFeeds, "RSS Feeds")
            .with_default_folder(DefaultFolderKind::DeletedItems, "Deleted Items")
    }
}

impl FolderSnapshot {
    /// Create an empty mail folder
    pub fn mail(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            message_class: MessageClass::Mail,
            folders: Vec::new(),
            messages: Vec::new(),
        }
    }

    /// Create an empty folder of another class
    pub fn of_class(id: &str, name: &str, message_class: MessageClass) -> Self {
        Self {
            message_class,
            ..Self::mail(id, name)
        }
    }

    /// Replace the subfolders
    pub fn with_folders(mut self, folders: Vec<FolderSnapshot>) -> Self {
        self.folders = folders;
        self
    }

    /// Replace the messages
    pub fn with_messages(mut self, messages: Vec<MessageSnapshot>) -> Self {
        self.messages = messages;
        self
    }

    /// Number of messages in this folder and all subfolders
    pub fn message_count(&self) -> usize {
        self.messages.len()
            + self
                .folders
                .iter()
                .map(FolderSnapshot::message_count)
                .sum::<usize>()
    }
}

impl MessageSnapshot {
    /// Create a read message from "Sender" with the given body
    pub fn new(id: &str, conversation_id: &str, created: NaiveDateTime, body: &str) -> Self {
        Self {
            id: id.to_string(),
            conversation_id: conversation_id.to_string(),
            created,
            subject: conversation_id.to_string(),
            conversation_topic: conversation_id.to_string(),
            unread: false,
            sender_name: Some("Sender".to_string()),
            sender_address: Some("sender@example.com".to_string()),
            size: body.len() as u64,
            body: body.to_string(),
            attachments: Vec::new(),
        }
    }

    /// Turn into an undelivered/recalled message: no sender, no body
    pub fn ghost(mut self) -> Self {
        self.sender_name = None;
        self.sender_address = None;
        self.body.clear();
        self
    }

    /// Mark as unread
    pub fn unread(mut self) -> Self {
        self.unread = true;
        self
    }

    /// Set subject and conversation topic
    pub fn with_subject(mut self, subject: &str) -> Self {
        self.subject = subject.to_string();
        self.conversation_topic = subject.to_string();
        self
    }

    /// Set the sender
    pub fn with_sender(mut self, name: &str, address: &str) -> Self {
        self.sender_name = Some(name.to_string());
        self.sender_address = Some(address.to_string());
        self
    }

    /// Set the size in bytes
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    /// Append an attachment
    pub fn with_attachment(mut self, attachment: AttachmentSnapshot) -> Self {
        self.attachments.push(attachment);
        self
    }
}

impl AttachmentSnapshot {
    /// A regular file attachment
    pub fn file(name: &str) -> Self {
        Self {
            kind: AttachmentKind::File,
            file_name: Some(name.to_string()),
            display_name: name.to_string(),
            unreadable: false,
        }
    }

    /// An embedded object known only by its display name
    pub fn embedded(display_name: &str) -> Self {
        Self {
            kind: AttachmentKind::EmbeddedObject,
            file_name: None,
            display_name: display_name.to_string(),
            unreadable: false,
        }
    }

    /// Make reading this attachment fail
    pub fn unreadable(mut self) -> Self {
        self.unreadable = true;
        self
    }
}

// ============================================================================
// Store implementation
// ============================================================================

#[derive(Debug, Clone)]
struct AccountEntry {
    name: String,
    store_id: String,
    root_id: String,
    default_folders: BTreeMap<DefaultFolderKind, String>,
    deleted_items_id: Option<String>,
}

#[derive(Debug, Clone)]
struct FolderNode {
    id: String,
    name: String,
    store_id: String,
    message_class: MessageClass,
    children: Vec<String>,
    messages: Vec<String>,
}

#[derive(Debug, Clone)]
struct StoredMessage {
    folder_id: String,
    message: MessageSnapshot,
}

#[derive(Debug)]
struct Inner {
    accounts: Vec<AccountEntry>,
    folders: HashMap<String, FolderNode>,
    messages: HashMap<String, StoredMessage>,
    calls: usize,
    connected: bool,
    dropped_once: bool,
    dirty: bool,
}

/// Mail store backed by a mailbox snapshot
#[derive(Debug)]
pub struct SnapshotStore {
    inner: Mutex<Inner>,
    simulation: StoreSimulationConfig,
    path: Option<PathBuf>,
}

impl SnapshotStore {
    /// Create a store over an in-memory snapshot
    pub fn new(snapshot: StoreSnapshot) -> Self {
        Self::with_simulation(snapshot, StoreSimulationConfig::default())
    }

    /// Create a store with simulated failures
    pub fn with_simulation(snapshot: StoreSnapshot, simulation: StoreSimulationConfig) -> Self {
        Self {
            inner: Mutex::new(Inner::from_snapshot(snapshot)),
            simulation,
            path: None,
        }
    }

    /// Open a snapshot file; `flush` writes changes back to it
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let snapshot = StoreSnapshot::load(path)?;
        debug!(
            "Loaded mailbox snapshot '{}' ({} messages)",
            path.display(),
            snapshot.message_count()
        );
        let mut store = Self::new(snapshot);
        store.path = Some(path.to_path_buf());
        Ok(store)
    }

    /// Current contents as a snapshot
    pub fn snapshot(&self) -> StoreSnapshot {
        self.lock().to_snapshot()
    }

    /// Write the current contents to `path`
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.snapshot().save(path)
    }

    /// Whether a message still exists anywhere in the store
    pub fn contains_message(&self, message_id: &str) -> bool {
        self.lock().messages.contains_key(message_id)
    }

    /// Name of the folder holding a message
    pub fn folder_of(&self, message_id: &str) -> Option<String> {
        let inner = self.lock();
        let stored = inner.messages.get(message_id)?;
        inner.folders.get(&stored.folder_id).map(|f| f.name.clone())
    }

    /// Number of messages left in the store
    pub fn message_count(&self) -> usize {
        self.lock().messages.len()
    }

    /// Number of store calls made so far
    pub fn call_count(&self) -> usize {
        self.lock().calls
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned lock only means a test thread panicked mid-call.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Count the call and fail if the connection is (or just went) down
    fn connect(&self) -> Result<MutexGuard<'_, Inner>> {
        let mut inner = self.lock();
        inner.calls += 1;

        if let Some(limit) = self.simulation.disconnect_after_calls {
            if !inner.dropped_once && inner.calls > limit {
                inner.dropped_once = true;
                inner.connected = false;
            }
        }

        if !inner.connected {
            return Err(DedupError::TransientStore(
                "the mail store is not responding".to_string(),
            ));
        }
        Ok(inner)
    }
}

impl Inner {
    fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let mut inner = Self {
            accounts: Vec::new(),
            folders: HashMap::new(),
            messages: HashMap::new(),
            calls: 0,
            connected: true,
            dropped_once: false,
            dirty: false,
        };

        for account in snapshot.accounts {
            let root_id = account.root.id.clone();
            inner.add_folder(account.root, &account.store_id);

            let deleted_items_id = account
                .default_folders
                .get(&DefaultFolderKind::DeletedItems)
                .and_then(|name| inner.find_folder_by_name(&account.store_id, name));

            inner.accounts.push(AccountEntry {
                name: account.name,
                store_id: account.store_id,
                root_id,
                default_folders: account.default_folders,
                deleted_items_id,
            });
        }

        inner
    }

    fn add_folder(&mut self, folder: FolderSnapshot, store_id: &str) {
        let mut node = FolderNode {
            id: folder.id.clone(),
            name: folder.name,
            store_id: store_id.to_string(),
            message_class: folder.message_class,
            children: Vec::with_capacity(folder.folders.len()),
            messages: Vec::with_capacity(folder.messages.len()),
        };

        for message in folder.messages {
            node.messages.push(message.id.clone());
            self.messages.insert(
                message.id.clone(),
                StoredMessage {
                    folder_id: folder.id.clone(),
                    message,
                },
            );
        }

        for child in folder.folders {
            node.children.push(child.id.clone());
            self.add_folder(child, store_id);
        }

        self.folders.insert(folder.id, node);
    }

    fn find_folder_by_name(&self, store_id: &str, name: &str) -> Option<String> {
        self.folders
            .values()
            .find(|f| f.store_id == store_id && f.name == name)
            .map(|f| f.id.clone())
    }

    fn account(&self, name: &str) -> Result<&AccountEntry> {
        self.accounts
            .iter()
            .find(|a| a.name == name)
            .ok_or_else(|| DedupError::AccountNotFound(name.to_string()))
    }

    fn folder(&self, folder_id: &str) -> Result<&FolderNode> {
        self.folders
            .get(folder_id)
            .ok_or_else(|| DedupError::FolderNotFound(folder_id.to_string()))
    }

    fn message(&self, message_id: &str) -> Result<&MessageSnapshot> {
        self.messages
            .get(message_id)
            .map(|stored| &stored.message)
            .ok_or_else(|| DedupError::MessageRead {
                message_id: message_id.to_string(),
                reason: "message not found".to_string(),
            })
    }

    fn handle(&self, node: &FolderNode) -> FolderHandle {
        FolderHandle {
            id: node.id.clone(),
            name: node.name.clone(),
            store_id: node.store_id.clone(),
            item_count: node.messages.len(),
            message_class: node.message_class,
        }
    }

    fn to_snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            accounts: self
                .accounts
                .iter()
                .filter_map(|account| {
                    Some(AccountSnapshot {
                        name: account.name.clone(),
                        store_id: account.store_id.clone(),
                        root: self.folder_snapshot(&account.root_id)?,
                        default_folders: account.default_folders.clone(),
                    })
                })
                .collect(),
        }
    }

    fn folder_snapshot(&self, folder_id: &str) -> Option<FolderSnapshot> {
        let node = self.folders.get(folder_id)?;
        Some(FolderSnapshot {
            id: node.id.clone(),
            name: node.name.clone(),
            message_class: node.message_class,
            folders: node
                .children
                .iter()
                .filter_map(|child| self.folder_snapshot(child))
                .collect(),
            messages: node
                .messages
                .iter()
                .filter_map(|id| self.messages.get(id).map(|m| m.message.clone()))
                .collect(),
        })
    }
}

impl MailStoreTrait for SnapshotStore {
    fn list_accounts(&self) -> Result<Vec<String>> {
        let inner = self.connect()?;
        Ok(inner.accounts.iter().map(|a| a.name.clone()).collect())
    }

    fn root_folder(&self, account: &str) -> Result<FolderHandle> {
        let inner = self.connect()?;
        let root_id = inner.account(account)?.root_id.clone();
        let node = inner.folder(&root_id)?;
        Ok(inner.handle(node))
    }

    fn subfolders(&self, folder_id: &str) -> Result<Vec<FolderHandle>> {
        let inner = self.connect()?;
        let node = inner.folder(folder_id)?;
        Ok(node
            .children
            .iter()
            .filter_map(|child| inner.folders.get(child))
            .map(|child| inner.handle(child))
            .collect())
    }

    fn default_folder_name(
        &self,
        account: &str,
        kind: DefaultFolderKind,
    ) -> Result<Option<String>> {
        let inner = self.connect()?;
        Ok(inner.account(account)?.default_folders.get(&kind).cloned())
    }

    fn message_ids(&self, folder_id: &str) -> Result<Vec<String>> {
        let inner = self.connect()?;
        Ok(inner.folder(folder_id)?.messages.clone())
    }

    fn message(&self, message_id: &str) -> Result<MessageHeader> {
        let inner = self.connect()?;
        if self.simulation.message_read_errors.iter().any(|id| id == message_id) {
            return Err(DedupError::MessageRead {
                message_id: message_id.to_string(),
                reason: "property not available".to_string(),
            });
        }

        let m = inner.message(message_id)?;
        Ok(MessageHeader {
            id: m.id.clone(),
            conversation_id: m.conversation_id.clone(),
            created: m.created,
            subject: m.subject.clone(),
            conversation_topic: m.conversation_topic.clone(),
            unread: m.unread,
            sender_name: m.sender_name.clone(),
            sender_address: m.sender_address.clone(),
            size: m.size,
        })
    }

    fn message_body(&self, message_id: &str) -> Result<String> {
        let inner = self.connect()?;
        Ok(inner.message(message_id)?.body.clone())
    }

    fn attachments(&self, message_id: &str) -> Result<Vec<AttachmentRef>> {
        let inner = self.connect()?;
        Ok(inner
            .message(message_id)?
            .attachments
            .iter()
            .enumerate()
            .map(|(index, a)| AttachmentRef {
                index,
                kind: a.kind,
                display_name: a.display_name.clone(),
            })
            .collect())
    }

    fn attachment_file_name(&self, message_id: &str, index: usize) -> Result<Option<String>> {
        let inner = self.connect()?;
        let attachment = inner
            .message(message_id)?
            .attachments
            .get(index)
            .ok_or_else(|| DedupError::AttachmentRead {
                message_id: message_id.to_string(),
                reason: format!("no attachment at index {}", index),
            })?;

        let simulated = self
            .simulation
            .attachment_read_errors
            .iter()
            .any(|id| id == message_id);
        if attachment.unreadable || simulated {
            return Err(DedupError::AttachmentRead {
                message_id: message_id.to_string(),
                reason: format!("cannot open attachment '{}'", attachment.display_name),
            });
        }

        Ok(attachment.file_name.clone())
    }

    fn delete_message(&self, store_id: &str, message_id: &str) -> Result<()> {
        let mut inner = self.connect()?;
        if self.simulation.failing_deletes.iter().any(|id| id == message_id) {
            return Err(DedupError::Deletion {
                message_id: message_id.to_string(),
                reason: "the item is locked".to_string(),
            });
        }

        let deleted_items_id = inner
            .accounts
            .iter()
            .find(|a| a.store_id == store_id)
            .ok_or_else(|| DedupError::Store(format!("Unknown store: {}", store_id)))?
            .deleted_items_id
            .clone();

        let source_id = match inner.messages.get(message_id) {
            Some(stored) => stored.folder_id.clone(),
            None => {
                return Err(DedupError::Deletion {
                    message_id: message_id.to_string(),
                    reason: "message not found".to_string(),
                })
            }
        };

        if let Some(source) = inner.folders.get_mut(&source_id) {
            source.messages.retain(|id| id != message_id);
        }

        match deleted_items_id {
            Some(target_id) if target_id != source_id => {
                if let Some(target) = inner.folders.get_mut(&target_id) {
                    target.messages.push(message_id.to_string());
                }
                if let Some(stored) = inner.messages.get_mut(message_id) {
                    stored.folder_id = target_id;
                }
                trace!("Moved message {} to deleted items", message_id);
            }
            _ => {
                inner.messages.remove(message_id);
                trace!("Removed message {} permanently", message_id);
            }
        }

        inner.dirty = true;
        Ok(())
    }

    fn probe(&self, account: &str) -> Result<()> {
        let inner = self.connect()?;
        inner.account(account).map(|_| ())
    }

    fn reconnect(&self) -> Result<()> {
        if self.simulation.reconnect_fails {
            return Err(DedupError::Store(
                "could not reconnect to the mail store".to_string(),
            ));
        }
        let mut inner = self.lock();
        inner.connected = true;
        debug!("Reconnected to mail store");
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        let mut inner = self.lock();
        if let (Some(path), true) = (&self.path, inner.dirty) {
            inner.to_snapshot().save(path)?;
            inner.dirty = false;
            debug!("Saved mailbox snapshot to '{}'", path.display());
        }
        Ok(())
    }
}
