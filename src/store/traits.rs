//! Mail store abstraction traits
//!
//! This module defines the interface the deduplication pipeline uses to read
//! a mailbox and to delete messages from it. Any backend (a desktop mail
//! client, an IMAP mirror, a JSON snapshot) can be plugged in by implementing
//! `MailStoreTrait`.
//!
//! # Architecture
//!
//! - `MailStoreTrait` - Lazy, handle-based access to accounts, folders and messages
//! - `FolderHandle` - Folder identity plus item count and default message class
//! - `MessageHeader` - The core fields of a message (no body, no attachments)
//! - `AttachmentRef` - One attachment entry whose name is resolved on demand
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use mail_dedup::store::traits::MailStoreTrait;
//!
//! fn print_folders<S: MailStoreTrait>(store: &S) -> mail_dedup::core::error::Result<()> {
//!     for account in store.list_accounts()? {
//!         let root = store.root_folder(&account)?;
//!         for folder in store.subfolders(&root.id)? {
//!             println!("{} / {} ({} items)", account, folder.name, folder.item_count);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

use crate::core::error::Result;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Default message class of a folder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageClass {
    /// Regular email folder
    #[default]
    Mail,
    /// Calendar items
    Calendar,
    /// Contact cards
    Contact,
    /// Tasks
    Task,
    /// Sticky notes
    Note,
    /// Journal entries
    Journal,
    /// Anything else
    Other,
}

impl MessageClass {
    /// Check if this folder holds email
    pub fn is_mail(&self) -> bool {
        matches!(self, MessageClass::Mail)
    }
}

impl Display for MessageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageClass::Mail => "mail",
            MessageClass::Calendar => "calendar",
            MessageClass::Contact => "contact",
            MessageClass::Task => "task",
            MessageClass::Note => "note",
            MessageClass::Journal => "journal",
            MessageClass::Other => "other",
        };
        write!(f, "{}", name)
    }
}

/// Well-known folders every store can name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultFolderKind {
    SyncIssues,
    Contacts,
    Drafts,
    Journal,
    RssFeeds,
    DeletedItems,
}

impl DefaultFolderKind {
    /// Folders excluded from every search when default exclusions are on
    pub const EXCLUDED_BY_DEFAULT: [DefaultFolderKind; 5] = [
        DefaultFolderKind::SyncIssues,
        DefaultFolderKind::Contacts,
        DefaultFolderKind::Drafts,
        DefaultFolderKind::Journal,
        DefaultFolderKind::RssFeeds,
    ];
}

/// A folder in the mail store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderHandle {
    /// Store-scoped folder identifier
    pub id: String,
    /// Display name of the folder
    pub name: String,
    /// Identifier of the store the folder lives in
    pub store_id: String,
    /// Number of items in the folder (not counting subfolders)
    pub item_count: usize,
    /// Default message class of the folder
    pub message_class: MessageClass,
}

/// Core fields of a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    /// Store-scoped message identifier
    pub id: String,
    /// Conversation identifier
    pub conversation_id: String,
    /// Creation time
    pub created: NaiveDateTime,
    pub subject: String,
    pub conversation_topic: String,
    pub unread: bool,
    /// Sender display name; absent for undelivered or recalled messages
    pub sender_name: Option<String>,
    pub sender_address: Option<String>,
    /// Size in bytes
    pub size: u64,
}

/// Kind of an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    /// A regular file
    #[default]
    File,
    /// An attached mail item
    Item,
    /// An embedded OLE object; unreadable ones are expected and ignored
    EmbeddedObject,
    /// A link to a file elsewhere
    Link,
}

/// One entry in a message's attachment list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRef {
    /// Position in the message's attachment list
    pub index: usize,
    pub kind: AttachmentKind,
    /// Display name, used when the file name is unavailable
    pub display_name: String,
}

/// Trait for mail store access
///
/// Implementations are moved into the controller's worker thread, so every
/// call happens on one thread at a time.
pub trait MailStoreTrait: Send {
    /// List the account names available in the store
    fn list_accounts(&self) -> Result<Vec<String>>;

    /// Root folder of an account
    fn root_folder(&self, account: &str) -> Result<FolderHandle>;

    /// Direct children of a folder, in store order
    fn subfolders(&self, folder_id: &str) -> Result<Vec<FolderHandle>>;

    /// Display name of a well-known folder of the account, if it has one
    fn default_folder_name(&self, account: &str, kind: DefaultFolderKind)
        -> Result<Option<String>>;

    /// Message identifiers of a folder, in store order
    fn message_ids(&self, folder_id: &str) -> Result<Vec<String>>;

    /// Read the core fields of a message
    fn message(&self, message_id: &str) -> Result<MessageHeader>;

    /// Read the full body text of a message
    fn message_body(&self, message_id: &str) -> Result<String>;

    /// List the attachments of a message
    fn attachments(&self, message_id: &str) -> Result<Vec<AttachmentRef>>;

    /// Resolve the file name of one attachment
    ///
    /// # Returns
    /// `Ok(None)` when the attachment has no file name; an error when it
    /// cannot be read at all.
    fn attachment_file_name(&self, message_id: &str, index: usize) -> Result<Option<String>>;

    /// Delete a message
    ///
    /// A message outside the deleted-items folder moves there; a message
    /// already in deleted-items is removed permanently.
    fn delete_message(&self, store_id: &str, message_id: &str) -> Result<()>;

    /// Cheap call that fails with `TransientStore` when the connection is gone
    fn probe(&self, account: &str) -> Result<()>;

    /// Re-establish the store connection
    fn reconnect(&self) -> Result<()>;

    /// Persist pending changes
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

impl<S: MailStoreTrait + ?Sized> MailStoreTrait for Box<S> {
    fn list_accounts(&self) -> Result<Vec<String>> {
        (**self).list_accounts()
    }

    fn root_folder(&self, account: &str) -> Result<FolderHandle> {
        (**self).root_folder(account)
    }

    fn subfolders(&self, folder_id: &str) -> Result<Vec<FolderHandle>> {
        (**self).subfolders(folder_id)
    }

    fn default_folder_name(
        &self,
        account: &str,
        kind: DefaultFolderKind,
    ) -> Result<Option<String>> {
        (**self).default_folder_name(account, kind)
    }

    fn message_ids(&self, folder_id: &str) -> Result<Vec<String>> {
        (**self).message_ids(folder_id)
    }

    fn message(&self, message_id: &str) -> Result<MessageHeader> {
        (**self).message(message_id)
    }

    fn message_body(&self, message_id: &str) -> Result<String> {
        (**self).message_body(message_id)
    }

    fn attachments(&self, message_id: &str) -> Result<Vec<AttachmentRef>> {
        (**self).attachments(message_id)
    }

    fn attachment_file_name(&self, message_id: &str, index: usize) -> Result<Option<String>> {
        (**self).attachment_file_name(message_id, index)
    }

    fn delete_message(&self, store_id: &str, message_id: &str) -> Result<()> {
        (**self).delete_message(store_id, message_id)
    }

    fn probe(&self, account: &str) -> Result<()> {
        (**self).probe(account)
    }

    fn reconnect(&self) -> Result<()> {
        (**self).reconnect()
    }

    fn flush(&self) -> Result<()> {
        (**self).flush()
    }
}

/// A boxed mail store for dynamic dispatch
pub type BoxedMailStore = Box<dyn MailStoreTrait>;

/// Configuration for simulating store failures
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSimulationConfig {
    /// Drop the connection after this many store calls; it stays down until
    /// `reconnect` is called
    pub disconnect_after_calls: Option<usize>,
    /// Message ids whose core fields fail to read
    pub message_read_errors: Vec<String>,
    /// Message ids whose attachments fail to resolve
    pub attachment_read_errors: Vec<String>,
    /// Message ids whose deletion fails
    pub failing_deletes: Vec<String>,
    /// Make every reconnect attempt fail
    pub reconnect_fails: bool,
}

impl StoreSimulationConfig {
    /// Create a config that drops the connection after N calls
    pub fn disconnect_after(calls: usize) -> Self {
        Self {
            disconnect_after_calls: Some(calls),
            ..Default::default()
        }
    }

    /// Add messages whose core fields fail to read
    pub fn with_message_read_errors(mut self, message_ids: Vec<String>) -> Self {
        self.message_read_errors = message_ids;
        self
    }

    /// Add messages whose attachments fail to resolve
    pub fn with_attachment_read_errors(mut self, message_ids: Vec<String>) -> Self {
        self.attachment_read_errors = message_ids;
        self
    }

    /// Add messages whose deletion fails
    pub fn with_failing_deletes(mut self, message_ids: Vec<String>) -> Self {
        self.failing_deletes = message_ids;
        self
    }

    /// Make reconnect attempts fail
    pub fn with_failing_reconnect(mut self) -> Self {
        self.reconnect_fails = true;
        self
    }
}
