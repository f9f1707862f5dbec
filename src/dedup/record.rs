//! Normalized message snapshot used by the comparator

use chrono::NaiveDateTime;

/// One email message as read from the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    /// Name of the folder the message was read from
    pub folder_name: String,
    pub conversation_id: String,
    /// Store-scoped message identifier
    pub message_id: String,
    /// Creation time, truncated to whole seconds
    pub timestamp: NaiveDateTime,
    pub subject: String,
    /// Conversation topic, trimmed
    pub topic: String,
    pub unread: bool,
    /// Absent for undelivered or recalled messages
    pub sender_name: Option<String>,
    pub sender_address: Option<String>,
    pub marked_for_deletion: bool,
    /// Full body text; cleared once the message is found superseded
    pub body: String,
    /// Attachment names, sorted ascending
    pub attachments: Vec<String>,
    /// Size in bytes
    pub size: u64,
}

impl MessageRecord {
    /// A message without sender name is a ghost
    pub fn is_ghost(&self) -> bool {
        self.sender_name.is_none()
    }
}
