//! Message indexing
//!
//! Reads every message of a folder into a `MessageRecord`. Messages without
//! a sender name (undelivered or recalled) are ghosts: they are never
//! compared, and a read ghost is proposed for deletion right away.

use crate::core::context::RunContext;
use crate::core::error::{DedupError, Result};
use crate::dedup::candidates::DeletionCandidate;
use crate::dedup::enumerator::FolderEntry;
use crate::dedup::record::MessageRecord;
use crate::store::session::StoreSession;
use crate::store::traits::{AttachmentKind, MailStoreTrait, MessageHeader};
use chrono::SubsecRound;
use log::{debug, error, trace};

/// Messages read from one folder
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexedFolder {
    /// Messages to compare, ascending by timestamp
    pub live: Vec<MessageRecord>,
    /// Read ghosts, already turned into candidates
    pub ghosts: Vec<DeletionCandidate>,
}

/// Read all messages of `folder`
///
/// Progress positions continue from `start_offset`, the number of items in
/// the folders indexed before this one.
pub fn index_folder<S: MailStoreTrait + ?Sized>(
    session: &StoreSession<'_, S>,
    folder: &FolderEntry,
    start_offset: usize,
    ctx: &RunContext,
) -> Result<IndexedFolder> {
    let ids = session.call(|s| s.message_ids(&folder.handle.id))?;
    let mut indexed = IndexedFolder::default();

    for (i, id) in ids.iter().enumerate() {
        ctx.check_cancelled()?;

        let header = session
            .call(|s| s.message(id))
            .map_err(|e| as_message_read(id, e))?;
        let mut record = base_record(&folder.name, header);

        if record.is_ghost() {
            if record.unread {
                trace!("Keeping unread message without sender: {}", record.message_id);
            } else {
                record.marked_for_deletion = true;
                indexed.ghosts.push(DeletionCandidate::ghost(&record));
            }
        } else {
            record.body = session
                .call(|s| s.message_body(id))
                .map_err(|e| as_message_read(id, e))?;
            record.attachments = attachment_names(session, &record)?;
            indexed.live.push(record);
        }

        ctx.advance(start_offset + i + 1);
    }

    indexed.live.sort_by_key(|r| r.timestamp);
    debug!(
        "Indexed {}: {} live, {} ghosts",
        folder.name,
        indexed.live.len(),
        indexed.ghosts.len()
    );
    Ok(indexed)
}

fn base_record(folder_name: &str, header: MessageHeader) -> MessageRecord {
    MessageRecord {
        folder_name: folder_name.to_string(),
        conversation_id: header.conversation_id,
        message_id: header.id,
        timestamp: header.created.trunc_subsecs(0),
        subject: header.subject,
        topic: header.conversation_topic.trim().to_string(),
        unread: header.unread,
        sender_name: header.sender_name,
        sender_address: header.sender_address,
        marked_for_deletion: false,
        body: String::new(),
        attachments: Vec::new(),
        size: header.size,
    }
}

/// Resolve attachment names, skipping the ones that cannot be read
fn attachment_names<S: MailStoreTrait + ?Sized>(
    session: &StoreSession<'_, S>,
    record: &MessageRecord,
) -> Result<Vec<String>> {
    let id = record.message_id.as_str();
    let attachments = session
        .call(|s| s.attachments(id))
        .map_err(|e| as_message_read(id, e))?;

    let mut names = Vec::with_capacity(attachments.len());
    for attachment in &attachments {
        match session.call(|s| s.attachment_file_name(id, attachment.index)) {
            Ok(Some(name)) => names.push(name),
            Ok(None) => names.push(attachment.display_name.clone()),
            Err(e) if e.is_transient() || e.is_aborted() => return Err(e),
            Err(e) if attachment.kind == AttachmentKind::EmbeddedObject => {
                debug!("Skipping embedded object '{}': {}", attachment.display_name, e);
            }
            Err(e) => {
                error!(
                    "Attachment error for: {} | {} | {} | {:?}: {}",
                    record.timestamp, record.subject, attachment.display_name, attachment.kind, e
                );
            }
        }
    }

    names.sort();
    Ok(names)
}

fn as_message_read(message_id: &str, err: DedupError) -> DedupError {
    match err {
        DedupError::TransientStore(_) | DedupError::Aborted | DedupError::MessageRead { .. } => err,
        other => DedupError::MessageRead {
            message_id: message_id.to_string(),
            reason: other.to_string(),
        },
    }
}
