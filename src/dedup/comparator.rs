//! Conversation comparison
//!
//! Within a conversation, an older message is superseded by a newer one when
//! every attachment of the older message is also on the newer one and the
//! older body is a substring of the newer body. Replies that quote the
//! original message therefore supersede it.
//!
//! Messages in the deleted-items folder are special: a message outside
//! deleted-items is never superseded by one inside it, while a deleted
//! message can be superseded by a message anywhere.

use crate::core::context::RunContext;
use crate::core::error::Result;
use crate::dedup::candidates::DeletionCandidate;
use crate::dedup::record::MessageRecord;
use crate::dedup::COMPARE_STEP;
use log::debug;
use rayon::prelude::*;
use regex::Regex;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

const MAILTO_MARKER: &str = "<mailto:";

fn mailto_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"\s<mailto:[\w.\-]+@[\w.\-]+.\w+>\s").expect("valid mailto regex")
    })
}

/// Remove every `<space><mailto:address><space>` marker some clients add
/// after a linked name, surrounding spaces included
pub fn strip_mailtos(body: &str) -> Cow<'_, str> {
    mailto_regex().replace_all(body, "")
}

/// Every attachment name of the older message appears on the newer one
pub fn attachments_contained(older: &[String], newer: &[String]) -> bool {
    older.iter().all(|name| newer.contains(name))
}

/// The older body is part of the newer body, directly or once mailto
/// markers are stripped from both
pub fn body_contained(older: &str, newer: &str) -> bool {
    if newer.contains(older) {
        return true;
    }
    if older.contains(MAILTO_MARKER) || newer.contains(MAILTO_MARKER) {
        return strip_mailtos(newer).contains(strip_mailtos(older).as_ref());
    }
    false
}

/// Whether `newer` supersedes `older`
pub fn supersedes(older: &MessageRecord, newer: &MessageRecord) -> bool {
    attachments_contained(&older.attachments, &newer.attachments)
        && body_contained(&older.body, &newer.body)
}

/// Split records into conversations, in order of first appearance
pub fn group_by_conversation(live: Vec<MessageRecord>) -> Vec<Vec<MessageRecord>> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Vec<MessageRecord>> = Vec::new();

    for record in live {
        match positions.get(&record.conversation_id) {
            Some(&pos) => groups[pos].push(record),
            None => {
                positions.insert(record.conversation_id.clone(), groups.len());
                groups.push(vec![record]);
            }
        }
    }

    groups
}

/// Compare all live records and return the superseded ones
///
/// Conversations are compared in parallel. The result follows conversation
/// order, and within a conversation ascending timestamp order. Cancellation
/// discards all partial results.
pub fn compare(
    live: Vec<MessageRecord>,
    deleted_folder: Option<&str>,
    ctx: &RunContext,
) -> Result<Vec<DeletionCandidate>> {
    let groups = group_by_conversation(live);
    ctx.begin_step(COMPARE_STEP, groups.len());

    let done = Mutex::new(0usize);
    let per_group: Vec<Vec<DeletionCandidate>> = groups
        .into_par_iter()
        .map(|group| -> Result<Vec<DeletionCandidate>> {
            ctx.check_cancelled()?;
            let candidates = compare_group(group, deleted_folder);

            let mut count = done.lock().unwrap_or_else(|e| e.into_inner());
            *count += 1;
            ctx.advance(*count);
            Ok(candidates)
        })
        .collect::<Result<_>>()?;

    let candidates: Vec<DeletionCandidate> = per_group.into_iter().flatten().collect();
    debug!("Comparison found {} superseded messages", candidates.len());
    Ok(candidates)
}

/// Compare the messages of one conversation
pub fn compare_group(
    mut group: Vec<MessageRecord>,
    deleted_folder: Option<&str>,
) -> Vec<DeletionCandidate> {
    group.sort_by_key(|r| r.timestamp);
    let in_deleted = |r: &MessageRecord| deleted_folder == Some(r.folder_name.as_str());

    let mut candidates = Vec::new();
    for i in 0..group.len() {
        let older = &group[i];
        let older_in_deleted = in_deleted(older);

        let newer = group.iter().find(|other| {
            other.timestamp > older.timestamp
                && !other.marked_for_deletion
                && (older_in_deleted || !in_deleted(other))
                && supersedes(older, other)
        });

        if let Some(newer) = newer {
            candidates.push(DeletionCandidate::superseded(older, newer));
            let older = &mut group[i];
            older.marked_for_deletion = true;
            older.body.clear();
        }
    }

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::tests::RecordingProgress;
    use crate::core::context::CancelToken;
    use crate::core::error::DedupError;
    use crate::dedup::candidates::tests::record;
    use std::sync::Arc;

    fn message(id: &str, folder: &str, hour: u32, body: &str, atts: &[&str]) -> MessageRecord {
        let mut r = record(id, folder, hour, 100);
        r.body = body.to_string();
        r.attachments = atts.iter().map(|a| a.to_string()).collect();
        r
    }

    fn in_conversation(mut r: MessageRecord, conversation: &str) -> MessageRecord {
        r.conversation_id = conversation.to_string();
        r
    }

    fn superseded_pairs(candidates: &[DeletionCandidate]) -> Vec<(String, String)> {
        candidates
            .iter()
            .map(|c| {
                (
                    c.message_id.clone(),
                    c.superseded_by.as_ref().unwrap().message_id.clone(),
                )
            })
            .collect()
    }

    #[test]
    fn test_reply_chain() {
        let live = vec![
            message("A", "Inbox", 9, "Hello", &[]),
            message("B", "Inbox", 10, "Hi\n> Hello", &[]),
            message("C", "Inbox", 11, "Ok\n> Hi\n> Hello", &[]),
        ];
        let candidates = compare(live, Some("Deleted Items"), &RunContext::silent()).unwrap();
        assert_eq!(
            superseded_pairs(&candidates),
            vec![
                ("A".to_string(), "B".to_string()),
                ("B".to_string(), "C".to_string())
            ]
        );
        for c in &candidates {
            assert!(c.superseded_by.as_ref().unwrap().timestamp > c.timestamp);
            assert!(c.included);
        }
    }

    #[test]
    fn test_missing_attachment_blocks_supersession() {
        let live = vec![
            message("A", "Inbox", 9, "Report attached", &["report.pdf"]),
            message("B", "Inbox", 10, "Thanks\n> Report attached", &[]),
        ];
        let candidates = compare(live, None, &RunContext::silent()).unwrap();
        assert!(candidates.is_empty());

        let live = vec![
            message("A", "Inbox", 9, "Report attached", &["report.pdf"]),
            message("B", "Inbox", 10, "Fwd\n> Report attached", &["notes.txt", "report.pdf"]),
        ];
        let candidates = compare(live, None, &RunContext::silent()).unwrap();
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn test_equal_timestamps_never_supersede() {
        let live = vec![
            message("A", "Inbox", 9, "same", &[]),
            message("B", "Sent Items", 9, "same", &[]),
        ];
        assert!(compare(live, None, &RunContext::silent()).unwrap().is_empty());
    }

    #[test]
    fn test_inbox_message_not_superseded_by_deleted_message() {
        let live = vec![
            message("A", "Inbox", 9, "Hello", &[]),
            message("B", "Deleted Items", 10, "Re: Hello", &[]),
        ];
        let candidates = compare(live, Some("Deleted Items"), &RunContext::silent()).unwrap();
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_deleted_message_superseded_by_inbox_message() {
        let live = vec![
            message("A", "Deleted Items", 9, "Hello", &[]),
            message("B", "Inbox", 10, "Re: Hello", &[]),
        ];
        let candidates = compare(live, Some("Deleted Items"), &RunContext::silent()).unwrap();
        assert_eq!(
            superseded_pairs(&candidates),
            vec![("A".to_string(), "B".to_string())]
        );
        assert_eq!(
            candidates[0].superseded_by.as_ref().unwrap().folder_name,
            "Inbox"
        );
    }

    #[test]
    fn test_deleted_to_deleted_duplicates() {
        let live = vec![
            message("A", "Deleted Items", 9, "Hello", &[]),
            message("B", "Deleted Items", 10, "Re: Hello", &[]),
        ];
        let candidates = compare(live, Some("Deleted Items"), &RunContext::silent()).unwrap();
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn test_first_match_wins() {
        let live = vec![
            message("A", "Inbox", 9, "Hello", &[]),
            message("B", "Archive", 10, "Hello world", &[]),
            message("C", "Inbox", 11, "Hello world again", &[]),
        ];
        let candidates = compare(live, None, &RunContext::silent()).unwrap();
        assert_eq!(
            superseded_pairs(&candidates),
            vec![
                ("A".to_string(), "B".to_string()),
                ("B".to_string(), "C".to_string())
            ]
        );
    }

    #[test]
    fn test_unsorted_group_is_resorted() {
        let live = vec![
            message("C", "Inbox", 11, "Ok\n> Hi\n> Hello", &[]),
            message("A", "Inbox", 9, "Hello", &[]),
        ];
        let candidates = compare(live, None, &RunContext::silent()).unwrap();
        assert_eq!(
            superseded_pairs(&candidates),
            vec![("A".to_string(), "C".to_string())]
        );
    }

    #[test]
    fn test_marker_on_newer_side_only_blocks_match() {
        let older = "Ask John Smith about it";
        let newer = "Ok\n> Ask John Smith <mailto:john.smith@example.com> about it";
        assert!(!body_contained(older, newer));

        let live = vec![
            message("A", "Inbox", 9, older, &[]),
            message("B", "Inbox", 10, newer, &[]),
        ];
        assert!(compare(live, None, &RunContext::silent()).unwrap().is_empty());
    }

    #[test]
    fn test_same_marker_on_both_sides() {
        let older = "Ask John <mailto:john@example.com> about it";
        let newer = "Ok\n> Ask John <mailto:john@example.com> about it";
        assert!(body_contained(older, newer));
        assert_eq!(strip_mailtos(older), "Ask Johnabout it");

        let live = vec![
            message("A", "Inbox", 9, older, &[]),
            message("B", "Inbox", 10, newer, &[]),
        ];
        assert_eq!(compare(live, None, &RunContext::silent()).unwrap().len(), 1);
    }

    #[test]
    fn test_strip_mailtos() {
        assert_eq!(strip_mailtos("a <mailto:x@y.com> b"), "ab");
        assert_eq!(
            strip_mailtos("a <mailto:x@y.com> b <mailto:x.y-z@mail.y.org> c"),
            "abc"
        );
        assert_eq!(strip_mailtos("no markers here"), "no markers here");
        assert_eq!(strip_mailtos("tight<mailto:x@y.com>text"), "tight<mailto:x@y.com>text");
    }

    #[test]
    fn test_mailto_with_different_address_case() {
        let older = "From John <mailto:John.Smith@example.com> sent";
        let newer = "Reply\n> From John <mailto:john.smith@example.com> sent\n";
        assert!(body_contained(older, newer));
    }

    #[test]
    fn test_abc_chain_with_attachments() {
        let live = vec![
            message("A", "Inbox", 1, "Hi", &[]),
            message("B", "Inbox", 2, "Hi there", &["x.png"]),
            message("C", "Inbox", 3, "Hi there, thanks", &["x.png"]),
        ];
        let candidates = compare(live, None, &RunContext::silent()).unwrap();
        assert_eq!(
            superseded_pairs(&candidates),
            vec![
                ("A".to_string(), "B".to_string()),
                ("B".to_string(), "C".to_string())
            ]
        );
        assert!(candidates.iter().all(|c| c.message_id != "C"));
    }

    #[test]
    fn test_empty_body_is_contained() {
        assert!(body_contained("", "anything"));
        assert!(!body_contained("something", ""));
    }

    #[test]
    fn test_groups_follow_first_appearance() {
        let live = vec![
            in_conversation(message("x1", "Inbox", 9, "x", &[]), "cx"),
            in_conversation(message("y1", "Inbox", 8, "y", &[]), "cy"),
            in_conversation(message("x2", "Inbox", 10, "x x", &[]), "cx"),
            in_conversation(message("y2", "Inbox", 12, "y y", &[]), "cy"),
        ];
        let groups = group_by_conversation(live.clone());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0][0].conversation_id, "cx");
        assert_eq!(groups[1].len(), 2);

        let candidates = compare(live, None, &RunContext::silent()).unwrap();
        let ids: Vec<_> = candidates.iter().map(|c| c.message_id.as_str()).collect();
        assert_eq!(ids, vec!["x1", "y1"]);
    }

    #[test]
    fn test_progress_per_conversation() {
        let live: Vec<_> = (0..20)
            .map(|i| {
                let m = message(&format!("m{}", i), "Inbox", 9, "b", &[]);
                in_conversation(m, &format!("c{}", i))
            })
            .collect();
        let sink = Arc::new(RecordingProgress::default());
        let ctx = RunContext::new(CancelToken::new(), sink.clone());

        compare(live, None, &ctx).unwrap();

        assert_eq!(
            sink.steps.lock().unwrap().as_slice(),
            &[(COMPARE_STEP.to_string(), 20)]
        );
        let positions = sink.positions.lock().unwrap();
        assert_eq!(positions.len(), 20);
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(positions.last(), Some(&20));
    }

    #[test]
    fn test_cancelled_compare_returns_no_partial_results() {
        let token = CancelToken::new();
        token.cancel();
        let ctx = RunContext::new(token, Arc::new(RecordingProgress::default()));
        let live = vec![
            message("A", "Inbox", 9, "Hello", &[]),
            message("B", "Inbox", 10, "Re: Hello", &[]),
        ];
        assert_eq!(compare(live, None, &ctx), Err(DedupError::Aborted));
    }
}
