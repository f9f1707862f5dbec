//! Predefined test scenarios
//!
//! Each scenario is a small mailbox, the search parameters to run over it,
//! optional simulated store failures, and the outcome a correct search must
//! produce.

use chrono::{NaiveDate, NaiveDateTime};

use super::generator::{MailboxGenerator, MailboxGeneratorConfig};
use crate::dedup::SearchParams;
use crate::store::snapshot::{AttachmentSnapshot, FolderSnapshot, MessageSnapshot, StoreSnapshot};
use crate::store::traits::{MessageClass, StoreSimulationConfig};

/// Account used by the handwritten scenarios
pub const SCENARIO_ACCOUNT: &str = "me@example.com";

/// A complete test scenario
#[derive(Debug, Clone)]
pub struct TestScenario {
    /// Scenario name for identification
    pub name: String,
    /// Description of what this scenario tests
    pub description: String,
    /// Mailbox to search
    pub snapshot: StoreSnapshot,
    /// Simulated store failures
    pub simulation: StoreSimulationConfig,
    /// Search parameters
    pub params: SearchParams,
    /// Expected outcome
    pub expected: ExpectedResults,
    /// Tags for filtering scenarios
    pub tags: Vec<String>,
}

/// Expected outcome of a search
#[derive(Debug, Clone, Default)]
pub struct ExpectedResults {
    /// Number of deletion candidates
    pub candidates: usize,
    /// How many of them are ghosts
    pub ghosts: usize,
    /// Candidate message ids in order, when the exact set matters
    pub candidate_ids: Option<Vec<String>>,
    /// Total items counted, when it matters
    pub total_messages: Option<usize>,
    /// Folders scanned, when it matters
    pub folders_scanned: Option<usize>,
    /// Should the search succeed
    pub should_succeed: bool,
    /// Text the error message must contain (if should_succeed is false)
    pub expected_error: Option<String>,
}

impl ExpectedResults {
    /// A successful search with these counts
    pub fn found(candidates: usize, ghosts: usize) -> Self {
        Self {
            candidates,
            ghosts,
            should_succeed: true,
            ..Default::default()
        }
    }

    /// A failed search whose error contains `text`
    pub fn error(text: &str) -> Self {
        Self {
            should_succeed: false,
            expected_error: Some(text.to_string()),
            ..Default::default()
        }
    }

    /// Require this exact candidate order
    pub fn with_ids(mut self, ids: &[&str]) -> Self {
        self.candidate_ids = Some(ids.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Require these totals
    pub fn with_totals(mut self, total_messages: usize, folders_scanned: usize) -> Self {
        self.total_messages = Some(total_messages);
        self.folders_scanned = Some(folders_scanned);
        self
    }
}

impl TestScenario {
    /// Create a new test scenario searching `SCENARIO_ACCOUNT` with default parameters
    pub fn new(
        name: &str,
        description: &str,
        snapshot: StoreSnapshot,
        expected: ExpectedResults,
    ) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            snapshot,
            simulation: StoreSimulationConfig::default(),
            params: SearchParams::new(SCENARIO_ACCOUNT),
            expected,
            tags: Vec::new(),
        }
    }

    /// Add tags to the scenario
    pub fn with_tags(mut self, tags: Vec<&str>) -> Self {
        self.tags = tags.into_iter().map(String::from).collect();
        self
    }

    /// Replace the search parameters
    pub fn with_params(mut self, params: SearchParams) -> Self {
        self.params = params;
        self
    }

    /// Simulate store failures
    pub fn with_simulation(mut self, simulation: StoreSimulationConfig) -> Self {
        self.simulation = simulation;
        self
    }
}

fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 4, day)
        .and_then(|d| d.and_hms_opt(hour, 0, 0))
        .unwrap_or_default()
}

fn msg(id: &str, conversation: &str, hour: u32, body: &str) -> MessageSnapshot {
    MessageSnapshot::new(id, conversation, at(1, hour), body)
}

fn mailbox(folders: Vec<FolderSnapshot>) -> StoreSnapshot {
    StoreSnapshot::single_account(SCENARIO_ACCOUNT, folders)
}

fn deleted_items(messages: Vec<MessageSnapshot>) -> FolderSnapshot {
    FolderSnapshot::mail("deleted", "Deleted Items").with_messages(messages)
}

/// Collection of all predefined test scenarios
pub struct ScenarioLibrary;

impl ScenarioLibrary {
    // =========================================================================
    // BASIC SCENARIOS
    // =========================================================================

    /// Scenario: Mailbox without messages
    pub fn empty_mailbox() -> TestScenario {
        TestScenario::new(
            "empty_mailbox",
            "Mailbox with folders but no messages",
            mailbox(vec![
                FolderSnapshot::mail("inbox", "Inbox"),
                deleted_items(Vec::new()),
            ]),
            ExpectedResults::found(0, 0).with_totals(0, 3),
        )
        .with_tags(vec!["basic"])
    }

    /// Scenario: Three-message reply chain
    pub fn reply_chain() -> TestScenario {
        let inbox = FolderSnapshot::mail("inbox", "Inbox").with_messages(vec![
            msg("r3", "c1", 11, "third\n\nsecond\n\nfirst"),
            msg("r1", "c1", 9, "first"),
            msg("r2", "c1", 10, "second\n\nfirst"),
        ]);
        TestScenario::new(
            "reply_chain",
            "Each reply quotes the previous message in full",
            mailbox(vec![inbox]),
            ExpectedResults::found(2, 0).with_ids(&["r1", "r2"]),
        )
        .with_tags(vec!["basic", "chain"])
    }

    /// Scenario: Chain split over Sent Items and Inbox
    pub fn cross_folder_chain() -> TestScenario {
        let sent = FolderSnapshot::mail("sent", "Sent Items")
            .with_messages(vec![msg("s1", "c1", 9, "Can we meet on Friday?")]);
        let inbox = FolderSnapshot::mail("inbox", "Inbox").with_messages(vec![msg(
            "i1",
            "c1",
            10,
            "Friday works.\n\nCan we meet on Friday?",
        )]);
        TestScenario::new(
            "cross_folder_chain",
            "A sent message quoted by a reply in another folder",
            mailbox(vec![inbox, sent]),
            ExpectedResults::found(1, 0).with_ids(&["s1"]),
        )
        .with_tags(vec!["basic", "chain"])
    }

    /// Scenario: Unrelated conversations with the same text
    pub fn separate_conversations() -> TestScenario {
        let inbox = FolderSnapshot::mail("inbox", "Inbox").with_messages(vec![
            msg("a", "c1", 9, "Thanks!"),
            msg("b", "c2", 10, "Thanks!\n\nThanks!"),
        ]);
        TestScenario::new(
            "separate_conversations",
            "Messages of different conversations are never compared",
            mailbox(vec![inbox]),
            ExpectedResults::found(0, 0),
        )
        .with_tags(vec!["basic", "chain"])
    }

    /// Scenario: Folders of other item classes
    pub fn non_mail_folders() -> TestScenario {
        let calendar = FolderSnapshot::of_class("cal", "Calendar", MessageClass::Calendar)
            .with_messages(vec![msg("e1", "c1", 9, "standup"), msg("e2", "c1", 10, "standup")]);
        let inbox = FolderSnapshot::mail("inbox", "Inbox")
            .with_messages(vec![msg("m1", "c2", 9, "hello")]);
        TestScenario::new(
            "non_mail_folders",
            "Calendar folders are not scanned",
            mailbox(vec![inbox, calendar]),
            ExpectedResults::found(0, 0).with_totals(1, 2),
        )
        .with_tags(vec!["basic", "structure"])
    }

    // =========================================================================
    // GHOST SCENARIOS
    // =========================================================================

    /// Scenario: Messages without sender
    pub fn ghosts() -> TestScenario {
        let inbox = FolderSnapshot::mail("inbox", "Inbox").with_messages(vec![
            msg("g1", "c1", 9, "").ghost(),
            msg("g2", "c2", 10, "").ghost().unread(),
            msg("m1", "c3", 11, "regular"),
        ]);
        TestScenario::new(
            "ghosts",
            "Read ghosts are proposed, unread ghosts are kept",
            mailbox(vec![inbox]),
            ExpectedResults::found(1, 1).with_ids(&["g1"]),
        )
        .with_tags(vec!["ghost"])
    }

    // =========================================================================
    // CONTAINMENT SCENARIOS
    // =========================================================================

    /// Scenario: Attachments missing from the newer message
    pub fn attachments() -> TestScenario {
        let inbox = FolderSnapshot::mail("inbox", "Inbox").with_messages(vec![
            msg("a1", "c1", 9, "see attached")
                .with_attachment(AttachmentSnapshot::file("plan.pdf")),
            msg("a2", "c1", 10, "ok\n\nsee attached"),
            msg("b1", "c2", 9, "draft").with_attachment(AttachmentSnapshot::file("v1.docx")),
            msg("b2", "c2", 10, "updated\n\ndraft")
                .with_attachment(AttachmentSnapshot::file("v1.docx"))
                .with_attachment(AttachmentSnapshot::file("v2.docx")),
        ]);
        TestScenario::new(
            "attachments",
            "A reply that dropped an attachment does not supersede the original",
            mailbox(vec![inbox]),
            ExpectedResults::found(1, 0).with_ids(&["b1"]),
        )
        .with_tags(vec!["attachments"])
    }

    /// Scenario: Unreadable attachments
    pub fn attachment_read_errors() -> TestScenario {
        let inbox = FolderSnapshot::mail("inbox", "Inbox").with_messages(vec![
            msg("a1", "c1", 9, "photo inline")
                .with_attachment(AttachmentSnapshot::embedded("Picture (Device Independent Bitmap)").unreadable()),
            msg("a2", "c1", 10, "nice\n\nphoto inline"),
            msg("b1", "c2", 9, "contract").with_attachment(AttachmentSnapshot::file("contract.pdf")),
            msg("b2", "c2", 10, "signed\n\ncontract"),
        ]);
        TestScenario::new(
            "attachment_read_errors",
            "Attachments that cannot be read are left out of the comparison",
            mailbox(vec![inbox]),
            ExpectedResults::found(2, 0).with_ids(&["a1", "b1"]),
        )
        .with_simulation(
            StoreSimulationConfig::default().with_attachment_read_errors(vec!["b1".to_string()]),
        )
        .with_tags(vec!["attachments", "error"])
    }

    /// Scenario: Address markers added by the mail client
    pub fn mailto_artifacts() -> TestScenario {
        let inbox = FolderSnapshot::mail("inbox", "Inbox").with_messages(vec![
            msg("m1", "c1", 9, "Ask Bob <mailto:bob@example.com> about it"),
            msg("m2", "c1", 10, "Done.\n\nAsk Bob <mailto:Bob@Example.com> about it"),
            msg("m3", "c2", 9, "Call Ann about it"),
            msg("m4", "c2", 10, "Sure.\n\nCall Ann <mailto:ann@example.com> about it"),
        ]);
        TestScenario::new(
            "mailto_artifacts",
            "Quotes whose mailto markers differ still match; a marker on one side only does not",
            mailbox(vec![inbox]),
            ExpectedResults::found(1, 0).with_ids(&["m1"]),
        )
        .with_tags(vec!["mailto"])
    }

    /// Scenario: Identical timestamps
    pub fn timestamp_tie() -> TestScenario {
        let inbox = FolderSnapshot::mail("inbox", "Inbox").with_messages(vec![
            msg("t1", "c1", 9, "same text"),
            msg("t2", "c1", 9, "same text"),
        ]);
        TestScenario::new(
            "timestamp_tie",
            "Messages with the same timestamp never supersede each other",
            mailbox(vec![inbox]),
            ExpectedResults::found(0, 0),
        )
        .with_tags(vec!["chain", "edge-case"])
    }

    // =========================================================================
    // FOLDER SELECTION SCENARIOS
    // =========================================================================

    /// Scenario: Deleted Items rules
    pub fn deleted_items_rules() -> TestScenario {
        let inbox = FolderSnapshot::mail("inbox", "Inbox").with_messages(vec![
            msg("x2", "cx", 10, "new\n\nold"),
            msg("y1", "cy", 9, "kept"),
        ]);
        let deleted = deleted_items(vec![
            msg("x1", "cx", 9, "old"),
            msg("y2", "cy", 10, "trashed\n\nkept"),
            msg("z1", "cz", 9, "first"),
            msg("z2", "cz", 10, "second\n\nfirst"),
        ]);
        TestScenario::new(
            "deleted_items_rules",
            "A message outside Deleted Items is never superseded by one inside it",
            mailbox(vec![inbox, deleted]),
            ExpectedResults::found(2, 0),
        )
        .with_tags(vec!["deleted-items"])
    }

    /// Scenario: Folder over the size limit
    pub fn oversized_folder() -> TestScenario {
        let sub = FolderSnapshot::mail("sub", "Subfolder").with_messages(vec![
            msg("s1", "c2", 9, "one"),
            msg("s2", "c2", 10, "two\n\none"),
        ]);
        let big = FolderSnapshot::mail("big", "Big")
            .with_messages(vec![
                msg("b1", "c1", 9, "one"),
                msg("b2", "c1", 10, "two\n\none"),
                msg("b3", "c1", 11, "three\n\ntwo\n\none"),
            ])
            .with_folders(vec![sub]);
        TestScenario::new(
            "oversized_folder",
            "A folder at the size limit is skipped but its subfolders are scanned",
            mailbox(vec![big]),
            ExpectedResults::found(1, 0).with_ids(&["s1"]).with_totals(5, 2),
        )
        .with_params(SearchParams::new(SCENARIO_ACCOUNT).with_size_limit(3))
        .with_tags(vec!["structure", "size-limit"])
    }

    /// Scenario: Excluded folders
    pub fn excluded_folders() -> TestScenario {
        let archive = FolderSnapshot::mail("archive", "Archive")
            .with_messages(vec![msg("a1", "c1", 9, "one"), msg("a2", "c1", 10, "two\n\none")])
            .with_folders(vec![FolderSnapshot::mail("old", "2019")
                .with_messages(vec![msg("o1", "c2", 9, "one"), msg("o2", "c2", 10, "two\n\none")])]);
        let drafts = FolderSnapshot::mail("drafts", "Drafts")
            .with_messages(vec![msg("d1", "c3", 9, "one"), msg("d2", "c3", 10, "two\n\none")]);
        let inbox = FolderSnapshot::mail("inbox", "Inbox")
            .with_messages(vec![msg("i1", "c4", 9, "one"), msg("i2", "c4", 10, "two\n\none")]);
        TestScenario::new(
            "excluded_folders",
            "Excluded folders, their subfolders and default exclusions are skipped",
            mailbox(vec![inbox, archive, drafts]),
            ExpectedResults::found(1, 0).with_ids(&["i1"]).with_totals(2, 2),
        )
        .with_params(SearchParams::new(SCENARIO_ACCOUNT).exclude("Archive"))
        .with_tags(vec!["structure", "exclusion"])
    }

    /// Scenario: Root folder only
    pub fn no_subfolders() -> TestScenario {
        let inbox = FolderSnapshot::mail("inbox", "Inbox")
            .with_messages(vec![msg("i1", "c1", 9, "one"), msg("i2", "c1", 10, "two\n\none")]);
        TestScenario::new(
            "no_subfolders",
            "Without subfolders only the account root is scanned",
            mailbox(vec![inbox]),
            ExpectedResults::found(0, 0).with_totals(0, 1),
        )
        .with_params(SearchParams::new(SCENARIO_ACCOUNT).without_subfolders())
        .with_tags(vec!["structure"])
    }

    // =========================================================================
    // ERROR SCENARIOS
    // =========================================================================

    /// Scenario: Store connection drops mid-search
    pub fn transient_disconnect() -> TestScenario {
        let mut scenario = Self::reply_chain();
        scenario.name = "transient_disconnect".to_string();
        scenario.description = "The store drops the connection once; the search reconnects".to_string();
        scenario
            .with_simulation(StoreSimulationConfig::disconnect_after(8))
            .with_tags(vec!["error", "transient"])
    }

    /// Scenario: Store cannot reconnect
    pub fn store_unavailable() -> TestScenario {
        let mut scenario = Self::reply_chain();
        scenario.name = "store_unavailable".to_string();
        scenario.description = "The connection drops and reconnecting fails".to_string();
        scenario.expected = ExpectedResults::error("could not reconnect");
        scenario
            .with_simulation(StoreSimulationConfig::disconnect_after(8).with_failing_reconnect())
            .with_tags(vec!["error", "transient"])
    }

    /// Scenario: A message cannot be read
    pub fn message_read_error() -> TestScenario {
        let mut scenario = Self::reply_chain();
        scenario.name = "message_read_error".to_string();
        scenario.description = "An unreadable message fails the whole search".to_string();
        scenario.expected = ExpectedResults::error("Failed to read message 'r2'");
        scenario
            .with_simulation(
                StoreSimulationConfig::default().with_message_read_errors(vec!["r2".to_string()]),
            )
            .with_tags(vec!["error"])
    }

    /// Scenario: Account not in the store
    pub fn unknown_account() -> TestScenario {
        TestScenario::new(
            "unknown_account",
            "Searching an account the store does not have",
            mailbox(Vec::new()),
            ExpectedResults::error("Mailbox account not found"),
        )
        .with_params(SearchParams::new("nobody@example.com"))
        .with_tags(vec!["error"])
    }

    // =========================================================================
    // GENERATED SCENARIOS
    // =========================================================================

    /// Scenario built from the mailbox generator
    pub fn generated(name: &str, conversations: usize, seed: u64) -> TestScenario {
        let config = MailboxGeneratorConfig {
            account: SCENARIO_ACCOUNT.to_string(),
            ..MailboxGeneratorConfig::sized(conversations, seed)
        };
        let generated = MailboxGenerator::new(config).generate();
        let total = generated.message_count;
        TestScenario::new(
            name,
            &format!("Generated mailbox with {} conversations (seed {})", conversations, seed),
            generated.snapshot,
            ExpectedResults::found(generated.expected_candidates, generated.expected_ghosts)
                .with_totals(total, 5),
        )
        .with_tags(vec!["generated"])
    }

    /// Scenario: Realistic generated mailbox
    pub fn realistic_mailbox() -> TestScenario {
        Self::generated("realistic_mailbox", 200, 2024)
    }

    /// Scenario: Large generated mailbox
    pub fn stress_test() -> TestScenario {
        Self::generated("stress_test", 2_000, 99).with_tags(vec!["generated", "stress-test"])
    }

    /// Get all available scenarios
    pub fn all_scenarios() -> Vec<TestScenario> {
        vec![
            Self::empty_mailbox(),
            Self::reply_chain(),
            Self::cross_folder_chain(),
            Self::separate_conversations(),
            Self::non_mail_folders(),
            Self::ghosts(),
            Self::attachments(),
            Self::attachment_read_errors(),
            Self::mailto_artifacts(),
            Self::timestamp_tie(),
            Self::deleted_items_rules(),
            Self::oversized_folder(),
            Self::excluded_folders(),
            Self::no_subfolders(),
            Self::transient_disconnect(),
            Self::store_unavailable(),
            Self::message_read_error(),
            Self::unknown_account(),
            Self::generated("generated_small", 20, 7),
            Self::realistic_mailbox(),
            Self::stress_test(),
        ]
    }

    /// Get scenarios by tag
    pub fn scenarios_by_tag(tag: &str) -> Vec<TestScenario> {
        Self::all_scenarios()
            .into_iter()
            .filter(|s| s.tags.iter().any(|t| t == tag))
            .collect()
    }

    /// Get quick test scenarios (fast to run)
    pub fn quick_scenarios() -> Vec<TestScenario> {
        vec![
            Self::reply_chain(),
            Self::ghosts(),
            Self::deleted_items_rules(),
            Self::transient_disconnect(),
            Self::generated("generated_small", 20, 7),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_all_scenarios_load() {
        let scenarios = ScenarioLibrary::all_scenarios();
        assert!(!scenarios.is_empty());

        let names: HashSet<_> = scenarios.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names.len(), scenarios.len());
    }

    #[test]
    fn test_scenario_by_tag() {
        let error_scenarios = ScenarioLibrary::scenarios_by_tag("error");
        assert!(!error_scenarios.is_empty());
        for s in &error_scenarios {
            assert!(s.tags.contains(&"error".to_string()));
        }
    }

    #[test]
    fn test_quick_scenarios() {
        let quick = ScenarioLibrary::quick_scenarios();
        assert_eq!(quick.len(), 5);
    }
}
