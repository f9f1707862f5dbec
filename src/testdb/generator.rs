//! Seeded mailbox generator
//!
//! Builds synthetic mailboxes made of reply chains spread over a few
//! folders, plus some ghosts. Every reply quotes the whole previous message,
//! so a chain of `n` messages yields `n - 1` superseded messages; the
//! generator reports that count along with the snapshot.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::store::snapshot::{AttachmentSnapshot, FolderSnapshot, MessageSnapshot, StoreSnapshot};

/// Folders the generated messages are spread over
pub const GENERATED_FOLDERS: [&str; 3] = ["Inbox", "Sent Items", "Archive"];

const PEOPLE: [(&str, &str); 6] = [
    ("Alice Martin", "alice@example.com"),
    ("Bob Chen", "bob@example.com"),
    ("Carla Diaz", "carla@example.com"),
    ("Dev Patel", "dev@example.com"),
    ("Erin Walsh", "erin@example.com"),
    ("Femi Adeyemi", "femi@example.com"),
];

const TOPICS: [&str; 8] = [
    "Quarterly budget",
    "Offsite planning",
    "Release checklist",
    "Invoice 4471",
    "Team lunch",
    "Contract renewal",
    "Server migration",
    "Hiring update",
];

/// Configuration for mailbox generation
#[derive(Debug, Clone)]
pub struct MailboxGeneratorConfig {
    /// Account name of the generated mailbox
    pub account: String,
    /// Number of conversations
    pub conversations: usize,
    /// Longest chain is `max_replies + 1` messages
    pub max_replies: usize,
    /// Read messages without sender
    pub ghosts: usize,
    /// Unread messages without sender; never candidates
    pub unread_ghosts: usize,
    /// Chance that a conversation carries a file attachment
    pub attachment_rate: f64,
    /// Seed for reproducible generation
    pub seed: u64,
}

impl Default for MailboxGeneratorConfig {
    fn default() -> Self {
        Self {
            account: "user@example.com".to_string(),
            conversations: 50,
            max_replies: 4,
            ghosts: 5,
            unread_ghosts: 2,
            attachment_rate: 0.2,
            seed: 42,
        }
    }
}

impl MailboxGeneratorConfig {
    /// Default config with a given size and seed
    pub fn sized(conversations: usize, seed: u64) -> Self {
        Self {
            conversations,
            seed,
            ..Default::default()
        }
    }
}

/// A generated mailbox and what a search over it must find
#[derive(Debug, Clone)]
pub struct GeneratedMailbox {
    pub snapshot: StoreSnapshot,
    /// Superseded messages plus read ghosts
    pub expected_candidates: usize,
    pub expected_ghosts: usize,
    pub message_count: usize,
}

/// Mailbox generator
pub struct MailboxGenerator {
    config: MailboxGeneratorConfig,
    rng: StdRng,
}

impl MailboxGenerator {
    /// Create a generator; the same config always yields the same mailbox
    pub fn new(config: MailboxGeneratorConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self { config, rng }
    }

    /// Generate the mailbox
    pub fn generate(mut self) -> GeneratedMailbox {
        let mut folders: Vec<Vec<MessageSnapshot>> = vec![Vec::new(); GENERATED_FOLDERS.len()];
        let mut superseded = 0;

        for c in 0..self.config.conversations {
            let chain = self.conversation(c);
            superseded += chain.len() - 1;
            for message in chain {
                let folder = self.rng.gen_range(0..folders.len());
                folders[folder].push(message);
            }
        }

        for g in 0..self.config.ghosts + self.config.unread_ghosts {
            let created = self.base_time(g) + Duration::minutes(self.rng.gen_range(0..600));
            let mut ghost =
                MessageSnapshot::new(&format!("ghost-{}", g), &format!("ghost-conv-{}", g), created, "")
                    .with_subject("Undeliverable: message")
                    .ghost();
            if g >= self.config.ghosts {
                ghost = ghost.unread();
            }
            folders[0].push(ghost);
        }

        // store order is not chronological
        for messages in &mut folders {
            for i in (1..messages.len()).rev() {
                let j = self.rng.gen_range(0..=i);
                messages.swap(i, j);
            }
        }

        let mut tree: Vec<FolderSnapshot> = GENERATED_FOLDERS
            .iter()
            .zip(folders)
            .enumerate()
            .map(|(i, (name, messages))| {
                FolderSnapshot::mail(&format!("folder-{}", i), name).with_messages(messages)
            })
            .collect();
        tree.push(FolderSnapshot::mail("deleted", "Deleted Items"));

        let snapshot = StoreSnapshot::single_account(&self.config.account, tree);
        GeneratedMailbox {
            message_count: snapshot.message_count(),
            expected_candidates: superseded + self.config.ghosts,
            expected_ghosts: self.config.ghosts,
            snapshot,
        }
    }

    /// One reply chain, oldest first
    fn conversation(&mut self, index: usize) -> Vec<MessageSnapshot> {
        let conversation_id = format!("conv-{:04}", index);
        let topic = format!("{} #{}", TOPICS[index % TOPICS.len()], index);
        let length = self.rng.gen_range(1..=self.config.max_replies + 1);
        let attachment = self
            .rng
            .gen_bool(self.config.attachment_rate.clamp(0.0, 1.0))
            .then(|| format!("attachment-{}.pdf", index));

        let mut created = self.base_time(index) + Duration::minutes(self.rng.gen_range(0..480));
        let mut body = String::new();
        let mut chain = Vec::with_capacity(length);

        for k in 0..length {
            let (name, address) = PEOPLE[self.rng.gen_range(0..PEOPLE.len())];
            body = if k == 0 {
                format!("Hi all,\n\nNotes on {}.\n\n{}", topic, name)
            } else {
                format!(
                    "Reply {} from {}\n\nFrom: earlier sender\nSubject: RE: {}\n\n{}",
                    k, name, topic, body
                )
            };

            let subject = if k == 0 {
                topic.clone()
            } else {
                format!("RE: {}", topic)
            };
            let mut message = MessageSnapshot::new(
                &format!("msg-{:04}-{}", index, k),
                &conversation_id,
                created,
                &body,
            )
            .with_subject(&subject)
            .with_sender(name, address);
            message.conversation_topic = topic.clone();
            if let Some(file) = &attachment {
                message = message.with_attachment(AttachmentSnapshot::file(file));
            }
            chain.push(message);

            created += Duration::minutes(self.rng.gen_range(1..=240));
        }

        chain
    }

    fn base_time(&self, day: usize) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(8, 0, 0))
            .unwrap_or_default()
            + Duration::days((day % 365) as i64)
    }
}
