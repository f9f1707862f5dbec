//! Command-line argument definitions
//!
//! This module defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Find and remove email messages that a newer message of the same conversation already contains
#[derive(Parser, Debug)]
#[command(name = "mail-dedup")]
#[command(author = "Vihaan Reddy M")]
#[command(version = "1.0.0")]
#[command(about = "Find and remove redundant messages in a mailbox: earlier messages quoted in full by a later reply, and undelivered messages without sender", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Mailbox snapshot file to work on (overrides config)
    #[arg(short, long, global = true)]
    pub store: Option<PathBuf>,

    /// Account to search (overrides config)
    #[arg(short, long, global = true)]
    pub account: Option<String>,

    /// Log level: error, warn, info, debug, trace (overrides config)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the accounts in the mail store
    Accounts,

    /// Search an account and show the messages that can be deleted
    Scan {
        /// Folder name to skip together with its subfolders (repeatable)
        #[arg(short, long = "exclude", value_name = "FOLDER")]
        exclude: Vec<String>,

        /// Only scan the account's root folder
        #[arg(long)]
        no_subfolders: bool,

        /// Skip folders with at least this many items
        #[arg(long, value_name = "ITEMS")]
        size_limit: Option<usize>,

        /// Write the candidate table to this file
        #[arg(long, value_name = "FILE")]
        export: Option<PathBuf>,

        /// Table format for --export: csv or tsv
        #[arg(long, value_parser = ["csv", "tsv"])]
        format: Option<String>,

        /// Copy the candidate table to the clipboard (tab-separated)
        #[arg(long)]
        clipboard: bool,
    },

    /// Search an account, pick the messages to delete and delete them
    Clean {
        /// Folder name to skip together with its subfolders (repeatable)
        #[arg(short, long = "exclude", value_name = "FOLDER")]
        exclude: Vec<String>,

        /// Only scan the account's root folder
        #[arg(long)]
        no_subfolders: bool,

        /// Skip folders with at least this many items
        #[arg(long, value_name = "ITEMS")]
        size_limit: Option<usize>,

        /// Delete every candidate without asking
        #[arg(short, long)]
        yes: bool,
    },

    /// Open the configuration file in your default editor
    ///
    /// The config file is stored at:
    /// - Windows: %APPDATA%\mail_dedup\config.toml
    /// - Linux: ~/.config/mail_dedup/config.toml
    /// - macOS: ~/Library/Application Support/mail_dedup/config.toml
    ///
    /// If no config file exists, a default one will be created.
    Config {
        /// Show the config file path without opening it
        #[arg(long)]
        path: bool,

        /// Reset config to defaults (creates a fresh config file)
        #[arg(long)]
        reset: bool,
    },

    /// Generate a configuration file at a specific location
    GenerateConfig {
        /// Output path for the config file (defaults to standard location)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show current configuration
    ShowConfig,

    /// Run scenario tests against simulated mailboxes
    ///
    /// Scenarios are small in-memory mailboxes with known answers; no real
    /// mail store is touched.
    Test {
        #[command(subcommand)]
        test_command: TestCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum TestCommands {
    /// Run all available test scenarios
    RunAll {
        /// Write a JSON report to this file
        #[arg(long, value_name = "FILE")]
        json_report: Option<PathBuf>,

        /// Only run scenarios with this tag
        #[arg(short, long)]
        tag: Option<String>,

        /// Stop on first failure
        #[arg(long)]
        fail_fast: bool,
    },

    /// Run specific test scenarios by name
    Run {
        /// Scenario names to run (comma-separated or multiple values)
        #[arg(value_delimiter = ',', required = true)]
        scenarios: Vec<String>,
    },

    /// List all available test scenarios
    ListScenarios {
        /// Filter by tag
        #[arg(short, long)]
        tag: Option<String>,
    },

    /// Write a generated mailbox snapshot for use with --store
    GenerateStore {
        /// Output file for the snapshot
        #[arg(short, long)]
        output: PathBuf,

        /// Number of conversations to generate
        #[arg(long, default_value = "100")]
        conversations: usize,

        /// Seed for reproducible generation
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Account name of the generated mailbox
        #[arg(long, default_value = "user@example.com")]
        account_name: String,
    },
}
