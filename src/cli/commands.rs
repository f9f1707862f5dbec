//! Command handler implementations
//!
//! This module contains the implementation of all CLI commands. Mailbox
//! commands open the configured snapshot, hand it to a `DedupController` and
//! render the controller's events until the task finishes.

use crate::cli::progress::{
    print_error, print_header, print_info, print_success, print_warning, StepProgress,
};
use crate::cli::{Args, Commands, TestCommands};
use crate::core::config::{
    get_config_path, init_config, open_config_in_editor, Config, ExportFormat,
};
use crate::dedup::export::{render_table, write_table, DATE_FORMAT};
use crate::dedup::{CandidateCommand, CandidateSet, DeletionCandidate, SearchOutcome, SearchParams};
use crate::store::SnapshotStore;
use crate::testdb::{self, MailboxGenerator, MailboxGeneratorConfig, TestRunner, TestRunnerConfig};
use crate::ui::{format_bytes, AppEvent, DedupController, LogLevel, TaskEvent, UiEvent};
use anyhow::{bail, Context, Result};
use dialoguer::{Confirm, MultiSelect};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How long the event loop waits before re-checking the Ctrl+C flag
const EVENT_POLL: Duration = Duration::from_millis(100);

/// Subject width in the candidate listing
const SUBJECT_WIDTH: usize = 48;

/// Folder selection options shared by `scan` and `clean`
#[derive(Debug, Clone, Default)]
pub struct FolderOptions {
    pub exclude: Vec<String>,
    pub no_subfolders: bool,
    pub size_limit: Option<usize>,
}

/// Run the appropriate command based on CLI arguments
///
/// Without a subcommand the configured account is scanned.
pub fn run_command(args: &Args, config: &Config, shutdown_flag: Arc<AtomicBool>) -> Result<()> {
    match &args.command {
        Some(Commands::Accounts) => {
            list_accounts(config, &shutdown_flag)?;
        }
        Some(Commands::Scan {
            exclude,
            no_subfolders,
            size_limit,
            export,
            format,
            clipboard,
        }) => {
            let options = FolderOptions {
                exclude: exclude.clone(),
                no_subfolders: *no_subfolders,
                size_limit: *size_limit,
            };
            let format = export_format(format.as_deref(), config)?;
            let export = export.clone().or_else(|| configured_export_path(config));
            scan_mailbox(
                config,
                &options,
                export,
                format,
                *clipboard,
                &shutdown_flag,
            )?;
        }
        Some(Commands::Clean {
            exclude,
            no_subfolders,
            size_limit,
            yes,
        }) => {
            let options = FolderOptions {
                exclude: exclude.clone(),
                no_subfolders: *no_subfolders,
                size_limit: *size_limit,
            };
            clean_mailbox(config, &options, *yes, &shutdown_flag)?;
        }
        Some(Commands::Config { path, reset }) => {
            handle_config_command(*path, *reset)?;
        }
        Some(Commands::GenerateConfig { output }) => {
            generate_config_file(output.clone())?;
        }
        Some(Commands::ShowConfig) => {
            show_config(config);
        }
        Some(Commands::Test { test_command }) => {
            handle_test_command(test_command)?;
        }
        None => {
            scan_mailbox(
                config,
                &FolderOptions::default(),
                configured_export_path(config),
                config.export.format,
                false,
                &shutdown_flag,
            )?;
        }
    }

    Ok(())
}

/// Handle test subcommands
pub fn handle_test_command(test_command: &TestCommands) -> Result<()> {
    match test_command {
        TestCommands::RunAll {
            json_report,
            tag,
            fail_fast,
        } => {
            test_run_all(json_report.clone(), tag.clone(), *fail_fast)?;
        }
        TestCommands::Run { scenarios } => {
            test_run_scenarios(scenarios)?;
        }
        TestCommands::ListScenarios { tag } => {
            testdb::print_available_scenarios(tag.as_deref());
        }
        TestCommands::GenerateStore {
            output,
            conversations,
            seed,
            account_name,
        } => {
            test_generate_store(output, *conversations, *seed, account_name)?;
        }
    }
    Ok(())
}

// ============================================================================
// Mailbox commands
// ============================================================================

/// Open the configured mailbox snapshot
fn open_store(config: &Config) -> Result<SnapshotStore> {
    let path = &config.store.path;
    if path.as_os_str().is_empty() {
        bail!(
            "No mail store configured. Pass --store <FILE> or set [store] path in the config file"
        );
    }

    SnapshotStore::open(path)
        .with_context(|| format!("Failed to open mail store '{}'", path.display()))
}

/// Search parameters for `account` with the command-line overrides applied
pub fn build_params(account: &str, config: &Config, options: &FolderOptions) -> SearchParams {
    let mut params = SearchParams::from_config(account, &config.search);
    for folder in &options.exclude {
        params = params.exclude(folder);
    }
    if let Some(limit) = options.size_limit {
        params = params.with_size_limit(limit);
    }
    if options.no_subfolders {
        params = params.without_subfolders();
    }
    params
}

/// Table format from `--format`, falling back to the configured one
fn export_format(flag: Option<&str>, config: &Config) -> Result<ExportFormat> {
    match flag {
        Some(name) => name.parse::<ExportFormat>().map_err(anyhow::Error::msg),
        None => Ok(config.export.format),
    }
}

fn configured_export_path(config: &Config) -> Option<PathBuf> {
    let output = &config.export.output;
    (!output.as_os_str().is_empty()).then(|| output.clone())
}

/// Pump controller events into the progress display until the task ends
///
/// A Ctrl+C press (the shared flag) cancels the running task; the task still
/// ends with its terminal event.
fn wait_for_task(
    controller: &DedupController,
    progress: &mut StepProgress,
    shutdown_flag: &AtomicBool,
) -> Result<TaskEvent> {
    let mut cancel_sent = false;

    loop {
        if !cancel_sent && shutdown_flag.load(Ordering::SeqCst) && controller.cancel() {
            progress.suspend(|| warn!("Cancelling, waiting for the current step to stop..."));
            cancel_sent = true;
        }

        match controller.recv_event_timeout(EVENT_POLL) {
            Some(UiEvent::Progress(event)) => progress.handle(&event),
            Some(UiEvent::Task(task)) => {
                progress.finish();
                debug!("Received {}", task.name());
                return Ok(task);
            }
            Some(UiEvent::App(AppEvent::Log { level, message })) => {
                progress.suspend(|| match level {
                    LogLevel::Debug => debug!("{}", message),
                    LogLevel::Info => info!("{}", message),
                    LogLevel::Warning => warn!("{}", message),
                    LogLevel::Error => error!("{}", message),
                });
            }
            Some(UiEvent::App(AppEvent::ShuttingDown)) => {
                progress.finish();
                bail!("The search worker stopped unexpectedly");
            }
            None => {}
        }
    }
}

/// Account from the config, or the first one the store lists
fn resolve_account(
    controller: &DedupController,
    config: &Config,
    progress: &mut StepProgress,
    shutdown_flag: &AtomicBool,
) -> Result<String> {
    if let Some(account) = config.account() {
        return Ok(account.to_string());
    }

    controller.list_accounts()?;
    match wait_for_task(controller, progress, shutdown_flag)? {
        TaskEvent::AccountsListed { accounts } => match accounts.into_iter().next() {
            Some(account) => {
                info!("No account configured, using '{}'", account);
                Ok(account)
            }
            None => bail!("The mail store has no accounts"),
        },
        TaskEvent::AccountsFailed { error } => Err(error.into()),
        other => bail!("Unexpected controller event: {}", other.name()),
    }
}

/// Run one search on the controller
fn run_search(
    controller: &DedupController,
    params: SearchParams,
    progress: &mut StepProgress,
    shutdown_flag: &AtomicBool,
) -> Result<SearchOutcome> {
    let account = params.account.clone();
    controller.start_search(params)?;

    match wait_for_task(controller, progress, shutdown_flag)? {
        TaskEvent::SearchCompleted(outcome) => Ok(*outcome),
        TaskEvent::SearchAborted => bail!("Search of {} cancelled", account),
        TaskEvent::SearchFailed { error } => {
            Err(anyhow::Error::new(error).context(format!("Search of {} failed", account)))
        }
        other => bail!("Unexpected controller event: {}", other.name()),
    }
}

/// List the accounts in the mail store
pub fn list_accounts(config: &Config, shutdown_flag: &AtomicBool) -> Result<()> {
    let controller = DedupController::new(open_store(config)?);
    let mut progress = StepProgress::new();

    controller.list_accounts()?;
    let accounts = match wait_for_task(&controller, &mut progress, shutdown_flag)? {
        TaskEvent::AccountsListed { accounts } => accounts,
        TaskEvent::AccountsFailed { error } => return Err(error.into()),
        other => bail!("Unexpected controller event: {}", other.name()),
    };
    controller.shutdown();

    if accounts.is_empty() {
        warn!("The mail store has no accounts");
        return Ok(());
    }

    info!("Found {} account(s):", accounts.len());
    for account in &accounts {
        let marker = if config.account() == Some(account.as_str()) {
            " (configured)"
        } else {
            ""
        };
        println!("  • {}{}", account, marker);
    }

    Ok(())
}

/// Search an account and show what can be deleted
pub fn scan_mailbox(
    config: &Config,
    options: &FolderOptions,
    export: Option<PathBuf>,
    format: ExportFormat,
    clipboard: bool,
    shutdown_flag: &AtomicBool,
) -> Result<()> {
    let controller = DedupController::new(open_store(config)?);
    let mut progress = StepProgress::new();

    let account = resolve_account(&controller, config, &mut progress, shutdown_flag)?;
    let params = build_params(&account, config, options);
    let outcome = run_search(&controller, params, &mut progress, shutdown_flag)?;
    controller.shutdown();

    print_header(&format!("Search results for {}", outcome.account));
    if outcome.candidates.is_empty() {
        print_success("No redundant messages found");
    } else {
        print_candidates(&outcome.candidates);
    }
    println!();
    print_info(&outcome.summary_line());

    if let Some(path) = export {
        write_table(&path, &outcome.candidates, format)
            .with_context(|| format!("Failed to export to '{}'", path.display()))?;
        print_success(&format!(
            "Exported {} rows to {}",
            outcome.candidates.len(),
            path.display()
        ));
    }

    if clipboard {
        copy_to_clipboard(&render_table(&outcome.candidates, ExportFormat::Tsv))?;
        print_success("Copied the table to the clipboard");
    }

    Ok(())
}

/// Search an account, let the user pick rows, and delete them
pub fn clean_mailbox(
    config: &Config,
    options: &FolderOptions,
    assume_yes: bool,
    shutdown_flag: &AtomicBool,
) -> Result<()> {
    let controller = DedupController::new(open_store(config)?);
    let mut progress = StepProgress::new();

    let account = resolve_account(&controller, config, &mut progress, shutdown_flag)?;
    let params = build_params(&account, config, options);
    let mut outcome = run_search(&controller, params, &mut progress, shutdown_flag)?;

    if outcome.candidates.is_empty() {
        print_success("No redundant messages found");
        print_info(&outcome.summary_line());
        return Ok(());
    }

    if !assume_yes {
        let labels: Vec<String> = outcome
            .candidates
            .candidates()
            .iter()
            .map(candidate_label)
            .collect();
        let defaults = vec![true; labels.len()];

        println!();
        let chosen = MultiSelect::new()
            .with_prompt("Messages to delete (space toggles, enter confirms)")
            .items(&labels)
            .defaults(&defaults)
            .interact()?;
        apply_selection(&mut outcome.candidates, &chosen);
    }

    let aggregates = outcome.candidates.aggregates();
    print_info(&outcome.summary_line());
    if aggregates.selected_count == 0 {
        print_info("No messages selected, nothing deleted");
        return Ok(());
    }

    if !assume_yes {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete {} messages ({})?",
                aggregates.selected_count,
                format_bytes(aggregates.selected_bytes)
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            print_info("Nothing deleted");
            return Ok(());
        }
    }

    let rows = outcome.candidates.selected_snapshot();
    controller.start_delete(&outcome.account, &outcome.store_id, rows)?;
    let report = match wait_for_task(&controller, &mut progress, shutdown_flag)? {
        TaskEvent::DeleteCompleted { report } => report,
        other => bail!("Unexpected controller event: {}", other.name()),
    };
    controller.shutdown();

    let removed = outcome.candidates.remove_confirmed_deletions(&report);
    debug!(
        "Removed {} rows from the table, {} left",
        removed,
        outcome.candidates.len()
    );

    if report.is_complete() {
        print_success(&report.outcome_message());
    } else {
        print_warning(&report.outcome_message());
        for failure in &report.failed {
            print_error(&failure.error.to_string());
        }
    }

    if let Some(folder) = &outcome.deleted_folder {
        if !report.succeeded.is_empty() {
            print_info(&format!(
                "Deleted messages were moved to '{}'; run clean again to remove duplicates there permanently",
                folder
            ));
        }
    }

    report.into_result()?;
    Ok(())
}

/// Include exactly the rows at the chosen indices
pub fn apply_selection(set: &mut CandidateSet, chosen: &[usize]) {
    let ids: Vec<String> = set
        .candidates()
        .iter()
        .map(|c| c.message_id.clone())
        .collect();

    for (index, message_id) in ids.into_iter().enumerate() {
        set.apply(CandidateCommand::SetInclusion {
            message_id,
            included: chosen.contains(&index),
        });
    }
}

/// One-line description of a candidate for selection prompts
fn candidate_label(candidate: &DeletionCandidate) -> String {
    format!(
        "{} | {} | {} | {}",
        candidate.folder_name,
        candidate.timestamp.format(DATE_FORMAT),
        truncate(&candidate.subject, SUBJECT_WIDTH),
        format_bytes(candidate.size)
    )
}

fn print_candidates(set: &CandidateSet) {
    for candidate in set.candidates() {
        let mark = if candidate.included { "x" } else { " " };
        println!(
            "  [{}] {:<16} {}  {}",
            mark,
            truncate(&candidate.folder_name, 16),
            candidate.timestamp.format(DATE_FORMAT),
            truncate(&candidate.subject, SUBJECT_WIDTH)
        );

        let sender = candidate
            .sender_name
            .as_deref()
            .or(candidate.sender_address.as_deref())
            .unwrap_or("(no sender)");
        match &candidate.superseded_by {
            Some(newer) => println!(
                "      from {}, {}, contained in {} of {}",
                sender,
                format_bytes(candidate.size),
                newer.folder_name,
                newer.timestamp.format(DATE_FORMAT)
            ),
            None => println!(
                "      {}, {}, never delivered",
                sender,
                format_bytes(candidate.size)
            ),
        }
    }
}

/// Shorten `text` to at most `max` characters
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut short: String = text.chars().take(max.saturating_sub(3)).collect();
    short.push_str("...");
    short
}

fn copy_to_clipboard(text: &str) -> Result<()> {
    let mut clipboard = arboard::Clipboard::new().context("Clipboard not available")?;
    clipboard
        .set_text(text.to_string())
        .context("Failed to copy to the clipboard")?;
    debug!("Copied {} characters to clipboard", text.len());
    Ok(())
}

// ============================================================================
// Configuration commands
// ============================================================================

/// Handle the config command - open config in editor or show path
pub fn handle_config_command(show_path: bool, reset: bool) -> Result<()> {
    if reset {
        if let Some(config_path) = get_config_path() {
            if config_path.exists() {
                std::fs::remove_file(&config_path)?;
                info!("Removed existing config file");
            }
        }
        let path = init_config()?;
        info!("Created fresh config file at: {}", path.display());
        return Ok(());
    }

    if show_path {
        let path = Config::get_active_config_path();
        println!("{}", path.display());
        if path.exists() {
            info!("Config file exists at: {}", path.display());
        } else {
            info!("Config file would be created at: {}", path.display());
        }
        return Ok(());
    }

    info!("Opening configuration file in default editor...");
    match open_config_in_editor() {
        Ok(path) => {
            info!("Config file: {}", path.display());
            info!("Run 'mail-dedup show-config' to verify your settings.");
        }
        Err(e) => {
            error!("Failed to open config file: {}", e);
            if let Some(path) = get_config_path() {
                info!("You can manually edit the config at: {}", path.display());
            }
        }
    }

    Ok(())
}

/// Generate a configuration file at the specified or default location
pub fn generate_config_file(output: Option<PathBuf>) -> Result<()> {
    let output_path = match output {
        Some(path) => {
            std::fs::write(&path, Config::generate_default_config())
                .with_context(|| format!("Failed to write '{}'", path.display()))?;
            path
        }
        None => init_config()?,
    };

    info!("Configuration file: {}", output_path.display());
    info!("Set [store] path to your mailbox snapshot before running a scan.");

    Ok(())
}

/// Show the current configuration settings
pub fn show_config(config: &Config) {
    let config_path = Config::get_active_config_path();
    info!("Configuration file: {}", config_path.display());
    if !config_path.exists() {
        info!("(Using default settings - no config file found)");
    }
    info!("");
    info!("[store]");
    info!("  path = \"{}\"", config.store.path.display());
    info!(
        "  account = {:?}",
        config.account().unwrap_or("(first account)")
    );
    info!("");
    info!("[search]");
    info!("  folder_size_limit = {}", config.search.folder_size_limit);
    info!("  excluded_folders = {:?}", config.search.excluded_folders);
    info!("  include_subfolders = {}", config.search.include_subfolders);
    info!(
        "  exclude_default_folders = {}",
        config.search.exclude_default_folders
    );
    info!("");
    info!("[export]");
    info!("  format = {:?}", config.export.format);
    info!("  output = \"{}\"", config.export.output.display());
    info!("");
    info!("[logging]");
    info!("  level = \"{}\"", config.logging.level);
    info!("  log_to_file = {}", config.logging.log_to_file);
    info!("  log_file = \"{}\"", config.logging.log_file.display());
}

// ============================================================================
// Test commands
// ============================================================================

fn test_run_all(json_report: Option<PathBuf>, tag: Option<String>, fail_fast: bool) -> Result<()> {
    let runner = TestRunner::with_config(TestRunnerConfig {
        verbose: true,
        fail_fast,
        tag_filter: tag.map(|t| vec![t]),
    });
    let summary = runner.run_all();

    if let Some(path) = json_report {
        summary
            .write_json_report(&path)
            .with_context(|| format!("Failed to write report '{}'", path.display()))?;
        info!("JSON report written to {}", path.display());
    }

    if summary.failed > 0 {
        bail!(
            "{} of {} scenarios failed: {}",
            summary.failed,
            summary.total,
            summary.failed_scenarios().join(", ")
        );
    }

    Ok(())
}

fn test_run_scenarios(scenarios: &[String]) -> Result<()> {
    let names: Vec<&str> = scenarios.iter().map(|s| s.as_str()).collect();
    let known = testdb::list_scenario_names();
    for name in &names {
        if !known.iter().any(|k| k == name) {
            warn!("Unknown scenario '{}'", name);
        }
    }

    let runner = TestRunner::with_config(TestRunnerConfig {
        verbose: true,
        ..Default::default()
    });
    let summary = runner.run_by_names(&names);

    println!(
        "\n✓ Selected tests complete: {}/{} passed",
        summary.passed, summary.total
    );

    if summary.total == 0 {
        bail!("No matching scenarios; run 'mail-dedup test list-scenarios'");
    }
    if summary.failed > 0 {
        bail!("Failed scenarios: {}", summary.failed_scenarios().join(", "));
    }

    Ok(())
}

fn test_generate_store(
    output: &Path,
    conversations: usize,
    seed: u64,
    account_name: &str,
) -> Result<()> {
    let config = MailboxGeneratorConfig {
        account: account_name.to_string(),
        ..MailboxGeneratorConfig::sized(conversations, seed)
    };
    let mailbox = MailboxGenerator::new(config).generate();

    mailbox
        .snapshot
        .save(output)
        .with_context(|| format!("Failed to write '{}'", output.display()))?;

    print_success(&format!(
        "Wrote {} messages for {} to {}",
        mailbox.message_count,
        account_name,
        output.display()
    ));
    print_info(&format!(
        "A scan should find {} candidates ({} without sender)",
        mailbox.expected_candidates, mailbox.expected_ghosts
    ));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::RunContext;
    use crate::dedup::search;
    use crate::store::snapshot::StoreSnapshot;
    use tempfile::TempDir;

    fn generated_store(dir: &TempDir) -> (PathBuf, usize) {
        let path = dir.path().join("mailbox.json");
        test_generate_store(&path, 20, 7, "user@example.com").unwrap();
        let expected = MailboxGenerator::new(MailboxGeneratorConfig::sized(20, 7))
            .generate()
            .expected_candidates;
        (path, expected)
    }

    fn config_for(path: &Path) -> Config {
        let mut config = Config::default();
        config.store.path = path.to_path_buf();
        config
    }

    #[test]
    fn test_build_params_applies_overrides() {
        let mut config = Config::default();
        config.search.excluded_folders = vec!["Archive".to_string()];

        let options = FolderOptions {
            exclude: vec!["Junk".to_string()],
            no_subfolders: true,
            size_limit: Some(10),
        };
        let params = build_params("me@example.com", &config, &options);

        assert_eq!(params.account, "me@example.com");
        assert!(params.excluded_folders.contains(&"Archive".to_string()));
        assert!(params.excluded_folders.contains(&"Junk".to_string()));
        assert_eq!(params.folder_size_limit, 10);
        assert!(!params.include_subfolders);
    }

    #[test]
    fn test_export_format_resolution() {
        let mut config = Config::default();
        config.export.format = ExportFormat::Tsv;

        assert_eq!(export_format(None, &config).unwrap(), ExportFormat::Tsv);
        assert_eq!(
            export_format(Some("csv"), &config).unwrap(),
            ExportFormat::Csv
        );
        assert!(export_format(Some("xlsx"), &config).is_err());

        assert_eq!(configured_export_path(&config), None);
        config.export.output = PathBuf::from("out.csv");
        assert_eq!(
            configured_export_path(&config),
            Some(PathBuf::from("out.csv"))
        );
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer subject", 10), "a much ...");
        assert_eq!(truncate("ééééé", 4), "é...");
    }

    #[test]
    fn test_open_store_requires_path() {
        let err = open_store(&Config::default()).unwrap_err();
        assert!(err.to_string().contains("--store"));
    }

    #[test]
    fn test_generate_store_writes_snapshot() {
        let dir = TempDir::new().unwrap();
        let (path, _) = generated_store(&dir);

        let snapshot = StoreSnapshot::load(&path).unwrap();
        assert_eq!(snapshot.accounts[0].name, "user@example.com");
        assert!(snapshot.message_count() > 0);
    }

    #[test]
    fn test_apply_selection() {
        let mailbox = MailboxGenerator::new(MailboxGeneratorConfig::sized(10, 3)).generate();
        let store = SnapshotStore::new(mailbox.snapshot);
        let mut outcome = search(
            &store,
            &SearchParams::new("user@example.com"),
            &RunContext::silent(),
        )
        .unwrap();
        assert!(outcome.candidates.len() >= 2);

        apply_selection(&mut outcome.candidates, &[1]);
        let selected: Vec<&DeletionCandidate> = outcome
            .candidates
            .candidates()
            .iter()
            .filter(|c| c.included)
            .collect();
        assert_eq!(selected.len(), 1);
        assert_eq!(
            selected[0].message_id,
            outcome.candidates.candidates()[1].message_id
        );
    }

    #[test]
    fn test_scan_exports_table() {
        let dir = TempDir::new().unwrap();
        let (path, expected) = generated_store(&dir);
        let export = dir.path().join("candidates.tsv");

        scan_mailbox(
            &config_for(&path),
            &FolderOptions::default(),
            Some(export.clone()),
            ExportFormat::Tsv,
            false,
            &AtomicBool::new(false),
        )
        .unwrap();

        let table = std::fs::read_to_string(&export).unwrap();
        assert_eq!(table.lines().count(), expected + 1);
    }

    #[test]
    fn test_clean_moves_candidates_to_deleted_items() {
        let dir = TempDir::new().unwrap();
        let (path, expected) = generated_store(&dir);
        let config = config_for(&path);

        let before = SnapshotStore::open(&path).unwrap();
        let ids: Vec<String> = search(
            &before,
            &SearchParams::new("user@example.com"),
            &RunContext::silent(),
        )
        .unwrap()
        .candidates
        .candidates()
        .iter()
        .map(|c| c.message_id.clone())
        .collect();
        assert_eq!(ids.len(), expected);

        clean_mailbox(
            &config,
            &FolderOptions::default(),
            true,
            &AtomicBool::new(false),
        )
        .unwrap();

        let after = SnapshotStore::open(&path).unwrap();
        assert_eq!(after.message_count(), before.message_count());
        for id in &ids {
            assert_eq!(after.folder_of(id).as_deref(), Some("Deleted Items"));
        }
    }

    #[test]
    fn test_cancelled_scan_reports_error() {
        let dir = TempDir::new().unwrap();
        let (path, _) = generated_store(&dir);

        let result = scan_mailbox(
            &config_for(&path),
            &FolderOptions::default(),
            None,
            ExportFormat::Csv,
            false,
            &AtomicBool::new(true),
        );
        // a small mailbox may finish before the cancel lands
        if let Err(e) = result {
            assert!(e.to_string().contains("cancelled"));
        }
    }
}
