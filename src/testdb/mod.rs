//! Test Database Module
//!
//! Test the search pipeline end to end without a real mail store. Scenarios
//! are in-memory mailbox snapshots searched through `SnapshotStore`, with
//! optional simulated store failures.
//!
//! # Features
//!
//! - **Scenarios**: Handwritten mailboxes covering reply chains, ghosts,
//!   Deleted Items rules, folder selection and store failures
//! - **Generator**: Seeded mailboxes of any size with a known answer
//! - **Test Runner**: Execute scenarios and report pass/fail
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use mail_dedup::testdb::{TestRunner, TestRunnerConfig};
//!
//! let runner = TestRunner::with_config(TestRunnerConfig {
//!     verbose: true,
//!     ..Default::default()
//! });
//! let summary = runner.run_quick();
//! println!("Passed: {}/{}", summary.passed, summary.total);
//! ```

pub mod generator;
pub mod runner;
pub mod scenarios;

pub use generator::{GeneratedMailbox, MailboxGenerator, MailboxGeneratorConfig};
pub use runner::{ScenarioResult, TestRunner, TestRunnerConfig, TestSummary};
pub use scenarios::{ExpectedResults, ScenarioLibrary, TestScenario};

use std::collections::BTreeMap;

/// Get a list of all available scenario names
pub fn list_scenario_names() -> Vec<String> {
    ScenarioLibrary::all_scenarios()
        .into_iter()
        .map(|s| s.name)
        .collect()
}

/// Get a list of all available tags
pub fn list_tags() -> Vec<String> {
    let mut tags: Vec<String> = ScenarioLibrary::all_scenarios()
        .into_iter()
        .flat_map(|s| s.tags)
        .collect();
    tags.sort();
    tags.dedup();
    tags
}

/// Print available scenarios to console, grouped by first tag
pub fn print_available_scenarios(tag: Option<&str>) {
    let scenarios = match tag {
        Some(tag) => ScenarioLibrary::scenarios_by_tag(tag),
        None => ScenarioLibrary::all_scenarios(),
    };

    let mut by_category: BTreeMap<String, Vec<&TestScenario>> = BTreeMap::new();
    for scenario in &scenarios {
        let category = scenario
            .tags
            .first()
            .cloned()
            .unwrap_or_else(|| "other".to_string());
        by_category.entry(category).or_default().push(scenario);
    }

    println!("\nAvailable test scenarios\n");
    for (category, scenarios) in &by_category {
        println!("{}", category.to_uppercase());
        for scenario in scenarios {
            println!("   • {} - {}", scenario.name, scenario.description);
        }
        println!();
    }

    println!("Total: {} scenarios available\n", scenarios.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_functions() {
        let names = list_scenario_names();
        assert!(names.contains(&"reply_chain".to_string()));

        let tags = list_tags();
        assert!(tags.contains(&"deleted-items".to_string()));
        assert!(tags.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_quick_tests_run() {
        let summary = TestRunner::new().run_quick();
        assert_eq!(summary.total, 5);
        assert_eq!(summary.failed, 0);
    }
}
