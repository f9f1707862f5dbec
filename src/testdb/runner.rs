//! Test runner for executing scenarios and generating reports
//!
//! Each scenario is searched through a fresh `SnapshotStore` and the outcome
//! is compared with the scenario's expected results.

use super::scenarios::{ExpectedResults, ScenarioLibrary, TestScenario};
use crate::core::context::RunContext;
use crate::dedup::{search, CandidateReason, SearchOutcome};
use crate::store::snapshot::SnapshotStore;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

/// Result of running a single test scenario
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    /// Scenario name
    pub name: String,
    /// Whether the test passed
    pub passed: bool,
    /// Execution time
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub duration: Duration,
    /// Candidates found
    pub candidates_found: usize,
    /// Ghost candidates found
    pub ghosts_found: usize,
    /// Items counted by the search
    pub total_messages: usize,
    /// Detailed message
    pub message: String,
    /// Failure reason (if any)
    pub failure_reason: Option<String>,
}

fn as_millis<S: serde::Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64() * 1000.0)
}

impl ScenarioResult {
    /// Create a new passing result
    pub fn passed(name: &str, duration: Duration) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            duration,
            candidates_found: 0,
            ghosts_found: 0,
            total_messages: 0,
            message: "Test passed".to_string(),
            failure_reason: None,
        }
    }

    /// Create a new failing result
    pub fn failed(name: &str, duration: Duration, reason: &str) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            duration,
            candidates_found: 0,
            ghosts_found: 0,
            total_messages: 0,
            message: format!("Test failed: {}", reason),
            failure_reason: Some(reason.to_string()),
        }
    }

    /// Set search statistics
    pub fn with_stats(mut self, outcome: &SearchOutcome) -> Self {
        self.candidates_found = outcome.candidates.len();
        self.ghosts_found = ghost_count(outcome);
        self.total_messages = outcome.total_messages;
        self
    }
}

fn ghost_count(outcome: &SearchOutcome) -> usize {
    outcome
        .candidates
        .candidates()
        .iter()
        .filter(|c| c.reason == CandidateReason::Ghost)
        .count()
}

/// Summary of test run results
#[derive(Debug, Clone, Default, Serialize)]
pub struct TestSummary {
    /// Total scenarios run
    pub total: usize,
    /// Scenarios that passed
    pub passed: usize,
    /// Scenarios that failed
    pub failed: usize,
    /// Total execution time
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub total_duration: Duration,
    /// Per-scenario results, in run order
    pub results: Vec<ScenarioResult>,
}

impl TestSummary {
    /// Calculate pass rate as percentage
    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.passed as f64 / self.total as f64) * 100.0
        }
    }

    /// Get all failed scenario names
    pub fn failed_scenarios(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| !r.passed)
            .map(|r| r.name.as_str())
            .collect()
    }

    /// Write the summary as JSON
    pub fn write_json_report<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
    }
}

/// Configuration for test runner
#[derive(Debug, Clone, Default)]
pub struct TestRunnerConfig {
    /// Whether to run in verbose mode
    pub verbose: bool,
    /// Whether to stop on first failure
    pub fail_fast: bool,
    /// Filter scenarios by tags
    pub tag_filter: Option<Vec<String>>,
}

/// Test runner for executing scenarios
#[derive(Default)]
pub struct TestRunner {
    config: TestRunnerConfig,
}

impl TestRunner {
    /// Create a new test runner with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new test runner with configuration
    pub fn with_config(config: TestRunnerConfig) -> Self {
        Self { config }
    }

    /// Run all available scenarios
    pub fn run_all(&self) -> TestSummary {
        self.run_scenarios(ScenarioLibrary::all_scenarios())
    }

    /// Run quick test scenarios only
    pub fn run_quick(&self) -> TestSummary {
        self.run_scenarios(ScenarioLibrary::quick_scenarios())
    }

    /// Run scenarios filtered by tag
    pub fn run_by_tag(&self, tag: &str) -> TestSummary {
        self.run_scenarios(ScenarioLibrary::scenarios_by_tag(tag))
    }

    /// Run specific scenarios by name
    pub fn run_by_names(&self, names: &[&str]) -> TestSummary {
        let scenarios: Vec<_> = ScenarioLibrary::all_scenarios()
            .into_iter()
            .filter(|s| names.contains(&s.name.as_str()))
            .collect();
        self.run_scenarios(scenarios)
    }

    /// Run a list of scenarios
    pub fn run_scenarios(&self, scenarios: Vec<TestScenario>) -> TestSummary {
        let start = Instant::now();
        let scenarios = self.filter_scenarios(scenarios);
        let mut summary = TestSummary::default();

        if self.config.verbose {
            println!("\n╔══════════════════════════════════════════════════════════════╗");
            println!("║                  MAIL DEDUP - TEST RUNNER                    ║");
            println!("╚══════════════════════════════════════════════════════════════╝");
            println!("  Running {} scenario(s)\n", scenarios.len());
        }

        for scenario in scenarios {
            let result = self.run_single_scenario(scenario);

            if self.config.verbose {
                print_result(&result);
            }

            let should_stop = self.config.fail_fast && !result.passed;
            summary.total += 1;
            if result.passed {
                summary.passed += 1;
            } else {
                summary.failed += 1;
            }
            summary.results.push(result);

            if should_stop {
                if self.config.verbose {
                    println!("\n  Stopping early due to fail-fast mode\n");
                }
                break;
            }
        }

        summary.total_duration = start.elapsed();
        if self.config.verbose {
            print_summary(&summary);
        }
        summary
    }

    fn filter_scenarios(&self, scenarios: Vec<TestScenario>) -> Vec<TestScenario> {
        match &self.config.tag_filter {
            Some(tags) => scenarios
                .into_iter()
                .filter(|s| s.tags.iter().any(|t| tags.contains(t)))
                .collect(),
            None => scenarios,
        }
    }

    /// Run a single scenario
    pub fn run_single_scenario(&self, scenario: TestScenario) -> ScenarioResult {
        let start = Instant::now();

        if self.config.verbose {
            println!("▶ Running: {} - {}", scenario.name, scenario.description);
        }

        let store = SnapshotStore::with_simulation(scenario.snapshot, scenario.simulation);
        let result = search(&store, &scenario.params, &RunContext::silent());
        let duration = start.elapsed();

        match result {
            Ok(outcome) => match check_outcome(&outcome, &scenario.expected) {
                Ok(()) => ScenarioResult::passed(&scenario.name, duration).with_stats(&outcome),
                Err(reason) => {
                    ScenarioResult::failed(&scenario.name, duration, &reason).with_stats(&outcome)
                }
            },
            Err(error) => {
                let message = error.to_string();
                let expected = scenario.expected.expected_error.as_deref();
                match expected {
                    Some(text) if !scenario.expected.should_succeed && message.contains(text) => {
                        ScenarioResult::passed(&scenario.name, duration)
                    }
                    _ => ScenarioResult::failed(&scenario.name, duration, &message),
                }
            }
        }
    }
}

/// Compare a search outcome with the expected results
fn check_outcome(outcome: &SearchOutcome, expected: &ExpectedResults) -> Result<(), String> {
    if !expected.should_succeed {
        return Err(format!(
            "expected an error containing '{}', search succeeded",
            expected.expected_error.as_deref().unwrap_or_default()
        ));
    }
    if outcome.candidates.len() != expected.candidates {
        return Err(format!(
            "expected {} candidates, found {}",
            expected.candidates,
            outcome.candidates.len()
        ));
    }
    let ghosts = ghost_count(outcome);
    if ghosts != expected.ghosts {
        return Err(format!("expected {} ghosts, found {}", expected.ghosts, ghosts));
    }
    if let Some(ids) = &expected.candidate_ids {
        let found: Vec<&str> = outcome
            .candidates
            .candidates()
            .iter()
            .map(|c| c.message_id.as_str())
            .collect();
        if found != ids.iter().map(String::as_str).collect::<Vec<_>>() {
            return Err(format!("expected candidates {:?}, found {:?}", ids, found));
        }
    }
    if let Some(total) = expected.total_messages {
        if outcome.total_messages != total {
            return Err(format!(
                "expected {} messages counted, found {}",
                total, outcome.total_messages
            ));
        }
    }
    if let Some(folders) = expected.folders_scanned {
        if outcome.folders_scanned != folders {
            return Err(format!(
                "expected {} folders scanned, found {}",
                folders, outcome.folders_scanned
            ));
        }
    }
    Ok(())
}

fn print_result(result: &ScenarioResult) {
    if result.passed {
        println!(
            "  ✓ {} ({:.2}ms, {} candidates)",
            result.name,
            result.duration.as_secs_f64() * 1000.0,
            result.candidates_found
        );
    } else {
        println!(
            "  ✗ {}: {}",
            result.name,
            result.failure_reason.as_deref().unwrap_or("unknown failure")
        );
    }
}

fn print_summary(summary: &TestSummary) {
    println!("\n══════════════════════════════════════════════════════════════");
    println!(
        "  Passed: {}/{} ({:.1}%) in {:.2}s",
        summary.passed,
        summary.total,
        summary.pass_rate(),
        summary.total_duration.as_secs_f64()
    );
    let failed = summary.failed_scenarios();
    if !failed.is_empty() {
        println!("  Failed: {}", failed.join(", "));
    }
    println!("══════════════════════════════════════════════════════════════\n");
}
