//! Progress bar utilities for CLI output
//!
//! This module renders the controller's step and progress events with
//! indicatif, and holds the console helpers shared by the command handlers.
//!
//! Key features:
//! - A spinner for steps without a known total, a bar for the others
//! - Progress bars that suspend cleanly when printing
//! - Consistent visual styling across all commands

use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::time::Duration;

use crate::ui::events::ProgressEvent;

// ============================================================================
// Styles - Consistent visual appearance
// ============================================================================

/// Get the spinner style for steps without a total
fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⣾⣽⣻⢿⡿⣟⣯⣷")
}

/// Get the progress bar style for counted steps
fn progress_bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("  {spinner:.green} {msg} [{bar:40.cyan/dim}] {pos}/{len} ({percent}%)")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━━╾─")
}

// ============================================================================
// Console output helpers
// ============================================================================

/// Print a header section with a box
pub fn print_header(title: &str) {
    let width = 68;
    let title_padded = format!("{:^width$}", title, width = width - 2);
    println!();
    println!("╔{}╗", "═".repeat(width - 2));
    println!("║{}║", title_padded);
    println!("╚{}╝", "═".repeat(width - 2));
    println!();
}

/// Print a success message with checkmark
pub fn print_success(msg: &str) {
    println!("  ✓ {}", msg);
}

/// Print an info message with bullet
pub fn print_info(msg: &str) {
    println!("  • {}", msg);
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    println!("  ⚠ {}", msg);
}

/// Print an error message
pub fn print_error(msg: &str) {
    println!("  ✗ {}", msg);
}

// ============================================================================
// Step progress
// ============================================================================

/// Renders one task's steps: each `StepStarted` replaces the current bar
pub struct StepProgress {
    bar: Option<ProgressBar>,
    hidden: bool,
}

impl StepProgress {
    /// Create a renderer drawing to stderr
    pub fn new() -> Self {
        Self {
            bar: None,
            hidden: false,
        }
    }

    /// Create a renderer that draws nothing
    pub fn hidden() -> Self {
        Self {
            bar: None,
            hidden: true,
        }
    }

    /// Apply one progress event
    pub fn handle(&mut self, event: &ProgressEvent) {
        match event {
            ProgressEvent::StepStarted { label, total } => self.start_step(label, *total),
            ProgressEvent::Advanced { position } => {
                if let Some(bar) = &self.bar {
                    bar.set_position(*position as u64);
                }
            }
        }
    }

    fn start_step(&mut self, label: &str, total: usize) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }

        let bar = if total == 0 {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(spinner_style());
            spinner.enable_steady_tick(Duration::from_millis(80));
            spinner
        } else {
            let bar = ProgressBar::new(total as u64);
            bar.set_style(progress_bar_style());
            bar
        };
        if self.hidden {
            bar.set_draw_target(indicatif::ProgressDrawTarget::hidden());
        }
        bar.set_message(label.to_string());
        self.bar = Some(bar);
    }

    /// Label of the current step
    pub fn current_step(&self) -> Option<String> {
        self.bar.as_ref().map(|b| b.message())
    }

    /// Position within the current step
    pub fn position(&self) -> u64 {
        self.bar.as_ref().map(|b| b.position()).unwrap_or(0)
    }

    /// Run `f` with the bar hidden
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        match &self.bar {
            Some(bar) => bar.suspend(f),
            None => f(),
        }
    }

    /// Clear the current bar
    pub fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

impl Default for StepProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for StepProgress {
    fn drop(&mut self) {
        self.finish();
    }
}

// ============================================================================
// Dual writer for logging
// ============================================================================

/// A writer that writes to both console and file
///
/// Used for logging to both stderr and a log file simultaneously.
pub struct DualWriter {
    pub console: std::io::Stderr,
    pub file: std::fs::File,
}

impl Write for DualWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let _ = self.console.write(buf);
        self.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let _ = self.console.flush();
        self.file.flush()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_step_progress_follows_events() {
        let mut progress = StepProgress::hidden();
        assert_eq!(progress.current_step(), None);

        progress.handle(&ProgressEvent::StepStarted {
            label: "Counting emails...".to_string(),
            total: 0,
        });
        assert_eq!(progress.current_step().as_deref(), Some("Counting emails..."));

        progress.handle(&ProgressEvent::StepStarted {
            label: "Step 1/2 - Read all messages".to_string(),
            total: 10,
        });
        progress.handle(&ProgressEvent::Advanced { position: 4 });
        assert_eq!(progress.position(), 4);
        assert_eq!(
            progress.current_step().as_deref(),
            Some("Step 1/2 - Read all messages")
        );

        progress.finish();
        assert_eq!(progress.current_step(), None);
    }

    #[test]
    fn test_dual_writer_writes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.log");
        let mut writer = DualWriter {
            console: std::io::stderr(),
            file: std::fs::File::create(&path).unwrap(),
        };
        writer.write_all(b"line\n").unwrap();
        writer.flush().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "line\n");
    }
}
