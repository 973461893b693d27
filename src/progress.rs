//! Console progress for convergence runs

use colored::Colorize;
use declarative::{ChangeRecord, DeferredAction, ProgressCallback, Resource};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Create a spinner with a message
pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Symbol and label for a recorded resource
pub fn outcome(record: &ChangeRecord) -> (colored::ColoredString, &'static str) {
    match (record.applied, record.changed) {
        (false, _) => ("○".dimmed(), "satisfied"),
        (true, false) => ("○".dimmed(), "unchanged"),
        (true, true) => ("✓".green(), "changed"),
    }
}

/// Prints one line per resource with a spinner while an action runs
pub struct ConsoleProgress {
    quiet: bool,
    current: Option<ProgressBar>,
}

impl ConsoleProgress {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            current: None,
        }
    }

    fn clear(&mut self) {
        if let Some(pb) = self.current.take() {
            pb.finish_and_clear();
        }
    }
}

impl Drop for ConsoleProgress {
    fn drop(&mut self) {
        self.clear();
    }
}

impl ProgressCallback for ConsoleProgress {
    fn on_resource_start(&mut self, index: usize, total: usize, resource: &Resource) {
        if self.quiet {
            return;
        }
        self.clear();
        self.current = Some(spinner(&format!(
            "[{}/{}] {}",
            index + 1,
            total,
            resource.description()
        )));
    }

    fn on_resource_complete(&mut self, record: &ChangeRecord) {
        self.clear();
        if self.quiet {
            return;
        }
        let (symbol, label) = outcome(record);
        let label = if record.changed {
            label.green().to_string()
        } else {
            label.dimmed().to_string()
        };
        println!("  {} {} {}", symbol, record.identity, label);
    }

    fn on_drain_start(&mut self, count: usize) {
        self.clear();
        if self.quiet || count == 0 {
            return;
        }
        println!();
        println!("  {} Running {} deferred action(s)...", "→".cyan(), count);
    }

    fn on_deferred_complete(&mut self, action: &DeferredAction) {
        if !self.quiet {
            println!("    {} {}", "✓".green(), action);
        }
    }
}
