//! Execution engine - converge the host with console progress

use anyhow::{Result, bail};
use colored::Colorize;
use declarative::{ConvergenceRunner, FsGuard, RunReport, RunSummary};
use std::path::Path;

use crate::host::{HostExecutor, ids};
use crate::progress::ConsoleProgress;
use crate::schema::Tools;
use crate::ui;

use super::differ::display_plan;
use super::planner::ExecutionPlan;

/// Options for execution
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Skip confirmation prompts
    pub yes: bool,
    /// Only print errors and the final summary
    pub quiet: bool,
}

/// Plan, confirm and run one convergence pass
///
/// Returns `None` when nothing ran (dry run or declined).
pub fn execute(
    plan: ExecutionPlan,
    tools: &Tools,
    template_dir: &Path,
    opts: &ExecuteOptions,
) -> Result<Option<RunSummary>> {
    let entries = declarative::plan(&plan.desired, &FsGuard)?;
    if !opts.quiet || opts.dry_run {
        display_plan(&entries);
    }

    if opts.dry_run {
        println!();
        println!("  {} Dry run - no changes made", "ℹ".blue());
        return Ok(None);
    }

    if !ids::is_root() {
        bail!("Convergence changes system accounts and ownership; run as root");
    }

    if !opts.quiet {
        println!();
    }
    if !ui::confirm("Converge this host?", opts.yes)? {
        println!();
        println!("  {} Aborted", "✗".red());
        return Ok(None);
    }

    let executor = HostExecutor::new(tools, template_dir, plan.variables);
    let mut runner =
        ConvergenceRunner::new(FsGuard, executor).with_progress(ConsoleProgress::new(opts.quiet));

    if !opts.quiet {
        println!();
        println!(
            "  {} Converging {} resources...",
            "→".cyan(),
            plan.desired.len()
        );
        println!();
    }
    let report = runner.run(plan.desired);

    print_report(&report);
    report.into_result().map(Some).map_err(anyhow::Error::new)
}

/// Print the final outcome of a run
pub fn print_report(report: &RunReport) {
    let summary = report.summary();
    println!();

    match &report.error {
        None => {
            println!("  {} Host converged", "✓".green().bold());
        }
        Some(err) if err.desired_state_reached() => {
            println!(
                "  {} Resources converged, but a deferred action failed",
                "⚠".yellow().bold()
            );
        }
        Some(err) => {
            let at = err
                .identity()
                .map_or_else(String::new, |id| format!(" at {id}"));
            println!("  {} Convergence failed{}", "✗".red().bold(), at);
        }
    }

    if summary.changed > 0 {
        println!("    • {} resources changed", summary.changed);
    }
    if summary.unchanged > 0 {
        println!("    • {} resources already converged", summary.unchanged);
    }
    if summary.satisfied > 0 {
        println!("    • {} resources skipped by guard", summary.satisfied);
    }
    if summary.deferred > 0 {
        println!("    • {} deferred actions run", summary.deferred);
    }
}
