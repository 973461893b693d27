use anyhow::{Context as _, Result};
use colored::Colorize;
use declarative::{DesiredState, Resource};
use serde::Serialize;

use crate::Context;
use crate::cli::ShowArgs;
use crate::engine::ExecutionPlan;
use crate::ui;

#[derive(Serialize)]
struct ShowOutput<'a> {
    profile: String,
    resources: &'a [Resource],
}

pub fn run(ctx: &Context, args: &ShowArgs) -> Result<()> {
    let loaded = super::load(ctx, &args.profile)?;
    let plan = ExecutionPlan::build(&loaded.config)?;

    if args.json {
        let output = ShowOutput {
            profile: loaded.config.profile.to_string(),
            resources: plan.desired.resources(),
        };
        let json = serde_json::to_string_pretty(&output).context("Failed to serialize resources")?;
        println!("{json}");
        return Ok(());
    }

    ui::header(&format!(
        "{} profile: {} resources",
        loaded.config.profile,
        plan.desired.len()
    ));
    print_resources(&plan.desired, ctx.verbose > 0);
    Ok(())
}

fn print_resources(desired: &DesiredState, details: bool) {
    let width = desired.len().to_string().len();

    for (i, resource) in desired.resources().iter().enumerate() {
        println!(
            "  {:>width$}. {} {}",
            i + 1,
            resource.identity().to_string().bold(),
            resource.description().dimmed(),
        );
        if details && let Some(ownership) = resource.ownership() {
            ui::dim(&format!(
                "{:width$}  owner={} group={} mode={}",
                "",
                ownership.owner.as_deref().unwrap_or("-"),
                ownership.group.as_deref().unwrap_or("-"),
                ownership.mode.map_or_else(|| "-".to_string(), declarative::mode::format),
            ));
        }
        if let Some(guard) = &resource.guard {
            println!("  {:width$}    {} {}", "", "unless".dimmed(), guard);
        }
        for action in &resource.notifies {
            println!("  {:width$}    {} {}", "", "notifies".cyan(), action);
        }
    }
}
