use anyhow::Result;

use crate::Context;
use crate::cli::ApplyArgs;
use crate::engine::{self, ExecuteOptions, ExecutionPlan};
use crate::ui;

pub fn run(ctx: &Context, args: &ApplyArgs) -> Result<()> {
    let loaded = super::load(ctx, &args.profile)?;
    let config = &loaded.config;

    if !ctx.quiet {
        ui::header(&format!("Converge ({} profile)", config.profile));
        ui::kv("Config", &loaded.origin());
        ui::kv("Templates", &config.template_dir.display().to_string());
    }

    let plan = ExecutionPlan::build(config)?;
    let opts = ExecuteOptions {
        dry_run: args.dry_run,
        yes: args.yes,
        quiet: ctx.quiet,
    };

    engine::execute(plan, &config.tools, &config.template_dir, &opts)?;
    Ok(())
}
