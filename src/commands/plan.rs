use anyhow::Result;
use declarative::FsGuard;

use crate::Context;
use crate::cli::ProfileArgs;
use crate::engine::ExecutionPlan;
use crate::engine::differ::display_plan;
use crate::ui;

pub fn run(ctx: &Context, args: &ProfileArgs) -> Result<()> {
    let loaded = super::load(ctx, args)?;
    let plan = ExecutionPlan::build(&loaded.config)?;

    if !ctx.quiet {
        ui::header(&format!("Plan ({} profile)", loaded.config.profile));
        ui::kv("Config", &loaded.origin());
    }

    let entries = declarative::plan(&plan.desired, &FsGuard)?;
    display_plan(&entries);
    Ok(())
}
