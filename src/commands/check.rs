use anyhow::Result;

use crate::Context;
use crate::cli::ProfileArgs;
use crate::engine::ExecutionPlan;
use crate::ui;

pub fn run(ctx: &Context, args: &ProfileArgs) -> Result<()> {
    let loaded = super::load(ctx, args)?;
    let plan = ExecutionPlan::build(&loaded.config)
        .map_err(|err| err.context(format!("{} is invalid", loaded.origin())))?;

    if !ctx.quiet {
        ui::success(&format!(
            "{}: profile '{}' declares {} resources and {} notification edges",
            loaded.origin(),
            loaded.config.profile,
            plan.desired.len(),
            plan.desired.bus().edges().len()
        ));
    }
    Ok(())
}
