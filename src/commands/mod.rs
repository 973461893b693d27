pub mod apply;
pub mod check;
pub mod doctor;
pub mod plan;
pub mod show;

use anyhow::Result;

use crate::Context;
use crate::cli::ProfileArgs;
use crate::config::{self, Loaded};

/// Load configuration with the subcommand's profile override
fn load(ctx: &Context, args: &ProfileArgs) -> Result<Loaded> {
    config::load(ctx.config.as_deref(), args.profile)
}
