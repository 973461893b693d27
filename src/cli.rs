use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::schema::ProfileName;

#[derive(Parser)]
#[command(name = "converge")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Converge this host to a declared state", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file (TOML, or JSON by extension)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Converge the host to the desired state
    Apply(ApplyArgs),

    /// Show what apply would do without changing anything
    Plan(ProfileArgs),

    /// List the ordered resources of the desired state
    Show(ShowArgs),

    /// Validate the configuration and desired state
    Check(ProfileArgs),

    /// Check that this host can be converged
    Doctor(ProfileArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser)]
pub struct ProfileArgs {
    /// Profile to use instead of the configured one
    #[arg(short, long, value_enum)]
    pub profile: Option<ProfileName>,
}

#[derive(Parser)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub profile: ProfileArgs,

    /// Dry run - show what would be done
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Parser)]
pub struct ShowArgs {
    #[command(flatten)]
    pub profile: ProfileArgs,

    /// Print resources as JSON
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_apply_flags() {
        let cli = Cli::try_parse_from([
            "converge", "-vv", "apply", "--profile", "minimal", "--dry-run", "--yes",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Apply(args) => {
                assert_eq!(args.profile.profile, Some(ProfileName::Minimal));
                assert!(args.dry_run);
                assert!(args.yes);
            }
            _ => panic!("expected apply"),
        }
    }

    #[test]
    fn global_config_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["converge", "show", "--json", "-c", "/tmp/c.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
    }
}
