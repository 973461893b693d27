//! One-shot shell commands

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::Command;

use super::ids;
use crate::runner;

/// A shell command invocation
#[derive(Debug, Clone, Default)]
pub struct ShellCommand<'a> {
    pub command: &'a str,
    pub user: Option<&'a str>,
    pub cwd: Option<&'a Path>,
    pub environment: Option<&'a BTreeMap<String, String>>,
}

impl ShellCommand<'_> {
    /// Build the process, switching identity when a user is set
    pub fn build(&self, shell: &str) -> Result<Command> {
        let mut cmd = Command::new(shell);
        cmd.arg("-c").arg(self.command);

        if let Some(name) = self.user {
            let account =
                ids::user(name)?.with_context(|| format!("Unknown user '{name}'"))?;
            cmd.uid(account.uid)
                .gid(account.gid)
                .env("HOME", &account.home)
                .env("USER", name)
                .env("LOGNAME", name);
            if self.cwd.is_none() && account.home.is_dir() {
                cmd.current_dir(&account.home);
            }
        }

        if let Some(dir) = self.cwd {
            cmd.current_dir(dir);
        }

        if let Some(env) = self.environment {
            cmd.envs(env);
        }

        Ok(cmd)
    }

    /// Run to completion; a non-zero exit is an error
    pub fn run(&self, shell: &str) -> Result<()> {
        let mut cmd = self.build(shell)?;
        runner::run_checked(&mut cmd)?;
        Ok(())
    }
}
