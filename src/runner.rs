//! Process helpers for invoking external tools

use anyhow::{Context, Result, bail};
use std::process::{Command, Output, Stdio};

/// Describe a command for error messages
pub fn describe(cmd: &Command) -> String {
    let args: Vec<String> = cmd
        .get_args()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();
    format!("{} {}", cmd.get_program().to_string_lossy(), args.join(" "))
        .trim_end()
        .to_string()
}

/// Run a prepared command, failing on a non-zero exit
///
/// Stdin is closed so external tools can never wait for input.
pub fn run_checked(cmd: &mut Command) -> Result<Output> {
    let what = describe(cmd);
    log::debug!("exec: {what}");

    let output = cmd
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("Failed to execute: {what}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let detail = if stderr.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            stderr.trim().to_string()
        };
        bail!("`{}` failed ({}): {}", what, output.status, detail);
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
        log::trace!("{what}: {}", stdout.trim());
    }

    Ok(output)
}

/// Run a query command whose exit status is the answer
///
/// Failing to spawn the tool is an error, not a "no".
pub fn succeeds(cmd: &str, args: &[&str]) -> Result<bool> {
    let status = Command::new(cmd)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .with_context(|| format!("Failed to execute: {} {}", cmd, args.join(" ")))?;
    Ok(status.success())
}

/// Check if a command exists
pub fn command_exists(cmd: &str) -> bool {
    if cmd.contains('/') {
        return std::path::Path::new(cmd).exists();
    }
    Command::new("which")
        .arg(cmd)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_joins_program_and_args() {
        let mut cmd = Command::new("systemctl");
        cmd.args(["is-active", "--quiet", "svc.service"]);
        assert_eq!(describe(&cmd), "systemctl is-active --quiet svc.service");
    }

    #[test]
    fn run_checked_reports_stderr() {
        let err = run_checked(Command::new("sh").args(["-c", "echo boom >&2; exit 3"]))
            .unwrap_err()
            .to_string();
        assert!(err.contains("boom"), "{err}");
    }

    #[test]
    fn succeeds_distinguishes_exit_from_spawn_failure() {
        assert!(succeeds("sh", &["-c", "exit 0"]).unwrap());
        assert!(!succeeds("sh", &["-c", "exit 1"]).unwrap());
        assert!(succeeds("definitely-not-a-real-tool-xyz", &[]).is_err());
    }

    #[test]
    fn command_exists_checks_path() {
        assert!(command_exists("sh"));
        assert!(!command_exists("definitely-not-a-real-tool-xyz"));
        assert!(command_exists("/bin/sh"));
    }
}
