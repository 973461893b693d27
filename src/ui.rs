use anyhow::{Result, bail};
use colored::Colorize;

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Whether a person is at the terminal
pub fn is_interactive() -> bool {
    console::Term::stdout().is_term() && console::Term::stderr().is_term()
}

/// Ask before making changes
///
/// `yes` skips the prompt. Without a terminal there is nobody to ask, so
/// the caller must pass `yes` explicitly.
pub fn confirm(prompt: &str, yes: bool) -> Result<bool> {
    if yes {
        return Ok(true);
    }
    if !is_interactive() {
        bail!("Not running in a terminal; pass --yes to apply without confirmation");
    }

    let confirmed = dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(true)
        .interact()?;
    Ok(confirmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yes_skips_the_prompt() {
        assert!(confirm("Apply?", true).unwrap());
    }
}
