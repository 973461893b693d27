use anyhow::{Result, bail};
use colored::Colorize;

use crate::Context;
use crate::cli::ProfileArgs;
use crate::config::{self, Loaded};
use crate::engine::ExecutionPlan;
use crate::host::ids;
use crate::runner;
use crate::schema::Tools;
use crate::ui;

struct Issue {
    category: &'static str,
    summary: String,
    detail: Option<String>,
    fix: Option<String>,
}

/// Tools the host executor shells out to besides the configured ones
const SYSTEM_TOOLS: &[(&str, &str)] = &[
    ("dpkg-query", "Package presence checks"),
    ("useradd", "User creation"),
    ("groupadd", "Group creation"),
    ("gpasswd", "Group membership"),
    ("openssl", "Certificate generation"),
];

pub fn run(ctx: &Context, args: &ProfileArgs) -> Result<()> {
    ui::header("Host Readiness Check");

    let mut issues: Vec<Issue> = Vec::new();

    check_privileges(&mut issues);

    let loaded = check_config(ctx, args, &mut issues);
    let tools = loaded
        .as_ref()
        .map(|l| l.config.tools.clone())
        .unwrap_or_default();
    check_tools(&tools, &mut issues);

    if let Some(loaded) = &loaded {
        check_templates(loaded, &mut issues);
    }

    println!();
    if issues.is_empty() {
        ui::success("Host is ready to converge");
        return Ok(());
    }

    print_issue_summary(&issues);
    bail!("{} issue(s) found", issues.len())
}

fn print_issue_summary(issues: &[Issue]) {
    let count = issues.len();
    let label = if count == 1 { "Issue" } else { "Issues" };
    ui::header(&format!("{count} {label} Found"));

    for (i, issue) in issues.iter().enumerate() {
        let num = i + 1;
        println!(
            "  {}  {} {}",
            format!("{num}.").bold(),
            issue.summary,
            format!("[{}]", issue.category).dimmed()
        );
        if let Some(detail) = &issue.detail {
            for line in detail.lines() {
                println!("      {}", line.dimmed());
            }
        }
        if let Some(fix) = &issue.fix {
            println!("      {} {}", "Fix:".cyan(), fix);
        }
        println!();
    }
}

fn check_privileges(issues: &mut Vec<Issue>) {
    ui::section("Privileges");

    if ids::is_root() {
        println!("  {} running as root", "✓".green());
    } else {
        println!("  {} not running as root", "✗".red());
        issues.push(Issue {
            category: "Privileges",
            summary: "apply needs root".into(),
            detail: Some("Accounts, ownership and services can only be changed by root".into()),
            fix: Some("Run converge with sudo".into()),
        });
    }
}

fn check_config(ctx: &Context, args: &ProfileArgs, issues: &mut Vec<Issue>) -> Option<Loaded> {
    ui::section("Configuration");

    let loaded = match config::load(ctx.config.as_deref(), args.profile) {
        Ok(loaded) => loaded,
        Err(e) => {
            println!("  {} configuration {}", "✗".red(), "(invalid)".red());
            issues.push(Issue {
                category: "Configuration",
                summary: "configuration could not be loaded".into(),
                detail: Some(format!("{e:#}")),
                fix: Some("Fix the file, then run `converge check`".into()),
            });
            return None;
        }
    };

    println!(
        "  {} {} - {} profile",
        "✓".green(),
        loaded.origin(),
        loaded.config.profile
    );

    if let Err(e) = ExecutionPlan::build(&loaded.config) {
        println!("  {} desired state {}", "✗".red(), "(invalid)".red());
        issues.push(Issue {
            category: "Configuration",
            summary: "desired state is invalid".into(),
            detail: Some(format!("{e:#}")),
            fix: Some("Run `converge check` for details".into()),
        });
    }

    Some(loaded)
}

fn check_tools(tools: &Tools, issues: &mut Vec<Issue>) {
    ui::section("Required Commands");

    let configured = tools.entries().map(|(key, tool)| (tool.to_string(), key));
    let system = SYSTEM_TOOLS
        .iter()
        .map(|(tool, desc)| ((*tool).to_string(), *desc));

    for (tool, desc) in configured.into_iter().chain(system) {
        if runner::command_exists(&tool) {
            println!("  {} {} - {}", "✓".green(), tool, desc.dimmed());
        } else {
            println!("  {} {} - {} {}", "✗".red(), tool, desc, "(missing)".red());
            issues.push(Issue {
                category: "Required Commands",
                summary: format!("{tool} is not installed"),
                detail: Some(format!("{desc} - required to converge this host")),
                fix: Some(format!("Install {tool} or set it under [tools]")),
            });
        }
    }
}

fn check_templates(loaded: &Loaded, issues: &mut Vec<Issue>) {
    ui::section("Templates");

    let dir = &loaded.config.template_dir;
    if !dir.is_dir() {
        println!("  {} {} {}", "✗".red(), dir.display(), "(missing)".red());
        issues.push(Issue {
            category: "Templates",
            summary: format!("template directory {} does not exist", dir.display()),
            detail: None,
            fix: Some("Create it or set template_dir".into()),
        });
        return;
    }

    let Ok(plan) = ExecutionPlan::build(&loaded.config) else {
        return;
    };

    for source in plan.template_sources() {
        let path = dir.join(source);
        if path.is_file() {
            println!("  {} {}", "✓".green(), source);
        } else {
            println!("  {} {} {}", "✗".red(), source, "(missing)".red());
            issues.push(Issue {
                category: "Templates",
                summary: format!("template {source} is missing"),
                detail: Some(format!("Expected at {}", path.display())),
                fix: Some(format!("Copy {source} into {}", dir.display())),
            });
        }
    }
}
