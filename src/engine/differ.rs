//! Plan display

use colored::Colorize;
use declarative::{PlanEntry, PlanStatus, PlanSummary, ResourceKind, group_by_kind};

/// Section title for a resource kind
pub fn kind_title(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::PackageSet => "Packages",
        ResourceKind::User => "Users",
        ResourceKind::Group => "Groups",
        ResourceKind::Directory => "Directories",
        ResourceKind::File => "Files",
        ResourceKind::Template => "Templates",
        ResourceKind::Command => "Commands",
        ResourceKind::ServiceEnable => "Enabled services",
        ResourceKind::ServiceStart => "Running services",
    }
}

fn status_symbol(status: PlanStatus) -> colored::ColoredString {
    match status {
        PlanStatus::Satisfied => "○".dimmed(),
        PlanStatus::WillApply => "+".green(),
        PlanStatus::Converge => "~".yellow(),
    }
}

fn status_label(status: PlanStatus) -> &'static str {
    match status {
        PlanStatus::Satisfied => "(satisfied)",
        PlanStatus::WillApply => "(will run)",
        PlanStatus::Converge => "(converge)",
    }
}

/// Display planned resources grouped by kind
pub fn display_plan(entries: &[PlanEntry]) {
    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Convergence Plan".bold()
    );
    println!("│");

    for (kind, group) in group_by_kind(entries) {
        println!("│ {}", kind_title(kind).bold());
        for entry in group {
            let notify = if entry.may_notify.is_empty() {
                String::new()
            } else {
                let actions: Vec<String> = entry.may_notify.iter().map(ToString::to_string).collect();
                format!(" → {}", actions.join(", ")).cyan().to_string()
            };
            println!(
                "│   {} {} {}{}",
                status_symbol(entry.status),
                entry.description,
                status_label(entry.status).dimmed(),
                notify
            );
        }
        println!("│");
    }

    println!("└───────────────────────────────────────────────────────────┘");
    display_plan_summary(&PlanSummary::from_entries(entries));
}

fn display_plan_summary(summary: &PlanSummary) {
    println!();
    println!(
        "  {} satisfied, {} will run, {} to converge ({} total)",
        summary.satisfied.to_string().dimmed(),
        summary.will_apply.to_string().green(),
        summary.converge.to_string().yellow(),
        summary.total()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_a_title() {
        let kinds = [
            ResourceKind::PackageSet,
            ResourceKind::User,
            ResourceKind::Group,
            ResourceKind::Directory,
            ResourceKind::File,
            ResourceKind::Template,
            ResourceKind::Command,
            ResourceKind::ServiceEnable,
            ResourceKind::ServiceStart,
        ];
        for kind in kinds {
            assert!(!kind_title(kind).is_empty());
        }
    }

    #[test]
    fn labels_differ_by_status() {
        assert_ne!(
            status_label(PlanStatus::Satisfied),
            status_label(PlanStatus::WillApply)
        );
        assert_ne!(
            status_label(PlanStatus::WillApply),
            status_label(PlanStatus::Converge)
        );
    }
}
