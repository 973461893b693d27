//! Core types for convergence runs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Kind of a declared resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    PackageSet,
    User,
    Group,
    Directory,
    File,
    Template,
    Command,
    ServiceEnable,
    ServiceStart,
}

impl ResourceKind {
    /// Stable lowercase name, used in identities
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PackageSet => "package_set",
            Self::User => "user",
            Self::Group => "group",
            Self::Directory => "directory",
            Self::File => "file",
            Self::Template => "template",
            Self::Command => "command",
            Self::ServiceEnable => "service_enable",
            Self::ServiceStart => "service_start",
        }
    }

    /// Whether the action for this kind has no idempotency of its own.
    ///
    /// Resources of these kinds must carry a guard.
    pub fn requires_guard(&self) -> bool {
        matches!(self, Self::Command | Self::File)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unique key of a resource within one desired state: `kind[name]`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity {
    pub kind: ResourceKind,
    pub name: String,
}

impl Identity {
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.kind, self.name)
    }
}

/// Predicate telling whether a resource is already satisfied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Guard {
    /// Satisfied when the path exists
    PathExists { path: PathBuf },
    /// Satisfied when the marker file of an interpreter dependency exists
    Marker { dir: PathBuf, dependency: String },
}

impl Guard {
    pub fn path_exists(path: impl AsRef<Path>) -> Self {
        Self::PathExists {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn marker(dir: impl AsRef<Path>, dependency: &str) -> Self {
        Self::Marker {
            dir: dir.as_ref().to_path_buf(),
            dependency: dependency.to_string(),
        }
    }

    /// The host path whose existence decides this guard
    pub fn path(&self) -> PathBuf {
        match self {
            Self::PathExists { path } => path.clone(),
            Self::Marker { dir, dependency } => dir.join(marker_file_name(dependency)),
        }
    }
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PathExists { path } => write!(f, "exists({})", path.display()),
            Self::Marker { dependency, .. } => {
                write!(f, "marker({}: {})", dependency, self.path().display())
            }
        }
    }
}

/// File name of the marker recording that `dependency` was installed
pub fn marker_file_name(dependency: &str) -> String {
    format!("pip_dep_{dependency}_installed")
}

/// Action scheduled by a notification edge and run after the main pass
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DeferredAction {
    Restart { unit: String },
    Reload { unit: String },
}

impl DeferredAction {
    pub fn restart(unit: &str) -> Self {
        Self::Restart {
            unit: unit.to_string(),
        }
    }

    pub fn reload(unit: &str) -> Self {
        Self::Reload {
            unit: unit.to_string(),
        }
    }

    /// Service unit this action targets
    pub fn unit(&self) -> &str {
        match self {
            Self::Restart { unit } | Self::Reload { unit } => unit,
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            Self::Restart { .. } => "restart",
            Self::Reload { .. } => "reload",
        }
    }
}

impl fmt::Display for DeferredAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.verb(), self.unit())
    }
}

/// What an executor reports after realizing a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChangeOutcome {
    /// Whether host state was actually altered
    pub changed: bool,
}

impl ChangeOutcome {
    pub fn changed() -> Self {
        Self { changed: true }
    }

    pub fn unchanged() -> Self {
        Self { changed: false }
    }

    /// Changed if `changed` is true
    pub fn from_bool(changed: bool) -> Self {
        Self { changed }
    }

    /// Combine two outcomes of the same resource
    pub fn merge(self, other: Self) -> Self {
        Self {
            changed: self.changed || other.changed,
        }
    }
}

/// Per-resource result of a convergence run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub identity: Identity,
    /// False when the guard was already satisfied
    pub applied: bool,
    pub changed: bool,
}

impl ChangeRecord {
    pub fn satisfied(identity: Identity) -> Self {
        Self {
            identity,
            applied: false,
            changed: false,
        }
    }

    pub fn applied(identity: Identity, outcome: ChangeOutcome) -> Self {
        Self {
            identity,
            applied: true,
            changed: outcome.changed,
        }
    }
}

/// A deferred action that ran during draining
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredRecord {
    pub action: DeferredAction,
    /// Sources that reported a change and queued this action
    pub triggered_by: Vec<Identity>,
}

/// Runner state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Pending,
    Evaluating(usize),
    Applying(usize),
    Recording(usize),
    Draining,
    Done,
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Evaluating(i) => write!(f, "evaluating({i})"),
            Self::Applying(i) => write!(f, "applying({i})"),
            Self::Recording(i) => write!(f, "recording({i})"),
            Self::Draining => write!(f, "draining"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Counts over the records of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub satisfied: usize,
    pub changed: usize,
    pub unchanged: usize,
    pub deferred: usize,
}

impl RunSummary {
    pub fn from_records(records: &[ChangeRecord], deferred: &[DeferredRecord]) -> Self {
        let mut summary = Self::default();
        for record in records {
            match (record.applied, record.changed) {
                (false, _) => summary.satisfied += 1,
                (true, true) => summary.changed += 1,
                (true, false) => summary.unchanged += 1,
            }
        }
        summary.deferred = deferred.len();
        summary
    }

    /// Total number of resources processed
    pub fn total(&self) -> usize {
        self.satisfied + self.changed + self.unchanged
    }
}
