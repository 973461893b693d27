//! Dry-run planning: evaluate guards without touching the executor

use crate::context::GuardEvaluator;
use crate::error::Error;
use crate::planner::DesiredState;
use crate::types::{DeferredAction, Identity, ResourceKind};
use serde::Serialize;

/// What a run would do with one resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// Guard holds; the action would not run
    Satisfied,
    /// Guard does not hold; the action would run
    WillApply,
    /// No guard; the executor runs and reports whether anything changed
    Converge,
}

/// A planned resource
#[derive(Debug, Clone, Serialize)]
pub struct PlanEntry {
    pub identity: Identity,
    pub description: String,
    pub status: PlanStatus,
    /// Deferred actions queued if this resource changes
    pub may_notify: Vec<DeferredAction>,
}

impl PlanEntry {
    pub fn would_run(&self) -> bool {
        !matches!(self.status, PlanStatus::Satisfied)
    }
}

/// Evaluate every guard of `desired` in order
///
/// Guard errors abort planning exactly as they would abort a run.
pub fn plan<G: GuardEvaluator>(desired: &DesiredState, guards: &G) -> Result<Vec<PlanEntry>, Error> {
    desired
        .resources()
        .iter()
        .map(|resource| -> Result<PlanEntry, Error> {
            let identity = resource.identity();
            let status = if resource.guard.is_none() {
                PlanStatus::Converge
            } else if guards
                .satisfied(resource)
                .map_err(|source| Error::GuardEvaluation {
                    identity: identity.clone(),
                    source,
                })?
            {
                PlanStatus::Satisfied
            } else {
                PlanStatus::WillApply
            };

            let may_notify = desired
                .bus()
                .actions_for(&identity)
                .into_iter()
                .cloned()
                .collect();

            Ok(PlanEntry {
                description: resource.description(),
                identity,
                status,
                may_notify,
            })
        })
        .collect()
}

/// Plan summary statistics
#[derive(Debug, Clone, Default)]
pub struct PlanSummary {
    pub satisfied: usize,
    pub will_apply: usize,
    pub converge: usize,
}

impl PlanSummary {
    pub fn from_entries(entries: &[PlanEntry]) -> Self {
        let mut summary = Self::default();
        for entry in entries {
            match entry.status {
                PlanStatus::Satisfied => summary.satisfied += 1,
                PlanStatus::WillApply => summary.will_apply += 1,
                PlanStatus::Converge => summary.converge += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.satisfied + self.will_apply + self.converge
    }
}

/// Group entries by resource kind, keeping declaration order inside groups
pub fn group_by_kind(entries: &[PlanEntry]) -> Vec<(ResourceKind, Vec<&PlanEntry>)> {
    let mut groups: Vec<(ResourceKind, Vec<&PlanEntry>)> = Vec::new();
    for entry in entries {
        match groups.iter_mut().find(|(kind, _)| *kind == entry.identity.kind) {
            Some((_, group)) => group.push(entry),
            None => groups.push((entry.identity.kind, vec![entry])),
        }
    }
    groups
}
