//! Deferred notification dispatch
//!
//! Edges are registered while the desired state is loaded. During a run each
//! resource reports whether it changed; changed sources queue their edges'
//! actions. Nothing executes until [`NotificationBus::drain`] at the end of
//! the pass, and each distinct action runs at most once.

use crate::types::{DeferredAction, DeferredRecord, Identity};
use std::collections::HashMap;

/// Producer -> deferred action edge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEdge {
    pub source: Identity,
    pub action: DeferredAction,
}

#[derive(Debug, Clone, Default)]
pub struct NotificationBus {
    /// Distinct actions in first-registration order
    actions: Vec<DeferredAction>,
    /// Sources that queued each action during the current run
    queued: Vec<Option<Vec<Identity>>>,
    /// Source identity -> indices into `actions`
    edges: HashMap<Identity, Vec<usize>>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an edge. Re-registering the same edge is a no-op.
    pub fn register(&mut self, source: Identity, action: DeferredAction) {
        let index = match self.actions.iter().position(|a| *a == action) {
            Some(index) => index,
            None => {
                self.actions.push(action);
                self.queued.push(None);
                self.actions.len() - 1
            }
        };

        let targets = self.edges.entry(source).or_default();
        if !targets.contains(&index) {
            targets.push(index);
        }
    }

    /// Report the outcome of `source`; only a change queues its actions
    pub fn notify(&mut self, source: &Identity, changed: bool) {
        if !changed {
            return;
        }
        let Some(targets) = self.edges.get(source) else {
            return;
        };
        for &index in targets {
            log::debug!("{} queued {}", source, self.actions[index]);
            self.queued[index]
                .get_or_insert_with(Vec::new)
                .push(source.clone());
        }
    }

    /// Whether any action is currently queued
    pub fn has_pending(&self) -> bool {
        self.queued.iter().any(Option::is_some)
    }

    /// Take the queued actions, deduplicated, in first-registration order
    pub fn drain(&mut self) -> Vec<DeferredRecord> {
        self.actions
            .iter()
            .zip(self.queued.iter_mut())
            .filter_map(|(action, queued)| {
                queued.take().map(|triggered_by| DeferredRecord {
                    action: action.clone(),
                    triggered_by,
                })
            })
            .collect()
    }

    /// All registered edges, for display
    pub fn edges(&self) -> Vec<NotificationEdge> {
        let mut edges: Vec<NotificationEdge> = self
            .edges
            .iter()
            .flat_map(|(source, targets)| {
                targets.iter().map(|&index| NotificationEdge {
                    source: source.clone(),
                    action: self.actions[index].clone(),
                })
            })
            .collect();
        edges.sort_by(|a, b| a.source.cmp(&b.source));
        edges
    }

    /// Actions `source` would queue if it changed
    pub fn actions_for(&self, source: &Identity) -> Vec<&DeferredAction> {
        self.edges
            .get(source)
            .map(|targets| targets.iter().map(|&i| &self.actions[i]).collect())
            .unwrap_or_default()
    }
}
