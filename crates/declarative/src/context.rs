//! Capability traits the runner is generic over
//!
//! These traits keep the engine free of host specifics: the binary plugs
//! in real implementations, tests plug in in-memory fakes.

use crate::resource::Resource;
use crate::types::{ChangeOutcome, ChangeRecord, DeferredAction, RunState};
use anyhow::Result;

/// Decides whether a resource's desired state already holds
///
/// Implementations must only read host state.
pub trait GuardEvaluator {
    /// `Ok(false)` when the resource has no guard
    fn satisfied(&self, resource: &Resource) -> Result<bool>;
}

/// Performs the external effect that realizes a resource
pub trait ActionExecutor {
    /// Converge one resource, reporting whether host state changed
    fn apply(&mut self, resource: &Resource) -> Result<ChangeOutcome>;

    /// Run a deferred action queued by a notification
    fn run_deferred(&mut self, action: &DeferredAction) -> Result<()>;
}

impl<G: GuardEvaluator + ?Sized> GuardEvaluator for &G {
    fn satisfied(&self, resource: &Resource) -> Result<bool> {
        (**self).satisfied(resource)
    }
}

impl<E: ActionExecutor + ?Sized> ActionExecutor for &mut E {
    fn apply(&mut self, resource: &Resource) -> Result<ChangeOutcome> {
        (**self).apply(resource)
    }

    fn run_deferred(&mut self, action: &DeferredAction) -> Result<()> {
        (**self).run_deferred(action)
    }
}

/// Progress callback for convergence runs
///
/// Implement this trait to receive progress updates during a run.
pub trait ProgressCallback {
    /// Called on every state machine transition
    fn on_state(&mut self, _state: &RunState) {}

    /// Called when a resource starts evaluating
    fn on_resource_start(&mut self, index: usize, total: usize, resource: &Resource);

    /// Called when a resource has been recorded
    fn on_resource_complete(&mut self, record: &ChangeRecord);

    /// Called before the deferred actions run
    fn on_drain_start(&mut self, count: usize);

    /// Called after each deferred action ran successfully
    fn on_deferred_complete(&mut self, action: &DeferredAction);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_resource_start(&mut self, _index: usize, _total: usize, _resource: &Resource) {}
    fn on_resource_complete(&mut self, _record: &ChangeRecord) {}
    fn on_drain_start(&mut self, _count: usize) {}
    fn on_deferred_complete(&mut self, _action: &DeferredAction) {}
}
