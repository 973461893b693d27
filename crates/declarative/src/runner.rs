//! Convergence runner - drives one pass over a desired state
//!
//! The pass is strictly sequential: resource `i` is evaluated, applied if
//! needed and recorded before resource `i + 1` is looked at. Deferred
//! actions run only after every resource succeeded. The first failure ends
//! the run.

use crate::context::{ActionExecutor, GuardEvaluator, NoProgress, ProgressCallback};
use crate::error::Error;
use crate::planner::DesiredState;
use crate::resource::Resource;
use crate::types::{ChangeRecord, DeferredRecord, RunState, RunSummary};

/// Result of one convergence run
#[derive(Debug)]
pub struct RunReport {
    /// One record per resource that completed, in declaration order
    pub records: Vec<ChangeRecord>,
    /// Deferred actions that ran, in execution order
    pub deferred: Vec<DeferredRecord>,
    /// The failure that ended the run, if any
    pub error: Option<Error>,
}

impl RunReport {
    /// Whether the run reached `Done`
    pub fn is_done(&self) -> bool {
        self.error.is_none()
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary::from_records(&self.records, &self.deferred)
    }

    /// Record of a resource by its rendered identity (`kind[name]`)
    pub fn record(&self, identity: &str) -> Option<&ChangeRecord> {
        self.records
            .iter()
            .find(|r| r.identity.to_string() == identity)
    }

    /// Turn the report into its terminal outcome
    pub fn into_result(self) -> Result<RunSummary, Error> {
        let summary = self.summary();
        match self.error {
            None => Ok(summary),
            Some(err) => Err(err),
        }
    }
}

/// Drives GuardEvaluator, ActionExecutor and the notification bus
///
/// # Type Parameters
/// * `G` - Guard evaluator
/// * `E` - Action executor
/// * `P` - Progress callback
pub struct ConvergenceRunner<G, E, P = NoProgress> {
    guards: G,
    executor: E,
    progress: P,
    state: RunState,
}

impl<G, E> ConvergenceRunner<G, E, NoProgress>
where
    G: GuardEvaluator,
    E: ActionExecutor,
{
    pub fn new(guards: G, executor: E) -> Self {
        Self {
            guards,
            executor,
            progress: NoProgress,
            state: RunState::Pending,
        }
    }
}

impl<G, E, P> ConvergenceRunner<G, E, P>
where
    G: GuardEvaluator,
    E: ActionExecutor,
    P: ProgressCallback,
{
    /// Replace the progress callback
    pub fn with_progress<Q: ProgressCallback>(self, progress: Q) -> ConvergenceRunner<G, E, Q> {
        ConvergenceRunner {
            guards: self.guards,
            executor: self.executor,
            progress,
            state: self.state,
        }
    }

    /// Current state machine position
    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn into_parts(self) -> (G, E, P) {
        (self.guards, self.executor, self.progress)
    }

    /// Converge the host to `desired`, consuming it
    pub fn run(&mut self, desired: DesiredState) -> RunReport {
        self.transition(RunState::Pending);

        let (resources, mut bus) = desired.into_parts();
        let total = resources.len();
        let mut records = Vec::with_capacity(total);

        for (index, resource) in resources.iter().enumerate() {
            let record = match self.converge(index, total, resource) {
                Ok(record) => record,
                Err(err) => return self.fail(records, Vec::new(), err),
            };

            self.transition(RunState::Recording(index));
            bus.notify(&record.identity, record.changed);
            self.progress.on_resource_complete(&record);
            records.push(record);
        }

        self.transition(RunState::Draining);
        let queued = bus.drain();
        self.progress.on_drain_start(queued.len());

        let mut deferred = Vec::with_capacity(queued.len());
        for entry in queued {
            log::info!(
                "running deferred {} (triggered by {})",
                entry.action,
                entry
                    .triggered_by
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            );

            if let Err(source) = self.executor.run_deferred(&entry.action) {
                let err = Error::NotificationDrainFailure {
                    action: entry.action,
                    source,
                };
                return self.fail(records, deferred, err);
            }

            self.progress.on_deferred_complete(&entry.action);
            deferred.push(entry);
        }

        self.transition(RunState::Done);
        RunReport {
            records,
            deferred,
            error: None,
        }
    }

    /// Evaluate and, if needed, apply one resource
    fn converge(
        &mut self,
        index: usize,
        total: usize,
        resource: &Resource,
    ) -> Result<ChangeRecord, Error> {
        self.transition(RunState::Evaluating(index));
        self.progress.on_resource_start(index, total, resource);

        let identity = resource.identity();
        let satisfied =
            self.guards
                .satisfied(resource)
                .map_err(|source| Error::GuardEvaluation {
                    identity: identity.clone(),
                    source,
                })?;

        if satisfied {
            log::info!("{identity}: guard satisfied, skipping");
            return Ok(ChangeRecord::satisfied(identity));
        }

        self.transition(RunState::Applying(index));
        let outcome = self
            .executor
            .apply(resource)
            .map_err(|source| Error::ActionFailure {
                identity: identity.clone(),
                source,
            })?;

        // An action must leave its own guard satisfied.
        if let Some(guard) = &resource.guard {
            let holds =
                self.guards
                    .satisfied(resource)
                    .map_err(|source| Error::GuardEvaluation {
                        identity: identity.clone(),
                        source,
                    })?;
            if !holds {
                return Err(Error::ActionFailure {
                    identity,
                    source: anyhow::anyhow!("guard {guard} still unsatisfied after the action"),
                });
            }
        }

        log::info!(
            "{identity}: applied ({})",
            if outcome.changed { "changed" } else { "no change" }
        );
        Ok(ChangeRecord::applied(identity, outcome))
    }

    fn fail(
        &mut self,
        records: Vec<ChangeRecord>,
        deferred: Vec<DeferredRecord>,
        err: Error,
    ) -> RunReport {
        log::error!("{err}");
        self.transition(RunState::Failed);
        RunReport {
            records,
            deferred,
            error: Some(err),
        }
    }

    fn transition(&mut self, next: RunState) {
        log::trace!("{} -> {}", self.state, next);
        self.progress.on_state(&next);
        self.state = next;
    }
}

/// Run `desired` against the given guards and executor without progress output
pub fn converge<G, E>(guards: G, executor: E, desired: DesiredState) -> RunReport
where
    G: GuardEvaluator,
    E: ActionExecutor,
{
    ConvergenceRunner::new(guards, executor).run(desired)
}
