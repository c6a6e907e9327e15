//! Transactional application and reversal of migration steps.
//!
//! Per step, the state machine is `Pending -> Applying -> Applied`. The
//! `Applying` state is the transaction-local working clone of the schema
//! state; it is never persisted and never observable. A failure drops the
//! clone and the step stays `Pending`. `revert` walks `Applied -> Pending`.

use crate::core::{MigrateError, Result};
use crate::migrate::{MigrationStep, StepId, StepRegistry, plan};
use crate::schema::{JournalRecord, SchemaState, SchemaStore};
use log::{debug, info};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// The step was already applied; nothing was re-executed.
    AlreadyApplied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevertOutcome {
    Reverted,
    /// The step was not applied; nothing to do.
    NotApplied,
}

/// Drives steps through apply/revert against a schema state and its store.
///
/// Assumes the single-writer discipline: the caller holds the run lock for
/// the duration of a run. Each apply or revert is one transaction; no
/// transaction ever spans two steps.
pub struct Applier<'a> {
    state: &'a mut SchemaState,
    store: &'a mut SchemaStore,
}

impl<'a> Applier<'a> {
    pub fn new(state: &'a mut SchemaState, store: &'a mut SchemaStore) -> Self {
        Self { state, store }
    }

    /// Apply one step. Idempotent: an already-applied step is a successful
    /// no-op. All operations and the applied-set update commit together;
    /// on any failure the working copy is dropped and nothing changes.
    pub fn apply(&mut self, step: &MigrationStep) -> Result<ApplyOutcome> {
        if self.state.is_applied(&step.id) {
            debug!("step {} already applied, skipping", step.id);
            return Ok(ApplyOutcome::AlreadyApplied);
        }

        for dep in &step.dependencies {
            if !self.state.is_applied(dep) {
                return Err(MigrateError::MissingDependency {
                    step: step.id.to_string(),
                    dependency: dep.to_string(),
                });
            }
        }

        let mut working = self.state.clone();
        for operation in &step.operations {
            operation
                .apply(&mut working)
                .map_err(|e| MigrateError::OperationFailed {
                    operation: operation.describe(),
                    source: Box::new(e),
                })?;
        }
        working.mark_applied(step.id.clone());

        self.store
            .commit(&working, JournalRecord::applied(step.id.clone()))?;
        *self.state = working;
        info!("applied step {} ({} operations)", step.id, step.operations.len());
        Ok(ApplyOutcome::Applied)
    }

    /// Revert one step by applying operation inverses in reverse order.
    ///
    /// Fails before any mutation when an operation has no inverse or when an
    /// applied step still depends on this one.
    pub fn revert(
        &mut self,
        step: &MigrationStep,
        registry: &StepRegistry,
    ) -> Result<RevertOutcome> {
        if !self.state.is_applied(&step.id) {
            debug!("step {} not applied, nothing to revert", step.id);
            return Ok(RevertOutcome::NotApplied);
        }

        let dependents: Vec<String> = registry
            .dependents(&step.id)
            .into_iter()
            .filter(|id| self.state.is_applied(id))
            .map(|id| id.to_string())
            .collect();
        if !dependents.is_empty() {
            return Err(MigrateError::DependentStepsStillApplied {
                step: step.id.to_string(),
                dependents,
            });
        }

        let mut inverses = Vec::with_capacity(step.operations.len());
        for operation in step.operations.iter().rev() {
            let inverse = operation
                .inverse()
                .ok_or_else(|| MigrateError::NotReversible {
                    operation: operation.describe(),
                })?;
            inverses.push(inverse);
        }

        let mut working = self.state.clone();
        for inverse in &inverses {
            inverse
                .apply(&mut working)
                .map_err(|e| MigrateError::OperationFailed {
                    operation: inverse.describe(),
                    source: Box::new(e),
                })?;
        }
        working.mark_reverted(&step.id);

        self.store
            .commit(&working, JournalRecord::reverted(step.id.clone()))?;
        *self.state = working;
        info!("reverted step {}", step.id);
        Ok(RevertOutcome::Reverted)
    }

    /// Plan and apply every unapplied step. Stops at the first error; steps
    /// applied before the failure stay applied (there is no cross-step
    /// transaction), so an aborted run leaves a valid prefix.
    pub fn migrate_all(&mut self, registry: &StepRegistry) -> Result<Vec<StepId>> {
        let order: Vec<MigrationStep> = plan(registry, self.state.applied_steps())?
            .into_iter()
            .cloned()
            .collect();

        let mut applied = Vec::new();
        for step in &order {
            self.apply(step)?;
            applied.push(step.id.clone());
        }
        Ok(applied)
    }

    /// Plan and apply only the target step and its transitive dependencies.
    pub fn migrate_to(&mut self, registry: &StepRegistry, target: &StepId) -> Result<Vec<StepId>> {
        registry.require(target)?;

        let mut closure = BTreeSet::new();
        let mut stack = vec![target.clone()];
        while let Some(id) = stack.pop() {
            if !closure.insert(id.clone()) {
                continue;
            }
            if let Some(step) = registry.get(&id) {
                stack.extend(step.dependencies.iter().cloned());
            }
        }

        let order: Vec<MigrationStep> = plan(registry, self.state.applied_steps())?
            .into_iter()
            .filter(|step| closure.contains(&step.id))
            .cloned()
            .collect();

        let mut applied = Vec::new();
        for step in &order {
            self.apply(step)?;
            applied.push(step.id.clone());
        }
        Ok(applied)
    }
}
