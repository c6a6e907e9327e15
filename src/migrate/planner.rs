//! Dependency-ordered planning of unapplied steps.

use crate::core::{MigrateError, Result};
use crate::migrate::{MigrationStep, StepId, StepRegistry};
use std::collections::{BTreeMap, BTreeSet};

/// Topologically order the unapplied steps by declared dependency.
///
/// Dependencies already in the applied set are satisfied; one that is neither
/// applied nor known fails `MissingDependency`. A cycle among the unapplied
/// steps fails `CyclicDependency`. Ties between independent steps break by
/// lexicographic id, so the plan is reproducible. Never mutates anything.
pub fn plan<'a>(
    registry: &'a StepRegistry,
    applied: &BTreeSet<StepId>,
) -> Result<Vec<&'a MigrationStep>> {
    let pending: BTreeMap<&StepId, &MigrationStep> = registry
        .iter()
        .filter(|step| !applied.contains(&step.id))
        .map(|step| (&step.id, step))
        .collect();

    // Indegree counts only pending dependencies; applied ones are satisfied.
    let mut indegree: BTreeMap<&StepId, usize> = BTreeMap::new();
    let mut dependents: BTreeMap<&StepId, Vec<&StepId>> = BTreeMap::new();
    for step in pending.values() {
        let mut degree = 0;
        for dep in &step.dependencies {
            if applied.contains(dep) {
                continue;
            }
            if !pending.contains_key(dep) {
                return Err(MigrateError::MissingDependency {
                    step: step.id.to_string(),
                    dependency: dep.to_string(),
                });
            }
            degree += 1;
            dependents.entry(dep).or_default().push(&step.id);
        }
        indegree.insert(&step.id, degree);
    }

    let mut ready: BTreeSet<&StepId> = indegree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(id, _)| *id)
        .collect();

    let mut order = Vec::with_capacity(pending.len());
    while let Some(id) = ready.pop_first() {
        order.push(pending[id]);
        for dependent in dependents.get(id).into_iter().flatten() {
            if let Some(degree) = indegree.get_mut(dependent) {
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(dependent);
                }
            }
        }
    }

    if order.len() < pending.len() {
        let ordered: BTreeSet<&StepId> = order.iter().map(|step| &step.id).collect();
        let remaining = pending
            .keys()
            .filter(|id| !ordered.contains(*id))
            .map(|id| id.to_string())
            .collect();
        return Err(MigrateError::CyclicDependency { remaining });
    }

    Ok(order)
}
