//! Computes the order in which modules are deployed
//!
//! Link dependencies and constructor argument dependencies are edges of a
//! single graph; a module is only ready once every module it links against
//! *and* every module whose address it takes as an argument has been placed.
//! Among ready modules the earliest registered one is placed first, so the
//! resulting plan only depends on the registry's contents and order.

use std::collections::BTreeSet;

use tracing::{debug, error};

use crate::{errors::DeployError, registry::ModuleRegistry, types::ModuleId};

/// An ordered sequence of modules in which every module appears after all
/// of its dependencies
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeploymentPlan {
    /// The modules in deployment order
    order: Vec<ModuleId>,
}

impl DeploymentPlan {
    /// The modules in deployment order
    pub fn modules(&self) -> &[ModuleId] {
        &self.order
    }

    /// The number of modules in the plan
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the plan is empty
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// The position of a module in the plan
    pub fn position(&self, id: &ModuleId) -> Option<usize> {
        self.order.iter().position(|m| m == id)
    }
}

/// Resolve a deployment plan for the registered modules.
///
/// Fails with [`DeployError::UnknownModule`] if a module depends on an
/// unregistered module, and with [`DeployError::CyclicDependency`] if no
/// valid order exists.
pub fn resolve(registry: &ModuleRegistry) -> Result<DeploymentPlan, DeployError> {
    let n = registry.len();

    // Dependencies of each module, by registration index
    let deps = registry
        .iter()
        .map(|module| {
            module
                .dependencies()
                .into_iter()
                .map(|dep| registry.position(dep))
                .collect::<Result<Vec<_>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut dependents = vec![Vec::new(); n];
    for (i, module_deps) in deps.iter().enumerate() {
        for &dep in module_deps {
            dependents[dep].push(i);
        }
    }

    // Kahn's algorithm, always taking the earliest registered ready module
    let mut unresolved: Vec<usize> = deps.iter().map(Vec::len).collect();
    let mut ready: BTreeSet<usize> = (0..n).filter(|&i| unresolved[i] == 0).collect();
    let mut order = Vec::with_capacity(n);

    while let Some(next) = ready.pop_first() {
        order.push(next);
        for &dependent in &dependents[next] {
            unresolved[dependent] -= 1;
            if unresolved[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    let ids: Vec<&ModuleId> = registry.iter().map(|module| &module.id).collect();
    if order.len() < n {
        let cycle: Vec<ModuleId> = find_cycle(&deps, &unresolved)
            .into_iter()
            .map(|i| ids[i].clone())
            .collect();
        error!(?cycle, "dependency cycle detected");
        return Err(DeployError::CyclicDependency(cycle));
    }

    let order: Vec<ModuleId> = order.into_iter().map(|i| ids[i].clone()).collect();
    debug!(?order, "resolved deployment plan");
    Ok(DeploymentPlan { order })
}

/// Find one cycle among the modules Kahn's algorithm could not place.
///
/// Every unplaced module has at least one unplaced dependency, so walking
/// from one unplaced module to its earliest registered unplaced dependency
/// must eventually revisit a module. The cycle is returned starting at its
/// earliest registered member.
fn find_cycle(deps: &[Vec<usize>], unresolved: &[usize]) -> Vec<usize> {
    let stuck = |i: usize| unresolved[i] > 0;
    let Some(start) = (0..deps.len()).find(|&i| stuck(i)) else {
        return Vec::new();
    };

    let mut visited_at = vec![None; deps.len()];
    let mut path = Vec::new();
    let mut current = start;
    loop {
        if let Some(pos) = visited_at[current] {
            let mut cycle = path.split_off(pos);
            let first = cycle.iter().enumerate().min_by_key(|&(_, &i)| i).map(|(p, _)| p);
            cycle.rotate_left(first.unwrap_or_default());
            return cycle;
        }

        visited_at[current] = Some(path.len());
        path.push(current);
        match deps[current].iter().copied().filter(|&d| stuck(d)).min() {
            Some(next) => current = next,
            // Unreachable given Kahn's invariant, report every stuck module
            None => return (0..deps.len()).filter(|&i| stuck(i)).collect(),
        }
    }
}
