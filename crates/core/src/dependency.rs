//! Workflow-to-workflow dependency graph.
//!
//! Built in two phases. Phase 1 produces one [`ForwardEdges`] list per
//! workflow from its own "Run Workflow" activities; lists are immutable once
//! produced and may contain duplicates. Phase 2 ([`invert`] /
//! [`DependencyMatrix::from_forward`]) runs once after every phase-1 list of
//! a build is available and derives the `called_by` side.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::types::SysId;

/// Directed "calls" relationship between two workflows.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DependencyEdge {
    pub from: SysId,
    pub to: SysId,
}

/// Phase-1 output: workflows invoked by one workflow, in activity order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ForwardEdges {
    pub workflow_id: SysId,
    pub calls: Vec<SysId>,
}

impl ForwardEdges {
    pub fn new(workflow_id: impl Into<SysId>, calls: Vec<SysId>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            calls,
        }
    }
}

/// Both directions of one workflow's dependencies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkflowDependencies {
    pub calls_workflows: Vec<SysId>,
    pub called_by_workflows: Vec<SysId>,
}

/// Invert a forward adjacency map.
///
/// For every `a -> b` in `forward`, the result maps `b` to a set containing
/// `a`. Workflows nobody calls are absent from the result.
pub fn invert(forward: &BTreeMap<SysId, BTreeSet<SysId>>) -> BTreeMap<SysId, BTreeSet<SysId>> {
    let mut inverted: BTreeMap<SysId, BTreeSet<SysId>> = BTreeMap::new();
    for (from, targets) in forward {
        for to in targets {
            inverted
                .entry(to.clone())
                .or_default()
                .insert(from.clone());
        }
    }
    inverted
}

/// Catalog-wide dependency matrix with set semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DependencyMatrix {
    entries: BTreeMap<SysId, WorkflowDependencies>,
}

impl DependencyMatrix {
    /// Run the inversion pass over all phase-1 lists of a build.
    ///
    /// Every scanned workflow gets an entry, as does every call target even
    /// when the target itself was outside the scanned set.
    pub fn from_forward<I>(lists: I) -> Self
    where
        I: IntoIterator<Item = ForwardEdges>,
    {
        let mut forward: BTreeMap<SysId, BTreeSet<SysId>> = BTreeMap::new();
        for list in lists {
            forward
                .entry(list.workflow_id)
                .or_default()
                .extend(list.calls);
        }

        let called_by = invert(&forward);

        let ids: BTreeSet<&SysId> = forward.keys().chain(called_by.keys()).collect();
        let entries = ids
            .into_iter()
            .map(|id| {
                let deps = WorkflowDependencies {
                    calls_workflows: forward
                        .get(id)
                        .map(|s| s.iter().cloned().collect())
                        .unwrap_or_default(),
                    called_by_workflows: called_by
                        .get(id)
                        .map(|s| s.iter().cloned().collect())
                        .unwrap_or_default(),
                };
                (id.clone(), deps)
            })
            .collect();

        Self { entries }
    }

    pub fn get(&self, workflow_id: &str) -> Option<&WorkflowDependencies> {
        self.entries.get(workflow_id)
    }

    /// Dependencies of a workflow; empty when it neither calls nor is called.
    pub fn dependencies(&self, workflow_id: &str) -> WorkflowDependencies {
        self.get(workflow_id).cloned().unwrap_or_default()
    }

    /// Every distinct edge, ordered by `(from, to)`.
    pub fn edges(&self) -> impl Iterator<Item = DependencyEdge> + '_ {
        self.entries.iter().flat_map(|(from, deps)| {
            deps.calls_workflows.iter().map(move |to| DependencyEdge {
                from: from.clone(),
                to: to.clone(),
            })
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SysId, &WorkflowDependencies)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<SysId> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn invert_maps_targets_to_callers() {
        let mut forward = BTreeMap::new();
        forward.insert("a".to_string(), BTreeSet::from(["b".to_string(), "c".to_string()]));
        forward.insert("b".to_string(), BTreeSet::from(["c".to_string()]));

        let inverted = invert(&forward);
        assert_eq!(inverted.len(), 2);
        assert_eq!(inverted["c"], BTreeSet::from(["a".to_string(), "b".to_string()]));
        assert!(!inverted.contains_key("a"));
    }

    #[test]
    fn duplicate_edges_collapse() {
        let matrix = DependencyMatrix::from_forward([ForwardEdges::new("a", ids(&["b", "b", "b"]))]);
        assert_eq!(matrix.dependencies("a").calls_workflows, ids(&["b"]));
        assert_eq!(matrix.dependencies("b").called_by_workflows, ids(&["a"]));
        assert_eq!(matrix.edges().count(), 1);
    }

    #[test]
    fn every_forward_edge_is_mirrored() {
        let matrix = DependencyMatrix::from_forward([
            ForwardEdges::new("a", ids(&["b", "c"])),
            ForwardEdges::new("b", ids(&["c", "x"])),
            ForwardEdges::new("c", Vec::new()),
        ]);
        for edge in matrix.edges() {
            let target = matrix.get(&edge.to).expect("target has an entry");
            assert!(target.called_by_workflows.contains(&edge.from));
        }
        // Unscanned target still gets an entry.
        assert_eq!(matrix.dependencies("x").called_by_workflows, ids(&["b"]));
    }

    #[test]
    fn isolated_workflow_has_empty_entry() {
        let matrix = DependencyMatrix::from_forward([ForwardEdges::new("solo", Vec::new())]);
        assert_eq!(matrix.len(), 1);
        assert_eq!(matrix.dependencies("solo"), WorkflowDependencies::default());
        assert_eq!(matrix.dependencies("unknown"), WorkflowDependencies::default());
    }

    #[test]
    fn self_call_is_its_own_caller() {
        let matrix = DependencyMatrix::from_forward([ForwardEdges::new("loop", ids(&["loop"]))]);
        let deps = matrix.dependencies("loop");
        assert_eq!(deps.calls_workflows, ids(&["loop"]));
        assert_eq!(deps.called_by_workflows, ids(&["loop"]));
    }
}
