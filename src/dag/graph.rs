// src/dag/graph.rs

use std::collections::HashMap;

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use thiserror::Error;

use crate::catalog::Resource;

/// Structural errors detected while building a [`DepGraph`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// Resource id 0 is reserved and never valid.
    #[error("resource id 0 is reserved")]
    ZeroId,

    /// Two resources share the same id.
    #[error("duplicate resource id {0}")]
    DuplicateId(u64),

    /// A dependency names an id that is not in the catalog.
    #[error("resource {from} depends on unknown resource {to}")]
    MissingDep { from: u64, to: u64 },

    /// The dependency edges contain a cycle. `ids` holds every resource in
    /// one offending cycle, sorted ascending.
    #[error("dependency cycle involving resources {ids:?}")]
    Cycle { ids: Vec<u64> },
}

/// Apply status of a single node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    /// Not yet executed. "Ready" is the derived condition: pending with
    /// every direct dependency done.
    Pending,
    /// Executed successfully.
    Done,
    /// Executed and failed.
    Failed,
    /// Never executed because a transitive dependency failed.
    Skipped,
}

impl Status {
    fn is_terminal(self) -> bool {
        !matches!(self, Status::Pending)
    }
}

#[derive(Debug)]
struct Node<'c> {
    resource: &'c Resource,
    /// Direct dependencies (duplicates collapsed), as node indices.
    deps: Vec<usize>,
    /// Direct dependents; computed once at build, read-only afterwards.
    dependents: Vec<usize>,
    /// Direct dependencies not yet done.
    unmet: usize,
    status: Status,
}

/// Opaque handle to a graph node. Only meaningful for the graph that
/// returned it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeHandle(usize);

/// Immutable dependency DAG plus mutable per-node apply status.
///
/// The graph borrows the resources for its lifetime; callers interact with
/// nodes only through [`NodeHandle`]s.
#[derive(Debug)]
pub struct DepGraph<'c> {
    nodes: Vec<Node<'c>>,
    /// Node indices in ascending resource-id order; keeps `ready()` (and
    /// therefore the whole execution order) deterministic.
    order: Vec<usize>,
    /// Nodes not yet in a terminal status.
    remaining: usize,
}

impl<'c> DepGraph<'c> {
    /// Build a graph from a resource list, validating its structure.
    pub fn new(resources: &'c [Resource]) -> Result<Self, GraphError> {
        let mut by_id: HashMap<u64, usize> = HashMap::with_capacity(resources.len());
        for (idx, res) in resources.iter().enumerate() {
            if res.id == 0 {
                return Err(GraphError::ZeroId);
            }
            if by_id.insert(res.id, idx).is_some() {
                return Err(GraphError::DuplicateId(res.id));
            }
        }

        let mut nodes: Vec<Node<'c>> = Vec::with_capacity(resources.len());
        for res in resources {
            let mut deps = Vec::with_capacity(res.dependencies.len());
            for &dep_id in &res.dependencies {
                let dep_idx = *by_id.get(&dep_id).ok_or(GraphError::MissingDep {
                    from: res.id,
                    to: dep_id,
                })?;
                // Duplicate entries in one list are tolerated but collapsed.
                if !deps.contains(&dep_idx) {
                    deps.push(dep_idx);
                }
            }
            let unmet = deps.len();
            nodes.push(Node {
                resource: res,
                deps,
                dependents: Vec::new(),
                unmet,
                status: Status::Pending,
            });
        }

        check_acyclic(&nodes)?;

        // Reverse edges, computed once.
        for idx in 0..nodes.len() {
            let deps = nodes[idx].deps.clone();
            for dep_idx in deps {
                nodes[dep_idx].dependents.push(idx);
            }
        }

        let mut order: Vec<usize> = (0..nodes.len()).collect();
        order.sort_by_key(|&idx| nodes[idx].resource.id);

        let remaining = nodes.len();
        Ok(Self {
            nodes,
            order,
            remaining,
        })
    }

    /// True once every node is in a terminal status.
    pub fn done(&self) -> bool {
        self.remaining == 0
    }

    /// All pending nodes whose dependencies have all completed, in ascending
    /// resource-id order. Empty when nothing can run.
    pub fn ready(&self) -> Vec<NodeHandle> {
        self.order
            .iter()
            .filter(|&&idx| {
                let node = &self.nodes[idx];
                node.status == Status::Pending && node.unmet == 0
            })
            .map(|&idx| NodeHandle(idx))
            .collect()
    }

    /// The resource behind a handle.
    pub fn resource(&self, handle: NodeHandle) -> &'c Resource {
        self.nodes[handle.0].resource
    }

    /// Mark a ready node as successfully applied.
    pub fn mark(&mut self, handle: NodeHandle) {
        let node = &mut self.nodes[handle.0];
        debug_assert!(
            node.status == Status::Pending && node.unmet == 0,
            "mark() called on a node that was not ready"
        );
        node.status = Status::Done;
        self.remaining -= 1;

        let dependents = self.nodes[handle.0].dependents.clone();
        for dep_idx in dependents {
            self.nodes[dep_idx].unmet -= 1;
        }
    }

    /// Mark a node failed and transitively skip everything that depends on
    /// it. Returns the newly skipped handles in ascending resource-id order.
    pub fn mark_failure(&mut self, handle: NodeHandle) -> Vec<NodeHandle> {
        {
            let node = &mut self.nodes[handle.0];
            debug_assert!(
                node.status == Status::Pending,
                "mark_failure() called on a terminal node"
            );
            node.status = Status::Failed;
        }
        self.remaining -= 1;

        let mut skipped = Vec::new();
        let mut stack = self.nodes[handle.0].dependents.clone();
        while let Some(idx) = stack.pop() {
            let node = &mut self.nodes[idx];
            if node.status.is_terminal() {
                continue;
            }
            node.status = Status::Skipped;
            self.remaining -= 1;
            skipped.push(idx);
            stack.extend(self.nodes[idx].dependents.iter().copied());
        }

        skipped.sort_by_key(|&idx| self.nodes[idx].resource.id);
        skipped.into_iter().map(NodeHandle).collect()
    }
}

/// Reject cycles, naming every id in the first offending cycle.
///
/// Tarjan instead of a plain toposort so the error can carry the whole
/// strongly connected component rather than a single witness node.
fn check_acyclic(nodes: &[Node<'_>]) -> Result<(), GraphError> {
    let mut graph: DiGraphMap<u64, ()> = DiGraphMap::new();
    for node in nodes {
        graph.add_node(node.resource.id);
    }
    for node in nodes {
        for &dep_idx in &node.deps {
            graph.add_edge(nodes[dep_idx].resource.id, node.resource.id, ());
        }
    }

    for scc in tarjan_scc(&graph) {
        let cyclic = scc.len() > 1 || graph.contains_edge(scc[0], scc[0]);
        if cyclic {
            let mut ids = scc;
            ids.sort_unstable();
            return Err(GraphError::Cycle { ids });
        }
    }
    Ok(())
}
