// tests/graph_properties.rs
//
// Property tests over the dependency graph: any generated DAG drains to a
// topological order, and injected failures never let a descendant run.

use std::collections::{HashMap, HashSet};

use proptest::prelude::*;

use catapply::catalog::{Payload, Resource};
use catapply::dag::DepGraph;

/// Generate an acyclic resource list: resource `i` (id `i + 1`) may only
/// depend on resources with smaller indices.
fn resources_strategy(max_resources: usize) -> impl Strategy<Value = Vec<Resource>> {
    (1..=max_resources).prop_flat_map(|count| {
        proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..count),
            count,
        )
        .prop_map(move |raw_deps| {
            raw_deps
                .into_iter()
                .enumerate()
                .map(|(i, potential)| {
                    let dependencies: Vec<u64> = if i == 0 {
                        vec![]
                    } else {
                        // Duplicates are fine; the graph collapses them.
                        potential.into_iter().map(|d| ((d % i) as u64) + 1).collect()
                    };
                    Resource {
                        id: (i as u64) + 1,
                        comment: String::new(),
                        dependencies,
                        payload: Payload::Noop {},
                    }
                })
                .collect()
        })
    })
}

/// Transitive dependents of every id, derived from the declared edges.
fn descendants(resources: &[Resource]) -> HashMap<u64, HashSet<u64>> {
    let mut direct: HashMap<u64, HashSet<u64>> = HashMap::new();
    for res in resources {
        for &dep in &res.dependencies {
            direct.entry(dep).or_default().insert(res.id);
        }
    }

    let mut result: HashMap<u64, HashSet<u64>> = HashMap::new();
    for res in resources {
        let mut seen = HashSet::new();
        let mut stack: Vec<u64> = direct
            .get(&res.id)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        while let Some(id) = stack.pop() {
            if seen.insert(id) {
                if let Some(next) = direct.get(&id) {
                    stack.extend(next.iter().copied());
                }
            }
        }
        result.insert(res.id, seen);
    }
    result
}

proptest! {
    /// Draining the graph one ready node at a time yields a topological
    /// order and visits every node exactly once.
    #[test]
    fn drain_yields_a_topological_order(resources in resources_strategy(12)) {
        let mut graph = DepGraph::new(&resources).expect("generated DAGs are valid");
        let mut applied: Vec<u64> = Vec::new();
        let mut applied_set: HashSet<u64> = HashSet::new();

        let by_id: HashMap<u64, &Resource> =
            resources.iter().map(|r| (r.id, r)).collect();

        while !graph.done() {
            let ready = graph.ready();
            prop_assert!(!ready.is_empty(), "graph not done, but has nothing to do");

            let handle = ready[0];
            let id = graph.resource(handle).id;
            for &dep in &by_id[&id].dependencies {
                prop_assert!(
                    applied_set.contains(&dep),
                    "resource {} ran before its dependency {}",
                    id,
                    dep
                );
            }
            applied.push(id);
            applied_set.insert(id);
            graph.mark(handle);
        }

        prop_assert_eq!(applied.len(), resources.len());
        prop_assert_eq!(applied_set.len(), resources.len());
    }

    /// When some resources fail, none of their transitive dependents is ever
    /// offered as ready, and every node still reaches a terminal status.
    #[test]
    fn failures_never_let_a_descendant_run(
        resources in resources_strategy(12),
        failing in proptest::collection::hash_set(0..12usize, 0..4),
    ) {
        let failing_ids: HashSet<u64> = failing
            .into_iter()
            .filter(|&i| i < resources.len())
            .map(|i| (i as u64) + 1)
            .collect();
        let down = descendants(&resources);

        let mut graph = DepGraph::new(&resources).expect("generated DAGs are valid");
        let mut applied: HashSet<u64> = HashSet::new();
        let mut failed: HashSet<u64> = HashSet::new();
        let mut skipped: HashSet<u64> = HashSet::new();

        while !graph.done() {
            let ready = graph.ready();
            prop_assert!(!ready.is_empty(), "graph not done, but has nothing to do");

            let handle = ready[0];
            let id = graph.resource(handle).id;
            if failing_ids.contains(&id) {
                failed.insert(id);
                for h in graph.mark_failure(handle) {
                    skipped.insert(graph.resource(h).id);
                }
            } else {
                applied.insert(id);
                graph.mark(handle);
            }
        }

        for failed_id in &failed {
            for dependent in &down[failed_id] {
                prop_assert!(
                    !applied.contains(dependent),
                    "resource {} ran although its dependency {} failed",
                    dependent,
                    failed_id
                );
            }
        }

        prop_assert_eq!(
            applied.len() + failed.len() + skipped.len(),
            resources.len()
        );
    }
}
