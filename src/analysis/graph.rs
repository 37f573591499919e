use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use crate::inventory::{Resource, Snapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Outbound,
    Inbound,
    Bidirectional,
}

/// Documented metadata for an inferred edge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependencyMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_provider: Option<String>,
    /// Configuration field or rule that produced the edge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    /// Identifier found in the source configuration, when one matched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_reference: Option<String>,
    /// Composite group key for `related` edges.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    pub source_id: String,
    pub source_address: String,
    pub target_id: String,
    pub target_address: String,
    pub relationship: String, // uses_security_group, runs_in_vpc, related, ...
    pub direction: Direction,
    pub confidence: f64,
    pub metadata: DependencyMetadata,
}

impl Dependency {
    pub fn new(
        source: &Resource,
        target: &Resource,
        relationship: &str,
        direction: Direction,
        confidence: f64,
    ) -> Self {
        Dependency {
            source_id: source.id.clone(),
            source_address: source.address.clone(),
            target_id: target.id.clone(),
            target_address: target.address.clone(),
            relationship: relationship.to_string(),
            direction,
            confidence: confidence.clamp(0.0, 1.0),
            metadata: DependencyMetadata {
                source_provider: Some(source.provider.to_string()),
                target_provider: Some(target.provider.to_string()),
                ..Default::default()
            },
        }
    }

    pub fn with_evidence(mut self, evidence: &str) -> Self {
        self.metadata.evidence = Some(evidence.to_string());
        self
    }

    pub fn with_matched_reference(mut self, reference: &str) -> Self {
        self.metadata.matched_reference = Some(reference.to_string());
        self
    }

    pub fn with_group(mut self, group: &str) -> Self {
        self.metadata.group = Some(group.to_string());
        self
    }

    fn sort_key(&self) -> (&str, &str, &str) {
        (&self.source_id, &self.target_id, &self.relationship)
    }
}

/// Order edges and drop exact (source, target, relationship) repeats.
pub fn normalize_dependencies(dependencies: &mut Vec<Dependency>) {
    dependencies.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    dependencies.dedup_by(|a, b| a.sort_key() == b.sort_key());
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub total_resources: usize,
    pub total_dependencies: usize,
    /// Largest BFS level count over all traversal roots. Roots share one
    /// visited set, so this is an approximation of the true eccentricity.
    pub max_depth: usize,
    /// Number of DFS roots from which at least one back-edge was found. A
    /// lower bound on cyclic components, not an exact cycle count.
    pub cycles: usize,
    pub islands: usize,
}

impl GraphStats {
    pub fn compute(resources: &[Resource], dependencies: &[Dependency]) -> Self {
        let mut order: Vec<&str> = resources.iter().map(|r| r.id.as_str()).collect();
        order.sort_unstable();
        order.dedup();

        let known: HashSet<&str> = order.iter().copied().collect();
        let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut endpoints: HashSet<&str> = HashSet::new();

        for dep in dependencies {
            endpoints.insert(dep.source_id.as_str());
            endpoints.insert(dep.target_id.as_str());
            if known.contains(dep.source_id.as_str()) && known.contains(dep.target_id.as_str()) {
                adjacency
                    .entry(dep.source_id.as_str())
                    .or_insert_with(Vec::new)
                    .push(dep.target_id.as_str());
            }
        }
        for targets in adjacency.values_mut() {
            targets.sort_unstable();
            targets.dedup();
        }

        GraphStats {
            total_resources: resources.len(),
            total_dependencies: dependencies.len(),
            max_depth: max_depth(&order, &adjacency),
            cycles: cycle_roots(&order, &adjacency),
            islands: resources
                .iter()
                .filter(|r| !endpoints.contains(r.id.as_str()))
                .count(),
        }
    }
}

fn max_depth(order: &[&str], adjacency: &HashMap<&str, Vec<&str>>) -> usize {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut deepest = 0;

    for &root in order {
        if !visited.insert(root) {
            continue;
        }

        let mut frontier = vec![root];
        let mut depth = 0;
        while !frontier.is_empty() {
            depth += 1;
            let mut next = Vec::new();
            for node in frontier {
                for &neighbor in adjacency.get(node).map(|v| v.as_slice()).unwrap_or(&[]) {
                    if visited.insert(neighbor) {
                        next.push(neighbor);
                    }
                }
            }
            frontier = next;
        }
        deepest = deepest.max(depth);
    }

    deepest
}

fn cycle_roots(order: &[&str], adjacency: &HashMap<&str, Vec<&str>>) -> usize {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut cycles = 0;

    for &root in order {
        if !visited.insert(root) {
            continue;
        }

        let mut on_stack: HashSet<&str> = HashSet::new();
        on_stack.insert(root);
        let mut stack: Vec<(&str, usize)> = vec![(root, 0)];
        let mut found = false;

        while let Some(&(node, next_idx)) = stack.last() {
            let outgoing = adjacency.get(node).map(|v| v.as_slice()).unwrap_or(&[]);
            if next_idx >= outgoing.len() {
                on_stack.remove(node);
                stack.pop();
                continue;
            }
            if let Some(top) = stack.last_mut() {
                top.1 += 1;
            }

            let next = outgoing[next_idx];
            if on_stack.contains(next) {
                // First back-edge: count this root and abandon it.
                found = true;
                break;
            }
            if visited.insert(next) {
                on_stack.insert(next);
                stack.push((next, 0));
            }
        }

        if found {
            cycles += 1;
        }
    }

    cycles
}

/// Resources, inferred edges and the statistics derived from them. Rebuilt
/// from scratch on every analysis run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependencyGraph {
    pub resources: Snapshot,
    pub dependencies: Vec<Dependency>,
    pub stats: GraphStats,
}

impl DependencyGraph {
    pub fn new(resources: Snapshot, dependencies: Vec<Dependency>) -> Self {
        let stats = GraphStats::compute(&resources, &dependencies);
        DependencyGraph {
            resources,
            dependencies,
            stats,
        }
    }

    /// Outgoing edges of a resource
    pub fn dependencies_of(&self, resource_id: &str) -> Vec<&Dependency> {
        self.dependencies
            .iter()
            .filter(|d| d.source_id == resource_id)
            .collect()
    }

    /// Incoming edges of a resource
    pub fn dependents_of(&self, resource_id: &str) -> Vec<&Dependency> {
        self.dependencies
            .iter()
            .filter(|d| d.target_id == resource_id)
            .collect()
    }

    pub fn island_ids(&self) -> Vec<&str> {
        let endpoints: HashSet<&str> = self
            .dependencies
            .iter()
            .flat_map(|d| [d.source_id.as_str(), d.target_id.as_str()])
            .collect();

        let mut ids: Vec<&str> = self
            .resources
            .iter()
            .map(|r| r.id.as_str())
            .filter(|id| !endpoints.contains(id))
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn count_by_relationship(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for dep in &self.dependencies {
            *counts.entry(dep.relationship.clone()).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::Provider;
    use std::sync::Arc;

    fn resources(ids: &[&str]) -> Vec<Resource> {
        ids.iter()
            .map(|id| Resource::new(id, Provider::Aws, "ec2", "instance"))
            .collect()
    }

    fn edge(resources: &[Resource], from: usize, to: usize) -> Dependency {
        Dependency::new(&resources[from], &resources[to], "test", Direction::Outbound, 0.9)
    }

    #[test]
    fn test_no_edges_means_every_resource_is_an_island() {
        let graph = DependencyGraph::new(Arc::new(resources(&["a", "b", "c"])), Vec::new());
        assert_eq!(graph.stats.islands, graph.stats.total_resources);
        assert_eq!(graph.stats.islands, 3);
        assert_eq!(graph.stats.max_depth, 1);
        assert_eq!(graph.stats.cycles, 0);
    }

    #[test]
    fn test_empty_graph() {
        let stats = GraphStats::compute(&[], &[]);
        assert_eq!(stats, GraphStats::default());
    }

    #[test]
    fn test_chain_depth_and_islands() {
        let rs = resources(&["a", "b", "c", "d"]);
        let deps = vec![edge(&rs, 0, 1), edge(&rs, 1, 2)];
        let stats = GraphStats::compute(&rs, &deps);

        assert_eq!(stats.max_depth, 3);
        assert_eq!(stats.islands, 1);
        assert_eq!(stats.cycles, 0);
        assert_eq!(stats.total_dependencies, 2);
    }

    #[test]
    fn test_shared_visited_set_underestimates_depth() {
        // "a" is visited first and reaches "c"; "b" -> "c" -> "d" is never
        // explored from "b" because "b" is the only node left as a root.
        let rs = resources(&["a", "b", "c", "d"]);
        let deps = vec![edge(&rs, 0, 2), edge(&rs, 1, 2), edge(&rs, 2, 3)];
        let stats = GraphStats::compute(&rs, &deps);

        assert_eq!(stats.max_depth, 3);
    }

    #[test]
    fn test_cycle_counted_once_per_root() {
        // Two disjoint cycles plus a self-contained chain.
        let rs = resources(&["a", "b", "c", "d", "e", "f"]);
        let deps = vec![
            edge(&rs, 0, 1),
            edge(&rs, 1, 0),
            edge(&rs, 2, 3),
            edge(&rs, 3, 2),
            edge(&rs, 4, 5),
        ];
        let stats = GraphStats::compute(&rs, &deps);
        assert_eq!(stats.cycles, 2);
    }

    #[test]
    fn test_cycle_is_lower_bound() {
        // Two cycles reachable from the same root count once.
        let rs = resources(&["a", "b", "c", "d"]);
        let deps = vec![
            edge(&rs, 0, 1),
            edge(&rs, 1, 0),
            edge(&rs, 0, 2),
            edge(&rs, 2, 3),
            edge(&rs, 3, 2),
        ];
        let stats = GraphStats::compute(&rs, &deps);
        assert_eq!(stats.cycles, 1);
    }

    #[test]
    fn test_normalize_removes_duplicates() {
        let rs = resources(&["a", "b"]);
        let mut deps = vec![edge(&rs, 1, 0), edge(&rs, 0, 1), edge(&rs, 0, 1)];
        normalize_dependencies(&mut deps);
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].source_id, "a");
    }

    #[test]
    fn test_graph_queries() {
        let rs = resources(&["a", "b", "c"]);
        let deps = vec![edge(&rs, 0, 1)];
        let graph = DependencyGraph::new(Arc::new(rs), deps);

        assert_eq!(graph.dependencies_of("a").len(), 1);
        assert_eq!(graph.dependents_of("b").len(), 1);
        assert_eq!(graph.island_ids(), vec!["c"]);
        assert_eq!(graph.count_by_relationship().get("test"), Some(&1));
    }
}
