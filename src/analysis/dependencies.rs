use anyhow::{anyhow, Result};
use log::info;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Range;
use std::sync::Arc;
use std::time::Instant;
use crate::analysis::graph::{normalize_dependencies, Dependency, DependencyGraph, Direction};
use crate::config::AnalysisConfig;
use crate::engine::{batches, partition_by_provider, Accumulator, CancellationFlag, WorkUnit, WorkerPool};
use crate::inventory::{normalize_key, ConfigField, GroupKey, Resource, ResourceConfig, Snapshot};

pub const RELATED: &str = "related";
pub const RELATED_CONFIDENCE: f64 = 0.6;
pub const CROSS_PROVIDER_REFERENCE: &str = "cross_provider_reference";
pub const CROSS_PROVIDER_CONFIDENCE: f64 = 0.7;

/// Reference kinds recognised in a resource's configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    SecurityGroup,
    Vpc,
    Subnet,
    ParameterGroup,
    IamRole,
    NetworkInterface,
}

impl ReferenceKind {
    pub const ALL: [ReferenceKind; 6] = [
        ReferenceKind::SecurityGroup,
        ReferenceKind::Vpc,
        ReferenceKind::Subnet,
        ReferenceKind::ParameterGroup,
        ReferenceKind::IamRole,
        ReferenceKind::NetworkInterface,
    ];

    pub fn field(self) -> ConfigField {
        match self {
            ReferenceKind::SecurityGroup => ConfigField::SecurityGroups,
            ReferenceKind::Vpc => ConfigField::Vpc,
            ReferenceKind::Subnet => ConfigField::Subnet,
            ReferenceKind::ParameterGroup => ConfigField::ParameterGroup,
            ReferenceKind::IamRole => ConfigField::IamRole,
            ReferenceKind::NetworkInterface => ConfigField::NetworkInterfaces,
        }
    }

    pub fn relationship(self) -> &'static str {
        match self {
            ReferenceKind::SecurityGroup => "uses_security_group",
            ReferenceKind::Vpc => "runs_in_vpc",
            ReferenceKind::Subnet => "in_subnet",
            ReferenceKind::ParameterGroup => "uses_parameter_group",
            ReferenceKind::IamRole => "assumes_iam_role",
            ReferenceKind::NetworkInterface => "attached_network_interface",
        }
    }

    pub fn confidence(self) -> f64 {
        match self {
            ReferenceKind::SecurityGroup => 0.90,
            ReferenceKind::Vpc => 0.95,
            ReferenceKind::Subnet => 0.85,
            ReferenceKind::ParameterGroup => 0.70,
            ReferenceKind::IamRole => 0.80,
            ReferenceKind::NetworkInterface => 0.75,
        }
    }

    /// Normalized category tokens matched against a candidate's type or name.
    pub fn tokens(self) -> &'static [&'static str] {
        match self {
            ReferenceKind::SecurityGroup => &["securitygroup", "firewall"],
            ReferenceKind::Vpc => &["vpc", "virtualnetwork", "vnet"],
            ReferenceKind::Subnet => &["subnet"],
            ReferenceKind::ParameterGroup => &["parametergroup"],
            ReferenceKind::IamRole => &["role", "instanceprofile", "serviceaccount"],
            ReferenceKind::NetworkInterface => &["networkinterface"],
        }
    }

    fn matches(self, resource: &Resource) -> bool {
        let resource_type = normalize_key(&resource.resource_type);
        let name = normalize_key(&resource.name);
        self.tokens()
            .iter()
            .any(|token| resource_type.contains(token) || name.contains(token))
    }
}

/// Snapshot indices of the resources belonging to each reference category.
#[derive(Debug, Default)]
pub struct CategoryIndex {
    candidates: HashMap<ReferenceKind, Vec<usize>>,
}

impl CategoryIndex {
    pub fn build(resources: &[Resource]) -> Self {
        let mut candidates: HashMap<ReferenceKind, Vec<usize>> = HashMap::new();
        for (idx, resource) in resources.iter().enumerate() {
            for kind in ReferenceKind::ALL {
                if kind.matches(resource) {
                    candidates.entry(kind).or_insert_with(Vec::new).push(idx);
                }
            }
        }
        CategoryIndex { candidates }
    }

    pub fn candidates(&self, kind: ReferenceKind) -> &[usize] {
        self.candidates.get(&kind).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

/// Ids and addresses of every resource, for literal reference probing.
#[derive(Debug, Default)]
pub struct IdentifierIndex {
    by_identifier: HashMap<String, Vec<usize>>,
}

impl IdentifierIndex {
    pub fn build(resources: &[Resource]) -> Self {
        let mut by_identifier: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, resource) in resources.iter().enumerate() {
            for identifier in [&resource.id, &resource.address] {
                if identifier.is_empty() {
                    continue;
                }
                let slot = by_identifier.entry(identifier.clone()).or_insert_with(Vec::new);
                if !slot.contains(&idx) {
                    slot.push(idx);
                }
            }
        }
        IdentifierIndex { by_identifier }
    }

    pub fn lookup(&self, token: &str) -> &[usize] {
        self.by_identifier.get(token).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

/// Does a configured reference name this candidate? Accepts the full value
/// or its last path/ARN segment.
fn names_candidate(reference: &str, candidate: &Resource) -> bool {
    let reference = reference.trim();
    if reference.is_empty() {
        return false;
    }
    let tail = reference
        .rsplit(|c| c == '/' || c == ':')
        .next()
        .unwrap_or(reference);

    [reference, tail].iter().any(|r| {
        !r.is_empty() && (*r == candidate.id || *r == candidate.address || *r == candidate.name)
    })
}

/// Configuration-driven edges for the resources of one provider partition.
pub fn extract_partition(
    resources: &[Resource],
    categories: &CategoryIndex,
    members: &[usize],
) -> Result<Vec<Dependency>> {
    let mut dependencies = Vec::new();

    for &idx in members {
        let resource = resources
            .get(idx)
            .ok_or_else(|| anyhow!("resource index {} outside snapshot of {}", idx, resources.len()))?;
        let config = ResourceConfig::parse(&resource.configuration);
        if !config.is_structured() {
            continue;
        }

        for kind in ReferenceKind::ALL {
            if !config.has(&resource.provider, kind.field()) {
                continue;
            }
            let references = config.strings(&resource.provider, kind.field());
            let candidates: Vec<usize> = categories
                .candidates(kind)
                .iter()
                .copied()
                .filter(|&c| c != idx)
                .collect();

            let precise: Vec<(usize, &str)> = candidates
                .iter()
                .filter_map(|&c| {
                    references
                        .iter()
                        .find(|r| names_candidate(r, &resources[c]))
                        .map(|r| (c, r.as_str()))
                })
                .collect();

            if precise.is_empty() {
                for c in candidates {
                    dependencies.push(
                        Dependency::new(resource, &resources[c], kind.relationship(), Direction::Outbound, kind.confidence())
                            .with_evidence(&format!("{:?}", kind.field())),
                    );
                }
            } else {
                for (c, reference) in precise {
                    dependencies.push(
                        Dependency::new(resource, &resources[c], kind.relationship(), Direction::Outbound, kind.confidence())
                            .with_evidence(&format!("{:?}", kind.field()))
                            .with_matched_reference(reference),
                    );
                }
            }
        }
    }

    Ok(dependencies)
}

/// Bidirectional `related` edges for every pair sharing a group key.
pub fn related_edges(resources: &[Resource]) -> Vec<Dependency> {
    let mut groups: BTreeMap<GroupKey, Vec<usize>> = BTreeMap::new();
    for (idx, resource) in resources.iter().enumerate() {
        groups.entry(resource.group_key()).or_insert_with(Vec::new).push(idx);
    }

    let mut dependencies = Vec::new();
    for (key, mut members) in groups {
        if members.len() < 2 {
            continue;
        }
        members.sort_by(|a, b| resources[*a].id.cmp(&resources[*b].id));
        let group = key.to_string();

        for (i, &a) in members.iter().enumerate() {
            for &b in &members[i + 1..] {
                if resources[a].id == resources[b].id {
                    continue;
                }
                dependencies.push(
                    Dependency::new(&resources[a], &resources[b], RELATED, Direction::Bidirectional, RELATED_CONFIDENCE)
                        .with_evidence("group_key")
                        .with_group(&group),
                );
            }
        }
    }
    dependencies
}

const COARSE_SEPARATORS: &[char] = &['"', '\'', ',', '=', ';', '(', ')', '[', ']', '{', '}', '<', '>'];

/// Match tokens for a configuration: each leaf, its whitespace/quote/comma
/// separated pieces, and those pieces split again on `:` and `/`.
pub fn reference_tokens<'a, S: AsRef<str>>(leaves: &'a [S]) -> HashSet<&'a str> {
    let mut tokens = HashSet::new();
    for leaf in leaves {
        let leaf = leaf.as_ref().trim();
        if leaf.is_empty() {
            continue;
        }
        tokens.insert(leaf);
        for coarse in leaf.split(|c: char| c.is_whitespace() || COARSE_SEPARATORS.contains(&c)) {
            if coarse.is_empty() {
                continue;
            }
            tokens.insert(coarse);
            for fine in coarse.split(|c| c == ':' || c == '/') {
                if !fine.is_empty() {
                    tokens.insert(fine);
                }
            }
        }
    }
    tokens
}

/// Directed edges from resources in `range` to resources of other providers
/// whose id or address appears literally in their configuration.
pub fn reference_edges(resources: &[Resource], identifiers: &IdentifierIndex, range: Range<usize>) -> Result<Vec<Dependency>> {
    let slice = resources
        .get(range.clone())
        .ok_or_else(|| anyhow!("batch {:?} outside snapshot of {}", range, resources.len()))?;

    let mut dependencies = Vec::new();
    for (offset, resource) in slice.iter().enumerate() {
        let idx = range.start + offset;
        let config = ResourceConfig::parse(&resource.configuration);
        let leaves = config.leaves(&resource.configuration);

        let mut tokens: Vec<&str> = reference_tokens(&leaves).into_iter().collect();
        tokens.sort_unstable();

        let mut linked: HashSet<usize> = HashSet::new();
        for token in tokens {
            for &target in identifiers.lookup(token) {
                if target == idx || resources[target].provider == resource.provider {
                    continue;
                }
                if linked.insert(target) {
                    dependencies.push(
                        Dependency::new(
                            resource,
                            &resources[target],
                            CROSS_PROVIDER_REFERENCE,
                            Direction::Outbound,
                            CROSS_PROVIDER_CONFIDENCE,
                        )
                        .with_evidence("configuration")
                        .with_matched_reference(token),
                    );
                }
            }
        }
    }
    Ok(dependencies)
}

enum CrossProviderWork {
    Groups,
    References(Range<usize>),
}

/// Infers edges between inventory resources.
#[derive(Debug, Clone)]
pub struct DependencyAnalyzer {
    config: AnalysisConfig,
}

impl DependencyAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        DependencyAnalyzer { config }
    }

    pub async fn analyze(&self, snapshot: Snapshot, cancel: &CancellationFlag) -> DependencyGraph {
        let started = Instant::now();
        let strategy = self.config.strategy;
        let accumulator: Accumulator<Dependency> = Accumulator::new();

        let categories = Arc::new(CategoryIndex::build(&snapshot));
        let identifiers = Arc::new(IdentifierIndex::build(&snapshot));

        let provider_units: Vec<WorkUnit<Vec<usize>>> = partition_by_provider(&snapshot)
            .into_iter()
            .map(|p| WorkUnit::new(p.provider.to_string(), p.members))
            .collect();

        let mut cross_units = vec![WorkUnit::new("groups", CrossProviderWork::Groups)];
        cross_units.extend(
            batches(snapshot.len(), strategy.batch_size())
                .into_iter()
                .map(|range| WorkUnit::new(format!("references {}..{}", range.start, range.end), CrossProviderWork::References(range))),
        );

        let provider_pool = WorkerPool::new(strategy, cancel.clone());
        let cross_pool = WorkerPool::new(strategy, cancel.clone());

        let provider_snapshot = snapshot.clone();
        let cross_snapshot = snapshot.clone();

        let (mut outcome, cross_outcome) = tokio::join!(
            provider_pool.run("dependencies", provider_units, &accumulator, move |members: Vec<usize>| {
                extract_partition(&provider_snapshot, &categories, &members)
            }),
            cross_pool.run("cross-provider dependencies", cross_units, &accumulator, move |work: CrossProviderWork| {
                match work {
                    CrossProviderWork::Groups => Ok(related_edges(&cross_snapshot)),
                    CrossProviderWork::References(range) => reference_edges(&cross_snapshot, &identifiers, range),
                }
            }),
        );
        outcome.merge(cross_outcome);

        let mut dependencies = accumulator.take();
        normalize_dependencies(&mut dependencies);
        let graph = DependencyGraph::new(snapshot, dependencies);

        info!(
            "Dependency analysis: {} resources, {} dependencies, {} islands, {} failed unit(s) in {:?}",
            graph.stats.total_resources,
            graph.stats.total_dependencies,
            graph.stats.islands,
            outcome.failed.len(),
            started.elapsed()
        );
        graph
    }
}
