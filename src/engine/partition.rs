use std::collections::BTreeMap;
use crate::inventory::{Provider, Resource};

/// The resources of one provider, by index into the run's snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    pub provider: Provider,
    pub members: Vec<usize>,
}

/// Split a snapshot into one partition per provider, ordered by provider.
pub fn partition_by_provider(resources: &[Resource]) -> Vec<Partition> {
    let mut by_provider: BTreeMap<Provider, Vec<usize>> = BTreeMap::new();
    for (idx, resource) in resources.iter().enumerate() {
        by_provider
            .entry(resource.provider.clone())
            .or_insert_with(Vec::new)
            .push(idx);
    }

    by_provider
        .into_iter()
        .map(|(provider, members)| Partition { provider, members })
        .collect()
}

/// Split `0..len` into contiguous batches of at most `batch_size`.
pub fn batches(len: usize, batch_size: usize) -> Vec<std::ops::Range<usize>> {
    let size = batch_size.max(1);
    (0..len)
        .step_by(size)
        .map(|start| start..(start + size).min(len))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_by_provider() {
        let resources = vec![
            Resource::new("a", Provider::Gcp, "compute", "instance"),
            Resource::new("b", Provider::Aws, "ec2", "instance"),
            Resource::new("c", Provider::Aws, "s3", "bucket"),
        ];

        let partitions = partition_by_provider(&resources);
        assert_eq!(partitions.len(), 2);
        assert_eq!(partitions[0].provider, Provider::Aws);
        assert_eq!(partitions[0].members, vec![1, 2]);
        assert_eq!(partitions[1].provider, Provider::Gcp);
        assert_eq!(partitions[1].members, vec![0]);
    }

    #[test]
    fn test_batches_cover_range() {
        assert_eq!(batches(5, 2), vec![0..2, 2..4, 4..5]);
        assert_eq!(batches(0, 100), Vec::<std::ops::Range<usize>>::new());
        assert_eq!(batches(3, 0), vec![0..1, 1..2, 2..3]);
    }
}
