//! Prefix refinement of raw clusters.
//!
//! cd-hit groups reads by global identity, so two reads that start at different
//! positions can land in the same cluster. Artifactual replicates start at the
//! same base, so each raw cluster is split into classes whose members share an
//! identical leading prefix.

use indexmap::IndexMap;
use log::debug;
use rayon::prelude::*;

use crate::cluster::{ClusterId, RawCluster, RefinedCluster};
use crate::error::{ReplicateError, Result};
use crate::fasta::SequenceMap;

/// First `prefix_length` characters, or the whole sequence if it is shorter
pub fn prefix(sequence: &str, prefix_length: usize) -> &str {
    match sequence.char_indices().nth(prefix_length) {
        Some((end, _)) => &sequence[..end],
        None => sequence,
    }
}

/// Hands out refined cluster ids: 1, 2, 3, ...
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: ClusterId,
}

impl Default for IdAllocator {
    fn default() -> Self {
        IdAllocator { next: 1 }
    }
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> ClusterId {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Number of ids handed out so far
    pub fn issued(&self) -> usize {
        self.next - 1
    }
}

/// Group members of `raw` by prefix.
///
/// Classes are ordered by the first occurrence of their prefix in the member
/// list; members keep their relative order within a class.
pub fn partition_by_prefix(
    raw: &RawCluster,
    sequences: &SequenceMap,
    prefix_length: usize,
) -> Result<Vec<Vec<String>>> {
    if raw.is_empty() {
        return Err(ReplicateError::EmptyCluster {
            key: raw.key.clone(),
        });
    }

    let mut classes: IndexMap<&str, Vec<String>> = IndexMap::new();
    for member in &raw.members {
        let sequence = sequences
            .get(member)
            .ok_or_else(|| ReplicateError::UnknownSequence { id: member.clone() })?;
        classes
            .entry(prefix(sequence, prefix_length))
            .or_default()
            .push(member.clone());
    }

    Ok(classes.into_values().collect())
}

fn assign_ids(classes: Vec<Vec<String>>, ids: &mut IdAllocator) -> Vec<RefinedCluster> {
    classes
        .into_iter()
        .map(|members| RefinedCluster {
            id: ids.next_id(),
            members,
        })
        .collect()
}

/// Split one raw cluster, taking ids from `ids`
pub fn refine(
    raw: &RawCluster,
    sequences: &SequenceMap,
    prefix_length: usize,
    ids: &mut IdAllocator,
) -> Result<Vec<RefinedCluster>> {
    let classes = partition_by_prefix(raw, sequences, prefix_length)?;
    Ok(assign_ids(classes, ids))
}

/// Split every raw cluster in `raw_clusters`.
///
/// Partitioning runs in parallel; ids are assigned afterwards in a single pass
/// over `raw_clusters` order, so the result matches calling [`refine`] on each
/// cluster in turn. The first failing cluster in that order wins.
pub fn refine_all(
    raw_clusters: &[&RawCluster],
    sequences: &SequenceMap,
    prefix_length: usize,
) -> Result<Vec<RefinedCluster>> {
    let partitions: Vec<Result<Vec<Vec<String>>>> = raw_clusters
        .par_iter()
        .map(|raw| partition_by_prefix(raw, sequences, prefix_length))
        .collect();

    let mut ids = IdAllocator::new();
    let mut refined = Vec::with_capacity(raw_clusters.len());
    for (raw, classes) in raw_clusters.iter().zip(partitions) {
        let classes = classes?;
        if classes.len() > 1 {
            debug!(
                "Raw cluster {} ({} members) split into {} by {}-base prefix",
                raw.key,
                raw.len(),
                classes.len(),
                prefix_length
            );
        }
        refined.extend(assign_ids(classes, &mut ids));
    }

    Ok(refined)
}
