//! Reference sequence selection for refined clusters
use crate::cluster::{ReferenceAssignment, RefinedCluster};
use crate::error::{ReplicateError, Result};
use crate::fasta::SequenceMap;

/// Longest member of `cluster`; the earliest one wins ties.
///
/// Returns `None` for an empty cluster or a member without sequence data.
pub fn select_reference<'a>(cluster: &'a RefinedCluster, sequences: &SequenceMap) -> Option<&'a str> {
    let mut members = cluster.members.iter();
    let first = members.next()?;
    let mut best = (first.as_str(), sequences.get(first)?.len());

    for member in members {
        let length = sequences.get(member)?.len();
        if length > best.1 {
            best = (member.as_str(), length);
        }
    }

    Some(best.0)
}

/// Reference of every cluster, keyed by cluster id
pub fn select_all(clusters: &[RefinedCluster], sequences: &SequenceMap) -> Result<ReferenceAssignment> {
    clusters
        .iter()
        .map(|cluster| {
            select_reference(cluster, sequences)
                .map(|reference| (cluster.id, reference.to_string()))
                .ok_or(ReplicateError::MissingReference {
                    cluster: cluster.id,
                })
        })
        .collect()
}
