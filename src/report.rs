//! Aggregation of refined clusters into the replicate reports.
//!
//! Everything the writers in [`crate::report_io`] render is computed here: the
//! per-cluster detail, the size ranking, the size histogram, the duplication
//! summary and the deduplicated sequence set.

use indexmap::IndexMap;
use std::collections::{BTreeMap, HashSet};

use crate::cluster::{ClusterId, ReferenceAssignment, RefinedCluster};
use crate::error::{ReplicateError, Result};
use crate::fasta::SequenceMap;

pub const DEFAULT_TOP_N: usize = 10;

/// One refined cluster with its reference and member sequences
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterDetail {
    pub id: ClusterId,
    pub reference: String,
    /// (member id, sequence data) in member-list order
    pub members: Vec<(String, String)>,
}

impl ClusterDetail {
    pub fn size(&self) -> usize {
        self.members.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankedCluster {
    pub id: ClusterId,
    pub size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub total_reads: usize,
    pub unique_reads: usize,
    /// Percent of reads collapsed away, rounded to two decimals
    pub percent_replicates: f64,
}

/// Cluster size -> number of clusters of that size, ascending by size
pub type SizeHistogram = BTreeMap<usize, usize>;

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// Every refined cluster in id order
    pub details: Vec<ClusterDetail>,
    /// Every refined cluster, largest first, ascending id among equal sizes
    pub ranked: Vec<RankedCluster>,
    pub top_n: usize,
    pub histogram: SizeHistogram,
    pub summary: Summary,
    /// Reference id -> sequence, one entry per refined cluster in id order
    pub unique: IndexMap<String, String>,
}

impl Report {
    /// The `top_n` largest clusters
    pub fn largest(&self) -> &[RankedCluster] {
        &self.ranked[..self.top_n.min(self.ranked.len())]
    }
}

/// `(total - unique) / total * 100`, two decimals, zero for an empty run
pub fn duplication_percent(total: usize, unique: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let percent = (total as f64 - unique as f64) / total as f64 * 100.0;
    (percent * 100.0).round() / 100.0
}

pub fn size_histogram(clusters: &[RefinedCluster]) -> SizeHistogram {
    let mut histogram = SizeHistogram::new();
    for cluster in clusters {
        *histogram.entry(cluster.len()).or_insert(0) += 1;
    }
    histogram
}

pub fn rank_clusters(clusters: &[RefinedCluster]) -> Vec<RankedCluster> {
    let mut ranked: Vec<RankedCluster> = clusters
        .iter()
        .map(|c| RankedCluster {
            id: c.id,
            size: c.len(),
        })
        .collect();
    ranked.sort_by(|a, b| b.size.cmp(&a.size).then(a.id.cmp(&b.id)));
    ranked
}

/// Build the report for one run.
///
/// Every input sequence must sit in exactly one refined cluster; anything else
/// is reported as a consistency error.
pub fn aggregate(
    clusters: &[RefinedCluster],
    references: &ReferenceAssignment,
    sequences: &SequenceMap,
    top_n: usize,
) -> Result<Report> {
    let mut ordered: Vec<&RefinedCluster> = clusters.iter().collect();
    ordered.sort_by_key(|c| c.id);

    let mut seen: HashSet<&str> = HashSet::with_capacity(sequences.len());
    let mut details = Vec::with_capacity(ordered.len());
    let mut unique = IndexMap::with_capacity(ordered.len());

    for cluster in ordered {
        let reference = references
            .get(&cluster.id)
            .ok_or(ReplicateError::MissingReference {
                cluster: cluster.id,
            })?;

        let mut members = Vec::with_capacity(cluster.len());
        for member in &cluster.members {
            if !seen.insert(member.as_str()) {
                return Err(ReplicateError::DuplicateAssignment { id: member.clone() });
            }
            let data = sequences
                .get(member)
                .ok_or_else(|| ReplicateError::MissingSequenceData {
                    cluster: cluster.id,
                    id: member.clone(),
                })?;
            members.push((member.clone(), data.to_string()));
        }

        let reference_data = sequences
            .get(reference)
            .ok_or_else(|| ReplicateError::MissingSequenceData {
                cluster: cluster.id,
                id: reference.clone(),
            })?;
        unique.insert(reference.clone(), reference_data.to_string());

        details.push(ClusterDetail {
            id: cluster.id,
            reference: reference.clone(),
            members,
        });
    }

    let clustered: usize = details.iter().map(|d| d.size()).sum();
    if clustered != sequences.len() {
        return Err(ReplicateError::CountMismatch {
            clustered,
            input: sequences.len(),
        });
    }

    let summary = Summary {
        total_reads: clustered,
        unique_reads: details.len(),
        percent_replicates: duplication_percent(clustered, details.len()),
    };

    Ok(Report {
        ranked: rank_clusters(clusters),
        histogram: size_histogram(clusters),
        top_n,
        summary,
        unique,
        details,
    })
}
