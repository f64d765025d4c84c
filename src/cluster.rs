/// Cluster records shared by the parser, refiner, selector and reporter
use indexmap::IndexMap;

/// Synthetic id of a refined cluster (1-based, assigned in creation order)
pub type ClusterId = usize;

/// A cluster as reported by cd-hit, before prefix verification.
///
/// `members[0]` is always the representative cd-hit picked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCluster {
    pub key: String,
    pub members: Vec<String>,
}

impl RawCluster {
    pub fn representative(&self) -> Option<&str> {
        self.members.first().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// A cluster whose members all share the same leading bases
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefinedCluster {
    pub id: ClusterId,
    pub members: Vec<String>,
}

impl RefinedCluster {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Parsed cluster listing: raw clusters and their member counts, both in listing order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterListing {
    pub clusters: IndexMap<String, RawCluster>,
    pub sizes: IndexMap<String, usize>,
}

impl ClusterListing {
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Total number of member lines across all clusters
    pub fn total_members(&self) -> usize {
        self.sizes.values().sum()
    }

    /// Raw clusters largest first; equal sizes keep listing order.
    ///
    /// Refined cluster ids are handed out in this order.
    pub fn by_descending_size(&self) -> Vec<&RawCluster> {
        let mut ordered: Vec<&RawCluster> = self.clusters.values().collect();
        ordered.sort_by(|a, b| b.len().cmp(&a.len()));
        ordered
    }
}

/// Refined cluster id -> reference sequence id
pub type ReferenceAssignment = IndexMap<ClusterId, String>;
