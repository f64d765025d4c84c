/// End-to-end replicate detection over an already-produced cluster listing
use log::info;

use crate::clstr;
use crate::cluster::ClusterListing;
use crate::error::Result;
use crate::fasta::SequenceMap;
use crate::reference;
use crate::refine;
use crate::report::{self, Report, DEFAULT_TOP_N};

/// Settings for the refinement and report stages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DedupConfig {
    /// Number of initial bases that must match; 0 disables refinement
    pub prefix_length: usize,
    /// Size of the "largest clusters" listing
    pub top_n: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        DedupConfig {
            prefix_length: 3,
            top_n: DEFAULT_TOP_N,
        }
    }
}

/// Refine, pick references and aggregate
pub fn run_listing(listing: &ClusterListing, sequences: &SequenceMap, config: &DedupConfig) -> Result<Report> {
    let raw = listing.by_descending_size();
    let refined = refine::refine_all(&raw, sequences, config.prefix_length)?;
    info!(
        "{} raw clusters refined into {} clusters ({}-base prefix)",
        raw.len(),
        refined.len(),
        config.prefix_length
    );

    let references = reference::select_all(&refined, sequences)?;
    let report = report::aggregate(&refined, &references, sequences, config.top_n)?;
    info!(
        "{} reads, {} unique, {:.2}% replicates",
        report.summary.total_reads, report.summary.unique_reads, report.summary.percent_replicates
    );
    Ok(report)
}

/// Parse `listing_text` and run the whole core over it
pub fn deduplicate(listing_text: &str, sequences: &SequenceMap, config: &DedupConfig) -> Result<Report> {
    let listing = clstr::parse(listing_text)?;
    run_listing(&listing, sequences, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_on_initial_bases() {
        let seqs: SequenceMap = vec![
            ("A", format!("AAA{}", "C".repeat(97))),
            ("B", format!("AAA{}", "G".repeat(147))),
            ("C", format!("GGG{}", "T".repeat(50))),
        ]
        .into_iter()
        .collect();
        let listing = ">Cluster 0\n0\t100nt, >A... *\n1\t150nt, >B... at +/95.00%\n2\t53nt, >C... at +/90.00%\n";

        let report = deduplicate(listing, &seqs, &DedupConfig::default()).unwrap();
        assert_eq!(report.details.len(), 2);
        assert_eq!(report.details[0].id, 1);
        assert_eq!(report.details[0].reference, "B");
        assert_eq!(report.details[1].id, 2);
        assert_eq!(report.details[1].reference, "C");
        assert_eq!(report.summary.percent_replicates, 33.33);
    }

    #[test]
    fn test_largest_raw_cluster_numbered_first() {
        let seqs: SequenceMap = vec![("s1", "ACGT"), ("s2", "TTTT"), ("s3", "TTTA")].into_iter().collect();
        let listing = ">Cluster 0\n0\t4nt, >s1... *\n>Cluster 1\n0\t4nt, >s2... *\n1\t4nt, >s3... at 99.00%\n";

        let report = deduplicate(listing, &seqs, &DedupConfig::default()).unwrap();
        assert_eq!(report.details[0].reference, "s2");
        assert_eq!(report.details[0].size(), 2);
        assert_eq!(report.details[1].reference, "s1");
    }
}
