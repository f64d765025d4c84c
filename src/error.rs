//! Error taxonomy for the replicate filter core.
//!
//! Variants fall in two groups: malformed input (the cluster listing or the
//! FASTA is wrong) and consistency failures (the core produced something that
//! cannot be right). Use [`ReplicateError::is_consistency`] to tell them apart.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplicateError {
    #[error("line {line}: member line appears before any '>Cluster' header")]
    MemberOutsideCluster { line: usize },

    #[error("line {line}: unrecognised cluster listing line: {text:?}")]
    MalformedLine { line: usize, text: String },

    #[error("cluster {key}: no representative ('*') member")]
    MissingRepresentative { key: String },

    #[error("cluster {key}: more than one representative ('*') member (second on line {line})")]
    DuplicateRepresentative { key: String, line: usize },

    #[error("cluster {key}: contains no members")]
    EmptyCluster { key: String },

    #[error("cluster {key}: member {member} listed twice")]
    DuplicateMember { key: String, member: String },

    #[error("line {line}: cluster {key} appears more than once")]
    DuplicateClusterKey { key: String, line: usize },

    #[error("line {line}: member {member} of cluster {key} is already listed in cluster {first_key}")]
    MemberInTwoClusters {
        member: String,
        first_key: String,
        key: String,
        line: usize,
    },

    #[error("sequence {id} is listed in the clusters but missing from the FASTA input")]
    UnknownSequence { id: String },

    #[error("input does not look like a FASTA file (no '>' header line)")]
    NotFasta,

    #[error("FASTA input contains sequence {id} more than once")]
    DuplicateSequenceId { id: String },

    #[error("internal consistency error: {clustered} clustered sequences but {input} input sequences")]
    CountMismatch { clustered: usize, input: usize },

    #[error("internal consistency error: sequence {id} assigned to more than one refined cluster")]
    DuplicateAssignment { id: String },

    #[error("internal consistency error: refined cluster {cluster} has no reference sequence")]
    MissingReference { cluster: usize },

    #[error("internal consistency error: refined cluster {cluster} member {id} has no sequence data")]
    MissingSequenceData { cluster: usize, id: String },
}

impl ReplicateError {
    /// True for failures that indicate a defect rather than bad input.
    pub fn is_consistency(&self) -> bool {
        matches!(
            self,
            ReplicateError::CountMismatch { .. }
                | ReplicateError::DuplicateAssignment { .. }
                | ReplicateError::MissingReference { .. }
                | ReplicateError::MissingSequenceData { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ReplicateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_groups() {
        let malformed = ReplicateError::MissingRepresentative { key: "0".into() };
        assert!(!malformed.is_consistency());

        let bug = ReplicateError::CountMismatch {
            clustered: 9,
            input: 10,
        };
        assert!(bug.is_consistency());
        assert!(bug.to_string().starts_with("internal consistency error"));
    }
}
