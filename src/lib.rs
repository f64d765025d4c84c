// Library exports for replifilter
pub mod binary_paths;
pub mod cdhit;
pub mod clstr;
pub mod cluster;
pub mod error;
pub mod fasta;
pub mod pipeline;
pub mod reference;
pub mod refine;
pub mod report;
pub mod report_io;

pub use error::ReplicateError;
pub use pipeline::{deduplicate, DedupConfig};
