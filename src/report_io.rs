/// Report writers
///
/// Four files are written next to each other under one output prefix:
/// `.fasta_clusters`, `.cluster_summary`, `.cluster_sizes` and `_unique.fa`.
/// The console summary goes to stdout as plain text or an HTML fragment.
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::report::Report;

const SEPARATOR: &str = "----------------------------------------";

/// Console summary style
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ConsoleFormat {
    Text,
    Html,
}

/// Every cluster with its members as FASTA records
pub fn write_fasta_clusters<W: Write>(out: &mut W, report: &Report, input_name: &str) -> std::io::Result<()> {
    write!(out, "File analyzed: {input_name}")?;
    for detail in &report.details {
        write!(
            out,
            "\n{SEPARATOR}\nCluster {}   Reference sequence: {} Number of sequences: {}\n",
            detail.id,
            detail.reference,
            detail.size()
        )?;
        for (id, sequence) in &detail.members {
            writeln!(out, ">{id}\n{sequence}")?;
        }
    }
    Ok(())
}

/// Totals plus one tab-separated row per cluster
pub fn write_cluster_summary<W: Write>(out: &mut W, report: &Report, input_name: &str) -> std::io::Result<()> {
    let summary = &report.summary;
    writeln!(out, "File analyzed: {input_name}")?;
    writeln!(out, "Replicate filter version {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(
        out,
        "Number of sequences: {}  Number of unique reads: {}  Percent of repeats {:.2}",
        summary.total_reads, summary.unique_reads, summary.percent_replicates
    )?;
    writeln!(out, "Cluster\tRef sequence\tNum of seq")?;
    for detail in &report.details {
        writeln!(out, "{}\t{}\t{}", detail.id, detail.reference, detail.size())?;
    }
    Ok(())
}

/// Histogram of cluster sizes, smallest size first
pub fn write_cluster_sizes<W: Write>(out: &mut W, report: &Report, input_name: &str) -> std::io::Result<()> {
    writeln!(out, "File analyzed:\n{input_name}")?;
    writeln!(out, "Cluster size\tNumber of clusters")?;
    for (size, count) in &report.histogram {
        writeln!(out, "{size}\t{count}")?;
    }
    Ok(())
}

/// One reference sequence per cluster
pub fn write_unique_fasta<W: Write>(out: &mut W, report: &Report) -> std::io::Result<()> {
    for (id, sequence) in &report.unique {
        writeln!(out, ">{id}\n{sequence}")?;
    }
    Ok(())
}

pub fn write_console_summary<W: Write>(out: &mut W, report: &Report, format: ConsoleFormat) -> std::io::Result<()> {
    let summary = &report.summary;
    let largest = report.largest();
    match format {
        ConsoleFormat::Text => {
            writeln!(out, "Number of reads: {}", summary.total_reads)?;
            writeln!(out, "Number of unique reads: {}", summary.unique_reads)?;
            writeln!(
                out,
                "Percent of reads that are replicates: {:.2} %\n",
                summary.percent_replicates
            )?;
            writeln!(out, "{} largest clusters\n", largest.len())?;
            for ranked in largest {
                writeln!(out, "Cluster {} Number of sequences: {}", ranked.id, ranked.size)?;
            }
        }
        ConsoleFormat::Html => {
            writeln!(
                out,
                "<dl><dd>Number of reads: {} <dd>Number of unique reads: {} \
                 <dd>Percent of reads that are replicates: {:.2} %</dl>",
                summary.total_reads, summary.unique_reads, summary.percent_replicates
            )?;
            writeln!(out, "<p>{} largest clusters <dl>", largest.len())?;
            for ranked in largest {
                writeln!(out, "<dd>Cluster {} Number of sequences: {}", ranked.id, ranked.size)?;
            }
            writeln!(out, "</dl>")?;
        }
    }
    Ok(())
}

/// Paths of the four report files for one output prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub fasta_clusters: PathBuf,
    pub cluster_summary: PathBuf,
    pub cluster_sizes: PathBuf,
    pub unique_fasta: PathBuf,
}

impl ReportPaths {
    pub fn from_prefix(prefix: &Path) -> Self {
        let with_suffix = |suffix: &str| {
            let mut name = prefix.as_os_str().to_owned();
            name.push(suffix);
            PathBuf::from(name)
        };
        ReportPaths {
            fasta_clusters: with_suffix(".fasta_clusters"),
            cluster_summary: with_suffix(".cluster_summary"),
            cluster_sizes: with_suffix(".cluster_sizes"),
            unique_fasta: with_suffix("_unique.fa"),
        }
    }
}

fn write_file<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
{
    let file = File::create(path).with_context(|| format!("Cannot open {} for writing", path.display()))?;
    let mut writer = BufWriter::new(file);
    write(&mut writer).with_context(|| format!("Failed to write {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Write all four report files under `prefix`
pub fn write_reports(prefix: &Path, report: &Report, input_name: &str) -> Result<ReportPaths> {
    let paths = ReportPaths::from_prefix(prefix);
    write_file(&paths.fasta_clusters, |w| write_fasta_clusters(w, report, input_name))?;
    write_file(&paths.cluster_summary, |w| write_cluster_summary(w, report, input_name))?;
    write_file(&paths.cluster_sizes, |w| write_cluster_sizes(w, report, input_name))?;
    write_file(&paths.unique_fasta, |w| write_unique_fasta(w, report))?;
    log::info!("Wrote reports to {}.*", prefix.display());
    Ok(paths)
}
