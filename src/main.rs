use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use replifilter::binary_paths::{find_binary, CDHIT_BINARY};
use replifilter::cdhit::{CdHitConfig, CdHitIntegration, WorkDir, MAX_IDENTITY, MIN_IDENTITY};
use replifilter::clstr;
use replifilter::cluster::ClusterListing;
use replifilter::fasta::SequenceMap;
use replifilter::pipeline::{run_listing, DedupConfig};
use replifilter::report_io::{write_console_summary, write_reports, ConsoleFormat};

const OUTPUT_PREFIX: &str = "extracted_clusters";

fn parse_identity(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|e| format!("Invalid number: {e}"))?;
    if !(MIN_IDENTITY..=MAX_IDENTITY).contains(&value) {
        return Err(format!(
            "Please input a cutoff value between {MIN_IDENTITY} and {MAX_IDENTITY}"
        ));
    }
    Ok(value)
}

fn parse_length_ratio(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|e| format!("Invalid number: {e}"))?;
    if !(0.0..=1.0).contains(&value) {
        return Err("Please input a length requirement value between 0 and 1.0".to_string());
    }
    Ok(value)
}

/// Replicate filter - find artifactual duplicate reads
///
/// Reads are clustered with cd-hit-est, clusters are split so that every
/// member starts with the same initial bases, and one reference read is kept
/// per cluster.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Input reads (FASTA, optionally gzipped)
    #[clap(value_name = "FASTA")]
    input: PathBuf,

    /// Output directory (must not exist yet)
    #[clap(short = 'o', long = "output-dir")]
    output_dir: PathBuf,

    /// cd-hit global sequence identity cutoff
    #[clap(short = 'c', long = "identity", default_value = "0.9", value_parser = parse_identity)]
    identity: f64,

    /// Length difference requirement: 0 allows any length, 1 requires equal lengths
    #[clap(short = 's', long = "length-ratio", default_value = "0", value_parser = parse_length_ratio)]
    length_ratio: f64,

    /// Number of initial bases that must match within a cluster; 0 disables the check
    #[clap(short = 'b', long = "prefix-length", default_value = "3")]
    prefix_length: usize,

    /// Number of largest clusters to list
    #[clap(short = 'n', long = "top", default_value = "10", value_parser = clap::value_parser!(u32).range(1..))]
    top: u32,

    /// Use an existing cd-hit .clstr listing instead of running cd-hit
    #[clap(long = "clusters", conflicts_with_all = ["cd_hit", "word_size", "keep_temp"])]
    clusters: Option<PathBuf>,

    /// Path to the cd-hit-est binary ($CDHIT_DIR and PATH are searched otherwise)
    #[clap(long = "cd-hit")]
    cd_hit: Option<PathBuf>,

    /// cd-hit word length; chosen from the identity cutoff when omitted
    #[clap(long = "word-size")]
    word_size: Option<u8>,

    /// cd-hit memory limit in MB
    #[clap(long = "memory", default_value = "1000")]
    memory: u32,

    /// Console summary format
    #[clap(long = "format", value_enum, default_value = "text")]
    format: ConsoleFormat,

    /// Keep cd-hit's working files in <output-dir>/tmp
    #[clap(long = "keep-temp")]
    keep_temp: bool,

    /// Number of threads for cd-hit and refinement
    #[clap(short = 't', long = "threads", default_value = "8", value_parser = clap::value_parser!(u32).range(1..))]
    threads: u32,

    /// More log output (-v info, -vv debug)
    #[clap(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[clap(long = "quiet", conflicts_with = "verbose")]
    quiet: bool,
}

/// Where the raw clusters come from
enum ListingSource {
    Existing(ClusterListing),
    CdHit(CdHitIntegration),
}

fn init_logging(args: &Args) {
    let level = if args.quiet {
        log::LevelFilter::Error
    } else {
        match args.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        }
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads as usize)
        .build_global()?;

    if args.output_dir.exists() {
        bail!(
            "Cannot make the directory {}. Does it already exist?",
            args.output_dir.display()
        );
    }

    // Inputs and the cd-hit binary are checked before anything is written
    let sequences = SequenceMap::load(&args.input)?;
    let source = match &args.clusters {
        Some(path) => ListingSource::Existing(clstr::read_cluster_file(path)?),
        None => {
            let config = CdHitConfig {
                identity: args.identity,
                length_ratio: args.length_ratio,
                word_size: args.word_size,
                memory_mb: args.memory,
                threads: args.threads as usize,
            };
            let binary = find_binary(CDHIT_BINARY, args.cd_hit.as_deref())?;
            ListingSource::CdHit(CdHitIntegration::new(binary, config)?)
        }
    };

    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Cannot create output directory {}", args.output_dir.display()))?;

    let listing = match source {
        ListingSource::Existing(listing) => listing,
        ListingSource::CdHit(cdhit) => {
            let workdir = if args.keep_temp {
                WorkDir::kept(args.output_dir.join("tmp"))?
            } else {
                WorkDir::temporary_in(&args.output_dir)?
            };
            let clstr_path = cdhit.cluster(&sequences, workdir.path())?;
            clstr::read_cluster_file(&clstr_path)?
        }
    };

    let config = DedupConfig {
        prefix_length: args.prefix_length,
        top_n: args.top as usize,
    };
    let report = run_listing(&listing, &sequences, &config).map_err(|e| {
        if e.is_consistency() {
            anyhow::Error::new(e).context("Replicate analysis failed due to a bug; please report it")
        } else {
            anyhow::Error::new(e).context("Replicate analysis failed: inputs do not agree")
        }
    })?;

    let input_name = args.input.display().to_string();
    write_reports(&args.output_dir.join(OUTPUT_PREFIX), &report, &input_name)?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    write_console_summary(&mut handle, &report, args.format)?;
    handle.flush()?;

    if !args.quiet {
        eprintln!("Your results are in the directory: {}", args.output_dir.display());
    }

    Ok(())
}
