use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;
use tempfile::TempDir;

use crate::fasta::SequenceMap;

pub const MIN_IDENTITY: f64 = 0.85;
pub const MAX_IDENTITY: f64 = 1.0;

const INPUT_FASTA_NAME: &str = "input_fasta_file.fa";
const OUTPUT_BASE_NAME: &str = "cdhit_output";

/// cd-hit-est clustering parameters
#[derive(Debug, Clone, PartialEq)]
pub struct CdHitConfig {
    /// Global sequence identity cutoff (`-c`)
    pub identity: f64,
    /// Length difference cutoff (`-s`); 0 allows any length difference
    pub length_ratio: f64,
    /// Word length (`-n`); derived from the identity when unset
    pub word_size: Option<u8>,
    /// Memory limit in MB (`-M`)
    pub memory_mb: u32,
    pub threads: usize,
}

impl Default for CdHitConfig {
    fn default() -> Self {
        CdHitConfig {
            identity: 0.9,
            length_ratio: 0.0,
            word_size: None,
            memory_mb: 1000,
            threads: 1,
        }
    }
}

impl CdHitConfig {
    pub fn validate(&self) -> Result<()> {
        if !(MIN_IDENTITY..=MAX_IDENTITY).contains(&self.identity) {
            bail!(
                "Identity cutoff {} is outside {}..={}",
                self.identity,
                MIN_IDENTITY,
                MAX_IDENTITY
            );
        }
        if !(0.0..=1.0).contains(&self.length_ratio) {
            bail!("Length difference requirement {} is outside 0..=1", self.length_ratio);
        }
        if let Some(n) = self.word_size {
            if !(5..=11).contains(&n) {
                bail!("cd-hit-est word size must be between 5 and 11, got {n}");
            }
        }
        if self.threads == 0 {
            bail!("Thread count must be at least 1");
        }
        Ok(())
    }

    /// Word length for `-n`, following cd-hit-est's documented identity ranges
    pub fn effective_word_size(&self) -> u8 {
        self.word_size.unwrap_or(if self.identity >= 0.90 {
            8
        } else if self.identity >= 0.88 {
            7
        } else {
            6
        })
    }

    /// Command-line arguments for one run
    pub fn arguments(&self, input: &Path, output_base: &Path) -> Vec<String> {
        vec![
            "-i".to_string(),
            input.to_string_lossy().into_owned(),
            "-o".to_string(),
            output_base.to_string_lossy().into_owned(),
            "-c".to_string(),
            self.identity.to_string(),
            "-n".to_string(),
            self.effective_word_size().to_string(),
            "-s".to_string(),
            self.length_ratio.to_string(),
            "-d".to_string(),
            "0".to_string(),
            "-M".to_string(),
            self.memory_mb.to_string(),
            "-T".to_string(),
            self.threads.to_string(),
        ]
    }
}

/// Where cd-hit's intermediate files live
pub enum WorkDir {
    /// Removed when dropped
    Temporary(TempDir),
    Kept(PathBuf),
}

impl WorkDir {
    /// A temporary directory inside `parent`
    pub fn temporary_in(parent: &Path) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(".cdhit-")
            .tempdir_in(parent)
            .with_context(|| format!("Failed to create temp directory in {}", parent.display()))?;
        Ok(WorkDir::Temporary(dir))
    }

    /// A directory that stays behind after the run
    pub fn kept(path: PathBuf) -> Result<Self> {
        fs::create_dir_all(&path)
            .with_context(|| format!("Cannot create directory {}", path.display()))?;
        Ok(WorkDir::Kept(path))
    }

    pub fn path(&self) -> &Path {
        match self {
            WorkDir::Temporary(dir) => dir.path(),
            WorkDir::Kept(path) => path,
        }
    }
}

/// Runs cd-hit-est and hands back its cluster listing
pub struct CdHitIntegration {
    binary: PathBuf,
    config: CdHitConfig,
}

impl CdHitIntegration {
    pub fn new(binary: PathBuf, config: CdHitConfig) -> Result<Self> {
        config.validate()?;
        Ok(CdHitIntegration { binary, config })
    }

    /// Cluster `sequences` inside `workdir` and return the `.clstr` path.
    ///
    /// The sequences are rewritten first because cd-hit does not cope with
    /// every FASTA variant the loader accepts. cd-hit's stdout and stderr are
    /// kept next to its output as `cd-hit.out` and `cd-hit.err`.
    pub fn cluster(&self, sequences: &SequenceMap, workdir: &Path) -> Result<PathBuf> {
        let input = workdir.join(INPUT_FASTA_NAME);
        sequences.write_fasta_file(&input)?;

        let output_base = workdir.join(OUTPUT_BASE_NAME);
        let args = self.config.arguments(&input, &output_base);
        log::info!("Running '{} {}'", self.binary.display(), args.join(" "));

        let start = Instant::now();
        let output = Command::new(&self.binary)
            .args(&args)
            .output()
            .with_context(|| format!("Failed to start {}", self.binary.display()))?;

        fs::write(workdir.join("cd-hit.out"), &output.stdout)?;
        fs::write(workdir.join("cd-hit.err"), &output.stderr)?;

        if !output.status.success() {
            bail!(
                "cd-hit failed ({}):\n{}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            );
        }
        log::info!("cd-hit finished in {:.1}s", start.elapsed().as_secs_f64());

        let clstr = output_base.with_extension("clstr");
        if !clstr.exists() {
            bail!("cd-hit did not produce {}", clstr.display());
        }
        Ok(clstr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_ranges() {
        assert!(CdHitConfig::default().validate().is_ok());

        let low = CdHitConfig {
            identity: 0.8,
            ..Default::default()
        };
        assert!(low.validate().is_err());

        let bad_ratio = CdHitConfig {
            length_ratio: 1.5,
            ..Default::default()
        };
        assert!(bad_ratio.validate().is_err());

        let bad_word = CdHitConfig {
            word_size: Some(4),
            ..Default::default()
        };
        assert!(bad_word.validate().is_err());
    }

    #[test]
    fn test_word_size_follows_identity() {
        let at = |identity| CdHitConfig {
            identity,
            ..Default::default()
        };
        assert_eq!(at(0.95).effective_word_size(), 8);
        assert_eq!(at(0.90).effective_word_size(), 8);
        assert_eq!(at(0.89).effective_word_size(), 7);
        assert_eq!(at(0.85).effective_word_size(), 6);

        let fixed = CdHitConfig {
            word_size: Some(10),
            ..Default::default()
        };
        assert_eq!(fixed.effective_word_size(), 10);
    }

    #[test]
    fn test_arguments() {
        let config = CdHitConfig {
            identity: 0.95,
            length_ratio: 0.5,
            threads: 4,
            ..Default::default()
        };
        let args = config.arguments(Path::new("in.fa"), Path::new("work/out"));
        assert_eq!(
            args.join(" "),
            "-i in.fa -o work/out -c 0.95 -n 8 -s 0.5 -d 0 -M 1000 -T 4"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_binary_reports_stderr() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let fake = dir.path().join("cd-hit-est");
        fs::write(&fake, "#!/bin/sh\necho 'bad options' >&2\nexit 3\n").unwrap();
        fs::set_permissions(&fake, fs::Permissions::from_mode(0o755)).unwrap();

        let cdhit = CdHitIntegration::new(fake, CdHitConfig::default()).unwrap();
        let seqs: SequenceMap = vec![("r1", "ACGT")].into_iter().collect();
        let err = cdhit.cluster(&seqs, dir.path()).unwrap_err();

        assert!(err.to_string().contains("bad options"));
        assert!(dir.path().join("cd-hit.err").exists());
        assert!(dir.path().join(INPUT_FASTA_NAME).exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_fake_binary_listing_is_returned() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let fake = dir.path().join("cd-hit-est");
        // writes a one-cluster listing to <-o value>.clstr
        fs::write(
            &fake,
            "#!/bin/sh\nwhile [ $# -gt 0 ]; do if [ \"$1\" = -o ]; then out=$2; fi; shift; done\n\
             printf '>Cluster 0\\n0\\t4nt, >r1... *\\n' > \"$out.clstr\"\n",
        )
        .unwrap();
        fs::set_permissions(&fake, fs::Permissions::from_mode(0o755)).unwrap();

        let cdhit = CdHitIntegration::new(fake, CdHitConfig::default()).unwrap();
        let seqs: SequenceMap = vec![("r1", "ACGT")].into_iter().collect();
        let clstr = cdhit.cluster(&seqs, dir.path()).unwrap();
        let listing = crate::clstr::read_cluster_file(&clstr).unwrap();
        assert_eq!(listing.clusters["0"].members, vec!["r1"]);
    }
}
