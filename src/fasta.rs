//! Sequence map loaded from FASTA.
//!
//! Keys are the header text up to the first whitespace, which is also the name
//! cd-hit reports in its cluster listing, so the two join without translation.

use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;
use indexmap::IndexMap;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use crate::error::ReplicateError;

/// Identifier -> sequence data, in file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceMap {
    sequences: IndexMap<String, String>,
}

/// Join key for a FASTA header: everything before the first whitespace
pub fn sequence_key(header: &str) -> &str {
    header.split_whitespace().next().unwrap_or("")
}

impl SequenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, rejecting an id that is already present
    pub fn insert(&mut self, id: String, sequence: String) -> Result<(), ReplicateError> {
        if self.sequences.contains_key(&id) {
            return Err(ReplicateError::DuplicateSequenceId { id });
        }
        self.sequences.insert(id, sequence);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.sequences.get(id).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.sequences.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parse FASTA text.
    ///
    /// Anything before the first header is ignored. `\n`, `\r\n` and bare `\r`
    /// line endings are all accepted. Sequence data is uppercased with
    /// whitespace removed; records with an empty key or no data are skipped.
    pub fn parse(text: &str) -> Result<Self, ReplicateError> {
        let mut map = SequenceMap::new();
        let mut lines = text.split(|c: char| c == '\n' || c == '\r');

        let mut header = loop {
            match lines.next() {
                Some(line) => {
                    if let Some(first) = line.strip_prefix('>') {
                        break first.to_string();
                    }
                }
                None => return Err(ReplicateError::NotFasta),
            }
        };
        let mut sequence = String::new();

        for line in lines {
            if let Some(next_header) = line.strip_prefix('>') {
                map.push_record(&header, &sequence)?;
                header = next_header.to_string();
                sequence.clear();
            } else {
                sequence.extend(
                    line.chars()
                        .filter(|c| !c.is_whitespace())
                        .map(|c| c.to_ascii_uppercase()),
                );
            }
        }
        map.push_record(&header, &sequence)?;

        Ok(map)
    }

    fn push_record(&mut self, header: &str, sequence: &str) -> Result<(), ReplicateError> {
        let key = sequence_key(header);
        if key.is_empty() || sequence.is_empty() {
            return Ok(());
        }
        self.insert(key.to_string(), sequence.to_string())
    }

    /// Load a FASTA file, gunzipping `.gz`/`.bgz` inputs
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("Failed to open FASTA {}", path.display()))?;

        let is_compressed = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext == "gz" || ext == "bgz")
            .unwrap_or(false);

        let mut reader: Box<dyn Read> = if is_compressed {
            Box::new(MultiGzDecoder::new(file))
        } else {
            Box::new(file)
        };
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .with_context(|| format!("Failed to read FASTA {}", path.display()))?;

        let map = Self::parse(&text)
            .with_context(|| format!("{} does not appear to be a FASTA file", path.display()))?;
        log::info!("Loaded {} sequences from {}", map.len(), path.display());
        Ok(map)
    }

    /// Write the map back out as unwrapped FASTA
    pub fn write_fasta<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for (id, sequence) in self.iter() {
            writeln!(writer, ">{id}\n{sequence}")?;
        }
        Ok(())
    }

    pub fn write_fasta_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("Cannot open {} for writing", path.display()))?;
        let mut writer = BufWriter::new(file);
        self.write_fasta(&mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SequenceMap {
    /// Later duplicates replace earlier ones; use [`SequenceMap::insert`] to reject them
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        SequenceMap {
            sequences: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
