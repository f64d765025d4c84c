//! Parser for cd-hit `.clstr` cluster listings.
//!
//! A listing is a series of blocks:
//!
//! ```text
//! >Cluster 0
//! 0	454nt, >read_17... *
//! 1	450nt, >read_3... at +/98.89%
//! ```
//!
//! Names carry a leading `>` and a trailing `...` which are stripped. The `*`
//! member is the representative and always ends up first in the member list.

use anyhow::{Context, Result};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_till1},
    character::complete::{alpha0, char, digit1, space0, space1},
    combinator::{all_consuming, map, map_opt, map_res},
    sequence::{pair, preceded, terminated},
    IResult,
};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use crate::cluster::{ClusterListing, RawCluster};
use crate::error::ReplicateError;

const NAME_DECORATION: &str = "...";

/// Role a member plays within its cluster
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MemberRole {
    Representative,
    /// Aligned to the representative; identity is in percent
    Aligned { strand: Option<char>, identity: f64 },
}

/// One member line of a cluster block
#[derive(Debug, Clone, PartialEq)]
pub struct MemberLine<'a> {
    pub index: usize,
    pub length: usize,
    pub name: &'a str,
    pub role: MemberRole,
}

fn number(input: &str) -> IResult<&str, usize> {
    map_res(digit1, |s: &str| s.parse::<usize>())(input)
}

fn strip_decoration(name: &str) -> Option<&str> {
    name.strip_suffix(NAME_DECORATION)
        .filter(|stripped| !stripped.is_empty())
}

fn decorated_name(input: &str) -> IResult<&str, &str> {
    preceded(
        char('>'),
        map_opt(take_till1(|c: char| c.is_whitespace()), strip_decoration),
    )(input)
}

/// `98.89%`, `+/98.89%` or `1:450:1:450/+/98.89%`
fn identity_field(field: &str) -> Option<MemberRole> {
    let pct = field.strip_suffix('%')?;
    let (qualifiers, value) = match pct.rsplit_once('/') {
        Some((q, v)) => (Some(q), v),
        None => (None, pct),
    };
    let identity: f64 = value.parse().ok()?;
    let strand = qualifiers
        .and_then(|q| q.rsplit('/').next())
        .and_then(|s| match s {
            "+" => Some('+'),
            "-" => Some('-'),
            _ => None,
        });
    Some(MemberRole::Aligned { strand, identity })
}

fn role(input: &str) -> IResult<&str, MemberRole> {
    alt((
        map(char('*'), |_| MemberRole::Representative),
        preceded(
            pair(tag("at"), space1),
            map_opt(take_till1(|c: char| c.is_whitespace()), identity_field),
        ),
    ))(input)
}

fn member_line(input: &str) -> IResult<&str, MemberLine<'_>> {
    let (input, index) = number(input)?;
    let (input, _) = space1(input)?;
    let (input, length) = number(input)?;
    let (input, _) = pair(alpha0, char(','))(input)?;
    let (input, _) = space1(input)?;
    let (input, name) = decorated_name(input)?;
    let (input, _) = space1(input)?;
    let (input, role) = terminated(role, space0)(input)?;
    Ok((
        input,
        MemberLine {
            index,
            length,
            name,
            role,
        },
    ))
}

fn header_line(input: &str) -> IResult<&str, &str> {
    terminated(
        preceded(
            pair(tag(">Cluster"), space1),
            take_till1(|c: char| c.is_whitespace()),
        ),
        space0,
    )(input)
}

/// Parse a single member line; `None` if it matches neither role shape
pub fn parse_member_line(line: &str) -> Option<MemberLine<'_>> {
    all_consuming(member_line)(line.trim())
        .ok()
        .map(|(_, parsed)| parsed)
}

/// Cluster block being accumulated
struct Block {
    key: String,
    representative: Option<String>,
    others: Vec<String>,
    seen: HashSet<String>,
}

impl Block {
    fn new(key: &str) -> Self {
        Block {
            key: key.to_string(),
            representative: None,
            others: Vec::new(),
            seen: HashSet::new(),
        }
    }

    fn add(&mut self, member: MemberLine<'_>, line: usize) -> Result<(), ReplicateError> {
        if !self.seen.insert(member.name.to_string()) {
            return Err(ReplicateError::DuplicateMember {
                key: self.key.clone(),
                member: member.name.to_string(),
            });
        }
        match member.role {
            MemberRole::Representative => {
                if self.representative.is_some() {
                    return Err(ReplicateError::DuplicateRepresentative {
                        key: self.key.clone(),
                        line,
                    });
                }
                self.representative = Some(member.name.to_string());
            }
            MemberRole::Aligned { .. } => self.others.push(member.name.to_string()),
        }
        Ok(())
    }

    fn finish(self) -> Result<RawCluster, ReplicateError> {
        if self.seen.is_empty() {
            return Err(ReplicateError::EmptyCluster { key: self.key });
        }
        let representative = self
            .representative
            .ok_or_else(|| ReplicateError::MissingRepresentative {
                key: self.key.clone(),
            })?;

        let mut members = Vec::with_capacity(self.others.len() + 1);
        members.push(representative);
        members.extend(self.others);
        Ok(RawCluster {
            key: self.key,
            members,
        })
    }
}

fn close_block(listing: &mut ClusterListing, block: Block) -> Result<(), ReplicateError> {
    let cluster = block.finish()?;
    listing.sizes.insert(cluster.key.clone(), cluster.len());
    listing.clusters.insert(cluster.key.clone(), cluster);
    Ok(())
}

/// Parse a cd-hit cluster listing.
///
/// Empty input gives an empty listing. Any line that is not a header, a
/// member line or blank aborts the parse, and so does a member that already
/// belongs to an earlier cluster.
pub fn parse(text: &str) -> Result<ClusterListing, ReplicateError> {
    let mut listing = ClusterListing::default();
    let mut current: Option<Block> = None;
    // member -> key of the cluster that first listed it
    let mut assigned: HashMap<String, String> = HashMap::new();

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with('>') {
            let (_, key) = all_consuming(header_line)(line).map_err(|_| {
                ReplicateError::MalformedLine {
                    line: line_no,
                    text: line.to_string(),
                }
            })?;

            if let Some(block) = current.take() {
                close_block(&mut listing, block)?;
            }
            if listing.clusters.contains_key(key) {
                return Err(ReplicateError::DuplicateClusterKey {
                    key: key.to_string(),
                    line: line_no,
                });
            }
            current = Some(Block::new(key));
            continue;
        }

        let block = current
            .as_mut()
            .ok_or(ReplicateError::MemberOutsideCluster { line: line_no })?;
        let member = parse_member_line(line).ok_or_else(|| ReplicateError::MalformedLine {
            line: line_no,
            text: line.to_string(),
        })?;
        if let Some(first_key) = assigned.get(member.name) {
            if *first_key != block.key {
                return Err(ReplicateError::MemberInTwoClusters {
                    member: member.name.to_string(),
                    first_key: first_key.clone(),
                    key: block.key.clone(),
                    line: line_no,
                });
            }
        }
        let name = member.name.to_string();
        block.add(member, line_no)?;
        assigned.insert(name, block.key.clone());
    }

    if let Some(block) = current.take() {
        close_block(&mut listing, block)?;
    }

    Ok(listing)
}

/// Read and parse a `.clstr` file
pub fn read_cluster_file<P: AsRef<Path>>(path: P) -> Result<ClusterListing> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read cluster listing {}", path.display()))?;
    let listing =
        parse(&text).with_context(|| format!("Malformed cluster listing {}", path.display()))?;
    log::info!(
        "Read {} raw clusters ({} members) from {}",
        listing.len(),
        listing.total_members(),
        path.display()
    );
    Ok(listing)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
>Cluster 0
0\t454nt, >read_3... at +/98.89%
1\t460nt, >read_17... *
2\t452nt, >read_8... at -/99.12%
>Cluster 1
0\t300nt, >read_9... *
";

    #[test]
    fn test_representative_moves_first() {
        let listing = parse(LISTING).unwrap();
        assert_eq!(listing.len(), 2);

        let first = &listing.clusters["0"];
        assert_eq!(first.members, vec!["read_17", "read_3", "read_8"]);
        assert_eq!(first.representative(), Some("read_17"));
        assert_eq!(listing.sizes["0"], 3);

        let second = &listing.clusters["1"];
        assert_eq!(second.members, vec!["read_9"]);
        assert_eq!(listing.sizes["1"], 1);
    }

    #[test]
    fn test_listing_order_preserved() {
        let listing = parse(LISTING).unwrap();
        let keys: Vec<&String> = listing.clusters.keys().collect();
        assert_eq!(keys, vec!["0", "1"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("\n\n  \n").unwrap().is_empty());
    }

    #[test]
    fn test_member_line_shapes() {
        let rep = parse_member_line("0\t454nt, >abc... *").unwrap();
        assert_eq!(rep.index, 0);
        assert_eq!(rep.length, 454);
        assert_eq!(rep.name, "abc");
        assert_eq!(rep.role, MemberRole::Representative);

        let old_style = parse_member_line("3\t120nt, >x.y... at 97.50%").unwrap();
        assert_eq!(old_style.name, "x.y");
        assert_eq!(
            old_style.role,
            MemberRole::Aligned {
                strand: None,
                identity: 97.5
            }
        );

        let with_coords = parse_member_line("1\t450aa, >q1... at 1:450:1:450/-/100.00%").unwrap();
        assert_eq!(
            with_coords.role,
            MemberRole::Aligned {
                strand: Some('-'),
                identity: 100.0
            }
        );

        // spaces instead of a tab between index and length
        assert!(parse_member_line("0 454nt, >abc... *").is_some());
    }

    #[test]
    fn test_unrecognised_member_lines() {
        assert!(parse_member_line("0\t454nt, >abc... ?").is_none());
        assert!(parse_member_line("0\t454nt, >abc *").is_none());
        assert!(parse_member_line("0\t454nt, >abc... at").is_none());
        assert!(parse_member_line("0\t454nt, >abc... at 98.1").is_none());
        assert!(parse_member_line("0\t454nt >abc... *").is_none());
        assert!(parse_member_line("x\t454nt, >abc... *").is_none());
    }

    #[test]
    fn test_missing_representative() {
        let text = ">Cluster 4\n0\t100nt, >a... at +/99.00%\n";
        assert_eq!(
            parse(text).unwrap_err(),
            ReplicateError::MissingRepresentative { key: "4".into() }
        );
    }

    #[test]
    fn test_two_representatives() {
        let text = ">Cluster 0\n0\t100nt, >a... *\n1\t100nt, >b... *\n";
        assert_eq!(
            parse(text).unwrap_err(),
            ReplicateError::DuplicateRepresentative {
                key: "0".into(),
                line: 3
            }
        );
    }

    #[test]
    fn test_empty_cluster_block() {
        let text = ">Cluster 0\n>Cluster 1\n0\t100nt, >a... *\n";
        assert_eq!(
            parse(text).unwrap_err(),
            ReplicateError::EmptyCluster { key: "0".into() }
        );
    }

    #[test]
    fn test_malformed_line_is_not_dropped() {
        let text = ">Cluster 0\n0\t100nt, >a... *\nthis is not a member\n";
        assert!(matches!(
            parse(text).unwrap_err(),
            ReplicateError::MalformedLine { line: 3, .. }
        ));
    }

    #[test]
    fn test_member_before_header() {
        let text = "0\t100nt, >a... *\n";
        assert_eq!(
            parse(text).unwrap_err(),
            ReplicateError::MemberOutsideCluster { line: 1 }
        );
    }

    #[test]
    fn test_duplicate_member_and_key() {
        let dup_member = ">Cluster 0\n0\t100nt, >a... *\n1\t100nt, >a... at 99.00%\n";
        assert!(matches!(
            parse(dup_member).unwrap_err(),
            ReplicateError::DuplicateMember { .. }
        ));

        let across = ">Cluster 0\n0\t100nt, >a... *\n>Cluster 1\n0\t100nt, >b... *\n1\t100nt, >a... at 99.00%\n";
        let err = parse(across).unwrap_err();
        assert_eq!(
            err,
            ReplicateError::MemberInTwoClusters {
                member: "a".into(),
                first_key: "0".into(),
                key: "1".into(),
                line: 5
            }
        );
        assert!(!err.is_consistency());

        let dup_key = ">Cluster 0\n0\t100nt, >a... *\n>Cluster 0\n0\t100nt, >b... *\n";
        assert_eq!(
            parse(dup_key).unwrap_err(),
            ReplicateError::DuplicateClusterKey {
                key: "0".into(),
                line: 3
            }
        );
    }
}
