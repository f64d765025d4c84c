//! Binary path resolution for cd-hit-est
//!
//! Search order:
//! 1. An explicit path given on the command line
//! 2. `$CDHIT_DIR/<binary>` (the install directory of a cd-hit build)
//! 3. Every directory on `$PATH`

use anyhow::{anyhow, bail, Result};
use std::env;
use std::path::{Path, PathBuf};

pub const CDHIT_BINARY: &str = "cd-hit-est";
pub const CDHIT_DIR_VAR: &str = "CDHIT_DIR";

fn is_executable_file(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        path.metadata()
            .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        path.is_file()
    }
}

/// Look for `binary_name` in each directory of a `PATH`-style list
pub fn search_path_list(binary_name: &str, path_list: &std::ffi::OsStr) -> Option<PathBuf> {
    env::split_paths(path_list)
        .map(|dir| dir.join(binary_name))
        .find(|candidate| is_executable_file(candidate))
}

/// Resolve the cd-hit-est binary.
///
/// An explicit path that does not exist is an error rather than a reason to
/// fall back to the search.
pub fn find_binary(binary_name: &str, explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if is_executable_file(path) {
            return Ok(path.to_path_buf());
        }
        bail!("{} binary not found or not executable at {}", binary_name, path.display());
    }

    if let Some(dir) = env::var_os(CDHIT_DIR_VAR) {
        let candidate = PathBuf::from(dir).join(binary_name);
        if is_executable_file(&candidate) {
            return Ok(candidate);
        }
        log::warn!(
            "${} is set but {} is not there; searching PATH",
            CDHIT_DIR_VAR,
            candidate.display()
        );
    }

    if let Some(found) = env::var_os("PATH").and_then(|paths| search_path_list(binary_name, &paths)) {
        return Ok(found);
    }

    Err(anyhow!(
        "{} not found in ${} or PATH.\n\
         Install cd-hit, or pass its location with --cd-hit.",
        binary_name,
        CDHIT_DIR_VAR
    ))
}
