//! File globbing for selecting the inputs of a batch job.
//!
//! ```no_run
//! use textsplit::io::glob::expand_glob;
//!
//! // All tab-separated files of one day partition, in path order
//! let files = expand_glob("data/sales/day=2024-05-01/*.tsv")?;
//! # use anyhow::Error; Ok::<(), Error>(())
//! ```

use anyhow::{Context, Result, bail};
use glob::glob;
use std::path::PathBuf;

/// Expand a glob pattern into a sorted vector of matching file paths.
///
/// Directories are skipped. The result is sorted lexicographically so that
/// shard order, and therefore output order, is deterministic.
///
/// Supports the usual glob syntax: `*`, `?`, `**`, `[abc]` and `[!abc]`.
///
/// # Errors
///
/// Returns an error if the pattern is invalid or a matched entry cannot be read.
/// No match at all is not an error; see [`expand_glob_required`].
pub fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))?;

    let mut result = Vec::new();
    for entry in paths {
        let path =
            entry.with_context(|| format!("error reading glob entry for pattern: {pattern}"))?;
        if path.is_file() {
            result.push(path);
        }
    }
    result.sort();
    log::debug!("{pattern}: {} file(s)", result.len());
    Ok(result)
}

/// Expand a glob pattern, returning an error if no files are found.
///
/// # Errors
///
/// Same as [`expand_glob`], plus an error when nothing matches.
pub fn expand_glob_required(pattern: &str) -> Result<Vec<PathBuf>> {
    let files = expand_glob(pattern)?;
    if files.is_empty() {
        bail!("no files found matching pattern: {pattern}");
    }
    Ok(files)
}
