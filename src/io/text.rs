//! Delimited-text file I/O with byte-range sharding.
//!
//! This module provides:
//! - **Whole-file I/O**: [`read_text_vec`] and [`write_text_vec`]
//! - **Byte-range sharding**: [`TextShards`], [`build_text_shards`], [`read_text_range`]
//! - **Parallel reading**: [`read_text_par`] reads every shard on the rayon pool
//! - **Deterministic parallel writer**: [`write_text_par`] (feature `parallel-io`)
//!
//! # Design notes
//! - Sharding is **byte-range based**. Each shard is read through a
//!   [`SplitTrimmer`](crate::split::SplitTrimmer), so records crossing a shard
//!   boundary are read exactly once, by the shard holding the line feed before them.
//! - Formats that are not [splittable](TextFormat::is_splittable) get a single shard.
//! - Results of parallel reads and writes are assembled in shard order.

use crate::field::Row;
use crate::format::TextFormat;
use anyhow::{Context, Result};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use std::fs::{File, create_dir_all};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Read a whole delimited-text file into rows.
///
/// # Errors
/// Returns an error if the file cannot be opened or a record is malformed.
pub fn read_text_vec(format: &TextFormat, path: impl AsRef<Path>) -> Result<Vec<Row>> {
    let path = path.as_ref();
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut reader = format.open_reader(BufReader::new(f));
    let mut out = Vec::new();
    for (i, row) in reader.records().enumerate() {
        let row = row.with_context(|| format!("read record #{} of {}", i + 1, path.display()))?;
        out.push(row);
    }
    Ok(out)
}

/// Write rows to a delimited-text file.
///
/// Creates parent directories if they don't exist.
///
/// # Returns
/// The number of rows written (i.e., `rows.len()`).
///
/// # Errors
/// Returns an error if the file/dirs cannot be created, a value cannot be
/// represented in the format, or flushing fails.
pub fn write_text_vec(format: &TextFormat, path: impl AsRef<Path>, rows: &[Row]) -> Result<usize> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        create_dir_all(parent).with_context(|| format!("mkdir -p {}", parent.display()))?;
    }
    let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut writer = format.open_writer(BufWriter::new(f));
    for (i, row) in rows.iter().enumerate() {
        writer
            .write_record(row.iter().map(Option::as_deref))
            .with_context(|| format!("write record #{} to {}", i + 1, path.display()))?;
    }
    writer.close()?;
    Ok(rows.len())
}

/// Byte-range sharding metadata for one file.
///
/// The ranges are contiguous, gapless and cover `[0, total_bytes)`.
///
/// Construct with [`build_text_shards`] and read ranges with [`read_text_range`].
#[derive(Debug, Clone)]
pub struct TextShards {
    /// Source file path.
    pub path: PathBuf,
    /// Byte ranges as `(offset, length)`.
    pub ranges: Vec<(u64, u64)>,
    /// File size in bytes.
    pub total_bytes: u64,
}

/// Build [`TextShards`] by slicing the file into ranges of `split_size` bytes.
///
/// * For empty files, returns `TextShards` with no ranges.
/// * Formats that are not splittable get one range covering the file.
///
/// # Errors
/// Returns an error if the file metadata cannot be read.
pub fn build_text_shards(
    format: &TextFormat,
    path: impl AsRef<Path>,
    split_size: u64,
) -> Result<TextShards> {
    let path = path.as_ref().to_path_buf();
    let total = std::fs::metadata(&path)
        .with_context(|| format!("stat {}", path.display()))?
        .len();
    let ranges = if total == 0 {
        vec![]
    } else if !format.is_splittable() {
        vec![(0, total)]
    } else {
        let size = split_size.max(1);
        (0..total.div_ceil(size))
            .map(|i| {
                let offset = i * size;
                (offset, size.min(total - offset))
            })
            .collect()
    };
    log::debug!(
        "{}: {} bytes in {} shard(s) (splittable={})",
        path.display(),
        total,
        ranges.len(),
        format.is_splittable()
    );
    Ok(TextShards {
        path,
        ranges,
        total_bytes: total,
    })
}

/// Read the records owned by a single shard `(offset, length)`.
///
/// # Errors
/// Returns an error if the file cannot be opened or a record is malformed.
pub fn read_text_range(
    format: &TextFormat,
    src: &TextShards,
    offset: u64,
    length: u64,
) -> Result<Vec<Row>> {
    let f = File::open(&src.path).with_context(|| format!("open {}", src.path.display()))?;
    let mut reader = format
        .open_split(f, offset, length)
        .with_context(|| format!("open split {offset}+{length} of {}", src.path.display()))?;
    let mut out = Vec::new();
    for row in reader.records() {
        out.push(row.with_context(|| {
            format!("read split {offset}+{length} of {}", src.path.display())
        })?);
    }
    Ok(out)
}

/// Read every shard in parallel and concatenate the rows in shard order.
///
/// # Errors
/// Returns the first error of any shard.
pub fn read_text_par(format: &TextFormat, src: &TextShards) -> Result<Vec<Row>> {
    let parts = src
        .ranges
        .par_iter()
        .map(|&(offset, length)| read_text_range(format, src, offset, length))
        .collect::<Result<Vec<_>>>()?;
    Ok(parts.into_iter().flatten().collect())
}

/// Writes `rows` to `path`, encoding slices of them on the rayon pool.
///
/// The rows are cut into at most `shards` equal slices (twice the CPU count by
/// default). Each slice is encoded into its own buffer and the buffers are
/// written in slice order, so the file is byte-identical to what
/// [`write_text_vec`] produces. Returns the number of rows written.
///
/// # Errors
/// Fails on the first record that cannot be written faithfully, or on file I/O.
#[cfg(feature = "parallel-io")]
pub fn write_text_par(
    format: &TextFormat,
    path: impl AsRef<Path>,
    rows: &[Row],
    shards: Option<usize>,
) -> Result<usize> {
    use rayon::iter::IndexedParallelIterator;
    use rayon::slice::ParallelSlice;

    let path = path.as_ref();
    let chunk = chunk_len(rows.len(), shards.unwrap_or_else(|| 2 * num_cpus::get().max(2)));
    log::debug!(
        "{}: writing {} rows in {} shard(s)",
        path.display(),
        rows.len(),
        rows.len().div_ceil(chunk)
    );

    let encoded = rows
        .par_chunks(chunk)
        .enumerate()
        .map(|(shard, part)| {
            let mut buf = Vec::new();
            let mut writer = format.open_writer(&mut buf);
            for (i, row) in part.iter().enumerate() {
                writer
                    .write_record(row.iter().map(Option::as_deref))
                    .with_context(|| format!("write record #{}", shard * chunk + i + 1))?;
            }
            writer.close()?;
            Ok::<_, anyhow::Error>(buf)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    for buf in &encoded {
        file.write_all(buf)?;
    }
    file.flush()?;
    Ok(rows.len())
}

/// Rows per slice when `len` rows are cut into at most `shards` slices.
#[cfg(feature = "parallel-io")]
fn chunk_len(len: usize, shards: usize) -> usize {
    len.div_ceil(shards.max(1)).max(1)
}

/// Build [`TextShards`] for every file matching a glob pattern, in path order.
///
/// # Errors
/// Returns an error if the pattern is invalid or any file cannot be inspected.
#[cfg(feature = "glob")]
pub fn build_text_shards_glob(
    format: &TextFormat,
    pattern: &str,
    split_size: u64,
) -> Result<Vec<TextShards>> {
    crate::io::glob::expand_glob(pattern)?
        .into_iter()
        .map(|path| build_text_shards(format, path, split_size))
        .collect()
}
