//! # textsplit
//!
//! A **split-safe delimited-text tokenizer** for batch jobs that read large text
//! files in parallel byte ranges.
//!
//! ## Key Features
//!
//! - **Record scanning** - separators, optional quoting and escape sequences, and
//!   LF, CR LF or lone CR line endings
//! - **Split trimming** - workers reading disjoint byte ranges of one file together
//!   see every record exactly once
//! - **Field decoding and encoding** - doubled quotes, escape tables, null encodings
//!   and per-field or per-record transformers
//! - **Record drivers** - header lines, trimming, empty-field skipping and field-count
//!   policies with diagnostics carrying line and row numbers
//! - **File sharding** - byte-range shards read and written in parallel with Rayon
//!   in a deterministic order
//!
//! ## Quick Start
//!
//! ```
//! use textsplit::*;
//!
//! # fn main() -> Result<()> {
//! let format = TextFormat::builder()
//!     .field_separator(',')
//!     .quote('"')
//!     .build()?;
//!
//! let mut writer = format.open_string_writer();
//! writer.write_record([Some("he said \"hi\""), Some("x,y")])?;
//! let text = writer.into_inner()?;
//! assert_eq!(text, "\"he said \"\"hi\"\"\",\"x,y\"\n");
//!
//! let mut reader = format.open_reader(text.as_bytes());
//! let row = reader.read_record()?;
//! assert_eq!(row, Some(vec![Some("he said \"hi\"".into()), Some("x,y".into())]));
//! # Ok(())
//! # }
//! ```
//!
//! ## Splits
//!
//! A record belongs to the split whose byte range contains the line feed before
//! it; the first record belongs to the split at offset 0. [`TextFormat::open_split`]
//! applies that rule, and [`io::text`] builds whole-file shard plans on top of it.
//! Only [splittable](TextFormat::is_splittable) formats, where a line feed always
//! ends a record, can be read past the head of a file.
//!
//! ## Module Overview
//!
//! - [`escape`] - Escape tables for bare field content
//! - [`scanner`] - The record scanner state machine
//! - [`split`] - Byte-range boundary correction
//! - [`format`] - The format facade and its configuration
//! - [`field`] - Field readers and writers
//! - [`input`] - Record drivers with column lists
//! - [`charset`] - Byte/character conversion
//! - [`io`] - File I/O, sharding and globbing
//! - [`testing`] - Temporary files and assertions for tests

pub mod charset;
pub mod error;
pub mod escape;
pub mod field;
pub mod format;
pub mod input;
pub mod io;
pub mod scanner;
pub mod split;
pub mod testing;

// General re-exports
pub use charset::{CharSink, CharSource, Charset, Decoder, Encoder, StrSource};
pub use error::{
    FormatError, FormatErrorKind, Result, TextError, UnmappableCode, UnmappableEntry,
};
pub use escape::{EscapeCodec, EscapeEntry, Lookup};
pub use field::{DelimitedFieldReader, DelimitedFieldWriter, FieldTransformer, LineSeparator, LineTransformer, Row};
pub use format::{EscapeConfig, TextFormat, TextFormatBuilder, TextFormatConfig};
pub use input::{ErrorAction, HeaderPolicy, InputOptions, RecordInput, RecordOutput};
pub use split::{SplitTrimmer, open_split};
pub use io::text::{
    TextShards, build_text_shards, read_text_par, read_text_range, read_text_vec, write_text_vec,
};

// Gated re-exports
#[cfg(feature = "parallel-io")]
pub use io::text::write_text_par;

#[cfg(feature = "glob")]
pub use io::glob::{expand_glob, expand_glob_required};

#[cfg(feature = "glob")]
pub use io::text::build_text_shards_glob;
