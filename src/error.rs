//! Error types shared by the scanner, the field reader/writer and the format facade.
//!
//! Three families of failures exist:
//! - **Format errors** ([`FormatError`]) are fatal to the current record only. The
//!   scanner raises them after the offending record has been fully consumed, so the
//!   next call starts cleanly at the following record.
//! - **Configuration errors** surface from [`TextFormatBuilder::build`](crate::TextFormatBuilder::build)
//!   and never at first use.
//! - **I/O errors** from the underlying source or sink are passed through unchanged.

use std::fmt;
use std::io;

/// Result type for tokenizer operations.
pub type Result<T> = std::result::Result<T, TextError>;

/// Errors raised by this crate.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The text does not follow the configured grammar.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// The format configuration is invalid or incomplete.
    #[error("invalid text format configuration: {0}")]
    Config(String),

    /// One or more field values could not be written faithfully.
    ///
    /// The record has already been written when this is returned.
    #[error("record cannot be mapped to text: {}", describe_unmappable(.0))]
    Unmappable(Vec<UnmappableEntry>),

    /// A record does not fit the expected columns.
    #[error(
        "{message} (path={path}, line={}, row={})",
        index_message(*line_number),
        index_message(*record_index)
    )]
    Input {
        /// Name of the input, usually its file path.
        path: String,
        /// 0-based line number of the record, if known.
        line_number: Option<u64>,
        /// 0-based index of the record, if known.
        record_index: Option<u64>,
        /// What went wrong.
        message: String,
    },

    /// The underlying byte/character source or sink failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl TextError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Returns the format error if this is one.
    #[must_use]
    pub fn as_format(&self) -> Option<&FormatError> {
        match self {
            Self::Format(e) => Some(e),
            _ => None,
        }
    }
}

/// Kind of grammar violation detected by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatErrorKind {
    /// The stream ended inside a quoted field.
    UnterminatedQuote,
    /// A line feed appeared inside a quoted field while that is not permitted.
    LineFeedInQuote,
}

impl fmt::Display for FormatErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnterminatedQuote => f.write_str("unterminated quoted field"),
            Self::LineFeedInQuote => f.write_str("line feed inside quoted field"),
        }
    }
}

/// A malformed record, carrying its raw text for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "text format is not valid ({kind}): line={}, row={}, text={text:?}",
    fmt_index(.line_number),
    fmt_index(.record_index)
)]
pub struct FormatError {
    /// What went wrong.
    pub kind: FormatErrorKind,
    /// 0-based line number where the record starts, if tracked.
    pub line_number: Option<u64>,
    /// 0-based index of the record, if tracked.
    pub record_index: Option<u64>,
    /// Raw text of the whole record (without its terminator).
    pub text: String,
}

/// Reason a field value could not be written faithfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmappableCode {
    /// A null value was written but the format has no null encoding.
    UndefinedNullSequence,
    /// A field contains a bare field separator.
    ExtraFieldSeparator,
    /// A field contains a bare CR or LF.
    ExtraRecordSeparator,
    /// A bare escape character is followed by a character that would be decoded.
    ConflictEscapeSequence,
    /// A field ends with a bare escape character that swallows the next field separator.
    LostFieldSeparator,
    /// A record ends with a bare escape character that swallows the line separator.
    LostRecordSeparator,
}

/// One problem found while writing a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmappableEntry {
    /// 0-based index of the field within the record.
    pub field_index: usize,
    /// What went wrong.
    pub code: UnmappableCode,
}

fn describe_unmappable(entries: &[UnmappableEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("column {}: {:?}", e.field_index + 1, e.code))
        .collect::<Vec<_>>()
        .join(", ")
}

#[allow(clippy::ref_option)]
fn fmt_index(index: &Option<u64>) -> String {
    index_message(*index)
}

/// Formats a 0-based index as a 1-based message, or `N/A` when unknown.
pub(crate) fn index_message(index: Option<u64>) -> String {
    index.map_or_else(|| "N/A".to_string(), |i| (i + 1).to_string())
}
