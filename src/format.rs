//! The text format facade: configuration, validation and reader/writer factories.
//!
//! ```
//! use textsplit::TextFormat;
//!
//! let format = TextFormat::builder()
//!     .field_separator(',')
//!     .quote('"')
//!     .build()?;
//!
//! let mut reader = format.open_reader("id,name\n1,\"Smith, J\"\n".as_bytes());
//! let rows: Vec<_> = reader.records().collect::<Result<_, _>>()?;
//! assert_eq!(rows[1], vec![Some("1".to_string()), Some("Smith, J".to_string())]);
//! # Ok::<(), textsplit::TextError>(())
//! ```

use crate::charset::{CharSource, Charset, Decoder, Encoder};
use crate::error::{Result, TextError};
use crate::escape::{EscapeCodec, EscapeEntry};
use crate::field::{DelimitedFieldReader, DelimitedFieldWriter, FieldTransformer, LineSeparator, LineTransformer};
use crate::scanner::Grammar;
use crate::split::{SplitTrimmer, open_split};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Read, Seek, Write};
use std::sync::Arc;

const DEFAULT_FIELD_SEPARATOR: char = '\t';

/// A validated delimited-text format.
///
/// Cheap to clone; readers and writers keep their own copy.
#[derive(Clone)]
pub struct TextFormat {
    charset: Charset,
    line_separator: LineSeparator,
    field_separator: char,
    quote: Option<char>,
    allow_lf_in_quote: bool,
    escape: Option<EscapeCodec>,
    input_transformer: Option<FieldTransformer>,
    output_transformer: Option<FieldTransformer>,
    input_line_transformer: Option<LineTransformer>,
    output_line_transformer: Option<LineTransformer>,
}

impl Default for TextFormat {
    /// Tab-separated UTF-8 with Unix line endings, no quoting and no escapes.
    fn default() -> Self {
        Self {
            charset: Charset::Utf8,
            line_separator: LineSeparator::Unix,
            field_separator: DEFAULT_FIELD_SEPARATOR,
            quote: None,
            allow_lf_in_quote: true,
            escape: None,
            input_transformer: None,
            output_transformer: None,
            input_line_transformer: None,
            output_line_transformer: None,
        }
    }
}

impl fmt::Debug for TextFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextFormat")
            .field("charset", &self.charset)
            .field("line_separator", &self.line_separator)
            .field("field_separator", &self.field_separator)
            .field("quote", &self.quote)
            .field("allow_lf_in_quote", &self.allow_lf_in_quote)
            .field("escape", &self.escape)
            .field("input_transformer", &self.input_transformer.is_some())
            .field("output_transformer", &self.output_transformer.is_some())
            .field("input_line_transformer", &self.input_line_transformer.is_some())
            .field("output_line_transformer", &self.output_line_transformer.is_some())
            .finish()
    }
}

impl TextFormat {
    /// Starts a builder with the default settings.
    #[must_use]
    pub fn builder() -> TextFormatBuilder {
        TextFormatBuilder::default()
    }

    /// Builds a format from a JSON configuration document.
    ///
    /// # Errors
    /// Returns [`TextError::Config`] when the document cannot be parsed or the
    /// configuration is invalid.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: TextFormatConfig = serde_json::from_str(json)
            .map_err(|e| TextError::config(format!("malformed format configuration: {e}")))?;
        Self::try_from(config)
    }

    /// Character set of the byte streams.
    #[must_use]
    pub fn charset(&self) -> Charset {
        self.charset
    }

    /// Line separator written after records.
    #[must_use]
    pub fn line_separator(&self) -> LineSeparator {
        self.line_separator
    }

    /// Field separator.
    #[must_use]
    pub fn field_separator(&self) -> char {
        self.field_separator
    }

    /// Quote character, if quoting is enabled.
    #[must_use]
    pub fn quote(&self) -> Option<char> {
        self.quote
    }

    /// Whether quoted fields may contain line feeds.
    #[must_use]
    pub fn allow_lf_in_quote(&self) -> bool {
        self.allow_lf_in_quote
    }

    /// Escape codec for bare fields.
    #[must_use]
    pub fn escape(&self) -> Option<&EscapeCodec> {
        self.escape.as_ref()
    }

    pub(crate) fn input_transformer(&self) -> Option<&FieldTransformer> {
        self.input_transformer.as_ref()
    }

    pub(crate) fn output_transformer(&self) -> Option<&FieldTransformer> {
        self.output_transformer.as_ref()
    }

    pub(crate) fn input_line_transformer(&self) -> Option<&LineTransformer> {
        self.input_line_transformer.as_ref()
    }

    pub(crate) fn output_line_transformer(&self) -> Option<&LineTransformer> {
        self.output_line_transformer.as_ref()
    }

    pub(crate) fn grammar(&self) -> Grammar {
        Grammar {
            separator: self.field_separator,
            quote: self.quote,
            escape: self.escape.as_ref().map(EscapeCodec::escape_char),
            escaped_cr: self.escape.as_ref().is_some_and(EscapeCodec::keeps_cr),
            escaped_lf: self.escape.as_ref().is_some_and(EscapeCodec::keeps_lf),
            escaped_separator: self
                .escape
                .as_ref()
                .is_some_and(|codec| codec.decode(self.field_separator).is_mapped()),
        }
    }

    /// Whether every LF in well-formed text of this format ends a record.
    ///
    /// Only such formats can be read by byte-range splits.
    #[must_use]
    pub fn is_splittable(&self) -> bool {
        let lf_in_quote = self.quote.is_some() && self.allow_lf_in_quote;
        let lf_in_escape = self.escape.as_ref().is_some_and(EscapeCodec::keeps_lf);
        !lf_in_quote && !lf_in_escape
    }

    /// Reads records from a byte stream in this format's charset.
    pub fn open_reader<R: Read>(&self, input: R) -> DelimitedFieldReader<Decoder<R>> {
        DelimitedFieldReader::new(Decoder::new(input, self.charset), self, true)
    }

    /// Reads records from already-decoded characters.
    pub fn open_char_reader<S: CharSource>(&self, source: S) -> DelimitedFieldReader<S> {
        DelimitedFieldReader::new(source, self, true)
    }

    /// Reads the records owned by the byte-range split `(offset, length)`.
    ///
    /// Line numbers and record indices are only known for the split at offset 0.
    ///
    /// # Errors
    /// Returns [`TextError::Config`] for a split past the head of a format that is
    /// not [splittable](Self::is_splittable), or the I/O error of the seek.
    pub fn open_split<R: Read + Seek>(
        &self,
        input: R,
        offset: u64,
        length: u64,
    ) -> Result<DelimitedFieldReader<Decoder<SplitTrimmer<R>>>> {
        if offset > 0 && !self.is_splittable() {
            return Err(TextError::config(
                "format allows line feeds inside records and cannot be split",
            ));
        }
        let trimmed = open_split(input, offset, length)?;
        Ok(DelimitedFieldReader::new(
            Decoder::new(trimmed, self.charset),
            self,
            offset == 0,
        ))
    }

    /// Writes records to a byte stream in this format's charset.
    pub fn open_writer<W: Write>(&self, output: W) -> DelimitedFieldWriter<Encoder<W>> {
        DelimitedFieldWriter::new(Encoder::new(output, self.charset), self)
    }

    /// Writes records into a `String`.
    #[must_use]
    pub fn open_string_writer(&self) -> DelimitedFieldWriter<String> {
        DelimitedFieldWriter::new(String::new(), self)
    }

    /// Serializable form of this format. Transformers are not included.
    #[must_use]
    pub fn to_config(&self) -> TextFormatConfig {
        TextFormatConfig {
            charset: self.charset,
            line_separator: self.line_separator,
            field_separator: self.field_separator,
            quote: self.quote,
            allow_lf_in_quote: self.allow_lf_in_quote,
            escape: self.escape.as_ref().map(|codec| EscapeConfig {
                character: codec.escape_char(),
                sequences: codec.entries().to_vec(),
            }),
        }
    }
}

/// Builder for [`TextFormat`]; see [`TextFormat::builder`].
#[derive(Clone)]
pub struct TextFormatBuilder {
    format: TextFormat,
}

impl Default for TextFormatBuilder {
    fn default() -> Self {
        Self {
            format: TextFormat::default(),
        }
    }
}

impl TextFormatBuilder {
    /// Sets the charset (default UTF-8).
    #[must_use]
    pub fn charset(mut self, charset: Charset) -> Self {
        self.format.charset = charset;
        self
    }

    /// Sets the line separator written after records (default Unix).
    #[must_use]
    pub fn line_separator(mut self, line_separator: LineSeparator) -> Self {
        self.format.line_separator = line_separator;
        self
    }

    /// Sets the field separator (default tab).
    #[must_use]
    pub fn field_separator(mut self, separator: char) -> Self {
        self.format.field_separator = separator;
        self
    }

    /// Sets or clears the quote character (default none).
    #[must_use]
    pub fn quote(mut self, quote: impl Into<Option<char>>) -> Self {
        self.format.quote = quote.into();
        self
    }

    /// Whether quoted fields may span lines (default `true`).
    #[must_use]
    pub fn allow_lf_in_quote(mut self, allow: bool) -> Self {
        self.format.allow_lf_in_quote = allow;
        self
    }

    /// Sets or clears the escape codec (default none).
    #[must_use]
    pub fn escape(mut self, codec: impl Into<Option<EscapeCodec>>) -> Self {
        self.format.escape = codec.into();
        self
    }

    /// Transforms each decoded field value.
    #[must_use]
    pub fn input_transformer<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<&str>) -> Option<String> + Send + Sync + 'static,
    {
        self.format.input_transformer = Some(Arc::new(f));
        self
    }

    /// Transforms each field value before it is encoded.
    #[must_use]
    pub fn output_transformer<F>(mut self, f: F) -> Self
    where
        F: Fn(Option<&str>) -> Option<String> + Send + Sync + 'static,
    {
        self.format.output_transformer = Some(Arc::new(f));
        self
    }

    /// Rewrites the raw text of each record before it is split into fields.
    ///
    /// Returning `None` skips the record.
    #[must_use]
    pub fn input_line_transformer<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.format.input_line_transformer = Some(Arc::new(f));
        self
    }

    /// Rewrites each encoded record, without its line separator, before it is written.
    ///
    /// Returning `None` drops the record.
    #[must_use]
    pub fn output_line_transformer<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.format.output_line_transformer = Some(Arc::new(f));
        self
    }

    /// Validates the settings and builds the format.
    ///
    /// # Errors
    /// Returns [`TextError::Config`] when the separator, quote and escape
    /// characters collide or one of them is CR or LF.
    pub fn build(self) -> Result<TextFormat> {
        let format = self.format;
        let separator = format.field_separator;
        ensure_not_line_break("field separator", separator)?;
        if let Some(quote) = format.quote {
            ensure_not_line_break("quote character", quote)?;
            if quote == separator {
                return Err(TextError::config(format!(
                    "quote character {quote:?} is also the field separator"
                )));
            }
        }
        if let Some(escape) = format.escape.as_ref().map(EscapeCodec::escape_char) {
            ensure_not_line_break("escape character", escape)?;
            if escape == separator {
                return Err(TextError::config(format!(
                    "escape character {escape:?} is also the field separator"
                )));
            }
            if Some(escape) == format.quote {
                return Err(TextError::config(format!(
                    "escape character {escape:?} is also the quote character"
                )));
            }
        }
        log::debug!(
            "text format: charset={}, line_separator={:?}, field_separator={:?}, quote={:?}, escape={:?}, splittable={}",
            format.charset,
            format.line_separator,
            format.field_separator,
            format.quote,
            format.escape.as_ref().map(EscapeCodec::escape_char),
            format.is_splittable()
        );
        Ok(format)
    }
}

fn ensure_not_line_break(role: &str, c: char) -> Result<()> {
    if c == '\r' || c == '\n' {
        return Err(TextError::config(format!("{role} must not be {c:?}")));
    }
    Ok(())
}

/// Serializable configuration of a [`TextFormat`].
///
/// Every field is optional in JSON and falls back to the builder default.
///
/// ```
/// use textsplit::{TextFormat, TextFormatConfig};
///
/// let format = TextFormat::from_json(r#"{
///     "field_separator": ",",
///     "quote": "\"",
///     "line_separator": "windows",
///     "escape": { "character": "\\", "sequences": [
///         { "escaped": "N", "raw": null },
///         { "escaped": "\\", "raw": "\\" }
///     ] }
/// }"#)?;
/// assert_eq!(format.field_separator(), ',');
/// assert_eq!(format.escape().and_then(|c| c.null_encoding()), Some('N'));
/// # Ok::<(), textsplit::TextError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TextFormatConfig {
    /// Charset name, such as `UTF-8`.
    pub charset: Charset,
    /// `unix`, `windows` or `any`.
    pub line_separator: LineSeparator,
    /// Field separator.
    pub field_separator: char,
    /// Quote character, or `null` for none.
    pub quote: Option<char>,
    /// Whether quoted fields may span lines.
    pub allow_lf_in_quote: bool,
    /// Escape settings, or `null` for none.
    pub escape: Option<EscapeConfig>,
}

impl Default for TextFormatConfig {
    fn default() -> Self {
        TextFormat::default().to_config()
    }
}

/// Serializable escape settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EscapeConfig {
    /// The escape character.
    pub character: char,
    /// Escape table, in registration order.
    #[serde(default)]
    pub sequences: Vec<EscapeEntry>,
}

impl TryFrom<TextFormatConfig> for TextFormat {
    type Error = TextError;

    fn try_from(config: TextFormatConfig) -> Result<Self> {
        TextFormat::builder()
            .charset(config.charset)
            .line_separator(config.line_separator)
            .field_separator(config.field_separator)
            .quote(config.quote)
            .allow_lf_in_quote(config.allow_lf_in_quote)
            .escape(
                config
                    .escape
                    .map(|e| EscapeCodec::from_entries(e.character, e.sequences)),
            )
            .build()
    }
}
