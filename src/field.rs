//! Field-level reading and writing on top of the record scanner.

use crate::charset::{CharSink, CharSource, StrSource};
use crate::error::{Result, TextError, UnmappableCode, UnmappableEntry};
use crate::escape::{EscapeCodec, Lookup};
use crate::format::TextFormat;
use crate::scanner::{FieldSpan, RecordScanner};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Rewrites a single field value. `None` is a null field.
///
/// Input transformers run after decoding; output transformers run before encoding.
pub type FieldTransformer = Arc<dyn Fn(Option<&str>) -> Option<String> + Send + Sync>;

/// Rewrites the text of a whole record; `None` skips the record.
///
/// Input transformers see the raw record before it is split into fields; output
/// transformers see the encoded record without its line separator.
pub type LineTransformer = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// One record as field values; `None` is a null field.
pub type Row = Vec<Option<String>>;

/// Line separator written after each record.
///
/// Reading always accepts LF, CR LF and a lone CR.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineSeparator {
    /// `\n`
    #[default]
    Unix,
    /// `\r\n`
    Windows,
    /// Accept any terminator; writes `\n`.
    Any,
}

impl LineSeparator {
    /// The characters written after a record.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unix | Self::Any => "\n",
            Self::Windows => "\r\n",
        }
    }
}

/// Reads decoded field values record by record.
pub struct DelimitedFieldReader<S> {
    scanner: RecordScanner<S>,
    format: TextFormat,
    from_head: bool,
    has_record: bool,
    next_field: usize,
    field_index: Option<usize>,
    content: Option<String>,
    transformed: Option<(Vec<char>, Vec<FieldSpan>)>,
}

impl<S: CharSource> DelimitedFieldReader<S> {
    /// Reads `source` with `format`.
    ///
    /// `from_head` tells whether `source` starts at the head of the text; line
    /// numbers and record indices are only reported when it does.
    pub fn new(source: S, format: &TextFormat, from_head: bool) -> Self {
        Self {
            scanner: RecordScanner::new(source, format.grammar(), format.allow_lf_in_quote()),
            format: format.clone(),
            from_head,
            has_record: false,
            next_field: 0,
            field_index: None,
            content: None,
            transformed: None,
        }
    }

    /// Advances to the next record.
    ///
    /// Records rejected by the input line transformer are skipped.
    ///
    /// # Errors
    /// Returns [`TextError::Format`] for a malformed record (the reader is then
    /// positioned after it) and passes through I/O errors.
    pub fn next_record(&mut self) -> Result<bool> {
        self.next_field = 0;
        self.field_index = None;
        self.content = None;
        self.transformed = None;
        let Some(transform) = self.format.input_line_transformer().cloned() else {
            return self.scan_record();
        };
        while self.scan_record()? {
            if let Some(text) = transform(&self.scanner.record_text()) {
                let split = self.split_fields(&text);
                self.has_record = split.is_ok();
                self.transformed = Some(split?);
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn scan_record(&mut self) -> Result<bool> {
        match self.scanner.next_record() {
            Ok(found) => {
                self.has_record = found;
                Ok(found)
            }
            Err(TextError::Format(mut e)) => {
                self.has_record = false;
                if !self.from_head {
                    e.line_number = None;
                    e.record_index = None;
                }
                Err(e.into())
            }
            Err(e) => {
                self.has_record = false;
                Err(e)
            }
        }
    }

    /// Splits transformed record text; only its first record is kept.
    fn split_fields(&self, text: &str) -> Result<(Vec<char>, Vec<FieldSpan>)> {
        let mut scanner = RecordScanner::new(
            StrSource::new(text),
            self.format.grammar(),
            self.format.allow_lf_in_quote(),
        );
        match scanner.next_record() {
            Ok(true) => Ok((scanner.record().to_vec(), scanner.fields().to_vec())),
            Ok(false) => Ok((Vec::new(), vec![FieldSpan { start: 0, end: 0, quoted: false }])),
            Err(TextError::Format(mut e)) => {
                e.line_number = self.record_line_number();
                e.record_index = self.record_index();
                Err(e.into())
            }
            Err(e) => Err(e),
        }
    }

    fn current(&self) -> (&[char], &[FieldSpan]) {
        match &self.transformed {
            Some((line, fields)) => (line.as_slice(), fields.as_slice()),
            None => (self.scanner.record(), self.scanner.fields()),
        }
    }

    /// Advances to the next field of the current record.
    pub fn next_field(&mut self) -> bool {
        if !self.has_record {
            return false;
        }
        let (record, fields) = self.current();
        let Some(span) = fields.get(self.next_field).copied() else {
            self.content = None;
            return false;
        };
        let value = decode_field(
            record,
            span,
            self.format.quote(),
            self.format.escape(),
        );
        self.content = match self.format.input_transformer() {
            Some(transform) => transform(value.as_deref()),
            None => value,
        };
        self.field_index = Some(self.next_field);
        self.next_field += 1;
        true
    }

    /// Value of the current field; `None` for a null field.
    #[must_use]
    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    /// Restarts field iteration of the current record.
    pub fn rewind_fields(&mut self) {
        self.next_field = 0;
        self.field_index = None;
        self.content = None;
    }

    /// 0-based index of the current field.
    #[must_use]
    pub fn field_index(&self) -> Option<usize> {
        self.field_index
    }

    /// Number of fields in the current record.
    #[must_use]
    pub fn field_count(&self) -> usize {
        if self.has_record {
            self.current().1.len()
        } else {
            0
        }
    }

    /// Raw text of the current record, after the input line transformer.
    #[must_use]
    pub fn record_text(&self) -> String {
        self.current().0.iter().collect()
    }

    /// 0-based line number of the current record, `None` when unknown.
    #[must_use]
    pub fn record_line_number(&self) -> Option<u64> {
        if self.from_head && self.has_record {
            Some(self.scanner.record_line_number())
        } else {
            None
        }
    }

    /// 0-based index of the current record, `None` when unknown.
    #[must_use]
    pub fn record_index(&self) -> Option<u64> {
        if self.from_head && self.has_record {
            self.scanner.record_index()
        } else {
            None
        }
    }

    /// Whether this reader started at the head of the text.
    #[must_use]
    pub fn is_from_head(&self) -> bool {
        self.from_head
    }

    /// Reads the next record as a row of field values.
    ///
    /// # Errors
    /// See [`next_record`](Self::next_record).
    pub fn read_record(&mut self) -> Result<Option<Row>> {
        if !self.next_record()? {
            return Ok(None);
        }
        let mut row = Vec::with_capacity(self.field_count());
        while self.next_field() {
            row.push(self.content.take());
        }
        Ok(Some(row))
    }

    /// Iterates over the remaining records.
    pub fn records(&mut self) -> Records<'_, S> {
        Records {
            reader: self,
            failed: false,
        }
    }

    /// Unwraps the character source.
    pub fn into_inner(self) -> S {
        self.scanner.into_source()
    }

    /// Closes the reader, dropping its source.
    pub fn close(self) {
        drop(self.into_inner());
    }
}

/// Iterator returned by [`DelimitedFieldReader::records`].
///
/// A malformed record yields an error and iteration continues after it; an I/O
/// error ends the iteration.
pub struct Records<'a, S> {
    reader: &'a mut DelimitedFieldReader<S>,
    failed: bool,
}

impl<S: CharSource> Iterator for Records<'_, S> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.reader.read_record().transpose();
        if let Some(Err(TextError::Io(_))) = &item {
            self.failed = true;
        }
        item
    }
}

fn decode_field(
    record: &[char],
    span: FieldSpan,
    quote: Option<char>,
    codec: Option<&EscapeCodec>,
) -> Option<String> {
    let raw = record.get(span.start..span.end).unwrap_or(&[]);
    match (span.quoted, quote, codec) {
        (true, Some(quote), _) => Some(unquote(raw.get(1..).unwrap_or(&[]), quote)),
        (_, _, Some(codec)) => unescape(raw, codec),
        _ => Some(raw.iter().collect()),
    }
}

fn unquote(body: &[char], quote: char) -> String {
    let mut out = String::with_capacity(body.len());
    let mut i = 0;
    while i < body.len() {
        let c = body[i];
        if c == quote {
            if body.get(i + 1) == Some(&quote) {
                out.push(quote);
                i += 2;
            } else {
                // closing quote, or a stray one in lenient mode
                i += 1;
            }
            continue;
        }
        out.push(c);
        i += 1;
    }
    out
}

fn unescape(body: &[char], codec: &EscapeCodec) -> Option<String> {
    let escape = codec.escape_char();
    if let [first, second] = body
        && *first == escape
        && codec.decode(*second) == Lookup::IsNullEncoding
    {
        return None;
    }
    let mut out = String::with_capacity(body.len());
    let mut i = 0;
    while i < body.len() {
        let c = body[i];
        if c == escape
            && let Some(&next) = body.get(i + 1)
        {
            match codec.decode(next) {
                Lookup::Found(raw) => out.push(raw),
                Lookup::Absent | Lookup::IsNullEncoding => {
                    out.push(c);
                    out.push(next);
                }
            }
            i += 2;
            continue;
        }
        out.push(c);
        i += 1;
    }
    Some(out)
}

/// Writes field values record by record.
///
/// Values that cannot be represented faithfully are still written; the problems
/// are collected and reported by [`put_end_of_record`](Self::put_end_of_record).
pub struct DelimitedFieldWriter<W> {
    sink: W,
    format: TextFormat,
    line: String,
    field_index: usize,
    trailing_escape: bool,
    problems: Vec<UnmappableEntry>,
    records_written: u64,
}

impl<W: CharSink> DelimitedFieldWriter<W> {
    /// Writes to `sink` with `format`.
    pub fn new(sink: W, format: &TextFormat) -> Self {
        Self {
            sink,
            format: format.clone(),
            line: String::new(),
            field_index: 0,
            trailing_escape: false,
            problems: Vec::new(),
            records_written: 0,
        }
    }

    /// Appends a field to the current record; `None` writes a null.
    pub fn put_field(&mut self, value: Option<&str>) {
        let transformed;
        let value = match self.format.output_transformer() {
            Some(transform) => {
                transformed = transform(value);
                transformed.as_deref()
            }
            None => value,
        };
        if self.field_index > 0 {
            let separator = self.format.field_separator();
            if self.trailing_escape
                && self.format.escape().is_some_and(|codec| codec.decode(separator).is_mapped())
            {
                self.report_at(self.field_index - 1, UnmappableCode::LostFieldSeparator);
            }
            self.line.push(separator);
        }
        self.trailing_escape = false;
        match value {
            Some(value) => self.encode(value),
            None => match self
                .format
                .escape()
                .and_then(|codec| Some((codec.escape_char(), codec.null_encoding()?)))
            {
                Some((escape, null)) => {
                    self.line.push(escape);
                    self.line.push(null);
                }
                None => self.report(UnmappableCode::UndefinedNullSequence),
            },
        }
        self.field_index += 1;
    }

    /// Terminates the current record and writes it to the sink.
    ///
    /// A record dropped by the output line transformer is not written and
    /// reports no problems.
    ///
    /// # Errors
    /// Returns [`TextError::Unmappable`] when any field of the record could not be
    /// represented (the record has been written regardless), or an I/O error.
    pub fn put_end_of_record(&mut self) -> Result<()> {
        let separator = self.format.line_separator().as_str();
        if self.trailing_escape
            && let Some(codec) = self.format.escape()
            && separator.chars().next().is_some_and(|c| codec.decode(c).is_mapped())
        {
            self.report_at(
                self.field_index.saturating_sub(1),
                UnmappableCode::LostRecordSeparator,
            );
        }
        let line = match self.format.output_line_transformer() {
            Some(transform) => transform(&self.line),
            None => Some(std::mem::take(&mut self.line)),
        };
        self.line.clear();
        self.field_index = 0;
        self.trailing_escape = false;
        let Some(mut line) = line else {
            self.problems.clear();
            return Ok(());
        };
        line.push_str(separator);
        self.sink.write_str(&line)?;
        self.records_written += 1;
        if self.problems.is_empty() {
            Ok(())
        } else {
            Err(TextError::Unmappable(std::mem::take(&mut self.problems)))
        }
    }

    /// Writes a whole row followed by the record terminator.
    ///
    /// # Errors
    /// See [`put_end_of_record`](Self::put_end_of_record).
    pub fn write_record<'a>(&mut self, row: impl IntoIterator<Item = Option<&'a str>>) -> Result<()> {
        for value in row {
            self.put_field(value);
        }
        self.put_end_of_record()
    }

    /// Number of records terminated so far.
    #[must_use]
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Flushes the sink.
    ///
    /// # Errors
    /// Passes through I/O errors of the sink.
    pub fn flush(&mut self) -> Result<()> {
        self.sink.flush()?;
        Ok(())
    }

    /// Flushes and unwraps the sink. A partially written record is discarded.
    ///
    /// # Errors
    /// Passes through I/O errors of the sink.
    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        Ok(self.sink)
    }

    /// Flushes and closes the writer.
    ///
    /// # Errors
    /// Passes through I/O errors of the sink.
    pub fn close(self) -> Result<()> {
        self.into_inner().map(drop)
    }

    fn encode(&mut self, value: &str) {
        let separator = self.format.field_separator();
        if let Some(quote) = self.format.quote()
            && value
                .chars()
                .any(|c| c == separator || c == quote || c == '\r' || c == '\n')
        {
            self.line.push(quote);
            for c in value.chars() {
                if c == quote {
                    self.line.push(quote);
                }
                self.line.push(c);
            }
            self.line.push(quote);
            return;
        }
        let mut codes = Vec::new();
        self.trailing_escape =
            encode_bare(&mut self.line, value, separator, self.format.escape(), &mut codes);
        for code in codes {
            self.report(code);
        }
    }

    fn report(&mut self, code: UnmappableCode) {
        self.report_at(self.field_index, code);
    }

    fn report_at(&mut self, field_index: usize, code: UnmappableCode) {
        let entry = UnmappableEntry { field_index, code };
        if !self.problems.contains(&entry) {
            self.problems.push(entry);
        }
    }
}

/// Appends `value` without quoting; returns whether it ends with a bare escape character.
///
/// An escaped CR or LF that escapes to itself reuses a bare escape right before
/// it, and the LF of a CR LF pair shares the escape of its CR.
fn encode_bare(
    line: &mut String,
    value: &str,
    separator: char,
    codec: Option<&EscapeCodec>,
    codes: &mut Vec<UnmappableCode>,
) -> bool {
    let mut bare_escape = false;
    let mut escaped_cr = false;
    for c in value.chars() {
        let after_escape = std::mem::take(&mut bare_escape);
        let after_cr = std::mem::take(&mut escaped_cr);
        if let Some(codec) = codec {
            let escape = codec.escape_char();
            match codec.encode(c) {
                Lookup::Found(escaped) if escaped == c && (c == '\r' || c == '\n') => {
                    if !after_escape && !(after_cr && c == '\n') {
                        line.push(escape);
                    }
                    line.push(c);
                    escaped_cr = c == '\r';
                    continue;
                }
                Lookup::Found(escaped) => {
                    if after_escape && codec.decode(escape).is_mapped() {
                        codes.push(UnmappableCode::ConflictEscapeSequence);
                    }
                    line.push(escape);
                    line.push(escaped);
                    continue;
                }
                Lookup::Absent | Lookup::IsNullEncoding => {}
            }
            if after_escape && codec.decode(c).is_mapped() {
                codes.push(UnmappableCode::ConflictEscapeSequence);
            }
            bare_escape = c == escape;
        }
        if c == separator {
            codes.push(UnmappableCode::ExtraFieldSeparator);
        } else if c == '\r' || c == '\n' {
            codes.push(UnmappableCode::ExtraRecordSeparator);
        }
        line.push(c);
    }
    bare_escape
}
