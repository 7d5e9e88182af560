//! Record drivers: rows with a fixed column list over the field reader and writer.
//!
//! [`RecordInput`] adds header handling, whitespace trimming, empty-field skipping
//! and a policy for records whose field count does not match the columns.
//! [`RecordOutput`] writes an optional header line followed by rows.

use crate::charset::{CharSink, CharSource};
use crate::error::{Result, TextError, index_message};
use crate::field::{DelimitedFieldReader, DelimitedFieldWriter, Row};
use serde::{Deserialize, Serialize};

/// How the first line of the text is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderPolicy {
    /// There is no header line.
    #[default]
    Never,
    /// The first line is always a header and is skipped.
    Always,
    /// The first line is skipped only when it equals the column names.
    Optional,
}

/// Reaction to a record that does not fit the columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorAction {
    /// Silently pad or truncate.
    Ignore,
    /// Log a warning, then pad or truncate.
    Report,
    /// Fail the read.
    #[default]
    Error,
}

/// Options for [`RecordInput`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputOptions {
    /// Header handling.
    pub header: HeaderPolicy,
    /// Reaction to records with fewer fields than columns.
    pub on_less_fields: ErrorAction,
    /// Reaction to records with more fields than columns.
    pub on_more_fields: ErrorAction,
    /// Trim leading and trailing whitespace of every field.
    pub trim_input: bool,
    /// Drop empty fields before mapping fields to columns.
    pub skip_empty_input: bool,
}

/// Reads rows of a fixed column list.
pub struct RecordInput<S> {
    reader: DelimitedFieldReader<S>,
    path: String,
    columns: Vec<String>,
    options: InputOptions,
    at_first_record: bool,
}

impl<S: CharSource> RecordInput<S> {
    /// Reads rows of `columns` from `reader`; `path` names the input in messages.
    pub fn new(
        reader: DelimitedFieldReader<S>,
        path: impl Into<String>,
        columns: Vec<String>,
        options: InputOptions,
    ) -> Self {
        Self {
            reader,
            path: path.into(),
            columns,
            options,
            at_first_record: true,
        }
    }

    /// Column names.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Reads the next row, with exactly one value per column.
    ///
    /// # Errors
    /// Returns [`TextError::Input`] for a malformed record or for a field-count
    /// mismatch under [`ErrorAction::Error`], and passes through I/O errors.
    pub fn read_row(&mut self) -> Result<Option<Row>> {
        loop {
            let first = std::mem::replace(&mut self.at_first_record, false);
            let Some(mut row) = self.next_fields()? else {
                return Ok(None);
            };
            if first && self.reader.is_from_head() && self.is_header(&row) {
                log::trace!("{}: skipped header line", self.path);
                continue;
            }
            self.fit_columns(&mut row)?;
            log::trace!(
                "{}: read row={} at line={}",
                self.path,
                index_message(self.reader.record_index()),
                index_message(self.reader.record_line_number())
            );
            return Ok(Some(row));
        }
    }

    /// Reads all remaining rows.
    ///
    /// # Errors
    /// See [`read_row`](Self::read_row).
    pub fn read_all(&mut self) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        while let Some(row) = self.read_row()? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Closes the input.
    pub fn close(self) {
        self.reader.close();
    }

    fn next_fields(&mut self) -> Result<Option<Row>> {
        let fields = match self.reader.read_record() {
            Ok(Some(fields)) => fields,
            Ok(None) => return Ok(None),
            Err(TextError::Format(e)) => {
                return Err(TextError::Input {
                    path: self.path.clone(),
                    line_number: e.line_number,
                    record_index: e.record_index,
                    message: format!("{}: {:?}", e.kind, e.text),
                });
            }
            Err(e) => return Err(e),
        };
        let trim = self.options.trim_input;
        let skip_empty = self.options.skip_empty_input;
        let row = fields
            .into_iter()
            .map(|value| match value {
                Some(v) if trim => Some(v.trim().to_string()),
                other => other,
            })
            .filter(|value| !(skip_empty && value.as_deref() == Some("")))
            .collect();
        Ok(Some(row))
    }

    fn is_header(&self, row: &[Option<String>]) -> bool {
        match self.options.header {
            HeaderPolicy::Never => false,
            HeaderPolicy::Always => true,
            HeaderPolicy::Optional => {
                row.len() == self.columns.len()
                    && row
                        .iter()
                        .zip(&self.columns)
                        .all(|(value, name)| value.as_deref() == Some(name.as_str()))
            }
        }
    }

    fn fit_columns(&self, row: &mut Row) -> Result<()> {
        let expected = self.columns.len();
        if row.len() < expected {
            self.handle(
                self.options.on_less_fields,
                format!("too few fields: expected {expected}, found {}", row.len()),
            )?;
            row.resize(expected, None);
        } else if row.len() > expected {
            self.handle(
                self.options.on_more_fields,
                format!("too many fields: expected {expected}, found {}", row.len()),
            )?;
            row.truncate(expected);
        }
        Ok(())
    }

    fn handle(&self, action: ErrorAction, message: String) -> Result<()> {
        match action {
            ErrorAction::Ignore => Ok(()),
            ErrorAction::Report => {
                log::warn!("{}", self.input_error(message));
                Ok(())
            }
            ErrorAction::Error => Err(self.input_error(message)),
        }
    }

    fn input_error(&self, message: String) -> TextError {
        TextError::Input {
            path: self.path.clone(),
            line_number: self.reader.record_line_number(),
            record_index: self.reader.record_index(),
            message,
        }
    }
}

/// Writes rows of a fixed column list.
pub struct RecordOutput<W> {
    writer: DelimitedFieldWriter<W>,
    columns: Vec<String>,
}

impl<W: CharSink> RecordOutput<W> {
    /// Writes rows of `columns` to `writer`, starting with a header line when
    /// `header` is set.
    ///
    /// # Errors
    /// Returns the error of writing the header line.
    pub fn create(mut writer: DelimitedFieldWriter<W>, columns: Vec<String>, header: bool) -> Result<Self> {
        if header {
            writer.write_record(columns.iter().map(|c| Some(c.as_str())))?;
        }
        Ok(Self { writer, columns })
    }

    /// Column names.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Writes one row.
    ///
    /// # Errors
    /// Returns [`TextError::Config`] when the row width differs from the column
    /// count, and passes through writer errors.
    pub fn write_row(&mut self, row: &[Option<String>]) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(TextError::config(format!(
                "row has {} values but {} columns are defined",
                row.len(),
                self.columns.len()
            )));
        }
        self.writer.write_record(row.iter().map(Option::as_deref))
    }

    /// Flushes and unwraps the underlying writer.
    ///
    /// # Errors
    /// Passes through I/O errors of the sink.
    pub fn into_inner(self) -> Result<W> {
        self.writer.into_inner()
    }

    /// Flushes and closes the output.
    ///
    /// # Errors
    /// Passes through I/O errors of the sink.
    pub fn close(self) -> Result<()> {
        self.writer.close()
    }
}
