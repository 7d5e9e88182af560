//! Record scanner: splits a character stream into raw records.
//!
//! The scanner is a small state machine. [`transition`] is a pure function of the
//! current [`ScanState`] and the [`CharClass`] of the next character; the
//! [`RecordScanner`] drives it over a buffered [`CharSource`] and applies the
//! resulting [`Action`]s to its line buffer.
//!
//! Quoting only affects where records and fields end. The raw record text keeps
//! every quote character, and doubled quotes are collapsed later by the field
//! reader, which also receives the [`FieldSpan`]s recorded during the scan.
//!
//! # Line endings
//! LF, CR LF and a lone CR all terminate a record; the writer-side
//! [`LineSeparator`](crate::LineSeparator) only controls what is written. A CR
//! that is not followed by LF is resolved with a one-character pushback.

use crate::charset::CharSource;
use crate::error::{FormatError, FormatErrorKind, Result};
use std::io;

const READ_BUFFER_SIZE: usize = 4 * 1024;

/// Scanner states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanState {
    /// Nothing of the current record has been read yet.
    BeginRecord,
    /// At the start of a field inside a record.
    BeginField,
    /// Inside an unquoted field.
    BareBody,
    /// Inside an unquoted field, right after an escape character.
    BareBodySawEscape,
    /// Inside an unquoted field, right after an escaped CR.
    BareBodySawEscapedCr,
    /// After a CR that may start a CR LF pair.
    BodySawCr,
    /// Inside a quoted field.
    QuoteBody,
    /// Inside a quoted field, right after a quote character.
    QuoteBodySawQuote,
    /// Inside a quoted field, right after a CR.
    QuoteBodySawCr,
    /// A record has just been emitted.
    EndOfRecord,
    /// The stream is exhausted and no record is pending.
    EndOfContent,
}

/// Character classes seen by [`transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharClass {
    /// The quote character.
    Quote,
    /// The field separator.
    Separator,
    /// The escape character.
    Escape,
    /// Carriage return.
    Cr,
    /// Line feed.
    Lf,
    /// Anything else.
    Other,
    /// No more characters.
    EndOfStream,
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Keep the character as record content.
    Continue,
    /// The character opens a quoted field.
    OpenQuote,
    /// The character is a separator ending the current field.
    EndField,
    /// The character is a line feed inside a quoted field.
    LineFeedInQuote,
    /// The record ends here; the last `drop` consumed characters are its terminator.
    EndRecord {
        /// Number of trailing terminator characters to discard.
        drop: usize,
    },
    /// Unread the character, then end the record dropping the CR before it.
    PushBackAndEndRecord,
    /// The stream ended inside a quoted field; the record ends malformed.
    Unterminated,
    /// The stream ended before any record content.
    Finish,
}

/// Result of a single transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// State after the character.
    pub next: ScanState,
    /// What to do with the character.
    pub action: Action,
}

const fn step(next: ScanState, action: Action) -> Step {
    Step { next, action }
}

const fn end_record(drop: usize) -> Step {
    step(ScanState::EndOfRecord, Action::EndRecord { drop })
}

/// Character classification used by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grammar {
    /// Field separator.
    pub separator: char,
    /// Quote character, if quoting is enabled.
    pub quote: Option<char>,
    /// Escape character, if an escape codec is configured.
    pub escape: Option<char>,
    /// Whether an escaped CR is field content.
    pub escaped_cr: bool,
    /// Whether an escaped LF is field content.
    pub escaped_lf: bool,
    /// Whether an escaped field separator is field content.
    pub escaped_separator: bool,
}

impl Grammar {
    /// Plain grammar: a separator and nothing else.
    #[must_use]
    pub const fn plain(separator: char) -> Self {
        Self {
            separator,
            quote: None,
            escape: None,
            escaped_cr: false,
            escaped_lf: false,
            escaped_separator: false,
        }
    }

    /// Classifies the next character; `None` is the end of the stream.
    #[must_use]
    pub fn classify(&self, c: Option<char>) -> CharClass {
        match c {
            None => CharClass::EndOfStream,
            Some(c) if Some(c) == self.quote => CharClass::Quote,
            Some(c) if c == self.separator => CharClass::Separator,
            Some(c) if Some(c) == self.escape => CharClass::Escape,
            Some('\r') => CharClass::Cr,
            Some('\n') => CharClass::Lf,
            Some(_) => CharClass::Other,
        }
    }
}

/// The scanner's transition function.
///
/// Total over every `(state, class)` pair. `EndOfRecord` behaves like
/// `BeginRecord` and `EndOfContent` is absorbing.
#[must_use]
pub fn transition(grammar: &Grammar, state: ScanState, class: CharClass) -> Step {
    use Action::{Continue, EndField, Finish, LineFeedInQuote, OpenQuote, PushBackAndEndRecord, Unterminated};
    use CharClass as C;
    use ScanState as S;

    match state {
        S::BeginRecord | S::EndOfRecord => match class {
            C::EndOfStream => step(S::EndOfContent, Finish),
            _ => transition(grammar, S::BeginField, class),
        },
        S::EndOfContent => step(S::EndOfContent, Finish),
        S::BeginField => match class {
            C::Quote => step(S::QuoteBody, OpenQuote),
            C::Separator => step(S::BeginField, EndField),
            C::Cr => step(S::BodySawCr, Continue),
            C::Lf => end_record(1),
            C::EndOfStream => end_record(0),
            C::Escape => step(S::BareBodySawEscape, Continue),
            C::Other => step(S::BareBody, Continue),
        },
        S::BareBody => bare_body(class),
        S::BareBodySawEscape => match class {
            C::Cr if grammar.escaped_cr => step(S::BareBodySawEscapedCr, Continue),
            C::Lf if grammar.escaped_lf => step(S::BareBody, Continue),
            C::Separator if grammar.escaped_separator => step(S::BareBody, Continue),
            C::Cr | C::Lf | C::Separator | C::EndOfStream => bare_body(class),
            C::Quote | C::Escape | C::Other => step(S::BareBody, Continue),
        },
        S::BareBodySawEscapedCr => match class {
            C::Lf if grammar.escaped_lf => step(S::BareBody, Continue),
            _ => bare_body(class),
        },
        S::BodySawCr => match class {
            C::Lf => end_record(2),
            C::EndOfStream => end_record(1),
            _ => step(S::EndOfRecord, PushBackAndEndRecord),
        },
        S::QuoteBody => match class {
            C::Quote => step(S::QuoteBodySawQuote, Continue),
            C::Cr => step(S::QuoteBodySawCr, Continue),
            C::Lf => step(S::QuoteBody, LineFeedInQuote),
            C::EndOfStream => step(S::EndOfRecord, Unterminated),
            C::Separator | C::Escape | C::Other => step(S::QuoteBody, Continue),
        },
        S::QuoteBodySawCr => match class {
            C::Quote => step(S::QuoteBodySawQuote, Continue),
            C::Cr => step(S::QuoteBodySawCr, Continue),
            C::Lf => step(S::QuoteBody, LineFeedInQuote),
            C::EndOfStream => step(S::EndOfRecord, Unterminated),
            C::Separator | C::Escape | C::Other => step(S::QuoteBody, Continue),
        },
        S::QuoteBodySawQuote => match class {
            C::Quote => step(S::QuoteBody, Continue),
            C::Separator => step(S::BeginField, EndField),
            C::Cr => step(S::BodySawCr, Continue),
            C::Lf => end_record(1),
            C::EndOfStream => end_record(0),
            // lenient: a stray character after a closing quote re-enters the quoted body
            C::Escape | C::Other => step(S::QuoteBody, Continue),
        },
    }
}

fn bare_body(class: CharClass) -> Step {
    use CharClass as C;
    use ScanState as S;
    match class {
        C::Quote | C::Other => step(S::BareBody, Action::Continue),
        C::Separator => step(S::BeginField, Action::EndField),
        C::Cr => step(S::BodySawCr, Action::Continue),
        C::Lf => end_record(1),
        C::EndOfStream => end_record(0),
        C::Escape => step(S::BareBodySawEscape, Action::Continue),
    }
}

/// Character range of one field within the current record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpan {
    /// First character of the field (the opening quote for quoted fields).
    pub start: usize,
    /// One past the last character of the field.
    pub end: usize,
    /// Whether the field started with the quote character.
    pub quoted: bool,
}

/// Scans records from a character source.
pub struct RecordScanner<S> {
    source: S,
    grammar: Grammar,
    allow_lf_in_quote: bool,
    buf: Box<[char]>,
    pos: usize,
    limit: usize,
    mark: usize,
    eof: bool,
    line: Vec<char>,
    fields: Vec<FieldSpan>,
    field_start: usize,
    field_quoted: bool,
    state: ScanState,
    line_number: u64,
    record_line_number: u64,
    records_read: u64,
}

impl<S: CharSource> RecordScanner<S> {
    /// Creates a scanner over `source`.
    pub fn new(source: S, grammar: Grammar, allow_lf_in_quote: bool) -> Self {
        Self {
            source,
            grammar,
            allow_lf_in_quote,
            buf: vec!['\0'; READ_BUFFER_SIZE].into_boxed_slice(),
            pos: 0,
            limit: 0,
            mark: 0,
            eof: false,
            line: Vec::new(),
            fields: Vec::new(),
            field_start: 0,
            field_quoted: false,
            state: ScanState::BeginRecord,
            line_number: 0,
            record_line_number: 0,
            records_read: 0,
        }
    }

    /// Scans the next record.
    ///
    /// Returns `Ok(false)` once the stream is exhausted. A malformed record is
    /// consumed completely before its [`FormatError`] is returned, so the next
    /// call starts at the following record.
    ///
    /// # Errors
    /// Returns a format error for an unterminated quoted field or a disallowed
    /// line feed inside quotes, and passes through I/O errors of the source.
    pub fn next_record(&mut self) -> Result<bool> {
        if self.state == ScanState::EndOfContent {
            return Ok(false);
        }
        self.line.clear();
        self.fields.clear();
        self.mark = self.pos;
        self.field_start = 0;
        self.field_quoted = false;
        self.record_line_number = self.line_number;

        let mut state = ScanState::BeginRecord;
        let mut lf_in_quote = false;
        let mut unterminated = false;
        loop {
            let c = self.next_char()?;
            if c == Some('\n') {
                self.line_number += 1;
            }
            let Step { next, action } = transition(&self.grammar, state, self.grammar.classify(c));
            state = next;
            match action {
                Action::Continue => {}
                Action::OpenQuote => self.field_quoted = true,
                Action::EndField => {
                    let cursor = self.cursor();
                    self.fields.push(FieldSpan {
                        start: self.field_start,
                        end: cursor - 1,
                        quoted: self.field_quoted,
                    });
                    self.field_start = cursor;
                    self.field_quoted = false;
                }
                Action::LineFeedInQuote => lf_in_quote = true,
                Action::EndRecord { drop } => {
                    self.finish_record(drop);
                    break;
                }
                Action::PushBackAndEndRecord => {
                    self.pos -= 1;
                    self.finish_record(1);
                    break;
                }
                Action::Unterminated => {
                    unterminated = true;
                    self.finish_record(0);
                    break;
                }
                Action::Finish => {
                    self.state = ScanState::EndOfContent;
                    return Ok(false);
                }
            }
        }
        self.state = state;
        self.records_read += 1;

        if unterminated {
            return Err(self.format_error(FormatErrorKind::UnterminatedQuote).into());
        }
        if lf_in_quote && !self.allow_lf_in_quote {
            return Err(self.format_error(FormatErrorKind::LineFeedInQuote).into());
        }
        Ok(true)
    }

    /// Characters of the current record, without its terminator.
    #[must_use]
    pub fn record(&self) -> &[char] {
        &self.line
    }

    /// Text of the current record, without its terminator.
    #[must_use]
    pub fn record_text(&self) -> String {
        self.line.iter().collect()
    }

    /// Field spans of the current record.
    #[must_use]
    pub fn fields(&self) -> &[FieldSpan] {
        &self.fields
    }

    /// 0-based line number where the current record starts.
    #[must_use]
    pub fn record_line_number(&self) -> u64 {
        self.record_line_number
    }

    /// 0-based index of the current record, or `None` before the first record.
    #[must_use]
    pub fn record_index(&self) -> Option<u64> {
        self.records_read.checked_sub(1)
    }

    /// Number of line feeds consumed so far.
    #[must_use]
    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    /// Unwraps the character source.
    pub fn into_source(self) -> S {
        self.source
    }

    fn next_char(&mut self) -> io::Result<Option<char>> {
        if self.pos == self.limit {
            if self.eof {
                return Ok(None);
            }
            self.flush();
            let n = loop {
                match self.source.read_chars(&mut self.buf) {
                    Ok(n) => break n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                    Err(e) => return Err(e),
                }
            };
            self.pos = 0;
            self.mark = 0;
            self.limit = n;
            if n == 0 {
                self.eof = true;
                return Ok(None);
            }
        }
        let c = self.buf[self.pos];
        self.pos += 1;
        Ok(Some(c))
    }

    /// Moves the not-yet-copied characters of the read buffer into the line buffer.
    fn flush(&mut self) {
        self.line.extend_from_slice(&self.buf[self.mark..self.pos]);
        self.mark = self.pos;
    }

    fn cursor(&self) -> usize {
        self.line.len() + (self.pos - self.mark)
    }

    fn finish_record(&mut self, drop: usize) {
        self.flush();
        let len = self.line.len() - drop;
        self.line.truncate(len);
        self.fields.push(FieldSpan {
            start: self.field_start.min(len),
            end: len,
            quoted: self.field_quoted,
        });
    }

    fn format_error(&self, kind: FormatErrorKind) -> FormatError {
        FormatError {
            kind,
            line_number: Some(self.record_line_number),
            record_index: self.record_index(),
            text: self.record_text(),
        }
    }
}
