//! Character encodings between byte streams and the scanner's character buffer.
//!
//! The scanner pulls characters through the [`CharSource`] trait, and the writer
//! pushes them through [`CharSink`]. [`Decoder`] and [`Encoder`] adapt plain
//! `std::io` byte streams for a given [`Charset`]; [`StrSource`] and `String`
//! are the in-memory ends used for already-decoded text.

use crate::error::TextError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Read, Write};
use std::str::FromStr;

const BYTE_BUFFER_SIZE: usize = 8 * 1024;

/// Supported character sets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Charset {
    /// UTF-8 (the default).
    #[default]
    Utf8,
    /// ISO-8859-1: every byte is the code point of the same value.
    Latin1,
    /// 7-bit US-ASCII.
    Ascii,
}

impl Charset {
    /// Canonical name of the charset.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Utf8 => "UTF-8",
            Self::Latin1 => "ISO-8859-1",
            Self::Ascii => "US-ASCII",
        }
    }

    fn max_char(self) -> char {
        match self {
            Self::Utf8 => char::MAX,
            Self::Latin1 => '\u{ff}',
            Self::Ascii => '\u{7f}',
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Charset {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "iso-8859-1" | "iso8859-1" | "latin1" | "latin-1" => Ok(Self::Latin1),
            "us-ascii" | "ascii" => Ok(Self::Ascii),
            _ => Err(TextError::config(format!("unsupported charset: {s}"))),
        }
    }
}

impl TryFrom<String> for Charset {
    type Error = TextError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Charset> for String {
    fn from(value: Charset) -> Self {
        value.name().to_string()
    }
}

/// A pull-based source of decoded characters.
pub trait CharSource {
    /// Reads up to `buf.len()` characters, returning `0` only at end of stream.
    ///
    /// # Errors
    /// Returns any error of the underlying stream, or `InvalidData` for bytes
    /// that are not valid in the source charset.
    fn read_chars(&mut self, buf: &mut [char]) -> io::Result<usize>;
}

impl<S: CharSource + ?Sized> CharSource for Box<S> {
    fn read_chars(&mut self, buf: &mut [char]) -> io::Result<usize> {
        (**self).read_chars(buf)
    }
}

impl<S: CharSource + ?Sized> CharSource for &mut S {
    fn read_chars(&mut self, buf: &mut [char]) -> io::Result<usize> {
        (**self).read_chars(buf)
    }
}

/// Characters of an in-memory string.
#[derive(Debug, Clone)]
pub struct StrSource<'a> {
    chars: std::str::Chars<'a>,
}

impl<'a> StrSource<'a> {
    /// Reads the characters of `text`.
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        Self { chars: text.chars() }
    }
}

impl CharSource for StrSource<'_> {
    fn read_chars(&mut self, buf: &mut [char]) -> io::Result<usize> {
        let mut n = 0;
        for slot in buf.iter_mut() {
            match self.chars.next() {
                Some(c) => {
                    *slot = c;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}

/// Decodes a byte stream into characters.
pub struct Decoder<R> {
    inner: R,
    charset: Charset,
    bytes: Box<[u8]>,
    start: usize,
    end: usize,
    eof: bool,
}

impl<R: Read> Decoder<R> {
    /// Wraps `inner`, decoding it with `charset`.
    pub fn new(inner: R, charset: Charset) -> Self {
        Self {
            inner,
            charset,
            bytes: vec![0; BYTE_BUFFER_SIZE].into_boxed_slice(),
            start: 0,
            end: 0,
            eof: false,
        }
    }

    /// Unwraps the underlying reader.
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn fill(&mut self) -> io::Result<()> {
        if self.start > 0 {
            self.bytes.copy_within(self.start..self.end, 0);
            self.end -= self.start;
            self.start = 0;
        }
        loop {
            match self.inner.read(&mut self.bytes[self.end..]) {
                Ok(0) => {
                    self.eof = true;
                    return Ok(());
                }
                Ok(n) => {
                    self.end += n;
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }

    fn decode_utf8(&mut self, buf: &mut [char]) -> io::Result<usize> {
        let pending = &self.bytes[self.start..self.end];
        let valid = match std::str::from_utf8(pending) {
            Ok(s) => s,
            Err(e) => {
                if e.valid_up_to() == 0 && (e.error_len().is_some() || self.eof) {
                    return Err(invalid_data(format!(
                        "malformed {} input: {:02x?}",
                        self.charset,
                        &pending[..pending.len().min(4)]
                    )));
                }
                std::str::from_utf8(&pending[..e.valid_up_to()]).unwrap_or_default()
            }
        };
        let mut n = 0;
        let mut consumed = 0;
        for (slot, c) in buf.iter_mut().zip(valid.chars()) {
            *slot = c;
            n += 1;
            consumed += c.len_utf8();
        }
        self.start += consumed;
        Ok(n)
    }

    fn decode_single_byte(&mut self, buf: &mut [char]) -> io::Result<usize> {
        let limit = self.charset.max_char();
        let mut n = 0;
        for (slot, &b) in buf.iter_mut().zip(&self.bytes[self.start..self.end]) {
            let c = char::from(b);
            if c > limit {
                return Err(invalid_data(format!(
                    "byte {b:#04x} is not valid {}",
                    self.charset
                )));
            }
            *slot = c;
            n += 1;
            self.start += 1;
        }
        Ok(n)
    }
}

impl<R: Read> CharSource for Decoder<R> {
    fn read_chars(&mut self, buf: &mut [char]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            if self.start < self.end {
                let n = match self.charset {
                    Charset::Utf8 => self.decode_utf8(buf)?,
                    Charset::Latin1 | Charset::Ascii => self.decode_single_byte(buf)?,
                };
                if n > 0 {
                    return Ok(n);
                }
            }
            if self.eof {
                return Ok(0);
            }
            self.fill()?;
        }
    }
}

/// A push-based sink of characters.
pub trait CharSink {
    /// Writes the whole string.
    ///
    /// # Errors
    /// Returns any error of the underlying stream, or `InvalidData` for
    /// characters that the sink charset cannot represent.
    fn write_str(&mut self, s: &str) -> io::Result<()>;

    /// Flushes buffered output.
    ///
    /// # Errors
    /// Returns any error of the underlying stream.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl CharSink for String {
    fn write_str(&mut self, s: &str) -> io::Result<()> {
        self.push_str(s);
        Ok(())
    }
}

impl<S: CharSink + ?Sized> CharSink for &mut S {
    fn write_str(&mut self, s: &str) -> io::Result<()> {
        (**self).write_str(s)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

/// Encodes characters onto a byte stream.
pub struct Encoder<W: Write> {
    inner: W,
    charset: Charset,
    scratch: Vec<u8>,
}

impl<W: Write> Encoder<W> {
    /// Wraps `inner`, encoding with `charset`.
    pub fn new(inner: W, charset: Charset) -> Self {
        Self {
            inner,
            charset,
            scratch: Vec::new(),
        }
    }

    /// Unwraps the underlying writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> CharSink for Encoder<W> {
    fn write_str(&mut self, s: &str) -> io::Result<()> {
        match self.charset {
            Charset::Utf8 => self.inner.write_all(s.as_bytes()),
            Charset::Latin1 | Charset::Ascii => {
                let limit = self.charset.max_char();
                self.scratch.clear();
                for c in s.chars() {
                    if c > limit {
                        return Err(invalid_data(format!(
                            "character {c:?} cannot be encoded in {}",
                            self.charset
                        )));
                    }
                    // `c <= '\u{ff}'` here, so the narrowing is exact.
                    self.scratch.push(c as u8);
                }
                self.inner.write_all(&self.scratch)
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn invalid_data(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}
