//! Boundary correction for byte-range splits of LF-delimited text.
//!
//! A record belongs to the split whose byte range contains the line feed that
//! precedes it; the first record of the file belongs to the split at offset 0.
//! [`SplitTrimmer`] enforces that rule for one `(offset, length)` range, so that
//! trimming every range of a gapless partition and concatenating the results
//! reproduces the file exactly.
//!
//! ```
//! use std::io::{Cursor, Read};
//! use textsplit::split::open_split;
//!
//! let text = b"a,b\nc,d\n";
//! let mut first = String::new();
//! open_split(Cursor::new(&text[..]), 0, 3)?.read_to_string(&mut first)?;
//! let mut second = String::new();
//! open_split(Cursor::new(&text[..]), 3, 5)?.read_to_string(&mut second)?;
//! assert_eq!(first, "a,b\n");
//! assert_eq!(second, "c,d\n");
//! # Ok::<(), std::io::Error>(())
//! ```

use std::io::{self, Read, Seek, SeekFrom};

const BUFFER_SIZE: usize = 8 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Skipping the tail of a record owned by the previous split.
    Head,
    /// Streaming the split's own bytes.
    Body,
    /// Finishing the record that straddles the end of the range.
    Tail,
    Done,
}

/// A reader yielding exactly the records owned by one split.
///
/// The wrapped reader must already be positioned at the split offset.
pub struct SplitTrimmer<R> {
    inner: R,
    buf: Box<[u8]>,
    start: usize,
    end: usize,
    remaining: i64,
    phase: Phase,
}

impl<R: Read> SplitTrimmer<R> {
    /// Wraps `inner`, which is positioned at `offset`, trimming `length` bytes.
    pub fn new(inner: R, offset: u64, length: u64) -> Self {
        let phase = if length == 0 {
            Phase::Done
        } else if offset > 0 {
            Phase::Head
        } else {
            Phase::Body
        };
        Self {
            inner,
            buf: vec![0; BUFFER_SIZE].into_boxed_slice(),
            start: 0,
            end: 0,
            remaining: i64::try_from(length).unwrap_or(i64::MAX),
            phase,
        }
    }

    /// Unwraps the underlying reader.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Refills the buffer when it is empty; returns `false` at end of stream.
    fn fill(&mut self) -> io::Result<bool> {
        if self.start < self.end {
            return Ok(true);
        }
        self.start = 0;
        self.end = 0;
        loop {
            match self.inner.read(&mut self.buf) {
                Ok(n) => {
                    self.end = n;
                    return Ok(n > 0);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }

    fn copy_out(&mut self, out: &mut [u8], n: usize) -> usize {
        out[..n].copy_from_slice(&self.buf[self.start..self.start + n]);
        self.start += n;
        n
    }
}

impl<R: Read> Read for SplitTrimmer<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        loop {
            if self.phase == Phase::Done {
                return Ok(0);
            }
            if !self.fill()? {
                self.phase = Phase::Done;
                return Ok(0);
            }
            let pending = &self.buf[self.start..self.end];
            match self.phase {
                Phase::Head => {
                    let (consumed, found) = match find_line_feed(pending) {
                        Some(i) => (i + 1, true),
                        None => (pending.len(), false),
                    };
                    self.start += consumed;
                    self.remaining -= consumed as i64;
                    self.phase = match (found, self.remaining) {
                        (_, r) if r < 0 => Phase::Done,
                        (true, _) => Phase::Body,
                        (false, 0) => Phase::Done,
                        (false, _) => Phase::Head,
                    };
                }
                Phase::Body if self.remaining == 0 => self.phase = Phase::Tail,
                Phase::Body => {
                    let budget = usize::try_from(self.remaining).unwrap_or(usize::MAX);
                    let n = out.len().min(pending.len()).min(budget);
                    self.remaining -= n as i64;
                    return Ok(self.copy_out(out, n));
                }
                Phase::Tail => {
                    let window = &pending[..pending.len().min(out.len())];
                    let n = match find_line_feed(window) {
                        Some(i) => {
                            self.phase = Phase::Done;
                            i + 1
                        }
                        None => window.len(),
                    };
                    return Ok(self.copy_out(out, n));
                }
                Phase::Done => return Ok(0),
            }
        }
    }
}

/// Position of the first line feed in `bytes`.
#[must_use]
pub fn find_line_feed(bytes: &[u8]) -> Option<usize> {
    bytes.iter().position(|&b| b == b'\n')
}

/// Seeks `src` to `offset` and trims the split `(offset, length)`.
///
/// # Errors
/// Returns the error of the seek.
pub fn open_split<R: Read + Seek>(mut src: R, offset: u64, length: u64) -> io::Result<SplitTrimmer<R>> {
    src.seek(SeekFrom::Start(offset))?;
    Ok(SplitTrimmer::new(src, offset, length))
}
