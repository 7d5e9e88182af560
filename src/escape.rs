//! Escape sequences for bare (unquoted) field content.
//!
//! An [`EscapeCodec`] pairs an escape character with a table of mappings. Each
//! mapping states which character follows the escape character on disk and which
//! raw character it stands for. A mapping without a raw character is the *null
//! encoding*: the two-character sequence stands for a missing value.
//!
//! ```
//! use textsplit::escape::{EscapeCodec, Lookup};
//!
//! let codec = EscapeCodec::builder('\\')
//!     .add_mapping('t', '\t')
//!     .add_mapping('\\', '\\')
//!     .add_null_mapping('N')
//!     .build();
//!
//! assert_eq!(codec.encode('\t'), Lookup::Found('t'));
//! assert_eq!(codec.decode('t'), Lookup::Found('\t'));
//! assert_eq!(codec.decode('N'), Lookup::IsNullEncoding);
//! assert_eq!(codec.decode('x'), Lookup::Absent);
//! ```
//!
//! Both directions are backed by a dense array indexed by `code - min`, so a
//! lookup is a bounds check plus an index. When the same key is registered twice
//! the first registration wins, so several raw characters may collapse onto one
//! escaped character but never the other way round.

use serde::{Deserialize, Serialize};

/// Result of looking a character up in an escape table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// The character is mapped.
    Found(char),
    /// The character has no mapping.
    Absent,
    /// The character is the null encoding (backward direction only).
    IsNullEncoding,
}

impl Lookup {
    /// Returns `true` unless this is [`Lookup::Absent`].
    #[must_use]
    pub fn is_mapped(self) -> bool {
        !matches!(self, Self::Absent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Char(char),
    Null,
}

/// Dense lookup table keyed by character code.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CharTable {
    base: u32,
    slots: Box<[Option<Slot>]>,
}

impl CharTable {
    fn empty() -> Self {
        Self {
            base: 0,
            slots: Box::new([]),
        }
    }

    fn build(entries: impl Iterator<Item = (char, Slot)> + Clone) -> Self {
        let codes = entries.clone().map(|(k, _)| k as u32);
        let (Some(min), Some(max)) = (codes.clone().min(), codes.max()) else {
            return Self::empty();
        };
        let mut slots = vec![None; (max - min + 1) as usize];
        for (key, value) in entries {
            let slot = &mut slots[(key as u32 - min) as usize];
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        Self {
            base: min,
            slots: slots.into_boxed_slice(),
        }
    }

    fn get(&self, key: char) -> Lookup {
        let Some(index) = (key as u32).checked_sub(self.base) else {
            return Lookup::Absent;
        };
        match self.slots.get(index as usize) {
            Some(Some(Slot::Char(c))) => Lookup::Found(*c),
            Some(Some(Slot::Null)) => Lookup::IsNullEncoding,
            _ => Lookup::Absent,
        }
    }
}

/// One row of an escape table: `escape_char + escaped` stands for `raw`.
///
/// A `raw` of `None` declares the null encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscapeEntry {
    /// Character following the escape character on disk.
    pub escaped: char,
    /// Raw character it stands for, or `None` for the null encoding.
    pub raw: Option<char>,
}

/// Bidirectional escape mapping.
///
/// Immutable once built; cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscapeCodec {
    escape: char,
    entries: Vec<EscapeEntry>,
    forward: CharTable,
    backward: CharTable,
    null_encoding: Option<char>,
}

impl EscapeCodec {
    /// Starts building a codec that uses `escape` as its escape character.
    #[must_use]
    pub fn builder(escape: char) -> EscapeCodecBuilder {
        EscapeCodecBuilder {
            escape,
            entries: Vec::new(),
        }
    }

    /// Builds a codec directly from a table.
    #[must_use]
    pub fn from_entries(escape: char, entries: Vec<EscapeEntry>) -> Self {
        let forward = CharTable::build(
            entries
                .iter()
                .filter_map(|e| e.raw.map(|raw| (raw, Slot::Char(e.escaped)))),
        );
        let backward = CharTable::build(entries.iter().map(|e| {
            let slot = e.raw.map_or(Slot::Null, Slot::Char);
            (e.escaped, slot)
        }));
        let null_encoding = entries.iter().find(|e| e.raw.is_none()).map(|e| e.escaped);
        Self {
            escape,
            entries,
            forward,
            backward,
            null_encoding,
        }
    }

    /// The escape character.
    #[must_use]
    pub fn escape_char(&self) -> char {
        self.escape
    }

    /// The table this codec was built from, in registration order.
    #[must_use]
    pub fn entries(&self) -> &[EscapeEntry] {
        &self.entries
    }

    /// Maps a raw character to the character written after the escape character.
    ///
    /// Never returns [`Lookup::IsNullEncoding`].
    #[must_use]
    pub fn encode(&self, raw: char) -> Lookup {
        self.forward.get(raw)
    }

    /// Maps the character following an escape character back to its raw form.
    #[must_use]
    pub fn decode(&self, escaped: char) -> Lookup {
        self.backward.get(escaped)
    }

    /// Character that, preceded by the escape character, encodes a null value.
    #[must_use]
    pub fn null_encoding(&self) -> Option<char> {
        self.null_encoding
    }

    /// Whether an escaped CR stays inside the field.
    pub(crate) fn keeps_cr(&self) -> bool {
        self.decode('\r').is_mapped()
    }

    /// Whether an escaped LF stays inside the field.
    pub(crate) fn keeps_lf(&self) -> bool {
        self.decode('\n').is_mapped()
    }
}

/// Builder for [`EscapeCodec`].
#[derive(Debug, Clone)]
pub struct EscapeCodecBuilder {
    escape: char,
    entries: Vec<EscapeEntry>,
}

impl EscapeCodecBuilder {
    /// `escape + escaped` decodes to `raw`, and `raw` encodes to `escape + escaped`.
    #[must_use]
    pub fn add_mapping(mut self, escaped: char, raw: char) -> Self {
        self.entries.push(EscapeEntry {
            escaped,
            raw: Some(raw),
        });
        self
    }

    /// `escape + escaped` decodes to a null value.
    #[must_use]
    pub fn add_null_mapping(mut self, escaped: char) -> Self {
        self.entries.push(EscapeEntry { escaped, raw: None });
        self
    }

    /// Escaped CR and LF characters are kept as field content.
    #[must_use]
    pub fn add_line_separator(self) -> Self {
        self.add_mapping('\r', '\r').add_mapping('\n', '\n')
    }

    /// Builds the codec.
    #[must_use]
    pub fn build(self) -> EscapeCodec {
        EscapeCodec::from_entries(self.escape, self.entries)
    }
}
