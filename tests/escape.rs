//! Escape codec tests: table construction, lookups and field-level round trips.

use proptest::collection::{btree_set, vec};
use proptest::prelude::*;
use textsplit::{EscapeCodec, EscapeEntry, Lookup, StrSource, TextFormat};

fn backslash_codec() -> EscapeCodec {
    EscapeCodec::builder('\\')
        .add_mapping('\\', '\\')
        .add_mapping('t', '\t')
        .add_mapping('n', '\n')
        .add_mapping('r', '\r')
        .add_null_mapping('N')
        .build()
}

#[test]
fn builder_maps_both_directions() {
    let codec = backslash_codec();
    assert_eq!(codec.escape_char(), '\\');
    assert_eq!(codec.encode('\t'), Lookup::Found('t'));
    assert_eq!(codec.decode('t'), Lookup::Found('\t'));
    assert_eq!(codec.encode('t'), Lookup::Absent);
    assert_eq!(codec.decode('N'), Lookup::IsNullEncoding);
    assert_eq!(codec.encode('N'), Lookup::Absent);
    assert_eq!(codec.null_encoding(), Some('N'));
    assert!(!codec.decode('x').is_mapped());
}

#[test]
fn first_registration_wins() {
    let codec = EscapeCodec::builder('\\')
        .add_mapping('a', 'x')
        .add_mapping('a', 'y')
        .add_mapping('b', 'x')
        .add_null_mapping('0')
        .add_null_mapping('1')
        .build();
    assert_eq!(codec.decode('a'), Lookup::Found('x'));
    assert_eq!(codec.encode('x'), Lookup::Found('a'));
    assert_eq!(codec.encode('y'), Lookup::Found('a'));
    assert_eq!(codec.decode('b'), Lookup::Found('x'));
    assert_eq!(codec.null_encoding(), Some('0'));
    assert_eq!(codec.decode('1'), Lookup::IsNullEncoding);
}

#[test]
fn line_separator_mappings() {
    let codec = EscapeCodec::builder('\\').add_line_separator().build();
    assert_eq!(codec.decode('\r'), Lookup::Found('\r'));
    assert_eq!(codec.decode('\n'), Lookup::Found('\n'));
    assert_eq!(codec.encode('\n'), Lookup::Found('\n'));
}

#[test]
fn from_entries_keeps_registration_order() {
    let entries = vec![
        EscapeEntry {
            escaped: 'N',
            raw: None,
        },
        EscapeEntry {
            escaped: '\\',
            raw: Some('\\'),
        },
    ];
    let codec = EscapeCodec::from_entries('\\', entries.clone());
    assert_eq!(codec.entries(), entries.as_slice());
    assert_eq!(codec, EscapeCodec::builder('\\').add_null_mapping('N').add_mapping('\\', '\\').build());
}

#[test]
fn decodes_bare_fields() {
    let format = TextFormat::builder().escape(backslash_codec()).build().unwrap();
    let mut reader = format.open_char_reader(StrSource::new(
        "\\N\ta\\N\t\\x\tend\\\ta\\tb\\\\c\n",
    ));
    let row = reader.read_record().unwrap().unwrap();
    assert_eq!(
        row,
        vec![
            None,
            Some("a\\N".to_string()),
            Some("\\x".to_string()),
            Some("end\\".to_string()),
            Some("a\tb\\c".to_string()),
        ]
    );
}

#[test]
fn escapes_are_literal_inside_quotes() {
    let format = TextFormat::builder()
        .field_separator(',')
        .quote('"')
        .escape(backslash_codec())
        .build()
        .unwrap();
    let mut reader = format.open_char_reader(StrSource::new("\"a\\tb\",\\N\n"));
    let row = reader.read_record().unwrap().unwrap();
    assert_eq!(row, vec![Some("a\\tb".to_string()), None]);
}

proptest! {
    #[test]
    fn injective_tables_round_trip(
        raws in btree_set(proptest::char::range('\0', '\u{2ff}'), 0..24),
        escapeds in btree_set(proptest::char::range('\0', '\u{2ff}'), 0..24),
    ) {
        let builder = raws
            .iter()
            .zip(&escapeds)
            .fold(EscapeCodec::builder('\\'), |b, (&raw, &escaped)| b.add_mapping(escaped, raw));
        let codec = builder.build();
        let mut encoded = std::collections::BTreeSet::new();
        for &raw in raws.iter().take(escapeds.len()) {
            let Lookup::Found(escaped) = codec.encode(raw) else {
                return Err(TestCaseError::fail(format!("{raw:?} not encoded")));
            };
            prop_assert_eq!(codec.decode(escaped), Lookup::Found(raw));
            encoded.insert(escaped);
        }
        prop_assert_eq!(encoded.len(), raws.len().min(escapeds.len()));
    }

    #[test]
    fn escaped_fields_round_trip(
        rows in vec(vec(proptest::option::of("[aN\\\\\t\r\n]{0,6}"), 1..5), 0..8),
    ) {
        let format = TextFormat::builder().escape(backslash_codec()).build().unwrap();
        let mut writer = format.open_string_writer();
        for row in &rows {
            writer.write_record(row.iter().map(Option::as_deref)).unwrap();
        }
        let text = writer.into_inner().unwrap();

        let mut reader = format.open_char_reader(StrSource::new(&text));
        let read: Vec<_> = reader.records().collect::<Result<_, _>>().unwrap();
        prop_assert_eq!(read, rows);
    }

    #[test]
    fn self_escaped_separators_round_trip(
        rows in vec(vec(proptest::option::of("[aN\\\\\t]{0,6}"), 1..5), 0..8),
    ) {
        let codec = EscapeCodec::builder('\\')
            .add_mapping('\\', '\\')
            .add_mapping('\t', '\t')
            .add_null_mapping('N')
            .build();
        let format = TextFormat::builder().escape(codec).build().unwrap();
        let mut writer = format.open_string_writer();
        for row in &rows {
            writer.write_record(row.iter().map(Option::as_deref)).unwrap();
        }
        let text = writer.into_inner().unwrap();

        let mut reader = format.open_char_reader(StrSource::new(&text));
        let read: Vec<_> = reader.records().collect::<Result<_, _>>().unwrap();
        prop_assert_eq!(read, rows);
    }
}
