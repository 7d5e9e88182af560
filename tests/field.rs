//! Field reader and writer tests: decoding, transformers and unmappable output.

use anyhow::Result;
use textsplit::testing::{assert_rows_equal, rows};
use textsplit::*;

fn csv_format() -> TextFormat {
    TextFormat::builder()
        .field_separator(',')
        .quote('"')
        .build()
        .expect("valid format")
}

fn unmappable(result: textsplit::Result<()>) -> Vec<UnmappableEntry> {
    match result {
        Err(TextError::Unmappable(entries)) => entries,
        other => panic!("expected unmappable output, got {other:?}"),
    }
}

fn entry(field_index: usize, code: UnmappableCode) -> UnmappableEntry {
    UnmappableEntry { field_index, code }
}

#[test]
fn field_cursor() -> Result<()> {
    let format = csv_format();
    let mut reader = format.open_char_reader(StrSource::new("a,\"b\"\"c\",\nz\n"));
    assert!(!reader.next_field());
    assert_eq!(reader.field_count(), 0);

    assert!(reader.next_record()?);
    assert_eq!(reader.field_count(), 3);
    assert_eq!(reader.field_index(), None);

    assert!(reader.next_field());
    assert_eq!((reader.field_index(), reader.content()), (Some(0), Some("a")));
    assert!(reader.next_field());
    assert_eq!((reader.field_index(), reader.content()), (Some(1), Some("b\"c")));
    assert!(reader.next_field());
    assert_eq!((reader.field_index(), reader.content()), (Some(2), Some("")));
    assert!(!reader.next_field());
    assert_eq!(reader.content(), None);

    reader.rewind_fields();
    assert!(reader.next_field());
    assert_eq!(reader.content(), Some("a"));

    assert!(reader.next_record()?);
    assert_eq!(reader.record_text(), "z");
    assert_eq!(reader.record_line_number(), Some(1));
    assert!(!reader.next_record()?);
    assert!(!reader.next_field());
    Ok(())
}

#[test]
fn doubled_quotes_and_quoted_separators() -> Result<()> {
    let mut reader = csv_format().open_char_reader(StrSource::new(
        "\"he said \"\"hi\"\"\",\"x,y\",\"\"\n",
    ));
    assert_eq!(
        reader.read_record()?,
        Some(vec![Some("he said \"hi\"".into()), Some("x,y".into()), Some(String::new())])
    );
    Ok(())
}

#[test]
fn stray_quote_content_is_kept() -> Result<()> {
    let mut reader = csv_format().open_char_reader(StrSource::new("\"abc\"x\",d\n"));
    assert_eq!(
        reader.read_record()?,
        Some(vec![Some("abcx".into()), Some("d".into())])
    );
    Ok(())
}

#[test]
fn empty_lines_are_single_empty_fields() -> Result<()> {
    let mut reader = csv_format().open_char_reader(StrSource::new("\n\r\nx\n"));
    let read: Vec<Row> = reader.records().collect::<textsplit::Result<_>>()?;
    assert_rows_equal(&read, &rows(&[&[""], &[""], &["x"]]));
    Ok(())
}

#[test]
fn records_continue_after_a_malformed_record() {
    let format = TextFormat::builder()
        .field_separator(',')
        .quote('"')
        .allow_lf_in_quote(false)
        .build()
        .unwrap();
    let mut reader = format.open_char_reader(StrSource::new("1,\"a\nb\"\n2,c\n"));
    let items: Vec<_> = reader.records().collect();
    assert_eq!(items.len(), 2);
    assert!(matches!(&items[0], Err(TextError::Format(e)) if e.kind == FormatErrorKind::LineFeedInQuote));
    assert_eq!(
        items[1].as_ref().unwrap(),
        &vec![Some("2".to_string()), Some("c".to_string())]
    );
}

#[test]
fn transformers_apply_per_field() -> Result<()> {
    let format = TextFormat::builder()
        .field_separator(',')
        .input_transformer(|value| match value {
            Some("") => None,
            other => other.map(str::to_uppercase),
        })
        .output_transformer(|value| Some(value.unwrap_or("-").to_string()))
        .build()?;

    let mut reader = format.open_char_reader(StrSource::new("a,,b\n"));
    assert_eq!(
        reader.read_record()?,
        Some(vec![Some("A".into()), None, Some("B".into())])
    );

    let mut writer = format.open_string_writer();
    writer.write_record([Some("x"), None])?;
    assert_eq!(writer.into_inner()?, "x,-\n");
    Ok(())
}

#[test]
fn line_transformers_rewrite_whole_records() -> Result<()> {
    let format = TextFormat::builder()
        .output_line_transformer(|line| Some(line.trim().to_string()))
        .build()?;
    let mut writer = format.open_string_writer();
    writer.write_record([Some(" A "), Some(" B "), Some(" C ")])?;
    assert_eq!(writer.into_inner()?, "A \t B \t C\n");

    let format = TextFormat::builder()
        .field_separator(',')
        .input_line_transformer(|line| (line != "skip").then(|| line.trim().to_string()))
        .build()?;
    let mut reader = format.open_char_reader(StrSource::new(" a , b \nskip\nc\n"));
    assert!(reader.next_record()?);
    assert_eq!(reader.record_text(), "a , b");
    assert_eq!(reader.field_count(), 2);
    assert_eq!(reader.read_record()?, Some(vec![Some("c".into())]));
    assert_eq!(reader.read_record()?, None);
    Ok(())
}

#[test]
fn line_transformer_filters_records() -> Result<()> {
    let format = TextFormat::builder()
        .output_line_transformer(|line| (line != "B").then(|| line.to_string()))
        .build()?;
    let mut writer = format.open_string_writer();
    for value in ["A", "B", "C"] {
        writer.write_record([Some(value)])?;
    }
    assert_eq!(writer.records_written(), 2);
    assert_eq!(writer.into_inner()?, "A\nC\n");
    Ok(())
}

#[test]
fn writes_quotes_only_when_needed() -> Result<()> {
    let mut writer = csv_format().open_string_writer();
    writer.write_record([Some("plain"), Some("a,b"), Some("q\"q"), Some("l\nf"), Some("c\rr")])?;
    writer.write_record([Some("")])?;
    assert_eq!(writer.records_written(), 2);
    assert_eq!(
        writer.into_inner()?,
        "plain,\"a,b\",\"q\"\"q\",\"l\nf\",\"c\rr\"\n\n"
    );
    Ok(())
}

#[test]
fn writes_escaped_fields() -> Result<()> {
    let codec = EscapeCodec::builder('\\')
        .add_mapping('\\', '\\')
        .add_mapping('t', '\t')
        .add_mapping('n', '\n')
        .add_mapping('r', '\r')
        .add_null_mapping('N')
        .build();
    let format = TextFormat::builder().escape(codec).build()?;
    let mut writer = format.open_string_writer();
    writer.write_record([Some("a\tb"), None, Some("c\\d"), Some("e\r\nf")])?;
    assert_eq!(writer.into_inner()?, "a\\tb\t\\N\tc\\\\d\te\\r\\nf\n");
    Ok(())
}

#[test]
fn null_without_null_encoding() -> Result<()> {
    let mut writer = TextFormat::default().open_string_writer();
    let entries = unmappable(writer.write_record([Some("a"), None]));
    assert_eq!(entries, vec![entry(1, UnmappableCode::UndefinedNullSequence)]);

    writer.write_record([Some("b")])?;
    assert_eq!(writer.into_inner()?, "a\t\nb\n");
    Ok(())
}

#[test]
fn bare_separators_are_reported() -> Result<()> {
    let mut writer = TextFormat::default().open_string_writer();
    let entries = unmappable(writer.write_record([Some("ok"), Some("x\ty\tz")]));
    assert_eq!(entries, vec![entry(1, UnmappableCode::ExtraFieldSeparator)]);

    let entries = unmappable(writer.write_record([Some("a\r\nb")]));
    assert_eq!(entries, vec![entry(0, UnmappableCode::ExtraRecordSeparator)]);

    let entries = unmappable(writer.write_record([Some("\t\n")]));
    assert_eq!(
        entries,
        vec![
            entry(0, UnmappableCode::ExtraFieldSeparator),
            entry(0, UnmappableCode::ExtraRecordSeparator),
        ]
    );
    assert_eq!(writer.into_inner()?, "ok\tx\ty\tz\na\r\nb\n\t\n\n");
    Ok(())
}

#[test]
fn escapable_separators_are_not_reported() -> Result<()> {
    let codec = EscapeCodec::builder('\\').add_mapping('t', '\t').build();
    let mut writer = TextFormat::builder().escape(codec).build()?.open_string_writer();
    writer.write_record([Some("a\tb")])?;
    assert_eq!(writer.into_inner()?, "a\\tb\n");
    Ok(())
}

#[test]
fn bare_escape_before_mapped_character_conflicts() -> Result<()> {
    let codec = EscapeCodec::builder('\\')
        .add_mapping('t', '\t')
        .add_null_mapping('N')
        .build();
    let mut writer = TextFormat::builder().escape(codec).build()?.open_string_writer();

    let entries = unmappable(writer.write_record([Some("\\N")]));
    assert_eq!(entries, vec![entry(0, UnmappableCode::ConflictEscapeSequence)]);
    let entries = unmappable(writer.write_record([Some("x"), Some("\\t")]));
    assert_eq!(entries, vec![entry(1, UnmappableCode::ConflictEscapeSequence)]);

    writer.write_record([Some("\\c")])?;
    assert_eq!(writer.into_inner()?, "\\N\nx\t\\t\n\\c\n");
    Ok(())
}

#[test]
fn trailing_escape_swallowing_line_separator() -> Result<()> {
    let codec = EscapeCodec::builder('\\').add_line_separator().build();
    let format = TextFormat::builder().escape(codec).build()?;
    let mut writer = format.open_string_writer();

    let entries = unmappable(writer.write_record([Some("x"), Some("a\\")]));
    assert_eq!(entries, vec![entry(1, UnmappableCode::LostRecordSeparator)]);

    writer.write_record([Some("a\\"), Some("b")])?;
    assert_eq!(writer.into_inner()?, "x\ta\\\na\\\tb\n");

    let plain = EscapeCodec::builder('\\').add_mapping('t', '\t').build();
    let mut writer = TextFormat::builder().escape(plain).build()?.open_string_writer();
    writer.write_record([Some("a\\")])?;
    assert_eq!(writer.into_inner()?, "a\\\n");
    Ok(())
}

#[test]
fn writer_into_byte_sink() -> Result<()> {
    let format = csv_format();
    let mut out = Vec::new();
    let mut writer = format.open_writer(&mut out);
    writer.put_field(Some("a"));
    writer.put_field(Some("b"));
    writer.put_end_of_record()?;
    writer.close()?;
    assert_eq!(out, b"a,b\n");
    Ok(())
}

#[test]
fn unmappable_error_message_names_columns() {
    let err = TextError::Unmappable(vec![entry(2, UnmappableCode::ExtraFieldSeparator)]);
    assert!(err.to_string().contains("column 3"));
}

#[test]
fn self_escaped_separator_round_trips() -> Result<()> {
    let codec = EscapeCodec::builder('\\').add_mapping('\t', '\t').build();
    let format = TextFormat::builder().escape(codec).build()?;
    let mut writer = format.open_string_writer();
    writer.write_record([Some("a\tb"), Some("c")])?;
    let text = writer.into_inner()?;
    assert_eq!(text, "a\\\tb\tc\n");

    let mut reader = format.open_char_reader(StrSource::new(&text));
    assert_eq!(
        reader.read_record()?,
        Some(vec![Some("a\tb".into()), Some("c".into())])
    );
    Ok(())
}

#[test]
fn trailing_escape_swallowing_field_separator() -> Result<()> {
    let codec = EscapeCodec::builder('\\').add_mapping('\t', '\t').build();
    let mut writer = TextFormat::builder().escape(codec).build()?.open_string_writer();
    writer.put_field(Some("\\"));
    writer.put_field(Some(""));
    let entries = unmappable(writer.put_end_of_record());
    assert_eq!(entries, vec![entry(0, UnmappableCode::LostFieldSeparator)]);
    assert_eq!(writer.into_inner()?, "\\\t\n");

    let null_only = EscapeCodec::builder('\\').add_null_mapping('N').build();
    let mut writer = TextFormat::builder().escape(null_only).build()?.open_string_writer();
    writer.put_field(Some("\\"));
    writer.put_field(Some(""));
    writer.put_end_of_record()?;
    assert_eq!(writer.into_inner()?, "\\\t\n");
    Ok(())
}

#[test]
fn escaped_line_breaks_share_one_escape() -> Result<()> {
    let codec = EscapeCodec::builder('\\').add_line_separator().build();
    let format = TextFormat::builder().escape(codec).build()?;
    let cases = [
        ("\n", "\\\n\n"),
        ("\r\n", "\\\r\n\n"),
        ("\rC", "\\\rC\n"),
        ("\\\n", "\\\n\n"),
        ("\\\r\n", "\\\r\n\n"),
        ("\\\rc", "\\\rc\n"),
    ];
    for (value, expected) in cases {
        let mut writer = format.open_string_writer();
        writer.write_record([Some(value)])?;
        assert_eq!(writer.into_inner()?, expected, "{value:?}");
    }

    let mut reader = format.open_char_reader(StrSource::new("\\\r\n\n\\\rC\n"));
    assert_eq!(reader.read_record()?, Some(vec![Some("\r\n".into())]));
    assert_eq!(reader.read_record()?, Some(vec![Some("\rC".into())]));
    Ok(())
}

#[test]
fn bare_escape_before_encoded_character_is_kept() -> Result<()> {
    let codec = EscapeCodec::builder('\\').add_mapping('t', '\t').build();
    let mut writer = TextFormat::builder().escape(codec).build()?.open_string_writer();
    writer.write_record([Some("\\\t")])?;
    let entries = unmappable(writer.write_record([Some("\\\\t")]));
    assert_eq!(entries, vec![entry(0, UnmappableCode::ConflictEscapeSequence)]);
    assert_eq!(writer.into_inner()?, "\\\\t\n\\\\t\n");
    Ok(())
}
