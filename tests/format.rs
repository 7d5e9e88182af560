//! Format facade tests: builder defaults, validation, JSON configuration and charsets.

use anyhow::Result;
use std::io::ErrorKind;
use textsplit::*;

#[test]
fn builder_defaults() -> Result<()> {
    let format = TextFormat::builder().build()?;
    assert_eq!(format.charset(), Charset::Utf8);
    assert_eq!(format.line_separator(), LineSeparator::Unix);
    assert_eq!(format.field_separator(), '\t');
    assert_eq!(format.quote(), None);
    assert!(format.allow_lf_in_quote());
    assert!(format.escape().is_none());
    assert!(format.is_splittable());
    Ok(())
}

#[test]
fn rejects_colliding_characters() {
    let codec = || EscapeCodec::builder('\\').build();
    let cases = [
        TextFormat::builder().field_separator('\n'),
        TextFormat::builder().field_separator('\r'),
        TextFormat::builder().field_separator(',').quote(','),
        TextFormat::builder().quote('\n'),
        TextFormat::builder().field_separator('\\').escape(codec()),
        TextFormat::builder().quote('\\').escape(codec()),
        TextFormat::builder().escape(EscapeCodec::builder('\n').build()),
    ];
    for builder in cases {
        match builder.build() {
            Err(TextError::Config(message)) => assert!(!message.is_empty()),
            other => panic!("expected a configuration error, got {other:?}"),
        }
    }
}

#[test]
fn splittable_formats() -> Result<()> {
    let quoted = TextFormat::builder().quote('"');
    assert!(!quoted.clone().build()?.is_splittable());
    assert!(quoted.allow_lf_in_quote(false).build()?.is_splittable());

    let escaped_lf = EscapeCodec::builder('\\').add_line_separator().build();
    assert!(!TextFormat::builder().escape(escaped_lf).build()?.is_splittable());

    let plain_escape = EscapeCodec::builder('\\').add_mapping('t', '\t').build();
    assert!(TextFormat::builder().escape(plain_escape).build()?.is_splittable());
    Ok(())
}

#[test]
fn json_configuration() -> Result<()> {
    let format = TextFormat::from_json(
        r#"{
            "charset": "latin1",
            "line_separator": "windows",
            "field_separator": "|",
            "quote": "'",
            "allow_lf_in_quote": false,
            "escape": {
                "character": "\\",
                "sequences": [
                    { "escaped": "N", "raw": null },
                    { "escaped": "\\", "raw": "\\" }
                ]
            }
        }"#,
    )?;
    assert_eq!(format.charset(), Charset::Latin1);
    assert_eq!(format.line_separator(), LineSeparator::Windows);
    assert_eq!(format.field_separator(), '|');
    assert_eq!(format.quote(), Some('\''));
    assert!(!format.allow_lf_in_quote());
    let codec = format.escape().expect("escape codec");
    assert_eq!(codec.null_encoding(), Some('N'));
    assert_eq!(codec.decode('\\'), Lookup::Found('\\'));

    let again = TextFormat::try_from(format.to_config())?;
    assert_eq!(again.to_config(), format.to_config());
    Ok(())
}

#[test]
fn json_defaults_and_failures() -> Result<()> {
    assert_eq!(TextFormat::from_json("{}")?.to_config(), TextFormatConfig::default());
    assert!(matches!(
        TextFormat::from_json(r#"{ "separator": "," }"#),
        Err(TextError::Config(_))
    ));
    assert!(matches!(
        TextFormat::from_json(r#"{ "charset": "EBCDIC" }"#),
        Err(TextError::Config(_))
    ));
    assert!(matches!(
        TextFormat::from_json(r#"{ "field_separator": ",", "quote": "," }"#),
        Err(TextError::Config(_))
    ));
    Ok(())
}

#[test]
fn charset_names() -> Result<()> {
    assert_eq!("utf8".parse::<Charset>()?, Charset::Utf8);
    assert_eq!("ISO_8859_1".parse::<Charset>()?, Charset::Latin1);
    assert_eq!("US-ASCII".parse::<Charset>()?, Charset::Ascii);
    assert_eq!(Charset::Latin1.to_string(), "ISO-8859-1");
    assert!("koi8-r".parse::<Charset>().is_err());
    Ok(())
}

#[test]
fn reads_single_byte_charsets() -> Result<()> {
    let latin1 = TextFormat::builder().charset(Charset::Latin1).build()?;
    let mut reader = latin1.open_reader(&[b'c', b'a', b'f', 0xE9, b'\n'][..]);
    assert_eq!(reader.read_record()?, Some(vec![Some("café".to_string())]));

    let ascii = TextFormat::builder().charset(Charset::Ascii).build()?;
    let mut reader = ascii.open_reader(&[b'c', 0xE9, b'\n'][..]);
    match reader.read_record() {
        Err(TextError::Io(e)) => assert_eq!(e.kind(), ErrorKind::InvalidData),
        other => panic!("expected an I/O error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn reads_utf8_across_buffer_boundaries() -> Result<()> {
    let format = TextFormat::default();
    let field = "é€𝄞".repeat(5_000);
    let text = format!("{field}\t{field}\n");
    let mut reader = format.open_reader(text.as_bytes());
    let row = reader.read_record()?.expect("one record");
    assert_eq!(row, vec![Some(field.clone()), Some(field)]);
    Ok(())
}

#[test]
fn rejects_malformed_utf8() {
    let format = TextFormat::default();
    let mut reader = format.open_reader(&[b'a', 0xFF, b'\n'][..]);
    assert!(matches!(reader.read_record(), Err(TextError::Io(e)) if e.kind() == ErrorKind::InvalidData));

    let mut truncated = format.open_reader(&[b'a', 0xE2, 0x82][..]);
    assert!(matches!(truncated.read_record(), Err(TextError::Io(_))));
}

#[test]
fn writes_charset_and_line_separator() -> Result<()> {
    let format = TextFormat::builder()
        .charset(Charset::Latin1)
        .line_separator(LineSeparator::Windows)
        .build()?;
    let mut out = Vec::new();
    let mut writer = format.open_writer(&mut out);
    writer.write_record([Some("é"), Some("x")])?;
    writer.close()?;
    assert_eq!(out, vec![0xE9, b'\t', b'x', b'\r', b'\n']);

    let mut out = Vec::new();
    let mut writer = format.open_writer(&mut out);
    assert!(matches!(writer.write_record([Some("€")]), Err(TextError::Io(_))));
    Ok(())
}

#[test]
fn any_line_separator_writes_line_feed() -> Result<()> {
    let format = TextFormat::builder().line_separator(LineSeparator::Any).build()?;
    let mut writer = format.open_string_writer();
    writer.write_record([Some("a")])?;
    assert_eq!(writer.into_inner()?, "a\n");
    Ok(())
}
