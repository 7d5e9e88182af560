//! Assertion functions for decoded rows and split partitions.

use crate::field::Row;
use crate::split::open_split;
use std::io::{Cursor, Read};

/// Builds rows of non-null values from string slices.
#[must_use]
pub fn rows(values: &[&[&str]]) -> Vec<Row> {
    values
        .iter()
        .map(|row| row.iter().map(|v| Some((*v).to_string())).collect())
        .collect()
}

/// Assert that two row lists are equal in order and content.
///
/// # Panics
///
/// Panics if the lists differ in length or content.
pub fn assert_rows_equal(actual: &[Row], expected: &[Row]) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "Row count mismatch:\n  Expected: {} rows\n  Actual: {} rows\n  Expected: {expected:?}\n  Actual: {actual:?}",
        expected.len(),
        actual.len()
    );

    for (i, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
        assert_eq!(
            a, e,
            "Row mismatch at index {i}:\n  Expected: {e:?}\n  Actual: {a:?}"
        );
    }
}

/// Trims `text` into the splits delimited by `cuts`, returning each split's bytes.
///
/// `cuts` are the interior boundaries; the splits are `[0, c1)`, `[c1, c2)`, ...,
/// `[cn, text.len())`. Cuts must be ascending and within the text.
///
/// # Panics
///
/// Panics if the cuts are out of order or past the end of the text.
#[must_use]
pub fn trim_splits(text: &[u8], cuts: &[u64]) -> Vec<Vec<u8>> {
    let total = text.len() as u64;
    let mut bounds = Vec::with_capacity(cuts.len() + 2);
    bounds.push(0);
    bounds.extend_from_slice(cuts);
    bounds.push(total);
    bounds
        .windows(2)
        .map(|w| {
            let (offset, end) = (w[0], w[1]);
            assert!(offset <= end && end <= total, "bad cuts {cuts:?} for {total} bytes");
            let mut out = Vec::new();
            open_split(Cursor::new(text), offset, end - offset)
                .and_then(|mut t| t.read_to_end(&mut out))
                .expect("in-memory split cannot fail");
            out
        })
        .collect()
}

/// Assert that trimming the splits delimited by `cuts` reproduces `text` exactly.
///
/// # Panics
///
/// Panics if the concatenated splits differ from `text`.
pub fn assert_split_partition(text: &[u8], cuts: &[u64]) {
    let parts = trim_splits(text, cuts);
    let joined: Vec<u8> = parts.concat();
    assert_eq!(
        String::from_utf8_lossy(&joined),
        String::from_utf8_lossy(text),
        "Split partition mismatch for cuts {cuts:?}:\n  Parts: {:?}",
        parts
            .iter()
            .map(|p| String::from_utf8_lossy(p).into_owned())
            .collect::<Vec<_>>()
    );
}
