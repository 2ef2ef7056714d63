//! Row markers embedded in the transformed output.
//!
//! Every emitted row is terminated by
//!
//! ```text
//! <SOURCE><source id><SOURCE><ROW><row index><ROW>\n
//! ```
//!
//! where `SOURCE` is U+0002 and `ROW` is U+0003. Both are reserved: the
//! transformer replaces any occurrence of them in payload text before
//! marking (see [`sanitize`]), so [`parse_rows`] always recovers exactly the
//! rows that were emitted.

use std::borrow::Cow;
use std::fmt::Write as _;

use crate::types::SourceId;

/// Delimits the source id of a row.
pub const SOURCE_MARKER: char = '\u{0002}';
/// Delimits the row index of a row.
pub const ROW_MARKER: char = '\u{0003}';

/// Replacement used for marker characters found in payload text unless the
/// configuration says otherwise.
pub const DEFAULT_REPLACEMENT: char = '\u{FFFD}';

/// Errors raised while decoding marked output.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarkerError {
    #[error("row {0:?} has no row marker suffix")]
    MissingMarker(String),
    #[error("malformed source id {0:?}")]
    BadSource(String),
    #[error("malformed row index {0:?}")]
    BadRow(String),
    #[error("trailing text {0:?} is not terminated by a line break")]
    Unterminated(String),
}

/// The source marker pair for `source`, e.g. `"\u{2}7\u{2}"`.
pub fn source_marker(source: SourceId) -> String {
    format!("{SOURCE_MARKER}{source}{SOURCE_MARKER}")
}

/// Append the full marker suffix and line break for one row to `out`.
pub fn push_row_suffix(out: &mut String, source_marker: &str, row: u64) {
    out.push_str(source_marker);
    out.push(ROW_MARKER);
    // Writing to a String is infallible.
    let _ = write!(out, "{row}");
    out.push(ROW_MARKER);
    out.push('\n');
}

/// Whether `c` may stand in for marker characters. Markers and line breaks
/// would corrupt the row structure.
pub fn is_valid_replacement(c: char) -> bool {
    !matches!(c, SOURCE_MARKER | ROW_MARKER | '\r' | '\n')
}

/// Replace every marker character in `text` with `replacement`.
pub fn sanitize(text: &str, replacement: char) -> Cow<'_, str> {
    if !text.contains([SOURCE_MARKER, ROW_MARKER]) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(
        text.chars()
            .map(|c| {
                if c == SOURCE_MARKER || c == ROW_MARKER {
                    replacement
                } else {
                    c
                }
            })
            .collect(),
    )
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// One row recovered from marked output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkedRow<'a> {
    pub source: SourceId,
    pub row: u64,
    pub text: &'a str,
}

/// Decode marked output into its rows.
pub fn parse_rows(output: &str) -> impl Iterator<Item = Result<MarkedRow<'_>, MarkerError>> {
    let mut rest = output;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let Some(end) = rest.find('\n') else {
            let tail = std::mem::take(&mut rest);
            return Some(Err(MarkerError::Unterminated(tail.to_string())));
        };
        let line = &rest[..end];
        rest = &rest[end + 1..];
        Some(parse_line(line))
    })
}

fn parse_line(line: &str) -> Result<MarkedRow<'_>, MarkerError> {
    let missing = || MarkerError::MissingMarker(line.to_string());

    let body = line.strip_suffix(ROW_MARKER).ok_or_else(missing)?;
    let row_start = body.rfind(ROW_MARKER).ok_or_else(missing)?;
    let row_digits = &body[row_start + ROW_MARKER.len_utf8()..];
    let row = row_digits
        .parse()
        .map_err(|_| MarkerError::BadRow(row_digits.to_string()))?;

    let body = body[..row_start].strip_suffix(SOURCE_MARKER).ok_or_else(missing)?;
    let source_start = body.rfind(SOURCE_MARKER).ok_or_else(missing)?;
    let source_digits = &body[source_start + SOURCE_MARKER.len_utf8()..];
    let source = source_digits
        .parse()
        .map_err(|_| MarkerError::BadSource(source_digits.to_string()))?;

    Ok(MarkedRow {
        source,
        row,
        text: &body[..source_start],
    })
}

/// Strip all markers from `output`, leaving the plain row text with line
/// breaks.
pub fn strip(output: &str) -> Result<String, MarkerError> {
    let mut plain = String::with_capacity(output.len());
    for row in parse_rows(output) {
        plain.push_str(row?.text);
        plain.push('\n');
    }
    Ok(plain)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
