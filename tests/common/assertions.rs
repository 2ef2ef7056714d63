//! Domain-specific assertion macros for rowmark harnesses.
//!
//! These add context-rich failure messages that say which pipeline invariant
//! was violated and where.

// ---------------------------------------------------------------------------
// Offset map assertions
// ---------------------------------------------------------------------------

/// Assert that consecutive offset entries tile rows and bytes without gaps
/// or overlaps, starting at zero.
///
/// ```rust
/// assert_contiguous!(session.map());
/// ```
#[macro_export]
macro_rules! assert_contiguous {
    ($map:expr) => {{
        let map: &rowmark_core::OffsetMap = &$map;
        let mut next_row = 0u64;
        let mut next_byte = 0u64;
        for (i, entry) in map.entries().iter().enumerate() {
            if entry.rows.from != next_row || entry.bytes.from != next_byte {
                panic!(
                    "assert_contiguous! failed at entry {}:\n  expected rows.from={} bytes.from={}\n  actual:   {:?}",
                    i, next_row, next_byte, entry
                );
            }
            next_row = entry.rows.to + 1;
            next_byte = entry.bytes.to + 1;
        }
        assert_eq!(map.rows_count(), next_row, "rows_count disagrees with entries");
        assert_eq!(map.byte_length(), next_byte, "byte_length disagrees with entries");
    }};
}

// ---------------------------------------------------------------------------
// Marker assertions
// ---------------------------------------------------------------------------

/// Assert that marked output carries exactly the given rows, numbered from
/// `$first` and stamped with `$source`.
///
/// ```rust
/// assert_rows!(result.output, source = 3, first = 0, ["a", "b"]);
/// ```
#[macro_export]
macro_rules! assert_rows {
    ($output:expr, source = $source:expr, first = $first:expr, [$($text:expr),* $(,)?]) => {{
        let output: &str = &$output;
        let expected: Vec<&str> = vec![$($text),*];
        let rows: Vec<rowmark_core::markers::MarkedRow<'_>> = rowmark_core::markers::parse_rows(output)
            .collect::<Result<_, _>>()
            .unwrap_or_else(|e| panic!("assert_rows! failed: output is not well-marked: {e}\n  output: {output:?}"));
        let texts: Vec<&str> = rows.iter().map(|r| r.text).collect();
        assert_eq!(texts, expected, "assert_rows! row text mismatch");
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.source, $source, "assert_rows! wrong source on row {i}");
            assert_eq!(row.row, $first + i as u64, "assert_rows! wrong row number on row {i}");
        }
    }};
}
