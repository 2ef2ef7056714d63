//! Offset map: append-only index of the row and byte ranges produced for
//! one stream.
//!
//! The transformer appends one [`OffsetEntry`] per call that completed at
//! least one row. Entries are contiguous in both units: entry N+1 starts one
//! past where entry N ended. Totals are answered from the last entry.

use crate::types::{OffsetEntry, Range};

#[derive(Debug, Default, Clone)]
pub struct OffsetMap {
    entries: Vec<OffsetEntry>,
}

impl OffsetMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. Callers must keep entries contiguous.
    pub fn add(&mut self, entry: OffsetEntry) {
        debug_assert!(
            entry.rows.from == self.rows_count() && entry.bytes.from == self.byte_length(),
            "non-contiguous offset entry {entry:?} after {} rows / {} bytes",
            self.rows_count(),
            self.byte_length()
        );
        self.entries.push(entry);
    }

    /// Total number of rows indexed so far.
    pub fn rows_count(&self) -> u64 {
        self.entries.last().map_or(0, |e| e.rows.to + 1)
    }

    /// Total number of output bytes indexed so far.
    pub fn byte_length(&self) -> u64 {
        self.entries.last().map_or(0, |e| e.bytes.to + 1)
    }

    pub fn entries(&self) -> &[OffsetEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the entry whose row range contains `row`.
    pub fn find_row(&self, row: u64) -> Option<&OffsetEntry> {
        let idx = self.entries.partition_point(|e| e.rows.to < row);
        self.entries.get(idx).filter(|e| e.rows.contains(row))
    }

    /// Find the entry whose byte range contains `offset`.
    pub fn find_byte(&self, offset: u64) -> Option<&OffsetEntry> {
        let idx = self.entries.partition_point(|e| e.bytes.to < offset);
        self.entries.get(idx).filter(|e| e.bytes.contains(offset))
    }

    /// Byte span covering the entries that hold rows `rows.from..=rows.to`.
    pub fn bytes_for_rows(&self, rows: Range) -> Option<Range> {
        let first = self.find_row(rows.from)?;
        let last = self.find_row(rows.to)?;
        Some(Range::new(first.bytes.from, last.bytes.to))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
