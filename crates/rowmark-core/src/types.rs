//! Core types for rowmark-core.
//!
//! This module defines the data shared across the pipeline layers: the
//! inbound [`Chunk`], the [`Range`] / [`OffsetEntry`] pair recorded in the
//! offset map, the per-call [`TransformResult`], and the two outbound
//! notification shapes wrapped in [`Notification`].

use bytes::Bytes;
use serde::Serialize;

/// Identifier of the plugin or source that produced a stream's rows. Every
/// emitted row is tagged with it.
pub type SourceId = u32;

/// Identifier of one open stream session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct StreamId(String);

impl StreamId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StreamId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for StreamId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// One unit of raw stream data. Boundaries are arbitrary and do not align
/// with line boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    /// Raw bytes, decoded as UTF-8 on arrival.
    Bytes(Bytes),
    /// Pre-decoded text, passed through unchanged.
    Text(String),
}

impl Chunk {
    /// Size of the chunk payload in bytes.
    pub fn len(&self) -> usize {
        match self {
            Chunk::Bytes(b) => b.len(),
            Chunk::Text(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Bytes> for Chunk {
    fn from(bytes: Bytes) -> Self {
        Chunk::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Chunk {
    fn from(bytes: Vec<u8>) -> Self {
        Chunk::Bytes(Bytes::from(bytes))
    }
}

impl From<&'static [u8]> for Chunk {
    fn from(bytes: &'static [u8]) -> Self {
        Chunk::Bytes(Bytes::from_static(bytes))
    }
}

impl From<String> for Chunk {
    fn from(text: String) -> Self {
        Chunk::Text(text)
    }
}

impl From<&str> for Chunk {
    fn from(text: &str) -> Self {
        Chunk::Text(text.to_string())
    }
}

// ---------------------------------------------------------------------------
// Offsets
// ---------------------------------------------------------------------------

/// An inclusive span of row indices or byte offsets. `from <= to` always.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Range {
    pub from: u64,
    pub to: u64,
}

impl Range {
    pub fn new(from: u64, to: u64) -> Self {
        debug_assert!(from <= to, "range {from}..={to} is inverted");
        Self { from, to }
    }

    /// Number of units covered by the range.
    pub fn len(&self) -> u64 {
        self.to - self.from + 1
    }

    pub fn contains(&self, value: u64) -> bool {
        self.from <= value && value <= self.to
    }
}

/// Rows and bytes produced by one transform call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct OffsetEntry {
    pub rows: Range,
    pub bytes: Range,
}

/// Outcome of a single [`Transformer::convert`](crate::transform::Transformer::convert) call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformResult {
    /// Marked-up output text. Empty when no row was completed.
    pub output: String,
    /// UTF-8 byte length of `output`.
    pub bytes_size: u64,
    /// Rows completed by this call, `None` if the chunk ended inside a line.
    pub rows: Option<Range>,
}

impl TransformResult {
    pub(crate) fn empty() -> Self {
        Self {
            output: String::new(),
            bytes_size: 0,
            rows: None,
        }
    }

    /// Number of rows completed by this call.
    pub fn row_count(&self) -> u64 {
        self.rows.map_or(0, |r| r.len())
    }
}

// ---------------------------------------------------------------------------
// Outbound notifications
// ---------------------------------------------------------------------------

/// Stream content update sent to the consumer.
///
/// `added_from_row` / `added_to_row` are `-1` when the update carries no
/// completed rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamUpdate {
    pub stream_id: StreamId,
    pub total_byte_length: u64,
    pub total_row_count: u64,
    pub added_output_text: String,
    pub added_from_row: i64,
    pub added_to_row: i64,
}

/// Progress update for the work items ("pipes") feeding a stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    pub stream_id: StreamId,
    pub progress_fraction: f64,
    /// Display names of the registered pipes, in registration order.
    pub active_item_names: Vec<String>,
}

/// Every message the core sends to the external notification channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Notification {
    StreamUpdated(StreamUpdate),
    ProgressState(ProgressUpdate),
}

impl Notification {
    pub fn stream_id(&self) -> &StreamId {
        match self {
            Notification::StreamUpdated(u) => &u.stream_id,
            Notification::ProgressState(u) => &u.stream_id,
        }
    }
}

impl From<StreamUpdate> for Notification {
    fn from(update: StreamUpdate) -> Self {
        Notification::StreamUpdated(update)
    }
}

impl From<ProgressUpdate> for Notification {
    fn from(update: ProgressUpdate) -> Self {
        Notification::ProgressState(update)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_len_is_inclusive() {
        assert_eq!(Range::new(3, 3).len(), 1);
        assert_eq!(Range::new(0, 9).len(), 10);
        assert!(Range::new(2, 4).contains(4));
        assert!(!Range::new(2, 4).contains(5));
    }

    #[test]
    fn notification_serializes_with_camel_case_tag() {
        let n = Notification::from(StreamUpdate {
            stream_id: "s-1".into(),
            total_byte_length: 10,
            total_row_count: 2,
            added_output_text: String::new(),
            added_from_row: -1,
            added_to_row: -1,
        });
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["type"], "streamUpdated");
        assert_eq!(json["streamId"], "s-1");
        assert_eq!(json["totalRowCount"], 2);
        assert_eq!(json["addedFromRow"], -1);
    }

    #[test]
    fn progress_notification_lists_names() {
        let n = Notification::from(ProgressUpdate {
            stream_id: "s-2".into(),
            progress_fraction: 0.5,
            active_item_names: vec!["a.log".into(), "b.log".into()],
        });
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["type"], "progressState");
        assert_eq!(json["progressFraction"], 0.5);
        assert_eq!(json["activeItemNames"][1], "b.log");
        assert_eq!(n.stream_id().as_str(), "s-2");
    }
}
