//! Stream transformer: turns arbitrary chunks into marked, indexed rows.
//!
//! Each [`Transformer::convert`] call:
//!
//! 1. decodes the chunk (UTF-8, lossy),
//! 2. replaces reserved marker characters in the new text,
//! 3. collapses every run of `\r` / `\n` into a single `\n` (blank lines are
//!    dropped on purpose),
//! 4. joins the carried rest to the text up to the last line break and
//!    keeps what follows as the new rest,
//! 5. terminates every completed row with its source / row markers,
//! 6. appends the produced row and byte ranges to the [`OffsetMap`].
//!
//! Calls for one stream must be made in arrival order.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

use crate::markers::{self, DEFAULT_REPLACEMENT};
use crate::offset_map::OffsetMap;
use crate::types::{Chunk, OffsetEntry, Range, SourceId, StreamId, TransformResult};

static LINE_BREAKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\r\n]+").expect("line break pattern is valid"));

/// What to do with an unterminated trailing line when the stream closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestPolicy {
    /// Drop the partial line.
    #[default]
    Discard,
    /// Emit the partial line as a final row.
    Flush,
}

/// Collapse `\r\n`, `\r`, `\n` and any run of them into one `\n`.
pub fn normalize_line_breaks(text: &str) -> Cow<'_, str> {
    LINE_BREAKS.replace_all(text, "\n")
}

/// Split `text` at its last line break into `(cleared, rest)`. `cleared`
/// ends with the line break; `rest` holds whatever follows it.
pub fn split_rest(text: &str) -> (&str, &str) {
    match text.rfind('\n') {
        Some(i) => text.split_at(i + 1),
        None => ("", text),
    }
}

// ---------------------------------------------------------------------------
// UTF-8 carry
// ---------------------------------------------------------------------------

/// Holds back an incomplete multi-byte sequence at the end of a byte chunk
/// until the next chunk completes it.
#[derive(Debug, Default)]
struct Utf8Carry {
    pending: Vec<u8>,
}

impl Utf8Carry {
    fn decode(&mut self, bytes: &[u8]) -> String {
        let mut buf = std::mem::take(&mut self.pending);
        buf.extend_from_slice(bytes);
        let cut = incomplete_tail(&buf);
        self.pending = buf.split_off(cut);
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn flush(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        let pending = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&pending).into_owned()
    }

    fn len(&self) -> usize {
        self.pending.len()
    }
}

/// Index where a trailing, not yet complete UTF-8 sequence starts, or
/// `buf.len()` if the buffer ends on a sequence boundary.
fn incomplete_tail(buf: &[u8]) -> usize {
    let len = buf.len();
    for back in 1..=len.min(4) {
        let i = len - back;
        let b = buf[i];
        if b & 0xC0 == 0x80 {
            continue;
        }
        let needed = match b {
            0xF0..=0xF7 => 4,
            0xE0..=0xEF => 3,
            0xC0..=0xDF => 2,
            _ => 1,
        };
        return if needed > back { i } else { len };
    }
    len
}

// ---------------------------------------------------------------------------
// Transformer
// ---------------------------------------------------------------------------

/// Per-stream transform state: the carried rest, the UTF-8 carry, and the
/// stream's [`OffsetMap`].
#[derive(Debug)]
pub struct Transformer {
    stream_id: StreamId,
    source: SourceId,
    source_marker: String,
    replacement: char,
    rest: String,
    decoder: Utf8Carry,
    map: OffsetMap,
}

impl Transformer {
    pub fn new(stream_id: StreamId, source: SourceId) -> Self {
        Self {
            stream_id,
            source,
            source_marker: markers::source_marker(source),
            replacement: DEFAULT_REPLACEMENT,
            rest: String::new(),
            decoder: Utf8Carry::default(),
            map: OffsetMap::new(),
        }
    }

    /// Character substituted for marker characters found in payload text.
    /// Markers and line breaks are refused in favour of U+FFFD.
    pub fn with_replacement(mut self, replacement: char) -> Self {
        if markers::is_valid_replacement(replacement) {
            self.replacement = replacement;
        } else {
            tracing::warn!(stream = %self.stream_id, ?replacement, "invalid marker replacement, using U+FFFD");
            self.replacement = DEFAULT_REPLACEMENT;
        }
        self
    }

    pub fn stream_id(&self) -> &StreamId {
        &self.stream_id
    }

    pub fn source(&self) -> SourceId {
        self.source
    }

    /// The trailing partial line carried into the next call.
    pub fn rest(&self) -> &str {
        &self.rest
    }

    pub fn map(&self) -> &OffsetMap {
        &self.map
    }

    /// Convert one chunk. Never fails; undecodable bytes become U+FFFD.
    ///
    /// Only the new text is sanitized and normalized. The carried rest is
    /// already clean and holds no line break.
    pub fn convert(&mut self, chunk: impl Into<Chunk>) -> TransformResult {
        let mut text = String::new();
        match chunk.into() {
            Chunk::Bytes(bytes) => text.push_str(&self.decoder.decode(&bytes)),
            Chunk::Text(s) => {
                text.push_str(&self.decoder.flush());
                text.push_str(&s);
            }
        }

        let sanitized = markers::sanitize(&text, self.replacement);
        let normalized = normalize_line_breaks(&sanitized);
        let mut body: &str = &normalized;
        if self.rest.is_empty() {
            body = body.trim_start_matches('\n');
        }

        let (completed, rest) = split_rest(body);
        if completed.is_empty() {
            self.rest.push_str(rest);
            tracing::trace!(stream = %self.stream_id, rest = self.rest.len(), "no complete row in chunk");
            return TransformResult::empty();
        }

        let mut cleared = std::mem::take(&mut self.rest);
        cleared.push_str(completed);
        self.rest = rest.to_string();
        self.mark(&cleared)
    }

    /// Apply `policy` to the carried rest at stream end. Returns the final
    /// row when the rest was flushed.
    pub fn finish(&mut self, policy: RestPolicy) -> Option<TransformResult> {
        let tail = self.decoder.flush();
        self.rest.push_str(&markers::sanitize(&tail, self.replacement));
        if self.rest.is_empty() {
            return None;
        }
        match policy {
            RestPolicy::Flush => {
                tracing::debug!(stream = %self.stream_id, bytes = self.rest.len(), "flushing trailing partial line");
                Some(self.convert("\n"))
            }
            RestPolicy::Discard => {
                tracing::warn!(stream = %self.stream_id, bytes = self.rest.len(), "discarding unterminated trailing line");
                self.rest.clear();
                None
            }
        }
    }

    /// Number of raw bytes held back waiting for the rest of a UTF-8 sequence.
    pub fn pending_bytes(&self) -> usize {
        self.decoder.len()
    }

    fn mark(&mut self, cleared: &str) -> TransformResult {
        let first_row = self.map.rows_count();
        let first_byte = self.map.byte_length();

        let mut output = String::with_capacity(cleared.len() + cleared.len() / 2);
        let mut row = first_row;
        for line in cleared.split_terminator('\n') {
            output.push_str(line);
            markers::push_row_suffix(&mut output, &self.source_marker, row);
            row += 1;
        }

        let size = output.len() as u64;
        let rows = Range::new(first_row, row - 1);
        let bytes = Range::new(first_byte, first_byte + size - 1);
        self.map.add(OffsetEntry { rows, bytes });

        tracing::trace!(
            stream = %self.stream_id,
            rows = rows.len(),
            bytes = size,
            "chunk converted"
        );

        TransformResult {
            output,
            bytes_size: size,
            rows: Some(rows),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markers::{parse_rows, strip};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn transformer() -> Transformer {
        Transformer::new("test".into(), 7)
    }

    fn rows_of(output: &str) -> Vec<(u64, String)> {
        parse_rows(output)
            .map(|r| {
                let r = r.unwrap();
                (r.row, r.text.to_string())
            })
            .collect()
    }

    #[rstest]
    #[case("a\r\nb", "a\nb")]
    #[case("a\rb", "a\nb")]
    #[case("a\n\n\nb", "a\nb")]
    #[case("a\r\n\r\nb", "a\nb")]
    #[case("\n\r\n", "\n")]
    #[case("plain", "plain")]
    fn line_breaks_collapse(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_line_breaks(input), expected);
    }

    #[test]
    fn split_rest_at_last_break() {
        assert_eq!(split_rest("a\nb\nc"), ("a\nb\n", "c"));
        assert_eq!(split_rest("a\n"), ("a\n", ""));
        assert_eq!(split_rest("abc"), ("", "abc"));
    }

    #[test]
    fn incomplete_tail_detection() {
        let euro = "€".as_bytes(); // E2 82 AC
        assert_eq!(incomplete_tail(b"abc"), 3);
        assert_eq!(incomplete_tail(euro), 3);
        assert_eq!(incomplete_tail(&euro[..1]), 0);
        assert_eq!(incomplete_tail(&euro[..2]), 0);
        assert_eq!(incomplete_tail(&[b'a', euro[0], euro[1]]), 1);
        assert_eq!(incomplete_tail(&[]), 0);
    }

    #[test]
    fn partial_last_line_is_carried() {
        let mut t = transformer();
        let first = t.convert("a\nb\nc");
        assert_eq!(rows_of(&first.output), vec![(0, "a".into()), (1, "b".into())]);
        assert_eq!(first.rows, Some(Range::new(0, 1)));
        assert_eq!(t.rest(), "c");

        let second = t.convert("d\n");
        assert_eq!(rows_of(&second.output), vec![(2, "cd".into())]);
        assert_eq!(second.rows, Some(Range::new(2, 2)));
        assert_eq!(t.rest(), "");
    }

    #[test]
    fn leading_blank_lines_are_dropped() {
        let mut t = transformer();
        let result = t.convert("\n\n\nx\n");
        assert_eq!(rows_of(&result.output), vec![(0, "x".into())]);
        assert_eq!(t.map().rows_count(), 1);
    }

    #[test]
    fn chunk_without_break_emits_nothing() {
        let mut t = transformer();
        let result = t.convert("no newline yet");
        assert_eq!(result, TransformResult::empty());
        assert!(t.map().is_empty());
        assert_eq!(t.rest(), "no newline yet");
    }

    #[test]
    fn crlf_split_across_chunks_is_one_break() {
        let mut t = transformer();
        t.convert("a\r");
        let second = t.convert("\nb\n");
        assert_eq!(rows_of(&second.output), vec![(1, "b".into())]);
        assert_eq!(t.map().rows_count(), 2);
    }

    #[test]
    fn output_bytes_match_recorded_range() {
        let mut t = transformer();
        let first = t.convert("héllo\nwörld\n");
        let second = t.convert("again\n");
        let entries = t.map().entries();
        assert_eq!(entries[0].bytes, Range::new(0, first.bytes_size - 1));
        assert_eq!(entries[1].bytes.from, first.bytes_size);
        assert_eq!(entries[1].bytes.to, first.bytes_size + second.bytes_size - 1);
        assert_eq!(first.bytes_size, first.output.len() as u64);
    }

    #[test]
    fn marker_characters_in_payload_are_replaced() {
        let mut t = transformer().with_replacement('#');
        let result = t.convert("evil\u{2}9\u{2}\u{3}99\u{3}\n");
        assert_eq!(rows_of(&result.output), vec![(0, "evil#9##99#".into())]);
    }

    #[rstest]
    #[case(crate::markers::SOURCE_MARKER)]
    #[case(crate::markers::ROW_MARKER)]
    #[case('\n')]
    #[case('\r')]
    fn structural_replacement_falls_back(#[case] replacement: char) {
        let mut t = transformer().with_replacement(replacement);
        let result = t.convert("a\u{2}5\u{2}b\n");
        assert_eq!(rows_of(&result.output), vec![(0, "a\u{FFFD}5\u{FFFD}b".into())]);
    }

    #[test]
    fn long_unterminated_line_accumulates_in_rest() {
        let mut t = transformer();
        for _ in 0..1_000 {
            assert_eq!(t.convert("xy").rows, None);
        }
        assert_eq!(t.rest().len(), 2_000);
        let result = t.convert("\u{2}z\r\nnext");
        let rows = rows_of(&result.output);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].1.len(), 2_000 + "\u{FFFD}z".len());
        assert!(rows[0].1.ends_with("\u{FFFD}z"));
        assert_eq!(t.rest(), "next");
    }

    #[test]
    fn split_utf8_sequence_is_reassembled() {
        let mut t = transformer();
        let bytes = "é\n".as_bytes();
        let first = t.convert(bytes[..1].to_vec());
        assert_eq!(first.rows, None);
        assert_eq!(t.pending_bytes(), 1);
        let second = t.convert(bytes[1..].to_vec());
        assert_eq!(strip(&second.output).unwrap(), "é\n");
    }

    #[test]
    fn invalid_bytes_degrade_to_replacement() {
        let mut t = transformer();
        let result = t.convert(vec![b'o', b'k', 0xFF, b'\n']);
        assert_eq!(strip(&result.output).unwrap(), "ok\u{FFFD}\n");
    }

    #[test]
    fn finish_flush_emits_rest_as_row() {
        let mut t = transformer();
        t.convert("a\ntail");
        let last = t.finish(RestPolicy::Flush).unwrap();
        assert_eq!(rows_of(&last.output), vec![(1, "tail".into())]);
        assert_eq!(t.rest(), "");
    }

    #[test]
    fn finish_discard_drops_rest() {
        let mut t = transformer();
        t.convert("a\ntail");
        assert!(t.finish(RestPolicy::Discard).is_none());
        assert_eq!(t.rest(), "");
        assert_eq!(t.map().rows_count(), 1);
    }

    #[test]
    fn finish_with_nothing_carried_is_noop() {
        let mut t = transformer();
        t.convert("a\n");
        assert!(t.finish(RestPolicy::Flush).is_none());
    }
}
