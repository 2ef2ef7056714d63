//! Static corpora used across harnesses.

/// Plain log lines, one row each.
pub const CORPUS_LINES: &[&str] = &[
    "2024-01-15 10:00:00 INFO  Starting application version 2.4.1",
    "2024-01-15 10:00:01 ERROR Failed to connect to database after 3 retries",
    "Jan 15 10:00:02 myhost sshd[12345]: Failed password for invalid user admin",
    "[2024-01-15T10:00:03Z] WARN: Disk usage at 92% on /dev/sda1",
    r#"{"ts":"2024-01-15T10:00:04Z","level":"INFO","message":"Token validated"}"#,
    "GET /api/v1/users 200 47ms",
    "Grüße aus Köln — naïve café",
    "日本語のログ行",
];

/// Lines separated by every break style the transformer accepts.
pub const MIXED_BREAKS: &str = "one\r\ntwo\rthree\n\nfour\r\n\r\nfive\n";

/// Rows expected from [`MIXED_BREAKS`].
pub const MIXED_BREAKS_ROWS: &[&str] = &["one", "two", "three", "four", "five"];

/// The corpus joined with `\n`, terminated.
pub fn corpus_text() -> String {
    let mut text = CORPUS_LINES.join("\n");
    text.push('\n');
    text
}

/// Split `bytes` into pieces of at most `size` bytes, ignoring character
/// boundaries.
pub fn split_bytes(bytes: &[u8], size: usize) -> Vec<Vec<u8>> {
    bytes.chunks(size.max(1)).map(<[u8]>::to_vec).collect()
}
