//! FakeProcess: a chunk stream fed by a test-held writer.
//!
//! Simulates a producer such as `journalctl -f` without spawning anything.
//! Works with `tokio::time::pause()` for deterministic timing tests.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use rowmark_core::Chunk;
use tokio::sync::mpsc;

/// A handle for pushing chunks into a [`FakeProcess`] stream.
pub struct FakeProcessWriter {
    tx: mpsc::UnboundedSender<Chunk>,
}

impl FakeProcessWriter {
    /// Send raw bytes as one chunk.
    pub fn send_bytes(&self, bytes: impl Into<Bytes>) {
        let _ = self.tx.send(Chunk::Bytes(bytes.into()));
    }

    /// Send text as one chunk, exactly as given.
    pub fn send_text(&self, text: impl Into<String>) {
        let _ = self.tx.send(Chunk::Text(text.into()));
    }

    /// Send a line, adding a trailing newline if not already present.
    pub fn send_line(&self, line: impl Into<String>) {
        let mut s = line.into();
        if !s.ends_with('\n') {
            s.push('\n');
        }
        self.send_text(s);
    }

    /// Close the stream, causing the consumer to see EOF.
    pub fn close(self) {}
}

/// Implements [`Stream<Item = Chunk>`] so it can be handed straight to
/// `StreamSession::pipe`.
pub struct FakeProcess {
    rx: mpsc::UnboundedReceiver<Chunk>,
}

impl Stream for FakeProcess {
    type Item = Chunk;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Create a linked writer/stream pair.
pub fn fake_process() -> (FakeProcessWriter, FakeProcess) {
    let (tx, rx) = mpsc::unbounded_channel();
    (FakeProcessWriter { tx }, FakeProcess { rx })
}
