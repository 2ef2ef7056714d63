//! Stream session: everything owned by one open stream.
//!
//! A [`StreamSession`] holds the [`Transformer`] (with its offset map), the
//! throttled stream-update channel and the [`ProgressState`]. Chunks go in
//! through [`StreamSession::convert`] (pull mode) or
//! [`StreamSession::pipe`] (push mode); [`StreamSession::close`] applies the
//! rest policy and flushes both channels synchronously.
//!
//! Sessions share nothing; the only asynchronous parts are the throttle
//! timers, which die with the session.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::markers::DEFAULT_REPLACEMENT;
use crate::notifier::Notifier;
use crate::offset_map::OffsetMap;
use crate::progress::ProgressState;
use crate::throttle::{Throttle, ThrottlePolicy};
use crate::transform::{RestPolicy, Transformer};
use crate::types::{Chunk, SourceId, StreamId, StreamUpdate, TransformResult};

/// Per-session tunables, usually built from [`Config`](crate::config::Config).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSettings {
    pub stream: ThrottlePolicy,
    pub progress: ThrottlePolicy,
    pub rest_policy: RestPolicy,
    pub marker_replacement: char,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            stream: ThrottlePolicy::default(),
            progress: ThrottlePolicy::default(),
            rest_policy: RestPolicy::default(),
            marker_replacement: DEFAULT_REPLACEMENT,
        }
    }
}

/// Totals reported by [`StreamSession::pipe`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipeSummary {
    pub chunks: u64,
    pub rows: u64,
    pub bytes: u64,
}

impl PipeSummary {
    pub fn add(&mut self, result: &TransformResult) {
        self.rows += result.row_count();
        self.bytes += result.bytes_size;
    }
}

pub struct StreamSession {
    transformer: Transformer,
    progress: ProgressState,
    updates: Throttle<StreamUpdate>,
    rest_policy: RestPolicy,
    closed: bool,
}

impl StreamSession {
    pub fn new(
        stream_id: StreamId,
        source: SourceId,
        settings: &SessionSettings,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        tracing::debug!(stream = %stream_id, source, "session opened");
        Self {
            transformer: Transformer::new(stream_id.clone(), source)
                .with_replacement(settings.marker_replacement),
            progress: ProgressState::new(stream_id, settings.progress, Arc::clone(&notifier)),
            updates: Throttle::new(settings.stream, notifier),
            rest_policy: settings.rest_policy,
            closed: false,
        }
    }

    pub fn stream_id(&self) -> &StreamId {
        self.transformer.stream_id()
    }

    pub fn source(&self) -> SourceId {
        self.transformer.source()
    }

    pub fn map(&self) -> &OffsetMap {
        self.transformer.map()
    }

    pub fn rest(&self) -> &str {
        self.transformer.rest()
    }

    pub fn progress(&self) -> &ProgressState {
        &self.progress
    }

    pub fn progress_mut(&mut self) -> &mut ProgressState {
        &mut self.progress
    }

    pub fn rest_policy(&self) -> RestPolicy {
        self.rest_policy
    }

    pub fn set_rest_policy(&mut self, policy: RestPolicy) {
        self.rest_policy = policy;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Convert one chunk and schedule the resulting stream update. Sized
    /// progress advances by the chunk's input length.
    pub fn convert(&mut self, chunk: impl Into<Chunk>) -> TransformResult {
        let chunk = chunk.into();
        let input_bytes = chunk.len() as u64;
        let result = self.transformer.convert(chunk);
        self.notify(&result, input_bytes);
        result
    }

    /// Drain `chunks` in order, writing every marked output to `writer`.
    /// The session stays open; follow with [`finish_into`](Self::finish_into)
    /// or [`close`](Self::close).
    pub async fn pipe<S, W>(&mut self, chunks: S, writer: &mut W) -> std::io::Result<PipeSummary>
    where
        S: Stream<Item = Chunk>,
        W: AsyncWrite + Unpin,
    {
        let mut summary = PipeSummary::default();
        let mut chunks = std::pin::pin!(chunks);
        while let Some(chunk) = chunks.next().await {
            summary.chunks += 1;
            let result = self.convert(chunk);
            summary.add(&result);
            if !result.output.is_empty() {
                writer.write_all(result.output.as_bytes()).await?;
            }
        }
        writer.flush().await?;
        Ok(summary)
    }

    /// [`close`](Self::close) the session and write the final row, if any,
    /// to `writer`.
    pub async fn finish_into<W>(&mut self, writer: &mut W) -> std::io::Result<Option<TransformResult>>
    where
        W: AsyncWrite + Unpin,
    {
        let last = self.close();
        if let Some(result) = &last {
            writer.write_all(result.output.as_bytes()).await?;
        }
        writer.flush().await?;
        Ok(last)
    }

    /// Apply the rest policy, flush pending stream updates and tear down the
    /// progress state. Returns the final row if the rest was flushed.
    /// Closing twice is a no-op.
    pub fn close(&mut self) -> Option<TransformResult> {
        if self.closed {
            return None;
        }
        self.closed = true;

        let last = self.transformer.finish(self.rest_policy);
        if let Some(result) = &last {
            self.notify(result, 0);
        }
        self.updates.flush();
        self.progress.destroy();

        tracing::info!(
            stream = %self.stream_id(),
            rows = self.map().rows_count(),
            bytes = self.map().byte_length(),
            "session closed"
        );
        last
    }

    fn notify(&mut self, result: &TransformResult, input_bytes: u64) {
        self.progress.consume(input_bytes);

        let map = self.transformer.map();
        let (from, to) = result
            .rows
            .map_or((-1, -1), |rows| (rows.from as i64, rows.to as i64));
        let update = StreamUpdate {
            stream_id: self.transformer.stream_id().clone(),
            total_byte_length: map.byte_length(),
            total_row_count: map.rows_count(),
            added_output_text: result.output.clone(),
            added_from_row: from,
            added_to_row: to,
        };
        self.updates.update(update);
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.close();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
