//! rowmark-feeds: chunk sources for rowmark.
//!
//! Each feed opens a byte source and exposes it as a stream of
//! [`rowmark_core::Chunk`]s in arrival order. Chunk boundaries are whatever
//! the source delivered; the transformer reconciles them.

pub mod file;
pub mod process;
pub mod reader;
pub mod stdin;

use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::BoxStream;
use futures::Stream;
use rowmark_core::Chunk;
use tokio::sync::mpsc;

pub use file::FileFeed;
pub use process::ProcessFeed;
pub use stdin::StdinFeed;

/// Stream of chunks produced by a feed.
pub type ChunkStream = BoxStream<'static, Result<Chunk, FeedError>>;

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("read failed: {0}")]
    Read(#[from] std::io::Error),
    #[error("file watch failed: {0}")]
    Watch(#[from] notify::Error),
}

/// An opened feed.
pub struct Feed {
    /// Display name, used as the progress pipe name.
    pub name: String,
    /// Expected total size in bytes, if the source knows it.
    pub size_hint: Option<u64>,
    pub chunks: ChunkStream,
}

impl Feed {
    pub fn new(name: impl Into<String>, size_hint: Option<u64>, chunks: ChunkStream) -> Self {
        Self {
            name: name.into(),
            size_hint,
            chunks,
        }
    }
}

impl std::fmt::Debug for Feed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Feed")
            .field("name", &self.name)
            .field("size_hint", &self.size_hint)
            .finish_non_exhaustive()
    }
}

/// Trait implemented by each chunk source.
///
/// Feeds that spawn background work (followed files, processes) must be
/// opened from within a tokio runtime.
pub trait FeedSource {
    fn open(self) -> Result<Feed, FeedError>;
}

/// Chunks pushed by a background task.
pub(crate) struct ChannelStream {
    rx: mpsc::Receiver<Result<Chunk, FeedError>>,
}

impl ChannelStream {
    pub(crate) fn new(rx: mpsc::Receiver<Result<Chunk, FeedError>>) -> Self {
        Self { rx }
    }
}

impl Stream for ChannelStream {
    type Item = Result<Chunk, FeedError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
