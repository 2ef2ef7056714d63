//! Generic [`AsyncRead`] feed.

use futures::StreamExt;
use rowmark_core::Chunk;
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;

use crate::{ChunkStream, Feed, FeedError};

/// Read buffer size used when a feed does not specify one.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Turn `reader` into a chunk stream reading at most `chunk_size` bytes at a time.
pub fn chunks<R>(reader: R, chunk_size: usize) -> ChunkStream
where
    R: AsyncRead + Send + 'static,
{
    ReaderStream::with_capacity(reader, chunk_size.max(1))
        .map(|read| read.map(Chunk::Bytes).map_err(FeedError::Read))
        .boxed()
}

/// Wrap any reader as a named feed.
pub fn feed<R>(name: impl Into<String>, reader: R, size_hint: Option<u64>) -> Feed
where
    R: AsyncRead + Send + 'static,
{
    Feed::new(name, size_hint, chunks(reader, DEFAULT_CHUNK_SIZE))
}
