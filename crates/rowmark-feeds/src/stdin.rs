//! Stdin feed: reads the process's standard input until EOF.

use crate::reader::{self, DEFAULT_CHUNK_SIZE};
use crate::{Feed, FeedError, FeedSource};

#[derive(Debug, Clone)]
pub struct StdinFeed {
    chunk_size: usize,
}

impl Default for StdinFeed {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl StdinFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes;
        self
    }
}

impl FeedSource for StdinFeed {
    fn open(self) -> Result<Feed, FeedError> {
        tracing::debug!(chunk_size = self.chunk_size, "reading stdin");
        Ok(Feed::new(
            "stdin",
            None,
            reader::chunks(tokio::io::stdin(), self.chunk_size),
        ))
    }
}
