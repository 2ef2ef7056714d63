//! File feed: reads a file from the start and, when following, keeps
//! reading data appended to it.
//!
//! Following is driven by `notify` modify events with a periodic re-read as
//! a fallback for filesystems that do not report changes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use rowmark_core::Chunk;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;

use crate::reader::{self, DEFAULT_CHUNK_SIZE};
use crate::{ChannelStream, Feed, FeedError, FeedSource};

/// Re-read interval when no change event arrives while following.
const FOLLOW_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub struct FileFeed {
    path: PathBuf,
    follow: bool,
    chunk_size: usize,
}

impl FileFeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            follow: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Keep reading appended data after reaching the end of the file.
    pub fn follow(mut self, follow: bool) -> Self {
        self.follow = follow;
        self
    }

    pub fn chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FeedSource for FileFeed {
    fn open(self) -> Result<Feed, FeedError> {
        let file = std::fs::File::open(&self.path).map_err(|source| FeedError::Open {
            path: self.path.clone(),
            source,
        })?;
        let size_hint = file.metadata().ok().map(|m| m.len());
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string());
        let file = tokio::fs::File::from_std(file);

        tracing::debug!(path = %self.path.display(), ?size_hint, follow = self.follow, "opening file feed");

        if !self.follow {
            return Ok(Feed::new(name, size_hint, reader::chunks(file, self.chunk_size)));
        }

        let (wake_tx, wake_rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |event: notify::Result<notify::Event>| {
            match event {
                Ok(event) if event.kind.is_modify() => {
                    let _ = wake_tx.send(());
                }
                Ok(_) => {}
                Err(error) => tracing::warn!(%error, "file watch error"),
            }
        })?;
        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(follow_file(file, watcher, wake_rx, tx, self.chunk_size));

        // Followed files grow, so a size hint would only make progress lie.
        Ok(Feed::new(name, None, ChannelStream::new(rx).boxed()))
    }
}

async fn follow_file(
    mut file: tokio::fs::File,
    _watcher: RecommendedWatcher,
    mut wake: mpsc::UnboundedReceiver<()>,
    tx: mpsc::Sender<Result<Chunk, FeedError>>,
    chunk_size: usize,
) {
    let mut buf = vec![0u8; chunk_size];
    loop {
        match file.read(&mut buf).await {
            Ok(0) => {
                tokio::select! {
                    _ = wake.recv() => while wake.try_recv().is_ok() {},
                    _ = tokio::time::sleep(FOLLOW_POLL_INTERVAL) => {}
                    _ = tx.closed() => break,
                }
            }
            Ok(n) => {
                let chunk = Chunk::Bytes(Bytes::copy_from_slice(&buf[..n]));
                if tx.send(Ok(chunk)).await.is_err() {
                    break;
                }
            }
            Err(error) => {
                let _ = tx.send(Err(error.into())).await;
                break;
            }
        }
    }
    tracing::debug!("stopped following file");
}
