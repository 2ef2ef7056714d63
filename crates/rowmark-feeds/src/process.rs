//! Process feed: spawns an external command and streams its stdout.
//!
//! Stderr lines are logged, not transformed. The child is reaped by a
//! background task that logs its exit status.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{ChildStderr, Command};

use crate::reader::{self, DEFAULT_CHUNK_SIZE};
use crate::{Feed, FeedError, FeedSource};

#[derive(Debug, Clone)]
pub struct ProcessFeed {
    program: String,
    args: Vec<String>,
    chunk_size: usize,
}

impl ProcessFeed {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes;
        self
    }
}

impl FeedSource for ProcessFeed {
    fn open(self) -> Result<Feed, FeedError> {
        let spawn_error = |source| FeedError::Spawn {
            program: self.program.clone(),
            source,
        };

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| spawn_error(std::io::Error::other("stdout was not captured")))?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(log_stderr(self.program.clone(), stderr));
        }

        let program = self.program.clone();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => tracing::debug!(%program, "process exited"),
                Ok(status) => tracing::warn!(%program, %status, "process exited with failure"),
                Err(error) => tracing::warn!(%program, %error, "failed to wait for process"),
            }
        });

        tracing::debug!(program = %self.program, args = ?self.args, "spawned process feed");
        Ok(Feed::new(
            self.program.clone(),
            None,
            reader::chunks(stdout, self.chunk_size),
        ))
    }
}

async fn log_stderr(program: String, stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => tracing::warn!(%program, "stderr: {line}"),
            Ok(None) => break,
            Err(error) => {
                tracing::debug!(%program, %error, "stopped reading stderr");
                break;
            }
        }
    }
}
