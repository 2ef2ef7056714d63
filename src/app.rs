//! Headless driver: runs one feed through one stream session.
//!
//! The feed is registered as a progress pipe, drained through
//! [`StreamSession::pipe`] into the output sink, retired, and the session is
//! closed. Notifications go to stdout as JSON lines when requested.

use std::path::PathBuf;
use std::sync::Arc;

use futures::StreamExt;
use rowmark_core::notifier::Discard;
use rowmark_core::{
    Notification, Notifier, PipeSummary, SessionSettings, SourceId, StreamId, StreamSession,
};
use rowmark_feeds::{Feed, FeedSource, FileFeed, ProcessFeed, StdinFeed};
use tokio::io::{AsyncWrite, BufWriter};
use tokio::sync::mpsc;

use crate::output;

/// Where chunks come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Stdin,
    File { path: PathBuf, follow: bool },
    Exec { program: String, args: Vec<String> },
}

impl Input {
    fn open(self) -> Result<Feed, rowmark_feeds::FeedError> {
        match self {
            Input::Stdin => StdinFeed::new().open(),
            Input::File { path, follow } => FileFeed::new(path).follow(follow).open(),
            Input::Exec { program, args } => ProcessFeed::new(program).args(args).open(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub input: Input,
    pub stream_id: StreamId,
    pub source: SourceId,
    /// Marked-up output file. Output is discarded when `None`.
    pub output: Option<PathBuf>,
    /// Print notifications to stdout as JSON lines.
    pub events: bool,
    pub settings: SessionSettings,
}

/// Run the pipeline to completion and return what it produced.
pub async fn run(options: RunOptions) -> anyhow::Result<PipeSummary> {
    let feed = options.input.clone().open()?;

    let mut sink: Box<dyn AsyncWrite + Unpin + Send> = match &options.output {
        Some(path) => Box::new(BufWriter::new(tokio::fs::File::create(path).await?)),
        None => Box::new(tokio::io::sink()),
    };

    let mut printer = None;
    let notifier: Arc<dyn Notifier> = if options.events {
        let (tx, rx) = mpsc::unbounded_channel::<Notification>();
        printer = Some(tokio::spawn(output::write_notifications(rx, tokio::io::stdout())));
        Arc::new(tx)
    } else {
        Arc::new(Discard)
    };

    let summary = drive(feed, &options, notifier, &mut sink).await?;

    if let Some(printer) = printer {
        let written = printer.await??;
        tracing::debug!(written, "notification printer finished");
    }
    Ok(summary)
}

async fn drive<W>(
    feed: Feed,
    options: &RunOptions,
    notifier: Arc<dyn Notifier>,
    sink: &mut W,
) -> anyhow::Result<PipeSummary>
where
    W: AsyncWrite + Unpin,
{
    let mut session = StreamSession::new(
        options.stream_id.clone(),
        options.source,
        &options.settings,
        notifier,
    );

    let pipe_id = format!("{}:{}", options.stream_id, feed.name);
    match feed.size_hint {
        Some(size) => session.progress_mut().add_sized(&pipe_id, &feed.name, size),
        None => session.progress_mut().add(&pipe_id, &feed.name),
    }
    tracing::info!(stream = %options.stream_id, feed = %feed.name, size = ?feed.size_hint, "feed opened");

    let name = feed.name;
    let chunks = feed.chunks.scan((), move |_, item| {
        futures::future::ready(match item {
            Ok(chunk) => Some(chunk),
            Err(error) => {
                tracing::warn!(feed = %name, %error, "feed failed, closing stream");
                None
            }
        })
    });

    let mut summary = session.pipe(chunks, sink).await?;
    session.progress_mut().remove(&pipe_id);
    if let Some(last) = session.finish_into(sink).await? {
        summary.add(&last);
    }

    tracing::info!(
        stream = %options.stream_id,
        chunks = summary.chunks,
        rows = summary.rows,
        bytes = summary.bytes,
        "stream finished"
    );
    Ok(summary)
}
