//! Test builders: ergonomic constructors for sessions and notifiers.
//!
//! These are designed for readability in test assertions, not for
//! production use. They panic rather than returning `Result`.

use std::sync::Arc;
use std::time::Duration;

use rowmark_core::{
    Notification, Notifier, ProgressUpdate, RestPolicy, SessionSettings, SourceId, StreamSession,
    StreamUpdate, ThrottlePolicy,
};
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Recorder
// ---------------------------------------------------------------------------

/// Receiving end of a channel notifier. Collects whatever has been sent so
/// far without waiting.
pub struct Recorder {
    rx: mpsc::UnboundedReceiver<Notification>,
}

impl Recorder {
    pub fn drain(&mut self) -> Vec<Notification> {
        std::iter::from_fn(|| self.rx.try_recv().ok()).collect()
    }

    pub fn stream_updates(&mut self) -> Vec<StreamUpdate> {
        self.drain()
            .into_iter()
            .filter_map(|n| match n {
                Notification::StreamUpdated(u) => Some(u),
                Notification::ProgressState(_) => None,
            })
            .collect()
    }

    pub fn progress_updates(&mut self) -> Vec<ProgressUpdate> {
        self.drain()
            .into_iter()
            .filter_map(|n| match n {
                Notification::ProgressState(p) => Some(p),
                Notification::StreamUpdated(_) => None,
            })
            .collect()
    }
}

/// A notifier backed by an unbounded channel plus its [`Recorder`].
pub fn recording_notifier() -> (Arc<dyn Notifier>, Recorder) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(tx), Recorder { rx })
}

// ---------------------------------------------------------------------------
// SessionBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for [`StreamSession`] fixtures.
///
/// ```rust
/// let (session, recorder) = SessionBuilder::new("logs").source(2).flush_rest().build();
/// ```
pub struct SessionBuilder {
    stream_id: String,
    source: SourceId,
    settings: SessionSettings,
}

impl SessionBuilder {
    pub fn new(stream_id: impl Into<String>) -> Self {
        Self {
            stream_id: stream_id.into(),
            source: 0,
            settings: SessionSettings::default(),
        }
    }

    pub fn source(mut self, source: SourceId) -> Self {
        self.source = source;
        self
    }

    pub fn flush_rest(mut self) -> Self {
        self.settings.rest_policy = RestPolicy::Flush;
        self
    }

    pub fn stream_throttle(mut self, delay: Duration, max_postponed: u32) -> Self {
        self.settings.stream = ThrottlePolicy { delay, max_postponed };
        self
    }

    pub fn replacement(mut self, replacement: char) -> Self {
        self.settings.marker_replacement = replacement;
        self
    }

    pub fn settings(&self) -> SessionSettings {
        self.settings
    }

    pub fn build(self) -> (StreamSession, Recorder) {
        let (notifier, recorder) = recording_notifier();
        let session = StreamSession::new(self.stream_id.into(), self.source, &self.settings, notifier);
        (session, recorder)
    }
}
