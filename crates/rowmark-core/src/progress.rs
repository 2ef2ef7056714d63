//! Progress state: the pipes feeding one stream and their aggregate
//! progress fraction.
//!
//! Pipes are registered with [`ProgressState::add`] and removed when they
//! finish. The fraction only means something while at least one pipe is
//! registered; removing the last one resets the state to idle. Progress
//! changes go through a [`Throttle`]; pipe removal and teardown are sent
//! immediately.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::notifier::Notifier;
use crate::throttle::{Throttle, ThrottlePolicy};
use crate::types::{ProgressUpdate, StreamId};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Pipe {
    id: String,
    name: String,
    expected_bytes: u64,
}

pub struct ProgressState {
    stream_id: StreamId,
    /// Registration order is display order.
    pipes: Vec<Pipe>,
    progress: f64,
    started: Option<DateTime<Utc>>,
    consumed_bytes: u64,
    throttle: Throttle<ProgressUpdate>,
}

impl ProgressState {
    pub fn new(stream_id: StreamId, policy: ThrottlePolicy, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            stream_id,
            pipes: Vec::new(),
            progress: 0.0,
            started: None,
            consumed_bytes: 0,
            throttle: Throttle::new(policy, notifier),
        }
    }

    /// Register a pipe. No-op if `id` is already registered.
    pub fn add(&mut self, id: impl Into<String>, name: impl Into<String>) {
        self.register(id.into(), name.into(), 0);
    }

    /// Register a pipe that is expected to deliver `expected_bytes` of
    /// input. Byte-accounted progress is derived from the sum of all
    /// registered expectations.
    pub fn add_sized(&mut self, id: impl Into<String>, name: impl Into<String>, expected_bytes: u64) {
        self.register(id.into(), name.into(), expected_bytes);
    }

    fn register(&mut self, id: String, name: String, expected_bytes: u64) {
        if self.pipes.iter().any(|p| p.id == id) {
            return;
        }
        if self.started.is_none() {
            self.started = Some(Utc::now());
        }
        tracing::debug!(stream = %self.stream_id, pipe = %id, %name, "pipe registered");
        self.pipes.push(Pipe {
            id,
            name,
            expected_bytes,
        });
    }

    /// Deregister a pipe and send the current state. Removing the last pipe
    /// resets progress and logs the total duration. An unknown id changes
    /// nothing but still sends.
    pub fn remove(&mut self, id: &str) {
        let Some(idx) = self.pipes.iter().position(|p| p.id == id) else {
            tracing::debug!(stream = %self.stream_id, pipe = %id, "remove of unknown pipe");
            let snapshot = self.snapshot();
            self.throttle.send_now(snapshot);
            return;
        };
        self.pipes.remove(idx);

        if self.pipes.is_empty() {
            self.progress = 0.0;
            self.consumed_bytes = 0;
            if let Some(started) = self.started.take() {
                let elapsed = (Utc::now() - started).num_milliseconds() as f64 / 1000.0;
                tracing::info!(stream = %self.stream_id, "all pipes done in {elapsed:.2}s");
            }
        }

        let snapshot = self.snapshot();
        self.throttle.send_now(snapshot);
    }

    /// Set the progress fraction. Ignored while idle, when unchanged, or
    /// outside `[0, 1]`. Returns whether the value was applied.
    pub fn next(&mut self, progress: f64) -> bool {
        if self.pipes.is_empty() {
            return false;
        }
        if self.progress == progress {
            return false;
        }
        if !(0.0..=1.0).contains(&progress) {
            return false;
        }
        self.progress = progress;
        let snapshot = self.snapshot();
        self.throttle.update(snapshot);
        true
    }

    /// Account `bytes` of consumed input against the registered
    /// expectations and advance the fraction accordingly. Does nothing when
    /// no pipe declared an expected size.
    pub fn consume(&mut self, bytes: u64) -> bool {
        let expected = self.expected_bytes();
        if expected == 0 || bytes == 0 {
            return false;
        }
        self.consumed_bytes = self.consumed_bytes.saturating_add(bytes);
        let fraction = (self.consumed_bytes as f64 / expected as f64).min(1.0);
        self.next(fraction)
    }

    /// Cancel any pending timer, clear every pipe, and send the final empty
    /// state synchronously.
    pub fn destroy(&mut self) {
        self.throttle.cancel();
        self.pipes.clear();
        self.progress = 0.0;
        self.consumed_bytes = 0;
        self.started = None;
        let snapshot = self.snapshot();
        self.throttle.send_now(snapshot);
    }

    /// Current state as it would be sent.
    pub fn snapshot(&self) -> ProgressUpdate {
        ProgressUpdate {
            stream_id: self.stream_id.clone(),
            progress_fraction: self.progress,
            active_item_names: self.names().map(str::to_string).collect(),
        }
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.pipes.iter().map(|p| p.name.as_str())
    }

    pub fn is_idle(&self) -> bool {
        self.pipes.is_empty()
    }

    /// When the first currently registered pipe was added.
    pub fn started(&self) -> Option<DateTime<Utc>> {
        self.started
    }

    pub fn expected_bytes(&self) -> u64 {
        self.pipes.iter().map(|p| p.expected_bytes).sum()
    }

    #[cfg(test)]
    pub(crate) fn throttle(&self) -> &Throttle<ProgressUpdate> {
        &self.throttle
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
