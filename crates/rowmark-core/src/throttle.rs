//! Notification throttler: bounds the rate of outbound notifications while
//! a source is producing at high frequency.
//!
//! Every update cancels the pending flush timer and is merged into the
//! staged update. Then either:
//!
//! - the postponement count is still below [`ThrottlePolicy::max_postponed`]:
//!   a new flush is scheduled [`ThrottlePolicy::delay`] from now, or
//! - the count reaches the maximum: it is reset and the staged update is
//!   sent immediately.
//!
//! Isolated updates therefore arrive one delay later, bursts collapse into a
//! single message, and a sustained burst still gets a message every
//! `max_postponed` updates. A flush is the only path that calls the
//! [`Notifier`].
//!
//! Timers are tokio tasks. Outside a runtime there is nothing to fire them,
//! so updates are sent straight away.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::notifier::{deliver, Notifier};
use crate::types::{Notification, ProgressUpdate, StreamUpdate};

/// Fixed throttling constants for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottlePolicy {
    pub delay: Duration,
    pub max_postponed: u32,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(500),
            max_postponed: 500,
        }
    }
}

/// Merge a newer update into an older staged one.
pub trait Coalesce {
    fn coalesce(&mut self, newer: Self);
}

/// Stream updates accumulate: the merged update covers every row produced
/// since the last flush and carries the latest totals.
impl Coalesce for StreamUpdate {
    fn coalesce(&mut self, newer: Self) {
        if self.added_from_row < 0 {
            self.added_from_row = newer.added_from_row;
        }
        if newer.added_to_row >= 0 {
            self.added_to_row = newer.added_to_row;
        }
        self.added_output_text.push_str(&newer.added_output_text);
        self.total_byte_length = newer.total_byte_length;
        self.total_row_count = newer.total_row_count;
    }
}

/// Progress is a snapshot; the latest one wins.
impl Coalesce for ProgressUpdate {
    fn coalesce(&mut self, newer: Self) {
        *self = newer;
    }
}

/// How an update left [`Throttle::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// A delayed flush was (re)scheduled.
    Scheduled,
    /// The staged update was sent synchronously.
    Flushed,
}

#[derive(Debug)]
struct Staged<U> {
    update: Option<U>,
    postponed: u32,
}

impl<U> Staged<U> {
    fn take(&mut self) -> Option<U> {
        self.postponed = 0;
        self.update.take()
    }
}

/// One throttled channel. Owned by a stream session; dropping it cancels the
/// pending timer without sending.
pub struct Throttle<U> {
    policy: ThrottlePolicy,
    staged: Arc<Mutex<Staged<U>>>,
    timer: Option<JoinHandle<()>>,
    notifier: Arc<dyn Notifier>,
}

impl<U> Throttle<U>
where
    U: Coalesce + Into<Notification> + Send + 'static,
{
    pub fn new(policy: ThrottlePolicy, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            policy,
            staged: Arc::new(Mutex::new(Staged {
                update: None,
                postponed: 0,
            })),
            timer: None,
            notifier,
        }
    }

    pub fn policy(&self) -> ThrottlePolicy {
        self.policy
    }

    /// Stage `update` and either schedule or force a flush.
    pub fn update(&mut self, update: U) -> Dispatch {
        self.cancel();

        let forced = {
            let mut staged = self.staged.lock();
            match staged.update.as_mut() {
                Some(current) => current.coalesce(update),
                None => staged.update = Some(update),
            }
            staged.postponed += 1;
            staged.postponed >= self.policy.max_postponed
        };

        if forced {
            self.send_staged();
            return Dispatch::Flushed;
        }
        self.schedule()
    }

    /// Stage `update` and send immediately, bypassing the delay.
    pub fn send_now(&mut self, update: U) {
        self.cancel();
        {
            let mut staged = self.staged.lock();
            match staged.update.as_mut() {
                Some(current) => current.coalesce(update),
                None => staged.update = Some(update),
            }
        }
        self.send_staged();
    }

    /// Cancel the timer and send whatever is staged. Returns `false` if
    /// nothing was staged.
    pub fn flush(&mut self) -> bool {
        self.cancel();
        self.send_staged()
    }

    /// Cancel the pending timer, keeping the staged update.
    pub fn cancel(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    /// Updates postponed since the last flush.
    pub fn postponed(&self) -> u32 {
        self.staged.lock().postponed
    }

    pub fn has_staged(&self) -> bool {
        self.staged.lock().update.is_some()
    }

    /// Whether a delayed flush is waiting to fire.
    pub fn is_scheduled(&self) -> bool {
        self.timer.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn send_staged(&self) -> bool {
        send_staged(&self.staged, self.notifier.as_ref())
    }

    fn schedule(&mut self) -> Dispatch {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            self.send_staged();
            return Dispatch::Flushed;
        };

        let staged = Arc::clone(&self.staged);
        let notifier = Arc::clone(&self.notifier);
        let delay = self.policy.delay;
        self.timer = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            send_staged(&staged, notifier.as_ref());
        }));
        Dispatch::Scheduled
    }
}

impl<U> Drop for Throttle<U> {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

// The lock is held across the send so a timer that already took the staged
// update cannot be overtaken by a later forced flush.
fn send_staged<U: Into<Notification>>(staged: &Mutex<Staged<U>>, notifier: &dyn Notifier) -> bool {
    let mut staged = staged.lock();
    match staged.take() {
        Some(update) => {
            deliver(notifier, update.into());
            true
        }
        None => false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
