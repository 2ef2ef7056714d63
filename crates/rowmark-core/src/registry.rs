//! Session registry: isolated [`StreamSession`]s keyed by [`StreamId`].

use std::collections::HashMap;
use std::sync::Arc;

use crate::notifier::Notifier;
use crate::session::{SessionSettings, StreamSession};
use crate::types::{Chunk, SourceId, StreamId, TransformResult};

pub struct SessionRegistry {
    settings: SessionSettings,
    notifier: Arc<dyn Notifier>,
    sessions: HashMap<StreamId, StreamSession>,
}

impl SessionRegistry {
    pub fn new(settings: SessionSettings, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            settings,
            notifier,
            sessions: HashMap::new(),
        }
    }

    /// Open a session for `stream_id`, or return the one already open.
    pub fn open(&mut self, stream_id: StreamId, source: SourceId) -> &mut StreamSession {
        let settings = &self.settings;
        let notifier = &self.notifier;
        self.sessions.entry(stream_id).or_insert_with_key(|id| {
            StreamSession::new(id.clone(), source, settings, Arc::clone(notifier))
        })
    }

    pub fn get(&self, stream_id: &StreamId) -> Option<&StreamSession> {
        self.sessions.get(stream_id)
    }

    pub fn get_mut(&mut self, stream_id: &StreamId) -> Option<&mut StreamSession> {
        self.sessions.get_mut(stream_id)
    }

    /// Route a chunk to its session. Chunks for unknown streams are dropped.
    pub fn convert(&mut self, stream_id: &StreamId, chunk: impl Into<Chunk>) -> Option<TransformResult> {
        match self.sessions.get_mut(stream_id) {
            Some(session) => Some(session.convert(chunk)),
            None => {
                tracing::warn!(stream = %stream_id, "chunk for unknown stream dropped");
                None
            }
        }
    }

    /// Close and forget a session. Returns `false` if it was not open.
    pub fn close(&mut self, stream_id: &StreamId) -> bool {
        match self.sessions.remove(stream_id) {
            Some(mut session) => {
                session.close();
                true
            }
            None => false,
        }
    }

    pub fn close_all(&mut self) {
        for (_, mut session) in self.sessions.drain() {
            session.close();
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Drop for SessionRegistry {
    fn drop(&mut self) {
        self.close_all();
    }
}
