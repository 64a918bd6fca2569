//! Session registry for the MCP SSE transport
//!
//! Maps session ids to the sending half of each open event stream. The
//! registry is constructed once at startup and shared by `Arc`; the stream
//! handler and the delivery channel are its only users.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{Error, Result};

/// Event written onto an SSE stream
#[derive(Clone, Debug, PartialEq)]
pub struct SseEvent {
    pub event_type: String,
    pub data: String,
}

impl SseEvent {
    pub fn new(event_type: &str, data: impl Into<String>) -> Self {
        Self {
            event_type: event_type.to_string(),
            data: data.into(),
        }
    }
}

/// Outbound handle for one open stream
pub type StreamSender = mpsc::Sender<SseEvent>;
pub type StreamReceiver = mpsc::Receiver<SseEvent>;

/// Replies that may wait on one stream before further ones are dropped
pub const DEFAULT_MAX_PENDING_REPLIES: usize = 256;

#[derive(Debug)]
struct Session {
    sender: StreamSender,
    created_at: DateTime<Utc>,
}

/// Process-wide map from session id to open stream
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Session>>,
    max_sessions: Option<usize>,
    max_pending: usize,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::with_limits(None, DEFAULT_MAX_PENDING_REPLIES)
    }

    /// Cap concurrently registered sessions and the replies queued per stream
    pub fn with_limits(max_sessions: Option<usize>, max_pending: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions,
            max_pending: max_pending.max(1),
        }
    }

    /// Create a session under a fresh random id and return the stream receiver.
    ///
    /// Ids are v4 UUIDs. They act as the capability for posting to the stream,
    /// so they are never derived from a counter and never reused.
    pub fn create(&self) -> Result<(String, StreamReceiver)> {
        let mut sessions = self.sessions.write();

        if let Some(max) = self.max_sessions {
            if sessions.len() >= max {
                return Err(Error::TooManySessions);
            }
        }

        let mut id = Uuid::new_v4().to_string();
        while sessions.contains_key(&id) {
            id = Uuid::new_v4().to_string();
        }

        let (tx, rx) = mpsc::channel(self.max_pending);
        sessions.insert(
            id.clone(),
            Session {
                sender: tx,
                created_at: Utc::now(),
            },
        );

        Ok((id, rx))
    }

    /// Look up the stream for a session
    pub fn get(&self, session_id: &str) -> Option<StreamSender> {
        self.sessions
            .read()
            .get(session_id)
            .map(|s| s.sender.clone())
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.read().contains_key(session_id)
    }

    pub fn created_at(&self, session_id: &str) -> Option<DateTime<Utc>> {
        self.sessions.read().get(session_id).map(|s| s.created_at)
    }

    /// Remove a session. Removing an unknown id is a no-op.
    ///
    /// Returns whether an entry was removed.
    pub fn remove(&self, session_id: &str) -> bool {
        self.sessions.write().remove(session_id).is_some()
    }

    /// Get active session count
    pub fn active_count(&self) -> usize {
        self.sessions.read().len()
    }
}
