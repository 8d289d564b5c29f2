//! Live client sessions.
//!
//! The transport layer owns the actual connection; the actor only needs a way
//! to push text frames back to it.

use durocache_types::SessionId;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Outbound half of a client connection.
pub trait SessionSink: Send + Sync {
    /// Delivers one frame. Returns `false` once the connection is gone.
    fn send(&self, frame: String) -> bool;
}

impl SessionSink for mpsc::UnboundedSender<String> {
    fn send(&self, frame: String) -> bool {
        mpsc::UnboundedSender::send(self, frame).is_ok()
    }
}

/// A connection attached to one actor instance.
#[derive(Clone)]
pub struct Session {
    pub id: SessionId,
    /// The profile id this session was opened for.
    pub subject_id: String,
    sink: Arc<dyn SessionSink>,
}

impl Session {
    pub fn new(subject_id: impl Into<String>, sink: Arc<dyn SessionSink>) -> Self {
        Self {
            id: SessionId::new(),
            subject_id: subject_id.into(),
            sink,
        }
    }

    /// Creates a session backed by an unbounded channel, returning the
    /// receiver the transport drains into the socket.
    pub fn channel(subject_id: impl Into<String>) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(subject_id, Arc::new(tx)), rx)
    }

    pub(crate) fn send(&self, frame: String) -> bool {
        self.sink.send(frame)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("subject_id", &self.subject_id)
            .finish_non_exhaustive()
    }
}
