//! Delivery of JSON-RPC replies onto session streams
//!
//! Best effort only. A reply whose session is gone, or whose stream already
//! holds `max_pending_replies` undelivered frames, is dropped: no retry, no
//! queueing for a later reconnect.

use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;

use super::jsonrpc::JsonRpcResponse;
use super::session::{SessionRegistry, SseEvent};
use super::stream::MESSAGE_EVENT;

/// Pushes encoded replies to the stream named by a session id
#[derive(Clone)]
pub struct DeliveryChannel {
    registry: Arc<SessionRegistry>,
}

impl DeliveryChannel {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// Write one `message` frame to the session's stream.
    ///
    /// Returns `false` when the reply was dropped.
    pub fn deliver(&self, session_id: &str, response: &JsonRpcResponse) -> bool {
        let Some(sender) = self.registry.get(session_id) else {
            tracing::debug!(session_id, "Dropping reply for vanished session");
            crate::metrics::record_delivery_dropped();
            return false;
        };

        let data = match serde_json::to_string(response) {
            Ok(data) => data,
            Err(e) => {
                tracing::error!(session_id, "Failed to serialize MCP response: {}", e);
                return false;
            }
        };

        // A stream that closed after lookup, or whose reader stopped draining
        // it, is treated like a vanished session.
        match sender.try_send(SseEvent::new(MESSAGE_EVENT, data)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(session_id, "Session stream backlog full, dropping reply");
                crate::metrics::record_delivery_dropped();
                false
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(session_id, "Session stream closed before delivery");
                crate::metrics::record_delivery_dropped();
                false
            }
        }
    }
}
