//! Stream lifecycle for MCP SSE sessions
//!
//! One stream per client connection. The stream registers itself, announces
//! its submission endpoint, relays delivered replies, and deregisters when
//! dropped. Dropping the response body is the only teardown path: client
//! disconnects, network failures and server shutdown all end up there.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive};
use futures::stream::Stream;

use super::session::{SessionRegistry, SseEvent};
use crate::Result;

/// First frame on every stream; its data is the submission address
pub const ENDPOINT_EVENT: &str = "endpoint";
/// Frame carrying a JSON-RPC reply
pub const MESSAGE_EVENT: &str = "message";

/// Query parameter carrying the session id on submissions
pub const SESSION_QUERY_PARAM: &str = "sessionId";

/// Submission address handed to the client for `session_id`
pub fn endpoint_uri(message_path: &str, session_id: &str) -> String {
    format!("{}?{}={}", message_path, SESSION_QUERY_PARAM, session_id)
}

/// Removes the session from the registry when the stream goes away
struct SessionGuard {
    registry: Arc<SessionRegistry>,
    id: String,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.registry.remove(&self.id) {
            crate::metrics::record_session_closed(self.registry.active_count());
            tracing::info!(session_id = %self.id, "MCP session closed");
        }
    }
}

/// Register a new session and build its event stream.
///
/// The first item is always the `endpoint` event. The stream stays open
/// until the consumer drops it.
pub fn open_session(
    registry: &Arc<SessionRegistry>,
    message_path: &str,
) -> Result<(String, impl Stream<Item = SseEvent> + Send + 'static)> {
    let (id, mut rx) = registry.create()?;
    crate::metrics::record_session_opened(registry.active_count());
    tracing::info!(session_id = %id, "MCP session opened");

    let guard = SessionGuard {
        registry: registry.clone(),
        id: id.clone(),
    };
    let endpoint = SseEvent::new(ENDPOINT_EVENT, endpoint_uri(message_path, &id));

    let stream = async_stream::stream! {
        let _guard = guard;
        yield endpoint;

        while let Some(event) = rx.recv().await {
            yield event;
        }
    };

    Ok((id, stream))
}

/// Convert a transport event into an axum SSE frame
pub fn to_sse_event(event: SseEvent) -> std::result::Result<Event, Infallible> {
    Ok(Event::default().event(event.event_type).data(event.data))
}

/// Comment-only keep-alive frames to defeat idle timeouts at proxies
pub fn keep_alive(interval: Duration) -> KeepAlive {
    KeepAlive::new().interval(interval).text("keep-alive")
}
