//! Client session registry and stream handles.
//!
//! One [`ClientSession`] per connected control channel, at most one
//! non-terminal [`StreamHandle`] per session. Dropping a session (explicit
//! disconnect, EOF, idle timeout) cancels its stream; the sender observes
//! the cancellation within one pacing interval.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use vc_core::events::{EventBus, EventPayload};
use vc_core::{ClientId, Error, Result, StreamId, Transport, VideoEntry};

// ---------------------------------------------------------------------------
// StreamState / StreamStats
// ---------------------------------------------------------------------------

/// Lifecycle state of one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamState {
    Setup,
    Active,
    Finished,
    Aborted,
}

impl StreamState {
    /// Whether the stream can no longer send anything.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamState::Finished | StreamState::Aborted)
    }
}

/// Per-stream delivery counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamStats {
    pub bytes_sent: u64,
    pub packets_sent: u64,
    pub elapsed_ms: u64,
    pub bitrate_bps: u64,
}

impl StreamStats {
    /// Derive the wall-time and bit-rate fields from raw counters.
    pub fn compute(bytes_sent: u64, packets_sent: u64, elapsed: Duration) -> Self {
        let elapsed_ms = elapsed.as_millis() as u64;
        let bitrate_bps = if elapsed.as_secs_f64() > 0.0 {
            ((bytes_sent as f64 * 8.0) / elapsed.as_secs_f64()) as u64
        } else {
            0
        };
        Self {
            bytes_sent,
            packets_sent,
            elapsed_ms,
            bitrate_bps,
        }
    }
}

// ---------------------------------------------------------------------------
// StreamHandle
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct StreamInner {
    stream_id: StreamId,
    entry: VideoEntry,
    transport: Transport,
    started_at: DateTime<Utc>,
    cancel: CancellationToken,
    state: Mutex<StreamState>,
    stats: Mutex<Option<StreamStats>>,
}

/// Server-side representation of one active delivery.
///
/// Cloneable; the registry keeps one clone on the session while the sender
/// task drives another.
#[derive(Debug, Clone)]
pub struct StreamHandle {
    inner: Arc<StreamInner>,
}

impl StreamHandle {
    fn new(entry: VideoEntry, transport: Transport, cancel: CancellationToken) -> Self {
        Self {
            inner: Arc::new(StreamInner {
                stream_id: StreamId::new(),
                entry,
                transport,
                started_at: Utc::now(),
                cancel,
                state: Mutex::new(StreamState::Setup),
                stats: Mutex::new(None),
            }),
        }
    }

    pub fn stream_id(&self) -> StreamId {
        self.inner.stream_id
    }

    pub fn entry(&self) -> &VideoEntry {
        &self.inner.entry
    }

    pub fn transport(&self) -> Transport {
        self.inner.transport
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.inner.started_at
    }

    /// The cooperative cancellation signal the sender observes.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.inner.cancel
    }

    pub fn state(&self) -> StreamState {
        *self.inner.state.lock()
    }

    pub fn set_state(&self, state: StreamState) {
        *self.inner.state.lock() = state;
    }

    /// Final counters, present once the stream terminated.
    pub fn stats(&self) -> Option<StreamStats> {
        *self.inner.stats.lock()
    }

    /// Record the terminal state and counters.
    pub fn finish(&self, state: StreamState, stats: StreamStats) {
        *self.inner.state.lock() = state;
        *self.inner.stats.lock() = Some(stats);
    }

    /// Test constructor bypassing the registry.
    #[cfg(test)]
    pub(crate) fn new_for_tests(
        entry: VideoEntry,
        transport: Transport,
        cancel: CancellationToken,
    ) -> Self {
        Self::new(entry, transport, cancel)
    }

    /// Move to `Aborted` and wake the sender.
    pub fn abort(&self) {
        {
            let mut state = self.inner.state.lock();
            if !state.is_terminal() {
                *state = StreamState::Aborted;
            }
        }
        self.inner.cancel.cancel();
    }
}

// ---------------------------------------------------------------------------
// ClientSession
// ---------------------------------------------------------------------------

/// One connected client.
#[derive(Debug, Clone)]
pub struct ClientSession {
    pub client_id: ClientId,
    pub peer_addr: SocketAddr,
    pub hostname: String,
    pub connected_at: DateTime<Utc>,
    /// Most recent stream; terminal handles stay for their counters.
    pub current_stream: Option<StreamHandle>,
}

// ---------------------------------------------------------------------------
// SessionRegistry
// ---------------------------------------------------------------------------

/// Issues client IDs and tracks live sessions.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<ClientId, ClientSession>>,
    bus: Arc<EventBus>,
    /// Parent of every stream token, so server shutdown cancels all streams.
    shutdown: CancellationToken,
}

impl SessionRegistry {
    pub fn new(bus: Arc<EventBus>, shutdown: CancellationToken) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            bus,
            shutdown,
        }
    }

    /// Register a session and issue its ID.
    pub fn connect(&self, peer_addr: SocketAddr, hostname: &str) -> ClientId {
        let client_id = ClientId::new();
        let session = ClientSession {
            client_id,
            peer_addr,
            hostname: hostname.to_string(),
            connected_at: Utc::now(),
            current_stream: None,
        };
        self.sessions.lock().insert(client_id, session);

        tracing::info!(client_id = %client_id, peer = %peer_addr, hostname, "Client connected");
        self.bus.broadcast(EventPayload::ClientConnected {
            client_id,
            peer: peer_addr.to_string(),
        });
        client_id
    }

    /// Explicit disconnect; the peer address must match the registration.
    pub fn disconnect(&self, client_id: ClientId, peer_addr: SocketAddr) -> Result<()> {
        {
            let sessions = self.sessions.lock();
            let session = sessions
                .get(&client_id)
                .ok_or_else(|| Error::not_found("session", client_id))?;
            if session.peer_addr.ip() != peer_addr.ip() {
                return Err(Error::protocol("disconnect peer does not match session"));
            }
        }
        self.drop_session(client_id);
        Ok(())
    }

    /// Remove a session unconditionally, cancelling its stream.
    ///
    /// Returns `false` if the session was unknown (already collected).
    pub fn drop_session(&self, client_id: ClientId) -> bool {
        let session = self.sessions.lock().remove(&client_id);
        let Some(session) = session else {
            return false;
        };

        if let Some(stream) = &session.current_stream {
            if !stream.state().is_terminal() {
                tracing::info!(
                    client_id = %client_id,
                    stream_id = %stream.stream_id(),
                    "Aborting stream of departing session"
                );
                stream.abort();
            }
        }

        tracing::info!(client_id = %client_id, "Client disconnected");
        self.bus
            .broadcast(EventPayload::ClientDisconnected { client_id });
        true
    }

    /// Create the stream handle for a session, enforcing the
    /// one-active-stream invariant.
    ///
    /// # Errors
    ///
    /// [`Error::Busy`] if a non-terminal stream exists; the existing stream
    /// is untouched. [`Error::NotFound`] for an unknown session.
    pub fn begin_stream(
        &self,
        client_id: ClientId,
        entry: VideoEntry,
        transport: Transport,
    ) -> Result<StreamHandle> {
        let mut sessions = self.sessions.lock();
        let session = sessions
            .get_mut(&client_id)
            .ok_or_else(|| Error::not_found("session", client_id))?;

        if let Some(existing) = &session.current_stream {
            if !existing.state().is_terminal() {
                return Err(Error::busy(format!(
                    "stream {} is still {:?}",
                    existing.stream_id(),
                    existing.state()
                )));
            }
        }

        let handle = StreamHandle::new(entry, transport, self.shutdown.child_token());
        session.current_stream = Some(handle.clone());
        Ok(handle)
    }

    /// Look up a session's current stream handle.
    pub fn current_stream(&self, client_id: ClientId) -> Option<StreamHandle> {
        self.sessions
            .lock()
            .get(&client_id)
            .and_then(|s| s.current_stream.clone())
    }

    /// Snapshot of one session.
    pub fn session(&self, client_id: ClientId) -> Option<ClientSession> {
        self.sessions.lock().get(&client_id).cloned()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Whether no sessions are registered.
    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}
