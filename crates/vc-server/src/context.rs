//! Shared server context.

use std::sync::Arc;

use vc_core::config::Config;
use vc_core::events::EventBus;
use vc_library::MediaLibrary;
use vc_transcode::Executor;

use crate::dispatch::StreamPorts;
use crate::sessions::SessionRegistry;

/// Application context shared by every control task and stream sender.
///
/// Cheaply cloneable: it only holds `Arc`s.
#[derive(Clone)]
pub struct ServerContext {
    /// Immutable application configuration snapshot.
    pub config: Arc<Config>,
    /// The in-memory catalog.
    pub library: Arc<MediaLibrary>,
    /// Connected clients and their stream handles.
    pub sessions: Arc<SessionRegistry>,
    /// Transcode worker pool.
    pub executor: Arc<Executor>,
    /// Process-wide transport endpoints.
    pub ports: Arc<StreamPorts>,
    /// Broadcast event bus.
    pub bus: Arc<EventBus>,
}
