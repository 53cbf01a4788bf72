//! vc-server: the catalog/streaming server.
//!
//! Ties the other vc-* crates into a running application:
//!
//! - Framed-JSON control channel, one task per connected client
//! - Session registry enforcing one active stream per session
//! - Streaming dispatcher with TCP, UDP, and RTP senders
//! - Transcode worker pool fed by the missing-variant planner
//! - Graceful shutdown via signal handling
//!
//! All long-lived state hangs off [`context::ServerContext`], built once in
//! [`start`]; the three stream ports are bound at startup and reused for the
//! life of the process.

pub mod context;
pub mod control;
pub mod dispatch;
pub mod sessions;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use vc_av::ToolRegistry;
use vc_core::config::Config;
use vc_core::events::EventBus;
use vc_core::{Error, Result};
use vc_library::MediaLibrary;
use vc_transcode::Executor;

use crate::context::ServerContext;
use crate::dispatch::StreamPorts;
use crate::sessions::SessionRegistry;

/// Start the vidcast server.
///
/// Binds the control and stream ports, performs the initial scan + plan,
/// spawns the transcode pool and optional rescan task, and then serves
/// control connections until a shutdown signal arrives.
///
/// # Errors
///
/// Startup is fatal on a missing transcoder, an unbindable port, or an
/// unreadable video directory; everything after that is handled per
/// session or per job.
pub async fn start(config: Config) -> Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    // The transcoder is required; the player is only a client concern.
    let tools = Arc::new(ToolRegistry::discover(&config.tools));
    tools.require("ffmpeg")?;

    let bus = Arc::new(EventBus::default());
    let library = Arc::new(MediaLibrary::new(&config.library.video_dir, bus.clone()));

    // Root token for graceful shutdown; sessions and jobs hang off children.
    let cancel = CancellationToken::new();

    let sessions = Arc::new(SessionRegistry::new(bus.clone(), cancel.clone()));

    // Process-wide transport endpoints, bound once.
    let ports = Arc::new(StreamPorts::bind(&config.server).await?);
    let control_addr = format!("{}:{}", config.server.host, config.server.control_port);
    let control = TcpListener::bind(&control_addr)
        .await
        .map_err(|e| Error::Internal(format!("failed to bind control port {control_addr}: {e}")))?;

    let executor = Arc::new(Executor::start(
        library.clone(),
        tools.clone(),
        config.transcode.clone(),
        bus.clone(),
        cancel.child_token(),
    ));

    // Initial catalog build: scan errors at startup are fatal, the catalog
    // is rebuilt from disk on every start.
    library.scan()?;
    let jobs = vc_transcode::plan(&library.snapshot(), library.video_dir());
    let queued = executor.enqueue(jobs).await;
    tracing::info!(
        entries = library.len(),
        queued,
        "Catalog built, missing variants queued"
    );

    let ctx = ServerContext {
        config: Arc::new(config),
        library,
        sessions,
        executor: executor.clone(),
        ports,
        bus,
    };

    // Periodic rescan + verify, when enabled.
    let rescan_handle = spawn_rescan_task(ctx.clone(), cancel.child_token());

    tracing::info!("Control channel listening on {control_addr}");
    control::run_control_loop(ctx, control, cancel.clone()).await;

    // Signal all background work to stop and wait for it.
    cancel.cancel();
    executor.shutdown().await;
    if let Some(handle) = rescan_handle {
        let _ = handle.await;
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Spawn the periodic rescan/verify/plan task, if configured.
fn spawn_rescan_task(
    ctx: ServerContext,
    cancel: CancellationToken,
) -> Option<tokio::task::JoinHandle<()>> {
    let interval_secs = ctx.config.library.rescan_interval_secs;
    if interval_secs == 0 {
        return None;
    }

    Some(tokio::spawn(async move {
        let interval = std::time::Duration::from_secs(interval_secs);
        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = cancel.cancelled() => break,
            }

            ctx.library.verify();
            if let Err(e) = ctx.library.scan() {
                tracing::warn!("Periodic rescan failed: {e}");
                continue;
            }
            let jobs = vc_transcode::plan(&ctx.library.snapshot(), ctx.library.video_dir());
            if !jobs.is_empty() {
                let queued = ctx.executor.enqueue(jobs).await;
                tracing::info!(queued, "Rescan queued new transcode jobs");
            }
        }
    }))
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
pub(crate) async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = cancel.cancelled() => {}
    }

    tracing::info!("Shutdown signal received");
}
