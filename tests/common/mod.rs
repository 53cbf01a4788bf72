//! Shared harness for integration tests.
//!
//! Assembles a full server (catalog, sessions, stream ports, control loop)
//! on loopback with OS-assigned ports and a scratch video directory.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use vc_av::ToolRegistry;
use vc_core::config::{Config, TranscodeConfig};
use vc_core::events::{Event, EventBus};
use vc_library::MediaLibrary;
use vc_server::context::ServerContext;
use vc_server::control::run_control_loop;
use vc_server::dispatch::StreamPorts;
use vc_server::sessions::SessionRegistry;
use vc_transcode::Executor;

pub struct TestHarness {
    pub ctx: ServerContext,
    pub control_addr: SocketAddr,
    pub cancel: CancellationToken,
    tmp: tempfile::TempDir,
}

impl TestHarness {
    /// Start a server over a scratch directory seeded with `files`.
    pub async fn start(files: &[&str]) -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let video_dir = tmp.path().join("videos");
        std::fs::create_dir(&video_dir).unwrap();
        for name in files {
            write_video(&video_dir, name, 64 * 1024);
        }

        let mut config = Config::default();
        config.server.host = "127.0.0.1".into();
        config.server.control_port = 0;
        config.server.tcp_stream_port = 0;
        config.server.udp_stream_port = 0;
        config.server.rtp_stream_port = 0;
        config.library.video_dir = video_dir;
        // Tests drive the executor explicitly when they need it.
        config.transcode = TranscodeConfig {
            parallelism: 0,
            ..TranscodeConfig::default()
        };

        let cancel = CancellationToken::new();
        let bus = Arc::new(EventBus::default());
        let library = Arc::new(MediaLibrary::new(&config.library.video_dir, bus.clone()));
        library.scan().unwrap();

        let sessions = Arc::new(SessionRegistry::new(bus.clone(), cancel.clone()));
        let ports = Arc::new(StreamPorts::bind(&config.server).await.unwrap());
        let executor = Arc::new(Executor::start(
            library.clone(),
            Arc::new(ToolRegistry::default()),
            config.transcode.clone(),
            bus.clone(),
            cancel.child_token(),
        ));

        let control = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let control_addr = control.local_addr().unwrap();

        let ctx = ServerContext {
            config: Arc::new(config),
            library,
            sessions,
            executor,
            ports,
            bus,
        };

        let loop_ctx = ctx.clone();
        let loop_cancel = cancel.clone();
        tokio::spawn(async move {
            run_control_loop(loop_ctx, control, loop_cancel).await;
        });

        Self {
            ctx,
            control_addr,
            cancel,
            tmp,
        }
    }

    pub fn control_addr(&self) -> String {
        self.control_addr.to_string()
    }

    pub fn video_dir(&self) -> PathBuf {
        self.tmp.path().join("videos")
    }

    /// Collect the payload of a video file written by [`write_video`].
    pub fn payload(&self, name: &str) -> Vec<u8> {
        std::fs::read(self.video_dir().join(name)).unwrap()
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.ctx.bus.subscribe()
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Write a deterministic pseudo-video file.
pub fn write_video(dir: &Path, name: &str, len: usize) {
    let payload: Vec<u8> = (0..len).map(|i| (i % 249) as u8).collect();
    std::fs::write(dir.join(name), payload).unwrap();
}
