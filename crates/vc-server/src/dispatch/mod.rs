//! The streaming dispatcher.
//!
//! Given a stream handle and a destination, launches the sender matching
//! the selected transport. The three transport endpoints are bound once at
//! startup: the TCP listener hands a freshly accepted socket to each
//! reliable stream, while the two UDP sockets are shared by every datagram
//! stream. Senders observe the handle's cancellation token at least once
//! per pacing interval and report their counters back through the handle
//! and the event bus.

mod rtp;
mod tcp;
mod udp;

pub use rtp::{RtpPacketizer, RTP_MAX_PAYLOAD, RTP_PAYLOAD_TYPE, RTP_TIMESTAMP_INCREMENT};

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::net::{TcpListener, UdpSocket};

use vc_core::config::ServerConfig;
use vc_core::events::{EventBus, EventPayload};
use vc_core::{ClientId, Error, Result, Transport};

use crate::sessions::{StreamHandle, StreamState, StreamStats};

/// Buffer size for the reliable byte-stream sender.
pub(crate) const COPY_BUF_LEN: usize = 16 * 1024;

/// Chunk size for raw datagrams.
pub(crate) const DATAGRAM_CHUNK_LEN: usize = 16 * 1024;

/// Inter-datagram delay for the raw datagram sender.
pub(crate) const UDP_PACING: Duration = Duration::from_millis(50);

/// Inter-packet delay for the RTP sender.
pub(crate) const RTP_PACING: Duration = Duration::from_millis(40);

/// How long the reliable sender waits for the peer's data connection.
pub(crate) const ACCEPT_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// StreamPorts
// ---------------------------------------------------------------------------

/// The process-wide transport endpoints.
pub struct StreamPorts {
    tcp: Arc<TcpListener>,
    udp: Arc<UdpSocket>,
    rtp: Arc<UdpSocket>,
    tcp_port: u16,
    udp_port: u16,
    rtp_port: u16,
}

impl StreamPorts {
    /// Bind all three endpoints. Any failure is fatal to startup.
    pub async fn bind(config: &ServerConfig) -> Result<Self> {
        let host = &config.host;

        let tcp = TcpListener::bind((host.as_str(), config.tcp_stream_port))
            .await
            .map_err(|e| bind_error("tcp", config.tcp_stream_port, e))?;
        let udp = UdpSocket::bind((host.as_str(), config.udp_stream_port))
            .await
            .map_err(|e| bind_error("udp", config.udp_stream_port, e))?;
        let rtp = UdpSocket::bind((host.as_str(), config.rtp_stream_port))
            .await
            .map_err(|e| bind_error("rtp", config.rtp_stream_port, e))?;

        // Record the actual ports so port 0 configs advertise correctly.
        let tcp_port = tcp.local_addr()?.port();
        let udp_port = udp.local_addr()?.port();
        let rtp_port = rtp.local_addr()?.port();

        tracing::info!(tcp_port, udp_port, rtp_port, "Stream ports bound");

        Ok(Self {
            tcp: Arc::new(tcp),
            udp: Arc::new(udp),
            rtp: Arc::new(rtp),
            tcp_port,
            udp_port,
            rtp_port,
        })
    }

    /// The bound port for a transport.
    pub fn port_for(&self, transport: Transport) -> u16 {
        match transport {
            Transport::Tcp => self.tcp_port,
            Transport::Udp => self.udp_port,
            Transport::Rtp => self.rtp_port,
        }
    }

    /// The endpoint URL a client should use, given the server address it
    /// already dialed for the control channel.
    pub fn endpoint(&self, transport: Transport, server_ip: IpAddr) -> String {
        format!("{}://{}:{}", transport, server_ip, self.port_for(transport))
    }
}

fn bind_error(transport: &str, port: u16, e: std::io::Error) -> Error {
    Error::Internal(format!("failed to bind {transport} stream port {port}: {e}"))
}

// ---------------------------------------------------------------------------
// Stream worker
// ---------------------------------------------------------------------------

/// Raw counters accumulated by a sender.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Counters {
    pub bytes_sent: u64,
    pub packets_sent: u64,
}

/// Drive one stream to completion.
///
/// Runs as the per-stream worker task: moves the handle to `Active`, runs
/// the transport sender, and records the terminal state, counters, and
/// events. `peer` carries the destination: the control peer's address, with
/// the client's listen port substituted for datagram transports.
pub async fn run_stream(
    ports: Arc<StreamPorts>,
    handle: StreamHandle,
    client_id: ClientId,
    peer: SocketAddr,
    bus: Arc<EventBus>,
) {
    let stream_id = handle.stream_id();
    let transport = handle.transport();
    let path = handle.entry().path.clone();
    let cancel = handle.cancellation().clone();

    handle.set_state(StreamState::Active);
    bus.broadcast(EventPayload::StreamStarted {
        stream_id,
        client_id,
        transport,
    });
    tracing::info!(
        stream_id = %stream_id,
        client_id = %client_id,
        transport = %transport,
        file = %path.display(),
        peer = %peer,
        "Stream active"
    );

    let started = Instant::now();
    let mut counters = Counters::default();

    let result = match transport {
        Transport::Tcp => tcp::send(&ports.tcp, &path, peer.ip(), &cancel, &mut counters).await,
        Transport::Udp => udp::send(&ports.udp, &path, peer, &cancel, &mut counters).await,
        Transport::Rtp => rtp::send(&ports.rtp, &path, peer, &cancel, &mut counters).await,
    };

    let stats = StreamStats::compute(counters.bytes_sent, counters.packets_sent, started.elapsed());

    match result {
        Ok(()) => {
            handle.finish(StreamState::Finished, stats);
            bus.broadcast(EventPayload::StreamFinished {
                stream_id,
                bytes_sent: stats.bytes_sent,
                packets_sent: stats.packets_sent,
                elapsed_ms: stats.elapsed_ms,
                bitrate_bps: stats.bitrate_bps,
            });
            tracing::info!(
                stream_id = %stream_id,
                bytes = stats.bytes_sent,
                packets = stats.packets_sent,
                bitrate_bps = stats.bitrate_bps,
                "Stream finished"
            );
        }
        Err(e) => {
            let reason = match &e {
                Error::Cancelled => "cancelled".to_string(),
                other => other.to_string(),
            };
            handle.finish(StreamState::Aborted, stats);
            tracing::info!(stream_id = %stream_id, reason = %reason, "Stream aborted");
            bus.broadcast(EventPayload::StreamAborted { stream_id, reason });
        }
    }
}
