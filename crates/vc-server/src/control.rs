//! Per-client control channel tasks.
//!
//! One task per connection reads framed requests sequentially, so replies
//! always preserve request order within a channel. Protocol-level errors
//! answer `bad_request` and keep the channel alive; losing the channel
//! (EOF, I/O error, idle timeout) garbage-collects the session and thereby
//! cancels its stream.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use vc_core::{ClientId, Error, Transport};
use vc_library::query;
use vc_protocol::{Channel, Request, Response, VideoItem};

use crate::context::ServerContext;
use crate::dispatch;

/// Accept control connections until shutdown.
pub async fn run_control_loop(
    ctx: ServerContext,
    listener: TcpListener,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, peer)) => {
                        let ctx = ctx.clone();
                        let cancel = cancel.clone();
                        tokio::spawn(async move {
                            handle_client(ctx, stream, peer, cancel).await;
                        });
                    }
                    Err(e) => {
                        tracing::debug!("Control accept error: {e}");
                    }
                }
            }
            _ = crate::shutdown_signal(cancel.clone()) => break,
        }
    }
}

/// Serve one control connection to completion.
async fn handle_client(
    ctx: ServerContext,
    stream: TcpStream,
    peer: SocketAddr,
    cancel: CancellationToken,
) {
    tracing::debug!(peer = %peer, "Control connection opened");

    // The address the client dialed; used to build stream endpoints that
    // are reachable from that client even when we bind 0.0.0.0.
    let server_ip = stream.local_addr().ok().map(|a| a.ip());

    let mut channel = Channel::new(stream);
    let mut client_id: Option<ClientId> = None;
    let idle_timeout = Duration::from_secs(ctx.config.server.idle_timeout_secs);

    loop {
        let request = tokio::select! {
            received = tokio::time::timeout(idle_timeout, channel.recv::<Request>()) => {
                match received {
                    // Idle too long; consider the session dead.
                    Err(_elapsed) => {
                        tracing::info!(peer = %peer, "Control channel idle timeout");
                        break;
                    }
                    Ok(Ok(None)) => break,
                    Ok(Ok(Some(request))) => request,
                    Ok(Err(Error::Protocol(message))) => {
                        tracing::debug!(peer = %peer, error = %message, "Bad request frame");
                        if channel.send(&Response::BadRequest { message }).await.is_err() {
                            break;
                        }
                        continue;
                    }
                    Ok(Err(e)) => {
                        tracing::debug!(peer = %peer, error = %e, "Control channel error");
                        break;
                    }
                }
            }
            _ = cancel.cancelled() => break,
        };

        let response = handle_request(&ctx, &mut client_id, peer, server_ip, request).await;
        if channel.send(&response).await.is_err() {
            break;
        }
    }

    // A dropped channel implicitly ends the session and its stream.
    if let Some(client_id) = client_id {
        ctx.sessions.drop_session(client_id);
    }
    tracing::debug!(peer = %peer, "Control connection closed");
}

/// Dispatch one request to a reply.
async fn handle_request(
    ctx: &ServerContext,
    client_id: &mut Option<ClientId>,
    peer: SocketAddr,
    server_ip: Option<IpAddr>,
    request: Request,
) -> Response {
    match request {
        Request::Connect { hostname, ts } => {
            tracing::debug!(peer = %peer, hostname = %hostname, client_ts = %ts, "Connect");
            let id = ctx.sessions.connect(peer, &hostname);
            *client_id = Some(id);
            Response::Connected { client_id: id }
        }

        Request::ListContainers => Response::Containers {
            containers: query::list_containers(&ctx.library.snapshot()),
        },

        Request::ListVideos {
            container,
            bandwidth_mbps,
        } => {
            let videos = query::list_videos(&ctx.library.snapshot(), container, bandwidth_mbps);
            Response::Videos {
                videos: videos.iter().map(VideoItem::from_entry).collect(),
            }
        }

        Request::StartStream {
            title,
            resolution,
            container,
            transport,
            listen_port,
        } => {
            start_stream(
                ctx, *client_id, peer, server_ip, &title, resolution, container, transport,
                listen_port,
            )
            .await
        }

        Request::Disconnect {
            client_id: requested,
        } => match ctx.sessions.disconnect(requested, peer) {
            Ok(()) => {
                if *client_id == Some(requested) {
                    *client_id = None;
                }
                Response::Ok
            }
            Err(e) => Response::BadRequest {
                message: e.to_string(),
            },
        },
    }
}

/// Validate a stream request, create its handle, and launch the sender.
#[allow(clippy::too_many_arguments)]
async fn start_stream(
    ctx: &ServerContext,
    client_id: Option<ClientId>,
    peer: SocketAddr,
    server_ip: Option<IpAddr>,
    title: &str,
    resolution: vc_core::Resolution,
    container: vc_core::Container,
    transport: Transport,
    listen_port: Option<u16>,
) -> Response {
    let Some(client_id) = client_id else {
        return Response::BadRequest {
            message: "start_stream before connect".into(),
        };
    };

    let Some(entry) = ctx.library.find(title, resolution, container) else {
        return Response::NotFound;
    };

    // Datagram transports need to know where to aim.
    let dest = match transport {
        Transport::Tcp => peer,
        Transport::Udp | Transport::Rtp => match listen_port {
            Some(port) => SocketAddr::new(peer.ip(), port),
            None => {
                return Response::BadRequest {
                    message: format!("{transport} stream requires listen_port"),
                }
            }
        },
    };

    let Some(server_ip) = server_ip else {
        return Response::BadRequest {
            message: "server address unavailable".into(),
        };
    };

    let handle = match ctx.sessions.begin_stream(client_id, entry, transport) {
        Ok(handle) => handle,
        Err(Error::Busy(_)) => return Response::Busy,
        Err(Error::NotFound { .. }) => {
            return Response::BadRequest {
                message: "unknown session".into(),
            }
        }
        Err(e) => {
            return Response::BadRequest {
                message: e.to_string(),
            }
        }
    };

    // Worker task scoped to the session; the handle's token aborts it.
    tokio::spawn(dispatch::run_stream(
        ctx.ports.clone(),
        handle,
        client_id,
        dest,
        ctx.bus.clone(),
    ));

    Response::StreamReady {
        endpoint: ctx.ports.endpoint(transport, server_ip),
    }
}
