//! Typed control-channel client.
//!
//! One request in flight at a time; the server guarantees reply order, so
//! every call here is a strict send-then-receive pair.

use chrono::Utc;
use tokio::net::TcpStream;

use vc_core::{ClientId, Container, Error, Resolution, Result, Transport};
use vc_protocol::{Channel, Request, Response, VideoItem};

/// Client side of one control connection.
pub struct ControlClient {
    channel: Channel<TcpStream>,
    client_id: ClientId,
}

impl ControlClient {
    /// Dial the server and perform the connect handshake.
    pub async fn connect(server: &str, hostname: &str) -> Result<Self> {
        let stream = TcpStream::connect(server).await?;
        let mut channel = Channel::new(stream);

        channel
            .send(&Request::Connect {
                hostname: hostname.to_string(),
                ts: Utc::now(),
            })
            .await?;

        match channel.recv::<Response>().await? {
            Some(Response::Connected { client_id }) => {
                tracing::info!(client_id = %client_id, server, "Connected");
                Ok(Self { channel, client_id })
            }
            Some(other) => Err(unexpected_reply("connect", &other)),
            None => Err(Error::protocol("server closed during connect")),
        }
    }

    /// The server-issued session token.
    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    /// Fetch the containers the server can offer.
    pub async fn list_containers(&mut self) -> Result<Vec<Container>> {
        self.channel.send(&Request::ListContainers).await?;
        match self.channel.recv::<Response>().await? {
            Some(Response::Containers { containers }) => Ok(containers),
            Some(other) => Err(unexpected_reply("list_containers", &other)),
            None => Err(Error::protocol("server closed")),
        }
    }

    /// Fetch the catalog filtered by container and measured bandwidth.
    pub async fn list_videos(
        &mut self,
        container: Container,
        bandwidth_mbps: f64,
    ) -> Result<Vec<VideoItem>> {
        self.channel
            .send(&Request::ListVideos {
                container,
                bandwidth_mbps,
            })
            .await?;
        match self.channel.recv::<Response>().await? {
            Some(Response::Videos { videos }) => Ok(videos),
            Some(other) => Err(unexpected_reply("list_videos", &other)),
            None => Err(Error::protocol("server closed")),
        }
    }

    /// Ask the server to start streaming; returns the endpoint URL.
    pub async fn start_stream(
        &mut self,
        title: &str,
        resolution: Resolution,
        container: Container,
        transport: Transport,
        listen_port: Option<u16>,
    ) -> Result<String> {
        self.channel
            .send(&Request::StartStream {
                title: title.to_string(),
                resolution,
                container,
                transport,
                listen_port,
            })
            .await?;
        match self.channel.recv::<Response>().await? {
            Some(Response::StreamReady { endpoint }) => Ok(endpoint),
            Some(Response::NotFound) => Err(Error::not_found(
                "video",
                format!("{title}-{resolution}.{container}"),
            )),
            Some(Response::Busy) => Err(Error::busy("a stream is already active")),
            Some(Response::BadRequest { message }) => Err(Error::protocol(message)),
            Some(other) => Err(unexpected_reply("start_stream", &other)),
            None => Err(Error::protocol("server closed")),
        }
    }

    /// Close the session. The connection is unusable afterwards.
    pub async fn disconnect(mut self) -> Result<()> {
        self.channel
            .send(&Request::Disconnect {
                client_id: self.client_id,
            })
            .await?;
        match self.channel.recv::<Response>().await? {
            Some(Response::Ok) | None => Ok(()),
            Some(Response::BadRequest { message }) => Err(Error::protocol(message)),
            Some(other) => Err(unexpected_reply("disconnect", &other)),
        }
    }
}

fn unexpected_reply(operation: &str, reply: &Response) -> Error {
    Error::protocol(format!("unexpected reply to {operation}: {reply:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    /// Minimal scripted server: answers each expected request in order.
    async fn scripted_server(replies: Vec<Response>) -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut channel = Channel::new(stream);
            for reply in replies {
                let _: Option<Request> = channel.recv().await.unwrap();
                channel.send(&reply).await.unwrap();
            }
        });
        addr
    }

    #[tokio::test]
    async fn connect_handshake() {
        let client_id = ClientId::new();
        let addr = scripted_server(vec![Response::Connected { client_id }]).await;

        let client = ControlClient::connect(&addr.to_string(), "test-host")
            .await
            .unwrap();
        assert_eq!(client.client_id(), client_id);
    }

    #[tokio::test]
    async fn connect_rejects_unexpected_reply() {
        let addr = scripted_server(vec![Response::Busy]).await;
        let result = ControlClient::connect(&addr.to_string(), "test-host").await;
        assert!(matches!(result, Err(Error::Protocol(_))));
    }

    #[tokio::test]
    async fn list_and_stream_flow() {
        let client_id = ClientId::new();
        let addr = scripted_server(vec![
            Response::Connected { client_id },
            Response::Containers {
                containers: vec![Container::Mkv],
            },
            Response::Videos { videos: vec![] },
            Response::StreamReady {
                endpoint: "udp://127.0.0.1:8082".into(),
            },
            Response::Ok,
        ])
        .await;

        let mut client = ControlClient::connect(&addr.to_string(), "test-host")
            .await
            .unwrap();
        assert_eq!(client.list_containers().await.unwrap(), vec![Container::Mkv]);
        assert!(client.list_videos(Container::Mkv, 2.1).await.unwrap().is_empty());
        let endpoint = client
            .start_stream(
                "The_Godfather",
                Resolution::P480,
                Container::Mkv,
                Transport::Udp,
                Some(41000),
            )
            .await
            .unwrap();
        assert_eq!(endpoint, "udp://127.0.0.1:8082");
        client.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn busy_and_not_found_surface_as_typed_errors() {
        let client_id = ClientId::new();
        let addr = scripted_server(vec![
            Response::Connected { client_id },
            Response::NotFound,
            Response::Busy,
        ])
        .await;

        let mut client = ControlClient::connect(&addr.to_string(), "test-host")
            .await
            .unwrap();

        let missing = client
            .start_stream("Ghost", Resolution::P240, Container::Mp4, Transport::Tcp, None)
            .await;
        assert!(matches!(missing, Err(Error::NotFound { .. })));

        let busy = client
            .start_stream("Heat", Resolution::P240, Container::Mp4, Transport::Tcp, None)
            .await;
        assert!(matches!(busy, Err(Error::Busy(_))));
    }
}
