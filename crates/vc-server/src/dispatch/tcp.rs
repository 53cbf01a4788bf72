//! Reliable byte-stream sender.
//!
//! Accepts a single data connection from the stream's peer on the shared
//! listener and copies the file through a fixed buffer. Back-pressure is
//! the socket buffer; the peer closing its end is a normal end of stream.

use std::net::IpAddr;
use std::path::Path;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use vc_core::{Error, Result};

use super::{Counters, ACCEPT_TIMEOUT, COPY_BUF_LEN};

pub(crate) async fn send(
    listener: &TcpListener,
    path: &Path,
    peer_ip: IpAddr,
    cancel: &CancellationToken,
    counters: &mut Counters,
) -> Result<()> {
    let mut stream = accept_peer(listener, peer_ip, cancel).await?;
    let mut file = tokio::fs::File::open(path).await?;
    let mut buf = vec![0u8; COPY_BUF_LEN];

    loop {
        let n = tokio::select! {
            n = file.read(&mut buf) => n?,
            _ = cancel.cancelled() => return Err(Error::Cancelled),
        };
        if n == 0 {
            break;
        }

        let write = tokio::select! {
            result = stream.write_all(&buf[..n]) => result,
            _ = cancel.cancelled() => return Err(Error::Cancelled),
        };
        match write {
            Ok(()) => {
                counters.bytes_sent += n as u64;
                counters.packets_sent += 1;
            }
            // The peer hanging up mid-transfer ends the stream cleanly.
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::BrokenPipe | std::io::ErrorKind::ConnectionReset
                ) =>
            {
                tracing::debug!("Peer closed the data connection early");
                return Ok(());
            }
            Err(e) => return Err(Error::from(e)),
        }
    }

    stream.shutdown().await?;
    Ok(())
}

/// Wait for a data connection from the expected peer address.
///
/// Connections from other addresses are dropped and the wait continues;
/// after [`ACCEPT_TIMEOUT`] with no match the stream aborts.
async fn accept_peer(
    listener: &TcpListener,
    peer_ip: IpAddr,
    cancel: &CancellationToken,
) -> Result<TcpStream> {
    let accept = async {
        loop {
            let (stream, addr) = listener.accept().await?;
            if addr.ip() == peer_ip {
                return Ok::<_, std::io::Error>(stream);
            }
            tracing::debug!(got = %addr, expected = %peer_ip, "Dropping data connection from unexpected peer");
        }
    };

    tokio::select! {
        result = tokio::time::timeout(ACCEPT_TIMEOUT, accept) => match result {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(Error::from(e)),
            Err(_elapsed) => Err(Error::from(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "peer never opened the data connection",
            ))),
        },
        _ = cancel.cancelled() => Err(Error::Cancelled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    async fn scratch_file(len: usize) -> (tempfile::TempDir, std::path::PathBuf, Vec<u8>) {
        let dir = tempfile::tempdir().unwrap();
        let payload: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        let path = dir.path().join("Clip-240p.mp4");
        tokio::fs::write(&path, &payload).await.unwrap();
        (dir, path, payload)
    }

    #[tokio::test]
    async fn full_payload_arrives() {
        let (_dir, path, payload) = scratch_file(100_000).await;
        let listener = Arc::new(TcpListener::bind("127.0.0.1:0").await.unwrap());
        let port = listener.local_addr().unwrap().port();

        let cancel = CancellationToken::new();
        let sender = {
            let listener = listener.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let mut counters = Counters::default();
                let result = send(
                    &listener,
                    &path,
                    "127.0.0.1".parse().unwrap(),
                    &cancel,
                    &mut counters,
                )
                .await;
                (result, counters)
            })
        };

        let mut conn = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        let mut received = Vec::new();
        conn.read_to_end(&mut received).await.unwrap();

        let (result, counters) = sender.await.unwrap();
        result.unwrap();
        assert_eq!(received, payload);
        assert_eq!(counters.bytes_sent, payload.len() as u64);
        // 100_000 bytes / 16 KiB buffer = 7 writes.
        assert_eq!(counters.packets_sent, 7);
    }

    #[tokio::test]
    async fn peer_closing_early_ends_cleanly() {
        let (_dir, path, _) = scratch_file(4 * 1024 * 1024).await;
        let listener = Arc::new(TcpListener::bind("127.0.0.1:0").await.unwrap());
        let port = listener.local_addr().unwrap().port();

        let cancel = CancellationToken::new();
        let sender = {
            let listener = listener.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let mut counters = Counters::default();
                send(
                    &listener,
                    &path,
                    "127.0.0.1".parse().unwrap(),
                    &cancel,
                    &mut counters,
                )
                .await
            })
        };

        let mut conn = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        let mut first = [0u8; 1024];
        conn.read_exact(&mut first).await.unwrap();
        drop(conn);

        // The sender must notice the closed peer and stop without error.
        let result = tokio::time::timeout(std::time::Duration::from_secs(10), sender)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn cancellation_stops_the_accept_wait() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut counters = Counters::default();
        let result = send(
            &listener,
            Path::new("/nonexistent"),
            "127.0.0.1".parse().unwrap(),
            &cancel,
            &mut counters,
        )
        .await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
