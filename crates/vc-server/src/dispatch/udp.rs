//! Raw datagram sender.
//!
//! Each 16 KiB chunk of the file becomes one datagram, paced at roughly
//! real time. Loss is accepted and never retried; cancellation is observed
//! on every pacing sleep, bounding teardown to one interval.

use std::net::SocketAddr;
use std::path::Path;

use tokio::io::AsyncReadExt;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use vc_core::{Error, Result};

use super::{Counters, DATAGRAM_CHUNK_LEN, UDP_PACING};

pub(crate) async fn send(
    socket: &UdpSocket,
    path: &Path,
    dest: SocketAddr,
    cancel: &CancellationToken,
    counters: &mut Counters,
) -> Result<()> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut buf = vec![0u8; DATAGRAM_CHUNK_LEN];

    loop {
        let n = tokio::select! {
            n = file.read(&mut buf) => n?,
            _ = cancel.cancelled() => return Err(Error::Cancelled),
        };
        if n == 0 {
            break;
        }

        socket.send_to(&buf[..n], dest).await?;
        counters.bytes_sent += n as u64;
        counters.packets_sent += 1;

        tokio::select! {
            _ = tokio::time::sleep(UDP_PACING) => {}
            _ = cancel.cancelled() => return Err(Error::Cancelled),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn datagrams_carry_the_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let payload: Vec<u8> = (0..40_000).map(|i| (i % 256) as u8).collect();
        let path = dir.path().join("Clip-360p.mkv");
        tokio::fs::write(&path, &payload).await.unwrap();

        let sender_socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let dest = receiver.local_addr().unwrap();

        let cancel = CancellationToken::new();
        let mut counters = Counters::default();

        let recv_task = tokio::spawn(async move {
            let mut buf = vec![0u8; DATAGRAM_CHUNK_LEN];
            let mut received = Vec::new();
            let mut datagrams = 0;
            // 40_000 bytes / 16 KiB = 3 datagrams.
            while datagrams < 3 {
                let (n, _) = receiver.recv_from(&mut buf).await.unwrap();
                received.extend_from_slice(&buf[..n]);
                datagrams += 1;
            }
            received
        });

        send(&sender_socket, &path, dest, &cancel, &mut counters)
            .await
            .unwrap();

        let received = tokio::time::timeout(std::time::Duration::from_secs(5), recv_task)
            .await
            .unwrap()
            .unwrap();
        // Loopback does not drop; the full payload arrives in order here.
        assert_eq!(received, payload);
        assert_eq!(counters.packets_sent, 3);
        assert_eq!(counters.bytes_sent, 40_000);
    }

    #[tokio::test]
    async fn cancellation_is_observed_within_one_pacing_interval() {
        let dir = tempfile::tempdir().unwrap();
        // Large enough that the stream would run for many seconds if the
        // cancellation were ignored.
        let path = dir.path().join("Clip-480p.avi");
        tokio::fs::write(&path, vec![0u8; DATAGRAM_CHUNK_LEN * 200])
            .await
            .unwrap();

        let sender_socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let dest = receiver.local_addr().unwrap();

        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(120)).await;
            cancel_clone.cancel();
        });

        let mut counters = Counters::default();
        let started = std::time::Instant::now();
        let result = send(&sender_socket, &path, dest, &cancel, &mut counters).await;

        assert!(matches!(result, Err(Error::Cancelled)));
        // Cancellation must land within one pacing interval (plus slack).
        assert!(started.elapsed() < std::time::Duration::from_millis(500));
        assert!(counters.packets_sent < 10);
    }
}
