//! RTP-framed datagram sender.
//!
//! Chunks sized to fit a typical MTU, each behind a 12-byte RTP header:
//! version 2, no padding/extension/CSRC, marker clear, dynamic payload type
//! 96, sequence numbers monotonic modulo 2^16 in send order, and a
//! timestamp advancing by a fixed increment on the 90 kHz clock.

use std::net::SocketAddr;
use std::path::Path;

use tokio::io::AsyncReadExt;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use vc_core::{Error, Result};

use super::{Counters, RTP_PACING};

/// RTP header length in bytes.
pub const RTP_HEADER_LEN: usize = 12;

/// Maximum payload per packet, keeping header + payload under a typical MTU.
pub const RTP_MAX_PAYLOAD: usize = 1400;

/// Dynamic payload type.
pub const RTP_PAYLOAD_TYPE: u8 = 96;

/// Timestamp advance per packet: 90 kHz clock at a nominal 25 fps.
pub const RTP_TIMESTAMP_INCREMENT: u32 = 3600;

/// Stateful RTP header writer.
#[derive(Debug)]
pub struct RtpPacketizer {
    sequence: u16,
    timestamp: u32,
    ssrc: u32,
}

impl RtpPacketizer {
    /// Create a packetizer with the given synchronization source.
    pub fn new(ssrc: u32) -> Self {
        Self {
            sequence: 0,
            timestamp: 0,
            ssrc,
        }
    }

    /// Frame one payload, advancing sequence number and timestamp.
    pub fn packetize(&mut self, payload: &[u8]) -> Vec<u8> {
        debug_assert!(payload.len() <= RTP_MAX_PAYLOAD);

        let mut packet = Vec::with_capacity(RTP_HEADER_LEN + payload.len());
        // V=2, P=0, X=0, CC=0.
        packet.push(0x80);
        // M=0, PT=96.
        packet.push(RTP_PAYLOAD_TYPE & 0x7f);
        packet.extend_from_slice(&self.sequence.to_be_bytes());
        packet.extend_from_slice(&self.timestamp.to_be_bytes());
        packet.extend_from_slice(&self.ssrc.to_be_bytes());
        packet.extend_from_slice(payload);

        self.sequence = self.sequence.wrapping_add(1);
        self.timestamp = self.timestamp.wrapping_add(RTP_TIMESTAMP_INCREMENT);
        packet
    }

    /// The sequence number the next packet will carry.
    pub fn next_sequence(&self) -> u16 {
        self.sequence
    }
}

pub(crate) async fn send(
    socket: &UdpSocket,
    path: &Path,
    dest: SocketAddr,
    cancel: &CancellationToken,
    counters: &mut Counters,
) -> Result<()> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut buf = vec![0u8; RTP_MAX_PAYLOAD];
    let mut packetizer = RtpPacketizer::new(rand::random::<u32>());

    loop {
        let n = tokio::select! {
            n = file.read(&mut buf) => n?,
            _ = cancel.cancelled() => return Err(Error::Cancelled),
        };
        if n == 0 {
            break;
        }

        let packet = packetizer.packetize(&buf[..n]);
        socket.send_to(&packet, dest).await?;
        counters.bytes_sent += n as u64;
        counters.packets_sent += 1;

        tokio::select! {
            _ = tokio::time::sleep(RTP_PACING) => {}
            _ = cancel.cancelled() => return Err(Error::Cancelled),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout() {
        let mut packetizer = RtpPacketizer::new(0xDEAD_BEEF);
        let packet = packetizer.packetize(b"payload");

        assert_eq!(packet.len(), RTP_HEADER_LEN + 7);
        // Version 2, no padding, no extension, zero CSRCs.
        assert_eq!(packet[0], 0x80);
        // Marker clear, payload type 96.
        assert_eq!(packet[1], 96);
        // First packet: sequence 0, timestamp 0.
        assert_eq!(u16::from_be_bytes([packet[2], packet[3]]), 0);
        assert_eq!(u32::from_be_bytes([packet[4], packet[5], packet[6], packet[7]]), 0);
        assert_eq!(
            u32::from_be_bytes([packet[8], packet[9], packet[10], packet[11]]),
            0xDEAD_BEEF
        );
        assert_eq!(&packet[RTP_HEADER_LEN..], b"payload");
    }

    #[test]
    fn sequence_and_timestamp_advance() {
        let mut packetizer = RtpPacketizer::new(1);
        packetizer.packetize(b"a");
        let second = packetizer.packetize(b"b");

        assert_eq!(u16::from_be_bytes([second[2], second[3]]), 1);
        assert_eq!(
            u32::from_be_bytes([second[4], second[5], second[6], second[7]]),
            RTP_TIMESTAMP_INCREMENT
        );
    }

    #[test]
    fn sequence_wraps_modulo_2_16() {
        let mut packetizer = RtpPacketizer::new(1);
        for _ in 0..u16::MAX as u32 + 1 {
            packetizer.packetize(b"x");
        }
        assert_eq!(packetizer.next_sequence(), 0);
        let wrapped = packetizer.packetize(b"x");
        assert_eq!(u16::from_be_bytes([wrapped[2], wrapped[3]]), 0);
        assert_eq!(packetizer.next_sequence(), 1);
    }

    #[tokio::test]
    async fn packets_fit_the_mtu_and_sequence_monotonically() {
        let dir = tempfile::tempdir().unwrap();
        let payload: Vec<u8> = (0..4000).map(|i| (i % 256) as u8).collect();
        let path = dir.path().join("Clip-720p.mp4");
        tokio::fs::write(&path, &payload).await.unwrap();

        let sender_socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let dest = receiver.local_addr().unwrap();

        let recv_task = tokio::spawn(async move {
            let mut buf = vec![0u8; 2048];
            let mut packets = Vec::new();
            // 4000 bytes / 1400 = 3 packets.
            for _ in 0..3 {
                let (n, _) = receiver.recv_from(&mut buf).await.unwrap();
                packets.push(buf[..n].to_vec());
            }
            packets
        });

        let cancel = CancellationToken::new();
        let mut counters = Counters::default();
        send(&sender_socket, &path, dest, &cancel, &mut counters)
            .await
            .unwrap();

        let packets = tokio::time::timeout(std::time::Duration::from_secs(5), recv_task)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(counters.packets_sent, 3);
        // Counters track payload bytes, not header overhead.
        assert_eq!(counters.bytes_sent, 4000);

        let ssrc = &packets[0][8..12];
        for (i, packet) in packets.iter().enumerate() {
            assert!(packet.len() <= RTP_HEADER_LEN + RTP_MAX_PAYLOAD);
            assert_eq!(packet[0], 0x80);
            assert_eq!(packet[1], 96);
            assert_eq!(u16::from_be_bytes([packet[2], packet[3]]), i as u16);
            assert_eq!(&packet[8..12], ssrc);
        }

        let reassembled: Vec<u8> = packets
            .iter()
            .flat_map(|p| p[RTP_HEADER_LEN..].to_vec())
            .collect();
        assert_eq!(reassembled, payload);
    }
}
