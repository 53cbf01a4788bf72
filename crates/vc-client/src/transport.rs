//! Transport selection and player URL construction.

use rand::Rng;

use vc_core::{Resolution, Transport};

/// Pick a transport for an entry when the user did not.
///
/// Small payloads ride the reliable stream; mid-range resolutions tolerate
/// datagram loss; the top tiers use RTP so the receiver can resequence.
pub fn auto_transport(resolution: Resolution) -> Transport {
    match resolution {
        Resolution::P240 => Transport::Tcp,
        Resolution::P360 | Resolution::P480 => Transport::Udp,
        Resolution::P720 | Resolution::P1080 => Transport::Rtp,
    }
}

/// A random high port for the local datagram listener.
pub fn pick_listen_port() -> u16 {
    rand::thread_rng().gen_range(20_000..=60_000)
}

/// The URL handed to the player for a given endpoint.
///
/// Unreliable transports carry the local listen port as a query parameter.
pub fn player_url(endpoint: &str, transport: Transport, listen_port: Option<u16>) -> String {
    match (transport, listen_port) {
        (Transport::Tcp, _) | (_, None) => endpoint.to_string(),
        (_, Some(port)) => format!("{endpoint}?localport={port}"),
    }
}

/// Full player argument list for a stream URL.
///
/// RTP input needs the protocol whitelist before ffplay will touch the URL.
pub fn player_args(url: &str, transport: Transport) -> Vec<String> {
    let mut args = Vec::new();
    if transport == Transport::Rtp {
        args.extend(["-protocol_whitelist".to_string(), "file,rtp,udp".to_string()]);
    }
    args.extend(["-autoexit".to_string(), url.to_string()]);
    args
}
