//! Control message kinds.
//!
//! Inbound dispatch is a tagged enumeration: the `kind` field selects the
//! variant and serde enforces the required fields, so an unknown or
//! malformed frame fails to decode as a unit and the server answers
//! `bad_request` without tearing the channel down.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vc_core::{ClientId, Container, Resolution, Transport, VideoEntry};

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Client-to-server control messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Request {
    /// Open a session.
    Connect {
        /// The client's self-reported host name.
        hostname: String,
        /// Client wall-clock at connection time.
        ts: DateTime<Utc>,
    },
    /// List the containers the catalog can serve.
    ListContainers,
    /// List the videos in one container that fit under the bandwidth ceiling.
    ListVideos {
        container: Container,
        bandwidth_mbps: f64,
    },
    /// Ask the server to stream one catalog entry.
    StartStream {
        title: String,
        resolution: Resolution,
        container: Container,
        transport: Transport,
        /// The client's local datagram port; required for udp and rtp,
        /// absent for tcp.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        listen_port: Option<u16>,
    },
    /// Close the session.
    Disconnect { client_id: ClientId },
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// Server-to-client control replies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Response {
    /// Session opened; the token identifies it from here on.
    Connected { client_id: ClientId },
    /// Reply to [`Request::ListContainers`].
    Containers { containers: Vec<Container> },
    /// Reply to [`Request::ListVideos`].
    Videos { videos: Vec<VideoItem> },
    /// The stream is set up; connect (tcp) or listen (udp/rtp) here.
    StreamReady { endpoint: String },
    /// The requested entry does not exist in the catalog.
    NotFound,
    /// The session already has an active stream.
    Busy,
    /// Generic acknowledgement.
    Ok,
    /// The request was unknown or malformed; the channel stays open.
    BadRequest { message: String },
}

// ---------------------------------------------------------------------------
// VideoItem
// ---------------------------------------------------------------------------

/// A catalog entry as presented on the wire.
///
/// `url` is a display-only locator; streaming goes through
/// [`Request::StartStream`], never through this field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoItem {
    pub title: String,
    pub resolution: Resolution,
    pub container: Container,
    pub url: String,
}

impl VideoItem {
    /// Build the wire representation of a catalog entry.
    pub fn from_entry(entry: &VideoEntry) -> Self {
        Self {
            title: entry.title.clone(),
            resolution: entry.resolution,
            container: entry.container,
            url: format!("file://{}", entry.path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_wire_shape() {
        let req = Request::ListVideos {
            container: Container::Mkv,
            bandwidth_mbps: 2.1,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(
            json,
            r#"{"kind":"list_videos","container":"mkv","bandwidth_mbps":2.1}"#
        );
    }

    #[test]
    fn start_stream_omits_absent_listen_port() {
        let req = Request::StartStream {
            title: "Heat".into(),
            resolution: Resolution::P240,
            container: Container::Mp4,
            transport: Transport::Tcp,
            listen_port: None,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("listen_port"));

        let with_port = Request::StartStream {
            title: "Heat".into(),
            resolution: Resolution::P720,
            container: Container::Mp4,
            transport: Transport::Rtp,
            listen_port: Some(40000),
        };
        let json = serde_json::to_string(&with_port).unwrap();
        assert!(json.contains(r#""listen_port":40000"#));
    }

    #[test]
    fn request_roundtrip() {
        let req = Request::Connect {
            hostname: "living-room".into(),
            ts: Utc::now(),
        };
        let json = serde_json::to_string(&req).unwrap();
        let back: Request = serde_json::from_str(&json).unwrap();
        assert_eq!(back, req);
    }

    #[test]
    fn unknown_kind_fails_to_decode() {
        let result = serde_json::from_str::<Request>(r#"{"kind":"reboot"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn missing_required_field_fails_to_decode() {
        let result = serde_json::from_str::<Request>(r#"{"kind":"list_videos","container":"mkv"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn response_wire_shape() {
        let resp = Response::StreamReady {
            endpoint: "udp://10.0.0.5:8082".into(),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(
            json,
            r#"{"kind":"stream_ready","endpoint":"udp://10.0.0.5:8082"}"#
        );

        assert_eq!(serde_json::to_string(&Response::Busy).unwrap(), r#"{"kind":"busy"}"#);
        assert_eq!(
            serde_json::to_string(&Response::NotFound).unwrap(),
            r#"{"kind":"not_found"}"#
        );
    }

    #[test]
    fn video_item_from_entry() {
        let entry = VideoEntry::new(
            "The_Godfather",
            Resolution::P480,
            Container::Mkv,
            "/videos/The_Godfather-480p.mkv",
        );
        let item = VideoItem::from_entry(&entry);
        assert_eq!(item.title, "The_Godfather");
        assert_eq!(item.url, "file:///videos/The_Godfather-480p.mkv");

        let json = serde_json::to_string(&item).unwrap();
        let back: VideoItem = serde_json::from_str(&json).unwrap();
        assert_eq!(back, item);
    }
}
