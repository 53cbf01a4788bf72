//! Media-domain enums and the catalog entry type.
//!
//! All enums serialize in lowercase and implement `Display` manually for
//! consistent string representation. `Container` and `Resolution` derive
//! `Ord` in their declared table order, which is the order every
//! client-facing listing relies on.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::Error;

// ---------------------------------------------------------------------------
// Container
// ---------------------------------------------------------------------------

/// Supported container formats, in table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    Mp4,
    Mkv,
    Avi,
}

impl Container {
    /// All supported containers, in table order.
    pub const ALL: [Container; 3] = [Container::Mp4, Container::Mkv, Container::Avi];

    /// The file extension (without the dot).
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mkv => "mkv",
            Self::Avi => "avi",
        }
    }

    /// Parse a file extension (case-insensitive, no dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "mp4" => Some(Self::Mp4),
            "mkv" => Some(Self::Mkv),
            "avi" => Some(Self::Avi),
            _ => None,
        }
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for Container {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s).ok_or_else(|| Error::protocol(format!("unknown container: {s}")))
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Named vertical resolutions, ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "240p")]
    P240,
    #[serde(rename = "360p")]
    P360,
    #[serde(rename = "480p")]
    P480,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "1080p")]
    P1080,
}

impl Resolution {
    /// All supported resolutions, ascending.
    pub const ALL: [Resolution; 5] = [
        Resolution::P240,
        Resolution::P360,
        Resolution::P480,
        Resolution::P720,
        Resolution::P1080,
    ];

    /// Vertical pixel count.
    pub fn height(&self) -> u32 {
        match self {
            Self::P240 => 240,
            Self::P360 => 360,
            Self::P480 => 480,
            Self::P720 => 720,
            Self::P1080 => 1080,
        }
    }

    /// The filename token, e.g. `"720p"`.
    pub fn token(&self) -> &'static str {
        match self {
            Self::P240 => "240p",
            Self::P360 => "360p",
            Self::P480 => "480p",
            Self::P720 => "720p",
            Self::P1080 => "1080p",
        }
    }

    /// Parse a resolution token (case-insensitive).
    pub fn from_token(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "240p" => Some(Self::P240),
            "360p" => Some(Self::P360),
            "480p" => Some(Self::P480),
            "720p" => Some(Self::P720),
            "1080p" => Some(Self::P1080),
            _ => None,
        }
    }

    /// All resolutions less than or equal to `ceiling`, ascending.
    pub fn up_to(ceiling: Resolution) -> impl Iterator<Item = Resolution> {
        Self::ALL.into_iter().filter(move |r| *r <= ceiling)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Resolution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_token(s).ok_or_else(|| Error::protocol(format!("unknown resolution: {s}")))
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Wire-level dispatch mode for a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Reliable byte stream.
    Tcp,
    /// Raw datagrams with pacing.
    Udp,
    /// RTP-framed datagrams.
    Rtp,
}

impl Transport {
    /// The URL scheme for this transport.
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
            Self::Rtp => "rtp",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

impl FromStr for Transport {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Self::Tcp),
            "udp" => Ok(Self::Udp),
            "rtp" => Ok(Self::Rtp),
            _ => Err(Error::protocol(format!("unknown transport: {s}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// VideoEntry
// ---------------------------------------------------------------------------

/// One materialized video file in the catalog.
///
/// Equality and hashing consider only the `(title, resolution, container)`
/// key; the path is where the bytes happen to live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoEntry {
    /// Human-readable movie name (may contain spaces and hyphens).
    pub title: String,
    /// Named vertical resolution.
    pub resolution: Resolution,
    /// Container format.
    pub container: Container,
    /// Absolute path of the file on disk.
    pub path: PathBuf,
}

impl VideoEntry {
    /// Create an entry.
    pub fn new(
        title: impl Into<String>,
        resolution: Resolution,
        container: Container,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            title: title.into(),
            resolution,
            container,
            path: path.into(),
        }
    }

    /// The identity key `(title, resolution, container)`.
    pub fn key(&self) -> (String, Resolution, Container) {
        (self.title.clone(), self.resolution, self.container)
    }
}

impl PartialEq for VideoEntry {
    fn eq(&self, other: &Self) -> bool {
        self.title == other.title
            && self.resolution == other.resolution
            && self.container == other.container
    }
}

impl Eq for VideoEntry {}

impl std::hash::Hash for VideoEntry {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.title.hash(state);
        self.resolution.hash(state);
        self.container.hash(state);
    }
}

impl fmt::Display for VideoEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}.{}", self.title, self.resolution, self.container)
    }
}
