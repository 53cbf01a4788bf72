//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries the
//! server, library, transcode, and tools sections. Every section defaults
//! sensibly so a completely empty `{}` file is valid. After file load,
//! well-known environment variables override individual fields, and CLI
//! flags override both.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub library: LibraryConfig,
    pub transcode: TranscodeConfig,
    pub tools: ToolsConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str).map_err(|e| Error::Config(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist. Environment overrides are
    /// applied in all cases.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let mut config = match path {
            None => Self::default(),
            Some(path) => match std::fs::read_to_string(path) {
                Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                    tracing::warn!("Failed to parse config file {}: {e}", path.display());
                    Self::default()
                }),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::info!("No config file at {}; using defaults", path.display());
                    Self::default()
                }
                Err(e) => {
                    tracing::warn!("Failed to read config file {}: {e}", path.display());
                    Self::default()
                }
            },
        };
        config.apply_env();
        config
    }

    /// Apply well-known environment variable overrides.
    pub fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var("VIDEO_DIR") {
            self.library.video_dir = PathBuf::from(dir);
        }
        if let Some(port) = env_port("CONTROL_PORT") {
            self.server.control_port = port;
        }
        if let Some(port) = env_port("TCP_STREAM_PORT") {
            self.server.tcp_stream_port = port;
        }
        if let Some(port) = env_port("UDP_STREAM_PORT") {
            self.server.udp_stream_port = port;
        }
        if let Some(port) = env_port("RTP_STREAM_PORT") {
            self.server.rtp_stream_port = port;
        }
        if let Ok(n) = std::env::var("TRANSCODE_PARALLELISM") {
            match n.parse::<usize>() {
                Ok(n) if n > 0 => self.transcode.parallelism = n,
                _ => tracing::warn!("Ignoring invalid TRANSCODE_PARALLELISM: {n}"),
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let ports = [
            self.server.control_port,
            self.server.tcp_stream_port,
            self.server.udp_stream_port,
            self.server.rtp_stream_port,
        ];
        for (i, a) in ports.iter().enumerate() {
            if *a == 0 {
                warnings.push("a server port is 0; a random port will be assigned".into());
            }
            // TCP control and TCP stream must not collide; the UDP ports are a
            // different address family and only collide with each other.
            for b in &ports[i + 1..] {
                if *a != 0 && a == b {
                    warnings.push(format!("port {a} is configured for more than one listener"));
                }
            }
        }

        if self.transcode.parallelism == 0 {
            warnings.push("transcode.parallelism is 0; no transcode jobs will run".into());
        }

        if !self.library.video_dir.as_os_str().is_empty() && !self.library.video_dir.exists() {
            warnings.push(format!(
                "library.video_dir {} does not exist",
                self.library.video_dir.display()
            ));
        }

        warnings
    }
}

fn env_port(var: &str) -> Option<u16> {
    let raw = std::env::var(var).ok()?;
    match raw.parse::<u16>() {
        Ok(p) => Some(p),
        Err(_) => {
            tracing::warn!("Ignoring invalid {var}: {raw}");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Control and streaming listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub control_port: u16,
    pub tcp_stream_port: u16,
    pub udp_stream_port: u16,
    pub rtp_stream_port: u16,
    /// Seconds of control-channel silence before a session is considered dead.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            control_port: 8080,
            tcp_stream_port: 8081,
            udp_stream_port: 8082,
            rtp_stream_port: 8083,
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

fn default_idle_timeout() -> u64 {
    30
}

/// Media library settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Directory holding the source and transcoded video files.
    pub video_dir: PathBuf,
    /// Interval between automatic rescan + verify passes (0 disables them).
    pub rescan_interval_secs: u64,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            video_dir: PathBuf::from("./videos"),
            rescan_interval_secs: 0,
        }
    }
}

/// Transcoder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscodeConfig {
    /// Maximum number of concurrent transcoder child processes.
    pub parallelism: usize,
    #[serde(default = "default_video_crf")]
    pub video_crf: u32,
    #[serde(default = "default_video_preset")]
    pub video_preset: String,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            parallelism: 2,
            video_crf: default_video_crf(),
            video_preset: default_video_preset(),
        }
    }
}

fn default_video_crf() -> u32 {
    23
}
fn default_video_preset() -> String {
    "medium".into()
}

/// Paths to external CLI tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffplay_path: Option<PathBuf>,
}
