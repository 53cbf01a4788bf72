use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vidcast")]
#[command(author, version, about = "Bandwidth-adaptive video streaming server and client")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the catalog/streaming server
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Control channel port
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory of source video files
        #[arg(long)]
        video_dir: Option<PathBuf>,
    },

    /// List containers or videos offered by a server
    List {
        /// Server control address
        #[arg(long, default_value = "127.0.0.1:8080")]
        server: String,

        /// Container to list videos for; omit to list containers
        #[arg(long)]
        container: Option<String>,

        /// Measured downlink in Mbps
        #[arg(long, default_value_t = 5.0)]
        bandwidth: f64,
    },

    /// Stream one video and play it
    Play {
        /// Server control address
        #[arg(long, default_value = "127.0.0.1:8080")]
        server: String,

        /// Video title
        #[arg(required = true)]
        title: String,

        /// Resolution (240p..1080p)
        #[arg(long)]
        resolution: String,

        /// Container (mp4, mkv, avi)
        #[arg(long)]
        container: String,

        /// Transport (tcp, udp, rtp); picked from the resolution if omitted
        #[arg(long)]
        transport: Option<String>,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
