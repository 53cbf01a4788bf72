mod cli;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use cli::{Cli, Commands};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use vc_av::ToolRegistry;
use vc_client::player::Selection;
use vc_client::ControlClient;
use vc_core::config::Config;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing. Respect RUST_LOG env var; otherwise use defaults
    // based on the verbose flag.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "vidcast=trace,vc_server=trace,vc_client=trace,vc_core=debug,vc_library=debug,vc_transcode=debug,vc_av=debug".to_string()
        } else {
            "vidcast=debug,vc_server=info,vc_client=info,vc_transcode=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&env_filter))
        .init();

    match cli.command {
        Commands::Serve {
            host,
            port,
            video_dir,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(serve(cli.config.as_deref(), host, port, video_dir))
        }
        Commands::List {
            server,
            container,
            bandwidth,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(list(&server, container.as_deref(), bandwidth))
        }
        Commands::Play {
            server,
            title,
            resolution,
            container,
            transport,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(play(
                cli.config.as_deref(),
                &server,
                title,
                &resolution,
                &container,
                transport.as_deref(),
            ))
        }
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("vidcast {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn serve(
    config_path: Option<&Path>,
    host: Option<String>,
    port: Option<u16>,
    video_dir: Option<std::path::PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load_or_default(config_path);

    // CLI flags override both the file and the environment.
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.control_port = port;
    }
    if let Some(dir) = video_dir {
        config.library.video_dir = dir;
    }

    tracing::info!(
        "Starting vidcast server on {}:{} serving {}",
        config.server.host,
        config.server.control_port,
        config.library.video_dir.display()
    );

    vc_server::start(config).await?;
    Ok(())
}

async fn list(
    server: &str,
    container: Option<&str>,
    bandwidth: f64,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut client = ControlClient::connect(server, &client_hostname()).await?;

    match container {
        None => {
            let containers = client.list_containers().await?;
            println!("Containers offered by {server}:");
            for container in containers {
                println!("  {container}");
            }
        }
        Some(container) => {
            let container = container.parse()?;
            let videos = client.list_videos(container, bandwidth).await?;
            if videos.is_empty() {
                println!("No {container} videos fit under {bandwidth} Mbps");
            } else {
                println!("{container} videos under {bandwidth} Mbps:");
                for video in videos {
                    println!("  {}-{}.{}", video.title, video.resolution, video.container);
                }
            }
        }
    }

    client.disconnect().await?;
    Ok(())
}

async fn play(
    config_path: Option<&Path>,
    server: &str,
    title: String,
    resolution: &str,
    container: &str,
    transport: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default(config_path);
    let tools = Arc::new(ToolRegistry::discover(&config.tools));
    tools.require("ffplay")?;

    let selection = Selection {
        title,
        resolution: resolution.parse()?,
        container: container.parse()?,
        transport: transport.map(str::parse).transpose()?,
    };

    let mut client = ControlClient::connect(server, &client_hostname()).await?;

    // Ctrl+C tears the player down instead of orphaning it.
    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_on_signal.cancel();
        }
    });

    let result = vc_client::play_stream(&mut client, &tools, &selection, &cancel).await;
    let disconnect = client.disconnect().await;

    result?;
    disconnect?;
    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default(config_path);
    let registry = ToolRegistry::discover(&config.tools);
    let tools = registry.check_all();

    println!("Checking external tools...\n");

    let mut all_ok = true;
    for tool in &tools {
        let status = if tool.available {
            "OK"
        } else {
            all_ok = false;
            "MISSING"
        };

        print!("[{:>7}] {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({version})");
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. The server needs ffmpeg; the client needs ffplay.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            println!("Validating config: {}", p.display());
            let contents = std::fs::read_to_string(p)?;
            let config = Config::from_json(&contents)?;

            let warnings = config.validate();
            if warnings.is_empty() {
                println!("Configuration is valid");
            } else {
                for w in &warnings {
                    println!("  Warning: {w}");
                }
            }

            println!(
                "  Control: {}:{}",
                config.server.host, config.server.control_port
            );
            println!(
                "  Streams: tcp {} / udp {} / rtp {}",
                config.server.tcp_stream_port,
                config.server.udp_stream_port,
                config.server.rtp_stream_port
            );
            println!("  Video dir: {}", config.library.video_dir.display());
            println!("  Transcode parallelism: {}", config.transcode.parallelism);
        }
        None => {
            println!("No config file specified, using defaults");
            let config = Config::default();
            println!("Default config:");
            println!(
                "  Control: {}:{}",
                config.server.host, config.server.control_port
            );
            println!("  Video dir: {}", config.library.video_dir.display());
        }
    }

    Ok(())
}

fn client_hostname() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "vidcast-client".into())
}
