//! Receiver orchestration: request the stream, launch the player, reap it.

use tokio_util::sync::CancellationToken;

use vc_av::{ToolCommand, ToolRegistry};
use vc_core::{Container, Resolution, Result, Transport};

use crate::control::ControlClient;
use crate::transport::{auto_transport, pick_listen_port, player_args, player_url};

/// One playback selection.
#[derive(Debug, Clone)]
pub struct Selection {
    pub title: String,
    pub resolution: Resolution,
    pub container: Container,
    /// `None` selects the transport from the resolution.
    pub transport: Option<Transport>,
}

/// Start the selected stream and play it to completion.
///
/// Resolves the transport (explicit or automatic), allocates the local
/// datagram port where one is needed, asks the server for the stream, and
/// runs the external player against the resulting URL. Returns when the
/// player exits; a non-zero exit propagates as an error.
pub async fn play_stream(
    client: &mut ControlClient,
    tools: &ToolRegistry,
    selection: &Selection,
    cancel: &CancellationToken,
) -> Result<()> {
    let transport = selection
        .transport
        .unwrap_or_else(|| auto_transport(selection.resolution));

    let listen_port = match transport {
        Transport::Tcp => None,
        Transport::Udp | Transport::Rtp => Some(pick_listen_port()),
    };

    let endpoint = client
        .start_stream(
            &selection.title,
            selection.resolution,
            selection.container,
            transport,
            listen_port,
        )
        .await?;

    let url = player_url(&endpoint, transport, listen_port);
    tracing::info!(transport = %transport, url = %url, "Launching player");

    let ffplay = tools.require("ffplay")?;
    ToolCommand::new(ffplay)
        .args(player_args(&url, transport))
        .execute(cancel)
        .await?;

    Ok(())
}
