//! vc-client: the streaming client.
//!
//! Wraps the control protocol in typed calls, picks a transport for the
//! selected entry when the user does not, and launches the external player
//! against the advertised endpoint.

pub mod control;
pub mod player;
pub mod transport;

pub use control::ControlClient;
pub use player::play_stream;
pub use transport::auto_transport;
