//! vc-protocol: the control-channel wire format.
//!
//! Requests and replies are tagged sum types serialized as JSON inside
//! length-prefixed frames. Both sides of the connection share this crate,
//! so the protocol cannot drift between server and client.

pub mod framing;
pub mod message;

pub use framing::Channel;
pub use message::{Request, Response, VideoItem};
