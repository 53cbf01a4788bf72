//! Length-prefixed JSON framing.
//!
//! Frames are a u32 big-endian length followed by a JSON document, carried
//! by `tokio-util`'s [`LengthDelimitedCodec`]. The frame cap bounds what a
//! misbehaving peer can make the server buffer.

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use vc_core::{Error, Result};

/// Upper bound on a single control frame.
const MAX_FRAME_LEN: usize = 64 * 1024;

/// A typed message channel over any byte stream.
pub struct Channel<T> {
    inner: Framed<T, LengthDelimitedCodec>,
}

impl<T: AsyncRead + AsyncWrite + Unpin> Channel<T> {
    /// Wrap a byte stream in the framed codec.
    pub fn new(io: T) -> Self {
        let codec = LengthDelimitedCodec::builder()
            .max_frame_length(MAX_FRAME_LEN)
            .new_codec();
        Self {
            inner: Framed::new(io, codec),
        }
    }

    /// Serialize and send one message.
    pub async fn send<M: Serialize>(&mut self, msg: &M) -> Result<()> {
        let bytes =
            serde_json::to_vec(msg).map_err(|e| Error::protocol(format!("encode error: {e}")))?;
        self.inner.send(Bytes::from(bytes)).await?;
        Ok(())
    }

    /// Receive one message.
    ///
    /// Returns `Ok(None)` on clean end-of-stream. A frame that is not valid
    /// JSON for `M` is [`Error::Protocol`]; the underlying stream is still
    /// usable, so callers can answer `bad_request` and keep reading.
    pub async fn recv<M: DeserializeOwned>(&mut self) -> Result<Option<M>> {
        match self.inner.next().await {
            None => Ok(None),
            Some(Err(e)) => Err(Error::from(e)),
            Some(Ok(frame)) => serde_json::from_slice(&frame)
                .map(Some)
                .map_err(|e| Error::protocol(format!("undecodable frame: {e}"))),
        }
    }

    /// Give back the underlying byte stream.
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}
