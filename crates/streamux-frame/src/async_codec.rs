//! Tokio codec and async demultiplexer.
//!
//! [`StreamCodec`] plugs the frame format into `tokio_util::codec`, so
//! `FramedRead`/`FramedWrite` can carry [`Frame`]s. [`demux_async`] is the
//! async counterpart of [`crate::demux`] with identical semantics.

use bytes::BytesMut;
use futures_util::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{Decoder, Encoder, FramedRead};

use crate::codec::{check_payload_len, decode_frame, encode_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::tag::Route;

/// Tokio codec for tagged frames.
#[derive(Debug, Clone)]
pub struct StreamCodec {
    max_payload: usize,
    dropped: usize,
}

impl StreamCodec {
    /// Create a codec with no payload ceiling beyond the wire limit.
    pub fn new() -> Self {
        Self::with_config(&FrameConfig::default())
    }

    /// Create a codec honoring `config.max_payload_size`.
    pub fn with_config(config: &FrameConfig) -> Self {
        Self {
            max_payload: config.payload_limit(),
            dropped: 0,
        }
    }

    /// Bytes discarded because the stream ended inside a frame.
    pub fn dropped_bytes(&self) -> usize {
        self.dropped
    }
}

impl Default for StreamCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for StreamCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        decode_frame(src, self.max_payload)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        if !src.is_empty() {
            tracing::warn!(bytes = src.len(), "stream ended mid-frame; dropping truncated frame");
            self.dropped += src.len();
            src.clear();
        }
        Ok(None)
    }
}

impl Encoder<Frame> for StreamCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<()> {
        if item.payload.is_empty() {
            return Ok(());
        }
        check_payload_len(item.payload.len(), self.max_payload)?;
        encode_frame(item.tag, &item.payload, dst)
    }
}

/// Split an async `source` onto `primary` and `secondary`.
///
/// See [`crate::demux`] for the delivery and termination rules.
pub async fn demux_async<R, P, S>(source: R, primary: P, secondary: S) -> Result<u64>
where
    R: AsyncRead + Unpin,
    P: AsyncWrite + Unpin,
    S: AsyncWrite + Unpin,
{
    demux_async_with_config(source, primary, secondary, &FrameConfig::default()).await
}

/// [`demux_async`] with an explicit buffer size and payload ceiling.
pub async fn demux_async_with_config<R, P, S>(
    source: R,
    mut primary: P,
    mut secondary: S,
    config: &FrameConfig,
) -> Result<u64>
where
    R: AsyncRead + Unpin,
    P: AsyncWrite + Unpin,
    S: AsyncWrite + Unpin,
{
    let mut frames =
        FramedRead::with_capacity(source, StreamCodec::with_config(config), config.initial_capacity);
    let mut delivered = 0u64;

    while let Some(frame) = frames.next().await {
        let frame = frame.map_err(|err| match err {
            FrameError::Io(source) => FrameError::SourceReadFailed(source),
            other => other,
        })?;

        match frame.tag.route() {
            Route::Primary => deliver(&mut primary, &frame.payload).await?,
            Route::Secondary => deliver(&mut secondary, &frame.payload).await?,
            Route::Abort => {
                let message = String::from_utf8_lossy(&frame.payload).into_owned();
                tracing::warn!(%message, delivered, "remote signaled error in stream");
                return Err(FrameError::RemoteSignaled(message));
            }
        }
        delivered += frame.payload.len() as u64;
    }

    tracing::debug!(
        delivered,
        dropped = frames.decoder().dropped_bytes(),
        "source exhausted"
    );
    Ok(delivered)
}

async fn deliver<W: AsyncWrite + Unpin>(sink: &mut W, payload: &[u8]) -> Result<()> {
    if payload.is_empty() {
        return Ok(());
    }
    sink.write_all(payload)
        .await
        .map_err(FrameError::SinkWriteFailed)?;
    sink.flush().await.map_err(FrameError::SinkWriteFailed)
}
