//! Tagged stream framing for multiplexing several byte streams over one.
//!
//! Every write is framed with:
//! - A 1-byte stream tag (see [`StreamTag`])
//! - 3 reserved bytes, always zero
//! - A 4-byte big-endian payload length
//!
//! [`FrameEncoder`] produces frames for one tag; [`demux`] splits an
//! interleaved stream back onto a primary and a secondary sink. The
//! [`StreamTag::SystemError`] tag carries an out-of-band error message and
//! ends demultiplexing with [`FrameError::RemoteSignaled`].

pub mod codec;
pub mod demux;
pub mod encoder;
pub mod error;
pub mod pool;
pub mod reader;
pub mod tag;

#[cfg(feature = "async")]
pub mod async_codec;

#[cfg(feature = "async")]
pub use async_codec::{demux_async, demux_async_with_config, StreamCodec};
pub use codec::{
    decode_frame, encode_frame, encode_header, parse_header, Frame, FrameConfig, FrameRef,
    DEFAULT_INITIAL_CAPACITY, HEADER_SIZE, MAX_WIRE_PAYLOAD,
};
pub use demux::{demux, demux_with_config};
pub use encoder::FrameEncoder;
pub use error::{FrameError, Result};
pub use pool::{BufferPool, PoolConfig, PooledBuffer};
pub use reader::FrameReader;
pub use tag::{Route, StreamTag};
