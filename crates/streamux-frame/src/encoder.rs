use std::io::{self, ErrorKind, Write};

use bytes::BufMut;

use crate::codec::{check_payload_len, encode_header, FrameConfig, HEADER_SIZE};
use crate::error::{FrameError, Result};
use crate::pool::BufferPool;
use crate::tag::StreamTag;

/// Frames every write for one stream tag onto a destination sink.
///
/// Several encoders with different tags may share a transport; the transport
/// is responsible for serializing their writes.
pub struct FrameEncoder<T> {
    inner: T,
    tag: StreamTag,
    pool: BufferPool,
    config: FrameConfig,
}

impl<T: Write> FrameEncoder<T> {
    /// Create an encoder with its own buffer pool.
    pub fn new(inner: T, tag: StreamTag) -> Self {
        Self::with_pool(inner, tag, BufferPool::new())
    }

    /// Create an encoder drawing scratch buffers from a shared pool.
    pub fn with_pool(inner: T, tag: StreamTag, pool: BufferPool) -> Self {
        Self::with_config(inner, tag, pool, FrameConfig::default())
    }

    /// Create an encoder with explicit configuration.
    pub fn with_config(inner: T, tag: StreamTag, pool: BufferPool, config: FrameConfig) -> Self {
        Self {
            inner,
            tag,
            pool,
            config,
        }
    }

    /// Frame `payload` and write it to the sink.
    ///
    /// Returns the number of payload bytes written. An empty payload writes
    /// nothing and returns 0.
    pub fn send(&mut self, payload: &[u8]) -> Result<usize> {
        if payload.is_empty() {
            return Ok(0);
        }
        check_payload_len(payload.len(), self.config.payload_limit())?;
        let header = encode_header(self.tag, payload.len())?;

        let mut buf = self.pool.acquire();
        buf.reserve(HEADER_SIZE + payload.len());
        buf.put_slice(&header);
        buf.put_slice(payload);

        let written = write_to_sink(&mut self.inner, &buf)?;
        self.flush_sink()?;

        Ok(written.saturating_sub(HEADER_SIZE))
    }

    /// The tag stamped on every frame.
    pub fn tag(&self) -> StreamTag {
        self.tag
    }

    /// The pool scratch buffers come from.
    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    /// Borrow the underlying sink.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying sink.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the encoder and return the inner sink.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current encoder configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    fn flush_sink(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::SinkWriteFailed(err)),
            }
        }
    }
}

impl<T: Write> Write for FrameEncoder<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.send(buf).map_err(Into::into)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_sink().map_err(Into::into)
    }
}

/// Write all of `bytes` to `sink` as one logical write.
///
/// A sink that stops accepting bytes part way through is a [`FrameError::ShortWrite`].
pub(crate) fn write_to_sink<W: Write + ?Sized>(sink: &mut W, bytes: &[u8]) -> Result<usize> {
    let mut offset = 0usize;
    while offset < bytes.len() {
        match sink.write(&bytes[offset..]) {
            Ok(0) => {
                return Err(FrameError::ShortWrite {
                    expected: bytes.len(),
                    written: offset,
                })
            }
            Ok(n) => offset += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(FrameError::SinkWriteFailed(err)),
        }
    }
    Ok(offset)
}
