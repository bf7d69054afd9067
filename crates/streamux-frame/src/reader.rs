use std::io::{ErrorKind, Read};

use bytes::BytesMut;

use crate::codec::{
    check_payload_len, frame_len, parse_header, Frame, FrameConfig, FrameRef, HEADER_SIZE,
};
use crate::error::{FrameError, Result};

/// Reads complete frames from any `Read` source.
///
/// Bytes are accumulated in an owned arena with an explicit fill cursor.
/// The arena grows to fit whatever length a header declares, unless
/// [`FrameConfig::max_payload_size`] caps it. Partial reads are handled
/// internally; callers only ever see complete frames.
///
/// End of input before a complete frame is not an error: [`next_frame`]
/// returns `Ok(None)` and the incomplete bytes are counted in
/// [`dropped_bytes`].
///
/// [`next_frame`]: FrameReader::next_frame
/// [`dropped_bytes`]: FrameReader::dropped_bytes
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    filled: usize,
    consumed: usize,
    dropped: usize,
    finished: bool,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        let mut buf = BytesMut::new();
        buf.resize(config.initial_capacity.max(HEADER_SIZE), 0);
        Self {
            inner,
            buf,
            filled: 0,
            consumed: 0,
            dropped: 0,
            finished: false,
            config,
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Ok(None)` once the source is exhausted. The returned payload
    /// borrows the reader's arena and is valid until the next call.
    pub fn next_frame(&mut self) -> Result<Option<FrameRef<'_>>> {
        self.discard_consumed();
        if self.finished {
            return Ok(None);
        }

        if !self.fill_to(HEADER_SIZE)? {
            if self.filled > 0 {
                tracing::debug!(bytes = self.filled, "source ended inside a frame header");
            }
            self.finish();
            return Ok(None);
        }

        let mut header = [0u8; HEADER_SIZE];
        header.copy_from_slice(&self.buf[..HEADER_SIZE]);
        let (tag, payload_len) = parse_header(&header)?;
        check_payload_len(payload_len, self.config.payload_limit())?;

        let frame_end = frame_len(payload_len)?;
        self.ensure_len(frame_end);

        if !self.fill_to(frame_end)? {
            tracing::warn!(
                tag = %tag,
                expected = payload_len,
                received = self.filled - HEADER_SIZE,
                "source ended mid-frame; dropping truncated frame"
            );
            self.finish();
            return Ok(None);
        }

        self.consumed = frame_end;
        Ok(Some(FrameRef {
            tag,
            payload: &self.buf[HEADER_SIZE..frame_end],
        }))
    }

    /// Read the next complete frame into an owned [`Frame`].
    pub fn read_frame(&mut self) -> Result<Option<Frame>> {
        Ok(self.next_frame()?.map(|frame| frame.to_frame()))
    }

    /// Bytes discarded because the source ended inside a frame.
    pub fn dropped_bytes(&self) -> usize {
        self.dropped
    }

    /// Current arena size.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Borrow the underlying source.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying source.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner source.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update maximum payload size for subsequent frames.
    pub fn set_max_payload_size(&mut self, max_payload_size: Option<usize>) {
        self.config.max_payload_size = max_payload_size;
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    /// Read until at least `target` bytes are buffered. Returns false on end of input.
    fn fill_to(&mut self, target: usize) -> Result<bool> {
        while self.filled < target {
            match self.inner.read(&mut self.buf[self.filled..]) {
                Ok(0) => return Ok(false),
                Ok(n) => self.filled += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::SourceReadFailed(err)),
            }
        }
        Ok(true)
    }

    fn ensure_len(&mut self, needed: usize) {
        if self.buf.len() < needed {
            tracing::debug!(from = self.buf.len(), to = needed, "growing frame buffer");
            self.buf.resize(needed, 0);
        }
    }

    // Slide bytes after the last yielded frame to the front of the arena.
    fn discard_consumed(&mut self) {
        if self.consumed == 0 {
            return;
        }
        self.buf.copy_within(self.consumed..self.filled, 0);
        self.filled -= self.consumed;
        self.consumed = 0;
    }

    fn finish(&mut self) {
        self.dropped += self.filled;
        self.filled = 0;
        self.finished = true;
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::{BufMut, BytesMut};

    use super::*;
    use crate::codec::{encode_frame, encode_header};
    use crate::tag::StreamTag;

    fn wire(frames: &[(StreamTag, &[u8])]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for (tag, payload) in frames {
            encode_frame(*tag, payload, &mut buf).unwrap();
        }
        buf.to_vec()
    }

    #[test]
    fn read_single_frame() {
        let mut reader = FrameReader::new(Cursor::new(wire(&[(StreamTag::Primary, b"hello")])));
        let frame = reader.next_frame().unwrap().unwrap();

        assert_eq!(frame.tag, StreamTag::Primary);
        assert_eq!(frame.payload, b"hello");
        assert!(reader.next_frame().unwrap().is_none());
        assert_eq!(reader.dropped_bytes(), 0);
    }

    #[test]
    fn read_multiple_frames() {
        let bytes = wire(&[
            (StreamTag::Primary, b"one"),
            (StreamTag::Secondary, b"two"),
            (StreamTag::Input, b"three"),
        ]);
        let mut reader = FrameReader::new(Cursor::new(bytes));

        let f1 = reader.read_frame().unwrap().unwrap();
        let f2 = reader.read_frame().unwrap().unwrap();
        let f3 = reader.read_frame().unwrap().unwrap();

        assert_eq!((f1.tag, f1.payload.as_ref()), (StreamTag::Primary, b"one".as_ref()));
        assert_eq!((f2.tag, f2.payload.as_ref()), (StreamTag::Secondary, b"two".as_ref()));
        assert_eq!((f3.tag, f3.payload.as_ref()), (StreamTag::Input, b"three".as_ref()));
        assert!(reader.read_frame().unwrap().is_none());
    }

    #[test]
    fn partial_read_handling() {
        let byte_reader = ByteByByteReader {
            bytes: wire(&[(StreamTag::Secondary, b"slow"), (StreamTag::Primary, b"")]),
            pos: 0,
        };
        let mut reader = FrameReader::new(byte_reader);

        let frame = reader.read_frame().unwrap().unwrap();
        assert_eq!(frame.tag, StreamTag::Secondary);
        assert_eq!(frame.payload.as_ref(), b"slow");

        let empty = reader.read_frame().unwrap().unwrap();
        assert!(empty.payload.is_empty());
        assert!(reader.read_frame().unwrap().is_none());
    }

    #[test]
    fn empty_source_is_clean_end() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        assert!(reader.next_frame().unwrap().is_none());
        assert_eq!(reader.dropped_bytes(), 0);
    }

    #[test]
    fn partial_header_is_clean_end() {
        let mut reader = FrameReader::new(Cursor::new(vec![0x01, 0x00, 0x00]));
        assert!(reader.next_frame().unwrap().is_none());
        assert_eq!(reader.dropped_bytes(), 3);
    }

    #[test]
    fn truncated_payload_is_dropped() {
        let mut partial = BytesMut::new();
        partial.put_slice(&encode_header(StreamTag::Secondary, 16).unwrap());
        partial.put_slice(b"only-part");

        let mut reader = FrameReader::new(Cursor::new(partial.to_vec()));
        assert!(reader.next_frame().unwrap().is_none());
        assert_eq!(reader.dropped_bytes(), HEADER_SIZE + 9);
        assert!(reader.next_frame().unwrap().is_none());
    }

    #[test]
    fn unknown_tag_in_stream() {
        let bytes = vec![99, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0xFF];
        let mut reader = FrameReader::new(Cursor::new(bytes));
        let err = reader.next_frame().unwrap_err();
        assert!(matches!(err, FrameError::UnknownStreamTag(99)));
    }

    #[test]
    fn oversized_frame_in_stream() {
        let mut bytes = BytesMut::new();
        bytes.put_slice(&encode_header(StreamTag::Primary, 1024).unwrap());

        let cfg = FrameConfig {
            max_payload_size: Some(16),
            ..FrameConfig::default()
        };
        let mut reader = FrameReader::with_config(Cursor::new(bytes.to_vec()), cfg);
        let err = reader.next_frame().unwrap_err();
        assert!(matches!(err, FrameError::FrameTooLarge { size: 1024, max: 16 }));
    }

    #[test]
    fn arena_grows_for_large_frame() {
        let payload = vec![0xAB; 1024 * 1024];
        let cfg = FrameConfig {
            initial_capacity: 64,
            ..FrameConfig::default()
        };
        let bytes = wire(&[(StreamTag::Primary, payload.as_slice())]);
        let mut reader = FrameReader::with_config(Cursor::new(bytes), cfg);
        assert_eq!(reader.capacity(), 64);

        let frame = reader.next_frame().unwrap().unwrap();
        assert_eq!(frame.payload.len(), payload.len());
        assert!(frame.payload == payload.as_slice());
        assert!(reader.capacity() >= HEADER_SIZE + payload.len());
    }

    #[test]
    fn tiny_initial_capacity_still_holds_a_header() {
        let cfg = FrameConfig {
            initial_capacity: 1,
            ..FrameConfig::default()
        };
        let mut reader =
            FrameReader::with_config(Cursor::new(wire(&[(StreamTag::Primary, b"ok")])), cfg);
        let frame = reader.read_frame().unwrap().unwrap();
        assert_eq!(frame.payload.as_ref(), b"ok");
    }

    #[test]
    fn read_error_is_fatal() {
        let reader = WouldBlockThenData {
            state: 0,
            bytes: wire(&[(StreamTag::Primary, b"ok")]),
            pos: 0,
        };
        let mut framed = FrameReader::new(reader);
        let err = framed.next_frame().unwrap_err();
        assert!(
            matches!(err, FrameError::SourceReadFailed(e) if e.kind() == ErrorKind::WouldBlock)
        );
    }

    #[test]
    fn interrupted_read_retries() {
        let reader = InterruptedThenData {
            state: 0,
            bytes: wire(&[(StreamTag::Secondary, b"ok")]),
            pos: 0,
        };
        let mut framed = FrameReader::new(reader);
        let frame = framed.read_frame().unwrap().unwrap();

        assert_eq!(frame.tag, StreamTag::Secondary);
        assert_eq!(frame.payload.as_ref(), b"ok");
    }

    #[test]
    fn accessors_and_into_inner() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));

        reader.set_max_payload_size(Some(8));
        assert_eq!(reader.config().max_payload_size, Some(8));
        let _ = reader.get_ref();
        let _ = reader.get_mut();
        let _inner = reader.into_inner();
    }

    #[test]
    #[cfg(unix)]
    fn roundtrip_over_socket_pair() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let writer = std::thread::spawn(move || {
            let out = left.try_clone().unwrap();
            let mut primary = crate::encoder::FrameEncoder::new(left, StreamTag::Primary);
            let mut secondary = crate::encoder::FrameEncoder::new(out, StreamTag::Secondary);
            for i in 0..32 {
                primary.send(format!("out-{i}").as_bytes()).unwrap();
                secondary.send(format!("err-{i}").as_bytes()).unwrap();
            }
        });

        let mut reader = FrameReader::new(right);
        for i in 0..32 {
            let out = reader.read_frame().unwrap().unwrap();
            assert_eq!(out.tag, StreamTag::Primary);
            assert_eq!(out.payload.as_ref(), format!("out-{i}").as_bytes());
            let err = reader.read_frame().unwrap().unwrap();
            assert_eq!(err.tag, StreamTag::Secondary);
            assert_eq!(err.payload.as_ref(), format!("err-{i}").as_bytes());
        }

        writer.join().unwrap();
        assert!(reader.read_frame().unwrap().is_none());
    }

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }

            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct WouldBlockThenData {
        state: u8,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for WouldBlockThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.state == 0 {
                self.state = 1;
                return Err(std::io::Error::from(ErrorKind::WouldBlock));
            }
            let n = (self.bytes.len() - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    struct InterruptedThenData {
        state: u8,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.state == 0 {
                self.state = 1;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            let n = (self.bytes.len() - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }
}
