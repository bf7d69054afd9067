use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::tag::StreamTag;

/// Frame header: tag (1) + reserved (3) + length (4) = 8 bytes.
pub const HEADER_SIZE: usize = 8;

/// Offset of the big-endian length field in the header.
pub const LENGTH_OFFSET: usize = 4;

/// Largest payload the 32-bit length field can describe, bounded so that
/// header plus payload still fits in `usize` on 32-bit targets.
pub const MAX_WIRE_PAYLOAD: usize = if u32::MAX as usize > usize::MAX - HEADER_SIZE {
    usize::MAX - HEADER_SIZE
} else {
    u32::MAX as usize
};

/// Default accumulation arena: one 32 KiB chunk plus a header, with one spare byte.
pub const DEFAULT_INITIAL_CAPACITY: usize = 32 * 1024 + HEADER_SIZE + 1;

/// An owned frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The stream this payload belongs to.
    pub tag: StreamTag,
    /// The frame payload.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(tag: StreamTag, payload: impl Into<Bytes>) -> Self {
        Self {
            tag,
            payload: payload.into(),
        }
    }

    /// The total wire size of this frame (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    /// Borrow this frame.
    pub fn as_frame_ref(&self) -> FrameRef<'_> {
        FrameRef {
            tag: self.tag,
            payload: self.payload.as_ref(),
        }
    }
}

/// A frame whose payload borrows from a reader's buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRef<'a> {
    pub tag: StreamTag,
    pub payload: &'a [u8],
}

impl FrameRef<'_> {
    /// Copy the payload out into an owned frame.
    pub fn to_frame(&self) -> Frame {
        Frame::new(self.tag, Bytes::copy_from_slice(self.payload))
    }

    /// The payload as text, replacing invalid UTF-8.
    pub fn payload_lossy(&self) -> String {
        String::from_utf8_lossy(self.payload).into_owned()
    }
}

/// Build the 8-byte header for a payload of `len` bytes.
///
/// Wire format:
/// ```text
/// ┌──────────┬────────────────┬─────────────┬────────────────┐
/// │ Tag (1B) │ Reserved (3B)  │ Length      │ Payload        │
/// │ 0..=3    │ 0x00 0x00 0x00 │ (4B BE)     │ (Length bytes) │
/// └──────────┴────────────────┴─────────────┴────────────────┘
/// ```
pub fn encode_header(tag: StreamTag, len: usize) -> Result<[u8; HEADER_SIZE]> {
    check_payload_len(len, MAX_WIRE_PAYLOAD)?;
    let len = u32::try_from(len).map_err(|_| FrameError::FrameTooLarge {
        size: len,
        max: MAX_WIRE_PAYLOAD,
    })?;
    let mut header = [0u8; HEADER_SIZE];
    header[0] = tag.as_byte();
    header[LENGTH_OFFSET..].copy_from_slice(&len.to_be_bytes());
    Ok(header)
}

/// Parse a header into its tag and payload length.
///
/// Reserved bytes are ignored.
pub fn parse_header(header: &[u8; HEADER_SIZE]) -> Result<(StreamTag, usize)> {
    let tag = StreamTag::try_from(header[0])?;
    let len = u32::from_be_bytes([header[4], header[5], header[6], header[7]]) as usize;
    Ok((tag, len))
}

/// Encode a frame into the wire format.
pub fn encode_frame(tag: StreamTag, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let header = encode_header(tag, payload.len())?;
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_slice(&header);
    dst.put_slice(payload);
    Ok(())
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Frame>> {
    if src.len() < HEADER_SIZE {
        return Ok(None);
    }

    let mut header = [0u8; HEADER_SIZE];
    header.copy_from_slice(&src[..HEADER_SIZE]);
    let (tag, payload_len) = parse_header(&header)?;
    check_payload_len(payload_len, max_payload)?;

    let total = frame_len(payload_len)?;
    if src.len() < total {
        src.reserve(total - src.len());
        return Ok(None);
    }

    src.advance(HEADER_SIZE);
    let payload = src.split_to(payload_len).freeze();

    Ok(Some(Frame { tag, payload }))
}

/// Header plus payload size, or `FrameTooLarge` if it does not fit in `usize`.
pub(crate) fn frame_len(payload_len: usize) -> Result<usize> {
    HEADER_SIZE
        .checked_add(payload_len)
        .ok_or(FrameError::FrameTooLarge {
            size: payload_len,
            max: MAX_WIRE_PAYLOAD,
        })
}

pub(crate) fn check_payload_len(len: usize, max: usize) -> Result<()> {
    if len > max {
        return Err(FrameError::FrameTooLarge { size: len, max });
    }
    Ok(())
}

/// Configuration shared by the encoder and the demultiplexer.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Starting size of the demultiplexer's accumulation arena.
    pub initial_capacity: usize,
    /// Optional payload ceiling. `None` lets the arena grow to any declared length.
    pub max_payload_size: Option<usize>,
}

impl FrameConfig {
    /// Effective payload ceiling.
    pub fn payload_limit(&self) -> usize {
        self.max_payload_size
            .map_or(MAX_WIRE_PAYLOAD, |max| max.min(MAX_WIRE_PAYLOAD))
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            max_payload_size: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout_is_big_endian_with_zeroed_reserved_bytes() {
        let header = encode_header(StreamTag::Secondary, 0x0102_0304).unwrap();
        assert_eq!(header, [2, 0, 0, 0, 0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn parse_ignores_reserved_bytes() {
        let header = [1, 0xAA, 0xBB, 0xCC, 0, 0, 0, 5];
        let (tag, len) = parse_header(&header).unwrap();
        assert_eq!(tag, StreamTag::Primary);
        assert_eq!(len, 5);
    }

    #[test]
    fn parse_rejects_unknown_tag() {
        let header = [99, 0, 0, 0, 0, 0, 0, 1];
        let err = parse_header(&header).unwrap_err();
        assert!(matches!(err, FrameError::UnknownStreamTag(99)));
    }

    #[test]
    fn encodes_known_wire_bytes() {
        let mut buf = BytesMut::new();
        encode_frame(StreamTag::Primary, b"hello", &mut buf).unwrap();
        encode_frame(StreamTag::Secondary, b"oops", &mut buf).unwrap();

        assert_eq!(
            buf.as_ref(),
            &[
                0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x05, 0x68, 0x65, 0x6C, 0x6C, 0x6F,
                0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x04, 0x6F, 0x6F, 0x70, 0x73,
            ][..]
        );
    }

    #[test]
    fn decode_incomplete_header() {
        let mut buf = BytesMut::from(&[0x01, 0x00, 0x00][..]);
        let result = decode_frame(&mut buf, MAX_WIRE_PAYLOAD).unwrap();
        assert!(result.is_none());
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn decode_incomplete_payload() {
        let mut buf = BytesMut::new();
        encode_frame(StreamTag::Primary, b"hello", &mut buf).unwrap();
        buf.truncate(HEADER_SIZE + 2);

        let result = decode_frame(&mut buf, MAX_WIRE_PAYLOAD).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn decode_multiple_frames() {
        let mut buf = BytesMut::new();
        encode_frame(StreamTag::Primary, b"first", &mut buf).unwrap();
        encode_frame(StreamTag::SystemError, b"second", &mut buf).unwrap();

        let f1 = decode_frame(&mut buf, MAX_WIRE_PAYLOAD).unwrap().unwrap();
        assert_eq!(f1.tag, StreamTag::Primary);
        assert_eq!(f1.payload.as_ref(), b"first");

        let f2 = decode_frame(&mut buf, MAX_WIRE_PAYLOAD).unwrap().unwrap();
        assert_eq!(f2.tag, StreamTag::SystemError);
        assert_eq!(f2.payload.as_ref(), b"second");

        assert!(buf.is_empty());
    }

    #[test]
    fn decode_payload_over_limit() {
        let mut buf = BytesMut::new();
        buf.put_slice(&encode_header(StreamTag::Primary, 1024).unwrap());

        let result = decode_frame(&mut buf, 16);
        assert!(matches!(
            result,
            Err(FrameError::FrameTooLarge { size: 1024, max: 16 })
        ));
    }

    #[test]
    fn empty_payload_frame() {
        let mut buf = BytesMut::new();
        encode_frame(StreamTag::Input, b"", &mut buf).unwrap();

        let frame = decode_frame(&mut buf, MAX_WIRE_PAYLOAD).unwrap().unwrap();
        assert_eq!(frame.tag, StreamTag::Input);
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn frame_wire_size() {
        let frame = Frame::new(StreamTag::Primary, Bytes::from_static(b"test"));
        assert_eq!(frame.wire_size(), HEADER_SIZE + 4);
        assert_eq!(frame.as_frame_ref().to_frame(), frame);
    }

    #[test]
    fn payload_limit_is_capped_by_wire_format() {
        assert_eq!(FrameConfig::default().payload_limit(), MAX_WIRE_PAYLOAD);
        let cfg = FrameConfig {
            max_payload_size: Some(64),
            ..FrameConfig::default()
        };
        assert_eq!(cfg.payload_limit(), 64);
    }

    #[test]
    fn frame_len_never_overflows() {
        assert_eq!(frame_len(5).unwrap(), 13);
        assert_eq!(frame_len(MAX_WIRE_PAYLOAD).unwrap(), HEADER_SIZE + MAX_WIRE_PAYLOAD);
        assert!(matches!(
            frame_len(usize::MAX),
            Err(FrameError::FrameTooLarge { size: usize::MAX, .. })
        ));
        assert!(FrameConfig::default()
            .payload_limit()
            .checked_add(HEADER_SIZE)
            .is_some());
    }
}
