//! Stream tags carried in byte 0 of every frame header.
//!
//! Tags 0-3 are the only values on the wire. Anything else is a protocol
//! violation and surfaces as [`FrameError::UnknownStreamTag`].

use std::fmt;
use std::str::FromStr;

use crate::error::FrameError;

/// The logical stream a frame belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StreamTag {
    /// Echoed input. Delivered to the primary sink.
    Input = 0,
    /// Primary output stream.
    Primary = 1,
    /// Secondary output stream.
    Secondary = 2,
    /// Out-of-band error message from the producer. Never delivered.
    SystemError = 3,
}

/// Where the demultiplexer sends a frame's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Primary,
    Secondary,
    /// Stop and report the payload as a remote error.
    Abort,
}

impl StreamTag {
    /// All tags in wire order.
    pub const ALL: [StreamTag; 4] = [
        StreamTag::Input,
        StreamTag::Primary,
        StreamTag::Secondary,
        StreamTag::SystemError,
    ];

    /// Wire byte for this tag.
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Sink this tag's payload is routed to.
    pub fn route(self) -> Route {
        match self {
            StreamTag::Input | StreamTag::Primary => Route::Primary,
            StreamTag::Secondary => Route::Secondary,
            StreamTag::SystemError => Route::Abort,
        }
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            StreamTag::Input => "input",
            StreamTag::Primary => "primary",
            StreamTag::Secondary => "secondary",
            StreamTag::SystemError => "system-error",
        }
    }
}

impl TryFrom<u8> for StreamTag {
    type Error = FrameError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0 => Ok(StreamTag::Input),
            1 => Ok(StreamTag::Primary),
            2 => Ok(StreamTag::Secondary),
            3 => Ok(StreamTag::SystemError),
            other => Err(FrameError::UnknownStreamTag(other)),
        }
    }
}

impl From<StreamTag> for u8 {
    fn from(tag: StreamTag) -> Self {
        tag.as_byte()
    }
}

impl fmt::Display for StreamTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StreamTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "input" | "stdin" | "0" => Ok(StreamTag::Input),
            "primary" | "stdout" | "1" => Ok(StreamTag::Primary),
            "secondary" | "stderr" | "2" => Ok(StreamTag::Secondary),
            "system-error" | "systemerr" | "3" => Ok(StreamTag::SystemError),
            other => Err(format!("unknown stream tag: {other}")),
        }
    }
}
