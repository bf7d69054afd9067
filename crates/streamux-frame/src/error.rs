use std::io;

/// Errors that can occur while framing or demultiplexing streams.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The destination sink rejected a write.
    #[error("sink write failed: {0}")]
    SinkWriteFailed(#[source] io::Error),

    /// The source failed for a reason other than end-of-input.
    #[error("source read failed: {0}")]
    SourceReadFailed(#[source] io::Error),

    /// The frame header carries a tag outside the known set.
    ///
    /// Frame boundaries cannot be trusted after this, so it is never recovered.
    #[error("unrecognized stream tag: {0}")]
    UnknownStreamTag(u8),

    /// A sink accepted fewer bytes than the frame required.
    #[error("short write ({written} of {expected} bytes)")]
    ShortWrite { expected: usize, written: usize },

    /// The producer embedded an error message on the system-error stream.
    #[error("error from remote in stream: {0}")]
    RemoteSignaled(String),

    /// The declared payload length exceeds the allowed maximum.
    #[error("frame too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// Transport I/O error surfaced through the tokio codec.
    #[error("frame I/O error: {0}")]
    Io(#[from] io::Error),
}

impl FrameError {
    /// Returns true for errors caused by the stream contents rather than local I/O.
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            FrameError::UnknownStreamTag(_) | FrameError::FrameTooLarge { .. }
        )
    }
}

impl From<FrameError> for io::Error {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::SinkWriteFailed(source)
            | FrameError::SourceReadFailed(source)
            | FrameError::Io(source) => source,
            FrameError::ShortWrite { .. } => io::Error::new(io::ErrorKind::WriteZero, err),
            FrameError::UnknownStreamTag(_) | FrameError::FrameTooLarge { .. } => {
                io::Error::new(io::ErrorKind::InvalidData, err)
            }
            FrameError::RemoteSignaled(_) => io::Error::other(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
