//! Demultiplexing a framed stream onto primary and secondary sinks.

use std::io::{ErrorKind, Read, Write};

use crate::codec::FrameConfig;
use crate::encoder::write_to_sink;
use crate::error::{FrameError, Result};
use crate::reader::FrameReader;
use crate::tag::Route;

/// Split `source` onto `primary` and `secondary` until the source is exhausted.
///
/// Returns the total number of payload bytes delivered. A trailing frame cut
/// short by end of input is dropped, not reported as an error. A
/// system-error frame stops the decode with [`FrameError::RemoteSignaled`].
pub fn demux<R, P, S>(source: R, primary: P, secondary: S) -> Result<u64>
where
    R: Read,
    P: Write,
    S: Write,
{
    demux_with_config(source, primary, secondary, &FrameConfig::default())
}

/// [`demux`] with an explicit arena size and payload ceiling.
pub fn demux_with_config<R, P, S>(
    source: R,
    mut primary: P,
    mut secondary: S,
    config: &FrameConfig,
) -> Result<u64>
where
    R: Read,
    P: Write,
    S: Write,
{
    let mut reader = FrameReader::with_config(source, config.clone());
    let mut delivered = 0u64;

    while let Some(frame) = reader.next_frame()? {
        let sink: &mut dyn Write = match frame.tag.route() {
            Route::Primary => &mut primary,
            Route::Secondary => &mut secondary,
            Route::Abort => {
                let message = frame.payload_lossy();
                tracing::warn!(%message, delivered, "remote signaled error in stream");
                return Err(FrameError::RemoteSignaled(message));
            }
        };

        deliver(sink, frame.payload)?;
        delivered += frame.payload.len() as u64;
        tracing::trace!(tag = %frame.tag, size = frame.payload.len(), "frame delivered");
    }

    tracing::debug!(
        delivered,
        dropped = reader.dropped_bytes(),
        "source exhausted"
    );
    Ok(delivered)
}

fn deliver(sink: &mut dyn Write, payload: &[u8]) -> Result<()> {
    if payload.is_empty() {
        return Ok(());
    }
    write_to_sink(sink, payload)?;
    loop {
        match sink.flush() {
            Ok(()) => return Ok(()),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(FrameError::SinkWriteFailed(err)),
        }
    }
}
