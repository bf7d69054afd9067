use std::io;

use streamux_frame::{FrameReader, HEADER_SIZE};

use crate::cmd::{open_input, InspectArgs};
use crate::exit::{frame_error, io_error, CliResult, SUCCESS};
use crate::output::{FrameListing, OutputFormat};

pub fn run(args: InspectArgs, format: OutputFormat) -> CliResult<i32> {
    let input = open_input(args.file.as_deref())?;
    let mut reader = FrameReader::with_config(input, args.limits.frame_config());
    let mut listing = FrameListing::new(format, io::stdout().lock());

    let mut index = 0usize;
    let mut offset = 0u64;
    while let Some(frame) = reader
        .next_frame()
        .map_err(|err| frame_error("inspect failed", err))?
    {
        listing
            .push(index, offset, &frame)
            .map_err(|err| io_error("write failed", err))?;
        index += 1;
        offset += (HEADER_SIZE + frame.payload.len()) as u64;
    }
    listing
        .finish()
        .map_err(|err| io_error("write failed", err))?;

    if reader.dropped_bytes() > 0 {
        tracing::warn!(
            dropped = reader.dropped_bytes(),
            offset,
            "stream ends with an incomplete frame"
        );
    }
    tracing::info!(frames = index, "inspect complete");

    Ok(SUCCESS)
}
