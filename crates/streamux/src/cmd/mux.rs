use std::io::{self, ErrorKind, Read};

use streamux_frame::{BufferPool, FrameEncoder};

use crate::cmd::{open_input, MuxArgs};
use crate::exit::{frame_error, io_error, CliError, CliResult, SUCCESS, USAGE};

pub fn run(args: MuxArgs) -> CliResult<i32> {
    let config = args.limits.frame_config();
    let chunk_size = args.chunk_size.min(config.payload_limit());
    if chunk_size == 0 {
        return Err(CliError::new(USAGE, "--chunk-size must be greater than zero"));
    }

    let mut encoder =
        FrameEncoder::with_config(io::stdout().lock(), args.tag, BufferPool::new(), config);

    if let Some(message) = &args.message {
        encoder
            .send(message.as_bytes())
            .map_err(|err| frame_error("mux failed", err))?;
        tracing::info!(tag = %args.tag, bytes = message.len(), "message frame written");
        return Ok(SUCCESS);
    }

    let input = open_input(args.file.as_deref())?;
    let (frames, bytes) = pump(input, &mut encoder, chunk_size)?;
    tracing::info!(tag = %args.tag, frames, bytes, "mux complete");

    Ok(SUCCESS)
}

/// Copy `input` into `encoder` one chunk per frame.
fn pump<R: Read, W: io::Write>(
    mut input: R,
    encoder: &mut FrameEncoder<W>,
    chunk_size: usize,
) -> CliResult<(usize, u64)> {
    let mut chunk = vec![0u8; chunk_size];
    let mut frames = 0usize;
    let mut bytes = 0u64;

    loop {
        let n = match input.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(io_error("read failed", err)),
        };
        encoder
            .send(&chunk[..n])
            .map_err(|err| frame_error("mux failed", err))?;
        frames += 1;
        bytes += n as u64;
    }

    Ok((frames, bytes))
}
