use std::io;

use streamux_frame::demux_with_config;

use crate::cmd::{open_input, open_output, DemuxArgs};
use crate::exit::{frame_error, CliResult, SUCCESS};

pub fn run(args: DemuxArgs) -> CliResult<i32> {
    let config = args.limits.frame_config();
    let input = open_input(args.file.as_deref())?;
    let primary = open_output(args.primary_out.as_deref(), || Box::new(io::stdout()))?;
    let secondary = open_output(args.secondary_out.as_deref(), || Box::new(io::stderr()))?;

    let delivered = demux_with_config(input, primary, secondary, &config)
        .map_err(|err| frame_error("demux failed", err))?;
    tracing::info!(delivered, "demux complete");

    Ok(SUCCESS)
}
