use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use streamux_frame::{FrameConfig, StreamTag, DEFAULT_INITIAL_CAPACITY};

use crate::exit::{io_error, CliResult};
use crate::output::OutputFormat;

pub mod demux;
pub mod inspect;
pub mod mux;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Frame stdin (or a file) onto stdout under one stream tag.
    Mux(MuxArgs),
    /// Split a multiplexed stream onto stdout and stderr.
    Demux(DemuxArgs),
    /// List the frames of a multiplexed stream.
    Inspect(InspectArgs),
    /// Show version information.
    Version(VersionArgs),
}

impl Command {
    /// True when stream data is written to stderr, so log lines must stay off it.
    pub fn writes_stream_to_stderr(&self) -> bool {
        matches!(self, Command::Demux(args) if args.secondary_out.is_none())
    }
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Mux(args) => mux::run(args),
        Command::Demux(args) => demux::run(args),
        Command::Inspect(args) => inspect::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct LimitArgs {
    /// Reject frames whose payload exceeds this many bytes.
    #[arg(long, value_name = "BYTES", env = "STREAMUX_MAX_FRAME_SIZE")]
    pub max_frame_size: Option<usize>,
    /// Initial size of the frame accumulation buffer.
    #[arg(
        long,
        value_name = "BYTES",
        env = "STREAMUX_INITIAL_CAPACITY",
        default_value_t = DEFAULT_INITIAL_CAPACITY
    )]
    pub initial_capacity: usize,
}

impl LimitArgs {
    pub fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            initial_capacity: self.initial_capacity,
            max_payload_size: self.max_frame_size,
        }
    }
}

#[derive(Args, Debug)]
pub struct MuxArgs {
    /// Stream tag stamped on every frame (input, primary, secondary, system-error).
    #[arg(long, short = 't', default_value = "primary")]
    pub tag: StreamTag,
    /// Read payload from file instead of stdin.
    #[arg(long, conflicts_with = "message")]
    pub file: Option<PathBuf>,
    /// Emit a single frame carrying this text and exit.
    #[arg(long, conflicts_with = "file")]
    pub message: Option<String>,
    /// Maximum payload bytes per frame.
    #[arg(long, value_name = "BYTES", default_value_t = 32 * 1024)]
    pub chunk_size: usize,
    #[command(flatten)]
    pub limits: LimitArgs,
}

#[derive(Args, Debug)]
pub struct DemuxArgs {
    /// Read the multiplexed stream from file instead of stdin.
    #[arg(long)]
    pub file: Option<PathBuf>,
    /// Write the primary stream here instead of stdout.
    #[arg(long, value_name = "PATH")]
    pub primary_out: Option<PathBuf>,
    /// Write the secondary stream here instead of stderr.
    #[arg(long, value_name = "PATH")]
    pub secondary_out: Option<PathBuf>,
    #[command(flatten)]
    pub limits: LimitArgs,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Read the multiplexed stream from file instead of stdin.
    #[arg(long)]
    pub file: Option<PathBuf>,
    #[command(flatten)]
    pub limits: LimitArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn open_input(path: Option<&Path>) -> CliResult<Box<dyn Read>> {
    match path {
        Some(path) => {
            let file = File::open(path)
                .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(io::stdin().lock())),
    }
}

pub(crate) fn open_output(
    path: Option<&Path>,
    default: impl FnOnce() -> Box<dyn Write>,
) -> CliResult<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .map_err(|err| io_error(&format!("failed creating {}", path.display()), err))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(default()),
    }
}
