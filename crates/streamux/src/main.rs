mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "streamux", version, about = "Byte-stream multiplexer")]
struct Cli {
    /// Output format for `inspect`.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr). Forced off while `demux` writes the secondary stream to stderr.
    #[arg(
        long,
        value_name = "LEVEL",
        default_value = "warn",
        env = "STREAMUX_LOG_LEVEL",
        global = true
    )]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    // stderr is shared with the secondary stream in that case.
    fn effective_log_level(&self) -> LogLevel {
        if self.command.writes_stream_to_stderr() {
            LogLevel::Off
        } else {
            self.log_level
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.effective_log_level());

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}
