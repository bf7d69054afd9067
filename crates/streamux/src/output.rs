use std::io::{self, IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use streamux_frame::FrameRef;

/// Longest payload preview shown in table and pretty output.
const PREVIEW_CHARS: usize = 64;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    index: usize,
    offset: u64,
    tag: &'a str,
    tag_byte: u8,
    payload_size: usize,
    payload: String,
}

/// Renders frames listed by `inspect`.
///
/// Table output is buffered until [`FrameListing::finish`]; every other
/// format is written as frames arrive.
pub struct FrameListing<W: Write> {
    format: OutputFormat,
    out: W,
    table: Option<Table>,
}

impl<W: Write> FrameListing<W> {
    pub fn new(format: OutputFormat, out: W) -> Self {
        let table = matches!(format, OutputFormat::Table).then(|| {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["#", "OFFSET", "TAG", "SIZE", "PAYLOAD"]);
            table
        });
        Self { format, out, table }
    }

    pub fn push(&mut self, index: usize, offset: u64, frame: &FrameRef<'_>) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => {
                let record = FrameOutput {
                    index,
                    offset,
                    tag: frame.tag.name(),
                    tag_byte: frame.tag.as_byte(),
                    payload_size: frame.payload.len(),
                    payload: payload_preview(frame.payload, usize::MAX),
                };
                let line = serde_json::to_string(&record).map_err(io::Error::other)?;
                writeln!(self.out, "{line}")
            }
            OutputFormat::Table => {
                if let Some(table) = self.table.as_mut() {
                    table.add_row(vec![
                        index.to_string(),
                        offset.to_string(),
                        frame.tag.name().to_string(),
                        frame.payload.len().to_string(),
                        payload_preview(frame.payload, PREVIEW_CHARS),
                    ]);
                }
                Ok(())
            }
            OutputFormat::Pretty => writeln!(
                self.out,
                "#{index} offset={offset} tag={} ({}) size={} payload={}",
                frame.tag,
                frame.tag.as_byte(),
                frame.payload.len(),
                payload_preview(frame.payload, PREVIEW_CHARS)
            ),
            OutputFormat::Raw => self.out.write_all(frame.payload),
        }
    }

    pub fn finish(mut self) -> io::Result<()> {
        if let Some(table) = self.table.take() {
            writeln!(self.out, "{table}")?;
        }
        self.out.flush()
    }
}

fn payload_preview(payload: &[u8], max_chars: usize) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) if text.chars().count() > max_chars => {
            let mut preview: String = text.chars().take(max_chars).collect();
            preview.push('…');
            preview
        }
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}
