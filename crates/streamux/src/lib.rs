//! Multiplex several byte streams over one transport and split them apart again.
//!
//! # Crate Structure
//!
//! - [`frame`] — Tagged framing, the frame encoder and the demultiplexer
//!
//! The `streamux` binary (behind the `cli` feature) wraps these for
//! stdin/stdout pipelines: `mux`, `demux` and `inspect`.

/// Re-export frame types.
pub mod frame {
    pub use streamux_frame::*;
}
