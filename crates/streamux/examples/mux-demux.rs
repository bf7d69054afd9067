//! Two producers share one transport; the consumer splits them apart again.
//!
//! Run with:
//!   cargo run --example mux-demux

#[cfg(unix)]
use std::io::Write;
#[cfg(unix)]
use std::thread;

#[cfg(unix)]
use streamux::frame::{demux, BufferPool, FrameEncoder, StreamTag};

#[cfg(not(unix))]
fn main() {
    eprintln!("mux-demux uses a Unix socket pair and only runs on Unix");
}

#[cfg(unix)]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (left, right) = std::os::unix::net::UnixStream::pair()?;
    let pool = BufferPool::new();

    let producer = {
        let out = left.try_clone()?;
        let pool = pool.clone();
        thread::spawn(move || -> std::io::Result<()> {
            let mut stdout = FrameEncoder::with_pool(out, StreamTag::Primary, pool.clone());
            let mut stderr = FrameEncoder::with_pool(left, StreamTag::Secondary, pool);
            for i in 0..3 {
                writeln!(stdout, "line {i} on stdout")?;
                writeln!(stderr, "line {i} on stderr")?;
            }
            Ok(())
        })
    };

    let mut out = Vec::new();
    let mut err = Vec::new();
    let delivered = demux(right, &mut out, &mut err)?;
    producer.join().expect("producer should not panic")?;

    eprintln!("[consumer] delivered {delivered} bytes");
    eprint!("[primary]\n{}", String::from_utf8_lossy(&out));
    eprint!("[secondary]\n{}", String::from_utf8_lossy(&err));
    Ok(())
}
