//! Demo consumer
//!
//! Mirrors the original display loop: attach to a channel (waiting for the
//! producer if needed), read frames forever and report their shape and a
//! cheap checksum instead of rendering them.

use framechan::FrameReader;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let channel = std::env::args().nth(1).unwrap_or_else(|| "frame".to_string());

    let mut reader = match FrameReader::open(&channel) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("failed to open channel: {}", e);
            std::process::exit(1);
        }
    };

    let mut count = 0u64;
    loop {
        match reader.get() {
            Ok(frame) => {
                count += 1;
                let checksum: u32 = frame.data().iter().map(|&b| b as u32).sum();
                println!(
                    "frame {}: {}x{}x{} ({} bytes, checksum {})",
                    count,
                    frame.height(),
                    frame.width(),
                    frame.channels(),
                    frame.data().len(),
                    checksum
                );
            }
            Err(e) => {
                eprintln!("get failed: {}", e);
                break;
            }
        }
    }

    reader.close();
}
